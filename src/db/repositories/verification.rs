use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::db::now_rfc3339;
use crate::entities::{password_reset_tokens, verification_codes};

/// One-time credentials: email verification codes and password-reset token
/// digests. Both are consumed by deletion and checked against their expiry
/// timestamp at lookup time.
pub struct VerificationRepository {
    conn: DatabaseConnection,
}

impl VerificationRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn issue_code(
        &self,
        user_id: i32,
        code: &str,
        expires_at: &str,
    ) -> Result<verification_codes::Model> {
        verification_codes::ActiveModel {
            user_id: Set(user_id),
            code: Set(code.to_string()),
            expires_at: Set(expires_at.to_string()),
            created_at: Set(now_rfc3339()),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert verification code")
    }

    /// Most recent unexpired code matching user + code. A code presented at
    /// or after its expiry instant does not match.
    pub async fn find_valid_code(
        &self,
        user_id: i32,
        code: &str,
    ) -> Result<Option<verification_codes::Model>> {
        verification_codes::Entity::find()
            .filter(verification_codes::Column::UserId.eq(user_id))
            .filter(verification_codes::Column::Code.eq(code))
            .filter(verification_codes::Column::ExpiresAt.gt(now_rfc3339()))
            .order_by_desc(verification_codes::Column::CreatedAt)
            .one(&self.conn)
            .await
            .context("Failed to look up verification code")
    }

    /// Remove every code for the user, used and unused alike.
    pub async fn delete_codes_for_user(&self, user_id: i32) -> Result<u64> {
        let res = verification_codes::Entity::delete_many()
            .filter(verification_codes::Column::UserId.eq(user_id))
            .exec(&self.conn)
            .await
            .context("Failed to delete verification codes")?;

        Ok(res.rows_affected)
    }

    /// Replace any previous reset token: one active token per user.
    pub async fn replace_reset_token(
        &self,
        user_id: i32,
        token_hash: &str,
        expires_at: &str,
    ) -> Result<password_reset_tokens::Model> {
        password_reset_tokens::Entity::delete_many()
            .filter(password_reset_tokens::Column::UserId.eq(user_id))
            .exec(&self.conn)
            .await
            .context("Failed to delete prior reset tokens")?;

        password_reset_tokens::ActiveModel {
            user_id: Set(user_id),
            token_hash: Set(token_hash.to_string()),
            expires_at: Set(expires_at.to_string()),
            created_at: Set(now_rfc3339()),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert reset token")
    }

    pub async fn find_valid_reset_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<password_reset_tokens::Model>> {
        password_reset_tokens::Entity::find()
            .filter(password_reset_tokens::Column::TokenHash.eq(token_hash))
            .filter(password_reset_tokens::Column::ExpiresAt.gt(now_rfc3339()))
            .one(&self.conn)
            .await
            .context("Failed to look up reset token")
    }

    pub async fn delete_reset_tokens_for_user(&self, user_id: i32) -> Result<u64> {
        let res = password_reset_tokens::Entity::delete_many()
            .filter(password_reset_tokens::Column::UserId.eq(user_id))
            .exec(&self.conn)
            .await
            .context("Failed to delete reset tokens")?;

        Ok(res.rows_affected)
    }

    /// Maintenance sweep; rows are already invisible to lookups once expired,
    /// this just reclaims them.
    pub async fn purge_expired(&self) -> Result<(u64, u64)> {
        let now = now_rfc3339();

        let codes = verification_codes::Entity::delete_many()
            .filter(verification_codes::Column::ExpiresAt.lte(now.clone()))
            .exec(&self.conn)
            .await
            .context("Failed to purge expired verification codes")?;

        let tokens = password_reset_tokens::Entity::delete_many()
            .filter(password_reset_tokens::Column::ExpiresAt.lte(now))
            .exec(&self.conn)
            .await
            .context("Failed to purge expired reset tokens")?;

        Ok((codes.rows_affected, tokens.rows_affected))
    }

    /// Move a code's expiry to an arbitrary instant.
    pub async fn set_code_expiry(&self, code_id: i32, expires_at: &str) -> Result<()> {
        let code = verification_codes::Entity::find_by_id(code_id)
            .one(&self.conn)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Verification code not found: {code_id}"))?;

        let mut active: verification_codes::ActiveModel = code.into();
        active.expires_at = Set(expires_at.to_string());
        active.update(&self.conn).await?;

        Ok(())
    }
}
