//! `SeaORM` implementation of the `AccountService` trait.

use std::sync::Arc;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::task;
use tracing::warn;

use crate::db::{Store, rfc3339_after};
use crate::db::repositories::user::{NewUser, hash_password, verify_password};
use crate::entities::users::{self, Role};
use crate::services::account::{AccountError, AccountService, AuthenticatedUser};
use crate::services::mailer::Mailer;
use crate::services::token::TokenSigner;

const CODE_TTL_MINUTES: i64 = 5;
const RESET_TTL_MINUTES: i64 = 60;

pub struct SeaOrmAccountService {
    store: Store,
    signer: TokenSigner,
    mailer: Arc<dyn Mailer>,
    frontend_url: String,
}

impl SeaOrmAccountService {
    #[must_use]
    pub const fn new(
        store: Store,
        signer: TokenSigner,
        mailer: Arc<dyn Mailer>,
        frontend_url: String,
    ) -> Self {
        Self {
            store,
            signer,
            mailer,
            frontend_url,
        }
    }

    async fn hash(&self, password: &str) -> Result<String, AccountError> {
        let password = password.to_string();
        task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| AccountError::Internal(format!("Hashing task panicked: {e}")))?
            .map_err(AccountError::from)
    }

    fn token_for(&self, user: &users::Model) -> Result<String, AccountError> {
        self.signer
            .issue(user)
            .map_err(|e| AccountError::Internal(format!("Failed to sign token: {e}")))
    }
}

#[async_trait]
impl AccountService for SeaOrmAccountService {
    async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<users::Model, AccountError> {
        let users = self.store.user_repo();

        if users.username_or_email_taken(username, email).await? {
            return Err(AccountError::Conflict(
                "Username or email already exists".to_string(),
            ));
        }

        let password_hash = self.hash(password).await?;

        let uid = users.allocate_uid().await?;
        // The first account ever created is the platform owner.
        let role = if uid == 1 { Role::Owner } else { Role::User };

        let user = users
            .create(NewUser {
                username: username.to_string(),
                email: email.to_string(),
                password_hash: Some(password_hash),
                uid,
                role,
                is_verified: false,
                discord_id: None,
                discord_username: None,
                discord_avatar: None,
            })
            .await?;

        self.store.profile_repo().create_default(user.id).await?;

        let code = generate_verification_code();
        let expires_at = rfc3339_after(chrono::Duration::minutes(CODE_TTL_MINUTES));
        self.store
            .verification_repo()
            .issue_code(user.id, &code, &expires_at)
            .await?;

        // Delivery failure is recoverable through resend-code; the account
        // itself is already created.
        if let Err(e) = self
            .mailer
            .send_verification(&user.email, &user.username, &code)
            .await
        {
            warn!(email = %user.email, error = %e, "Failed to send verification email");
        }

        Ok(user)
    }

    async fn verify_email(
        &self,
        email: &str,
        code: &str,
    ) -> Result<AuthenticatedUser, AccountError> {
        let users = self.store.user_repo();
        let user = users
            .get_by_email(email)
            .await?
            .ok_or_else(|| AccountError::NotFound("User not found".to_string()))?;

        let verification = self.store.verification_repo();
        verification
            .find_valid_code(user.id, code)
            .await?
            .ok_or(AccountError::InvalidCode)?;

        users.set_verified(user.id).await?;
        // Used and unused codes alike are gone after a successful verify.
        verification.delete_codes_for_user(user.id).await?;

        let user = users
            .get_by_id(user.id)
            .await?
            .ok_or_else(|| AccountError::NotFound("User not found".to_string()))?;

        let token = self.token_for(&user)?;

        if let Err(e) = self
            .mailer
            .send_welcome(&user.email, &user.username, user.uid)
            .await
        {
            warn!(email = %user.email, error = %e, "Failed to send welcome email");
        }

        Ok(AuthenticatedUser { token, user })
    }

    async fn resend_code(&self, email: &str) -> Result<(), AccountError> {
        let user = self
            .store
            .user_repo()
            .get_by_email(email)
            .await?
            .ok_or_else(|| AccountError::NotFound("User not found".to_string()))?;

        if user.is_verified {
            return Err(AccountError::AlreadyVerified);
        }

        let verification = self.store.verification_repo();
        verification.delete_codes_for_user(user.id).await?;

        let code = generate_verification_code();
        let expires_at = rfc3339_after(chrono::Duration::minutes(CODE_TTL_MINUTES));
        verification.issue_code(user.id, &code, &expires_at).await?;

        self.mailer
            .send_verification(&user.email, &user.username, &code)
            .await
            .map_err(|e| AccountError::Internal(format!("Failed to send code: {e}")))?;

        Ok(())
    }

    async fn login(
        &self,
        username_or_email: &str,
        password: &str,
    ) -> Result<AuthenticatedUser, AccountError> {
        let user = self
            .store
            .user_repo()
            .get_by_username_or_email(username_or_email)
            .await?
            .ok_or(AccountError::InvalidCredentials)?;

        if let Some(ban) = self.store.ban_repo().get(user.id).await? {
            return Err(AccountError::Banned { reason: ban.reason });
        }

        // Discord-only accounts have no password and cannot log in locally.
        let Some(password_hash) = user.password_hash.clone() else {
            return Err(AccountError::InvalidCredentials);
        };

        if !verify_password(password_hash, password.to_string()).await? {
            return Err(AccountError::InvalidCredentials);
        }

        if !user.is_verified {
            return Err(AccountError::NotVerified {
                email: user.email.clone(),
            });
        }

        let token = self.token_for(&user)?;

        Ok(AuthenticatedUser { token, user })
    }

    async fn request_password_reset(&self, email: &str) -> Result<(), AccountError> {
        // Unknown addresses fall through to the same generic success the
        // handler returns, so responses carry no registration oracle.
        let Some(user) = self.store.user_repo().get_by_email(email).await? else {
            return Ok(());
        };

        let raw_token = generate_reset_token();
        let token_hash = sha256_hex(&raw_token);
        let expires_at = rfc3339_after(chrono::Duration::minutes(RESET_TTL_MINUTES));

        self.store
            .verification_repo()
            .replace_reset_token(user.id, &token_hash, &expires_at)
            .await?;

        let reset_url = format!("{}/reset-password?token={raw_token}", self.frontend_url);
        if let Err(e) = self
            .mailer
            .send_password_reset(&user.email, &user.username, &reset_url)
            .await
        {
            warn!(email = %user.email, error = %e, "Failed to send reset email");
        }

        Ok(())
    }

    async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), AccountError> {
        if new_password.len() < 6 {
            return Err(AccountError::Validation(
                "Password must be at least 6 characters".to_string(),
            ));
        }

        let token_hash = sha256_hex(token);
        let verification = self.store.verification_repo();

        let row = verification
            .find_valid_reset_token(&token_hash)
            .await?
            .ok_or(AccountError::InvalidResetToken)?;

        let password_hash = self.hash(new_password).await?;
        self.store
            .user_repo()
            .update_password(row.user_id, password_hash)
            .await?;

        // Single use: the row disappears with the first successful reset.
        verification.delete_reset_tokens_for_user(row.user_id).await?;

        Ok(())
    }

    async fn logout(&self, user_id: i32) -> Result<(), AccountError> {
        self.store.session_repo().delete_for_user(user_id).await?;
        Ok(())
    }
}

/// Six decimal digits, uniformly drawn from 100000..=999999.
#[must_use]
pub fn generate_verification_code() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    rng.random_range(100_000..1_000_000u32).to_string()
}

/// 32 random bytes, hex encoded. Only the SHA-256 digest is ever stored.
#[must_use]
pub fn generate_reset_token() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();

    bytes.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}

#[must_use]
pub fn sha256_hex(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());

    digest.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}
