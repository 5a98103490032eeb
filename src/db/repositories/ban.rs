use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::db::now_rfc3339;
use crate::entities::banned_users;

pub struct BanRepository {
    conn: DatabaseConnection,
}

impl BanRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get(&self, user_id: i32) -> Result<Option<banned_users::Model>> {
        banned_users::Entity::find()
            .filter(banned_users::Column::UserId.eq(user_id))
            .one(&self.conn)
            .await
            .context("Failed to query ban row")
    }

    pub async fn is_banned(&self, user_id: i32) -> Result<bool> {
        Ok(self.get(user_id).await?.is_some())
    }

    /// Upsert semantics: re-banning refreshes reason, actor and timestamp.
    pub async fn ban(
        &self,
        user_id: i32,
        reason: &str,
        banned_by: i32,
    ) -> Result<banned_users::Model> {
        if let Some(existing) = self.get(user_id).await? {
            let mut active: banned_users::ActiveModel = existing.into();
            active.reason = Set(reason.to_string());
            active.banned_by = Set(Some(banned_by));
            active.banned_at = Set(now_rfc3339());
            return active
                .update(&self.conn)
                .await
                .context("Failed to update ban row");
        }

        banned_users::ActiveModel {
            user_id: Set(user_id),
            reason: Set(reason.to_string()),
            banned_by: Set(Some(banned_by)),
            banned_at: Set(now_rfc3339()),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert ban row")
    }

    pub async fn unban(&self, user_id: i32) -> Result<bool> {
        let res = banned_users::Entity::delete_many()
            .filter(banned_users::Column::UserId.eq(user_id))
            .exec(&self.conn)
            .await
            .context("Failed to delete ban row")?;

        Ok(res.rows_affected > 0)
    }

    pub async fn list(&self) -> Result<Vec<banned_users::Model>> {
        banned_users::Entity::find()
            .order_by_desc(banned_users::Column::BannedAt)
            .all(&self.conn)
            .await
            .context("Failed to list banned users")
    }

    pub async fn count(&self) -> Result<u64> {
        banned_users::Entity::find()
            .count(&self.conn)
            .await
            .context("Failed to count banned users")
    }

    pub async fn recent(&self, limit: u64) -> Result<Vec<banned_users::Model>> {
        use sea_orm::QuerySelect;

        banned_users::Entity::find()
            .order_by_desc(banned_users::Column::BannedAt)
            .limit(limit)
            .all(&self.conn)
            .await
            .context("Failed to list recent bans")
    }
}
