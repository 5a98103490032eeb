use anyhow::{Context, Result};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use crate::entities::sessions;

/// Legacy session-table cleanup. Bearer tokens are stateless; deleting rows
/// here does not invalidate an issued token before its natural expiry.
pub struct SessionRepository {
    conn: DatabaseConnection,
}

impl SessionRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn delete_for_user(&self, user_id: i32) -> Result<u64> {
        let res = sessions::Entity::delete_many()
            .filter(sessions::Column::UserId.eq(user_id))
            .exec(&self.conn)
            .await
            .context("Failed to delete sessions")?;

        Ok(res.rows_affected)
    }
}
