use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryOrder, Set,
};

use crate::db::now_rfc3339;
use crate::entities::audit_log;

/// Append-only trail of privileged actions. No update or delete paths exist
/// here on purpose.
pub struct AuditRepository {
    conn: DatabaseConnection,
}

impl AuditRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn append(
        &self,
        admin_id: i32,
        action: &str,
        target_user_id: Option<i32>,
        details: &serde_json::Value,
    ) -> Result<audit_log::Model> {
        audit_log::ActiveModel {
            admin_id: Set(admin_id),
            action: Set(action.to_string()),
            target_user_id: Set(target_user_id),
            details: Set(details.to_string()),
            created_at: Set(now_rfc3339()),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to append audit entry")
    }

    /// Newest first, with the total count for the pagination envelope.
    pub async fn list(&self, page: u64, per_page: u64) -> Result<(Vec<audit_log::Model>, u64)> {
        let paginator = audit_log::Entity::find()
            .order_by_desc(audit_log::Column::CreatedAt)
            .order_by_desc(audit_log::Column::Id)
            .paginate(&self.conn, per_page.max(1));

        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((rows, total))
    }
}
