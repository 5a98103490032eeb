use anyhow::{Context, Result};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};

use crate::entities::links;

pub struct LinkRepository {
    conn: DatabaseConnection,
}

impl LinkRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn for_user(&self, user_id: i32) -> Result<Vec<links::Model>> {
        links::Entity::find()
            .filter(links::Column::UserId.eq(user_id))
            .order_by_asc(links::Column::Position)
            .all(&self.conn)
            .await
            .context("Failed to list links")
    }

    pub async fn count_for_user(&self, user_id: i32) -> Result<u64> {
        links::Entity::find()
            .filter(links::Column::UserId.eq(user_id))
            .count(&self.conn)
            .await
            .context("Failed to count user links")
    }

    pub async fn count(&self) -> Result<u64> {
        links::Entity::find()
            .count(&self.conn)
            .await
            .context("Failed to count links")
    }

    pub async fn recent(&self, limit: u64) -> Result<Vec<links::Model>> {
        use sea_orm::QuerySelect;

        links::Entity::find()
            .order_by_desc(links::Column::CreatedAt)
            .limit(limit)
            .all(&self.conn)
            .await
            .context("Failed to list recent links")
    }

    pub async fn total_clicks(&self) -> Result<i64> {
        let links = links::Entity::find()
            .all(&self.conn)
            .await
            .context("Failed to sum link clicks")?;

        Ok(links.iter().map(|l| l.clicks).sum())
    }
}
