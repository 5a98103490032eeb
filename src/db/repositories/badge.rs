use anyhow::{Context, Result};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

use crate::db::now_rfc3339;
use crate::entities::{badges, user_badges};

pub struct BadgeRepository {
    conn: DatabaseConnection,
}

impl BadgeRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get(&self, badge_id: i32) -> Result<Option<badges::Model>> {
        badges::Entity::find_by_id(badge_id)
            .one(&self.conn)
            .await
            .context("Failed to query badge")
    }

    pub async fn list(&self) -> Result<Vec<badges::Model>> {
        badges::Entity::find()
            .order_by_asc(badges::Column::Name)
            .all(&self.conn)
            .await
            .context("Failed to list badges")
    }

    pub async fn name_taken(&self, name: &str) -> Result<bool> {
        let count = badges::Entity::find()
            .filter(badges::Column::Name.eq(name))
            .count(&self.conn)
            .await
            .context("Failed to check badge name")?;

        Ok(count > 0)
    }

    pub async fn create(
        &self,
        name: &str,
        description: &str,
        icon: &str,
        color: &str,
    ) -> Result<badges::Model> {
        badges::ActiveModel {
            name: Set(name.to_string()),
            description: Set(description.to_string()),
            icon: Set(icon.to_string()),
            color: Set(color.to_string()),
            created_at: Set(now_rfc3339()),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert badge")
    }

    pub async fn update(
        &self,
        badge_id: i32,
        name: Option<String>,
        description: Option<String>,
        icon: Option<String>,
        color: Option<String>,
    ) -> Result<Option<badges::Model>> {
        let Some(badge) = self.get(badge_id).await? else {
            return Ok(None);
        };

        let mut active: badges::ActiveModel = badge.into();
        if let Some(v) = name {
            active.name = Set(v);
        }
        if let Some(v) = description {
            active.description = Set(v);
        }
        if let Some(v) = icon {
            active.icon = Set(v);
        }
        if let Some(v) = color {
            active.color = Set(v);
        }

        let updated = active
            .update(&self.conn)
            .await
            .context("Failed to update badge")?;

        Ok(Some(updated))
    }

    /// Removes assignments first, then the definition.
    pub async fn delete(&self, badge_id: i32) -> Result<Option<String>> {
        let Some(badge) = self.get(badge_id).await? else {
            return Ok(None);
        };

        user_badges::Entity::delete_many()
            .filter(user_badges::Column::BadgeId.eq(badge_id))
            .exec(&self.conn)
            .await?;

        badges::Entity::delete_by_id(badge_id)
            .exec(&self.conn)
            .await
            .context("Failed to delete badge")?;

        Ok(Some(badge.name))
    }

    /// Appends at the end of the user's display order; assigning an already
    /// held badge is a no-op.
    pub async fn assign(&self, user_id: i32, badge_id: i32, assigned_by: i32) -> Result<()> {
        let max_order = user_badges::Entity::find()
            .filter(user_badges::Column::UserId.eq(user_id))
            .order_by_desc(user_badges::Column::DisplayOrder)
            .one(&self.conn)
            .await?
            .map_or(-1, |row| row.display_order);

        let row = user_badges::ActiveModel {
            user_id: Set(user_id),
            badge_id: Set(badge_id),
            assigned_by: Set(Some(assigned_by)),
            display_order: Set(max_order + 1),
            is_monochrome: Set(false),
            assigned_at: Set(now_rfc3339()),
            ..Default::default()
        };

        user_badges::Entity::insert(row)
            .on_conflict(
                OnConflict::columns([user_badges::Column::UserId, user_badges::Column::BadgeId])
                    .do_nothing()
                    .to_owned(),
            )
            .do_nothing()
            .exec(&self.conn)
            .await
            .context("Failed to assign badge")?;

        Ok(())
    }

    pub async fn remove_assignment(&self, user_id: i32, badge_id: i32) -> Result<bool> {
        let res = user_badges::Entity::delete_many()
            .filter(user_badges::Column::UserId.eq(user_id))
            .filter(user_badges::Column::BadgeId.eq(badge_id))
            .exec(&self.conn)
            .await
            .context("Failed to remove badge assignment")?;

        Ok(res.rows_affected > 0)
    }

    pub async fn assignments_for_user(
        &self,
        user_id: i32,
    ) -> Result<Vec<(user_badges::Model, Option<badges::Model>)>> {
        let assignments = user_badges::Entity::find()
            .filter(user_badges::Column::UserId.eq(user_id))
            .order_by_asc(user_badges::Column::DisplayOrder)
            .all(&self.conn)
            .await
            .context("Failed to list badge assignments")?;

        let mut out = Vec::with_capacity(assignments.len());
        for assignment in assignments {
            let badge = self.get(assignment.badge_id).await?;
            out.push((assignment, badge));
        }

        Ok(out)
    }

    pub async fn assignment_count(&self, badge_id: i32) -> Result<u64> {
        user_badges::Entity::find()
            .filter(user_badges::Column::BadgeId.eq(badge_id))
            .count(&self.conn)
            .await
            .context("Failed to count badge assignments")
    }

    pub async fn count_badges(&self) -> Result<u64> {
        badges::Entity::find()
            .count(&self.conn)
            .await
            .context("Failed to count badges")
    }

    pub async fn count_assignments(&self) -> Result<u64> {
        user_badges::Entity::find()
            .count(&self.conn)
            .await
            .context("Failed to count badge assignments")
    }

    pub async fn recent_assignments(&self, limit: u64) -> Result<Vec<user_badges::Model>> {
        user_badges::Entity::find()
            .order_by_desc(user_badges::Column::AssignedAt)
            .limit(limit)
            .all(&self.conn)
            .await
            .context("Failed to list recent badge assignments")
    }
}
