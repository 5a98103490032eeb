use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set,
};

use crate::db::now_rfc3339;
use crate::entities::profiles;

/// Fields a verified user may change on their own profile. `None` leaves the
/// stored value untouched.
#[derive(Debug, Default)]
pub struct ProfileUpdate {
    pub display_name: Option<Option<String>>,
    pub bio: Option<Option<String>>,
    pub location: Option<Option<String>>,
    pub avatar: Option<Option<String>>,
    pub accent_color: Option<Option<String>>,
    pub text_color: Option<Option<String>>,
    pub background_color: Option<Option<String>>,
    pub background_effect: Option<Option<String>>,
    pub username_effect: Option<Option<String>>,
}

pub struct ProfileRepository {
    conn: DatabaseConnection,
}

impl ProfileRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Empty profile row bound 1:1 to a freshly created user.
    pub async fn create_default(&self, user_id: i32) -> Result<profiles::Model> {
        let now = now_rfc3339();

        profiles::ActiveModel {
            user_id: Set(user_id),
            view_count: Set(0),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert default profile")
    }

    pub async fn get_by_user(&self, user_id: i32) -> Result<Option<profiles::Model>> {
        profiles::Entity::find()
            .filter(profiles::Column::UserId.eq(user_id))
            .one(&self.conn)
            .await
            .context("Failed to query profile")
    }

    pub async fn update(&self, user_id: i32, update: ProfileUpdate) -> Result<profiles::Model> {
        let profile = self
            .get_by_user(user_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Profile not found for user {user_id}"))?;

        let mut active: profiles::ActiveModel = profile.into();
        if let Some(v) = update.display_name {
            active.display_name = Set(v);
        }
        if let Some(v) = update.bio {
            active.bio = Set(v);
        }
        if let Some(v) = update.location {
            active.location = Set(v);
        }
        if let Some(v) = update.avatar {
            active.avatar = Set(v);
        }
        if let Some(v) = update.accent_color {
            active.accent_color = Set(v);
        }
        if let Some(v) = update.text_color {
            active.text_color = Set(v);
        }
        if let Some(v) = update.background_color {
            active.background_color = Set(v);
        }
        if let Some(v) = update.background_effect {
            active.background_effect = Set(v);
        }
        if let Some(v) = update.username_effect {
            active.username_effect = Set(v);
        }
        active.updated_at = Set(now_rfc3339());

        active
            .update(&self.conn)
            .await
            .context("Failed to update profile")
    }

    /// Moderation: null out the selected decoration groups. Returns the
    /// labels of what was stripped for the audit payload.
    pub async fn strip(
        &self,
        user_id: i32,
        background: bool,
        effects: bool,
        audio: bool,
    ) -> Result<Vec<&'static str>> {
        let profile = self
            .get_by_user(user_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Profile not found for user {user_id}"))?;

        let mut stripped = Vec::new();
        let mut active: profiles::ActiveModel = profile.into();

        if background {
            active.background_image = Set(None);
            active.background_video = Set(None);
            stripped.push("background");
        }
        if effects {
            active.background_effect = Set(Some("none".to_string()));
            active.username_effect = Set(Some("none".to_string()));
            active.custom_cursor = Set(None);
            stripped.push("effects");
        }
        if audio {
            active.background_audio = Set(None);
            stripped.push("audio");
        }

        if !stripped.is_empty() {
            active.updated_at = Set(now_rfc3339());
            active
                .update(&self.conn)
                .await
                .context("Failed to strip profile")?;
        }

        Ok(stripped)
    }

    pub async fn count(&self) -> Result<u64> {
        profiles::Entity::find()
            .count(&self.conn)
            .await
            .context("Failed to count profiles")
    }

    pub async fn total_views(&self) -> Result<i64> {
        let profiles = profiles::Entity::find()
            .all(&self.conn)
            .await
            .context("Failed to sum profile views")?;

        Ok(profiles.iter().map(|p| p.view_count).sum())
    }
}
