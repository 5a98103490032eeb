use sea_orm::entity::prelude::*;
use serde::Serialize;

/// Public profile row, created empty alongside every user.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "profiles")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub user_id: i32,

    pub display_name: Option<String>,

    pub bio: Option<String>,

    pub location: Option<String>,

    pub avatar: Option<String>,

    pub accent_color: Option<String>,

    pub text_color: Option<String>,

    pub background_color: Option<String>,

    pub background_image: Option<String>,

    pub background_video: Option<String>,

    pub background_audio: Option<String>,

    pub background_effect: Option<String>,

    pub username_effect: Option<String>,

    pub custom_cursor: Option<String>,

    pub view_count: i64,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
