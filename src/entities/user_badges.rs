use sea_orm::entity::prelude::*;
use serde::Serialize;

/// Badge assignment. A `(user_id, badge_id)` unique index is added by the
/// initial migration.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "user_badges")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub user_id: i32,

    pub badge_id: i32,

    pub assigned_by: Option<i32>,

    pub display_order: i32,

    pub is_monochrome: bool,

    pub assigned_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
