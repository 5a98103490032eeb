use sea_orm::entity::prelude::*;
use serde::Serialize;

/// Append-only record of privileged actions. Never updated or deleted.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "audit_log")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub admin_id: i32,

    /// Free-form action tag, e.g. `BAN_USER`. New tags need no schema change.
    pub action: String,

    pub target_user_id: Option<i32>,

    /// JSON payload specific to the action.
    pub details: String,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
