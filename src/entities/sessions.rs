use sea_orm::entity::prelude::*;

/// Legacy server-tracked sessions. Nothing issues rows anymore; logout and
/// ban still clear them so stale installs converge. Bearer tokens themselves
/// are stateless and remain valid until natural expiry.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "sessions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub user_id: i32,

    pub token: String,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
