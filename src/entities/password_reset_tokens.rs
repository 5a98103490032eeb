use sea_orm::entity::prelude::*;

/// Password-reset authorization. Only the SHA-256 digest of the token is
/// stored; at most one row per user (replaced on each new request, deleted
/// on use).
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "password_reset_tokens")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub user_id: i32,

    #[sea_orm(unique)]
    pub token_hash: String,

    /// RFC 3339 UTC, created + 1 hour.
    pub expires_at: String,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
