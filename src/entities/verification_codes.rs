use sea_orm::entity::prelude::*;

/// Six-digit one-time email verification code. Rows are consumed by deletion,
/// never flagged; several may coexist for one user until verify or resend
/// clears them.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "verification_codes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub user_id: i32,

    pub code: String,

    /// RFC 3339 UTC, created + 5 minutes.
    pub expires_at: String,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
