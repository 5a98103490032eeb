use sea_orm::entity::prelude::*;

/// Backing table for public UID allocation. Allocating a UID is a bare
/// insert; sqlite AUTOINCREMENT guarantees the returned id is monotonic and
/// never reused, even across deletes and concurrent registrations.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "uid_sequence")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
