use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Role ladder: user < admin < owner. Stored as the single source of truth;
/// admin capability is derived from it, never stored separately.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[sea_orm(string_value = "user")]
    User,
    #[sea_orm(string_value = "admin")]
    Admin,
    #[sea_orm(string_value = "owner")]
    Owner,
}

impl Role {
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin | Self::Owner)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Stored lowercased; uniqueness is therefore case-insensitive.
    #[sea_orm(unique)]
    pub username: String,

    /// Stored lowercased; uniqueness is therefore case-insensitive.
    #[sea_orm(unique)]
    pub email: String,

    /// Argon2id hash. Absent for accounts created via Discord only.
    pub password_hash: Option<String>,

    /// Sequential public identifier. UID 1 is permanently the owner.
    #[sea_orm(unique)]
    pub uid: i64,

    pub role: Role,

    pub is_verified: bool,

    #[sea_orm(unique)]
    pub discord_id: Option<String>,

    pub discord_username: Option<String>,

    pub discord_avatar: Option<String>,

    pub created_at: String,

    pub updated_at: String,
}

impl Model {
    /// The one owner predicate: UID 1 is always owner, whatever the role
    /// column says.
    #[must_use]
    pub fn is_owner(&self) -> bool {
        self.uid == 1 || self.role == Role::Owner
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
