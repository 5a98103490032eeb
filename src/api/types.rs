use serde::Serialize;

use crate::entities::{audit_log, badges, links, profiles, user_badges, users};
use crate::services::audit::AuditEntryDetail;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Public user fields. Never carries the password hash.
#[derive(Debug, Serialize)]
pub struct UserDto {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub uid: i64,
    pub role: users::Role,
    pub is_admin: bool,
    pub is_owner: bool,
    pub is_verified: bool,
    pub discord_id: Option<String>,
    pub discord_username: Option<String>,
    pub discord_avatar: Option<String>,
    pub created_at: String,
}

impl From<&users::Model> for UserDto {
    fn from(user: &users::Model) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            uid: user.uid,
            role: user.role,
            is_admin: user.is_admin(),
            is_owner: user.is_owner(),
            is_verified: user.is_verified,
            discord_id: user.discord_id.clone(),
            discord_username: user.discord_username.clone(),
            discord_avatar: user.discord_avatar.clone(),
            created_at: user.created_at.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub user: UserDto,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: UserDto,
    pub profile: Option<profiles::Model>,
}

#[derive(Debug, Serialize)]
pub struct PaginationDto {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub pages: u64,
}

impl PaginationDto {
    #[must_use]
    pub const fn new(page: u64, limit: u64, total: u64) -> Self {
        let pages = if limit == 0 { 0 } else { total.div_ceil(limit) };
        Self {
            page,
            limit,
            total,
            pages,
        }
    }
}

/// Row in the admin user listing, with moderation context joined in.
#[derive(Debug, Serialize)]
pub struct AdminUserRow {
    #[serde(flatten)]
    pub user: UserDto,
    pub link_count: u64,
    pub badge_count: u64,
    pub is_banned: bool,
    pub ban_reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AdminUserList {
    pub users: Vec<AdminUserRow>,
    pub pagination: PaginationDto,
}

#[derive(Debug, Serialize)]
pub struct AdminUserDetail {
    pub user: UserDto,
    pub profile: Option<profiles::Model>,
    pub links: Vec<links::Model>,
    pub badges: Vec<AssignedBadgeDto>,
    pub is_banned: bool,
    pub ban_reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatsDto {
    pub total_users: u64,
    pub verified_users: u64,
    pub total_profiles: u64,
    pub total_links: u64,
    pub total_views: i64,
    pub total_clicks: i64,
    pub banned_users: u64,
    pub total_badges: u64,
    pub assigned_badges: u64,
    pub new_users_today: u64,
    pub new_users_week: u64,
}

#[derive(Debug, Serialize)]
pub struct BadgeDto {
    #[serde(flatten)]
    pub badge: badges::Model,
    pub assigned_count: u64,
}

#[derive(Debug, Serialize)]
pub struct AssignedBadgeDto {
    pub badge: Option<badges::Model>,
    pub is_monochrome: bool,
    pub display_order: i32,
    pub assigned_at: String,
}

impl From<(user_badges::Model, Option<badges::Model>)> for AssignedBadgeDto {
    fn from((assignment, badge): (user_badges::Model, Option<badges::Model>)) -> Self {
        Self {
            badge,
            is_monochrome: assignment.is_monochrome,
            display_order: assignment.display_order,
            assigned_at: assignment.assigned_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BannedUserDto {
    pub user_id: i32,
    pub username: Option<String>,
    pub email: Option<String>,
    pub uid: Option<i64>,
    pub reason: String,
    pub banned_by_username: Option<String>,
    pub banned_at: String,
}

#[derive(Debug, Serialize)]
pub struct AuditLogDto {
    pub id: i64,
    pub admin_id: i32,
    pub admin_username: Option<String>,
    pub action: String,
    pub target_user_id: Option<i32>,
    pub target_username: Option<String>,
    pub target_uid: Option<i64>,
    pub details: serde_json::Value,
    pub created_at: String,
}

impl From<AuditEntryDetail> for AuditLogDto {
    fn from(detail: AuditEntryDetail) -> Self {
        let audit_log::Model {
            id,
            admin_id,
            action,
            target_user_id,
            details,
            created_at,
        } = detail.entry;

        Self {
            id,
            admin_id,
            admin_username: detail.admin_username,
            action,
            target_user_id,
            target_username: detail.target_username,
            target_uid: detail.target_uid,
            details: serde_json::from_str(&details).unwrap_or(serde_json::Value::Null),
            created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuditLogList {
    pub logs: Vec<AuditLogDto>,
    pub pagination: PaginationDto,
}
