use axum::{
    Extension, Json,
    extract::{Path, Query, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

use super::auth::{CurrentUser, current_user};
use super::validation::validate_page;
use super::{
    AdminUserDetail, AdminUserList, AdminUserRow, ApiError, ApiResponse, AppState,
    AssignedBadgeDto, AuditLogDto, AuditLogList, BadgeDto, BannedUserDto, MessageResponse,
    PaginationDto, StatsDto, UserDto,
};
use crate::entities::users::{self, Role};

// ============================================================================
// Request Types
// ============================================================================

#[derive(Deserialize)]
pub struct OwnerVerifyRequest {
    pub secret: String,
}

#[derive(Deserialize)]
pub struct GrantAdminRequest {
    pub uid: Option<i64>,
    pub discord_id: Option<String>,
}

#[derive(Deserialize)]
pub struct RevokeAdminRequest {
    pub uid: i64,
}

#[derive(Deserialize)]
pub struct UserListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub search: Option<String>,
}

#[derive(Deserialize)]
pub struct BanRequest {
    pub user_id: i32,
    pub reason: Option<String>,
}

#[derive(Deserialize)]
pub struct UnbanRequest {
    pub user_id: i32,
}

#[derive(Deserialize)]
pub struct CreateBadgeRequest {
    pub name: String,
    pub description: Option<String>,
    pub icon: String,
    pub color: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateBadgeRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
}

#[derive(Deserialize)]
pub struct AssignBadgeRequest {
    pub badge_id: i32,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub is_verified: Option<bool>,
    pub is_admin: Option<bool>,
}

#[derive(Deserialize)]
pub struct SendEmailRequest {
    pub user_id: i32,
    pub subject: String,
    pub message: String,
    pub from_name: Option<String>,
}

#[derive(Deserialize)]
pub struct BulkEmailRequest {
    pub subject: String,
    pub message: String,
    /// `verified` (default) or `admins`.
    pub filter: Option<String>,
    pub from_name: Option<String>,
}

#[derive(Deserialize)]
pub struct StripEffectsRequest {
    pub user_id: i32,
    #[serde(default)]
    pub strip_background: bool,
    #[serde(default)]
    pub strip_effects: bool,
    #[serde(default)]
    pub strip_audio: bool,
}

#[derive(Deserialize)]
pub struct PageQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

// ============================================================================
// Middleware
// ============================================================================

/// Owner gate. Consults storage, not the token: UID 1 counts as owner even
/// if the role column disagrees.
pub async fn require_owner(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let current = current_user(&request)?;

    let user = state
        .store()
        .user_repo()
        .get_by_id(current.user_id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to load user: {e}")))?;

    match user {
        Some(user) if user.is_owner() => Ok(next.run(request).await),
        _ => Err(ApiError::forbidden("Owner access required")),
    }
}

// ============================================================================
// Owner surface
// ============================================================================

/// POST /api/admin/owner/verify
///
/// Secret-key ritual: any authenticated user presenting the bootstrap secret
/// is promoted to owner.
pub async fn owner_verify(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<OwnerVerifyRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    if payload.secret != state.config().auth.owner_secret {
        return Err(ApiError::forbidden("Invalid secret"));
    }

    state
        .store()
        .user_repo()
        .set_role(current.user_id, Role::Owner)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to grant owner: {e}")))?;

    state
        .audit()
        .record(
            current.user_id,
            "OWNER_ACCESS",
            None,
            json!({ "method": "secret_key" }),
        )
        .await;

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Owner access granted",
    ))))
}

/// POST /api/admin/owner/grant-admin
pub async fn grant_admin(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<GrantAdminRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let users = state.store().user_repo();

    let target = match (&payload.uid, &payload.discord_id) {
        (Some(uid), _) => users.get_by_uid(*uid).await,
        (None, Some(discord_id)) => users.get_by_discord_id(discord_id).await,
        (None, None) => {
            return Err(ApiError::validation("UID or Discord ID required"));
        }
    }
    .map_err(|e| ApiError::internal(format!("Failed to load user: {e}")))?
    .ok_or_else(ApiError::user_not_found)?;

    // Owners are never reassigned through this endpoint.
    if target.is_owner() {
        return Err(ApiError::forbidden("Cannot change role of owner"));
    }

    let target = users
        .set_role(target.id, Role::Admin)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to grant admin: {e}")))?;

    state
        .audit()
        .record(
            current.user_id,
            "GRANT_ADMIN",
            Some(target.id),
            json!({ "uid": payload.uid, "discord_id": payload.discord_id }),
        )
        .await;

    Ok(Json(ApiResponse::success(MessageResponse::new(format!(
        "Admin granted to {}",
        target.username
    )))))
}

/// POST /api/admin/owner/revoke-admin
pub async fn revoke_admin(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<RevokeAdminRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let users = state.store().user_repo();

    let target = users
        .get_by_uid(payload.uid)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to load user: {e}")))?;

    // Owner roles are never revoked here; the 404 shape matches a missing
    // user so the endpoint leaks nothing about owner UIDs.
    let target = match target {
        Some(user) if !user.is_owner() => user,
        _ => return Err(ApiError::NotFound("User not found or is owner".to_string())),
    };

    let target = users
        .set_role(target.id, Role::User)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to revoke admin: {e}")))?;

    state
        .audit()
        .record(
            current.user_id,
            "REVOKE_ADMIN",
            Some(target.id),
            json!({ "uid": payload.uid }),
        )
        .await;

    Ok(Json(ApiResponse::success(MessageResponse::new(format!(
        "Admin revoked from {}",
        target.username
    )))))
}

// ============================================================================
// Stats & listings
// ============================================================================

/// GET /api/admin/stats
pub async fn stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<StatsDto>>, ApiError> {
    let store = state.store();
    let users = store.user_repo();

    let day_ago = crate::db::rfc3339_after(chrono::Duration::hours(-24));
    let week_ago = crate::db::rfc3339_after(chrono::Duration::days(-7));

    let stats = StatsDto {
        total_users: users.count().await?,
        verified_users: users.count_verified().await?,
        total_profiles: store.profile_repo().count().await?,
        total_links: store.link_repo().count().await?,
        total_views: store.profile_repo().total_views().await?,
        total_clicks: store.link_repo().total_clicks().await?,
        banned_users: store.ban_repo().count().await?,
        total_badges: store.badge_repo().count_badges().await?,
        assigned_badges: store.badge_repo().count_assignments().await?,
        new_users_today: users.count_created_since(&day_ago).await?,
        new_users_week: users.count_created_since(&week_ago).await?,
    };

    Ok(Json(ApiResponse::success(stats)))
}

/// GET /api/admin/users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UserListQuery>,
) -> Result<Json<ApiResponse<AdminUserList>>, ApiError> {
    let (page, limit) = validate_page(query.page.unwrap_or(1), query.limit.unwrap_or(50))?;

    let store = state.store();
    let (rows, total) = store
        .user_repo()
        .search(page, limit, query.search.as_deref())
        .await?;

    let mut out = Vec::with_capacity(rows.len());
    for user in &rows {
        let ban = store.ban_repo().get(user.id).await?;
        out.push(AdminUserRow {
            user: UserDto::from(user),
            link_count: store.link_repo().count_for_user(user.id).await?,
            badge_count: store.badge_repo().assignments_for_user(user.id).await?.len() as u64,
            is_banned: ban.is_some(),
            ban_reason: ban.map(|b| b.reason),
        });
    }

    Ok(Json(ApiResponse::success(AdminUserList {
        users: out,
        pagination: PaginationDto::new(page, limit, total),
    })))
}

/// GET /api/admin/users/{id}
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i32>,
) -> Result<Json<ApiResponse<AdminUserDetail>>, ApiError> {
    let user = state
        .store()
        .user_repo()
        .get_by_id(user_id)
        .await?
        .ok_or_else(ApiError::user_not_found)?;

    user_detail(&state, user).await.map(|d| Json(ApiResponse::success(d)))
}

/// GET /api/admin/users/uid/{uid}
pub async fn get_user_by_uid(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<i64>,
) -> Result<Json<ApiResponse<AdminUserDetail>>, ApiError> {
    let user = state
        .store()
        .user_repo()
        .get_by_uid(uid)
        .await?
        .ok_or_else(ApiError::user_not_found)?;

    user_detail(&state, user).await.map(|d| Json(ApiResponse::success(d)))
}

async fn user_detail(state: &AppState, user: users::Model) -> Result<AdminUserDetail, ApiError> {
    let store = state.store();

    let profile = store.profile_repo().get_by_user(user.id).await?;
    let links = store.link_repo().for_user(user.id).await?;
    let badges: Vec<AssignedBadgeDto> = store
        .badge_repo()
        .assignments_for_user(user.id)
        .await?
        .into_iter()
        .map(AssignedBadgeDto::from)
        .collect();
    let ban = store.ban_repo().get(user.id).await?;

    Ok(AdminUserDetail {
        user: UserDto::from(&user),
        profile,
        links,
        badges,
        is_banned: ban.is_some(),
        ban_reason: ban.map(|b| b.reason),
    })
}

// ============================================================================
// Moderation
// ============================================================================

/// POST /api/admin/ban
pub async fn ban_user(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<BanRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let target = state
        .store()
        .user_repo()
        .get_by_id(payload.user_id)
        .await?
        .ok_or_else(ApiError::user_not_found)?;

    // Admins, owners and UID 1 can never acquire a ban row.
    if target.is_admin() || target.is_owner() {
        return Err(ApiError::forbidden("Cannot ban admin or owner"));
    }

    let reason = payload
        .reason
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| "No reason provided".to_string());

    state
        .store()
        .ban_repo()
        .ban(target.id, &reason, current.user_id)
        .await?;

    // Server-tracked sessions end immediately; stateless tokens expire on
    // their own but every login from now on is refused.
    state.store().session_repo().delete_for_user(target.id).await?;

    state
        .audit()
        .record(
            current.user_id,
            "BAN_USER",
            Some(target.id),
            json!({ "reason": reason }),
        )
        .await;

    Ok(Json(ApiResponse::success(MessageResponse::new(format!(
        "User {} (UID: {}) has been banned",
        target.username, target.uid
    )))))
}

/// POST /api/admin/unban
pub async fn unban_user(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<UnbanRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let target = state
        .store()
        .user_repo()
        .get_by_id(payload.user_id)
        .await?
        .ok_or_else(ApiError::user_not_found)?;

    state.store().ban_repo().unban(target.id).await?;

    state
        .audit()
        .record(current.user_id, "UNBAN_USER", Some(target.id), json!({}))
        .await;

    Ok(Json(ApiResponse::success(MessageResponse::new(format!(
        "User {} (UID: {}) has been unbanned",
        target.username, target.uid
    )))))
}

/// GET /api/admin/banned
pub async fn list_banned(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<BannedUserDto>>>, ApiError> {
    let store = state.store();
    let bans = store.ban_repo().list().await?;

    let mut out = Vec::with_capacity(bans.len());
    for ban in bans {
        let user = store.user_repo().get_by_id(ban.user_id).await?;
        let banned_by_username = match ban.banned_by {
            Some(id) => store.user_repo().get_by_id(id).await?.map(|u| u.username),
            None => None,
        };

        out.push(BannedUserDto {
            user_id: ban.user_id,
            username: user.as_ref().map(|u| u.username.clone()),
            email: user.as_ref().map(|u| u.email.clone()),
            uid: user.as_ref().map(|u| u.uid),
            reason: ban.reason,
            banned_by_username,
            banned_at: ban.banned_at,
        });
    }

    Ok(Json(ApiResponse::success(out)))
}

/// DELETE /api/admin/users/{id}
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(user_id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    if user_id == current.user_id {
        return Err(ApiError::validation("Cannot delete your own account"));
    }

    let target = state
        .store()
        .user_repo()
        .get_by_id(user_id)
        .await?
        .ok_or_else(ApiError::user_not_found)?;

    if target.is_admin() || target.is_owner() {
        return Err(ApiError::forbidden("Cannot delete admin or owner"));
    }

    state.store().user_repo().delete_cascade(target.id).await?;

    state
        .audit()
        .record(
            current.user_id,
            "DELETE_USER",
            Some(target.id),
            json!({ "username": target.username, "uid": target.uid }),
        )
        .await;

    Ok(Json(ApiResponse::success(MessageResponse::new(format!(
        "User {} (UID: {}) deleted",
        target.username, target.uid
    )))))
}

/// PUT /api/admin/users/{id}/status
pub async fn update_user_status(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(user_id): Path<i32>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    if user_id == current.user_id && payload.is_admin == Some(false) {
        return Err(ApiError::validation("Cannot remove admin from yourself"));
    }

    let target = state
        .store()
        .user_repo()
        .get_by_id(user_id)
        .await?
        .ok_or_else(ApiError::user_not_found)?;

    // The owner's role is immutable through this endpoint; only the
    // verification flag may change.
    let role = if target.is_owner() {
        if payload.is_admin == Some(false) {
            return Err(ApiError::forbidden("Cannot demote owner"));
        }
        None
    } else {
        payload.is_admin.map(|grant| if grant { Role::Admin } else { Role::User })
    };

    let updated = state
        .store()
        .user_repo()
        .set_status(target.id, payload.is_verified, role)
        .await?;

    state
        .audit()
        .record(
            current.user_id,
            "UPDATE_USER_STATUS",
            Some(target.id),
            json!({ "is_verified": payload.is_verified, "is_admin": payload.is_admin }),
        )
        .await;

    Ok(Json(ApiResponse::success(UserDto::from(&updated))))
}

/// POST /api/admin/strip-effects
pub async fn strip_effects(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<StripEffectsRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let target = state
        .store()
        .user_repo()
        .get_by_id(payload.user_id)
        .await?
        .ok_or_else(ApiError::user_not_found)?;

    let stripped = state
        .store()
        .profile_repo()
        .strip(
            target.id,
            payload.strip_background,
            payload.strip_effects,
            payload.strip_audio,
        )
        .await?;

    state
        .audit()
        .record(
            current.user_id,
            "STRIP_EFFECTS",
            Some(target.id),
            json!({ "stripped": stripped }),
        )
        .await;

    Ok(Json(ApiResponse::success(MessageResponse::new(format!(
        "Stripped {} from {} (UID: {})",
        stripped.join(", "),
        target.username,
        target.uid
    )))))
}

// ============================================================================
// Badges
// ============================================================================

/// GET /api/admin/badges
pub async fn list_badges(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<BadgeDto>>>, ApiError> {
    let repo = state.store().badge_repo();
    let badges = repo.list().await?;

    let mut out = Vec::with_capacity(badges.len());
    for badge in badges {
        let assigned_count = repo.assignment_count(badge.id).await?;
        out.push(BadgeDto {
            badge,
            assigned_count,
        });
    }

    Ok(Json(ApiResponse::success(out)))
}

/// POST /api/admin/badges
pub async fn create_badge(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<CreateBadgeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.name.is_empty() || payload.icon.is_empty() {
        return Err(ApiError::validation("Name and icon are required"));
    }

    let repo = state.store().badge_repo();
    if repo.name_taken(&payload.name).await? {
        return Err(ApiError::validation("Badge with this name already exists"));
    }

    let badge = repo
        .create(
            &payload.name,
            payload.description.as_deref().unwrap_or(""),
            &payload.icon,
            payload.color.as_deref().unwrap_or("#059669"),
        )
        .await?;

    state
        .audit()
        .record(
            current.user_id,
            "CREATE_BADGE",
            None,
            json!({ "name": badge.name, "icon": badge.icon, "color": badge.color }),
        )
        .await;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(badge))))
}

/// PUT /api/admin/badges/{id}
pub async fn update_badge(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(badge_id): Path<i32>,
    Json(payload): Json<UpdateBadgeRequest>,
) -> Result<Json<ApiResponse<crate::entities::badges::Model>>, ApiError> {
    let badge = state
        .store()
        .badge_repo()
        .update(
            badge_id,
            payload.name,
            payload.description,
            payload.icon,
            payload.color,
        )
        .await?
        .ok_or_else(|| ApiError::badge_not_found(badge_id))?;

    state
        .audit()
        .record(
            current.user_id,
            "UPDATE_BADGE",
            None,
            json!({ "badge_id": badge_id, "name": badge.name }),
        )
        .await;

    Ok(Json(ApiResponse::success(badge)))
}

/// DELETE /api/admin/badges/{id}
pub async fn delete_badge(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(badge_id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let name = state
        .store()
        .badge_repo()
        .delete(badge_id)
        .await?
        .ok_or_else(|| ApiError::badge_not_found(badge_id))?;

    state
        .audit()
        .record(
            current.user_id,
            "DELETE_BADGE",
            None,
            json!({ "badge_id": badge_id, "name": name }),
        )
        .await;

    Ok(Json(ApiResponse::success(MessageResponse::new(format!(
        "Badge \"{name}\" deleted"
    )))))
}

/// POST /api/admin/users/{id}/badges
pub async fn assign_badge(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(user_id): Path<i32>,
    Json(payload): Json<AssignBadgeRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let store = state.store();

    let target = store
        .user_repo()
        .get_by_id(user_id)
        .await?
        .ok_or_else(ApiError::user_not_found)?;

    let badge = store
        .badge_repo()
        .get(payload.badge_id)
        .await?
        .ok_or_else(|| ApiError::badge_not_found(payload.badge_id))?;

    store
        .badge_repo()
        .assign(target.id, badge.id, current.user_id)
        .await?;

    state
        .audit()
        .record(
            current.user_id,
            "ASSIGN_BADGE",
            Some(target.id),
            json!({ "badge_id": badge.id, "badge_name": badge.name }),
        )
        .await;

    Ok(Json(ApiResponse::success(MessageResponse::new(format!(
        "Badge \"{}\" assigned to {} (UID: {})",
        badge.name, target.username, target.uid
    )))))
}

/// DELETE /api/admin/users/{id}/badges/{badge_id}
pub async fn remove_badge(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path((user_id, badge_id)): Path<(i32, i32)>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let store = state.store();

    let target = store
        .user_repo()
        .get_by_id(user_id)
        .await?
        .ok_or_else(ApiError::user_not_found)?;

    let badge_name = store.badge_repo().get(badge_id).await?.map(|b| b.name);

    store.badge_repo().remove_assignment(target.id, badge_id).await?;

    state
        .audit()
        .record(
            current.user_id,
            "REMOVE_BADGE",
            Some(target.id),
            json!({ "badge_id": badge_id, "badge_name": badge_name }),
        )
        .await;

    Ok(Json(ApiResponse::success(MessageResponse::new(format!(
        "Badge removed from {} (UID: {})",
        target.username, target.uid
    )))))
}

// ============================================================================
// Email
// ============================================================================

/// POST /api/admin/send-email
pub async fn send_email(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<SendEmailRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    if payload.subject.is_empty() || payload.message.is_empty() {
        return Err(ApiError::validation("Subject and message are required"));
    }

    let target = state
        .store()
        .user_repo()
        .get_by_id(payload.user_id)
        .await?
        .ok_or_else(ApiError::user_not_found)?;

    state
        .mailer()
        .send_custom(
            &target.email,
            &target.username,
            &payload.subject,
            &payload.message,
            payload.from_name.as_deref(),
        )
        .await
        .map_err(|e| ApiError::internal(format!("Failed to send email: {e}")))?;

    state
        .audit()
        .record(
            current.user_id,
            "SEND_EMAIL",
            Some(target.id),
            json!({ "subject": payload.subject }),
        )
        .await;

    Ok(Json(ApiResponse::success(MessageResponse::new(format!(
        "Email sent to {} ({})",
        target.username, target.email
    )))))
}

/// POST /api/admin/send-bulk-email
///
/// Sequential, one call per recipient; a failed recipient is skipped and the
/// batch continues. Only the success count is reported.
pub async fn send_bulk_email(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<BulkEmailRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    if payload.subject.is_empty() || payload.message.is_empty() {
        return Err(ApiError::validation("Subject and message are required"));
    }

    let admins_only = payload.filter.as_deref() == Some("admins");
    let recipients = state
        .store()
        .user_repo()
        .list_recipients(admins_only)
        .await?;

    let mut sent = 0u64;
    for user in &recipients {
        match state
            .mailer()
            .send_custom(
                &user.email,
                &user.username,
                &payload.subject,
                &payload.message,
                payload.from_name.as_deref(),
            )
            .await
        {
            Ok(()) => sent += 1,
            Err(e) => warn!(email = %user.email, error = %e, "Bulk email recipient failed"),
        }
    }

    state
        .audit()
        .record(
            current.user_id,
            "SEND_BULK_EMAIL",
            None,
            json!({ "subject": payload.subject, "filter": payload.filter, "sent": sent }),
        )
        .await;

    Ok(Json(ApiResponse::success(MessageResponse::new(format!(
        "Sent {sent} emails"
    )))))
}

// ============================================================================
// Audit log & activity
// ============================================================================

/// GET /api/admin/audit-logs
pub async fn audit_logs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<AuditLogList>>, ApiError> {
    let (page, limit) = validate_page(query.page.unwrap_or(1), query.limit.unwrap_or(50))?;

    let (entries, total) = state.audit().list(page, limit).await?;

    Ok(Json(ApiResponse::success(AuditLogList {
        logs: entries.into_iter().map(AuditLogDto::from).collect(),
        pagination: PaginationDto::new(page, limit, total),
    })))
}

/// GET /api/admin/activity
pub async fn activity(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let store = state.store();

    let recent_users: Vec<UserDto> = store
        .user_repo()
        .recent(10)
        .await?
        .iter()
        .map(UserDto::from)
        .collect();

    let recent_links = store.link_repo().recent(10).await?;
    let recent_badges = store.badge_repo().recent_assignments(10).await?;
    let recent_bans = store.ban_repo().recent(10).await?;

    Ok(Json(ApiResponse::success(json!({
        "recent_users": recent_users,
        "recent_links": recent_links,
        "recent_badges": recent_badges,
        "recent_bans": recent_bans,
    }))))
}
