use axum::{Extension, Json, extract::State};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::CurrentUser;
use super::{ApiError, ApiResponse, AppState};
use crate::db::repositories::profile::ProfileUpdate;
use crate::entities::profiles;

/// Self-service profile settings. Verified users only; the gate re-reads the
/// stored flag rather than trusting the token claim.
#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub avatar: Option<String>,
    pub accent_color: Option<String>,
    pub text_color: Option<String>,
    pub background_color: Option<String>,
    pub background_effect: Option<String>,
    pub username_effect: Option<String>,
}

/// GET /api/profile
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<profiles::Model>>, ApiError> {
    let profile = state
        .store()
        .profile_repo()
        .get_by_user(current.user_id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to load profile: {e}")))?
        .ok_or_else(|| ApiError::NotFound("Profile not found".to_string()))?;

    Ok(Json(ApiResponse::success(profile)))
}

/// PUT /api/profile
///
/// Absent fields are left untouched; an empty string clears the field.
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<profiles::Model>>, ApiError> {
    let clear_or_set = |v: Option<String>| v.map(|s| if s.is_empty() { None } else { Some(s) });

    let update = ProfileUpdate {
        display_name: clear_or_set(payload.display_name),
        bio: clear_or_set(payload.bio),
        location: clear_or_set(payload.location),
        avatar: clear_or_set(payload.avatar),
        accent_color: clear_or_set(payload.accent_color),
        text_color: clear_or_set(payload.text_color),
        background_color: clear_or_set(payload.background_color),
        background_effect: clear_or_set(payload.background_effect),
        username_effect: clear_or_set(payload.username_effect),
    };

    let profile = state
        .store()
        .profile_repo()
        .update(current.user_id, update)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to update profile: {e}")))?;

    Ok(Json(ApiResponse::success(profile)))
}
