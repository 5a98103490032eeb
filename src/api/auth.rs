use axum::{
    Extension, Json,
    extract::{Query, Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use super::validation::{validate_email, validate_password, validate_username};
use super::{ApiError, ApiResponse, AppState, MeResponse, MessageResponse, TokenResponse, UserDto};
use crate::services::oauth::{ProfileFetch, TokenExchange};
use crate::services::token::Claims;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user: UserDto,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    /// Username or email; matched case-insensitively against both.
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct VerifyRequest {
    pub email: String,
    pub code: String,
}

#[derive(Deserialize)]
pub struct ResendCodeRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct CheckOwnerResponse {
    pub is_owner: bool,
}

#[derive(Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
}

/// Request identity derived from a verified bearer token. Inserted into
/// request extensions by `auth_middleware`.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: i32,
    pub username: String,
    pub uid: i64,
    pub is_admin: bool,
}

impl From<Claims> for CurrentUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.user_id,
            username: claims.username,
            uid: claims.uid,
            is_admin: claims.is_admin,
        }
    }
}

// ============================================================================
// Middleware
// ============================================================================

/// Validates `Authorization: Bearer <token>` and populates [`CurrentUser`].
/// Stateless: signature and expiry are the only checks.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .ok_or_else(|| ApiError::Unauthorized("Access token required".to_string()))?;

    let claims = state
        .signer()
        .verify(token)
        .map_err(|_| ApiError::forbidden("Invalid token"))?;

    request.extensions_mut().insert(CurrentUser::from(claims));

    Ok(next.run(request).await)
}

/// Re-checks the stored verification flag, not the token claim; verification
/// status may have changed since the token was issued.
pub async fn require_verified(
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
        .map_err(|e| ApiError::internal(format!("Failed to load user: {e}")))?
        .ok_or_else(ApiError::user_not_found)?;

    if !user.is_verified {
        return Err(ApiError::forbidden("Email verification required"));
    }

    Ok(next.run(request).await)
}

/// Admin gate over the token claim. Owner checks go further and consult
/// storage; see `admin::require_owner`.
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let current = current_user(&request)?;

    if !current.is_admin {
        return Err(ApiError::forbidden("Admin access required"));
    }

    Ok(next.run(request).await)
}

pub(super) fn current_user(request: &Request) -> Result<CurrentUser, ApiError> {
    request
        .extensions()
        .get::<CurrentUser>()
        .cloned()
        .ok_or_else(|| ApiError::Unauthorized("Access token required".to_string()))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.username.is_empty() || payload.email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::validation("All fields are required"));
    }

    validate_username(&payload.username)?;
    validate_email(&payload.email)?;
    validate_password(&payload.password)?;

    let user = state
        .accounts()
        .register(&payload.username, &payload.email, &payload.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(RegisterResponse {
            message: "Registration successful. Please check your email for verification code."
                .to_string(),
            user: UserDto::from(&user),
        })),
    ))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<TokenResponse>>, ApiError> {
    if payload.username.is_empty() || payload.password.is_empty() {
        return Err(ApiError::validation("Username and password are required"));
    }

    let authed = state
        .accounts()
        .login(&payload.username, &payload.password)
        .await?;

    Ok(Json(ApiResponse::success(TokenResponse {
        token: authed.token,
        user: UserDto::from(&authed.user),
    })))
}

/// POST /api/auth/verify
pub async fn verify(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<VerifyRequest>,
) -> Result<Json<ApiResponse<TokenResponse>>, ApiError> {
    if payload.email.is_empty() || payload.code.is_empty() {
        return Err(ApiError::validation(
            "Email and verification code are required",
        ));
    }

    let authed = state
        .accounts()
        .verify_email(&payload.email, &payload.code)
        .await?;

    Ok(Json(ApiResponse::success(TokenResponse {
        token: authed.token,
        user: UserDto::from(&authed.user),
    })))
}

/// POST /api/auth/resend-code
pub async fn resend_code(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ResendCodeRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    if payload.email.is_empty() {
        return Err(ApiError::validation("Email is required"));
    }

    state.accounts().resend_code(&payload.email).await?;

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Verification code sent",
    ))))
}

/// POST /api/auth/forgot-password
///
/// Responds identically whether or not the address is registered.
pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    if payload.email.is_empty() {
        return Err(ApiError::validation("Email is required"));
    }

    state
        .accounts()
        .request_password_reset(&payload.email)
        .await?;

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "If an account with that email exists, a password reset link has been sent.",
    ))))
}

/// POST /api/auth/reset-password
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    if payload.token.is_empty() || payload.password.is_empty() {
        return Err(ApiError::validation("Token and new password are required"));
    }

    state
        .accounts()
        .reset_password(&payload.token, &payload.password)
        .await?;

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Password reset successfully. You can now login with your new password.",
    ))))
}

/// GET /api/auth/me
pub async fn me(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<MeResponse>>, ApiError> {
    let user = state
        .store()
        .user_repo()
        .get_by_id(current.user_id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to load user: {e}")))?
        .ok_or_else(ApiError::user_not_found)?;

    let profile = state
        .store()
        .profile_repo()
        .get_by_user(user.id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to load profile: {e}")))?;

    Ok(Json(ApiResponse::success(MeResponse {
        user: UserDto::from(&user),
        profile,
    })))
}

/// POST /api/auth/logout
///
/// Clears legacy session rows only. The bearer token stays valid until
/// natural expiry; there is no server-side revocation list.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state.accounts().logout(current.user_id).await?;

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Logged out successfully",
    ))))
}

/// GET /api/auth/check-owner
pub async fn check_owner(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<CheckOwnerResponse>>, ApiError> {
    let user = state
        .store()
        .user_repo()
        .get_by_id(current.user_id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to load user: {e}")))?
        .ok_or_else(ApiError::user_not_found)?;

    Ok(Json(ApiResponse::success(CheckOwnerResponse {
        is_owner: user.is_owner(),
    })))
}

/// GET /api/auth/discord
pub async fn discord_start(State(state): State<Arc<AppState>>) -> Redirect {
    if !state.config().discord.is_configured() {
        let url = format!("{}/login?error=oauth_disabled", state.config().server.frontend_url);
        return Redirect::temporary(&url);
    }

    Redirect::temporary(&state.discord().authorize_url())
}

/// Terminal state of one callback invocation. Redirect routing is a pure
/// function of this variant; no error tunnels through as an exception.
enum CallbackOutcome {
    Success { token: String },
    Failure(&'static str),
}

/// GET /api/auth/discord/callback
pub async fn discord_callback(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CallbackQuery>,
) -> Redirect {
    let outcome = callback_flow(&state, query.code).await;
    let frontend = &state.config().server.frontend_url;

    let url = match outcome {
        CallbackOutcome::Success { token } => {
            format!("{frontend}/auth/callback?token={token}")
        }
        CallbackOutcome::Failure(code) => format!("{frontend}/login?error={code}"),
    };

    Redirect::temporary(&url)
}

async fn callback_flow(state: &AppState, code: Option<String>) -> CallbackOutcome {
    let Some(code) = code else {
        return CallbackOutcome::Failure("no_code");
    };

    let access_token = match state.discord().exchange_code(&code).await {
        Ok(TokenExchange::Granted { access_token }) => access_token,
        Ok(TokenExchange::Denied) => return CallbackOutcome::Failure("token_failed"),
        Err(e) => {
            warn!(error = %e, "Discord token exchange failed");
            return CallbackOutcome::Failure("token_failed");
        }
    };

    let profile = match state.discord().fetch_profile(&access_token).await {
        Ok(ProfileFetch::Found(profile)) => profile,
        Ok(ProfileFetch::Missing) => return CallbackOutcome::Failure("user_failed"),
        Err(e) => {
            warn!(error = %e, "Discord profile fetch failed");
            return CallbackOutcome::Failure("user_failed");
        }
    };

    let outcome = match state.linker().resolve(&profile).await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(error = %e, "Discord account resolution failed");
            return CallbackOutcome::Failure("oauth_failed");
        }
    };

    match state.signer().issue(outcome.user()) {
        Ok(token) => CallbackOutcome::Success { token },
        Err(e) => {
            warn!(error = %e, "Failed to sign token after OAuth link");
            CallbackOutcome::Failure("oauth_failed")
        }
    }
}
