use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{delete, get, post, put},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::state::SharedState;

pub mod admin;
pub mod auth;
mod error;
pub mod profile;
mod types;
mod validation;

pub use error::ApiError;
pub use types::*;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub start_time: std::time::Instant,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &crate::db::Store {
        &self.shared.store
    }

    #[must_use]
    pub fn signer(&self) -> &crate::services::TokenSigner {
        &self.shared.signer
    }

    #[must_use]
    pub fn mailer(&self) -> &Arc<dyn crate::services::Mailer> {
        &self.shared.mailer
    }

    #[must_use]
    pub fn discord(&self) -> &Arc<dyn crate::services::DiscordApi> {
        &self.shared.discord
    }

    #[must_use]
    pub fn accounts(&self) -> &Arc<dyn crate::services::AccountService> {
        &self.shared.accounts
    }

    #[must_use]
    pub fn linker(&self) -> &crate::services::LinkService {
        &self.shared.linker
    }

    #[must_use]
    pub fn audit(&self) -> &crate::services::AuditService {
        &self.shared.audit
    }
}

#[must_use]
pub fn create_app_state(shared: Arc<SharedState>) -> Arc<AppState> {
    Arc::new(AppState {
        shared,
        start_time: std::time::Instant::now(),
    })
}

pub async fn create_app_state_from_config(config: Config) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    Ok(create_app_state(shared))
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.config().server.cors_allowed_origins.clone();

    // Owner endpoints check storage, not the token; the verify ritual only
    // needs a valid session.
    let owner_routes = Router::new()
        .route("/owner/grant-admin", post(admin::grant_admin))
        .route("/owner/revoke-admin", post(admin::revoke_admin))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            admin::require_owner,
        ));

    let admin_routes = Router::new()
        .route("/stats", get(admin::stats))
        .route("/users", get(admin::list_users))
        .route("/users/uid/{uid}", get(admin::get_user_by_uid))
        .route("/users/{id}", get(admin::get_user))
        .route("/users/{id}", delete(admin::delete_user))
        .route("/users/{id}/status", put(admin::update_user_status))
        .route("/users/{id}/badges", post(admin::assign_badge))
        .route("/users/{id}/badges/{badge_id}", delete(admin::remove_badge))
        .route("/ban", post(admin::ban_user))
        .route("/unban", post(admin::unban_user))
        .route("/banned", get(admin::list_banned))
        .route("/badges", get(admin::list_badges))
        .route("/badges", post(admin::create_badge))
        .route("/badges/{id}", put(admin::update_badge))
        .route("/badges/{id}", delete(admin::delete_badge))
        .route("/send-email", post(admin::send_email))
        .route("/send-bulk-email", post(admin::send_bulk_email))
        .route("/strip-effects", post(admin::strip_effects))
        .route("/audit-logs", get(admin::audit_logs))
        .route("/activity", get(admin::activity))
        .route_layer(middleware::from_fn(auth::require_admin));

    let admin_router = Router::new()
        .route("/owner/verify", post(admin::owner_verify))
        .merge(owner_routes)
        .merge(admin_routes);

    let profile_routes = Router::new()
        .route(
            "/profile",
            get(profile::get_profile).put(profile::update_profile),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_verified,
        ));

    let protected = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/check-owner", get(auth::check_owner))
        .merge(profile_routes)
        .nest("/admin", admin_router)
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    let api_router = Router::new()
        .merge(protected)
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/verify", post(auth::verify))
        .route("/auth/resend-code", post(auth::resend_code))
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route("/auth/reset-password", post(auth::reset_password))
        .route("/auth/discord", get(auth::discord_start))
        .route("/auth/discord/callback", get(auth::discord_callback))
        .with_state(state);

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api", api_router)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}
