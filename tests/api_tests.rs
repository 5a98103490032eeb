use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use tower::ServiceExt;

use lynkr::api::{AppState, create_app_state, router};
use lynkr::config::{
    AuthConfig, Config, DatabaseConfig, DiscordConfig, EmailConfig, ServerConfig,
};
use lynkr::entities::verification_codes;
use lynkr::services::{
    DiscordApi, DiscordProfile, Mailer, ProfileFetch, TokenExchange,
};
use lynkr::state::SharedState;

const FRONTEND: &str = "http://frontend.test";

// ============================================================================
// Test doubles
// ============================================================================

/// Captures outbound email instead of sending it.
#[derive(Default)]
struct RecordingMailer {
    pub verification: Mutex<Vec<(String, String)>>,
    pub reset_urls: Mutex<Vec<(String, String)>>,
    pub custom: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_verification(&self, to: &str, _username: &str, code: &str) -> Result<()> {
        self.verification
            .lock()
            .unwrap()
            .push((to.to_string(), code.to_string()));
        Ok(())
    }

    async fn send_welcome(&self, _to: &str, _username: &str, _uid: i64) -> Result<()> {
        Ok(())
    }

    async fn send_password_reset(&self, to: &str, _username: &str, reset_url: &str) -> Result<()> {
        self.reset_urls
            .lock()
            .unwrap()
            .push((to.to_string(), reset_url.to_string()));
        Ok(())
    }

    async fn send_custom(
        &self,
        to: &str,
        _username: &str,
        subject: &str,
        _message: &str,
        _from_name: Option<&str>,
    ) -> Result<()> {
        self.custom
            .lock()
            .unwrap()
            .push((to.to_string(), subject.to_string()));
        Ok(())
    }
}

impl RecordingMailer {
    fn latest_code_for(&self, email: &str) -> Option<String> {
        self.verification
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(to, _)| to == email)
            .map(|(_, code)| code.clone())
    }

    fn latest_reset_url_for(&self, email: &str) -> Option<String> {
        self.reset_urls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(to, _)| to == email)
            .map(|(_, url)| url.clone())
    }
}

/// Stub provider: the code "good-code" exchanges into an access token, and
/// the profile is whatever the test put into the slot.
#[derive(Default)]
struct StubDiscord {
    pub profile: Mutex<Option<DiscordProfile>>,
}

#[async_trait]
impl DiscordApi for StubDiscord {
    fn authorize_url(&self) -> String {
        "https://discord.test/authorize".to_string()
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenExchange> {
        if code == "good-code" {
            Ok(TokenExchange::Granted {
                access_token: "stub-access".to_string(),
            })
        } else {
            Ok(TokenExchange::Denied)
        }
    }

    async fn fetch_profile(&self, _access_token: &str) -> Result<ProfileFetch> {
        Ok(self
            .profile
            .lock()
            .unwrap()
            .clone()
            .map_or(ProfileFetch::Missing, ProfileFetch::Found))
    }
}

// ============================================================================
// Harness
// ============================================================================

fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_allowed_origins: vec!["*".to_string()],
            frontend_url: FRONTEND.to_string(),
        },
        database: DatabaseConfig {
            // A single connection keeps the whole suite on one in-memory db.
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
        },
        auth: AuthConfig {
            jwt_secret: "test-secret".to_string(),
            token_ttl_days: 7,
            owner_secret: "owner-secret".to_string(),
        },
        discord: DiscordConfig {
            client_id: "client-id".to_string(),
            client_secret: "client-secret".to_string(),
            redirect_uri: "http://localhost:3001/api/auth/discord/callback".to_string(),
        },
        email: EmailConfig {
            api_key: String::new(),
            from_address: "no-reply@lynkr.test".to_string(),
            from_name: "lynkr".to_string(),
        },
    }
}

async fn spawn_app() -> (Router, Arc<RecordingMailer>, Arc<StubDiscord>, Arc<AppState>) {
    let mailer = Arc::new(RecordingMailer::default());
    let discord = Arc::new(StubDiscord::default());

    let shared = SharedState::with_collaborators(test_config(), mailer.clone(), discord.clone())
        .await
        .expect("Failed to create app state");

    let state = create_app_state(Arc::new(shared));
    (router(state.clone()), mailer, discord, state)
}

async fn send_json(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
    token: Option<&str>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };

    (status, json)
}

async fn register(
    app: &Router,
    username: &str,
    email: &str,
    password: &str,
) -> (StatusCode, serde_json::Value) {
    send_json(
        app,
        "POST",
        "/api/auth/register",
        Some(serde_json::json!({
            "username": username,
            "email": email,
            "password": password,
        })),
        None,
    )
    .await
}

async fn verify(app: &Router, email: &str, code: &str) -> (StatusCode, serde_json::Value) {
    send_json(
        app,
        "POST",
        "/api/auth/verify",
        Some(serde_json::json!({ "email": email, "code": code })),
        None,
    )
    .await
}

async fn login(app: &Router, username: &str, password: &str) -> (StatusCode, serde_json::Value) {
    send_json(
        app,
        "POST",
        "/api/auth/login",
        Some(serde_json::json!({ "username": username, "password": password })),
        None,
    )
    .await
}

// ============================================================================
// Registration
// ============================================================================

#[tokio::test]
async fn test_register_validation() {
    let (app, _, _, _) = spawn_app().await;

    // 5-character password
    let (status, body) = register(&app, "ab", "ab@example.com", "12345").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Password must be at least 6 characters");

    // Same username, 6-character password
    let (status, _) = register(&app, "ab", "ab@example.com", "123456").await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = register(&app, "has space", "x@example.com", "123456").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = register(&app, "angle<user", "x@example.com", "123456").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = register(&app, "okname", "not-an-email", "123456").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid email address");

    let (status, _) = register(&app, &"x".repeat(51), "y@example.com", "123456").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let (app, _, _, _) = spawn_app().await;

    let (status, _) = register(&app, "sam", "sam@example.com", "123456").await;
    assert_eq!(status, StatusCode::CREATED);

    // Case-insensitive on both fields
    let (status, _) = register(&app, "SAM", "other@example.com", "123456").await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = register(&app, "other", "SAM@EXAMPLE.COM", "123456").await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_first_user_is_owner() {
    let (app, _, _, _) = spawn_app().await;

    let (status, body) = register(&app, "first", "first@example.com", "123456").await;
    assert_eq!(status, StatusCode::CREATED);
    let user = &body["data"]["user"];
    assert_eq!(user["uid"], 1);
    assert_eq!(user["role"], "owner");
    assert_eq!(user["is_admin"], true);
    assert_eq!(user["is_owner"], true);

    let (status, body) = register(&app, "second", "second@example.com", "123456").await;
    assert_eq!(status, StatusCode::CREATED);
    let user = &body["data"]["user"];
    assert_eq!(user["uid"], 2);
    assert_eq!(user["role"], "user");
    assert_eq!(user["is_admin"], false);

    let (_, body) = register(&app, "third", "third@example.com", "123456").await;
    assert_eq!(body["data"]["user"]["uid"], 3);
}

// ============================================================================
// Email verification
// ============================================================================

#[tokio::test]
async fn test_verify_flow() {
    let (app, mailer, _, _) = spawn_app().await;

    register(&app, "sam", "sam@example.com", "123456").await;
    let code = mailer.latest_code_for("sam@example.com").unwrap();
    assert_eq!(code.len(), 6);

    // Unverified login is refused and routes back to verification
    let (status, body) = login(&app, "sam", "123456").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["needs_verification"], true);
    assert_eq!(body["email"], "sam@example.com");

    // Wrong code
    let (status, _) = verify(&app, "sam@example.com", "000000").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Unknown email
    let (status, _) = verify(&app, "ghost@example.com", &code).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Correct code issues a session token
    let (status, body) = verify(&app, "sam@example.com", &code).await;
    assert_eq!(status, StatusCode::OK);
    let token = body["data"]["token"].as_str().unwrap().to_string();
    assert!(!token.is_empty());
    assert_eq!(body["data"]["user"]["is_verified"], true);

    // Codes are consumed: a replay fails
    let (status, _) = verify(&app, "sam@example.com", &code).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Login works now, by username or email, case-insensitively
    let (status, _) = login(&app, "sam", "123456").await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = login(&app, "SAM@Example.Com", "123456").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_resend_code_invalidates_previous() {
    let (app, mailer, _, _) = spawn_app().await;

    register(&app, "sam", "sam@example.com", "123456").await;
    let old_code = mailer.latest_code_for("sam@example.com").unwrap();

    let (status, _) = send_json(
        &app,
        "POST",
        "/api/auth/resend-code",
        Some(serde_json::json!({ "email": "sam@example.com" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let new_code = mailer.latest_code_for("sam@example.com").unwrap();

    // The old code is gone even if it never expired
    if old_code != new_code {
        let (status, _) = verify(&app, "sam@example.com", &old_code).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let (status, _) = verify(&app, "sam@example.com", &new_code).await;
    assert_eq!(status, StatusCode::OK);

    // Already verified now
    let (status, body) = send_json(
        &app,
        "POST",
        "/api/auth/resend-code",
        Some(serde_json::json!({ "email": "sam@example.com" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Email is already verified");

    // Unknown address
    let (status, _) = send_json(
        &app,
        "POST",
        "/api/auth/resend-code",
        Some(serde_json::json!({ "email": "ghost@example.com" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_expired_code_is_rejected() {
    let (app, mailer, _, state) = spawn_app().await;

    let (_, body) = register(&app, "sam", "sam@example.com", "123456").await;
    let user_id = body["data"]["user"]["id"].as_i64().unwrap() as i32;
    let code = mailer.latest_code_for("sam@example.com").unwrap();

    // Force the code to its expiry instant; `verify` must fail at or after it
    let row = verification_codes::Entity::find()
        .filter(verification_codes::Column::UserId.eq(user_id))
        .one(&state.store().conn)
        .await
        .unwrap()
        .unwrap();
    state
        .store()
        .verification_repo()
        .set_code_expiry(row.id, &lynkr::db::now_rfc3339())
        .await
        .unwrap();

    let (status, _) = verify(&app, "sam@example.com", &code).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// Password reset
// ============================================================================

#[tokio::test]
async fn test_forgot_password_is_generic() {
    let (app, mailer, _, _) = spawn_app().await;

    register(&app, "sam", "sam@example.com", "123456").await;

    let (status_known, body_known) = send_json(
        &app,
        "POST",
        "/api/auth/forgot-password",
        Some(serde_json::json!({ "email": "sam@example.com" })),
        None,
    )
    .await;
    let (status_unknown, body_unknown) = send_json(
        &app,
        "POST",
        "/api/auth/forgot-password",
        Some(serde_json::json!({ "email": "ghost@example.com" })),
        None,
    )
    .await;

    // Identical response shape whether or not the email exists
    assert_eq!(status_known, StatusCode::OK);
    assert_eq!(status_unknown, StatusCode::OK);
    assert_eq!(body_known, body_unknown);

    // But only the real address got an email
    assert!(mailer.latest_reset_url_for("sam@example.com").is_some());
    assert!(mailer.latest_reset_url_for("ghost@example.com").is_none());
}

#[tokio::test]
async fn test_reset_password_single_use() {
    let (app, mailer, _, _) = spawn_app().await;

    register(&app, "sam", "sam@example.com", "123456").await;
    let code = mailer.latest_code_for("sam@example.com").unwrap();
    verify(&app, "sam@example.com", &code).await;

    send_json(
        &app,
        "POST",
        "/api/auth/forgot-password",
        Some(serde_json::json!({ "email": "sam@example.com" })),
        None,
    )
    .await;

    let url = mailer.latest_reset_url_for("sam@example.com").unwrap();
    let token = url.split("token=").nth(1).unwrap().to_string();
    assert_eq!(token.len(), 64);

    // Minimum length applies to the new password too
    let (status, _) = send_json(
        &app,
        "POST",
        "/api/auth/reset-password",
        Some(serde_json::json!({ "token": token, "password": "12345" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send_json(
        &app,
        "POST",
        "/api/auth/reset-password",
        Some(serde_json::json!({ "token": token, "password": "new-password" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // First use deleted the row: replay fails
    let (status, body) = send_json(
        &app,
        "POST",
        "/api/auth/reset-password",
        Some(serde_json::json!({ "token": token, "password": "another-pass" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid or expired reset token");

    let (status, _) = login(&app, "sam", "new-password").await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = login(&app, "sam", "123456").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // A made-up token never matches
    let (status, _) = send_json(
        &app,
        "POST",
        "/api/auth/reset-password",
        Some(serde_json::json!({ "token": "f".repeat(64), "password": "123456" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// Sessions
// ============================================================================

#[tokio::test]
async fn test_auth_middleware() {
    let (app, mailer, _, _) = spawn_app().await;

    register(&app, "sam", "sam@example.com", "123456").await;
    let code = mailer.latest_code_for("sam@example.com").unwrap();
    let (_, body) = verify(&app, "sam@example.com", &code).await;
    let token = body["data"]["token"].as_str().unwrap().to_string();

    let (status, _) = send_json(&app, "GET", "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send_json(&app, "GET", "/api/auth/me", None, Some("garbage")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send_json(&app, "GET", "/api/auth/me", None, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"]["username"], "sam");
    assert!(body["data"]["profile"].is_object());

    // Logout clears legacy sessions; the stateless token keeps working until
    // it expires, which is the documented limitation
    let (status, _) = send_json(&app, "POST", "/api/auth/logout", None, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send_json(&app, "GET", "/api/auth/me", None, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_login_is_constant_shape() {
    let (app, mailer, _, _) = spawn_app().await;

    register(&app, "sam", "sam@example.com", "123456").await;
    let code = mailer.latest_code_for("sam@example.com").unwrap();
    verify(&app, "sam@example.com", &code).await;

    // Unknown user and wrong password produce the same error body
    let (status_a, body_a) = login(&app, "ghost", "123456").await;
    let (status_b, body_b) = login(&app, "sam", "wrong-password").await;
    assert_eq!(status_a, StatusCode::UNAUTHORIZED);
    assert_eq!(status_b, StatusCode::UNAUTHORIZED);
    assert_eq!(body_a, body_b);
}

// ============================================================================
// Discord OAuth
// ============================================================================

async fn callback_location(app: &Router, uri: &str) -> String {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_discord_creates_account() {
    let (app, _, discord, _) = spawn_app().await;

    *discord.profile.lock().unwrap() = Some(DiscordProfile {
        id: "d-123".to_string(),
        username: "Disco Fan".to_string(),
        email: None,
        avatar: Some("av".to_string()),
    });

    let location = callback_location(&app, "/api/auth/discord/callback?code=good-code").await;
    assert!(location.starts_with(&format!("{FRONTEND}/auth/callback?token=")));

    let token = location.split("token=").nth(1).unwrap();
    let (status, body) = send_json(&app, "GET", "/api/auth/me", None, Some(token)).await;
    assert_eq!(status, StatusCode::OK);

    let user = &body["data"]["user"];
    // Handle sanitized the way local registration would have demanded
    assert_eq!(user["username"], "discofan");
    // Provider sent no email, so one is synthesized
    assert_eq!(user["email"], "d-123@discord.user");
    // External auth implies a verified address, and first account is owner
    assert_eq!(user["is_verified"], true);
    assert_eq!(user["uid"], 1);
    assert_eq!(user["role"], "owner");

    // A second callback reuses the account instead of duplicating it
    let location = callback_location(&app, "/api/auth/discord/callback?code=good-code").await;
    let token = location.split("token=").nth(1).unwrap();
    let (_, body) = send_json(&app, "GET", "/api/auth/me", None, Some(token)).await;
    assert_eq!(body["data"]["user"]["uid"], 1);
}

#[tokio::test]
async fn test_discord_links_by_email() {
    let (app, mailer, discord, _) = spawn_app().await;

    register(&app, "sam", "sam@example.com", "123456").await;
    let code = mailer.latest_code_for("sam@example.com").unwrap();
    verify(&app, "sam@example.com", &code).await;

    *discord.profile.lock().unwrap() = Some(DiscordProfile {
        id: "d-999".to_string(),
        username: "SamElsewhere".to_string(),
        email: Some("SAM@example.com".to_string()),
        avatar: None,
    });

    let location = callback_location(&app, "/api/auth/discord/callback?code=good-code").await;
    let token = location.split("token=").nth(1).unwrap();
    let (_, body) = send_json(&app, "GET", "/api/auth/me", None, Some(token)).await;

    // Linked, not duplicated: same username and UID, now carrying the id
    let user = &body["data"]["user"];
    assert_eq!(user["username"], "sam");
    assert_eq!(user["uid"], 1);
    assert_eq!(user["discord_id"], "d-999");
}

#[tokio::test]
async fn test_discord_failure_redirects() {
    let (app, _, discord, _) = spawn_app().await;

    let location = callback_location(&app, "/api/auth/discord/callback").await;
    assert_eq!(location, format!("{FRONTEND}/login?error=no_code"));

    let location = callback_location(&app, "/api/auth/discord/callback?code=bad-code").await;
    assert_eq!(location, format!("{FRONTEND}/login?error=token_failed"));

    // Exchange succeeds but the profile comes back without an id
    *discord.profile.lock().unwrap() = None;
    let location = callback_location(&app, "/api/auth/discord/callback?code=good-code").await;
    assert_eq!(location, format!("{FRONTEND}/login?error=user_failed"));
}
