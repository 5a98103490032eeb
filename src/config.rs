use std::env;
use std::fmt::Display;
use std::str::FromStr;

use tracing::warn;

/// Process configuration, read from the environment (a `.env` file is loaded
/// first when present). Every collaborator secret lives here: database URL,
/// token-signing key, OAuth client, email provider key, owner bootstrap
/// secret.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub discord: DiscordConfig,
    pub email: EmailConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// `*` allows any origin.
    pub cors_allowed_origins: Vec<String>,
    /// Base URL the OAuth callback and reset links redirect to.
    pub frontend_url: String,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_days: i64,
    pub owner_secret: String,
}

#[derive(Debug, Clone)]
pub struct DiscordConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

impl DiscordConfig {
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// Empty disables outbound email (codes are still issued and logged).
    pub api_key: String,
    pub from_address: String,
    pub from_name: String,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let jwt_secret = env::var("JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() {
            warn!("JWT_SECRET not set; using an insecure development default");
        }

        Ok(Self {
            server: ServerConfig {
                host: try_load("HOST", "0.0.0.0"),
                port: try_load("PORT", "3001"),
                cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| "*".to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                frontend_url: try_load("FRONTEND_URL", "http://localhost:5173"),
            },
            database: DatabaseConfig {
                url: try_load("DATABASE_URL", "sqlite:data/lynkr.db"),
                max_connections: try_load("DB_MAX_CONNECTIONS", "5"),
                min_connections: try_load("DB_MIN_CONNECTIONS", "1"),
            },
            auth: AuthConfig {
                jwt_secret: if jwt_secret.is_empty() {
                    "insecure-dev-secret".to_string()
                } else {
                    jwt_secret
                },
                token_ttl_days: try_load("TOKEN_TTL_DAYS", "7"),
                owner_secret: try_load("OWNER_SECRET", "change-me-owner-secret"),
            },
            discord: DiscordConfig {
                client_id: env::var("DISCORD_CLIENT_ID").unwrap_or_default(),
                client_secret: env::var("DISCORD_CLIENT_SECRET").unwrap_or_default(),
                redirect_uri: try_load(
                    "DISCORD_REDIRECT_URI",
                    "http://localhost:3001/api/auth/discord/callback",
                ),
            },
            email: EmailConfig {
                api_key: env::var("RESEND_API_KEY").unwrap_or_default(),
                from_address: try_load("EMAIL_FROM", "no-reply@lynkr.local"),
                from_name: try_load("EMAIL_FROM_NAME", "lynkr"),
            },
        })
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());

    raw.parse().unwrap_or_else(|e| {
        warn!("Invalid {key} value ({e}); falling back to default");
        default
            .parse()
            .unwrap_or_else(|_| panic!("Default for {key} must parse"))
    })
}
