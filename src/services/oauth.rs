use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

const DISCORD_AUTHORIZE: &str = "https://discord.com/oauth2/authorize";
const DISCORD_TOKEN: &str = "https://discord.com/api/oauth2/token";
const DISCORD_ME: &str = "https://discord.com/api/users/@me";

/// Outcome of the code-for-token exchange. Providers report failure both as
/// non-2xx and as an error payload with HTTP 200; both collapse to `Denied`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenExchange {
    Granted { access_token: String },
    Denied,
}

/// Outcome of the profile fetch. `Missing` covers any response without an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileFetch {
    Found(DiscordProfile),
    Missing,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DiscordProfile {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    pub avatar: Option<String>,
}

/// Discord surface the callback handler depends on; tests substitute a stub.
#[async_trait]
pub trait DiscordApi: Send + Sync {
    fn authorize_url(&self) -> String;

    async fn exchange_code(&self, code: &str) -> Result<TokenExchange>;

    async fn fetch_profile(&self, access_token: &str) -> Result<ProfileFetch>;
}

pub struct DiscordClient {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl DiscordClient {
    #[must_use]
    pub const fn new(
        client: reqwest::Client,
        client_id: String,
        client_secret: String,
        redirect_uri: String,
    ) -> Self {
        Self {
            client,
            client_id,
            client_secret,
            redirect_uri,
        }
    }
}

#[async_trait]
impl DiscordApi for DiscordClient {
    fn authorize_url(&self) -> String {
        format!(
            "{DISCORD_AUTHORIZE}?client_id={}&redirect_uri={}&response_type=code&scope={}",
            self.client_id,
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode("identify email"),
        )
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenExchange> {
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
        ];

        let response = self
            .client
            .post(DISCORD_TOKEN)
            .form(&params)
            .send()
            .await
            .context("Discord token exchange request failed")?;

        let body: Value = response
            .json()
            .await
            .context("Discord token exchange returned a non-JSON body")?;

        Ok(parse_token_response(&body))
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<ProfileFetch> {
        let response = self
            .client
            .get(DISCORD_ME)
            .bearer_auth(access_token)
            .send()
            .await
            .context("Discord profile request failed")?;

        let body: Value = response
            .json()
            .await
            .context("Discord profile returned a non-JSON body")?;

        Ok(parse_profile_response(&body))
    }
}

/// Extract `access_token` from a token-exchange body. The raw body is never
/// propagated on failure so tokens cannot leak into logs.
#[must_use]
pub fn parse_token_response(body: &Value) -> TokenExchange {
    match body.get("access_token").and_then(Value::as_str) {
        Some(token) if !token.is_empty() => TokenExchange::Granted {
            access_token: token.to_string(),
        },
        _ => TokenExchange::Denied,
    }
}

#[must_use]
pub fn parse_profile_response(body: &Value) -> ProfileFetch {
    let Some(id) = body.get("id").and_then(Value::as_str).filter(|s| !s.is_empty()) else {
        return ProfileFetch::Missing;
    };

    let username = body
        .get("username")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    ProfileFetch::Found(DiscordProfile {
        id: id.to_string(),
        username,
        email: body
            .get("email")
            .and_then(Value::as_str)
            .map(str::to_string),
        avatar: body
            .get("avatar")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}
