use std::sync::Arc;

use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AccountService, AuditService, DiscordApi, DiscordClient, LinkService, Mailer, NoopMailer,
    ResendMailer, SeaOrmAccountService, TokenSigner,
};

/// Build a shared HTTP client for every outbound call (OAuth exchange, email
/// provider). Reuse enables connection pooling.
fn build_shared_http_client(timeout_seconds: u64) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_seconds))
        .user_agent("Lynkr/1.0")
        .pool_max_idle_per_host(10)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build shared HTTP client: {e}"))
}

/// Lifecycle-scoped resources handed to every handler. Nothing here is a
/// process-wide singleton, which keeps test doubles straightforward.
#[derive(Clone)]
pub struct SharedState {
    pub config: Config,

    pub store: Store,

    pub signer: TokenSigner,

    pub mailer: Arc<dyn Mailer>,

    pub discord: Arc<dyn DiscordApi>,

    pub accounts: Arc<dyn AccountService>,

    pub linker: LinkService,

    pub audit: AuditService,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let http_client = build_shared_http_client(30)?;

        let mailer: Arc<dyn Mailer> = if config.email.api_key.is_empty() {
            Arc::new(NoopMailer)
        } else {
            Arc::new(ResendMailer::new(
                http_client.clone(),
                config.email.api_key.clone(),
                config.email.from_address.clone(),
                config.email.from_name.clone(),
            ))
        };

        let discord: Arc<dyn DiscordApi> = Arc::new(DiscordClient::new(
            http_client,
            config.discord.client_id.clone(),
            config.discord.client_secret.clone(),
            config.discord.redirect_uri.clone(),
        ));

        Self::with_collaborators(config, mailer, discord).await
    }

    /// Same wiring with injectable collaborators; integration tests pass a
    /// capturing mailer and a stub Discord API.
    pub async fn with_collaborators(
        config: Config,
        mailer: Arc<dyn Mailer>,
        discord: Arc<dyn DiscordApi>,
    ) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.database.url,
            config.database.max_connections,
            config.database.min_connections,
        )
        .await?;

        let signer = TokenSigner::new(
            config.auth.jwt_secret.as_bytes(),
            config.auth.token_ttl_days,
        );

        let accounts: Arc<dyn AccountService> = Arc::new(SeaOrmAccountService::new(
            store.clone(),
            signer.clone(),
            mailer.clone(),
            config.server.frontend_url.clone(),
        ));

        let linker = LinkService::new(store.clone());
        let audit = AuditService::new(store.clone());

        Ok(Self {
            config,
            store,
            signer,
            mailer,
            discord,
            accounts,
            linker,
            audit,
        })
    }
}
