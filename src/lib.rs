pub mod api;
pub mod config;
pub mod db;
pub mod entities;
pub mod scheduler;
pub mod services;
pub mod state;

use std::sync::Arc;

use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

pub use config::Config;
use db::Store;
use state::SharedState;

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

/// Boot the API server: config, storage (migrations included), maintenance
/// jobs, then axum until ctrl-c.
pub async fn run() -> anyhow::Result<()> {
    init_tracing();

    let config = Config::load()?;

    info!("lynkr v{} starting", env!("CARGO_PKG_VERSION"));

    let shared = Arc::new(SharedState::new(config.clone()).await?);

    let _scheduler = scheduler::Maintenance::new(shared.store.clone())
        .start()
        .await?;

    let state = api::create_app_state(shared);
    let app = api::router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("API listening at http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");

    Ok(())
}

/// Apply migrations and exit. Connecting runs them.
pub async fn run_migrations() -> anyhow::Result<()> {
    init_tracing();

    let config = Config::load()?;
    Store::new(&config.database.url).await?;

    info!("Migrations applied");

    Ok(())
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!("Error listening for shutdown: {e}"),
    }
}
