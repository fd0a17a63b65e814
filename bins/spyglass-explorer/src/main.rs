mod blockchain;
mod config;
mod miners;
mod routes;
mod store;
mod tokens;
mod users;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use spyglass_chain::{ChainConfig, ConnectionManager, Dispatcher, Supervisor};

use crate::miners::Miner;
use crate::store::JsonStore;
use crate::users::User;

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub users: Arc<JsonStore<User>>,
    pub miners: Arc<JsonStore<Miner>>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let chain_config = ChainConfig::from_env().context("invalid chain configuration")?;
    let config = config::Config::from_env().context("invalid explorer configuration")?;

    info!(
        node = %chain_config.rpc_endpoint,
        chain = %chain_config.chain_id,
        bind = %config.bind_addr,
        data = %config.data_dir.display(),
        "Starting spyglass-explorer"
    );

    let users = Arc::new(JsonStore::open(config.data_dir.join("users.json")));
    let miners = Arc::new(JsonStore::open(config.data_dir.join("miners.json")));

    let manager = Arc::new(ConnectionManager::new(chain_config));
    if manager.reconnect().await.is_none() {
        warn!("node unreachable at startup; serving synthetic data until it appears");
    }
    let supervisor = Supervisor::spawn(manager.clone());

    let state = AppState { dispatcher: Dispatcher::new(manager.clone()), users, miners };
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("cannot bind {}", config.bind_addr))?;
    info!("Explorer listening on http://{}", config.bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    supervisor.shutdown();
    manager.disconnect().await;
    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    info!("shutdown signal received");
}
