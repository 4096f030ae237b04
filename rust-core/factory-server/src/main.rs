//! # Factory
//!
//! Process bootstrap: tracing, configuration from the environment, metadata
//! store connection, registry load, catalog build, serve.
//!
//! Any failure before the server starts listening is fatal.

use anyhow::Context;
use factory_core::{
    echo_handler, AppState, DatabasePool, LoggingMiddleware, Registry, Server, ServerConfig,
    StoreConfig,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("factory=info,factory_core=info"))
        .context("invalid RUST_LOG filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;

    let server_config = ServerConfig::from_env().context("invalid server configuration")?;
    let store_config = StoreConfig::from_env().context("invalid store configuration")?;

    info!(version = factory_core::VERSION, "Starting the Factory");

    let store = DatabasePool::connect(&store_config.database_url, store_config.max_connections)
        .await
        .context("failed to connect to the metadata store")?;
    if store_config.migrate {
        store
            .migrate()
            .await
            .context("failed to create the metadata schema")?;
    }

    let registry = Registry::load(&store)
        .await
        .context("failed to load the metadata registry")?;
    let state = AppState::new(Arc::new(registry), store.clone(), echo_handler())
        .context("failed to build the route catalog")?;

    let mut server = Server::new(server_config, Arc::new(state));
    server.add_middleware(LoggingMiddleware::new());

    let served = server.serve().await.context("server failed");
    store.close().await;
    info!("Factory stopped");
    served
}
