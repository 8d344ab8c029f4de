//! swcache server entry point.
//!
//! This is the main binary that boots the MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use swcache_client::{FetchClient, FetchConfig, OfflineWorker, UpdateCheck, WorkerConfig, WorkerState};
use swcache_core::{AppConfig, CacheDb};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(origin = %config.origin, db = %config.db_path.display(), "Starting swcache server on stdio transport");

    let db = CacheDb::open(&config.db_path).await?;
    let network = FetchClient::new(FetchConfig::from(&config))?;
    let worker = Arc::new(OfflineWorker::new(WorkerConfig::from_app(&config)?, db.clone(), Arc::new(network)));

    tokio::spawn(reload_on_activation(worker.subscribe()));

    match worker.register().await {
        Ok(registration) => tracing::info!(
            scope = %registration.scope,
            precached = registration.install.precached.len(),
            activated = registration.activate.is_some(),
            "worker registered"
        ),
        Err(err) => tracing::error!(error = %err, "worker registration failed"),
    }

    if let Some(interval) = config.update_interval() {
        tokio::spawn(check_for_updates(Arc::clone(&worker), interval));
    }

    let handler = handler::SwCacheServer::new(worker);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;
    db.close().await?;

    Ok(())
}

/// Pages controlled by the previous instance reload once a new one activates.
async fn reload_on_activation(mut states: watch::Receiver<WorkerState>) {
    while states.changed().await.is_ok() {
        if *states.borrow_and_update() == WorkerState::Activated {
            tracing::info!("worker activated, reloading controlled pages");
        }
    }
}

async fn check_for_updates(worker: Arc<OfflineWorker>, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.tick().await;
    loop {
        ticker.tick().await;
        match worker.update().await {
            Ok(UpdateCheck::UpToDate { .. }) => tracing::debug!("worker up to date"),
            Ok(UpdateCheck::Updated { registration }) => tracing::info!(
                precached = registration.install.precached.len(),
                activated = registration.activate.is_some(),
                "worker updated"
            ),
            Err(err) => tracing::warn!(error = %err, "worker update check failed"),
        }
    }
}
