//! `pantry-syncd`: keeps the local pantry cache in sync with the pantry API.

use std::sync::Arc;

use anyhow::Context;
use pantry_sync::{HttpRemoteStore, OfflineMode, Pantry, SyncConfig, SyncWorker};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pantry_observability::init();

    let config = SyncConfig::from_env().context("invalid configuration")?;
    tracing::info!(
        api_url = %config.api_url,
        db_path = ?config.db_path,
        interval_secs = config.sync_interval.as_secs(),
        authenticated = config.auth_token.is_some(),
        "Starting pantry sync daemon"
    );

    let pantry = Arc::new(Pantry::open(&config, OfflineMode::new()).await?);
    let health = Arc::new(HttpRemoteStore::from_config(&config).context("failed to build HTTP client")?);

    let worker = SyncWorker::new(pantry.clone(), health, config.sync_interval);
    let handle = worker.start();

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    tracing::info!("Shutdown requested");

    handle.stop().await;

    let status = pantry.status().await;
    if status.pending_items + status.pending_purchases > 0 {
        tracing::warn!(
            "Exiting with {} items and {} purchases not yet synced",
            status.pending_items,
            status.pending_purchases
        );
    }
    Ok(())
}
