// Machine Inventory - Web Server

use anyhow::{Context, Result};
use machine_inventory::web::{router, AppState};
use machine_inventory::{logging, Config, Inventory, Store, UploadArea};
use std::time::Duration;
use tracing::info;

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for Ctrl+C");
    }
    info!("shutdown requested");
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let config = Config::from_env().context("Invalid configuration")?;

    let store = Store::open(&config.database_path).with_context(|| {
        format!("Failed to open database {}", config.database_path.display())
    })?;
    let state = AppState::new(Inventory::new(store), UploadArea::new(&config.upload_dir));
    let app = router(state.clone());

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    info!(addr = %config.bind_addr, "server running on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Import tasks on the blocking pool can outlive the connections
    let closed = state
        .close(Duration::from_secs(5))
        .await
        .context("Failed to close database")?;
    if !closed {
        tracing::warn!("database still in use at shutdown; it closes when the last task ends");
    }

    info!("server stopped");
    Ok(())
}
