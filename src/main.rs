//! EdenOS MCP Server Hub entry point
//!
//! Boots logging, builds the hub from environment configuration, starts
//! the local event gateway, and runs until interrupted.

use eden_hub::{Hub, HubConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    eden_hub::logging::init();

    let config = HubConfig::from_env();
    tracing::info!("[main] Starting hub with data dir {}", config.data_dir.display());

    let hub = Hub::new(config)?;

    match hub.start_gateway() {
        Ok(addr) => tracing::info!("[main] Event gateway on ws://{}", addr),
        Err(e) => tracing::error!("[main] Gateway unavailable: {}", e),
    }

    hub.emit(
        eden_hub::core::events::SYSTEM_STARTED,
        serde_json::json!({ "component": "hub" }),
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("[main] Shutting down");
    hub.stop_gateway();

    Ok(())
}
