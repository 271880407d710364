//! auction-gateway server entry point.
//!
//! Starts the Axum HTTP server with the WebSocket and REST endpoints.

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use auction_gateway::api;
use auction_gateway::app_state::AppState;
use auction_gateway::config::GatewayConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config =
        GatewayConfig::from_env().map_err(|err| anyhow::anyhow!("invalid configuration: {err}"))?;
    tracing::info!(addr = %config.listen_addr, "starting auction-gateway");

    // Spawn the session coordinator and build the router
    let app_state = AppState::start(&config);
    let app = api::build_app(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
