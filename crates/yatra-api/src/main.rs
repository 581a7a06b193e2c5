//! # yatra-api — Binary Entry Point
//!
//! Starts the Axum HTTP server for the Yatra dispatch stack. Binds to a
//! configurable port (default 8080), wires the route oracle from the
//! environment, and runs the background expiry sweep.

use std::sync::Arc;

use yatra_api::state::{AppConfig, AppState};
use yatra_dispatch::DispatchConfig;
use yatra_routing::{OsrmConfig, OsrmOracle, RouteOracle};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env();
    let dispatch_config = DispatchConfig::from_env();

    // Route oracle from the environment. A down or unconfigured oracle
    // only degrades route plans; tracking keeps working.
    let osrm_config = OsrmConfig::from_env();
    tracing::info!(base_url = %osrm_config.base_url, "route oracle configured");
    let oracle: Arc<dyn RouteOracle> = Arc::new(OsrmOracle::new(osrm_config).map_err(|e| {
        tracing::error!("route oracle initialization failed: {e}");
        e
    })?);

    let port = config.port;
    let state = AppState::new(dispatch_config, oracle, config);

    // Background expiry sweep: offers and searching trips on their TTLs.
    let _sweep = yatra_api::spawn_expiry_sweep(
        state.coordinator.clone(),
        std::time::Duration::from_secs(15),
    );

    let app = yatra_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Yatra API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
