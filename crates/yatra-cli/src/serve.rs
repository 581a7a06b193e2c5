//! `yatra serve` — run the dispatch API server.
//!
//! Configuration comes from the environment (same variables as the
//! `yatra-api` binary); flags override the basics.

use std::sync::Arc;

use clap::Args;

use yatra_api::state::{AppConfig, AppState};
use yatra_dispatch::DispatchConfig;
use yatra_routing::{OsrmConfig, OsrmOracle, RouteOracle};

/// Arguments for the `serve` subcommand.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Port to bind (overrides `PORT`).
    #[arg(long)]
    port: Option<u16>,

    /// Expiry sweep period in seconds.
    #[arg(long, default_value_t = 15)]
    sweep_secs: u64,
}

/// Run the `serve` subcommand.
pub fn run_serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = AppConfig::from_env();
    if let Some(port) = args.port {
        config.port = port;
    }
    let dispatch_config = DispatchConfig::from_env();

    let osrm_config = OsrmConfig::from_env();
    tracing::info!(base_url = %osrm_config.base_url, "route oracle configured");
    let oracle: Arc<dyn RouteOracle> = Arc::new(OsrmOracle::new(osrm_config)?);

    let port = config.port;
    let state = AppState::new(dispatch_config, oracle, config);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let _sweep = yatra_api::spawn_expiry_sweep(
            state.coordinator.clone(),
            std::time::Duration::from_secs(args.sweep_secs),
        );

        let app = yatra_api::app(state);
        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
        tracing::info!("Yatra API listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;
        Ok::<(), anyhow::Error>(())
    })
}
