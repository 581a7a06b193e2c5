//! `yatra route fetch` — probe the route oracle directly. A debugging
//! aid: shows exactly what the tracking reconciler would receive.

use clap::{Args, Subcommand};

use yatra_core::GeoPoint;
use yatra_routing::{OsrmConfig, OsrmOracle, RouteOracle};

/// Arguments for the `route` subcommand.
#[derive(Args, Debug)]
pub struct RouteArgs {
    #[command(subcommand)]
    command: RouteCommand,
}

#[derive(Subcommand, Debug)]
enum RouteCommand {
    /// Fetch a route between two coordinates from the oracle.
    Fetch {
        /// Origin latitude.
        #[arg(long)]
        from_lat: f64,
        /// Origin longitude.
        #[arg(long)]
        from_lng: f64,
        /// Destination latitude.
        #[arg(long)]
        to_lat: f64,
        /// Destination longitude.
        #[arg(long)]
        to_lng: f64,
    },
}

/// Run the `route` subcommand.
pub fn run_route(args: RouteArgs) -> anyhow::Result<()> {
    match args.command {
        RouteCommand::Fetch {
            from_lat,
            from_lng,
            to_lat,
            to_lng,
        } => {
            let from = GeoPoint::new(from_lat, from_lng).map_err(|e| anyhow::anyhow!(e.to_string()))?;
            let to = GeoPoint::new(to_lat, to_lng).map_err(|e| anyhow::anyhow!(e.to_string()))?;

            let oracle = OsrmOracle::new(OsrmConfig::from_env())?;
            let runtime = tokio::runtime::Runtime::new()?;
            let plan = runtime.block_on(oracle.plan(from, to))?;

            println!("distance: {:.0} m", plan.distance_m);
            println!("eta:      {:.0} s", plan.duration_s);
            println!("vertices: {}", plan.points.len());
            Ok(())
        }
    }
}
