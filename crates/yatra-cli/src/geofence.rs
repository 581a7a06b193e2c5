//! `yatra geofence check` — evaluate the service-area verdict for a
//! coordinate and/or address, exactly as trip creation would.

use anyhow::bail;
use clap::{Args, Subcommand};

use yatra_core::GeoPoint;
use yatra_geo::GeofenceRegion;

/// Arguments for the `geofence` subcommand.
#[derive(Args, Debug)]
pub struct GeofenceArgs {
    #[command(subcommand)]
    command: GeofenceCommand,
}

#[derive(Subcommand, Debug)]
enum GeofenceCommand {
    /// Check whether a location is serviceable.
    Check {
        /// Latitude in decimal degrees.
        #[arg(long, requires = "lng")]
        lat: Option<f64>,
        /// Longitude in decimal degrees.
        #[arg(long, requires = "lat")]
        lng: Option<f64>,
        /// Resolved address text (keyword matching).
        #[arg(long)]
        address: Option<String>,
    },
}

/// Run the `geofence` subcommand.
pub fn run_geofence(args: GeofenceArgs) -> anyhow::Result<()> {
    match args.command {
        GeofenceCommand::Check { lat, lng, address } => {
            let point = match (lat, lng) {
                (Some(lat), Some(lng)) => Some(
                    GeoPoint::new(lat, lng).map_err(|e| anyhow::anyhow!(e.to_string()))?,
                ),
                _ => None,
            };
            if point.is_none() && address.is_none() {
                bail!("provide --lat/--lng, --address, or both");
            }

            let region = GeofenceRegion::bengaluru();
            let verdict = region.is_serviceable(point, address.as_deref());
            if verdict {
                println!("SERVICEABLE ({})", region.name);
                Ok(())
            } else {
                println!("NOT SERVICEABLE ({})", region.name);
                bail!("location is outside the service area")
            }
        }
    }
}
