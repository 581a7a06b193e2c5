//! # yatra CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.
//! Uses clap derive macros for argument parsing.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use yatra_cli::geofence::{run_geofence, GeofenceArgs};
use yatra_cli::route::{run_route, RouteArgs};
use yatra_cli::serve::{run_serve, ServeArgs};

/// Yatra dispatch stack CLI.
///
/// Runs the dispatch API server and provides operator utilities for the
/// geofence and the route oracle.
#[derive(Parser, Debug)]
#[command(name = "yatra", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the dispatch API server.
    Serve(ServeArgs),

    /// Service-area geofence utilities.
    Geofence(GeofenceArgs),

    /// Route oracle utilities.
    Route(RouteArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity level; RUST_LOG wins when set.
    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let result = match cli.command {
        Commands::Serve(args) => run_serve(args),
        Commands::Geofence(args) => run_geofence(args),
        Commands::Route(args) => run_route(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
