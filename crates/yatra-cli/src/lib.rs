#![deny(missing_docs)]

//! # yatra-cli — Operator CLI
//!
//! Subcommand handlers for the `yatra` binary. Each module exposes an
//! `Args` struct (clap derive) and a `run_*` entry point returning
//! `anyhow::Result<()>`; the binary maps errors to exit codes.

pub mod geofence;
pub mod route;
pub mod serve;
