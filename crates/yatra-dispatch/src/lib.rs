#![deny(missing_docs)]

//! # yatra-dispatch — The Dispatch Core
//!
//! Turns a raw trip request into exactly one accepted assignment and keeps
//! the assigned provider's live position reconciled against a planned
//! route. Four pieces, layered over the state machines in `yatra-state`:
//!
//! - [`TripStore`] — the single source of truth. Every mutation of one
//!   trip runs under that trip's shard guard; cross-trip operations are
//!   fully parallel. No global lock.
//! - [`DispatchEngine`] — eligibility selection, offer broadcast, and the
//!   first-accept-wins race.
//! - [`TrackingReconciler`] — position report ingestion, proximity
//!   transitions, and best-effort route refresh against the external
//!   oracle (never while holding a trip guard).
//! - [`TripLifecycleCoordinator`] — the façade the API layer talks to:
//!   creation (with geofence validation), cancellation, manual progress,
//!   polling reads, and the expiry sweep.
//!
//! The only process-wide state besides the stores is [`DispatchConfig`],
//! built once at startup and immutable thereafter.

pub mod config;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod registry;
pub mod store;
pub mod tracking;

pub use config::{DispatchConfig, ExhaustionPolicy};
pub use coordinator::{NewTrip, SweepReport, TripLifecycleCoordinator};
pub use engine::DispatchEngine;
pub use error::DispatchError;
pub use registry::{ProviderRecord, ProviderRegistry};
pub use store::{TripRecord, TripStore};
pub use tracking::{ProviderPosition, TrackingReconciler, TrackingSnapshot};
