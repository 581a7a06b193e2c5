#![deny(missing_docs)]

//! # yatra-routing — Route Oracle Client & Plan Cache
//!
//! The dispatch core does not compute road routes. It consumes an external
//! routing oracle (an OSRM-compatible HTTP service) and treats the result
//! as an opaque [`RoutePlan`]: an ordered polyline plus distance and ETA.
//!
//! ## Failure posture
//!
//! Oracle failures are never fatal to tracking. The client retries
//! transport errors with bounded exponential backoff; anything that still
//! fails is surfaced as a [`RouteError`] for the caller to degrade on —
//! position reports keep flowing with or without a fresh plan.
//!
//! ## Caching
//!
//! Plans are cached under a tolerance-grid key of (origin, destination) so
//! a provider creeping along a road does not hammer the oracle: positions
//! within the same grid cell share a plan until its TTL lapses.

pub mod cache;
pub mod oracle;
pub mod osrm;
mod retry;

pub use cache::{GridKey, RouteCache};
pub use oracle::{PlanFuture, RouteError, RouteOracle, RoutePlan};
pub use osrm::{OsrmConfig, OsrmOracle};
