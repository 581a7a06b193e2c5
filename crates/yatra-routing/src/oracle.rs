//! # The Route Oracle Seam
//!
//! [`RouteOracle`] abstracts over whichever routing service a deployment
//! points at. The trait is object-safe (methods return boxed futures) so
//! the tracking reconciler can hold an `Arc<dyn RouteOracle>` and tests can
//! substitute a scripted oracle without any network.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use yatra_core::{GeoPoint, Timestamp};

// ── Route Plan ───────────────────────────────────────────────────────

/// An opaque route between two points, as returned by the oracle.
///
/// The core never interprets the geometry beyond measuring deviation from
/// it; turn-by-turn semantics stay with the oracle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePlan {
    /// Ordered polyline from origin to destination.
    pub points: Vec<GeoPoint>,
    /// Total distance in metres.
    pub distance_m: f64,
    /// Estimated travel time in seconds.
    pub duration_s: f64,
    /// When the plan was fetched from the oracle.
    pub fetched_at: Timestamp,
}

impl RoutePlan {
    /// Age of the plan relative to `now`.
    pub fn age(&self, now: Timestamp) -> chrono::Duration {
        now.since(self.fetched_at)
    }
}

// ── Errors ───────────────────────────────────────────────────────────

/// Errors from route oracle calls.
#[derive(Debug, Error)]
pub enum RouteError {
    /// HTTP transport error after retries were exhausted.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        /// The endpoint that failed.
        endpoint: String,
        /// The underlying transport error.
        source: reqwest::Error,
    },

    /// The oracle returned a non-2xx status.
    #[error("route oracle {endpoint} returned {status}: {body}")]
    Api {
        /// The endpoint that failed.
        endpoint: String,
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// Response deserialization failed.
    #[error("failed to deserialize response from {endpoint}: {source}")]
    Deserialization {
        /// The endpoint whose response was malformed.
        endpoint: String,
        /// The underlying error.
        source: reqwest::Error,
    },

    /// The oracle answered but produced no usable route.
    #[error("no route from {from} to {to}")]
    NoRoute {
        /// Requested origin.
        from: GeoPoint,
        /// Requested destination.
        to: GeoPoint,
    },

    /// The oracle returned geometry with out-of-range coordinates.
    #[error("route geometry invalid: {0}")]
    InvalidGeometry(String),

    /// Client-side configuration error (bad base URL, builder failure).
    #[error("route oracle configuration error: {0}")]
    Config(String),
}

// ── Trait ────────────────────────────────────────────────────────────

/// A boxed future returning a route plan.
pub type PlanFuture<'a> = Pin<Box<dyn Future<Output = Result<RoutePlan, RouteError>> + Send + 'a>>;

/// An external routing service consumed as a black box.
///
/// Implementations must be `Send + Sync` so they can be shared across
/// request handlers behind an `Arc`. The trait is object-safe to support
/// runtime oracle selection and scripted test oracles.
pub trait RouteOracle: Send + Sync {
    /// Request a route from `from` to `to`.
    fn plan(&self, from: GeoPoint, to: GeoPoint) -> PlanFuture<'_>;
}
