//! # Dispatch Configuration
//!
//! Process-wide, immutable after startup. Everything tunable about the
//! core lives here: the geofence, proximity radius, TTLs, route staleness
//! thresholds, and the offer exhaustion policy.

use chrono::Duration;

use yatra_geo::GeofenceRegion;

/// What dispatch does when the last pending offer for a searching trip is
/// rejected or expires.
///
/// This is an explicit configuration point, not an implicit default: a
/// trip out of offers stays `SEARCHING` either way and is never
/// auto-cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExhaustionPolicy {
    /// Do nothing; the trip waits until its search TTL expires it.
    WaitForExpiry,
    /// Immediately fan out to the currently-available eligible set, at
    /// most `max_rounds` total dispatch rounds per trip.
    Rebroadcast {
        /// Upper bound on dispatch rounds (initial broadcast included).
        max_rounds: u32,
    },
}

/// Immutable dispatch core configuration.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// The serviceable region.
    pub geofence: GeofenceRegion,
    /// Radius around the pickup point that triggers the proximity
    /// transition, in metres.
    pub pickup_radius_m: f64,
    /// How long a trip may stay `SEARCHING` before it expires.
    pub search_ttl: Duration,
    /// How long an offer may stay `PENDING` before it expires.
    /// Deliberately much shorter than `search_ttl` so dispatch can
    /// re-broadcast without waiting for the whole trip to expire.
    pub offer_ttl: Duration,
    /// How long a cached route plan stays fresh.
    pub route_ttl: Duration,
    /// Lateral deviation from the planned route that forces a refresh,
    /// in metres.
    pub route_deviation_m: f64,
    /// Quantization grid for the route cache key, in degrees.
    pub route_grid_deg: f64,
    /// What to do when a searching trip runs out of pending offers.
    pub exhaustion: ExhaustionPolicy,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            geofence: GeofenceRegion::bengaluru(),
            pickup_radius_m: 150.0,
            search_ttl: Duration::minutes(15),
            offer_ttl: Duration::seconds(90),
            route_ttl: Duration::seconds(60),
            route_deviation_m: 250.0,
            route_grid_deg: 1e-3,
            exhaustion: ExhaustionPolicy::WaitForExpiry,
        }
    }
}

impl DispatchConfig {
    /// Build configuration from the environment, falling back to defaults.
    ///
    /// Recognized variables: `YATRA_PICKUP_RADIUS_M`,
    /// `YATRA_SEARCH_TTL_SECS`, `YATRA_OFFER_TTL_SECS`,
    /// `YATRA_ROUTE_TTL_SECS`, `YATRA_ROUTE_DEVIATION_M`,
    /// `YATRA_ROUTE_GRID_DEG`, and `YATRA_REBROADCAST_ROUNDS` (0 or unset
    /// selects [`ExhaustionPolicy::WaitForExpiry`]).
    pub fn from_env() -> Self {
        fn parse<T: std::str::FromStr>(var: &str) -> Option<T> {
            std::env::var(var).ok().and_then(|v| v.parse().ok())
        }

        let defaults = Self::default();
        let rebroadcast_rounds: u32 = parse("YATRA_REBROADCAST_ROUNDS").unwrap_or(0);
        Self {
            geofence: defaults.geofence,
            pickup_radius_m: parse("YATRA_PICKUP_RADIUS_M").unwrap_or(defaults.pickup_radius_m),
            search_ttl: parse("YATRA_SEARCH_TTL_SECS")
                .map(Duration::seconds)
                .unwrap_or(defaults.search_ttl),
            offer_ttl: parse("YATRA_OFFER_TTL_SECS")
                .map(Duration::seconds)
                .unwrap_or(defaults.offer_ttl),
            route_ttl: parse("YATRA_ROUTE_TTL_SECS")
                .map(Duration::seconds)
                .unwrap_or(defaults.route_ttl),
            route_deviation_m: parse("YATRA_ROUTE_DEVIATION_M").unwrap_or(defaults.route_deviation_m),
            route_grid_deg: parse("YATRA_ROUTE_GRID_DEG").unwrap_or(defaults.route_grid_deg),
            exhaustion: if rebroadcast_rounds > 0 {
                ExhaustionPolicy::Rebroadcast {
                    max_rounds: rebroadcast_rounds,
                }
            } else {
                defaults.exhaustion
            },
        }
    }
}
