//! # Route Plan Cache
//!
//! Plans are cached under a tolerance-grid key: origin and destination are
//! quantized to a configurable grid (degrees), so a provider drifting a few
//! metres between polls keeps hitting the same entry. Entries go stale
//! after a TTL; stale entries are replaced on the next successful fetch
//! rather than evicted eagerly.

use chrono::Duration;
use dashmap::DashMap;

use yatra_core::{GeoPoint, Timestamp};

use crate::oracle::RoutePlan;

// ── Grid Key ─────────────────────────────────────────────────────────

/// A quantized (origin, destination) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridKey {
    from_lat: i64,
    from_lng: i64,
    to_lat: i64,
    to_lng: i64,
}

impl GridKey {
    /// Quantize an (origin, destination) pair onto a `grid_deg` grid.
    pub fn new(from: GeoPoint, to: GeoPoint, grid_deg: f64) -> Self {
        let q = |v: f64| (v / grid_deg).round() as i64;
        Self {
            from_lat: q(from.lat),
            from_lng: q(from.lng),
            to_lat: q(to.lat),
            to_lng: q(to.lng),
        }
    }
}

// ── Cache ────────────────────────────────────────────────────────────

/// Thread-safe, cloneable route plan cache.
///
/// Sharded locking via `DashMap`: concurrent trips with different keys
/// never contend. Reads clone the plan out — polylines are small and the
/// snapshot semantics keep readers independent of later refreshes.
#[derive(Debug, Clone)]
pub struct RouteCache {
    plans: std::sync::Arc<DashMap<GridKey, RoutePlan>>,
    grid_deg: f64,
    ttl: Duration,
}

impl RouteCache {
    /// Create a cache with the given quantization grid and entry TTL.
    pub fn new(grid_deg: f64, ttl: Duration) -> Self {
        Self {
            plans: std::sync::Arc::new(DashMap::new()),
            grid_deg,
            ttl,
        }
    }

    /// The cache key for an (origin, destination) pair.
    pub fn key(&self, from: GeoPoint, to: GeoPoint) -> GridKey {
        GridKey::new(from, to, self.grid_deg)
    }

    /// A fresh (within-TTL) plan for the pair, if cached.
    pub fn get_fresh(&self, from: GeoPoint, to: GeoPoint, now: Timestamp) -> Option<RoutePlan> {
        let key = self.key(from, to);
        let entry = self.plans.get(&key)?;
        if entry.value().age(now) <= self.ttl {
            Some(entry.value().clone())
        } else {
            None
        }
    }

    /// Store a plan for the pair, replacing any previous entry.
    pub fn insert(&self, from: GeoPoint, to: GeoPoint, plan: RoutePlan) {
        self.plans.insert(self.key(from, to), plan);
    }

    /// Number of cached entries (fresh or stale).
    pub fn len(&self) -> usize {
        self.plans.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }
}
