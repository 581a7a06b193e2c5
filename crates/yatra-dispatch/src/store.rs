//! # The Trip Record Store
//!
//! The single source of truth. Keyed by trip id over a sharded map
//! (`DashMap`), so mutation of one trip serializes on that trip's shard
//! guard while unrelated trips proceed in parallel — per-trip mutual
//! exclusion without a global lock.
//!
//! [`TripStore::with_trip`] is the only mutation path: a closure runs
//! read-validate-update under the guard, which is what makes the compound
//! accept (offer decided + siblings expired + trip transitioned +
//! assignment recorded) one linearizable step.
//!
//! ## Locking invariant
//!
//! A `with_trip` closure must never touch another trip or block on I/O.
//! Route oracle calls happen strictly outside the guard (see
//! `tracking::TrackingReconciler`), with the guard re-acquired only to
//! commit the result.

use std::sync::Arc;

use dashmap::DashMap;

use yatra_core::{OfferId, ProviderId, RequesterId, TripId};
use yatra_routing::RoutePlan;
use yatra_state::{Offer, Trip, TripPhase};

use crate::tracking::ProviderPosition;

// ── Record ───────────────────────────────────────────────────────────

/// A trip plus its ephemeral tracking state.
///
/// The [`Trip`] inside is the durable lifecycle record; position and route
/// are latest-only caches that exist so polling reads never need a network
/// call.
#[derive(Debug, Clone, PartialEq)]
pub struct TripRecord {
    /// The trip lifecycle record.
    pub trip: Trip,
    /// Latest provider position. Superseded by each newer report; no
    /// history is retained.
    pub live: Option<ProviderPosition>,
    /// Latest committed route plan, if any.
    pub route: Option<RoutePlan>,
    /// Whether the last route refresh attempt failed (the oracle is
    /// degraded); tracking keeps functioning regardless.
    pub route_degraded: bool,
}

impl TripRecord {
    /// Wrap a freshly created trip.
    pub fn new(trip: Trip) -> Self {
        Self {
            trip,
            live: None,
            route: None,
            route_degraded: false,
        }
    }
}

// ── Store ────────────────────────────────────────────────────────────

/// Thread-safe, cloneable trip store with per-trip mutual exclusion.
#[derive(Debug, Clone, Default)]
pub struct TripStore {
    trips: Arc<DashMap<TripId, TripRecord>>,
    /// Secondary index so offer-keyed operations resolve to the owning
    /// trip without scanning.
    offer_index: Arc<DashMap<OfferId, TripId>>,
}

impl TripStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a newly created trip.
    pub fn insert(&self, trip: Trip) {
        self.trips.insert(trip.id(), TripRecord::new(trip));
    }

    /// Register offers in the offer → trip index.
    pub fn index_offers(&self, offers: &[Offer]) {
        for offer in offers {
            self.offer_index.insert(offer.id, offer.trip_id);
        }
    }

    /// The trip owning an offer, if the offer is known.
    pub fn trip_id_for_offer(&self, offer_id: OfferId) -> Option<TripId> {
        self.offer_index.get(&offer_id).map(|e| *e.value())
    }

    /// Snapshot a record by trip id.
    pub fn get(&self, trip_id: TripId) -> Option<TripRecord> {
        self.trips.get(&trip_id).map(|e| e.value().clone())
    }

    /// Atomically read-validate-update one trip.
    ///
    /// The closure runs under the trip's shard guard: it may inspect the
    /// record, validate preconditions, mutate, and return `Ok(R)` or
    /// `Err(E)`. Returns `None` when the trip does not exist.
    pub fn with_trip<R, E>(
        &self,
        trip_id: TripId,
        f: impl FnOnce(&mut TripRecord) -> Result<R, E>,
    ) -> Option<Result<R, E>> {
        self.trips.get_mut(&trip_id).map(|mut e| f(e.value_mut()))
    }

    /// All trip ids currently in the store.
    pub fn trip_ids(&self) -> Vec<TripId> {
        self.trips.iter().map(|e| *e.key()).collect()
    }

    /// A requester's trips, newest first.
    pub fn trips_for_requester(&self, requester_id: RequesterId) -> Vec<Trip> {
        let mut trips: Vec<Trip> = self
            .trips
            .iter()
            .filter(|e| e.value().trip.request.requester_id == requester_id)
            .map(|e| e.value().trip.clone())
            .collect();
        trips.sort_by(|a, b| b.request.created_at.cmp(&a.request.created_at));
        trips
    }

    /// A provider's pending offers across all searching trips, newest
    /// first. This is the provider poll payload.
    pub fn pending_offers_for(&self, provider_id: ProviderId) -> Vec<Offer> {
        let mut offers: Vec<Offer> = self
            .trips
            .iter()
            .filter(|e| e.value().trip.phase == TripPhase::Searching)
            .flat_map(|e| {
                e.value()
                    .trip
                    .offers
                    .iter()
                    .filter(|o| o.provider_id == provider_id && o.is_pending())
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect();
        offers.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        offers
    }

    /// Number of trips in the store.
    pub fn len(&self) -> usize {
        self.trips.len()
    }

    /// Whether the store holds no trips.
    pub fn is_empty(&self) -> bool {
        self.trips.is_empty()
    }
}

// ── Tests ────────────────────────────────────────────────────────────
