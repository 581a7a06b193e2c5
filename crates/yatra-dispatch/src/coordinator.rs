//! # The Trip Lifecycle Coordinator
//!
//! The façade external callers talk to. Owns creation (geofence
//! validation per category, persist in `SEARCHING`, delegate to the
//! dispatch engine), requester cancellation, provider progress updates,
//! the polling reads, and the expiry sweep.
//!
//! Everything here is a thin orchestration over the store's per-trip
//! guard; the state machine inside `yatra-state` remains the only place
//! transitions are validated.

use std::sync::Arc;

use yatra_core::{
    GeoPoint, ProviderId, RequesterId, TimeWindow, Timestamp, TripCategory, TripId,
    ValidationError, VehicleClass,
};
use yatra_geo::GeofenceScope;
use yatra_state::{Offer, Trip, TripPhase, TripRequest, TripStateError};

use crate::config::DispatchConfig;
use crate::engine::DispatchEngine;
use crate::error::DispatchError;
use crate::registry::ProviderRegistry;
use crate::store::TripStore;

// ── Inputs ───────────────────────────────────────────────────────────

/// The validated-at-the-edge input for trip creation. Coordinates arrive
/// already parsed; the coordinator owns the geofence and presence rules.
#[derive(Debug, Clone)]
pub struct NewTrip {
    /// The requester creating the trip.
    pub requester_id: RequesterId,
    /// Service category.
    pub category: TripCategory,
    /// Vehicle class needed.
    pub vehicle_class: VehicleClass,
    /// Pickup coordinate, when the client resolved one.
    pub pickup: Option<GeoPoint>,
    /// Dropoff coordinate, when the client resolved one.
    pub dropoff: Option<GeoPoint>,
    /// Resolved pickup address text.
    pub pickup_address: Option<String>,
    /// Resolved dropoff address text.
    pub dropoff_address: Option<String>,
    /// Requested service window.
    pub window: TimeWindow,
    /// Free-text note.
    pub note: Option<String>,
}

/// Counters from one expiry sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Pending offers expired by the offer TTL.
    pub offers_expired: usize,
    /// Searching trips expired by the search TTL.
    pub trips_expired: usize,
    /// Offers created by exhaustion re-broadcast during the sweep.
    pub offers_rebroadcast: usize,
}

// ── Coordinator ──────────────────────────────────────────────────────

/// The trip lifecycle façade.
#[derive(Debug, Clone)]
pub struct TripLifecycleCoordinator {
    store: TripStore,
    engine: DispatchEngine,
    config: Arc<DispatchConfig>,
}

impl TripLifecycleCoordinator {
    /// Create a coordinator over the shared store and registry.
    pub fn new(store: TripStore, registry: ProviderRegistry, config: Arc<DispatchConfig>) -> Self {
        let engine = DispatchEngine::new(store.clone(), registry, config.clone());
        Self {
            store,
            engine,
            config,
        }
    }

    /// The dispatch engine sharing this coordinator's store.
    pub fn engine(&self) -> &DispatchEngine {
        &self.engine
    }

    // ── Creation ─────────────────────────────────────────────────────

    /// Create a trip: validate the geofence per category policy, persist
    /// in `SEARCHING`, and fan out offers to the eligible provider set.
    ///
    /// # Errors
    ///
    /// [`DispatchError::Validation`] on missing locations or geofence
    /// rejection — synchronous, never retried by the core.
    pub fn create_trip(&self, new: NewTrip, now: Timestamp) -> Result<Trip, DispatchError> {
        let pickup = self.validate_locations(&new)?;

        let request = TripRequest {
            id: TripId::new(),
            requester_id: new.requester_id,
            category: new.category,
            vehicle_class: new.vehicle_class,
            pickup,
            dropoff: new.dropoff,
            pickup_address: new.pickup_address,
            dropoff_address: new.dropoff_address,
            window: new.window,
            note: new.note,
            created_at: now,
        };
        let trip = Trip::new(request);
        let trip_id = trip.id();
        self.store.insert(trip);

        // Broadcast failures at this point can only be a benign race (the
        // trip was cancelled between insert and broadcast); the trip keeps
        // searching either way.
        if let Err(e) = self.engine.create_offers(trip_id, now) {
            tracing::warn!(trip_id = %trip_id, error = %e, "initial broadcast failed");
        }

        self.store
            .get(trip_id)
            .map(|rec| rec.trip)
            .ok_or(DispatchError::TripNotFound(trip_id))
    }

    /// Presence and geofence rules for the category. Returns the pickup
    /// point (always required).
    fn validate_locations(&self, new: &NewTrip) -> Result<GeoPoint, DispatchError> {
        let pickup = new
            .pickup
            .ok_or_else(|| ValidationError::MissingLocation("pickup".to_string()))?;

        let scope = GeofenceScope::for_category(new.category);
        match scope {
            GeofenceScope::Exempt => {
                // Outstation trips leave the service area; both ends must
                // merely exist.
                if new.dropoff.is_none() {
                    return Err(ValidationError::MissingLocation("dropoff".to_string()).into());
                }
            }
            GeofenceScope::PickupOnly => {
                self.require_serviceable(Some(pickup), new.pickup_address.as_deref(), "pickup")?;
            }
            GeofenceScope::PickupAndDropoff => {
                self.require_serviceable(Some(pickup), new.pickup_address.as_deref(), "pickup")?;
                let dropoff = new
                    .dropoff
                    .ok_or_else(|| ValidationError::MissingLocation("dropoff".to_string()))?;
                self.require_serviceable(Some(dropoff), new.dropoff_address.as_deref(), "dropoff")?;
            }
        }
        Ok(pickup)
    }

    fn require_serviceable(
        &self,
        point: Option<GeoPoint>,
        address: Option<&str>,
        which: &str,
    ) -> Result<(), DispatchError> {
        if self.config.geofence.is_serviceable(point, address) {
            Ok(())
        } else {
            let describe = match (point, address) {
                (Some(p), _) => format!("{which} {p}"),
                (None, Some(a)) => format!("{which} \"{a}\""),
                (None, None) => which.to_string(),
            };
            Err(ValidationError::OutsideServiceArea(describe).into())
        }
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Snapshot one trip.
    pub fn get_trip(&self, trip_id: TripId) -> Option<Trip> {
        self.store.get(trip_id).map(|rec| rec.trip)
    }

    /// A requester's trips, newest first. Clients use the first
    /// non-terminal entry for active-booking detection.
    pub fn trips_for_requester(&self, requester_id: RequesterId) -> Vec<Trip> {
        self.store.trips_for_requester(requester_id)
    }

    /// A provider's pending offers.
    pub fn pending_offers_for(&self, provider_id: ProviderId) -> Vec<Offer> {
        self.store.pending_offers_for(provider_id)
    }

    // ── Transitions ──────────────────────────────────────────────────

    /// Cancel a trip. Legal from any non-terminal phase; pending offers
    /// expire in the same step, and an assigned provider's next tracking
    /// report fails with `TripNotTrackable`.
    pub fn cancel_trip(
        &self,
        trip_id: TripId,
        now: Timestamp,
        reason: &str,
    ) -> Result<Trip, DispatchError> {
        self.store
            .with_trip(trip_id, |rec| {
                rec.trip
                    .cancel(now, reason)
                    .map_err(DispatchError::from)
                    .map(|()| rec.trip.clone())
            })
            .ok_or(DispatchError::TripNotFound(trip_id))?
    }

    /// Manual progress from the assigned provider: `IN_PROGRESS`,
    /// `ARRIVED`, or `COMPLETED`, validated by the category's transition
    /// subset.
    pub fn progress_trip(
        &self,
        trip_id: TripId,
        provider_id: ProviderId,
        to: TripPhase,
        now: Timestamp,
    ) -> Result<Trip, DispatchError> {
        self.store
            .with_trip(trip_id, |rec| {
                if rec.trip.assigned_provider() != Some(provider_id) {
                    return Err(DispatchError::NotAssignedProvider {
                        trip_id,
                        provider_id,
                    });
                }
                // Providers advance service; they do not cancel or rewind.
                if !matches!(
                    to,
                    TripPhase::InProgress | TripPhase::Arrived | TripPhase::Completed
                ) {
                    return Err(TripStateError::InvalidTransition {
                        category: rec.trip.category(),
                        from: rec.trip.phase,
                        to,
                    }
                    .into());
                }
                rec.trip
                    .transition_to(to, now, "provider progress update")
                    .map_err(DispatchError::from)
                    .map(|()| rec.trip.clone())
            })
            .ok_or(DispatchError::TripNotFound(trip_id))?
    }

    // ── Expiry sweep ─────────────────────────────────────────────────

    /// Expire overdue offers and overdue searching trips, applying the
    /// exhaustion policy where offer expiry drained a trip. Pure in
    /// `now`, so tests drive time explicitly; the server calls this on an
    /// interval.
    pub fn expire_overdue(&self, now: Timestamp) -> SweepReport {
        let mut report = SweepReport::default();
        let mut rebroadcast: Vec<Offer> = Vec::new();

        for trip_id in self.store.trip_ids() {
            let _ = self.store.with_trip(trip_id, |rec| -> Result<(), ()> {
                if rec.trip.phase != TripPhase::Searching {
                    return Ok(());
                }

                let expired = rec
                    .trip
                    .expire_offers_older_than(self.config.offer_ttl, now);
                report.offers_expired += expired;

                if now.since(rec.trip.request.created_at) >= self.config.search_ttl {
                    if rec.trip.expire(now).is_ok() {
                        report.trips_expired += 1;
                    }
                } else if expired > 0 && rec.trip.pending_offer_count() == 0 {
                    let created = self.engine.apply_exhaustion(&mut rec.trip, now);
                    report.offers_rebroadcast += created.len();
                    rebroadcast.extend(created);
                }
                Ok(())
            });
        }

        self.store.index_offers(&rebroadcast);
        if report != SweepReport::default() {
            tracing::info!(
                offers_expired = report.offers_expired,
                trips_expired = report.trips_expired,
                offers_rebroadcast = report.offers_rebroadcast,
                "expiry sweep"
            );
        }
        report
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    use crate::config::ExhaustionPolicy;
    use crate::registry::ProviderRecord;

    fn at(secs: i64) -> Timestamp {
        Timestamp::from_datetime(Utc.timestamp_opt(secs, 0).unwrap())
    }

    fn point(lat: f64, lng: f64) -> GeoPoint {
        GeoPoint::new(lat, lng).unwrap()
    }

    struct Fixture {
        coordinator: TripLifecycleCoordinator,
        registry: ProviderRegistry,
        store: TripStore,
    }

    fn fixture_with(config: DispatchConfig) -> Fixture {
        let store = TripStore::new();
        let registry = ProviderRegistry::new();
        let coordinator =
            TripLifecycleCoordinator::new(store.clone(), registry.clone(), Arc::new(config));
        Fixture {
            coordinator,
            registry,
            store,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(DispatchConfig::default())
    }

    fn add_provider(registry: &ProviderRegistry, category: TripCategory, class: VehicleClass) -> ProviderId {
        let record = ProviderRecord {
            id: ProviderId::new(),
            display_name: "provider".to_string(),
            vehicle_classes: vec![class],
            categories: vec![category],
            available: true,
            registered_at: at(0),
        };
        let id = record.id;
        registry.register(record);
        id
    }

    fn new_trip(category: TripCategory) -> NewTrip {
        NewTrip {
            requester_id: RequesterId::new(),
            category,
            vehicle_class: match category {
                TripCategory::Tow => VehicleClass::Flatbed,
                _ => VehicleClass::Sedan,
            },
            pickup: Some(point(12.97, 77.59)),
            dropoff: Some(point(12.93, 77.62)),
            pickup_address: None,
            dropoff_address: None,
            window: TimeWindow::new(at(0), None).unwrap(),
            note: None,
        }
    }

    // ── Creation & geofence ──────────────────────────────────────────

    #[test]
    fn create_inside_geofence_searches_and_broadcasts() {
        let f = fixture();
        add_provider(&f.registry, TripCategory::DriverHire, VehicleClass::Sedan);

        let trip = f
            .coordinator
            .create_trip(new_trip(TripCategory::DriverHire), at(1))
            .unwrap();
        assert_eq!(trip.phase, TripPhase::Searching);
        assert_eq!(trip.pending_offer_count(), 1);
    }

    #[test]
    fn create_outside_geofence_is_rejected() {
        let f = fixture();
        let mut new = new_trip(TripCategory::DriverHire);
        new.pickup = Some(point(19.07, 72.87)); // Mumbai
        let err = f.coordinator.create_trip(new, at(1)).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Validation(ValidationError::OutsideServiceArea(_))
        ));
        assert!(f.store.is_empty(), "rejected trips are never persisted");
    }

    #[test]
    fn driver_hire_checks_dropoff_too() {
        let f = fixture();
        let mut new = new_trip(TripCategory::DriverHire);
        new.dropoff = Some(point(19.07, 72.87));
        assert!(f.coordinator.create_trip(new, at(1)).is_err());
    }

    #[test]
    fn tow_ignores_dropoff_and_allows_none() {
        let f = fixture();
        let mut new = new_trip(TripCategory::Tow);
        new.dropoff = None;
        let trip = f.coordinator.create_trip(new, at(1)).unwrap();
        assert_eq!(trip.phase, TripPhase::Searching);
    }

    #[test]
    fn outstation_is_exempt_but_needs_both_ends() {
        let f = fixture();
        let mut new = new_trip(TripCategory::Outstation);
        new.dropoff = Some(point(13.34, 74.74)); // Udupi, far outside the fence
        assert!(f.coordinator.create_trip(new, at(1)).is_ok());

        let mut missing = new_trip(TripCategory::Outstation);
        missing.dropoff = None;
        let err = f.coordinator.create_trip(missing, at(1)).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Validation(ValidationError::MissingLocation(_))
        ));
    }

    #[test]
    fn keyword_address_admits_trip_without_coordinate_match() {
        let f = fixture();
        let mut new = new_trip(TripCategory::Tow);
        new.pickup = Some(point(19.07, 72.87));
        new.pickup_address = Some("Hebbal flyover, Bengaluru".to_string());
        assert!(f.coordinator.create_trip(new, at(1)).is_ok());
    }

    #[test]
    fn missing_pickup_is_rejected() {
        let f = fixture();
        let mut new = new_trip(TripCategory::DriverHire);
        new.pickup = None;
        let err = f.coordinator.create_trip(new, at(1)).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Validation(ValidationError::MissingLocation(_))
        ));
    }

    // ── Cancel ───────────────────────────────────────────────────────

    #[test]
    fn cancel_searching_trip() {
        let f = fixture();
        let trip = f
            .coordinator
            .create_trip(new_trip(TripCategory::DriverHire), at(1))
            .unwrap();
        let cancelled = f
            .coordinator
            .cancel_trip(trip.id(), at(2), "requester cancelled")
            .unwrap();
        assert_eq!(cancelled.phase, TripPhase::Cancelled);
    }

    #[test]
    fn cancel_terminal_trip_conflicts() {
        let f = fixture();
        let trip = f
            .coordinator
            .create_trip(new_trip(TripCategory::DriverHire), at(1))
            .unwrap();
        f.coordinator.cancel_trip(trip.id(), at(2), "first").unwrap();
        let err = f
            .coordinator
            .cancel_trip(trip.id(), at(3), "second")
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::State(TripStateError::TripAlreadyTerminal { .. })
        ));
    }

    // ── Progress ─────────────────────────────────────────────────────

    fn accepted_trip(f: &Fixture, category: TripCategory) -> (TripId, ProviderId) {
        let class = match category {
            TripCategory::Tow => VehicleClass::Flatbed,
            _ => VehicleClass::Sedan,
        };
        let provider = add_provider(&f.registry, category, class);
        let trip = f.coordinator.create_trip(new_trip(category), at(1)).unwrap();
        let offer = trip.offers[0].id;
        f.coordinator.engine().accept(offer, at(2)).unwrap();
        (trip.id(), provider)
    }

    #[test]
    fn provider_advances_and_completes() {
        let f = fixture();
        let (trip_id, provider) = accepted_trip(&f, TripCategory::DriverHire);

        let trip = f
            .coordinator
            .progress_trip(trip_id, provider, TripPhase::InProgress, at(3))
            .unwrap();
        assert_eq!(trip.phase, TripPhase::InProgress);

        let trip = f
            .coordinator
            .progress_trip(trip_id, provider, TripPhase::Completed, at(4))
            .unwrap();
        assert_eq!(trip.phase, TripPhase::Completed);
    }

    #[test]
    fn stranger_cannot_progress() {
        let f = fixture();
        let (trip_id, _provider) = accepted_trip(&f, TripCategory::DriverHire);
        let err = f
            .coordinator
            .progress_trip(trip_id, ProviderId::new(), TripPhase::InProgress, at(3))
            .unwrap_err();
        assert!(matches!(err, DispatchError::NotAssignedProvider { .. }));
    }

    #[test]
    fn provider_cannot_cancel_via_progress() {
        let f = fixture();
        let (trip_id, provider) = accepted_trip(&f, TripCategory::DriverHire);
        let err = f
            .coordinator
            .progress_trip(trip_id, provider, TripPhase::Cancelled, at(3))
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::State(TripStateError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn driver_hire_cannot_arrive_via_progress() {
        let f = fixture();
        let (trip_id, provider) = accepted_trip(&f, TripCategory::DriverHire);
        let err = f
            .coordinator
            .progress_trip(trip_id, provider, TripPhase::Arrived, at(3))
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::State(TripStateError::InvalidTransition { .. })
        ));
    }

    // ── Expiry sweep ─────────────────────────────────────────────────

    #[test]
    fn sweep_expires_overdue_offers_then_trip() {
        let f = fixture();
        add_provider(&f.registry, TripCategory::DriverHire, VehicleClass::Sedan);
        let trip = f
            .coordinator
            .create_trip(new_trip(TripCategory::DriverHire), at(0))
            .unwrap();

        // Offer TTL (90 s) passes; trip TTL (15 min) has not.
        let report = f.coordinator.expire_overdue(at(120));
        assert_eq!(report.offers_expired, 1);
        assert_eq!(report.trips_expired, 0);
        assert_eq!(
            f.coordinator.get_trip(trip.id()).unwrap().phase,
            TripPhase::Searching
        );

        // Search TTL passes.
        let report = f.coordinator.expire_overdue(at(1000));
        assert_eq!(report.trips_expired, 1);
        assert_eq!(
            f.coordinator.get_trip(trip.id()).unwrap().phase,
            TripPhase::Expired
        );
    }

    #[test]
    fn sweep_rebroadcasts_under_rebroadcast_policy() {
        let f = fixture_with(DispatchConfig {
            exhaustion: ExhaustionPolicy::Rebroadcast { max_rounds: 3 },
            ..DispatchConfig::default()
        });
        add_provider(&f.registry, TripCategory::DriverHire, VehicleClass::Sedan);
        let trip = f
            .coordinator
            .create_trip(new_trip(TripCategory::DriverHire), at(0))
            .unwrap();

        // The original offer expires; a fresh provider is available.
        let fresh = add_provider(&f.registry, TripCategory::DriverHire, VehicleClass::Sedan);
        let report = f.coordinator.expire_overdue(at(120));
        assert_eq!(report.offers_expired, 1);
        assert_eq!(report.offers_rebroadcast, 1);

        let record = f.store.get(trip.id()).unwrap();
        let pending: Vec<_> = record.trip.offers.iter().filter(|o| o.is_pending()).collect();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].provider_id, fresh);
    }

    #[test]
    fn sweep_ignores_non_searching_trips() {
        let f = fixture();
        let (trip_id, _provider) = accepted_trip(&f, TripCategory::DriverHire);
        let report = f.coordinator.expire_overdue(at(10_000));
        assert_eq!(report.trips_expired, 0);
        assert_eq!(
            f.coordinator.get_trip(trip_id).unwrap().phase,
            TripPhase::Accepted
        );
    }

    #[test]
    fn sweep_is_idempotent() {
        let f = fixture();
        add_provider(&f.registry, TripCategory::DriverHire, VehicleClass::Sedan);
        f.coordinator
            .create_trip(new_trip(TripCategory::DriverHire), at(0))
            .unwrap();

        let first = f.coordinator.expire_overdue(at(1000));
        assert_eq!(first.trips_expired, 1);
        let second = f.coordinator.expire_overdue(at(1001));
        assert_eq!(second, SweepReport::default());
    }

    #[test]
    fn reads_are_scoped_to_the_caller() {
        let f = fixture();
        let mine = new_trip(TripCategory::DriverHire);
        let requester = mine.requester_id;
        f.coordinator.create_trip(mine, at(1)).unwrap();
        f.coordinator
            .create_trip(new_trip(TripCategory::DriverHire), at(2))
            .unwrap();

        assert_eq!(f.coordinator.trips_for_requester(requester).len(), 1);
    }

    #[test]
    fn sweep_time_is_duration_based_not_wallclock() {
        // A trip created "now" and swept one second later is untouched
        // even with a tiny TTL margin.
        let f = fixture_with(DispatchConfig {
            search_ttl: Duration::seconds(30),
            offer_ttl: Duration::seconds(10),
            ..DispatchConfig::default()
        });
        f.coordinator
            .create_trip(new_trip(TripCategory::DriverHire), at(100))
            .unwrap();
        assert_eq!(f.coordinator.expire_overdue(at(101)), SweepReport::default());
        let report = f.coordinator.expire_overdue(at(131));
        assert_eq!(report.trips_expired, 1);
    }
}
