//! # Tracking & Route Reconciliation
//!
//! Consumes periodic position reports from the assigned provider, keeps
//! the trip's latest position current, and reconciles the cached route
//! plan against reality. Two independent rules run on every accepted
//! report:
//!
//! 1. **Route staleness** — no plan, an over-TTL plan, or lateral
//!    deviation beyond the threshold triggers a best-effort oracle
//!    refresh. The refresh never fails the report: the oracle being down
//!    degrades the snapshot, nothing more.
//! 2. **Proximity** — a report inside the pickup radius while the trip is
//!    still `ACCEPTED` advances the trip per category policy (tow crews
//!    arrive; everyone else starts).
//!
//! The oracle call happens with no trip guard held. The result is
//! committed optimistically: re-acquire the guard, re-check that the trip
//! is still trackable by the same assignee, and discard the plan if the
//! world moved on.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use yatra_core::{GeoPoint, ProviderId, Timestamp, TripCategory, TripId};
use yatra_geo::distance::{haversine_m, min_distance_to_path_m};
use yatra_routing::{RouteCache, RouteOracle, RoutePlan};
use yatra_state::{Assignment, TripPhase};

use crate::config::DispatchConfig;
use crate::error::DispatchError;
use crate::store::TripStore;

// ── Position ─────────────────────────────────────────────────────────

/// A provider's reported position. Latest-only: each accepted report
/// supersedes the previous one, and no history is retained by the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderPosition {
    /// Reported coordinate.
    pub point: GeoPoint,
    /// Heading in degrees clockwise from north, when the device knows it.
    pub heading_deg: Option<f64>,
    /// Speed in km/h, when the device knows it.
    pub speed_kmh: Option<f64>,
    /// When the provider's device took the fix. Reports apply in
    /// increasing `reported_at` order; older reports are no-ops.
    pub reported_at: Timestamp,
}

// ── Snapshot ─────────────────────────────────────────────────────────

/// The cache-only projection polling clients consume. Computable without
/// any network call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingSnapshot {
    /// The trip being tracked.
    pub trip_id: TripId,
    /// Current lifecycle phase.
    pub phase: TripPhase,
    /// Trip category.
    pub category: TripCategory,
    /// Pickup point.
    pub pickup: GeoPoint,
    /// Dropoff point, when the request has one.
    pub dropoff: Option<GeoPoint>,
    /// The winning assignment, once one exists.
    pub assignment: Option<Assignment>,
    /// Latest provider position, once one was reported.
    pub position: Option<ProviderPosition>,
    /// Latest committed route plan.
    pub route: Option<RoutePlan>,
    /// Whether the last route refresh failed. Tracking continues; clients
    /// may show a "route unavailable" indicator.
    pub route_degraded: bool,
}

// ── Internal decision ────────────────────────────────────────────────

/// What the guarded half of a report decided.
enum ReportOutcome {
    /// Position stored; optionally refresh the route for (origin, dest).
    Applied { refresh: Option<(GeoPoint, GeoPoint)> },
    /// Report was older than the stored one — idempotent no-op.
    StaleIgnored,
}

// ── Reconciler ───────────────────────────────────────────────────────

/// Position ingestion and route reconciliation.
#[derive(Clone)]
pub struct TrackingReconciler {
    store: TripStore,
    cache: RouteCache,
    oracle: Arc<dyn RouteOracle>,
    config: Arc<DispatchConfig>,
}

impl TrackingReconciler {
    /// Create a reconciler over the shared store.
    pub fn new(
        store: TripStore,
        cache: RouteCache,
        oracle: Arc<dyn RouteOracle>,
        config: Arc<DispatchConfig>,
    ) -> Self {
        Self {
            store,
            cache,
            oracle,
            config,
        }
    }

    /// Ingest a position report from a provider.
    ///
    /// # Errors
    ///
    /// [`DispatchError::NotAssignedProvider`] when the reporter is not the
    /// trip's accepted assignee, [`DispatchError::TripNotTrackable`] when
    /// the trip is not in `ACCEPTED`/`IN_PROGRESS`/`ARRIVED` (a cancelled
    /// trip fails here rather than silently succeeding), and
    /// [`DispatchError::TripNotFound`] for unknown trips. An out-of-order
    /// report returns `Ok` and changes nothing.
    pub async fn report_position(
        &self,
        trip_id: TripId,
        provider_id: ProviderId,
        position: ProviderPosition,
        now: Timestamp,
    ) -> Result<(), DispatchError> {
        let outcome = self
            .store
            .with_trip(trip_id, |rec| {
                // Identity first: a stranger learns nothing about the
                // trip's phase from this endpoint.
                if rec.trip.assigned_provider() != Some(provider_id) {
                    return Err(DispatchError::NotAssignedProvider {
                        trip_id,
                        provider_id,
                    });
                }
                if !rec.trip.phase.is_trackable() {
                    return Err(DispatchError::TripNotTrackable {
                        phase: rec.trip.phase,
                    });
                }

                // Ordering guard against retried/reordered deliveries.
                if let Some(prev) = &rec.live {
                    if position.reported_at <= prev.reported_at {
                        return Ok(ReportOutcome::StaleIgnored);
                    }
                }

                let point = position.point;
                rec.live = Some(position);

                // Proximity rule: entering the pickup radius while still
                // ACCEPTED advances the trip per category policy.
                if rec.trip.phase == TripPhase::Accepted
                    && haversine_m(point, rec.trip.request.pickup) <= self.config.pickup_radius_m
                {
                    let target = match rec.trip.category() {
                        TripCategory::Tow => TripPhase::Arrived,
                        TripCategory::DriverHire | TripCategory::Outstation => TripPhase::InProgress,
                    };
                    // The table guarantees these transitions for their
                    // categories; stay total anyway.
                    if let Err(e) = rec.trip.transition_to(target, now, "provider within pickup radius")
                    {
                        tracing::warn!(trip_id = %trip_id, error = %e, "proximity transition rejected");
                    }
                }

                // Staleness rule: decide whether the plan needs a refresh.
                let destination = Self::tracking_destination(&rec.trip);
                let refresh = match &rec.route {
                    None => true,
                    Some(plan) => {
                        plan.age(now) > self.config.route_ttl
                            || min_distance_to_path_m(point, &plan.points)
                                .map_or(true, |d| d > self.config.route_deviation_m)
                    }
                };
                Ok(ReportOutcome::Applied {
                    refresh: refresh.then_some((point, destination)),
                })
            })
            .ok_or(DispatchError::TripNotFound(trip_id))??;

        if let ReportOutcome::Applied {
            refresh: Some((from, to)),
        } = outcome
        {
            // Oracle work happens with no trip guard held.
            self.refresh_route(trip_id, provider_id, from, to, now).await;
        }
        Ok(())
    }

    /// The point the provider is currently heading to: the pickup until
    /// service starts, the dropoff (when known) once it has.
    fn tracking_destination(trip: &yatra_state::Trip) -> GeoPoint {
        match trip.phase {
            TripPhase::InProgress => trip.request.dropoff.unwrap_or(trip.request.pickup),
            _ => trip.request.pickup,
        }
    }

    /// Best-effort route refresh: consult the cache, otherwise call the
    /// oracle, then commit optimistically. Failures only degrade.
    async fn refresh_route(
        &self,
        trip_id: TripId,
        provider_id: ProviderId,
        from: GeoPoint,
        to: GeoPoint,
        now: Timestamp,
    ) {
        if let Some(plan) = self.cache.get_fresh(from, to, now) {
            self.commit_route(trip_id, provider_id, Some(plan));
            return;
        }

        match self.oracle.plan(from, to).await {
            Ok(plan) => {
                self.cache.insert(from, to, plan.clone());
                self.commit_route(trip_id, provider_id, Some(plan));
            }
            Err(e) => {
                tracing::warn!(
                    trip_id = %trip_id,
                    error = %e,
                    "route oracle refresh failed; tracking continues degraded"
                );
                self.commit_route(trip_id, provider_id, None);
            }
        }
    }

    /// Commit a fetched plan (or a degraded marker) under the trip guard,
    /// discarding it when the trip changed while the oracle call was in
    /// flight.
    fn commit_route(&self, trip_id: TripId, provider_id: ProviderId, plan: Option<RoutePlan>) {
        let _ = self.store.with_trip(trip_id, |rec| -> Result<(), ()> {
            if !rec.trip.phase.is_trackable() || rec.trip.assigned_provider() != Some(provider_id) {
                // The trip was cancelled, completed, or reassigned while
                // the oracle call was in flight — the plan is stale.
                return Ok(());
            }
            match plan {
                Some(p) => {
                    // Never replace a newer plan with an older one.
                    let newer = rec
                        .route
                        .as_ref()
                        .map_or(true, |existing| p.fetched_at >= existing.fetched_at);
                    if newer {
                        rec.route = Some(p);
                        rec.route_degraded = false;
                    }
                }
                None => rec.route_degraded = true,
            }
            Ok(())
        });
    }

    /// The read-only projection polling clients consume. Cache-only: no
    /// network, no locks beyond a snapshot read.
    pub fn current_view(&self, trip_id: TripId) -> Result<TrackingSnapshot, DispatchError> {
        let record = self
            .store
            .get(trip_id)
            .ok_or(DispatchError::TripNotFound(trip_id))?;
        Ok(TrackingSnapshot {
            trip_id,
            phase: record.trip.phase,
            category: record.trip.category(),
            pickup: record.trip.request.pickup,
            dropoff: record.trip.request.dropoff,
            assignment: record.trip.assignment,
            position: record.live,
            route: record.route,
            route_degraded: record.route_degraded,
        })
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    use yatra_core::{GeoPoint, RequesterId, TimeWindow, VehicleClass};
    use yatra_routing::{PlanFuture, RouteError};
    use yatra_state::{Trip, TripRequest};

    fn at(secs: i64) -> Timestamp {
        Timestamp::from_datetime(Utc.timestamp_opt(secs, 0).unwrap())
    }

    fn point(lat: f64, lng: f64) -> GeoPoint {
        GeoPoint::new(lat, lng).unwrap()
    }

    /// Scripted oracle: returns a fixed plan, counting calls; or fails.
    struct ScriptedOracle {
        calls: AtomicUsize,
        fail: bool,
        fetched_at: Timestamp,
    }

    impl ScriptedOracle {
        fn ok(fetched_at: Timestamp) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: false,
                fetched_at,
            }
        }

        fn failing() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: true,
                fetched_at: at(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl RouteOracle for ScriptedOracle {
        fn plan(&self, from: GeoPoint, to: GeoPoint) -> PlanFuture<'_> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let fail = self.fail;
            let fetched_at = self.fetched_at;
            Box::pin(async move {
                if fail {
                    Err(RouteError::NoRoute { from, to })
                } else {
                    Ok(RoutePlan {
                        points: vec![from, to],
                        distance_m: haversine_m(from, to),
                        duration_s: 600.0,
                        fetched_at,
                    })
                }
            })
        }
    }

    struct Fixture {
        store: TripStore,
        reconciler: TrackingReconciler,
        oracle: Arc<ScriptedOracle>,
        trip_id: TripId,
        provider_id: ProviderId,
    }

    fn fixture_with(category: TripCategory, oracle: ScriptedOracle) -> Fixture {
        let store = TripStore::new();
        let config = Arc::new(DispatchConfig::default());
        let oracle = Arc::new(oracle);
        let cache = RouteCache::new(config.route_grid_deg, config.route_ttl);
        let reconciler = TrackingReconciler::new(
            store.clone(),
            cache,
            oracle.clone() as Arc<dyn RouteOracle>,
            config,
        );

        // Build an accepted trip with one provider assigned.
        let mut trip = Trip::new(TripRequest {
            id: TripId::new(),
            requester_id: RequesterId::new(),
            category,
            vehicle_class: match category {
                TripCategory::Tow => VehicleClass::Flatbed,
                _ => VehicleClass::Sedan,
            },
            pickup: point(12.9716, 77.5946),
            dropoff: Some(point(12.9698, 77.7500)),
            pickup_address: None,
            dropoff_address: None,
            window: TimeWindow::new(at(0), None).unwrap(),
            note: None,
            created_at: at(0),
        });
        let provider_id = ProviderId::new();
        let offers = trip.broadcast_offers(&[provider_id], at(1)).unwrap();
        trip.accept_offer(offers[0].id, at(2)).unwrap();

        let trip_id = trip.id();
        store.insert(trip);

        Fixture {
            store,
            reconciler,
            oracle,
            trip_id,
            provider_id,
        }
    }

    fn fixture(category: TripCategory) -> Fixture {
        fixture_with(category, ScriptedOracle::ok(at(50)))
    }

    /// A position well away from the pickup (no proximity transition).
    fn far_position(reported_at: Timestamp) -> ProviderPosition {
        ProviderPosition {
            point: point(12.90, 77.50),
            heading_deg: Some(45.0),
            speed_kmh: Some(32.0),
            reported_at,
        }
    }

    // ── Authorization & phase gates ──────────────────────────────────

    #[tokio::test]
    async fn stranger_report_fails_not_assigned() {
        let f = fixture(TripCategory::DriverHire);
        let err = f
            .reconciler
            .report_position(f.trip_id, ProviderId::new(), far_position(at(10)), at(10))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::NotAssignedProvider { .. }));
    }

    #[tokio::test]
    async fn report_on_cancelled_trip_fails_not_trackable() {
        let f = fixture(TripCategory::DriverHire);
        f.store
            .with_trip(f.trip_id, |rec| rec.trip.cancel(at(5), "requester cancelled"))
            .unwrap()
            .unwrap();

        let err = f
            .reconciler
            .report_position(f.trip_id, f.provider_id, far_position(at(10)), at(10))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::TripNotTrackable { .. }));
    }

    #[tokio::test]
    async fn report_on_unknown_trip_fails_not_found() {
        let f = fixture(TripCategory::DriverHire);
        let err = f
            .reconciler
            .report_position(TripId::new(), f.provider_id, far_position(at(10)), at(10))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::TripNotFound(_)));
    }

    // ── Ordering ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn older_report_is_an_idempotent_noop() {
        let f = fixture(TripCategory::DriverHire);
        f.reconciler
            .report_position(f.trip_id, f.provider_id, far_position(at(100)), at(100))
            .await
            .unwrap();

        // A retried duplicate from 5 seconds earlier.
        let mut stale = far_position(at(95));
        stale.point = point(12.80, 77.40);
        f.reconciler
            .report_position(f.trip_id, f.provider_id, stale, at(101))
            .await
            .unwrap();

        let view = f.reconciler.current_view(f.trip_id).unwrap();
        let live = view.position.unwrap();
        assert_eq!(live.reported_at, at(100));
        assert_eq!(live.point, point(12.90, 77.50), "stale report must not overwrite");
    }

    #[tokio::test]
    async fn equal_timestamp_duplicate_is_ignored() {
        let f = fixture(TripCategory::DriverHire);
        f.reconciler
            .report_position(f.trip_id, f.provider_id, far_position(at(100)), at(100))
            .await
            .unwrap();
        let mut dup = far_position(at(100));
        dup.point = point(12.80, 77.40);
        f.reconciler
            .report_position(f.trip_id, f.provider_id, dup, at(100))
            .await
            .unwrap();

        let view = f.reconciler.current_view(f.trip_id).unwrap();
        assert_eq!(view.position.unwrap().point, point(12.90, 77.50));
    }

    // ── Proximity rule ───────────────────────────────────────────────

    #[tokio::test]
    async fn driver_hire_starts_at_pickup_radius() {
        let f = fixture(TripCategory::DriverHire);
        let near = ProviderPosition {
            point: point(12.9717, 77.5947), // ~15 m from pickup
            heading_deg: None,
            speed_kmh: None,
            reported_at: at(10),
        };
        f.reconciler
            .report_position(f.trip_id, f.provider_id, near, at(10))
            .await
            .unwrap();
        assert_eq!(
            f.store.get(f.trip_id).unwrap().trip.phase,
            TripPhase::InProgress
        );
    }

    #[tokio::test]
    async fn tow_arrives_at_pickup_radius() {
        let f = fixture(TripCategory::Tow);
        let near = ProviderPosition {
            point: point(12.9717, 77.5947),
            heading_deg: None,
            speed_kmh: None,
            reported_at: at(10),
        };
        f.reconciler
            .report_position(f.trip_id, f.provider_id, near, at(10))
            .await
            .unwrap();
        assert_eq!(f.store.get(f.trip_id).unwrap().trip.phase, TripPhase::Arrived);
    }

    #[tokio::test]
    async fn far_report_does_not_advance_phase() {
        let f = fixture(TripCategory::DriverHire);
        f.reconciler
            .report_position(f.trip_id, f.provider_id, far_position(at(10)), at(10))
            .await
            .unwrap();
        assert_eq!(f.store.get(f.trip_id).unwrap().trip.phase, TripPhase::Accepted);
    }

    // ── Route reconciliation ─────────────────────────────────────────

    #[tokio::test]
    async fn first_report_fetches_a_route() {
        let f = fixture(TripCategory::DriverHire);
        f.reconciler
            .report_position(f.trip_id, f.provider_id, far_position(at(10)), at(10))
            .await
            .unwrap();

        assert_eq!(f.oracle.call_count(), 1);
        let view = f.reconciler.current_view(f.trip_id).unwrap();
        assert!(view.route.is_some());
        assert!(!view.route_degraded);
    }

    #[tokio::test]
    async fn unchanged_position_reuses_cached_route() {
        let f = fixture(TripCategory::DriverHire);
        f.reconciler
            .report_position(f.trip_id, f.provider_id, far_position(at(10)), at(10))
            .await
            .unwrap();
        // A few metres of drift, well within grid cell and deviation.
        let drift = ProviderPosition {
            point: point(12.90001, 77.50001),
            heading_deg: None,
            speed_kmh: None,
            reported_at: at(20),
        };
        f.reconciler
            .report_position(f.trip_id, f.provider_id, drift, at(20))
            .await
            .unwrap();

        assert_eq!(f.oracle.call_count(), 1, "second report must hit the plan, not the oracle");
    }

    #[tokio::test]
    async fn large_deviation_forces_refresh() {
        let f = fixture(TripCategory::DriverHire);
        f.reconciler
            .report_position(f.trip_id, f.provider_id, far_position(at(10)), at(10))
            .await
            .unwrap();
        assert_eq!(f.oracle.call_count(), 1);

        // Jump ~2 km off the plan.
        let off_route = ProviderPosition {
            point: point(12.92, 77.52),
            heading_deg: None,
            speed_kmh: None,
            reported_at: at(20),
        };
        f.reconciler
            .report_position(f.trip_id, f.provider_id, off_route, at(20))
            .await
            .unwrap();
        assert_eq!(f.oracle.call_count(), 2);
    }

    #[tokio::test]
    async fn oracle_failure_degrades_but_report_succeeds() {
        let f = fixture_with(TripCategory::DriverHire, ScriptedOracle::failing());
        f.reconciler
            .report_position(f.trip_id, f.provider_id, far_position(at(10)), at(10))
            .await
            .unwrap();

        let view = f.reconciler.current_view(f.trip_id).unwrap();
        assert!(view.position.is_some(), "position recorded despite oracle failure");
        assert!(view.route.is_none());
        assert!(view.route_degraded);
    }

    #[tokio::test]
    async fn degraded_flag_clears_on_next_successful_refresh() {
        let f = fixture_with(TripCategory::DriverHire, ScriptedOracle::failing());
        f.reconciler
            .report_position(f.trip_id, f.provider_id, far_position(at(10)), at(10))
            .await
            .unwrap();
        assert!(f.reconciler.current_view(f.trip_id).unwrap().route_degraded);

        // Swap in a working oracle by rebuilding the reconciler over the
        // same store (deployment restart without state loss).
        let config = Arc::new(DispatchConfig::default());
        let cache = RouteCache::new(config.route_grid_deg, config.route_ttl);
        let healthy = TrackingReconciler::new(
            f.store.clone(),
            cache,
            Arc::new(ScriptedOracle::ok(at(60))) as Arc<dyn RouteOracle>,
            config,
        );
        healthy
            .report_position(f.trip_id, f.provider_id, far_position(at(20)), at(20))
            .await
            .unwrap();

        let view = healthy.current_view(f.trip_id).unwrap();
        assert!(view.route.is_some());
        assert!(!view.route_degraded);
    }

    #[tokio::test]
    async fn current_view_is_cache_only_and_total() {
        let f = fixture(TripCategory::Tow);
        let view = f.reconciler.current_view(f.trip_id).unwrap();
        assert_eq!(view.phase, TripPhase::Accepted);
        assert!(view.position.is_none());
        assert!(view.route.is_none());
        assert_eq!(f.oracle.call_count(), 0);

        assert!(matches!(
            f.reconciler.current_view(TripId::new()).unwrap_err(),
            DispatchError::TripNotFound(_)
        ));
    }
}
