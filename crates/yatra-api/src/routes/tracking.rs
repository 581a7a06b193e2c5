//! # Tracking Routes
//!
//! ## Endpoints
//!
//! - `POST /v1/tracking/update` — assigned provider's position report
//! - `GET /v1/tracking/:trip_id` — the polling tracking view
//!
//! The view is cache-only: whatever the reconciler has committed is what
//! clients see, with a `route_degraded` flag when the oracle is down.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use yatra_core::{Timestamp, TripCategory, TripId};
use yatra_dispatch::{ProviderPosition, TrackingSnapshot};
use yatra_state::TripPhase;

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::routes::{ensure_trip_access, LatLng};
use crate::state::AppState;

// ── DTOs ────────────────────────────────────────────────────────────

/// A provider's position report.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PositionReportRequest {
    /// The trip being tracked.
    pub trip_id: Uuid,
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lng: f64,
    /// Heading in degrees clockwise from north.
    pub heading_deg: Option<f64>,
    /// Speed in km/h.
    pub speed_kmh: Option<f64>,
    /// When the device took the fix; defaults to receipt time. Reports
    /// older than the stored position are idempotent no-ops.
    pub reported_at: Option<DateTime<Utc>>,
}

impl Validate for PositionReportRequest {
    fn validate(&self) -> Result<(), String> {
        if let Some(h) = self.heading_deg {
            if !(0.0..360.0).contains(&h) {
                return Err("heading_deg must be in [0, 360)".to_string());
            }
        }
        if let Some(s) = self.speed_kmh {
            if !s.is_finite() || s < 0.0 {
                return Err("speed_kmh must be non-negative".to_string());
            }
        }
        Ok(())
    }
}

/// Acknowledgement of an accepted position report.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PositionAck {
    /// The trip reported against.
    pub trip_id: Uuid,
}

/// A position, as clients see it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PositionView {
    /// Coordinate.
    pub point: LatLng,
    /// Heading in degrees clockwise from north.
    pub heading_deg: Option<f64>,
    /// Speed in km/h.
    pub speed_kmh: Option<f64>,
    /// Device fix time.
    pub reported_at: DateTime<Utc>,
}

impl From<ProviderPosition> for PositionView {
    fn from(p: ProviderPosition) -> Self {
        Self {
            point: LatLng::from_point(p.point),
            heading_deg: p.heading_deg,
            speed_kmh: p.speed_kmh,
            reported_at: *p.reported_at.as_datetime(),
        }
    }
}

/// A route plan, as clients see it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RouteView {
    /// Ordered polyline from origin to destination.
    pub points: Vec<LatLng>,
    /// Total distance in metres.
    pub distance_m: f64,
    /// Estimated travel time in seconds.
    pub eta_seconds: f64,
    /// When the plan was fetched from the oracle.
    pub fetched_at: DateTime<Utc>,
}

/// The polling tracking view.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TrackingView {
    /// The trip being tracked.
    pub trip_id: Uuid,
    /// Current lifecycle phase.
    #[schema(value_type = String)]
    pub phase: TripPhase,
    /// Trip category.
    #[schema(value_type = String)]
    pub category: TripCategory,
    /// Pickup coordinate.
    pub pickup: LatLng,
    /// Dropoff coordinate.
    pub dropoff: Option<LatLng>,
    /// Assigned provider, once one exists.
    pub provider_id: Option<Uuid>,
    /// Latest reported position.
    pub position: Option<PositionView>,
    /// Latest committed route plan.
    pub route: Option<RouteView>,
    /// Whether the last route refresh failed (route oracle degraded).
    pub route_degraded: bool,
}

impl From<TrackingSnapshot> for TrackingView {
    fn from(s: TrackingSnapshot) -> Self {
        Self {
            trip_id: *s.trip_id.as_uuid(),
            phase: s.phase,
            category: s.category,
            pickup: LatLng::from_point(s.pickup),
            dropoff: s.dropoff.map(LatLng::from_point),
            provider_id: s.assignment.map(|a| *a.provider_id.as_uuid()),
            position: s.position.map(PositionView::from),
            route: s.route.map(|r| RouteView {
                points: r.points.iter().copied().map(LatLng::from_point).collect(),
                distance_m: r.distance_m,
                eta_seconds: r.duration_s,
                fetched_at: *r.fetched_at.as_datetime(),
            }),
            route_degraded: s.route_degraded,
        }
    }
}

// ── Router ──────────────────────────────────────────────────────────

/// Build the tracking router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/tracking/update", post(report_position))
        .route("/v1/tracking/:trip_id", get(tracking_view))
}

// ── Handlers ────────────────────────────────────────────────────────

/// POST /v1/tracking/update — ingest a position report.
#[utoipa::path(
    post,
    path = "/v1/tracking/update",
    request_body = PositionReportRequest,
    responses(
        (status = 202, description = "Report accepted (or ignored as out-of-order)", body = PositionAck),
        (status = 403, description = "Not the assigned provider", body = crate::error::ErrorBody),
        (status = 404, description = "Trip not found", body = crate::error::ErrorBody),
        (status = 409, description = "Trip not trackable", body = crate::error::ErrorBody),
        (status = 422, description = "Malformed position", body = crate::error::ErrorBody),
    ),
    tag = "tracking"
)]
async fn report_position(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<PositionReportRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PositionAck>), AppError> {
    let req = extract_validated_json(body)?;
    let provider_id = caller.provider_id()?;
    let now = Timestamp::now();

    let position = ProviderPosition {
        point: LatLng {
            lat: req.lat,
            lng: req.lng,
        }
        .to_point()?,
        heading_deg: req.heading_deg,
        speed_kmh: req.speed_kmh,
        reported_at: req.reported_at.map(Timestamp::from_datetime).unwrap_or(now),
    };

    state
        .tracking
        .report_position(TripId::from_uuid(req.trip_id), provider_id, position, now)
        .await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(PositionAck {
            trip_id: req.trip_id,
        }),
    ))
}

/// GET /v1/tracking/:trip_id — the polling tracking view.
#[utoipa::path(
    get,
    path = "/v1/tracking/{trip_id}",
    params(("trip_id" = Uuid, Path, description = "Trip ID")),
    responses(
        (status = 200, description = "Tracking snapshot", body = TrackingView),
        (status = 404, description = "Trip not found", body = crate::error::ErrorBody),
    ),
    tag = "tracking"
)]
async fn tracking_view(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(trip_id): Path<Uuid>,
) -> Result<Json<TrackingView>, AppError> {
    let trip_id = TripId::from_uuid(trip_id);
    let trip = state
        .coordinator
        .get_trip(trip_id)
        .ok_or_else(|| AppError::NotFound(format!("trip {trip_id} not found")))?;
    ensure_trip_access(&caller, &trip)?;

    let snapshot = state.tracking.current_view(trip_id)?;
    Ok(Json(snapshot.into()))
}
