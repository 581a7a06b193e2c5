//! # Trip Routes — the Requester Surface
//!
//! ## Endpoints
//!
//! - `POST /v1/trips` — create a trip (geofence-validated)
//! - `GET /v1/trips/mine` — the caller's trips, newest first
//! - `GET /v1/trips/:id` — one trip
//! - `POST /v1/trips/:id/cancel` — requester/ops cancellation
//! - `POST /v1/trips/:id/progress` — assigned provider's manual advance

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use yatra_core::{TimeWindow, Timestamp, TripCategory, TripId, VehicleClass};
use yatra_dispatch::NewTrip;
use yatra_state::{Trip, TripPhase};

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::routes::{ensure_trip_access, LatLng};
use crate::state::AppState;

// ── DTOs ────────────────────────────────────────────────────────────

/// Request to create a trip.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTripRequest {
    /// Service category.
    #[schema(value_type = String, example = "DRIVER_HIRE")]
    pub category: TripCategory,
    /// Vehicle class needed.
    #[schema(value_type = String, example = "SEDAN")]
    pub vehicle_class: VehicleClass,
    /// Pickup coordinate, when the client resolved one.
    pub pickup: Option<LatLng>,
    /// Dropoff coordinate.
    pub dropoff: Option<LatLng>,
    /// Resolved pickup address text.
    pub pickup_address: Option<String>,
    /// Resolved dropoff address text.
    pub dropoff_address: Option<String>,
    /// Earliest acceptable start; defaults to now.
    pub window_starts_at: Option<DateTime<Utc>>,
    /// Latest acceptable end.
    pub window_ends_at: Option<DateTime<Utc>>,
    /// Free-text note or reason.
    pub note: Option<String>,
}

impl Validate for CreateTripRequest {
    fn validate(&self) -> Result<(), String> {
        if let Some(note) = &self.note {
            if note.len() > 500 {
                return Err("note must not exceed 500 characters".to_string());
            }
        }
        for (field, addr) in [
            ("pickup_address", &self.pickup_address),
            ("dropoff_address", &self.dropoff_address),
        ] {
            if let Some(a) = addr {
                if a.trim().is_empty() {
                    return Err(format!("{field} must not be empty if provided"));
                }
            }
        }
        if let (Some(start), Some(end)) = (self.window_starts_at, self.window_ends_at) {
            if end < start {
                return Err("window_ends_at precedes window_starts_at".to_string());
            }
        }
        Ok(())
    }
}

/// Request to cancel a trip.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CancelTripRequest {
    /// Optional cancellation reason for the audit log.
    pub reason: Option<String>,
}

/// Request for a provider's manual progress update.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ProgressTripRequest {
    /// Target phase: `IN_PROGRESS`, `ARRIVED`, or `COMPLETED`.
    #[schema(value_type = String, example = "IN_PROGRESS")]
    pub to: TripPhase,
}

/// The winning assignment, as clients see it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AssignmentView {
    /// The offer that won.
    pub offer_id: Uuid,
    /// The assigned provider.
    pub provider_id: Uuid,
    /// When the assignment was made.
    pub accepted_at: DateTime<Utc>,
}

/// A trip, as clients see it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TripView {
    /// Trip identifier.
    pub id: Uuid,
    /// Owning requester.
    pub requester_id: Uuid,
    /// Service category.
    #[schema(value_type = String)]
    pub category: TripCategory,
    /// Vehicle class.
    #[schema(value_type = String)]
    pub vehicle_class: VehicleClass,
    /// Current lifecycle phase.
    #[schema(value_type = String)]
    pub phase: TripPhase,
    /// Pickup coordinate.
    pub pickup: LatLng,
    /// Dropoff coordinate.
    pub dropoff: Option<LatLng>,
    /// Pickup address text.
    pub pickup_address: Option<String>,
    /// Dropoff address text.
    pub dropoff_address: Option<String>,
    /// Window start.
    pub window_starts_at: DateTime<Utc>,
    /// Window end.
    pub window_ends_at: Option<DateTime<Utc>>,
    /// Free-text note.
    pub note: Option<String>,
    /// Assignment, once an offer was accepted.
    pub assignment: Option<AssignmentView>,
    /// Offers still awaiting a decision.
    pub pending_offers: usize,
    /// Dispatch rounds run so far.
    pub dispatch_round: u32,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last change time.
    pub updated_at: DateTime<Utc>,
}

impl From<Trip> for TripView {
    fn from(trip: Trip) -> Self {
        let pending_offers = trip.pending_offer_count();
        Self {
            id: *trip.request.id.as_uuid(),
            requester_id: *trip.request.requester_id.as_uuid(),
            category: trip.request.category,
            vehicle_class: trip.request.vehicle_class,
            phase: trip.phase,
            pickup: LatLng::from_point(trip.request.pickup),
            dropoff: trip.request.dropoff.map(LatLng::from_point),
            pickup_address: trip.request.pickup_address,
            dropoff_address: trip.request.dropoff_address,
            window_starts_at: *trip.request.window.starts_at.as_datetime(),
            window_ends_at: trip.request.window.ends_at.map(|t| *t.as_datetime()),
            note: trip.request.note,
            assignment: trip.assignment.map(|a| AssignmentView {
                offer_id: *a.offer_id.as_uuid(),
                provider_id: *a.provider_id.as_uuid(),
                accepted_at: *a.accepted_at.as_datetime(),
            }),
            pending_offers,
            dispatch_round: trip.dispatch_round,
            created_at: *trip.request.created_at.as_datetime(),
            updated_at: *trip.updated_at.as_datetime(),
        }
    }
}

// ── Router ──────────────────────────────────────────────────────────

/// Build the trips router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/trips", post(create_trip))
        .route("/v1/trips/mine", get(my_trips))
        .route("/v1/trips/:id", get(get_trip))
        .route("/v1/trips/:id/cancel", post(cancel_trip))
        .route("/v1/trips/:id/progress", post(progress_trip))
}

// ── Handlers ────────────────────────────────────────────────────────

/// POST /v1/trips — create a trip.
#[utoipa::path(
    post,
    path = "/v1/trips",
    request_body = CreateTripRequest,
    responses(
        (status = 201, description = "Trip created, searching for providers", body = TripView),
        (status = 422, description = "Validation or geofence rejection", body = crate::error::ErrorBody),
    ),
    tag = "trips"
)]
async fn create_trip(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CreateTripRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TripView>), AppError> {
    let req = extract_validated_json(body)?;
    let requester_id = caller.requester_id()?;
    let now = Timestamp::now();

    let window = TimeWindow::new(
        req.window_starts_at.map(Timestamp::from_datetime).unwrap_or(now),
        req.window_ends_at.map(Timestamp::from_datetime),
    )
    .map_err(|e| AppError::Validation(e.to_string()))?;

    let new = NewTrip {
        requester_id,
        category: req.category,
        vehicle_class: req.vehicle_class,
        pickup: req.pickup.map(LatLng::to_point).transpose()?,
        dropoff: req.dropoff.map(LatLng::to_point).transpose()?,
        pickup_address: req.pickup_address,
        dropoff_address: req.dropoff_address,
        window,
        note: req.note,
    };

    let trip = state.coordinator.create_trip(new, now)?;
    Ok((StatusCode::CREATED, Json(trip.into())))
}

/// GET /v1/trips/mine — the caller's trips, newest first.
#[utoipa::path(
    get,
    path = "/v1/trips/mine",
    responses(
        (status = 200, description = "The caller's trips, newest first", body = Vec<TripView>),
    ),
    tag = "trips"
)]
async fn my_trips(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<Vec<TripView>>, AppError> {
    let requester_id = caller.requester_id()?;
    let trips = state
        .coordinator
        .trips_for_requester(requester_id)
        .into_iter()
        .map(TripView::from)
        .collect();
    Ok(Json(trips))
}

/// GET /v1/trips/:id — one trip.
#[utoipa::path(
    get,
    path = "/v1/trips/{id}",
    params(("id" = Uuid, Path, description = "Trip ID")),
    responses(
        (status = 200, description = "Trip found", body = TripView),
        (status = 404, description = "Trip not found", body = crate::error::ErrorBody),
    ),
    tag = "trips"
)]
async fn get_trip(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<TripView>, AppError> {
    let trip = state
        .coordinator
        .get_trip(TripId::from_uuid(id))
        .ok_or_else(|| AppError::NotFound(format!("trip {id} not found")))?;
    ensure_trip_access(&caller, &trip)?;
    Ok(Json(trip.into()))
}

/// POST /v1/trips/:id/cancel — cancel a trip.
#[utoipa::path(
    post,
    path = "/v1/trips/{id}/cancel",
    params(("id" = Uuid, Path, description = "Trip ID")),
    request_body = CancelTripRequest,
    responses(
        (status = 200, description = "Trip cancelled", body = TripView),
        (status = 404, description = "Trip not found", body = crate::error::ErrorBody),
        (status = 409, description = "Trip already terminal", body = crate::error::ErrorBody),
    ),
    tag = "trips"
)]
async fn cancel_trip(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<CancelTripRequest>, JsonRejection>,
) -> Result<Json<TripView>, AppError> {
    // Body is optional; an empty body cancels with the default reason.
    let req = body.map(|Json(v)| v).unwrap_or_default();
    let trip_id = TripId::from_uuid(id);

    let trip = state
        .coordinator
        .get_trip(trip_id)
        .ok_or_else(|| AppError::NotFound(format!("trip {id} not found")))?;
    // Cancellation is for the owner or ops, not the assigned provider.
    if !caller.is_ops() && caller.requester_id().ok() != Some(trip.request.requester_id) {
        return Err(AppError::Forbidden("not the trip's requester".to_string()));
    }

    let reason = req.reason.as_deref().unwrap_or("requester cancelled");
    let cancelled = state
        .coordinator
        .cancel_trip(trip_id, Timestamp::now(), reason)?;
    Ok(Json(cancelled.into()))
}

/// POST /v1/trips/:id/progress — the assigned provider advances service.
#[utoipa::path(
    post,
    path = "/v1/trips/{id}/progress",
    params(("id" = Uuid, Path, description = "Trip ID")),
    request_body = ProgressTripRequest,
    responses(
        (status = 200, description = "Phase advanced", body = TripView),
        (status = 403, description = "Not the assigned provider", body = crate::error::ErrorBody),
        (status = 404, description = "Trip not found", body = crate::error::ErrorBody),
        (status = 409, description = "Transition not in the category's subset", body = crate::error::ErrorBody),
    ),
    tag = "trips"
)]
async fn progress_trip(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<ProgressTripRequest>, JsonRejection>,
) -> Result<Json<TripView>, AppError> {
    let req = crate::extractors::extract_json(body)?;
    let provider_id = caller.provider_id()?;
    let trip = state.coordinator.progress_trip(
        TripId::from_uuid(id),
        provider_id,
        req.to,
        Timestamp::now(),
    )?;
    Ok(Json(trip.into()))
}
