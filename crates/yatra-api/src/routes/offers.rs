//! # Offer Routes — the Provider Decision Surface
//!
//! ## Endpoints
//!
//! - `GET /v1/providers/offers` — the caller provider's pending offers
//! - `POST /v1/offers/:id/accept` — claim the trip (first accept wins)
//! - `POST /v1/offers/:id/reject` — decline
//!
//! Race losses surface as `409 CONFLICT` with the domain condition in the
//! message; the provider's client re-polls rather than retrying.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use yatra_core::{OfferId, Timestamp, TripCategory, VehicleClass};
use yatra_state::{Offer, OfferStatus, Trip};

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::routes::trips::AssignmentView;
use crate::routes::LatLng;
use crate::state::AppState;

// ── DTOs ────────────────────────────────────────────────────────────

/// The trip context a provider needs to decide an offer.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OfferTripContext {
    /// Service category.
    #[schema(value_type = String)]
    pub category: TripCategory,
    /// Vehicle class needed.
    #[schema(value_type = String)]
    pub vehicle_class: VehicleClass,
    /// Pickup coordinate.
    pub pickup: LatLng,
    /// Pickup address text.
    pub pickup_address: Option<String>,
    /// Dropoff coordinate.
    pub dropoff: Option<LatLng>,
    /// Dropoff address text.
    pub dropoff_address: Option<String>,
    /// Window start.
    pub window_starts_at: DateTime<Utc>,
    /// Requester's note.
    pub note: Option<String>,
}

impl From<&Trip> for OfferTripContext {
    fn from(trip: &Trip) -> Self {
        Self {
            category: trip.request.category,
            vehicle_class: trip.request.vehicle_class,
            pickup: LatLng::from_point(trip.request.pickup),
            pickup_address: trip.request.pickup_address.clone(),
            dropoff: trip.request.dropoff.map(LatLng::from_point),
            dropoff_address: trip.request.dropoff_address.clone(),
            window_starts_at: *trip.request.window.starts_at.as_datetime(),
            note: trip.request.note.clone(),
        }
    }
}

/// A pending offer, as the provider sees it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OfferView {
    /// Offer identifier.
    pub id: Uuid,
    /// The trip being offered.
    pub trip_id: Uuid,
    /// Offer status.
    #[schema(value_type = String)]
    pub status: OfferStatus,
    /// When the offer was created.
    pub created_at: DateTime<Utc>,
    /// Trip context for the decision.
    pub trip: OfferTripContext,
}

fn offer_view(offer: Offer, trip: &Trip) -> OfferView {
    OfferView {
        id: *offer.id.as_uuid(),
        trip_id: *offer.trip_id.as_uuid(),
        status: offer.status,
        created_at: *offer.created_at.as_datetime(),
        trip: trip.into(),
    }
}

/// Result of rejecting an offer.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RejectResponse {
    /// The rejected offer.
    pub offer_id: Uuid,
    /// Final status (`REJECTED`).
    #[schema(value_type = String)]
    pub status: OfferStatus,
}

// ── Router ──────────────────────────────────────────────────────────

/// Build the offers router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/providers/offers", get(pending_offers))
        .route("/v1/offers/:id/accept", post(accept_offer))
        .route("/v1/offers/:id/reject", post(reject_offer))
}

/// Resolve an offer to its owning trip and verify the caller holds it.
fn owned_offer(
    state: &AppState,
    caller: &CallerIdentity,
    offer_id: OfferId,
) -> Result<(), AppError> {
    let provider_id = caller.provider_id()?;
    let trip_id = state
        .store
        .trip_id_for_offer(offer_id)
        .ok_or_else(|| AppError::NotFound(format!("offer {offer_id} not found")))?;
    let record = state
        .store
        .get(trip_id)
        .ok_or_else(|| AppError::NotFound(format!("offer {offer_id} not found")))?;
    let offer = record
        .trip
        .offer(offer_id)
        .ok_or_else(|| AppError::NotFound(format!("offer {offer_id} not found")))?;
    if offer.provider_id != provider_id {
        return Err(AppError::Forbidden("offer belongs to another provider".to_string()));
    }
    Ok(())
}

// ── Handlers ────────────────────────────────────────────────────────

/// GET /v1/providers/offers — the caller provider's pending offers.
#[utoipa::path(
    get,
    path = "/v1/providers/offers",
    responses(
        (status = 200, description = "Pending offers, newest first", body = Vec<OfferView>),
    ),
    tag = "offers"
)]
async fn pending_offers(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<Vec<OfferView>>, AppError> {
    let provider_id = caller.provider_id()?;
    let offers = state.coordinator.pending_offers_for(provider_id);
    let views = offers
        .into_iter()
        .filter_map(|offer| {
            state
                .coordinator
                .get_trip(offer.trip_id)
                .map(|trip| offer_view(offer, &trip))
        })
        .collect();
    Ok(Json(views))
}

/// POST /v1/offers/:id/accept — claim the trip.
#[utoipa::path(
    post,
    path = "/v1/offers/{id}/accept",
    params(("id" = Uuid, Path, description = "Offer ID")),
    responses(
        (status = 200, description = "Race won; trip assigned", body = AssignmentView),
        (status = 404, description = "Offer not found", body = crate::error::ErrorBody),
        (status = 409, description = "Race lost: offer already decided or trip not searching", body = crate::error::ErrorBody),
    ),
    tag = "offers"
)]
async fn accept_offer(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<AssignmentView>, AppError> {
    let offer_id = OfferId::from_uuid(id);
    owned_offer(&state, &caller, offer_id)?;

    let assignment = state
        .coordinator
        .engine()
        .accept(offer_id, Timestamp::now())?;
    Ok(Json(AssignmentView {
        offer_id: *assignment.offer_id.as_uuid(),
        provider_id: *assignment.provider_id.as_uuid(),
        accepted_at: *assignment.accepted_at.as_datetime(),
    }))
}

/// POST /v1/offers/:id/reject — decline the offer.
#[utoipa::path(
    post,
    path = "/v1/offers/{id}/reject",
    params(("id" = Uuid, Path, description = "Offer ID")),
    responses(
        (status = 200, description = "Offer rejected", body = RejectResponse),
        (status = 404, description = "Offer not found", body = crate::error::ErrorBody),
        (status = 409, description = "Offer already decided", body = crate::error::ErrorBody),
    ),
    tag = "offers"
)]
async fn reject_offer(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<RejectResponse>, AppError> {
    let offer_id = OfferId::from_uuid(id);
    owned_offer(&state, &caller, offer_id)?;

    state.coordinator.engine().reject(offer_id, Timestamp::now())?;
    Ok(Json(RejectResponse {
        offer_id: id,
        status: OfferStatus::Rejected,
    }))
}
