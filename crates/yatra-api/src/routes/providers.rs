//! # Provider Routes — Registration & Availability
//!
//! ## Endpoints
//!
//! - `POST /v1/providers` — register (or re-register) the caller provider
//! - `POST /v1/providers/availability` — flip the availability flag
//!
//! The registry feeds dispatch eligibility: only available providers
//! matching a trip's category and vehicle class receive offers.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use yatra_core::{Timestamp, TripCategory, VehicleClass};
use yatra_dispatch::ProviderRecord;

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::{extract_json, extract_validated_json, Validate};
use crate::state::AppState;

// ── DTOs ────────────────────────────────────────────────────────────

/// Request to register the caller as a provider.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterProviderRequest {
    /// Display name.
    pub display_name: String,
    /// Vehicle classes operated.
    #[schema(value_type = Vec<String>)]
    pub vehicle_classes: Vec<VehicleClass>,
    /// Trip categories served.
    #[schema(value_type = Vec<String>)]
    pub categories: Vec<TripCategory>,
    /// Initial availability; defaults to available.
    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_available() -> bool {
    true
}

impl Validate for RegisterProviderRequest {
    fn validate(&self) -> Result<(), String> {
        if self.display_name.trim().is_empty() {
            return Err("display_name must not be empty".to_string());
        }
        if self.vehicle_classes.is_empty() {
            return Err("vehicle_classes must not be empty".to_string());
        }
        if self.categories.is_empty() {
            return Err("categories must not be empty".to_string());
        }
        Ok(())
    }
}

/// Request to set availability.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SetAvailabilityRequest {
    /// Whether the provider is taking offers.
    pub available: bool,
}

/// A provider record, as clients see it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProviderView {
    /// Provider identifier.
    pub id: Uuid,
    /// Display name.
    pub display_name: String,
    /// Vehicle classes operated.
    #[schema(value_type = Vec<String>)]
    pub vehicle_classes: Vec<VehicleClass>,
    /// Trip categories served.
    #[schema(value_type = Vec<String>)]
    pub categories: Vec<TripCategory>,
    /// Whether the provider is taking offers.
    pub available: bool,
    /// Registration time.
    pub registered_at: DateTime<Utc>,
}

impl From<ProviderRecord> for ProviderView {
    fn from(record: ProviderRecord) -> Self {
        Self {
            id: *record.id.as_uuid(),
            display_name: record.display_name,
            vehicle_classes: record.vehicle_classes,
            categories: record.categories,
            available: record.available,
            registered_at: *record.registered_at.as_datetime(),
        }
    }
}

// ── Router ──────────────────────────────────────────────────────────

/// Build the providers router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/providers", post(register_provider))
        .route("/v1/providers/availability", post(set_availability))
}

// ── Handlers ────────────────────────────────────────────────────────

/// POST /v1/providers — register the caller provider.
#[utoipa::path(
    post,
    path = "/v1/providers",
    request_body = RegisterProviderRequest,
    responses(
        (status = 201, description = "Provider registered", body = ProviderView),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "providers"
)]
async fn register_provider(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<RegisterProviderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ProviderView>), AppError> {
    let req = extract_validated_json(body)?;
    let provider_id = caller.provider_id()?;

    let record = ProviderRecord {
        id: provider_id,
        display_name: req.display_name,
        vehicle_classes: req.vehicle_classes,
        categories: req.categories,
        available: req.available,
        registered_at: Timestamp::now(),
    };
    state.registry.register(record.clone());
    Ok((StatusCode::CREATED, Json(record.into())))
}

/// POST /v1/providers/availability — flip the availability flag.
#[utoipa::path(
    post,
    path = "/v1/providers/availability",
    request_body = SetAvailabilityRequest,
    responses(
        (status = 200, description = "Availability updated", body = ProviderView),
        (status = 404, description = "Provider not registered", body = crate::error::ErrorBody),
    ),
    tag = "providers"
)]
async fn set_availability(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<SetAvailabilityRequest>, JsonRejection>,
) -> Result<Json<ProviderView>, AppError> {
    let req = extract_json(body)?;
    let provider_id = caller.provider_id()?;

    state
        .registry
        .set_available(provider_id, req.available)
        .map(|record| Json(record.into()))
        .ok_or_else(|| AppError::NotFound(format!("provider {provider_id} not registered")))
}
