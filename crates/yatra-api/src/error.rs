//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps dispatch-core errors to HTTP status codes and JSON error bodies
//! with a machine-readable code. Conflict-class domain errors surface with
//! their domain message so losing racers can tell `OfferAlreadyDecided`
//! from `TripNotSearching`; internal errors never leak details.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use yatra_dispatch::DispatchError;
use yatra_state::{OfferDecisionError, TripStateError};

/// Structured JSON error response body.
///
/// All error responses use this format for consistency across the API
/// surface.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// The error payload.
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "CONFLICT", "VALIDATION_ERROR").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Request validation failed, including geofence rejection (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Request body could not be parsed or contains invalid values (422).
    /// The client sent syntactically valid HTTP but semantically invalid
    /// content, so this normalizes with `Validation` rather than 400.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Authentication failure — missing or invalid token (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authorization failure — wrong role or not the resource owner (403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Conflict with current resource state (409). The expected outcome of
    /// losing a dispatch race; the caller should re-poll, not retry.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Internal server error (500). Message is logged but not returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// The HTTP status code and machine-readable error code.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::UNPROCESSABLE_ENTITY, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Never expose internal error messages to clients.
        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        if matches!(self, Self::Internal(_)) {
            tracing::error!(error = %self, "internal server error");
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Map dispatch-core errors to API errors.
///
/// Validation → 422, conflicts → 409, identity mismatches → 403, unknown
/// resources → 404.
impl From<DispatchError> for AppError {
    fn from(err: DispatchError) -> Self {
        match &err {
            DispatchError::TripNotFound(_) => Self::NotFound(err.to_string()),
            DispatchError::Validation(_) => Self::Validation(err.to_string()),
            DispatchError::NotAssignedProvider { .. } => Self::Forbidden(err.to_string()),
            DispatchError::TripNotTrackable { .. } => Self::Conflict(err.to_string()),
            DispatchError::State(state) => match state {
                TripStateError::TripAlreadyTerminal { .. }
                | TripStateError::InvalidTransition { .. } => Self::Conflict(err.to_string()),
            },
            DispatchError::Offer(offer) => match offer {
                OfferDecisionError::OfferNotFound(_) => Self::NotFound(err.to_string()),
                OfferDecisionError::OfferAlreadyDecided { .. }
                | OfferDecisionError::TripNotSearching { .. } => Self::Conflict(err.to_string()),
            },
        }
    }
}
