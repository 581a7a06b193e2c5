//! # Dispatch Errors
//!
//! One error type across the dispatch façade. Conflict-class variants
//! (`TripNotTrackable`, `NotAssignedProvider`, and the wrapped offer/state
//! errors) are expected outcomes of normal concurrent operation — the
//! losing caller re-polls current state rather than retrying the call.

use thiserror::Error;

use yatra_core::{ProviderId, TripId, ValidationError};
use yatra_state::{OfferDecisionError, TripPhase, TripStateError};

/// Errors surfaced by the dispatch core.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    /// No trip with that identifier exists.
    #[error("trip {0} not found")]
    TripNotFound(TripId),

    /// The reporting provider is not the trip's accepted assignee.
    #[error("provider {provider_id} is not the assigned provider for trip {trip_id}")]
    NotAssignedProvider {
        /// The trip being reported against.
        trip_id: TripId,
        /// The provider that attempted the report.
        provider_id: ProviderId,
    },

    /// The trip is not in a trackable state
    /// (`ACCEPTED`/`IN_PROGRESS`/`ARRIVED`).
    #[error("trip is not trackable in state {phase}")]
    TripNotTrackable {
        /// The trip's current phase.
        phase: TripPhase,
    },

    /// Request input failed validation (including geofence rejection).
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A trip state transition was rejected.
    #[error(transparent)]
    State(#[from] TripStateError),

    /// An offer decision was rejected.
    #[error(transparent)]
    Offer(#[from] OfferDecisionError),
}
