//! # Offers
//!
//! An offer proposes one trip to one provider. Many offers exist per trip;
//! at most one is ever accepted. Offers decide exactly once: `PENDING` is
//! the only status that may change.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use yatra_core::{OfferId, ProviderId, Timestamp, TripId};

use crate::phase::TripPhase;

// ── Status ───────────────────────────────────────────────────────────

/// The status of an offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OfferStatus {
    /// Awaiting the provider's decision.
    Pending,
    /// The provider accepted and won the race.
    Accepted,
    /// The provider declined.
    Rejected,
    /// Invalidated — a sibling won, the offer TTL elapsed, or the trip
    /// left `SEARCHING`.
    Expired,
}

impl OfferStatus {
    /// Return the string representation of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Accepted => "ACCEPTED",
            Self::Rejected => "REJECTED",
            Self::Expired => "EXPIRED",
        }
    }

    /// Whether the offer has been decided (anything but `PENDING`).
    pub fn is_decided(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for OfferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Errors ───────────────────────────────────────────────────────────

/// Errors raised when deciding an offer.
///
/// These are the expected outcomes of the accept race, not bugs: a losing
/// caller re-polls current state rather than retrying the same call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OfferDecisionError {
    /// No offer with that identifier exists.
    #[error("offer {0} not found")]
    OfferNotFound(OfferId),

    /// The offer was already decided (accepted, rejected, or expired).
    #[error("offer {id} already decided: {status}")]
    OfferAlreadyDecided {
        /// The offer identifier.
        id: OfferId,
        /// The status it was decided into.
        status: OfferStatus,
    },

    /// The parent trip is no longer awaiting assignment.
    #[error("trip is not searching: {phase}")]
    TripNotSearching {
        /// The trip's current phase.
        phase: TripPhase,
    },
}

// ── Offer ────────────────────────────────────────────────────────────

/// A proposal of one trip to one specific provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    /// Unique offer identifier.
    pub id: OfferId,
    /// The trip being offered.
    pub trip_id: TripId,
    /// The provider the trip is offered to.
    pub provider_id: ProviderId,
    /// Current status.
    pub status: OfferStatus,
    /// When the offer was created.
    pub created_at: Timestamp,
    /// When the offer was decided, once it has been.
    pub decided_at: Option<Timestamp>,
}

impl Offer {
    /// Create a pending offer of `trip_id` to `provider_id`.
    pub fn new(trip_id: TripId, provider_id: ProviderId, at: Timestamp) -> Self {
        Self {
            id: OfferId::new(),
            trip_id,
            provider_id,
            status: OfferStatus::Pending,
            created_at: at,
            decided_at: None,
        }
    }

    /// Whether the offer is still awaiting a decision.
    pub fn is_pending(&self) -> bool {
        self.status == OfferStatus::Pending
    }

    /// Decide a pending offer into `status`.
    ///
    /// # Errors
    ///
    /// Returns [`OfferDecisionError::OfferAlreadyDecided`] when the offer is
    /// not pending.
    pub fn decide(&mut self, status: OfferStatus, at: Timestamp) -> Result<(), OfferDecisionError> {
        if self.status.is_decided() {
            return Err(OfferDecisionError::OfferAlreadyDecided {
                id: self.id,
                status: self.status,
            });
        }
        self.status = status;
        self.decided_at = Some(at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending() -> Offer {
        Offer::new(TripId::new(), ProviderId::new(), Timestamp::now())
    }

    #[test]
    fn new_offer_is_pending() {
        let o = pending();
        assert!(o.is_pending());
        assert!(o.decided_at.is_none());
    }

    #[test]
    fn decide_sets_status_and_time() {
        let mut o = pending();
        let at = Timestamp::now();
        o.decide(OfferStatus::Accepted, at).unwrap();
        assert_eq!(o.status, OfferStatus::Accepted);
        assert_eq!(o.decided_at, Some(at));
    }

    #[test]
    fn decide_twice_fails() {
        let mut o = pending();
        o.decide(OfferStatus::Rejected, Timestamp::now()).unwrap();
        let err = o.decide(OfferStatus::Accepted, Timestamp::now()).unwrap_err();
        match err {
            OfferDecisionError::OfferAlreadyDecided { id, status } => {
                assert_eq!(id, o.id);
                assert_eq!(status, OfferStatus::Rejected);
            }
            other => panic!("expected OfferAlreadyDecided, got: {other:?}"),
        }
    }

    #[test]
    fn expired_offer_cannot_be_accepted() {
        let mut o = pending();
        o.decide(OfferStatus::Expired, Timestamp::now()).unwrap();
        assert!(o.decide(OfferStatus::Accepted, Timestamp::now()).is_err());
    }

    #[test]
    fn status_wire_format() {
        assert_eq!(
            serde_json::to_string(&OfferStatus::Pending).unwrap(),
            "\"PENDING\""
        );
        assert!(OfferStatus::Expired.is_decided());
        assert!(!OfferStatus::Pending.is_decided());
    }
}
