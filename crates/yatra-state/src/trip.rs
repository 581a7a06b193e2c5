//! # The Trip Aggregate
//!
//! A [`Trip`] owns its request data, its phase, its offer set, and its
//! transition log. Every mutation is a method that validates before it
//! writes, so a `Trip` pulled out of the store is always internally
//! consistent: at most one accepted offer, an assignment exactly when the
//! phase says so, and a log entry for every phase change.
//!
//! The compound accept ([`Trip::accept_offer`]) is the heart of the
//! dispatch race: winning offer to `ACCEPTED`, every sibling `PENDING`
//! offer to `EXPIRED`, the trip to `ACCEPTED`, and the assignment recorded,
//! all in one call. Callers serialize calls per trip (see the store in
//! `yatra-dispatch`), which makes the compound step atomic.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use yatra_core::{
    GeoPoint, OfferId, ProviderId, RequesterId, TimeWindow, Timestamp, TripCategory, TripId,
    VehicleClass,
};

use crate::offer::{Offer, OfferDecisionError, OfferStatus};
use crate::phase::{transition_allowed, TransitionRecord, TripPhase, TripStateError};

// ── Request ──────────────────────────────────────────────────────────

/// The immutable creation data of a trip.
///
/// Everything here is fixed at creation; only the lifecycle around it
/// moves. Addresses carry the geocoder's resolved text for geofence
/// keyword matching and for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripRequest {
    /// Unique trip identifier.
    pub id: TripId,
    /// The requester who created the trip.
    pub requester_id: RequesterId,
    /// Service category.
    pub category: TripCategory,
    /// Vehicle class the request needs.
    pub vehicle_class: VehicleClass,
    /// Pickup coordinate.
    pub pickup: GeoPoint,
    /// Dropoff coordinate. Tow requests may omit it (destination workshop
    /// is often decided on site).
    pub dropoff: Option<GeoPoint>,
    /// Resolved pickup address text, when the client geocoded one.
    pub pickup_address: Option<String>,
    /// Resolved dropoff address text.
    pub dropoff_address: Option<String>,
    /// Requested service window.
    pub window: TimeWindow,
    /// Free-text note or reason from the requester.
    pub note: Option<String>,
    /// When the trip was created.
    pub created_at: Timestamp,
}

// ── Assignment ───────────────────────────────────────────────────────

/// The winning provider of a trip's offer race.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    /// The offer that won.
    pub offer_id: OfferId,
    /// The assigned provider.
    pub provider_id: ProviderId,
    /// When the assignment was made.
    pub accepted_at: Timestamp,
}

/// The outcome of rejecting an offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RejectOutcome {
    /// Whether this rejection left the trip with no pending offers.
    /// The dispatch engine applies the configured exhaustion policy.
    pub exhausted: bool,
}

// ── Trip ─────────────────────────────────────────────────────────────

/// A trip with its lifecycle state, offer set, and transition history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    /// Immutable creation data.
    pub request: TripRequest,
    /// Current lifecycle phase.
    pub phase: TripPhase,
    /// The winning assignment, once an offer is accepted.
    pub assignment: Option<Assignment>,
    /// All offers ever made for this trip, across dispatch rounds.
    pub offers: Vec<Offer>,
    /// Ordered log of all phase transitions.
    pub transitions: Vec<TransitionRecord>,
    /// How many dispatch rounds (initial broadcast plus re-broadcasts)
    /// have run.
    pub dispatch_round: u32,
    /// When the trip last changed.
    pub updated_at: Timestamp,
}

impl Trip {
    /// Create a trip in `SEARCHING` with no offers yet.
    pub fn new(request: TripRequest) -> Self {
        let created_at = request.created_at;
        Self {
            request,
            phase: TripPhase::Searching,
            assignment: None,
            offers: Vec::new(),
            transitions: Vec::new(),
            dispatch_round: 0,
            updated_at: created_at,
        }
    }

    /// The trip identifier.
    pub fn id(&self) -> TripId {
        self.request.id
    }

    /// The trip category.
    pub fn category(&self) -> TripCategory {
        self.request.category
    }

    /// Whether the trip is in a terminal phase.
    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    /// The provider currently assigned, if any.
    pub fn assigned_provider(&self) -> Option<ProviderId> {
        self.assignment.as_ref().map(|a| a.provider_id)
    }

    // ── Phase transitions ────────────────────────────────────────────

    /// Transition to `to`, validating against the category's transition
    /// subset and recording the change.
    ///
    /// # Errors
    ///
    /// [`TripStateError::TripAlreadyTerminal`] from a terminal phase,
    /// [`TripStateError::InvalidTransition`] for anything not in the table.
    pub fn transition_to(
        &mut self,
        to: TripPhase,
        at: Timestamp,
        reason: &str,
    ) -> Result<(), TripStateError> {
        if self.phase.is_terminal() {
            return Err(TripStateError::TripAlreadyTerminal { phase: self.phase });
        }
        if !transition_allowed(self.request.category, self.phase, to) {
            return Err(TripStateError::InvalidTransition {
                category: self.request.category,
                from: self.phase,
                to,
            });
        }
        self.apply(to, at, reason);
        Ok(())
    }

    /// Cancel the trip from any non-terminal phase. Pending offers are
    /// expired in the same step so no provider can accept a cancelled trip.
    pub fn cancel(&mut self, at: Timestamp, reason: &str) -> Result<(), TripStateError> {
        self.transition_to(TripPhase::Cancelled, at, reason)?;
        self.expire_pending_offers(at);
        Ok(())
    }

    /// Expire a trip whose search window elapsed without an assignment.
    /// Only legal from `SEARCHING`; pending offers expire with it.
    pub fn expire(&mut self, at: Timestamp) -> Result<(), TripStateError> {
        self.transition_to(TripPhase::Expired, at, "search window elapsed")?;
        self.expire_pending_offers(at);
        Ok(())
    }

    /// Record a transition without validation. Callers validate first.
    fn apply(&mut self, to: TripPhase, at: Timestamp, reason: &str) {
        self.transitions.push(TransitionRecord {
            from_phase: self.phase,
            to_phase: to,
            at,
            reason: reason.to_string(),
        });
        self.phase = to;
        self.updated_at = at;
    }

    // ── Offers ───────────────────────────────────────────────────────

    /// Fan the trip out to `providers`, one pending offer each.
    ///
    /// Providers already holding a pending offer, and providers who
    /// rejected this trip in an earlier round, are skipped — a rejection
    /// is a decision, not a missed message. Providers whose earlier offer
    /// expired may be offered again.
    ///
    /// Returns the newly created offers. Bumps the dispatch round when at
    /// least one offer was created.
    ///
    /// # Errors
    ///
    /// [`OfferDecisionError::TripNotSearching`] unless the trip is in
    /// `SEARCHING`.
    pub fn broadcast_offers(
        &mut self,
        providers: &[ProviderId],
        at: Timestamp,
    ) -> Result<Vec<Offer>, OfferDecisionError> {
        if self.phase != TripPhase::Searching {
            return Err(OfferDecisionError::TripNotSearching { phase: self.phase });
        }
        let mut created = Vec::new();
        for provider in providers {
            let blocked = self.offers.iter().any(|o| {
                o.provider_id == *provider
                    && matches!(o.status, OfferStatus::Pending | OfferStatus::Rejected)
            });
            if blocked {
                continue;
            }
            let offer = Offer::new(self.request.id, *provider, at);
            created.push(offer.clone());
            self.offers.push(offer);
        }
        if !created.is_empty() {
            self.dispatch_round += 1;
            self.updated_at = at;
        }
        Ok(created)
    }

    /// The compound accept: exactly one caller wins.
    ///
    /// Order of checks matters for the error a losing racer sees: a
    /// sibling-expired offer reports `OfferAlreadyDecided`, not a phase
    /// error — the caller's offer is what died.
    ///
    /// On success: the target offer is `ACCEPTED`, every other `PENDING`
    /// offer is `EXPIRED`, the trip is `ACCEPTED`, and the assignment is
    /// recorded — one logical step.
    pub fn accept_offer(
        &mut self,
        offer_id: OfferId,
        at: Timestamp,
    ) -> Result<Assignment, OfferDecisionError> {
        let idx = self
            .offers
            .iter()
            .position(|o| o.id == offer_id)
            .ok_or(OfferDecisionError::OfferNotFound(offer_id))?;
        if self.offers[idx].status.is_decided() {
            return Err(OfferDecisionError::OfferAlreadyDecided {
                id: offer_id,
                status: self.offers[idx].status,
            });
        }
        if self.phase != TripPhase::Searching {
            return Err(OfferDecisionError::TripNotSearching { phase: self.phase });
        }

        self.offers[idx].decide(OfferStatus::Accepted, at)?;
        let provider_id = self.offers[idx].provider_id;
        for offer in &mut self.offers {
            if offer.id != offer_id && offer.is_pending() {
                // Infallible: is_pending was just checked.
                let _ = offer.decide(OfferStatus::Expired, at);
            }
        }
        let assignment = Assignment {
            offer_id,
            provider_id,
            accepted_at: at,
        };
        self.assignment = Some(assignment);
        self.apply(TripPhase::Accepted, at, "offer accepted");
        Ok(assignment)
    }

    /// Reject a pending offer. The trip stays `SEARCHING` even when this
    /// was the last pending offer — exhaustion handling is the dispatch
    /// engine's configured policy, not an implicit cancel.
    pub fn reject_offer(
        &mut self,
        offer_id: OfferId,
        at: Timestamp,
    ) -> Result<RejectOutcome, OfferDecisionError> {
        let idx = self
            .offers
            .iter()
            .position(|o| o.id == offer_id)
            .ok_or(OfferDecisionError::OfferNotFound(offer_id))?;
        if self.offers[idx].status.is_decided() {
            return Err(OfferDecisionError::OfferAlreadyDecided {
                id: offer_id,
                status: self.offers[idx].status,
            });
        }
        self.offers[idx].decide(OfferStatus::Rejected, at)?;
        self.updated_at = at;
        Ok(RejectOutcome {
            exhausted: self.phase == TripPhase::Searching && self.pending_offer_count() == 0,
        })
    }

    /// Expire pending offers created at or before `now - ttl`.
    /// Returns how many expired.
    pub fn expire_offers_older_than(&mut self, ttl: Duration, now: Timestamp) -> usize {
        let mut expired = 0;
        for offer in &mut self.offers {
            if offer.is_pending() && now.since(offer.created_at) >= ttl {
                let _ = offer.decide(OfferStatus::Expired, now);
                expired += 1;
            }
        }
        if expired > 0 {
            self.updated_at = now;
        }
        expired
    }

    /// Expire every pending offer immediately.
    fn expire_pending_offers(&mut self, at: Timestamp) {
        for offer in &mut self.offers {
            if offer.is_pending() {
                let _ = offer.decide(OfferStatus::Expired, at);
            }
        }
    }

    /// Number of offers still awaiting a decision.
    pub fn pending_offer_count(&self) -> usize {
        self.offers.iter().filter(|o| o.is_pending()).count()
    }

    /// The offer with the given identifier, if present.
    pub fn offer(&self, offer_id: OfferId) -> Option<&Offer> {
        self.offers.iter().find(|o| o.id == offer_id)
    }
}

// ── Tests ────────────────────────────────────────────────────────────
