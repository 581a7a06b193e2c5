//! # The Dispatch Engine
//!
//! Broadcast and the race. `create_offers` fans a searching trip out to
//! every eligible provider simultaneously — no ranking, no ordering; a
//! priority layer, if a deployment wants one, sits outside the core.
//! `accept` resolves the first-accept-wins race as one compound step under
//! the trip's guard; `reject` applies the configured exhaustion policy
//! when it retires the last pending offer.

use std::sync::Arc;

use yatra_core::{OfferId, Timestamp, TripId};
use yatra_state::{Assignment, Offer, OfferDecisionError, Trip};

use crate::config::{DispatchConfig, ExhaustionPolicy};
use crate::error::DispatchError;
use crate::registry::ProviderRegistry;
use crate::store::TripStore;

/// Offer creation and resolution.
#[derive(Debug, Clone)]
pub struct DispatchEngine {
    store: TripStore,
    registry: ProviderRegistry,
    config: Arc<DispatchConfig>,
}

impl DispatchEngine {
    /// Create an engine over the shared store and registry.
    pub fn new(store: TripStore, registry: ProviderRegistry, config: Arc<DispatchConfig>) -> Self {
        Self {
            store,
            registry,
            config,
        }
    }

    /// Fan a searching trip out to the currently eligible provider set.
    ///
    /// Returns the created offers; an empty set is not an error — the trip
    /// keeps searching and a later sweep or re-broadcast may find
    /// providers.
    ///
    /// # Errors
    ///
    /// [`DispatchError::TripNotFound`], or a wrapped
    /// [`OfferDecisionError::TripNotSearching`] when the trip has already
    /// left `SEARCHING`.
    pub fn create_offers(
        &self,
        trip_id: TripId,
        now: Timestamp,
    ) -> Result<Vec<Offer>, DispatchError> {
        // Eligibility is read before taking the trip guard; broadcast
        // re-validates the phase under the guard.
        let record = self
            .store
            .get(trip_id)
            .ok_or(DispatchError::TripNotFound(trip_id))?;
        let eligible = self
            .registry
            .eligible_for(record.trip.category(), record.trip.request.vehicle_class);

        let created = self
            .store
            .with_trip(trip_id, |rec| {
                rec.trip
                    .broadcast_offers(&eligible, now)
                    .map_err(DispatchError::from)
            })
            .ok_or(DispatchError::TripNotFound(trip_id))??;

        self.store.index_offers(&created);
        tracing::info!(
            trip_id = %trip_id,
            offers = created.len(),
            eligible = eligible.len(),
            "dispatch broadcast"
        );
        Ok(created)
    }

    /// Accept an offer. Exactly one caller per trip ever succeeds; the
    /// rest observe `OfferAlreadyDecided` or `TripNotSearching` and must
    /// re-poll.
    pub fn accept(&self, offer_id: OfferId, now: Timestamp) -> Result<Assignment, DispatchError> {
        let trip_id = self
            .store
            .trip_id_for_offer(offer_id)
            .ok_or(DispatchError::Offer(OfferDecisionError::OfferNotFound(offer_id)))?;

        let assignment = self
            .store
            .with_trip(trip_id, |rec| {
                rec.trip
                    .accept_offer(offer_id, now)
                    .map_err(DispatchError::from)
            })
            .ok_or(DispatchError::TripNotFound(trip_id))??;

        tracing::info!(
            trip_id = %trip_id,
            offer_id = %offer_id,
            provider_id = %assignment.provider_id,
            "offer accepted"
        );
        Ok(assignment)
    }

    /// Reject an offer. When this retires the trip's last pending offer,
    /// the configured exhaustion policy runs in the same guarded step.
    pub fn reject(&self, offer_id: OfferId, now: Timestamp) -> Result<(), DispatchError> {
        let trip_id = self
            .store
            .trip_id_for_offer(offer_id)
            .ok_or(DispatchError::Offer(OfferDecisionError::OfferNotFound(offer_id)))?;

        let created = self
            .store
            .with_trip(trip_id, |rec| -> Result<Vec<Offer>, DispatchError> {
                let outcome = rec
                    .trip
                    .reject_offer(offer_id, now)
                    .map_err(DispatchError::from)?;
                if outcome.exhausted {
                    Ok(self.apply_exhaustion(&mut rec.trip, now))
                } else {
                    Ok(Vec::new())
                }
            })
            .ok_or(DispatchError::TripNotFound(trip_id))??;

        self.store.index_offers(&created);
        Ok(())
    }

    /// Apply the exhaustion policy to a searching trip with no pending
    /// offers. Returns any newly created offers (caller indexes them).
    ///
    /// Runs under the trip's guard; the registry read is lock-independent
    /// of trips.
    pub(crate) fn apply_exhaustion(&self, trip: &mut Trip, now: Timestamp) -> Vec<Offer> {
        match self.config.exhaustion {
            ExhaustionPolicy::WaitForExpiry => {
                tracing::debug!(
                    trip_id = %trip.id(),
                    "offers exhausted; waiting for search TTL"
                );
                Vec::new()
            }
            ExhaustionPolicy::Rebroadcast { max_rounds } => {
                if trip.dispatch_round >= max_rounds {
                    tracing::debug!(
                        trip_id = %trip.id(),
                        rounds = trip.dispatch_round,
                        "offers exhausted; re-broadcast rounds spent"
                    );
                    return Vec::new();
                }
                let eligible = self
                    .registry
                    .eligible_for(trip.category(), trip.request.vehicle_class);
                match trip.broadcast_offers(&eligible, now) {
                    Ok(created) => {
                        tracing::info!(
                            trip_id = %trip.id(),
                            offers = created.len(),
                            round = trip.dispatch_round,
                            "re-broadcast after exhaustion"
                        );
                        created
                    }
                    // Phase changed under our feet is impossible here (we
                    // hold the guard), but stay total.
                    Err(_) => Vec::new(),
                }
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
