//! # Trip Phases & the Transition Table
//!
//! The single authoritative answer to "may this trip move from A to B?".
//! Category differences (tow's `ARRIVED` leg, everyone else skipping it)
//! live here and nowhere else.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use yatra_core::{Timestamp, TripCategory};

// ── Phase ────────────────────────────────────────────────────────────

/// The lifecycle phase of a trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TripPhase {
    /// Created, offers outstanding, no provider assigned.
    Searching,
    /// A provider won the offer race and is assigned.
    Accepted,
    /// Service is underway.
    InProgress,
    /// The crew has reached the pickup site (tow only).
    Arrived,
    /// Service finished successfully. Terminal.
    Completed,
    /// Cancelled by the requester or an operator. Terminal.
    Cancelled,
    /// The search window elapsed without an assignment. Terminal.
    Expired,
}

impl TripPhase {
    /// Return the string representation of this phase.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Searching => "SEARCHING",
            Self::Accepted => "ACCEPTED",
            Self::InProgress => "IN_PROGRESS",
            Self::Arrived => "ARRIVED",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
            Self::Expired => "EXPIRED",
        }
    }

    /// Whether this phase is terminal (no further transition permitted).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Expired)
    }

    /// Whether position reports are accepted in this phase.
    pub fn is_trackable(&self) -> bool {
        matches!(self, Self::Accepted | Self::InProgress | Self::Arrived)
    }
}

impl std::fmt::Display for TripPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Transition table ─────────────────────────────────────────────────

/// Whether `from → to` is a legal transition for the given category.
pub fn transition_allowed(category: TripCategory, from: TripPhase, to: TripPhase) -> bool {
    use TripPhase::*;
    let tow = category == TripCategory::Tow;
    match (from, to) {
        (Searching, Accepted) | (Searching, Cancelled) | (Searching, Expired) => true,
        (Accepted, InProgress) | (Accepted, Cancelled) => true,
        (Accepted, Arrived) => tow,
        (InProgress, Completed) | (InProgress, Cancelled) => true,
        (InProgress, Arrived) => tow,
        (Arrived, Completed) | (Arrived, Cancelled) => tow,
        _ => false,
    }
}

// ── Errors ───────────────────────────────────────────────────────────

/// Errors raised by trip state transitions.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TripStateError {
    /// The trip is already in a terminal state; nothing may follow.
    #[error("trip is terminal in state {phase} and cannot transition")]
    TripAlreadyTerminal {
        /// The terminal phase the trip is in.
        phase: TripPhase,
    },

    /// The attempted transition is not in the category's transition subset.
    #[error("invalid {category} transition: {from} -> {to}")]
    InvalidTransition {
        /// The trip's category.
        category: TripCategory,
        /// Current phase.
        from: TripPhase,
        /// Attempted target phase.
        to: TripPhase,
    },
}

// ── Transition Record ────────────────────────────────────────────────

/// A single entry in a trip's transition audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// Phase before the transition.
    pub from_phase: TripPhase,
    /// Phase after the transition.
    pub to_phase: TripPhase,
    /// When the transition occurred.
    pub at: Timestamp,
    /// Why the transition occurred.
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use TripPhase::*;

    const ALL_PHASES: [TripPhase; 7] = [
        Searching, Accepted, InProgress, Arrived, Completed, Cancelled, Expired,
    ];

    #[test]
    fn terminal_phases() {
        assert!(Completed.is_terminal());
        assert!(Cancelled.is_terminal());
        assert!(Expired.is_terminal());
        assert!(!Searching.is_terminal());
        assert!(!Accepted.is_terminal());
        assert!(!InProgress.is_terminal());
        assert!(!Arrived.is_terminal());
    }

    #[test]
    fn trackable_phases() {
        assert!(Accepted.is_trackable());
        assert!(InProgress.is_trackable());
        assert!(Arrived.is_trackable());
        assert!(!Searching.is_trackable());
        assert!(!Completed.is_trackable());
        assert!(!Cancelled.is_trackable());
        assert!(!Expired.is_trackable());
    }

    #[test]
    fn no_transitions_out_of_terminal_states() {
        for cat in TripCategory::ALL {
            for from in [Completed, Cancelled, Expired] {
                for to in ALL_PHASES {
                    assert!(
                        !transition_allowed(cat, from, to),
                        "{cat}: {from} -> {to} must be illegal"
                    );
                }
            }
        }
    }

    #[test]
    fn searching_transitions_are_category_independent() {
        for cat in TripCategory::ALL {
            assert!(transition_allowed(cat, Searching, Accepted));
            assert!(transition_allowed(cat, Searching, Cancelled));
            assert!(transition_allowed(cat, Searching, Expired));
            assert!(!transition_allowed(cat, Searching, InProgress));
            assert!(!transition_allowed(cat, Searching, Arrived));
            assert!(!transition_allowed(cat, Searching, Completed));
        }
    }

    #[test]
    fn arrived_is_tow_only() {
        assert!(transition_allowed(TripCategory::Tow, Accepted, Arrived));
        assert!(transition_allowed(TripCategory::Tow, InProgress, Arrived));
        assert!(!transition_allowed(TripCategory::DriverHire, Accepted, Arrived));
        assert!(!transition_allowed(TripCategory::DriverHire, InProgress, Arrived));
        assert!(!transition_allowed(TripCategory::Outstation, Accepted, Arrived));
        assert!(!transition_allowed(TripCategory::Outstation, InProgress, Arrived));
    }

    #[test]
    fn driver_hire_skips_arrived_to_complete() {
        assert!(transition_allowed(TripCategory::DriverHire, InProgress, Completed));
        assert!(transition_allowed(TripCategory::Outstation, InProgress, Completed));
    }

    #[test]
    fn tow_full_chain() {
        let cat = TripCategory::Tow;
        assert!(transition_allowed(cat, Searching, Accepted));
        assert!(transition_allowed(cat, Accepted, InProgress));
        assert!(transition_allowed(cat, InProgress, Arrived));
        assert!(transition_allowed(cat, Arrived, Completed));
    }

    #[test]
    fn expired_only_from_searching() {
        for cat in TripCategory::ALL {
            for from in [Accepted, InProgress, Arrived] {
                assert!(!transition_allowed(cat, from, Expired), "{cat}: {from} -> EXPIRED");
            }
        }
    }

    #[test]
    fn no_backwards_transitions() {
        for cat in TripCategory::ALL {
            assert!(!transition_allowed(cat, Accepted, Searching));
            assert!(!transition_allowed(cat, InProgress, Accepted));
            assert!(!transition_allowed(cat, Arrived, InProgress));
        }
    }

    #[test]
    fn wire_format_is_screaming_snake() {
        assert_eq!(serde_json::to_string(&InProgress).unwrap(), "\"IN_PROGRESS\"");
        let parsed: TripPhase = serde_json::from_str("\"SEARCHING\"").unwrap();
        assert_eq!(parsed, Searching);
    }
}
