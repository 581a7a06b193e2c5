#![deny(missing_docs)]

//! # yatra-state — Trip & Offer Lifecycle State Machines
//!
//! One explicit trip-state enumeration with category-specific transition
//! subsets, replacing any ad-hoc string/boolean combination a client might
//! invent. Every mutation of a [`Trip`] flows through a validated
//! transition and lands in the trip's audit log.
//!
//! ## States
//!
//! ```text
//!                    ┌────────────▶ CANCELLED (terminal)
//!                    │
//! SEARCHING ──▶ ACCEPTED ──▶ IN_PROGRESS ──▶ ARRIVED ──▶ COMPLETED (terminal)
//!     │              │            │             │
//!     │              └──────┐     └──▶ COMPLETED└──▶ CANCELLED
//!     │                     ▼
//!     │                  ARRIVED   (tow shortcut: crew reached the site)
//!     ▼
//!  EXPIRED (terminal, search timed out)
//! ```
//!
//! Driver hire and outstation trips skip `ARRIVED`; tow trips may take the
//! full chain or the `ACCEPTED → ARRIVED` shortcut when the crew reports a
//! position inside the pickup radius.
//!
//! ## Design Decision
//!
//! The trip lifecycle uses an enum with validated transitions rather than
//! typestate types. Trips are runtime-dynamic records living in a shared
//! store and crossing an HTTP boundary; the invariant that matters — no
//! transition out of a terminal state, no skipped category gate — is
//! validated in one place ([`Trip::transition_to`]) and recorded in the
//! transition log.

pub mod offer;
pub mod phase;
pub mod trip;

pub use offer::{Offer, OfferDecisionError, OfferStatus};
pub use phase::{transition_allowed, TransitionRecord, TripPhase, TripStateError};
pub use trip::{Assignment, RejectOutcome, Trip, TripRequest};
