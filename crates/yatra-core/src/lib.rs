#![deny(missing_docs)]

//! # yatra-core — Foundational Types for the Yatra Dispatch Stack
//!
//! This crate defines the foundational types that every other crate in the
//! workspace depends on. It has no internal crate dependencies — only `serde`,
//! `serde_json`, `thiserror`, `chrono`, and `uuid` from the external ecosystem.
//!
//! ## Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** Every identifier is a
//!    distinct type. You cannot pass a [`ProviderId`] where a [`RequesterId`]
//!    is expected.
//!
//! 2. **Coordinates validated at construction.** [`GeoPoint::new`] rejects
//!    out-of-range latitudes and longitudes, so downstream geometry never has
//!    to re-check.
//!
//! 3. **UTC only.** All timestamps flow through [`Timestamp`]; local time is
//!    a presentation concern.
//!
//! 4. **[`ValidationError`] hierarchy.** Structured errors with `thiserror` —
//!    no `Box<dyn Error>`, no `.unwrap()` outside tests.

pub mod error;
pub mod geo;
pub mod identity;
pub mod temporal;
pub mod trip;

// Re-export primary types at crate root for ergonomic imports.
pub use error::ValidationError;
pub use geo::GeoPoint;
pub use identity::{OfferId, ProviderId, RequesterId, TripId};
pub use temporal::Timestamp;
pub use trip::{TimeWindow, TripCategory, VehicleClass};
