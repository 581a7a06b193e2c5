#![deny(missing_docs)]

//! # yatra-geo — Geographic Predicates
//!
//! Pure geometry for the dispatch core: great-circle distance, bounding-box
//! containment, and the service-area geofence. Nothing in this crate touches
//! the network or mutates state — every function is deterministic in its
//! arguments, which is what lets trip creation and tracking call these
//! predicates on every request without coordination.

pub mod distance;
pub mod fence;

pub use distance::haversine_m;
pub use fence::{BoundingBox, GeofenceRegion, GeofenceScope};
