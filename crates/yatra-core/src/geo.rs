//! # Geographic Primitives
//!
//! A validated WGS-84 coordinate pair. Construction rejects out-of-range
//! values so downstream geometry (distance, geofence containment, route
//! requests) never has to re-check.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A WGS-84 coordinate: latitude in degrees (−90..=90), longitude in
/// degrees (−180..=180).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lng: f64,
}

impl GeoPoint {
    /// Create a validated coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidCoordinate`] when either component
    /// is out of range or non-finite.
    pub fn new(lat: f64, lng: f64) -> Result<Self, ValidationError> {
        if !lat.is_finite() || !lng.is_finite() || !(-90.0..=90.0).contains(&lat)
            || !(-180.0..=180.0).contains(&lng)
        {
            return Err(ValidationError::InvalidCoordinate { lat, lng });
        }
        Ok(Self { lat, lng })
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lng)
    }
}
