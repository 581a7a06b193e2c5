//! # Trip Categories & Vehicle Classes
//!
//! The service taxonomy: what kind of transport is being requested and what
//! kind of vehicle serves it. Wire representation is `SCREAMING_SNAKE_CASE`
//! to keep API payloads unambiguous — free-form status strings are exactly
//! the failure mode this enum set exists to prevent.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::temporal::Timestamp;

/// The category of a transport request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TripCategory {
    /// A hired driver operates the requester's own vehicle within the
    /// service area.
    DriverHire,
    /// Emergency tow service for a disabled vehicle.
    Tow,
    /// Long-distance travel beyond the service area.
    Outstation,
}

impl TripCategory {
    /// Return the string representation of this category.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DriverHire => "DRIVER_HIRE",
            Self::Tow => "TOW",
            Self::Outstation => "OUTSTATION",
        }
    }

    /// All categories, in declaration order.
    pub const ALL: [TripCategory; 3] = [Self::DriverHire, Self::Tow, Self::Outstation];
}

impl std::fmt::Display for TripCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The class of vehicle a request needs or a provider operates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleClass {
    /// Compact hatchback.
    Hatchback,
    /// Standard sedan.
    Sedan,
    /// Sport utility vehicle.
    Suv,
    /// Premium vehicle.
    Luxury,
    /// Flatbed tow truck.
    Flatbed,
    /// Wheel-lift tow truck.
    WheelLift,
}

impl VehicleClass {
    /// Return the string representation of this class.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hatchback => "HATCHBACK",
            Self::Sedan => "SEDAN",
            Self::Suv => "SUV",
            Self::Luxury => "LUXURY",
            Self::Flatbed => "FLATBED",
            Self::WheelLift => "WHEEL_LIFT",
        }
    }
}

impl std::fmt::Display for VehicleClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The requested service window: when the trip should start, and optionally
/// when it must be done.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Earliest acceptable start.
    pub starts_at: Timestamp,
    /// Latest acceptable end, when the requester has a deadline.
    pub ends_at: Option<Timestamp>,
}

impl TimeWindow {
    /// Create a validated time window.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::WindowOutOfOrder`] when an end is given
    /// that precedes the start.
    pub fn new(starts_at: Timestamp, ends_at: Option<Timestamp>) -> Result<Self, ValidationError> {
        if let Some(end) = ends_at {
            if end < starts_at {
                return Err(ValidationError::WindowOutOfOrder);
            }
        }
        Ok(Self { starts_at, ends_at })
    }
}
