//! # Validation Errors
//!
//! Synchronous rejection of malformed input at construction time. These are
//! the "never retried" class of errors: the caller sent something that can
//! not be served, and re-sending the same payload will fail the same way.

use thiserror::Error;

/// Errors raised while validating request input.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A coordinate component is out of range or non-finite.
    #[error("invalid coordinate: lat={lat}, lng={lng}")]
    InvalidCoordinate {
        /// The offending latitude.
        lat: f64,
        /// The offending longitude.
        lng: f64,
    },

    /// A required location is absent.
    #[error("missing location: {0}")]
    MissingLocation(String),

    /// A required text field is empty.
    #[error("{0} must not be empty")]
    EmptyField(String),

    /// The requested time window ends before it starts.
    #[error("time window ends before it starts")]
    WindowOutOfOrder,

    /// The pickup (or dropoff) point is outside the serviceable region.
    #[error("location not serviceable: {0}")]
    OutsideServiceArea(String),
}
