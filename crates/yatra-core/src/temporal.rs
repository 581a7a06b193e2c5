//! # Temporal Types
//!
//! UTC-only timestamp type for the dispatch stack. All timestamps are stored
//! in UTC; serialized form is ISO 8601 with a `Z` suffix.
//!
//! ## Design Decision
//!
//! Position reports arrive over a retried, unordered transport, so the core
//! constantly compares timestamps. [`Timestamp`] therefore derives `Ord` —
//! two reports for the same trip are ordered by their report time, and an
//! older report must lose. Local time conversion is a presentation concern
//! handled by clients.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A UTC timestamp.
///
/// Serializes to ISO 8601 format with a `Z` suffix
/// (e.g., `2026-03-02T09:41:03Z`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a timestamp representing the current UTC time.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Create a timestamp from a `chrono::DateTime<Utc>`.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Access the underlying `chrono::DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Signed duration from `earlier` to `self`.
    ///
    /// Positive when `self` is later than `earlier`.
    pub fn since(&self, earlier: Timestamp) -> Duration {
        self.0 - earlier.0
    }

    /// The timestamp advanced by `duration`.
    pub fn plus(&self, duration: Duration) -> Timestamp {
        Self(self.0 + duration)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%dT%H:%M:%SZ"))
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> Timestamp {
        Timestamp::from_datetime(Utc.timestamp_opt(secs, 0).unwrap())
    }

    #[test]
    fn ordering_follows_time() {
        assert!(at(100) < at(200));
        assert!(at(200) > at(100));
        assert_eq!(at(150), at(150));
    }

    #[test]
    fn since_is_signed() {
        assert_eq!(at(200).since(at(100)), Duration::seconds(100));
        assert_eq!(at(100).since(at(200)), Duration::seconds(-100));
    }

    #[test]
    fn plus_advances() {
        assert_eq!(at(100).plus(Duration::seconds(50)), at(150));
    }

    #[test]
    fn display_is_iso8601_z() {
        let ts = at(0);
        assert_eq!(ts.to_string(), "1970-01-01T00:00:00Z");
    }

    #[test]
    fn serde_roundtrip() {
        let ts = at(1_700_000_000);
        let json = serde_json::to_string(&ts).unwrap();
        let parsed: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, ts);
    }
}
