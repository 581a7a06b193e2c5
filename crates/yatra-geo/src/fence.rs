//! # Service-Area Geofence
//!
//! Decides whether a requested location can be served at all. The decision
//! policy, in order:
//!
//! 1. If any configured service-area keyword appears (case-insensitive) in
//!    the resolved address text, accept.
//! 2. Else, if the coordinate lies within the configured bounding box,
//!    accept.
//! 3. Otherwise reject. A location with neither a coordinate nor address
//!    text is rejected outright — an unlocatable point cannot be served.
//!
//! The validator is a pure predicate: no network, no state, identical input
//! always yields the identical verdict. The coordinate check stands alone
//! when geocoder metadata is absent.
//!
//! Which trip legs are checked varies by category ([`GeofenceScope`]):
//! driver hire is fenced at both ends, tow only at the breakdown site, and
//! outstation travel is exempt because leaving the service area is the
//! point of the category.

use serde::{Deserialize, Serialize};

use yatra_core::{GeoPoint, TripCategory};

// ── Bounding Box ─────────────────────────────────────────────────────

/// An axis-aligned latitude/longitude bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Southern edge.
    pub min_lat: f64,
    /// Northern edge.
    pub max_lat: f64,
    /// Western edge.
    pub min_lng: f64,
    /// Eastern edge.
    pub max_lng: f64,
}

impl BoundingBox {
    /// Whether the point lies inside the box (edges inclusive).
    pub fn contains(&self, point: GeoPoint) -> bool {
        (self.min_lat..=self.max_lat).contains(&point.lat)
            && (self.min_lng..=self.max_lng).contains(&point.lng)
    }
}

// ── Geofence Scope ───────────────────────────────────────────────────

/// Which legs of a trip the geofence applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GeofenceScope {
    /// Both pickup and dropoff must be serviceable.
    PickupAndDropoff,
    /// Only the pickup must be serviceable.
    PickupOnly,
    /// Neither end is fenced; locations must merely be present.
    Exempt,
}

impl GeofenceScope {
    /// The scope applied to a trip category.
    pub fn for_category(category: TripCategory) -> GeofenceScope {
        match category {
            TripCategory::DriverHire => Self::PickupAndDropoff,
            TripCategory::Tow => Self::PickupOnly,
            TripCategory::Outstation => Self::Exempt,
        }
    }
}

// ── Geofence Region ──────────────────────────────────────────────────

/// A named serviceable region: keyword set plus bounding box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeofenceRegion {
    /// Human-readable region name.
    pub name: String,
    /// Case-insensitive substrings matched against resolved address text.
    pub keywords: Vec<String>,
    /// Coordinate fallback when address text is absent or unmatched.
    pub bounds: BoundingBox,
}

impl GeofenceRegion {
    /// The default Bengaluru service area.
    pub fn bengaluru() -> Self {
        Self {
            name: "Bengaluru".to_string(),
            keywords: vec![
                "bengaluru".to_string(),
                "bangalore".to_string(),
                "bengalooru".to_string(),
                "blr".to_string(),
                "karnataka".to_string(),
            ],
            bounds: BoundingBox {
                min_lat: 12.70,
                max_lat: 13.25,
                min_lng: 77.30,
                max_lng: 77.90,
            },
        }
    }

    /// Whether a location is inside the serviceable region.
    ///
    /// `point` is the best-effort resolved coordinate; `address_text` is the
    /// geocoder's resolved textual metadata. Either may be absent. Both
    /// absent fails closed.
    pub fn is_serviceable(&self, point: Option<GeoPoint>, address_text: Option<&str>) -> bool {
        if let Some(text) = address_text {
            let lowered = text.to_lowercase();
            if self.keywords.iter().any(|kw| lowered.contains(kw.as_str())) {
                return true;
            }
        }
        match point {
            Some(p) => self.bounds.contains(p),
            None => false,
        }
    }
}
