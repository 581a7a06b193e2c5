//! # Route Modules
//!
//! The polling REST surface: trips (requester side), offers and tracking
//! updates (provider side), provider registration, and the tracking view.
//! No business logic in handlers — everything delegates to the dispatch
//! core; handlers translate identity, DTOs, and errors.

pub mod offers;
pub mod providers;
pub mod tracking;
pub mod trips;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use yatra_core::GeoPoint;
use yatra_state::Trip;

use crate::auth::CallerIdentity;
use crate::error::AppError;

/// Wire-format coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LatLng {
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lng: f64,
}

impl LatLng {
    /// Convert to a validated [`GeoPoint`].
    pub fn to_point(self) -> Result<GeoPoint, AppError> {
        GeoPoint::new(self.lat, self.lng).map_err(|e| AppError::Validation(e.to_string()))
    }

    /// Convert from a validated [`GeoPoint`].
    pub fn from_point(point: GeoPoint) -> Self {
        Self {
            lat: point.lat,
            lng: point.lng,
        }
    }
}

/// Whether the caller may read this trip: ops, the owning requester, or
/// the assigned provider.
pub(crate) fn ensure_trip_access(caller: &CallerIdentity, trip: &Trip) -> Result<(), AppError> {
    if caller.is_ops() {
        return Ok(());
    }
    if let Ok(requester) = caller.requester_id() {
        if trip.request.requester_id == requester {
            return Ok(());
        }
    }
    if let Ok(provider) = caller.provider_id() {
        if trip.assigned_provider() == Some(provider) {
            return Ok(());
        }
    }
    Err(AppError::Forbidden("not a party to this trip".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use chrono::{TimeZone, Utc};
    use yatra_core::{
        RequesterId, TimeWindow, Timestamp, TripCategory, TripId, VehicleClass,
    };
    use yatra_state::TripRequest;

    fn trip(requester: RequesterId) -> Trip {
        Trip::new(TripRequest {
            id: TripId::new(),
            requester_id: requester,
            category: TripCategory::DriverHire,
            vehicle_class: VehicleClass::Sedan,
            pickup: GeoPoint::new(12.97, 77.59).unwrap(),
            dropoff: None,
            pickup_address: None,
            dropoff_address: None,
            window: TimeWindow::new(
                Timestamp::from_datetime(Utc.timestamp_opt(0, 0).unwrap()),
                None,
            )
            .unwrap(),
            note: None,
            created_at: Timestamp::from_datetime(Utc.timestamp_opt(0, 0).unwrap()),
        })
    }

    #[test]
    fn latlng_roundtrip_and_validation() {
        let point = LatLng { lat: 12.97, lng: 77.59 }.to_point().unwrap();
        assert_eq!(LatLng::from_point(point), LatLng { lat: 12.97, lng: 77.59 });
        assert!(LatLng { lat: 120.0, lng: 0.0 }.to_point().is_err());
    }

    #[test]
    fn ops_sees_everything() {
        let caller = CallerIdentity {
            role: Role::Ops,
            subject: None,
        };
        assert!(ensure_trip_access(&caller, &trip(RequesterId::new())).is_ok());
    }

    #[test]
    fn owner_sees_own_trip_only() {
        let requester = RequesterId::new();
        let caller = CallerIdentity {
            role: Role::Requester,
            subject: Some(*requester.as_uuid()),
        };
        assert!(ensure_trip_access(&caller, &trip(requester)).is_ok());
        assert!(ensure_trip_access(&caller, &trip(RequesterId::new())).is_err());
    }

    #[test]
    fn unassigned_provider_is_denied() {
        let caller = CallerIdentity {
            role: Role::Provider,
            subject: Some(uuid::Uuid::new_v4()),
        };
        assert!(ensure_trip_access(&caller, &trip(RequesterId::new())).is_err());
    }
}
