//! Haversine great-circle distance.
//!
//! Ignores roads, which is fine for the two places the core needs distance:
//! pickup-proximity detection (hundreds of metres) and lateral deviation
//! from a planned route (also hundreds of metres). Road routing comes from
//! the external oracle, never from here.

use yatra_core::GeoPoint;

/// Earth radius in metres.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two points in metres.
pub fn haversine_m(from: GeoPoint, to: GeoPoint) -> f64 {
    let lat1_rad = from.lat.to_radians();
    let lat2_rad = to.lat.to_radians();
    let delta_lat = (to.lat - from.lat).to_radians();
    let delta_lng = (to.lng - from.lng).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_M * c
}

/// Minimum haversine distance from `point` to any vertex of `path`, in
/// metres. Returns `None` for an empty path.
///
/// Vertex distance is a conservative stand-in for true segment distance:
/// oracle polylines place vertices every few tens of metres, so the error
/// is far below any deviation threshold worth configuring.
pub fn min_distance_to_path_m(point: GeoPoint, path: &[GeoPoint]) -> Option<f64> {
    path.iter()
        .map(|p| haversine_m(point, *p))
        .min_by(|a, b| a.total_cmp(b))
}
