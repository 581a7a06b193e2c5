//! # OSRM HTTP Adapter
//!
//! Concrete [`RouteOracle`] backed by an OSRM-compatible `/route/v1`
//! endpoint. The adapter asks for full-overview GeoJSON geometry and maps
//! the first returned route into a [`RoutePlan`]; everything else the
//! oracle knows (alternatives, legs, annotations) is deliberately ignored.

use serde::Deserialize;

use yatra_core::{GeoPoint, Timestamp};

use crate::oracle::{PlanFuture, RouteError, RouteOracle, RoutePlan};
use crate::retry::retry_send;

/// Configuration for the OSRM adapter.
#[derive(Debug, Clone)]
pub struct OsrmConfig {
    /// Base URL of the OSRM service.
    pub base_url: String,
    /// Routing profile (`car`, `truck`, ...).
    pub profile: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            profile: "car".to_string(),
            timeout_secs: 5,
        }
    }
}

impl OsrmConfig {
    /// Build configuration from `YATRA_OSRM_URL`, `YATRA_OSRM_PROFILE`,
    /// and `YATRA_OSRM_TIMEOUT_SECS`, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("YATRA_OSRM_URL").unwrap_or(defaults.base_url),
            profile: std::env::var("YATRA_OSRM_PROFILE").unwrap_or(defaults.profile),
            timeout_secs: std::env::var("YATRA_OSRM_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.timeout_secs),
        }
    }
}

/// OSRM-backed route oracle.
#[derive(Debug, Clone)]
pub struct OsrmOracle {
    config: OsrmConfig,
    client: reqwest::Client,
}

impl OsrmOracle {
    /// Create an oracle from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::Config`] when the HTTP client cannot be built
    /// or the base URL does not parse.
    pub fn new(config: OsrmConfig) -> Result<Self, RouteError> {
        url::Url::parse(&config.base_url)
            .map_err(|e| RouteError::Config(format!("invalid base url {}: {e}", config.base_url)))?;
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RouteError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    fn route_url(&self, from: GeoPoint, to: GeoPoint) -> String {
        // OSRM takes lng,lat pairs.
        format!(
            "{}/route/v1/{}/{:.6},{:.6};{:.6},{:.6}?overview=full&geometries=geojson",
            self.config.base_url, self.config.profile, from.lng, from.lat, to.lng, to.lat
        )
    }

    async fn fetch(&self, from: GeoPoint, to: GeoPoint) -> Result<RoutePlan, RouteError> {
        let endpoint = self.route_url(from, to);

        let response = retry_send(|| self.client.get(&endpoint).send())
            .await
            .map_err(|source| RouteError::Http {
                endpoint: endpoint.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RouteError::Api {
                endpoint,
                status: status.as_u16(),
                body,
            });
        }

        let body: OsrmRouteResponse =
            response
                .json()
                .await
                .map_err(|source| RouteError::Deserialization {
                    endpoint: endpoint.clone(),
                    source,
                })?;

        let route = body
            .routes
            .into_iter()
            .next()
            .ok_or(RouteError::NoRoute { from, to })?;

        let mut points = Vec::with_capacity(route.geometry.coordinates.len());
        for [lng, lat] in route.geometry.coordinates {
            let point = GeoPoint::new(lat, lng).map_err(|e| {
                RouteError::InvalidGeometry(format!("oracle vertex out of range: {e}"))
            })?;
            points.push(point);
        }
        if points.is_empty() {
            return Err(RouteError::NoRoute { from, to });
        }

        Ok(RoutePlan {
            points,
            distance_m: route.distance,
            duration_s: route.duration,
            fetched_at: Timestamp::now(),
        })
    }
}

impl RouteOracle for OsrmOracle {
    fn plan(&self, from: GeoPoint, to: GeoPoint) -> PlanFuture<'_> {
        Box::pin(self.fetch(from, to))
    }
}

// ── Wire types ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct OsrmRouteResponse {
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    distance: f64,
    duration: f64,
    geometry: OsrmGeometry,
}

#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    coordinates: Vec<[f64; 2]>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_url_is_lng_lat_ordered() {
        let oracle = OsrmOracle::new(OsrmConfig::default()).unwrap();
        let from = GeoPoint::new(12.9716, 77.5946).unwrap();
        let to = GeoPoint::new(12.9698, 77.7500).unwrap();
        let url = oracle.route_url(from, to);
        assert!(url.starts_with("http://localhost:5000/route/v1/car/"));
        assert!(url.contains("77.594600,12.971600;77.750000,12.969800"));
        assert!(url.ends_with("overview=full&geometries=geojson"));
    }

    #[test]
    fn invalid_base_url_is_config_error() {
        let config = OsrmConfig {
            base_url: "not a url".to_string(),
            ..OsrmConfig::default()
        };
        assert!(matches!(OsrmOracle::new(config), Err(RouteError::Config(_))));
    }

    #[test]
    fn response_parses_geojson_geometry() {
        let raw = r#"{
            "code": "Ok",
            "routes": [{
                "distance": 19850.3,
                "duration": 2410.8,
                "geometry": {"coordinates": [[77.5946, 12.9716], [77.6100, 12.9720], [77.7500, 12.9698]]}
            }]
        }"#;
        let parsed: OsrmRouteResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.routes.len(), 1);
        assert_eq!(parsed.routes[0].geometry.coordinates.len(), 3);
        assert_eq!(parsed.routes[0].geometry.coordinates[0], [77.5946, 12.9716]);
    }

    #[test]
    fn empty_routes_parse_to_empty_vec() {
        let parsed: OsrmRouteResponse = serde_json::from_str(r#"{"code":"NoRoute"}"#).unwrap();
        assert!(parsed.routes.is_empty());
    }

    #[tokio::test]
    async fn unreachable_oracle_yields_http_error() {
        let config = OsrmConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            timeout_secs: 1,
            ..OsrmConfig::default()
        };
        let oracle = OsrmOracle::new(config).unwrap();
        let from = GeoPoint::new(12.97, 77.59).unwrap();
        let to = GeoPoint::new(12.98, 77.60).unwrap();
        let err = oracle.plan(from, to).await.unwrap_err();
        assert!(matches!(err, RouteError::Http { .. }), "got: {err:?}");
    }
}
