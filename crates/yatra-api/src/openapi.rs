//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI spec,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Yatra Dispatch API",
        version = "0.2.3",
        description = "Polling REST contract for the Yatra on-demand transport dispatch core: trips, offers, providers, and live tracking.",
        license(name = "BUSL-1.1")
    ),
    paths(
        // Trips
        crate::routes::trips::create_trip,
        crate::routes::trips::my_trips,
        crate::routes::trips::get_trip,
        crate::routes::trips::cancel_trip,
        crate::routes::trips::progress_trip,
        // Offers
        crate::routes::offers::pending_offers,
        crate::routes::offers::accept_offer,
        crate::routes::offers::reject_offer,
        // Providers
        crate::routes::providers::register_provider,
        crate::routes::providers::set_availability,
        // Tracking
        crate::routes::tracking::report_position,
        crate::routes::tracking::tracking_view,
    ),
    components(schemas(
        // Shared
        crate::routes::LatLng,
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        // Trip DTOs
        crate::routes::trips::CreateTripRequest,
        crate::routes::trips::CancelTripRequest,
        crate::routes::trips::ProgressTripRequest,
        crate::routes::trips::TripView,
        crate::routes::trips::AssignmentView,
        // Offer DTOs
        crate::routes::offers::OfferView,
        crate::routes::offers::OfferTripContext,
        crate::routes::offers::RejectResponse,
        // Provider DTOs
        crate::routes::providers::RegisterProviderRequest,
        crate::routes::providers::SetAvailabilityRequest,
        crate::routes::providers::ProviderView,
        // Tracking DTOs
        crate::routes::tracking::PositionReportRequest,
        crate::routes::tracking::PositionAck,
        crate::routes::tracking::PositionView,
        crate::routes::tracking::RouteView,
        crate::routes::tracking::TrackingView,
    )),
    tags(
        (name = "trips", description = "Trip lifecycle — creation, polling, cancellation, progress"),
        (name = "offers", description = "Offer broadcast and the first-accept-wins race"),
        (name = "providers", description = "Provider registration and availability"),
        (name = "tracking", description = "Position reports and the polling tracking view"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router, serving the spec at `/openapi.json`.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json — the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_builds_and_covers_the_surface() {
        let spec = ApiDoc::openapi();
        let json = serde_json::to_string(&spec).unwrap();
        for path in [
            "/v1/trips",
            "/v1/trips/mine",
            "/v1/trips/{id}/cancel",
            "/v1/providers/offers",
            "/v1/offers/{id}/accept",
            "/v1/tracking/update",
            "/v1/tracking/{trip_id}",
        ] {
            assert!(json.contains(path), "spec missing {path}");
        }
    }
}
