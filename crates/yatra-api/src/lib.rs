//! # yatra-api — Axum API Service for the Yatra Dispatch Stack
//!
//! The polling REST surface over the dispatch core. Clients (requester
//! app, provider app) poll every 10–15 seconds; every read here is
//! cache-only and safe at that cadence.
//!
//! ## API Surface
//!
//! | Prefix                     | Module                 | Caller     |
//! |----------------------------|------------------------|------------|
//! | `/v1/trips/*`              | [`routes::trips`]      | requester (progress: provider) |
//! | `/v1/providers/offers`     | [`routes::offers`]     | provider   |
//! | `/v1/offers/*`             | [`routes::offers`]     | provider   |
//! | `/v1/providers/*`          | [`routes::providers`]  | provider   |
//! | `/v1/tracking/*`           | [`routes::tracking`]   | both       |
//! | `/health/*`, `/metrics`    | here                   | unauthenticated |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → AuthMiddleware → Handler
//! ```

pub mod auth;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use std::collections::HashMap;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::{Extension, Router};
use tower_http::trace::TraceLayer;

use yatra_core::Timestamp;
use yatra_dispatch::TripLifecycleCoordinator;

use crate::auth::AuthConfig;
use crate::middleware::metrics::ApiMetrics;
use crate::state::AppState;

pub use error::AppError;

/// Assemble the full application router with all routes and middleware.
///
/// Health probes (`/health/*`) and `/metrics` are mounted outside the
/// auth middleware so they remain accessible without credentials.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };
    let metrics = ApiMetrics::new();
    let metrics_on = state.config.metrics_enabled;

    // Authenticated API routes.
    //
    // Body size limit: 256 KiB — the largest legitimate payload here is a
    // trip creation with two addresses and a note.
    let mut api = Router::new()
        .merge(routes::trips::router())
        .merge(routes::offers::router())
        .merge(routes::providers::router())
        .merge(routes::tracking::router())
        .merge(openapi::router())
        .layer(DefaultBodyLimit::max(256 * 1024))
        .layer(from_fn(auth::auth_middleware));

    if metrics_on {
        api = api
            .layer(from_fn(middleware::metrics::metrics_middleware))
            .layer(Extension(metrics.clone()));
    }

    let api = api
        .layer(TraceLayer::new_for_http())
        .layer(Extension(auth_config))
        .with_state(state.clone());

    // Unauthenticated health probes and metrics scrape.
    let mut unauthenticated = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness));

    if metrics_on {
        unauthenticated = unauthenticated
            .route("/metrics", axum::routing::get(prometheus_metrics))
            .layer(Extension(metrics));
    }

    let unauthenticated = unauthenticated.with_state(state);

    Router::new().merge(unauthenticated).merge(api)
}

/// Spawn the background expiry sweep: every `period`, expire overdue
/// offers and searching trips per the configured policy.
pub fn spawn_expiry_sweep(
    coordinator: TripLifecycleCoordinator,
    period: std::time::Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // The first tick fires immediately; skip it so a fresh boot does
        // not sweep an empty store.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let report = coordinator.expire_overdue(Timestamp::now());
            if report.trips_expired > 0 || report.offers_expired > 0 {
                tracing::debug!(
                    trips_expired = report.trips_expired,
                    offers_expired = report.offers_expired,
                    "sweep pass complete"
                );
            }
        }
    })
}

/// GET /metrics — Prometheus metrics scrape endpoint.
///
/// Updates domain gauges from current `AppState` on each scrape (pull
/// model), then gathers and encodes all metrics in text exposition
/// format.
async fn prometheus_metrics(
    State(state): State<AppState>,
    Extension(metrics): Extension<ApiMetrics>,
) -> impl IntoResponse {
    // -- Trips by phase, offers by status --
    let mut trips_by_phase: HashMap<&'static str, usize> = HashMap::new();
    let mut offers_by_status: HashMap<&'static str, usize> = HashMap::new();
    for trip_id in state.store.trip_ids() {
        if let Some(record) = state.store.get(trip_id) {
            *trips_by_phase.entry(record.trip.phase.as_str()).or_default() += 1;
            for offer in &record.trip.offers {
                *offers_by_status.entry(offer.status.as_str()).or_default() += 1;
            }
        }
    }
    metrics.trips_total().reset();
    for (phase, count) in &trips_by_phase {
        metrics
            .trips_total()
            .with_label_values(&[phase])
            .set(*count as f64);
    }
    metrics.offers_total().reset();
    for (status, count) in &offers_by_status {
        metrics
            .offers_total()
            .with_label_values(&[status])
            .set(*count as f64);
    }

    // -- Providers by availability --
    metrics.providers_total().reset();
    let mut available = 0usize;
    let mut unavailable = 0usize;
    for provider in state.registry.records() {
        if provider.available {
            available += 1;
        } else {
            unavailable += 1;
        }
    }
    metrics
        .providers_total()
        .with_label_values(&["true"])
        .set(available as f64);
    metrics
        .providers_total()
        .with_label_values(&["false"])
        .set(unavailable as f64);

    // -- Gather and encode --
    match metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode Prometheus metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e).into_response()
        }
    }
}

/// Liveness probe — always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe — verifies the application can serve traffic.
///
/// Checks that the trip store and provider registry answer. The route
/// oracle is deliberately NOT checked: tracking must keep functioning
/// without it, so a down oracle never fails readiness.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let _ = state.store.len();
    let _ = state.registry.len();
    (StatusCode::OK, "ready").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppConfig;
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::Arc;
    use tower::ServiceExt;
    use yatra_core::GeoPoint;
    use yatra_dispatch::DispatchConfig;
    use yatra_routing::{PlanFuture, RouteError, RouteOracle};

    struct NoOracle;
    impl RouteOracle for NoOracle {
        fn plan(&self, from: GeoPoint, to: GeoPoint) -> PlanFuture<'_> {
            Box::pin(async move { Err(RouteError::NoRoute { from, to }) })
        }
    }

    fn test_state() -> AppState {
        AppState::new(
            DispatchConfig::default(),
            Arc::new(NoOracle),
            AppConfig::default(),
        )
    }

    #[tokio::test]
    async fn liveness_is_unauthenticated() {
        let app = app(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health/liveness")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn readiness_reports_ready() {
        let app = app(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health/readiness")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn metrics_endpoint_scrapes() {
        let app = app(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn openapi_requires_no_auth_when_disabled() {
        let app = app(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/openapi.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn api_routes_reject_without_token_when_auth_enabled() {
        let state = AppState::new(
            DispatchConfig::default(),
            Arc::new(NoOracle),
            AppConfig {
                auth_token: Some("secret".to_string()),
                ..AppConfig::default()
            },
        );
        let app = app(state);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/trips/mine")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
