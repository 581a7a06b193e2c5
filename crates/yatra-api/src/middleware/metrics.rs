//! # Prometheus Metrics
//!
//! HTTP-level metrics (request counts, latency, errors) are recorded in
//! middleware. Domain-level gauges (trips by phase, offers by status,
//! providers by availability) are updated on each `/metrics` scrape (pull
//! model) — see the metrics handler in `lib.rs`.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use prometheus::{
    core::Collector, Encoder, GaugeVec, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

/// Shared metrics state backed by a Prometheus registry.
#[derive(Clone)]
pub struct ApiMetrics {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Registry,

    // -- HTTP middleware metrics (push model) --
    http_requests_total: IntCounterVec,
    http_request_duration_seconds: HistogramVec,
    http_errors_total: IntCounterVec,

    // -- Domain gauges (pull model, updated on /metrics scrape) --
    trips_total: GaugeVec,
    offers_total: GaugeVec,
    providers_total: GaugeVec,
}

impl std::fmt::Debug for ApiMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiMetrics")
            .field("requests", &self.requests())
            .finish()
    }
}

impl ApiMetrics {
    /// Create a new metrics instance with a fresh Prometheus registry.
    pub fn new() -> Self {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("yatra_http_requests_total", "Total HTTP requests"),
            &["method", "path", "status"],
        )
        .expect("metric can be created");

        let http_request_duration_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "yatra_http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(vec![
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
            ]),
            &["method", "path"],
        )
        .expect("metric can be created");

        let http_errors_total = IntCounterVec::new(
            Opts::new("yatra_http_errors_total", "Total HTTP errors (4xx and 5xx)"),
            &["method", "path", "status"],
        )
        .expect("metric can be created");

        let trips_total = GaugeVec::new(
            Opts::new("yatra_trips_total", "Trips by lifecycle phase"),
            &["phase"],
        )
        .expect("metric can be created");

        let offers_total = GaugeVec::new(
            Opts::new("yatra_offers_total", "Offers by status"),
            &["status"],
        )
        .expect("metric can be created");

        let providers_total = GaugeVec::new(
            Opts::new("yatra_providers_total", "Registered providers by availability"),
            &["available"],
        )
        .expect("metric can be created");

        registry
            .register(Box::new(http_requests_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(http_request_duration_seconds.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(http_errors_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(trips_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(offers_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(providers_total.clone()))
            .expect("metric can be registered");

        Self {
            inner: Arc::new(Inner {
                registry,
                http_requests_total,
                http_request_duration_seconds,
                http_errors_total,
                trips_total,
                offers_total,
                providers_total,
            }),
        }
    }

    /// Current total request count (sum across all labels).
    pub fn requests(&self) -> u64 {
        let mut total = 0u64;
        for mf in &self.inner.http_requests_total.collect() {
            for m in mf.get_metric() {
                total += m.get_counter().get_value() as u64;
            }
        }
        total
    }

    /// Record an HTTP request (called by the middleware).
    fn record_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.inner
            .http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();

        self.inner
            .http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);

        if status >= 400 {
            self.inner
                .http_errors_total
                .with_label_values(&[method, path, &status_str])
                .inc();
        }
    }

    // -- Domain gauge accessors (used by the /metrics handler) --

    /// Access the trips-by-phase gauge for updating.
    pub fn trips_total(&self) -> &GaugeVec {
        &self.inner.trips_total
    }

    /// Access the offers-by-status gauge for updating.
    pub fn offers_total(&self) -> &GaugeVec {
        &self.inner.offers_total
    }

    /// Access the providers-by-availability gauge for updating.
    pub fn providers_total(&self) -> &GaugeVec {
        &self.inner.providers_total
    }

    /// Gather all metrics and encode to Prometheus text format.
    pub fn gather_and_encode(&self) -> Result<String, String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| format!("failed to encode metrics: {e}"))?;
        String::from_utf8(buffer)
            .map_err(|e| format!("metrics encoding produced invalid UTF-8: {e}"))
    }
}

impl Default for ApiMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalize a request path by replacing UUID segments with `{id}`.
///
/// Prevents cardinality explosion in Prometheus labels.
fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if segment.len() == 36
                && segment.chars().enumerate().all(|(i, c)| {
                    if i == 8 || i == 13 || i == 18 || i == 23 {
                        c == '-'
                    } else {
                        c.is_ascii_hexdigit()
                    }
                })
            {
                "{id}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Middleware that records HTTP request metrics.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();
    let method = request.method().to_string();
    let path = normalize_path(request.uri().path());
    let start = Instant::now();

    let response = next.run(request).await;

    if let Some(metrics) = metrics {
        metrics.record_request(
            &method,
            &path,
            response.status().as_u16(),
            start.elapsed().as_secs_f64(),
        );
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_replaces_uuid_segments() {
        assert_eq!(
            normalize_path("/v1/trips/550e8400-e29b-41d4-a716-446655440000/cancel"),
            "/v1/trips/{id}/cancel"
        );
        assert_eq!(normalize_path("/v1/trips/mine"), "/v1/trips/mine");
        assert_eq!(normalize_path("/health/liveness"), "/health/liveness");
    }

    #[test]
    fn record_and_encode() {
        let metrics = ApiMetrics::new();
        metrics.record_request("POST", "/v1/trips", 201, 0.012);
        metrics.record_request("POST", "/v1/trips", 422, 0.004);
        assert_eq!(metrics.requests(), 2);

        let text = metrics.gather_and_encode().unwrap();
        assert!(text.contains("yatra_http_requests_total"));
        assert!(text.contains("yatra_http_errors_total"));
    }

    #[test]
    fn domain_gauges_are_settable() {
        let metrics = ApiMetrics::new();
        metrics.trips_total().with_label_values(&["SEARCHING"]).set(3.0);
        metrics.offers_total().with_label_values(&["PENDING"]).set(5.0);
        let text = metrics.gather_and_encode().unwrap();
        assert!(text.contains("yatra_trips_total"));
        assert!(text.contains("SEARCHING"));
    }
}
