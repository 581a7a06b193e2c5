//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor.
//!
//! ## Architecture
//!
//! `AppState` wires the dispatch core together exactly once at startup:
//! one [`TripStore`], one [`ProviderRegistry`], and the coordinator and
//! reconciler sharing them. All of it is `Clone`-friendly via `Arc`
//! internals; handlers never construct core components themselves.

use std::sync::Arc;

use yatra_dispatch::{
    DispatchConfig, ProviderRegistry, TrackingReconciler, TripLifecycleCoordinator, TripStore,
};
use yatra_routing::{RouteCache, RouteOracle};

/// Application configuration.
///
/// Custom `Debug` redacts the auth token to prevent credential leakage
/// in logs.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Static bearer secret. `None` disables authentication.
    pub auth_token: Option<String>,
    /// Whether to mount the Prometheus metrics middleware and endpoint.
    pub metrics_enabled: bool,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("metrics_enabled", &self.metrics_enabled)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_token: None,
            metrics_enabled: true,
        }
    }
}

impl AppConfig {
    /// Build configuration from `PORT`, `AUTH_TOKEN`, and
    /// `YATRA_METRICS_ENABLED` (anything but `"false"` enables).
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            auth_token: std::env::var("AUTH_TOKEN").ok(),
            metrics_enabled: std::env::var("YATRA_METRICS_ENABLED")
                .map(|v| v.to_lowercase() != "false")
                .unwrap_or(true),
        }
    }
}

/// Shared application state accessible to all route handlers.
#[derive(Clone)]
pub struct AppState {
    /// The trip record store (single source of truth).
    pub store: TripStore,
    /// The provider registry.
    pub registry: ProviderRegistry,
    /// The trip lifecycle façade.
    pub coordinator: TripLifecycleCoordinator,
    /// Position ingestion and route reconciliation.
    pub tracking: TrackingReconciler,
    /// Immutable dispatch-core configuration.
    pub dispatch_config: Arc<DispatchConfig>,
    /// Server configuration.
    pub config: AppConfig,
}

impl AppState {
    /// Wire the dispatch core over the given route oracle.
    pub fn new(
        dispatch_config: DispatchConfig,
        oracle: Arc<dyn RouteOracle>,
        config: AppConfig,
    ) -> Self {
        let dispatch_config = Arc::new(dispatch_config);
        let store = TripStore::new();
        let registry = ProviderRegistry::new();
        let coordinator =
            TripLifecycleCoordinator::new(store.clone(), registry.clone(), dispatch_config.clone());
        let cache = RouteCache::new(dispatch_config.route_grid_deg, dispatch_config.route_ttl);
        let tracking =
            TrackingReconciler::new(store.clone(), cache, oracle, dispatch_config.clone());

        Self {
            store,
            registry,
            coordinator,
            tracking,
            dispatch_config,
            config,
        }
    }
}
