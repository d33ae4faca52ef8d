//! HTTP routes for the Dash API.
//!
//! Defines the Axum router and application state.

use crate::auth::{HttpJwksFetcher, JwksClient, JwksFetcher, TokenAuthenticator};
use crate::config::Config;
use crate::handlers;
use crate::middleware::auth::{require_auth, AuthState};
use crate::middleware::http_metrics::http_metrics_middleware;
use axum::{middleware, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Token authenticator used by the request gate.
    pub authenticator: Arc<TokenAuthenticator>,
}

impl AppState {
    /// Wire the authenticator from configuration, fetching keys over HTTP.
    pub fn from_config(config: Config) -> Self {
        let fetcher: Arc<dyn JwksFetcher> =
            Arc::new(HttpJwksFetcher::new(config.jwks_fetch_timeout));
        Self::with_fetcher(config, fetcher)
    }

    /// Wire the authenticator from configuration with a custom key set fetcher.
    pub fn with_fetcher(config: Config, fetcher: Arc<dyn JwksFetcher>) -> Self {
        let jwks_client = Arc::new(JwksClient::with_ttl(
            config.trust.jwks_url(),
            fetcher,
            config.jwks_cache_ttl,
        ));
        let authenticator = Arc::new(TokenAuthenticator::with_system_clock(
            config.trust.clone(),
            jwks_client,
        ));

        Self {
            config,
            authenticator,
        }
    }
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/health` - Liveness probe (simple "OK") - public, unversioned
/// - `/metrics` - Prometheus metrics endpoint - public, unversioned
/// - `/api/v1/session` - Session probe - requires authentication
/// - TraceLayer for request logging
/// - HTTP metrics middleware
/// - 30 second request timeout
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let auth_state = Arc::new(AuthState {
        authenticator: Arc::clone(&state.authenticator),
    });

    // Public routes (no authentication required)
    let public_routes = Router::new().route("/health", get(handlers::health_check));

    // Metrics route with its own state
    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Protected routes (authentication required)
    let protected_routes = Router::new()
        .route("/api/v1/session", get(handlers::session_check))
        .route_layer(middleware::from_fn_with_state(auth_state, require_auth));

    // Layer order (bottom-to-top execution):
    // 1. TraceLayer - Log request details (innermost)
    // 2. TimeoutLayer - Timeout the request
    // 3. http_metrics_middleware - Record ALL responses (outermost)
    public_routes
        .merge(metrics_routes)
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(middleware::from_fn(http_metrics_middleware))
}
