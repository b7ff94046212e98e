//! HTTP API server for the storefront backend.
//!
//! Provides the REST endpoints for accounts, catalog, cart and orders behind
//! a token access gate, with structured logging (tracing) and Prometheus
//! metrics.

pub mod auth;
pub mod config;
pub mod deadline;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use doc_store::DocumentStore;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use config::{Config, ConfigError};
pub use state::AppState;

/// Cross-cutting HTTP settings.
#[derive(Debug, Clone)]
pub struct HttpOptions {
    /// Browser origin allowed by CORS.
    pub client_origin: HeaderValue,

    /// Deadline applied to every request.
    pub request_timeout: Duration,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            client_origin: HeaderValue::from_static("http://localhost:5174"),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl From<&Config> for HttpOptions {
    fn from(config: &Config) -> Self {
        Self {
            client_origin: config.client_origin.clone(),
            request_timeout: config.request_timeout,
        }
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: DocumentStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
    options: HttpOptions,
) -> Router {
    let sessions = state.sessions.clone();

    let metrics_router = Router::new()
        .route("/metrics", get(routes::ops::metrics))
        .with_state(metrics_handle);

    Router::new()
        .route("/", get(routes::ops::home))
        .route("/health", get(routes::ops::health))
        .route("/register", post(routes::accounts::register::<S>))
        .route("/login", post(routes::accounts::login::<S>))
        .route("/profile", get(routes::accounts::profile))
        .route("/add_products", post(routes::products::add::<S>))
        .route("/products", get(routes::products::by_seller::<S>))
        .route("/all_products", get(routes::products::all::<S>))
        .route("/add_to_cart", post(routes::cart::add::<S>))
        .route("/view_cart", get(routes::cart::view::<S>))
        .route("/place_order", post(routes::orders::place::<S>))
        .route("/view_orders", get(routes::orders::list::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(from_fn_with_state(sessions, auth::access_gate))
        .layer(from_fn_with_state(
            options.request_timeout,
            deadline::enforce_deadline,
        ))
        .layer(
            CorsLayer::new()
                .allow_origin(options.client_origin)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([CONTENT_TYPE, AUTHORIZATION]),
        )
        .layer(TraceLayer::new_for_http())
}
