//! REST API module using Axum
//!
//! Control surface and read-only views over a running monitor: fleet
//! snapshot, zone management, incident summary, and health.

pub mod envelope;
pub mod handlers;

pub use handlers::ApiState;

use axum::http::{header, Method};
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build a CORS layer that is restrictive by default (same-origin only).
///
/// Set `DARKWATCH_CORS_ORIGINS` to a comma-separated list of allowed
/// origins for development.
fn build_cors_layer() -> CorsLayer {
    match std::env::var("DARKWATCH_CORS_ORIGINS") {
        Ok(origins) => {
            let allowed: Vec<_> = origins
                .split(',')
                .filter_map(|o| o.trim().parse().ok())
                .collect();
            tracing::info!(origins = %origins, "CORS: allowing configured origins");
            CorsLayer::new()
                .allow_origin(allowed)
                .allow_methods([Method::GET, Method::POST, Method::DELETE])
                .allow_headers([header::CONTENT_TYPE])
        }
        Err(_) => CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE]),
    }
}

/// Create the complete application router.
pub fn create_app(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/ships", get(handlers::list_ships))
        .route("/api/zones", get(handlers::list_zones))
        .route("/api/zones", post(handlers::upsert_zone))
        .route("/api/zones/:name", delete(handlers::remove_zone))
        .route("/api/summary", get(handlers::summary))
        .route("/api/status", get(handlers::status))
        .route("/api/reset", post(handlers::reset))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer())
}
