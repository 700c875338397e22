//! API Routes
//!
//! Configures the Axum router with all proxy endpoints.

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_handler, document_by_field_handler, document_handler, health_handler,
    refresh_handler, search_handler, stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /documents/:id` - Cached lookup by document id
/// - `GET /documents/:type/:field/:value` - Cached lookup by field value
/// - `POST /search` - Uncached search against the current master ref
/// - `POST /refresh` - Re-read the master ref now
/// - `DELETE /cache` - Drop every cached entry
/// - `GET /stats` - Cache statistics
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/documents/:id", get(document_handler))
        .route(
            "/documents/:type/:field/:value",
            get(document_by_field_handler),
        )
        .route("/search", post(search_handler))
        .route("/refresh", post(refresh_handler))
        .route("/cache", delete(clear_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
