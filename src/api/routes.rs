//! API Routes
//!
//! Configures the Axum router with all admin endpoints.

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_all_handler, clear_pattern_handler, get_entry_handler, health_handler,
    list_keys_handler, patch_entry_handler, post_event_handler, set_entry_handler, stats_handler,
    AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/cache", get(list_keys_handler).delete(clear_all_handler))
        .route(
            "/cache/:key",
            get(get_entry_handler)
                .put(set_entry_handler)
                .patch(patch_entry_handler),
        )
        .route("/cache/pattern/:pattern", delete(clear_pattern_handler))
        .route("/events", post(post_event_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
