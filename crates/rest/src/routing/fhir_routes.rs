//! Route table.

use axum::{Router, routing::get};

use crate::handlers;
use crate::state::AppState;

/// Creates all routes.
///
/// # Routes
///
/// - `GET /health` - Health check
/// - `GET /_readiness` - Readiness check, loads the models
/// - `GET /{*path}` - Read or search
/// - `POST /{*path}` - Create
///
/// The root path is routed to the same handlers so that a request without a
/// resource type gets an OperationOutcome rather than an empty 404.
pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/_readiness", get(handlers::readiness_handler))
        .route(
            "/",
            get(handlers::get_handler).post(handlers::post_handler),
        )
        .route(
            "/{*path}",
            get(handlers::get_handler).post(handlers::post_handler),
        )
        .with_state(state)
}
