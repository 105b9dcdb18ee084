//! Health check endpoint handlers.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::error::RestError;
use crate::state::AppState;

/// Handler for the health check endpoint.
///
/// Reports liveness only; it never loads the models.
///
/// # HTTP Request
///
/// `GET [base]/health`
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    debug!("Processing health check request");

    let health_response = serde_json::json!({
        "status": "healthy",
        "backend": state.config().backend,
        "modelsLoaded": state.registry().is_loaded(),
        "version": crate::VERSION,
        "timestamp": chrono::Utc::now().to_rfc3339()
    });

    (StatusCode::OK, Json(health_response))
}

/// Handler for the readiness probe.
///
/// Loads the models if needed, so a misconfigured backend is reported here
/// before a client request hits it.
///
/// # HTTP Request
///
/// `GET [base]/_readiness`
///
/// # Response
///
/// - `200 OK` - Models are loaded
/// - `500 Internal Server Error` - The backend could not be initialized
pub async fn readiness_handler(State(state): State<AppState>) -> Response {
    debug!("Processing readiness check request");

    if let Err(e) = state.registry().load().await {
        tracing::warn!(error = %e, "Readiness check failed");
        return RestError::configuration().into_response();
    }

    let resource_types = state
        .registry()
        .resource_types()
        .await
        .unwrap_or_default();

    let response = serde_json::json!({
        "status": "ready",
        "resourceTypes": resource_types
    });
    (StatusCode::OK, Json(response)).into_response()
}
