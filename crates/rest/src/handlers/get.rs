//! Read and search handler.

use axum::{extract::State, http::Uri, response::IntoResponse};
use tracing::debug;

use crate::state::AppState;

use super::request_target;

/// Handler for reads and searches.
///
/// The whole request target is handed to the dispatcher, which parses it.
///
/// # HTTP Request
///
/// - `GET [base]/[type]/[id]` - read
/// - `GET [base]/[type]?params` - search
///
/// # Response
///
/// - `200 OK` - The resource, or a searchset Bundle
/// - `400 Bad Request` - Malformed URL
/// - `404 Not Found` - Unknown type, missing resource, or rejected query
/// - `500 Internal Server Error` - Misconfiguration or unexpected failure
pub async fn get_handler(State(state): State<AppState>, uri: Uri) -> impl IntoResponse {
    let target = request_target(&uri);
    debug!(target = %target, "Processing GET request");

    state.dispatcher().handle_get_request(target).await
}
