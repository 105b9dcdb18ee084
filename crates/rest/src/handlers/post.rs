//! Create handler.

use axum::{
    extract::State,
    http::Uri,
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::error::RestError;
use crate::extractors::{JsonBody, JsonBodyRejection};
use crate::state::AppState;

use super::request_target;

/// Handler for the create interaction.
///
/// # HTTP Request
///
/// `POST [base]/[type]` with a JSON resource body. An id may be given in
/// the path (`POST [base]/[type]/[id]`) or in the body, not both differing.
///
/// # Response
///
/// - `201 Created` - The created resource with `id` and `meta`
/// - `400 Bad Request` - Malformed URL, undecodable body, or invalid resource
/// - `404 Not Found` - Unknown resource type
/// - `422 Unprocessable Entity` - The resource could not be persisted
/// - `500 Internal Server Error` - Misconfiguration
pub async fn post_handler(
    State(state): State<AppState>,
    uri: Uri,
    body: Result<JsonBody, JsonBodyRejection>,
) -> Response {
    let target = request_target(&uri);
    debug!(target = %target, "Processing POST request");

    match body {
        Ok(JsonBody(body)) => state
            .dispatcher()
            .handle_post_request(target, body)
            .await
            .into_response(),
        Err(rejection) => RestError::from(rejection).into_response(),
    }
}
