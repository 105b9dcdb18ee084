//! Request body extractor.

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::Value;

use crate::error::RestError;

/// A request body decoded as JSON.
///
/// Any JSON value is accepted here; whether it is a resource is decided by
/// the dispatcher. Content-Type is not checked.
#[derive(Debug)]
pub struct JsonBody(pub Value);

impl JsonBody {
    /// Consumes the extractor and returns the inner Value.
    pub fn into_inner(self) -> Value {
        self.0
    }
}

/// Rejection for [`JsonBody`].
#[derive(Debug)]
pub enum JsonBodyRejection {
    /// The body could not be read.
    Unreadable(String),
    /// The body is larger than the configured limit.
    TooLarge(String),
    /// The body is not valid JSON.
    InvalidJson(serde_json::Error),
}

impl From<JsonBodyRejection> for RestError {
    fn from(rejection: JsonBodyRejection) -> Self {
        match rejection {
            JsonBodyRejection::Unreadable(message) => RestError::BadRequest {
                message: format!("Could not read request body: {}", message),
            },
            JsonBodyRejection::TooLarge(message) => RestError::PayloadTooLarge {
                message: format!("Request body is too large: {}", message),
            },
            JsonBodyRejection::InvalidJson(err) => err.into(),
        }
    }
}

impl IntoResponse for JsonBodyRejection {
    fn into_response(self) -> Response {
        RestError::from(self).into_response()
    }
}

impl<S> FromRequest<S> for JsonBody
where
    S: Send + Sync,
{
    type Rejection = JsonBodyRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await.map_err(|e| {
            if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                JsonBodyRejection::TooLarge(e.body_text())
            } else {
                JsonBodyRejection::Unreadable(e.body_text())
            }
        })?;

        let value = serde_json::from_slice(&bytes).map_err(JsonBodyRejection::InvalidJson)?;
        Ok(JsonBody(value))
    }
}
