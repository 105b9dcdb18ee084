//! Error types for the REST layer.
//!
//! Every failure the dispatcher reports becomes a [`RestError`], which fixes
//! its HTTP status and OperationOutcome issue code:
//!
//! | Variant | HTTP Status | Issue Code |
//! |---------|-------------|------------|
//! | `BadRequest` | 400 | bad-request |
//! | `PayloadTooLarge` | 413 | bad-request |
//! | `InvalidResource` | 400 | validation |
//! | `NotFound` | 404 | not-found |
//! | `Unprocessable` | 422 | validation |
//! | `Configuration` | 500 | server-error |
//! | `Internal` | 500 | server-error |
//!
//! The 404 covers an unknown resource type, a missing record, a query the
//! model rejects, and a stored record that no longer maps to a valid
//! resource alike.

use std::error::Error as StdError;
use std::fmt::Write as _;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use fhirmap_persistence::error::StorageError;
use fhirmap_persistence::registry::RegistryError;
use fhirmap_persistence::schema::SchemaError;
use thiserror::Error;

use crate::dispatch::DispatchResponse;
use crate::query::QueryValidationError;
use crate::responses::operation_outcome::{IssueType, error_outcome};

/// Diagnostics returned when the registry cannot be loaded.
pub const CONFIGURATION_DIAGNOSTICS: &str = "The server is improperly configured";

/// A failure on its way to becoming an OperationOutcome.
#[allow(missing_docs)]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RestError {
    /// The request could not be parsed.
    #[error("{message}")]
    BadRequest { message: String },

    /// The request body exceeds the configured size limit.
    #[error("{message}")]
    PayloadTooLarge { message: String },

    /// The submitted body is not a valid resource.
    #[error("{message}")]
    InvalidResource { message: String },

    /// Nothing valid could be produced for the request.
    #[error("{message}")]
    NotFound { message: String },

    /// The resource was valid but could not be persisted.
    #[error("{message}")]
    Unprocessable { message: String },

    /// The persistence backend is not usable.
    #[error("{message}")]
    Configuration { message: String },

    /// Anything else.
    #[error("{message}")]
    Internal { message: String },
}

impl RestError {
    /// Returns the HTTP status code.
    pub fn status(&self) -> StatusCode {
        match self {
            RestError::BadRequest { .. } | RestError::InvalidResource { .. } => {
                StatusCode::BAD_REQUEST
            }
            RestError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            RestError::NotFound { .. } => StatusCode::NOT_FOUND,
            RestError::Unprocessable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            RestError::Configuration { .. } | RestError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns the OperationOutcome issue code.
    pub fn issue_type(&self) -> IssueType {
        match self {
            RestError::BadRequest { .. } | RestError::PayloadTooLarge { .. } => {
                IssueType::BadRequest
            }
            RestError::InvalidResource { .. } | RestError::Unprocessable { .. } => {
                IssueType::Validation
            }
            RestError::NotFound { .. } => IssueType::NotFound,
            RestError::Configuration { .. } | RestError::Internal { .. } => IssueType::ServerError,
        }
    }

    /// Returns the OperationOutcome for this error.
    pub fn to_outcome(&self) -> serde_json::Value {
        error_outcome(self.issue_type(), self.to_string())
    }

    /// An unknown resource type on the read path.
    pub fn unknown_resource_type(resource_type: &str) -> Self {
        RestError::NotFound {
            message: format!(
                "Resource type \"{}\" does not exist or is not supported.",
                resource_type
            ),
        }
    }

    /// An unknown resource type on the create path.
    pub fn unknown_resource(resource_type: &str) -> Self {
        RestError::NotFound {
            message: format!("Resource \"{}\" does not exist.", resource_type),
        }
    }

    /// The model registry could not be loaded.
    pub fn configuration() -> Self {
        RestError::Configuration {
            message: CONFIGURATION_DIAGNOSTICS.to_string(),
        }
    }

    /// Maps a failure of a read or search.
    ///
    /// Validation, mapping and not-found failures become 404; everything
    /// else is a server error.
    pub fn from_fetch_error(err: &StorageError) -> Self {
        if err.is_fetch_failure() {
            RestError::NotFound {
                message: err.to_string(),
            }
        } else {
            RestError::Internal {
                message: err.to_string(),
            }
        }
    }

    /// Maps a failure of a create. Every failure is a 422.
    ///
    /// With `debug` the diagnostics carry the full debug rendering and the
    /// chain of sources instead of the message alone.
    pub fn from_create_error(err: &StorageError, debug: bool) -> Self {
        let message = if debug {
            verbose_diagnostics(err)
        } else {
            err.to_string()
        };
        RestError::Unprocessable { message }
    }
}

/// Renders an error with its debug form and every source.
pub fn verbose_diagnostics(err: &(dyn StdError + 'static)) -> String {
    let mut text = format!("{:?}", err);
    let mut source = err.source();
    while let Some(cause) = source {
        let _ = write!(text, "\ncaused by: {}", cause);
        source = cause.source();
    }
    text
}

impl From<QueryValidationError> for RestError {
    fn from(err: QueryValidationError) -> Self {
        RestError::BadRequest {
            message: err.to_string(),
        }
    }
}

impl From<RegistryError> for RestError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound { resource_type } => {
                RestError::unknown_resource_type(&resource_type)
            }
            RegistryError::Configuration(_) => RestError::configuration(),
        }
    }
}

impl From<SchemaError> for RestError {
    fn from(err: SchemaError) -> Self {
        match err {
            SchemaError::UnknownResourceType { resource_type } => {
                RestError::unknown_resource(&resource_type)
            }
            other => RestError::InvalidResource {
                message: other.to_string(),
            },
        }
    }
}

impl From<serde_json::Error> for RestError {
    fn from(err: serde_json::Error) -> Self {
        RestError::BadRequest {
            message: format!("Invalid JSON: {}", err),
        }
    }
}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        DispatchResponse::from(self).into_response()
    }
}

/// Result type alias for REST operations.
pub type RestResult<T> = Result<T, RestError>;
