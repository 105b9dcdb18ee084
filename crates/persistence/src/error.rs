//! Error types for the persistence layer.
//!
//! Errors are grouped by the failure class the request layer cares about:
//! resource state, query/resource validation, mapping of stored data back to
//! a valid resource, backend configuration, and backend execution.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

use crate::schema::SchemaError;

/// The primary error type for all model and storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Resource state errors
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// Validation errors raised while interpreting a query or a new resource
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Stored data could not be turned into a valid resource
    #[error(transparent)]
    Mapping(#[from] MappingValidationError),

    /// The active backend is missing or misconfigured
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Backend-specific errors
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl StorageError {
    /// Returns true when this error means "no valid resource could be produced"
    /// rather than an unexpected failure.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            StorageError::Resource(ResourceError::NotFound { .. })
                | StorageError::Validation(_)
                | StorageError::Mapping(_)
        )
    }
}

/// Errors related to resource state.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// The requested resource was not found.
    #[error("resource not found: {resource_type}/{id}")]
    NotFound { resource_type: String, id: String },

    /// A resource with the given ID already exists.
    #[error("resource already exists: {resource_type}/{id}")]
    AlreadyExists { resource_type: String, id: String },
}

/// Errors related to query or resource validation.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// The resource failed schema validation.
    #[error("invalid resource: {0}")]
    InvalidResource(#[from] SchemaError),

    /// The search parameter is not defined for the resource type.
    #[error("unknown search parameter '{parameter}' for {resource_type}")]
    UnknownSearchParameter {
        resource_type: String,
        parameter: String,
    },

    /// The search value cannot be used with the parameter.
    #[error("invalid value for search parameter '{parameter}': {message}")]
    InvalidSearchValue { parameter: String, message: String },

    /// The modifier is not valid for the parameter type.
    #[error("unsupported modifier '{modifier}' for parameter type '{param_type}'")]
    UnsupportedModifier {
        modifier: String,
        param_type: String,
    },

    /// The relation named in an include directive is not defined.
    #[error("unknown relation '{relation}' for {resource_type}")]
    UnknownRelation {
        resource_type: String,
        relation: String,
    },

    /// The sort field is not sortable for the resource type.
    #[error("cannot sort {resource_type} by '{field}'")]
    InvalidSort {
        resource_type: String,
        field: String,
    },

    /// The id in the request path and the id in the body disagree.
    #[error("id '{body_id}' in the body does not match id '{url_id}' in the request path")]
    IdMismatch { url_id: String, body_id: String },

    /// A reference in a new resource points at a resource that does not exist.
    #[error("invalid reference '{reference}': {message}")]
    InvalidReference { reference: String, message: String },
}

/// A stored record failed validation when mapped back to a resource.
#[derive(Error, Debug)]
#[error("stored {resource_type}/{id} is not a valid resource: {source}")]
pub struct MappingValidationError {
    pub resource_type: String,
    pub id: String,
    #[source]
    pub source: SchemaError,
}

/// Errors raised while loading the models of the configured backend.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    /// No backend has been configured.
    #[error("no persistence backend configured")]
    BackendNotConfigured,

    /// The configured backend name is not known.
    #[error("unknown persistence backend '{backend}'")]
    UnknownBackend { backend: String },

    /// The backend was compiled out of this build.
    #[error("persistence backend '{backend}' is not enabled in this build")]
    BackendDisabled { backend: String },

    /// Two models were registered for the same resource type.
    #[error("duplicate model registered for resource type '{resource_type}'")]
    DuplicateModel { resource_type: String },

    /// The backend could not be opened or initialized.
    #[error("failed to initialize backend '{backend}': {message}")]
    InitializationFailed { backend: String, message: String },
}

/// Errors originating from the database backend.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Connection to the backend failed.
    #[error("connection failed to {backend_name}: {message}")]
    ConnectionFailed {
        backend_name: String,
        message: String,
    },

    /// Internal backend error.
    #[error("internal error in {backend_name}: {message}")]
    Internal {
        backend_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Query execution error.
    #[error("query execution failed: {message}")]
    QueryError { message: String },

    /// Serialization/deserialization error.
    #[error("serialization error: {message}")]
    SerializationError { message: String },

    /// A blocking task was cancelled or panicked.
    #[error("background task failed: {message}")]
    TaskFailed { message: String },
}

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Backend(BackendError::SerializationError {
            message: err.to_string(),
        })
    }
}

impl From<SchemaError> for StorageError {
    fn from(err: SchemaError) -> Self {
        StorageError::Validation(ValidationError::InvalidResource(err))
    }
}

impl From<tokio::task::JoinError> for StorageError {
    fn from(err: tokio::task::JoinError) -> Self {
        StorageError::Backend(BackendError::TaskFailed {
            message: err.to_string(),
        })
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::Backend(BackendError::Internal {
            backend_name: "sqlite".to_string(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        })
    }
}

#[cfg(feature = "sqlite")]
impl From<r2d2::Error> for StorageError {
    fn from(err: r2d2::Error) -> Self {
        StorageError::Backend(BackendError::ConnectionFailed {
            backend_name: "sqlite".to_string(),
            message: err.to_string(),
        })
    }
}
