//! Request dispatch.
//!
//! [`RequestDispatcher`] runs a request through the query parser, the model
//! registry and the resolved model, and turns every outcome into a
//! [`DispatchResponse`]. Nothing escapes it as an error: failures become
//! OperationOutcome payloads with a fixed status.
//!
//! # GET
//!
//! | Step | Failure | Status |
//! |------|---------|--------|
//! | parse URL | malformed | 400 bad-request |
//! | resolve model | registry not loadable | 500 server-error |
//! | resolve model | unknown type | 404 not-found |
//! | `model.get` | validation, mapping, missing | 404 not-found |
//! | `model.get` | anything else (logged) | 500 server-error |
//!
//! # POST
//!
//! | Step | Failure | Status |
//! |------|---------|--------|
//! | parse URL | malformed | 400 bad-request |
//! | load registry | not loadable | 500 server-error |
//! | construct resource | unknown type | 404 not-found |
//! | construct resource | invalid body | 400 validation |
//! | resolve model | no model | 404 not-found |
//! | `create_from_resource` | any | 422 validation |

use std::sync::Arc;

use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use fhirmap_persistence::core::{FetchResult, ResourceModel};
use fhirmap_persistence::registry::{ModelRegistry, RegistryError};
use fhirmap_persistence::schema::FhirResource;
use fhirmap_persistence::types::PageLimits;
use serde_json::Value;
use tracing::{debug, error, instrument, warn};

use crate::config::ServerConfig;
use crate::error::{RestError, RestResult};
use crate::query::parse_url;
use crate::responses::{FHIR_JSON, SearchPage, resource_with_contained, searchset_bundle};

/// A payload and the status it is sent with.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchResponse {
    /// A resource, a searchset Bundle, or an OperationOutcome.
    pub payload: Value,
    /// The HTTP status.
    pub status: StatusCode,
}

impl DispatchResponse {
    /// Creates a response.
    pub fn new(payload: Value, status: StatusCode) -> Self {
        Self { payload, status }
    }

    /// Returns true if the status is 2xx.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

impl From<RestError> for DispatchResponse {
    fn from(err: RestError) -> Self {
        Self::new(err.to_outcome(), err.status())
    }
}

impl IntoResponse for DispatchResponse {
    fn into_response(self) -> Response {
        (
            self.status,
            [(CONTENT_TYPE, FHIR_JSON)],
            self.payload.to_string(),
        )
            .into_response()
    }
}

/// Settings that shape dispatcher output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOptions {
    /// Put the debug rendering and source chain into create diagnostics.
    pub debug: bool,
    /// Base URL for Bundle links and entry `fullUrl`s.
    pub base_url: String,
    /// Paging bounds applied to searches.
    pub page_limits: PageLimits,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            debug: false,
            base_url: "http://localhost:8080".to_string(),
            page_limits: PageLimits::default(),
        }
    }
}

impl From<&ServerConfig> for DispatchOptions {
    fn from(config: &ServerConfig) -> Self {
        Self {
            debug: config.debug,
            base_url: config.base_url.clone(),
            page_limits: config.page_limits(),
        }
    }
}

/// Routes parsed requests to resource models.
///
/// The only state is the registry, which is shared and loaded once.
#[derive(Debug, Clone)]
pub struct RequestDispatcher {
    registry: Arc<ModelRegistry>,
    options: DispatchOptions,
}

impl RequestDispatcher {
    /// Creates a dispatcher over a registry.
    pub fn new(registry: Arc<ModelRegistry>, options: DispatchOptions) -> Self {
        Self { registry, options }
    }

    /// Returns the registry.
    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    /// Returns the options.
    pub fn options(&self) -> &DispatchOptions {
        &self.options
    }

    /// Handles a read or search.
    #[instrument(skip(self))]
    pub async fn handle_get_request(&self, url: &str) -> DispatchResponse {
        match self.get(url).await {
            Ok(payload) => DispatchResponse::new(payload, StatusCode::OK),
            Err(err) => err.into(),
        }
    }

    /// Handles a create.
    #[instrument(skip(self, body))]
    pub async fn handle_post_request(&self, url: &str, body: Value) -> DispatchResponse {
        match self.post(url, body).await {
            Ok(payload) => DispatchResponse::new(payload, StatusCode::CREATED),
            Err(err) => err.into(),
        }
    }

    async fn get(&self, url: &str) -> RestResult<Value> {
        let mut query = parse_url(url)?;
        let model = self.resolve(&query.resource_type).await?;

        let pagination = query.pagination(self.options.page_limits);
        query.count = Some(pagination.count);
        query.offset = Some(pagination.offset);

        let result = model.get(&query).await.map_err(|e| {
            if e.is_fetch_failure() {
                debug!(error = %e, "Fetch produced no valid resource");
            } else {
                error!(error = ?e, resource_type = %query.resource_type, "Unexpected failure while fetching");
            }
            RestError::from_fetch_error(&e)
        })?;

        Ok(match result {
            FetchResult::Single { resource, included } => {
                resource_with_contained(resource, included)
            }
            FetchResult::Collection {
                resources,
                total,
                pagination,
                included,
            } => searchset_bundle(
                &self.options.base_url,
                SearchPage {
                    query: &query,
                    resources,
                    included,
                    total,
                    pagination,
                },
            ),
        })
    }

    async fn post(&self, url: &str, body: Value) -> RestResult<Value> {
        let query = parse_url(url)?;

        self.registry.load().await.map_err(|e| {
            error!(error = %e, "Model registry could not be loaded");
            RestError::configuration()
        })?;

        let resource = FhirResource::construct(&query.resource_type, body)?;
        let model = self.resolve(&query.resource_type).await?;

        let created = model
            .create_from_resource(resource, &query)
            .await
            .map_err(|e| {
                warn!(error = %e, resource_type = %query.resource_type, "Create rejected");
                RestError::from_create_error(&e, self.options.debug)
            })?;

        let resource = created.to_fhir().map_err(|e| {
            error!(error = ?e, "Created resource does not map back to a valid resource");
            RestError::Internal {
                message: e.to_string(),
            }
        })?;
        Ok(resource.into_json())
    }

    async fn resolve(&self, resource_type: &str) -> RestResult<Arc<dyn ResourceModel>> {
        self.registry.resolve(resource_type).await.map_err(|e| {
            if let RegistryError::Configuration(cause) = &e {
                error!(error = %cause, "Model registry could not be loaded");
            }
            RestError::from(e)
        })
    }
}
