//! # fhirmap-rest - HTTP front end for fhirmap
//!
//! Turns FHIR-style request URLs into model calls and every outcome into a
//! resource, a searchset Bundle, or an OperationOutcome with a fixed status.
//!
//! ## Request Pipeline
//!
//! 1. [`query::parse_url`] parses the URL into a
//!    [`ResourceQuery`](fhirmap_persistence::types::ResourceQuery).
//! 2. The [`ModelRegistry`](fhirmap_persistence::registry::ModelRegistry)
//!    resolves the resource type to its model, loading the models on first use.
//! 3. The model reads, searches or creates.
//! 4. [`dispatch::RequestDispatcher`] maps the result or failure to a
//!    [`DispatchResponse`](dispatch::DispatchResponse).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use fhirmap_persistence::registry::ModelRegistry;
//! use fhirmap_rest::{ServerConfig, create_app_with_config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig {
//!         backend: Some("sqlite".to_string()),
//!         ..Default::default()
//!     };
//!     let registry = Arc::new(ModelRegistry::from_settings(config.backend_settings()));
//!     let app = create_app_with_config(registry, config.clone());
//!
//!     let listener = tokio::net::TcpListener::bind(config.socket_addr()).await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## API Endpoints
//!
//! | Interaction | HTTP Method | URL Pattern |
//! |------------|-------------|-------------|
//! | read | GET | `/[type]/[id]` |
//! | search | GET | `/[type]?params` |
//! | create | POST | `/[type]` |
//! | health | GET | `/health` |
//! | readiness | GET | `/_readiness` |
//!
//! ## Error Handling
//!
//! | HTTP Status | Issue Code | Cause |
//! |-------------|------------|-------|
//! | 400 | bad-request | Malformed URL or body |
//! | 400 | validation | Body is not a valid resource |
//! | 404 | not-found | Unknown type, missing or unmappable resource, rejected query |
//! | 422 | validation | Resource could not be persisted |
//! | 500 | server-error | Misconfiguration or unexpected failure |
//!
//! ## Architecture
//!
//! - [`config`] - Server configuration
//! - [`query`] - URL parsing
//! - [`dispatch`] - Parser to registry to model, with error normalization
//! - [`error`] - Error categories and their status codes
//! - [`responses`] - OperationOutcome and Bundle payloads
//! - [`extractors`] - Axum extractors
//! - [`handlers`] - HTTP handlers
//! - [`routing`] - Route configuration
//! - [`state`] - Application state

// Enforce documentation
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod dispatch;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod query;
pub mod responses;
pub mod routing;
pub mod state;

// Re-export commonly used types
pub use config::ServerConfig;
pub use dispatch::{DispatchOptions, DispatchResponse, RequestDispatcher};
pub use error::{RestError, RestResult};
pub use state::AppState;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use fhirmap_persistence::registry::ModelRegistry;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Creates the Axum application with default configuration.
pub fn create_app(registry: Arc<ModelRegistry>) -> Router {
    create_app_with_config(registry, ServerConfig::default())
}

/// Creates the Axum application with custom configuration.
///
/// The registry is not loaded here; the first request that needs a model
/// loads it.
pub fn create_app_with_config(registry: Arc<ModelRegistry>, config: ServerConfig) -> Router {
    info!(
        backend = config.backend.as_deref().unwrap_or("<unset>"),
        debug = config.debug,
        "Creating REST API server"
    );

    let max_body_size = config.max_body_size;
    let request_timeout = config.request_timeout;
    let cors = config.enable_cors.then(|| build_cors_layer(&config));

    let state = AppState::new(registry, config);
    let router = routing::create_routes(state);

    let service_builder = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(request_timeout),
        ));

    let router = match cors {
        Some(cors) => router.layer(cors),
        None => router,
    };

    router
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(service_builder)
}

/// Builds the CORS layer based on configuration.
fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any);

    if config.cors_origins == "*" {
        cors.allow_origin(Any)
    } else {
        let origins: Vec<_> = config
            .cors_origins
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors.allow_origin(origins)
    }
}

/// Initializes the tracing subscriber for logging.
///
/// `RUST_LOG` takes precedence over `level`. Call once at startup.
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "fhirmap_rest={level},fhirmap_persistence={level},tower_http=debug"
        ))
    });

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}
