//! fhirmap persistence layer
//!
//! Resource models and the storage behind them. A request for a resource type
//! is served by exactly one [`ResourceModel`](core::ResourceModel), looked up
//! through the [`ModelRegistry`](registry::ModelRegistry). Each model answers
//! queries, pages results, follows include directives and creates new
//! resources on top of a small set of backend primitives.
//!
//! # Backend Features
//!
//! - `sqlite` (default) - SQLite with in-memory and file modes
//!
//! The document backend (`memory`) is always available.
//!
//! # Architecture
//!
//! - [`schema`] - Static resource definitions and validated [`FhirResource`](schema::FhirResource)s
//! - [`types`] - Queries, stored resources and pagination
//! - [`error`] - Error types for all operations
//! - [`core`] - The [`ResourceModel`](core::ResourceModel) contract
//! - [`search`] - Value extraction, filter compilation and in-memory matching
//! - [`registry`] - Name to model resolution and backend selection
//! - [`backends`] - Backend implementations (SQLite, document)
//!
//! # Quick Start
//!
//! ```
//! use fhirmap_persistence::core::FetchResult;
//! use fhirmap_persistence::registry::{BackendSettings, ModelRegistry};
//! use fhirmap_persistence::schema::FhirResource;
//! use fhirmap_persistence::types::{ResourceQuery, SearchFilter};
//! use serde_json::json;
//!
//! # let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
//! # rt.block_on(async {
//! let registry = ModelRegistry::from_settings(BackendSettings::memory());
//! let model = registry.resolve("Patient").await.unwrap();
//!
//! let patient = FhirResource::construct("Patient", json!({
//!     "name": [{"family": "Chalmers"}]
//! })).unwrap();
//! let created = model
//!     .create_from_resource(patient, &ResourceQuery::new("Patient"))
//!     .await
//!     .unwrap();
//! assert_eq!(created.version_id(), "1");
//!
//! let query = ResourceQuery::new("Patient").with_filter(SearchFilter::new("family", "chal"));
//! match model.get(&query).await.unwrap() {
//!     FetchResult::Collection { total, .. } => assert_eq!(total, 1),
//!     FetchResult::Single { .. } => unreachable!(),
//! }
//! # });
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod backends;
pub mod core;
pub mod error;
pub mod registry;
pub mod schema;
pub mod search;
pub mod types;

// Re-export commonly used types at crate root
pub use core::{FetchResult, ResourceModel};
pub use error::{StorageError, StorageResult};
pub use registry::{BackendKind, BackendSettings, ModelRegistry, RegistryError};
pub use schema::FhirResource;
pub use types::{Pagination, ResourceQuery, StoredResource};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
