//! Core model abstractions.
//!
//! - [`ResourceModel`] - the per-resource-type contract every backend implements
//! - [`FetchResult`] - what a read returns: one resource or one page
//!
//! # Example: Implementing a Model
//!
//! ```ignore
//! use async_trait::async_trait;
//! use fhirmap_persistence::core::ResourceModel;
//! use fhirmap_persistence::error::StorageResult;
//! use fhirmap_persistence::schema::ResourceDefinition;
//! use fhirmap_persistence::types::StoredResource;
//!
//! struct MyModel {
//!     definition: &'static ResourceDefinition,
//! }
//!
//! #[async_trait]
//! impl ResourceModel for MyModel {
//!     fn definition(&self) -> &'static ResourceDefinition {
//!         self.definition
//!     }
//!
//!     fn backend_name(&self) -> &'static str {
//!         "my-backend"
//!     }
//!
//!     async fn get_by_primary_key(&self, id: &str) -> StorageResult<StoredResource> {
//!         todo!()
//!     }
//!
//!     // ... find, resolve_reference, after_create
//! }
//! ```

mod model;

pub use model::{FetchResult, ResourceModel};
