//! Document backend.
//!
//! Keeps resources as JSON documents in process memory, one collection per
//! resource type. Searches evaluate compiled filters directly against the
//! documents with [`crate::search::matcher`]. Nothing survives a restart.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use fhirmap_persistence::backends::document::{DocumentModel, DocumentStore};
//! use fhirmap_persistence::core::ResourceModel;
//!
//! let store = Arc::new(DocumentStore::new());
//! let models = DocumentModel::for_catalog(store);
//! assert!(models.iter().any(|m| m.resource_type() == "Patient"));
//! ```

mod model;
mod store;

pub use model::DocumentModel;
pub use store::DocumentStore;
