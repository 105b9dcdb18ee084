//! Test infrastructure for the persistence layer.
//!
//! [`TestBackend`] wraps a registry over either backend together with a raw
//! handle on its store, so tests can run the same scenario against both and
//! can plant records that bypass validation.

#![allow(dead_code)]

pub mod fixtures;

use std::sync::Arc;

use serde_json::Value;

use fhirmap_persistence::backends::document::{DocumentModel, DocumentStore};
use fhirmap_persistence::backends::sqlite::{SqliteBackend, SqliteModel};
use fhirmap_persistence::core::ResourceModel;
use fhirmap_persistence::registry::ModelRegistry;
use fhirmap_persistence::schema::{self, FhirResource};
use fhirmap_persistence::types::{ResourceQuery, StoredResource};

pub use fixtures::*;

enum RawStore {
    Memory(Arc<DocumentStore>),
    Sqlite(Arc<SqliteBackend>),
}

/// A registry plus direct access to the store behind it.
pub struct TestBackend {
    pub name: &'static str,
    pub registry: ModelRegistry,
    raw: RawStore,
}

impl TestBackend {
    pub fn memory() -> Self {
        let store = Arc::new(DocumentStore::new());
        let models = DocumentModel::for_catalog(Arc::clone(&store))
            .into_iter()
            .map(|m| Arc::new(m) as Arc<dyn ResourceModel>)
            .collect();
        Self {
            name: "memory",
            registry: ModelRegistry::with_models(models),
            raw: RawStore::Memory(store),
        }
    }

    pub fn sqlite() -> Self {
        let backend =
            Arc::new(SqliteBackend::in_memory().expect("Failed to create SQLite backend"));
        let models = SqliteModel::for_catalog(Arc::clone(&backend))
            .into_iter()
            .map(|m| Arc::new(m) as Arc<dyn ResourceModel>)
            .collect();
        Self {
            name: "sqlite",
            registry: ModelRegistry::with_models(models),
            raw: RawStore::Sqlite(backend),
        }
    }

    /// Both backends, for running one scenario against each.
    pub fn all() -> Vec<Self> {
        vec![Self::memory(), Self::sqlite()]
    }

    pub async fn model(&self, resource_type: &str) -> Arc<dyn ResourceModel> {
        self.registry
            .resolve(resource_type)
            .await
            .unwrap_or_else(|e| panic!("[{}] no model for {}: {}", self.name, resource_type, e))
    }

    /// Validates and creates a resource through its model.
    pub async fn create(&self, resource_type: &str, body: Value) -> StoredResource {
        let resource = FhirResource::construct(resource_type, body)
            .unwrap_or_else(|e| panic!("[{}] invalid fixture: {}", self.name, e));
        self.model(resource_type)
            .await
            .create_from_resource(resource, &ResourceQuery::new(resource_type))
            .await
            .unwrap_or_else(|e| panic!("[{}] create failed: {}", self.name, e))
    }

    /// Writes a record straight into the store, skipping validation.
    pub fn insert_raw(&self, resource: StoredResource) {
        match &self.raw {
            RawStore::Memory(store) => store.insert(resource).unwrap(),
            RawStore::Sqlite(backend) => {
                let definition = schema::definition(resource.resource_type()).unwrap();
                backend.insert(definition, &resource).unwrap()
            }
        }
    }
}
