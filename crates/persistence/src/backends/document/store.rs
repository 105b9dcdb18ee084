//! Process-local JSON document collections.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::error::{ResourceError, StorageResult};
use crate::search::{CompiledFilter, matches_all};
use crate::types::StoredResource;

/// An in-memory document store with one collection per resource type.
///
/// Documents keep their insertion order within a collection. The store is
/// shared by every [`DocumentModel`](super::DocumentModel) through an `Arc`.
#[derive(Debug, Default)]
pub struct DocumentStore {
    collections: RwLock<HashMap<String, Vec<StoredResource>>>,
}

impl DocumentStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of one document.
    pub fn fetch(&self, resource_type: &str, id: &str) -> Option<StoredResource> {
        self.collections
            .read()
            .get(resource_type)
            .and_then(|docs| docs.iter().find(|doc| doc.id() == id))
            .cloned()
    }

    /// Appends a document to its collection.
    ///
    /// The content is stored as given, without validation.
    ///
    /// # Errors
    ///
    /// Returns `ResourceError::AlreadyExists` if the id is taken.
    pub fn insert(&self, resource: StoredResource) -> StorageResult<()> {
        let mut collections = self.collections.write();
        let docs = collections
            .entry(resource.resource_type().to_string())
            .or_default();

        if docs.iter().any(|doc| doc.id() == resource.id()) {
            return Err(ResourceError::AlreadyExists {
                resource_type: resource.resource_type().to_string(),
                id: resource.id().to_string(),
            }
            .into());
        }

        docs.push(resource);
        Ok(())
    }

    /// Returns copies of all documents of a type matching every filter.
    pub fn search(&self, resource_type: &str, filters: &[CompiledFilter]) -> Vec<StoredResource> {
        self.collections
            .read()
            .get(resource_type)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| matches_all(filters, doc.content()))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns the number of documents in a collection.
    pub fn count(&self, resource_type: &str) -> usize {
        self.collections
            .read()
            .get(resource_type)
            .map_or(0, Vec::len)
    }
}
