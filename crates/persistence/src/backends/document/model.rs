//! [`ResourceModel`] over the document store.

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::ResourceModel;
use crate::error::{ResourceError, StorageResult};
use crate::schema::{self, ResourceDefinition};
use crate::search::{CompiledFilter, CompiledSort, sort_resources};
use crate::types::StoredResource;

use super::DocumentStore;

/// The model for one resource type stored as documents.
#[derive(Debug, Clone)]
pub struct DocumentModel {
    definition: &'static ResourceDefinition,
    store: Arc<DocumentStore>,
}

impl DocumentModel {
    /// Creates a model for `definition` over a shared store.
    pub fn new(definition: &'static ResourceDefinition, store: Arc<DocumentStore>) -> Self {
        Self { definition, store }
    }

    /// Creates one model per known resource type.
    pub fn for_catalog(store: Arc<DocumentStore>) -> Vec<Self> {
        schema::CATALOG
            .iter()
            .map(|definition| Self::new(definition, Arc::clone(&store)))
            .collect()
    }
}

#[async_trait]
impl ResourceModel for DocumentModel {
    fn definition(&self) -> &'static ResourceDefinition {
        self.definition
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn get_by_primary_key(&self, id: &str) -> StorageResult<StoredResource> {
        self.store
            .fetch(self.definition.name, id)
            .ok_or_else(|| {
                ResourceError::NotFound {
                    resource_type: self.definition.name.to_string(),
                    id: id.to_string(),
                }
                .into()
            })
    }

    async fn find(
        &self,
        filters: &[CompiledFilter],
        sort: &[CompiledSort],
    ) -> StorageResult<Vec<StoredResource>> {
        let mut matches = self.store.search(self.definition.name, filters);
        sort_resources(&mut matches, sort);
        Ok(matches)
    }

    async fn resolve_reference(
        &self,
        resource_type: &str,
        id: &str,
    ) -> StorageResult<Option<StoredResource>> {
        Ok(self.store.fetch(resource_type, id))
    }

    async fn after_create(&self, instance: StoredResource) -> StorageResult<StoredResource> {
        self.store.insert(instance.clone())?;
        Ok(instance)
    }
}
