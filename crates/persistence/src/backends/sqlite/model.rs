//! [`ResourceModel`] over the SQLite backend.

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::ResourceModel;
use crate::error::{ResourceError, StorageResult};
use crate::schema::{self, ResourceDefinition};
use crate::search::{CompiledFilter, CompiledSort, sort_resources};
use crate::types::StoredResource;

use super::SqliteBackend;

/// The model for one resource type stored in SQLite.
///
/// All blocking database work runs on the blocking thread pool.
#[derive(Debug, Clone)]
pub struct SqliteModel {
    definition: &'static ResourceDefinition,
    backend: Arc<SqliteBackend>,
}

impl SqliteModel {
    /// Creates a model for `definition` over a shared backend.
    pub fn new(definition: &'static ResourceDefinition, backend: Arc<SqliteBackend>) -> Self {
        Self {
            definition,
            backend,
        }
    }

    /// Creates one model per known resource type.
    pub fn for_catalog(backend: Arc<SqliteBackend>) -> Vec<Self> {
        schema::CATALOG
            .iter()
            .map(|definition| Self::new(definition, Arc::clone(&backend)))
            .collect()
    }
}

#[async_trait]
impl ResourceModel for SqliteModel {
    fn definition(&self) -> &'static ResourceDefinition {
        self.definition
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn get_by_primary_key(&self, id: &str) -> StorageResult<StoredResource> {
        let backend = Arc::clone(&self.backend);
        let resource_type = self.definition.name;
        let id = id.to_string();

        tokio::task::spawn_blocking(move || -> StorageResult<StoredResource> {
            backend.fetch(resource_type, &id)?.ok_or_else(|| {
                ResourceError::NotFound {
                    resource_type: resource_type.to_string(),
                    id,
                }
                .into()
            })
        })
        .await?
    }

    async fn find(
        &self,
        filters: &[CompiledFilter],
        sort: &[CompiledSort],
    ) -> StorageResult<Vec<StoredResource>> {
        let backend = Arc::clone(&self.backend);
        let resource_type = self.definition.name;
        let filters = filters.to_vec();

        let mut matches =
            tokio::task::spawn_blocking(move || backend.search(resource_type, &filters)).await??;
        sort_resources(&mut matches, sort);
        Ok(matches)
    }

    async fn resolve_reference(
        &self,
        resource_type: &str,
        id: &str,
    ) -> StorageResult<Option<StoredResource>> {
        let backend = Arc::clone(&self.backend);
        let resource_type = resource_type.to_string();
        let id = id.to_string();

        tokio::task::spawn_blocking(move || backend.fetch(&resource_type, &id)).await?
    }

    async fn after_create(&self, instance: StoredResource) -> StorageResult<StoredResource> {
        let backend = Arc::clone(&self.backend);
        let definition = self.definition;

        tokio::task::spawn_blocking(move || -> StorageResult<StoredResource> {
            backend.insert(definition, &instance)?;
            Ok(instance)
        })
        .await?
    }
}
