//! The resource model contract.
//!
//! A [`ResourceModel`] binds one resource type to one backend. Backends
//! implement the storage primitives (`get_by_primary_key`, `find`,
//! `resolve_reference`, `after_create`); the query-level operations `get`,
//! `create_from_resource` and `paginate` are provided on top of them so every
//! backend validates, pages and includes the same way.

use std::collections::HashSet;

use async_trait::async_trait;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::error::{StorageResult, ValidationError};
use crate::schema::{FhirResource, ResourceDefinition, SchemaError};
use crate::search::{CompiledFilter, CompiledSort, compile_filters, compile_sort};
use crate::types::{PageLimits, PageResult, Pagination, ResourceQuery, StoredResource};

/// The outcome of [`ResourceModel::get`].
#[derive(Debug, Clone)]
pub enum FetchResult {
    /// A single resource addressed by id.
    Single {
        /// The resource.
        resource: FhirResource,
        /// Resources reached through include directives.
        included: Vec<FhirResource>,
    },

    /// One page of a collection search.
    Collection {
        /// The matches on this page, validated.
        resources: Vec<FhirResource>,
        /// Total number of matches across all pages.
        total: usize,
        /// The window this page was cut with.
        pagination: Pagination,
        /// Resources reached through include directives.
        included: Vec<FhirResource>,
    },
}

/// Uniform operations over one resource type's persistence.
///
/// # Example
///
/// ```ignore
/// use fhirmap_persistence::core::{FetchResult, ResourceModel};
/// use fhirmap_persistence::types::ResourceQuery;
///
/// async fn first_family(model: &dyn ResourceModel) -> StorageResult<Option<String>> {
///     let query = ResourceQuery::new("Patient").with_count(1);
///     match model.get(&query).await? {
///         FetchResult::Collection { resources, .. } => Ok(resources
///             .first()
///             .and_then(|r| r.as_json()["name"][0]["family"].as_str())
///             .map(String::from)),
///         FetchResult::Single { .. } => unreachable!(),
///     }
/// }
/// ```
#[async_trait]
pub trait ResourceModel: Send + Sync {
    /// Returns the definition of the resource type this model serves.
    fn definition(&self) -> &'static ResourceDefinition;

    /// Returns a short name of the backing store, for logs.
    fn backend_name(&self) -> &'static str;

    /// Returns the resource type this model serves.
    fn resource_type(&self) -> &'static str {
        self.definition().name
    }

    /// Loads one record by its logical id.
    ///
    /// # Errors
    ///
    /// * `StorageError::Resource(NotFound)` - if no record has this id
    async fn get_by_primary_key(&self, id: &str) -> StorageResult<StoredResource>;

    /// Returns every record matching all filters, in sort order.
    ///
    /// Without sort directives the order is the backend's insertion order.
    async fn find(
        &self,
        filters: &[CompiledFilter],
        sort: &[CompiledSort],
    ) -> StorageResult<Vec<StoredResource>>;

    /// Loads a record of any resource type held by the same backend.
    ///
    /// Used to follow references; a dangling reference yields `Ok(None)`.
    async fn resolve_reference(
        &self,
        resource_type: &str,
        id: &str,
    ) -> StorageResult<Option<StoredResource>>;

    /// Persists a freshly built instance.
    ///
    /// # Errors
    ///
    /// * `StorageError::Resource(AlreadyExists)` - if the id is taken
    async fn after_create(&self, instance: StoredResource) -> StorageResult<StoredResource>;

    /// Cuts one page out of an ordered list of matches.
    fn paginate(&self, matches: Vec<StoredResource>, pagination: &Pagination) -> PageResult {
        let total = matches.len();
        let items = matches
            .into_iter()
            .skip(pagination.offset)
            .take(pagination.count)
            .collect();
        PageResult {
            items,
            total,
            pagination: *pagination,
        }
    }

    /// Answers a query: a primary-key lookup when it has an id, a filtered
    /// search otherwise. Include directives are resolved in both cases.
    ///
    /// A `count` on the query is used as given; the caller enforces any
    /// server maximum. Without one the default page size applies.
    ///
    /// # Errors
    ///
    /// * `StorageError::Validation` - unknown search parameter, modifier,
    ///   relation or sort field, or an unparsable value
    /// * `StorageError::Mapping` - a stored record is no longer a valid resource
    /// * `StorageError::Resource(NotFound)` - the addressed resource does not exist
    #[instrument(skip(self, query), fields(resource_type = %query.resource_type))]
    async fn get(&self, query: &ResourceQuery) -> StorageResult<FetchResult> {
        let definition = self.definition();
        let relations = include_relations(definition, query)?;

        if let Some(id) = &query.id {
            let stored = self.get_by_primary_key(id).await?;
            let resource = stored.to_fhir()?;
            let included = self
                .resolve_includes(std::slice::from_ref(&resource), &relations)
                .await?;
            debug!(id = %id, included = included.len(), "Fetched resource by id");
            return Ok(FetchResult::Single { resource, included });
        }

        let filters = compile_filters(definition, &query.filters)?;
        let sort = compile_sort(definition, &query.sort)?;
        let matches = self.find(&filters, &sort).await?;

        let pagination = query.pagination(PageLimits::uncapped());
        let page = self.paginate(matches, &pagination);
        let resources = page
            .items
            .iter()
            .map(StoredResource::to_fhir)
            .collect::<Result<Vec<_>, _>>()?;
        let included = self.resolve_includes(&resources, &relations).await?;

        debug!(
            total = page.total,
            returned = resources.len(),
            included = included.len(),
            "Search completed"
        );

        Ok(FetchResult::Collection {
            resources,
            total: page.total,
            pagination: page.pagination,
            included,
        })
    }

    /// Validates persistence invariants for a new resource, builds the
    /// instance and saves it through [`after_create`](Self::after_create).
    ///
    /// An id in the query is used when the body has none; when both are
    /// present they must agree. Without either, a UUID is assigned. Every
    /// reference held in a declared relation must point at an existing
    /// record.
    ///
    /// # Errors
    ///
    /// * `StorageError::Validation` - type or id mismatch, dangling reference
    /// * `StorageError::Resource(AlreadyExists)` - the id is taken
    #[instrument(skip(self, resource, query), fields(resource_type = %resource.resource_type()))]
    async fn create_from_resource(
        &self,
        resource: FhirResource,
        query: &ResourceQuery,
    ) -> StorageResult<StoredResource> {
        if resource.resource_type() != self.resource_type() {
            return Err(ValidationError::InvalidResource(SchemaError::ResourceTypeMismatch {
                expected: self.resource_type().to_string(),
                found: resource.resource_type().to_string(),
            })
            .into());
        }

        let id = match (resource.id(), query.id.as_deref()) {
            (Some(body_id), Some(url_id)) if body_id != url_id => {
                return Err(ValidationError::IdMismatch {
                    url_id: url_id.to_string(),
                    body_id: body_id.to_string(),
                }
                .into());
            }
            (Some(body_id), _) => body_id.to_string(),
            (None, Some(url_id)) => url_id.to_string(),
            (None, None) => Uuid::new_v4().to_string(),
        };

        for (relation, target_type, target_id) in resource.reference_targets()? {
            if self
                .resolve_reference(&target_type, &target_id)
                .await?
                .is_none()
            {
                return Err(ValidationError::InvalidReference {
                    reference: format!("{}/{}", target_type, target_id),
                    message: format!("{} target does not exist", relation),
                }
                .into());
            }
        }

        let mut content = resource.into_json();
        if let Some(object) = content.as_object_mut() {
            object.insert("id".to_string(), serde_json::Value::String(id.clone()));
            object.remove("meta");
        }

        let instance = StoredResource::new(self.resource_type(), id, content);
        let saved = self.after_create(instance).await?;
        debug!(id = %saved.id(), "Created resource");
        Ok(saved)
    }

    /// Follows the given relations from each primary resource and returns
    /// the distinct targets that exist, in first-seen order.
    async fn resolve_includes(
        &self,
        primaries: &[FhirResource],
        relations: &[&'static str],
    ) -> StorageResult<Vec<FhirResource>> {
        if relations.is_empty() {
            return Ok(Vec::new());
        }

        let mut seen = HashSet::new();
        let mut included = Vec::new();
        for primary in primaries {
            for (relation, target_type, target_id) in primary.reference_targets()? {
                if !relations.contains(&relation) {
                    continue;
                }
                let key = format!("{}/{}", target_type, target_id);
                if !seen.insert(key) {
                    continue;
                }
                if let Some(stored) = self.resolve_reference(&target_type, &target_id).await? {
                    included.push(stored.to_fhir()?);
                }
            }
        }
        Ok(included)
    }
}

/// Resolves the include directives of a query to relation names.
fn include_relations(
    definition: &ResourceDefinition,
    query: &ResourceQuery,
) -> Result<Vec<&'static str>, ValidationError> {
    let mut relations = Vec::new();
    for include in &query.includes {
        if !include.applies_to(definition.name) {
            continue;
        }
        let relation = definition.relation(&include.relation).ok_or_else(|| {
            ValidationError::UnknownRelation {
                resource_type: definition.name.to_string(),
                relation: include.relation.clone(),
            }
        })?;
        if !relations.contains(&relation.name) {
            relations.push(relation.name);
        }
    }
    Ok(relations)
}
