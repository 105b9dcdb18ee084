//! Stored resource types.
//!
//! This module defines the [`StoredResource`] type, which wraps a resource's
//! JSON with persistence metadata such as version and timestamps.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::MappingValidationError;
use crate::schema::FhirResource;

/// A FHIR resource with persistence metadata.
///
/// `StoredResource` is what the backends hand back: the raw JSON as it sits in
/// the datastore plus identity, version and timestamps. It has not been
/// validated; use [`StoredResource::to_fhir`] to map it back to a resource.
///
/// # Examples
///
/// ```
/// use fhirmap_persistence::types::StoredResource;
/// use serde_json::json;
///
/// let resource = StoredResource::new(
///     "Patient",
///     "123",
///     json!({
///         "resourceType": "Patient",
///         "id": "123",
///         "name": [{"family": "Smith"}]
///     }),
/// );
///
/// assert_eq!(resource.url(), "Patient/123");
/// assert_eq!(resource.version_id(), "1");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredResource {
    /// The FHIR resource type (e.g., "Patient", "Observation").
    resource_type: String,

    /// The resource's logical ID.
    id: String,

    /// The version ID.
    version_id: String,

    /// The resource content as JSON.
    content: Value,

    /// When the resource was first created.
    created_at: DateTime<Utc>,

    /// When the resource was last modified.
    last_modified: DateTime<Utc>,
}

impl StoredResource {
    /// Creates a new stored resource at version "1", timestamped now.
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>, content: Value) -> Self {
        let now = Utc::now();
        Self {
            resource_type: resource_type.into(),
            id: id.into(),
            version_id: "1".to_string(),
            content,
            created_at: now,
            last_modified: now,
        }
    }

    /// Creates a stored resource from existing data (e.g., loaded from database).
    pub fn from_storage(
        resource_type: impl Into<String>,
        id: impl Into<String>,
        version_id: impl Into<String>,
        content: Value,
        created_at: DateTime<Utc>,
        last_modified: DateTime<Utc>,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: id.into(),
            version_id: version_id.into(),
            content,
            created_at,
            last_modified,
        }
    }

    /// Returns the FHIR resource type.
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// Returns the resource's logical ID.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the version ID.
    pub fn version_id(&self) -> &str {
        &self.version_id
    }

    /// Returns the resource content as JSON.
    pub fn content(&self) -> &Value {
        &self.content
    }

    /// Returns when the resource was created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns when the resource was last modified.
    pub fn last_modified(&self) -> DateTime<Utc> {
        self.last_modified
    }

    /// Returns the relative URL path for this resource (e.g., "Patient/123").
    pub fn url(&self) -> String {
        format!("{}/{}", self.resource_type, self.id)
    }

    /// Returns the FHIR Meta element for this resource.
    pub fn meta(&self) -> ResourceMeta {
        ResourceMeta {
            version_id: self.version_id.clone(),
            last_updated: self.last_modified,
        }
    }

    /// Maps the stored record back to a validated resource.
    ///
    /// The stored `id` and `meta` are written over whatever the content holds
    /// before validation.
    ///
    /// # Errors
    ///
    /// Returns a [`MappingValidationError`] if the record no longer satisfies
    /// the resource definition.
    pub fn to_fhir(&self) -> Result<FhirResource, MappingValidationError> {
        let mut content = self.content.clone();
        if let Some(object) = content.as_object_mut() {
            object.insert("id".to_string(), Value::String(self.id.clone()));
            let meta = self.meta();
            let meta_value = object
                .entry("meta")
                .or_insert_with(|| Value::Object(Default::default()));
            if let Some(meta_object) = meta_value.as_object_mut() {
                meta_object.insert("versionId".to_string(), Value::String(meta.version_id));
                meta_object.insert(
                    "lastUpdated".to_string(),
                    Value::String(
                        meta.last_updated
                            .to_rfc3339_opts(SecondsFormat::Millis, true),
                    ),
                );
            }
        }

        FhirResource::construct(&self.resource_type, content).map_err(|source| {
            MappingValidationError {
                resource_type: self.resource_type.clone(),
                id: self.id.clone(),
                source,
            }
        })
    }
}

/// FHIR Meta element extracted from a stored resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceMeta {
    /// The version ID.
    #[serde(rename = "versionId")]
    pub version_id: String,

    /// The last update timestamp.
    #[serde(rename = "lastUpdated")]
    pub last_updated: DateTime<Utc>,
}
