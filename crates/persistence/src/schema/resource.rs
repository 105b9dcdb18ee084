//! Validated resource values.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::{ResourceDefinition, SchemaError, definition, select_path};

static ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9\-.]{1,64}$").expect("valid id pattern"));

/// Returns true if `id` is a valid FHIR logical id.
pub fn is_valid_id(id: &str) -> bool {
    ID_PATTERN.is_match(id)
}

/// A resource whose content has been checked against its definition.
///
/// Constructing a `FhirResource` is the only way to obtain one, so holding a
/// value means the JSON had the right shape when it was built.
#[derive(Debug, Clone)]
pub struct FhirResource {
    definition: &'static ResourceDefinition,
    content: Value,
}

impl FhirResource {
    /// Builds a resource of `resource_type` from external JSON.
    ///
    /// A missing `resourceType` is filled in; a present one must match.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] when the type is unknown, the body is not an
    /// object, the id is malformed, a required element is missing, or a
    /// declared relation holds a malformed or disallowed reference.
    pub fn construct(resource_type: &str, body: Value) -> Result<Self, SchemaError> {
        let definition =
            definition(resource_type).ok_or_else(|| SchemaError::UnknownResourceType {
                resource_type: resource_type.to_string(),
            })?;

        let mut content = body;
        let object = content.as_object_mut().ok_or(SchemaError::NotAnObject)?;

        match object.get("resourceType") {
            None => {
                object.insert(
                    "resourceType".to_string(),
                    Value::String(definition.name.to_string()),
                );
            }
            Some(Value::String(found)) if found == definition.name => {}
            Some(other) => {
                return Err(SchemaError::ResourceTypeMismatch {
                    expected: definition.name.to_string(),
                    found: other.as_str().unwrap_or("<non-string>").to_string(),
                });
            }
        }

        if let Some(id) = object.get("id") {
            match id.as_str() {
                Some(id) if is_valid_id(id) => {}
                _ => {
                    return Err(SchemaError::InvalidId {
                        id: id.as_str().map_or_else(|| id.to_string(), String::from),
                    });
                }
            }
        }

        for element in definition.required {
            if object.get(*element).is_none_or(Value::is_null) {
                return Err(SchemaError::MissingRequiredElement {
                    resource_type: definition.name.to_string(),
                    element: element.to_string(),
                });
            }
        }

        let resource = Self {
            definition,
            content,
        };
        resource.reference_targets()?;
        Ok(resource)
    }

    /// Returns the resource type name.
    pub fn resource_type(&self) -> &'static str {
        self.definition.name
    }

    /// Returns the definition this resource was validated against.
    pub fn definition(&self) -> &'static ResourceDefinition {
        self.definition
    }

    /// Returns the logical id, if the resource carries one.
    pub fn id(&self) -> Option<&str> {
        self.content.get("id").and_then(Value::as_str)
    }

    /// Returns the resource as JSON.
    pub fn as_json(&self) -> &Value {
        &self.content
    }

    /// Consumes the resource and returns its JSON.
    pub fn into_json(self) -> Value {
        self.content
    }

    /// Returns `(relation, target type, target id)` for every reference held in
    /// a declared relation.
    pub fn reference_targets(&self) -> Result<Vec<(&'static str, String, String)>, SchemaError> {
        let mut targets = Vec::new();
        for relation in self.definition.relations {
            for reference in select_path(&self.content, relation.path) {
                let Some(raw) = reference.get("reference").and_then(Value::as_str) else {
                    // Identifier-only or display-only references are not followed.
                    continue;
                };
                let (target_type, target_id) = split_reference(raw).ok_or_else(|| {
                    SchemaError::MalformedReference {
                        element: format!("{}.{}", self.definition.name, relation.path),
                        reference: raw.to_string(),
                    }
                })?;
                if !relation.targets.contains(&target_type) {
                    return Err(SchemaError::DisallowedReferenceTarget {
                        element: format!("{}.{}", self.definition.name, relation.path),
                        target: target_type.to_string(),
                        allowed: relation.targets.join(", "),
                    });
                }
                targets.push((relation.name, target_type.to_string(), target_id.to_string()));
            }
        }
        Ok(targets)
    }
}

/// Splits a relative `Type/id` reference.
pub(crate) fn split_reference(reference: &str) -> Option<(&str, &str)> {
    let (target_type, target_id) = reference.split_once('/')?;
    let type_ok = target_type
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_uppercase())
        && target_type.chars().all(|c| c.is_ascii_alphabetic());
    (type_ok && is_valid_id(target_id)).then_some((target_type, target_id))
}
