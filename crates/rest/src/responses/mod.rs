//! Response payloads.
//!
//! - [`operation_outcome`] - OperationOutcome generation
//! - [`bundle`] - searchset Bundle building

pub mod bundle;
pub mod operation_outcome;

pub use bundle::{BundleBuilder, SearchPage, searchset_bundle};
pub use operation_outcome::{IssueType, OperationOutcomeBuilder, error_outcome};

use fhirmap_persistence::schema::FhirResource;
use serde_json::Value;

/// The FHIR JSON media type.
pub const FHIR_JSON: &str = "application/fhir+json";

/// Renders a single resource, placing included resources in `contained`.
pub fn resource_with_contained(resource: FhirResource, included: Vec<FhirResource>) -> Value {
    let mut json = resource.into_json();
    if !included.is_empty()
        && let Some(object) = json.as_object_mut()
    {
        object.insert(
            "contained".to_string(),
            Value::Array(included.into_iter().map(FhirResource::into_json).collect()),
        );
    }
    json
}
