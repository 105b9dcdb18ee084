//! Resource schema definitions and validation.
//!
//! Every supported resource type is described by a static
//! [`ResourceDefinition`]: its required elements, the search parameters a
//! query may use, and the relations that `_include` can follow. The
//! definitions drive both validation of incoming resources
//! ([`FhirResource::construct`]) and the search machinery of the backends.
//!
//! # Example
//!
//! ```
//! use fhirmap_persistence::schema::{self, FhirResource};
//! use serde_json::json;
//!
//! let definition = schema::definition("Patient").unwrap();
//! assert!(definition.search_param("family").is_some());
//!
//! let patient = FhirResource::construct("Patient", json!({
//!     "name": [{"family": "Chalmers"}]
//! })).unwrap();
//! assert_eq!(patient.as_json()["resourceType"], "Patient");
//! ```

mod catalog;
mod path;
mod resource;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use catalog::{CATALOG, definition, resource_types};
pub use path::select_path;
pub use resource::{FhirResource, is_valid_id};

/// Search parameter types understood by the backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchParamType {
    /// Free text, matched case-insensitively.
    String,
    /// A code or identifier, matched exactly.
    Token,
    /// A date or dateTime, compared lexically on its ISO-8601 form.
    Date,
    /// A decimal number.
    Number,
    /// A `Type/id` reference to another resource.
    Reference,
}

impl SearchParamType {
    /// Returns true if values of this type can be ordered with `_sort`.
    pub fn is_sortable(&self) -> bool {
        matches!(
            self,
            SearchParamType::String | SearchParamType::Date | SearchParamType::Number
        )
    }

    /// Returns true if this type accepts comparison prefixes (`gt`, `le`, ...).
    pub fn accepts_prefix(&self) -> bool {
        matches!(self, SearchParamType::Date | SearchParamType::Number)
    }
}

impl fmt::Display for SearchParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchParamType::String => write!(f, "string"),
            SearchParamType::Token => write!(f, "token"),
            SearchParamType::Date => write!(f, "date"),
            SearchParamType::Number => write!(f, "number"),
            SearchParamType::Reference => write!(f, "reference"),
        }
    }
}

impl FromStr for SearchParamType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "string" => Ok(SearchParamType::String),
            "token" => Ok(SearchParamType::Token),
            "date" => Ok(SearchParamType::Date),
            "number" => Ok(SearchParamType::Number),
            "reference" => Ok(SearchParamType::Reference),
            _ => Err(format!("unknown search parameter type: {}", s)),
        }
    }
}

/// A search parameter declared for a resource type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchParamDef {
    /// The name used in query strings (e.g. `family`).
    pub code: &'static str,
    /// How values are compared.
    pub param_type: SearchParamType,
    /// Dotted element paths the values are taken from.
    pub paths: &'static [&'static str],
}

/// A relation that can be followed with `_include`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelationDef {
    /// The relation name used in include directives.
    pub name: &'static str,
    /// Dotted path to the Reference element(s).
    pub path: &'static str,
    /// Resource types the reference may point at.
    pub targets: &'static [&'static str],
}

/// Static description of one resource type.
#[derive(Debug)]
pub struct ResourceDefinition {
    /// The canonical resource type name.
    pub name: &'static str,
    /// Top-level elements that must be present and non-null.
    pub required: &'static [&'static str],
    /// Search parameters, excluding `_id` which every type supports.
    pub search_params: &'static [SearchParamDef],
    /// Relations available to include directives.
    pub relations: &'static [RelationDef],
}

/// The `_id` parameter shared by every resource type.
pub const ID_PARAM: SearchParamDef = SearchParamDef {
    code: "_id",
    param_type: SearchParamType::Token,
    paths: &["id"],
};

impl ResourceDefinition {
    /// Looks up a search parameter by its code.
    pub fn search_param(&self, code: &str) -> Option<&SearchParamDef> {
        if code == ID_PARAM.code {
            return Some(&ID_PARAM);
        }
        self.search_params.iter().find(|p| p.code == code)
    }

    /// Looks up a relation by name.
    pub fn relation(&self, name: &str) -> Option<&RelationDef> {
        self.relations.iter().find(|r| r.name == name)
    }
}

/// Errors raised while constructing a resource against its definition.
#[allow(missing_docs)]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("unknown resource type '{resource_type}'")]
    UnknownResourceType { resource_type: String },

    #[error("resource must be a JSON object")]
    NotAnObject,

    #[error("resourceType '{found}' does not match expected '{expected}'")]
    ResourceTypeMismatch { expected: String, found: String },

    #[error("invalid resource id '{id}'")]
    InvalidId { id: String },

    #[error("{resource_type}.{element} is required")]
    MissingRequiredElement {
        resource_type: String,
        element: String,
    },

    #[error("{element} has malformed reference '{reference}'")]
    MalformedReference { element: String, reference: String },

    #[error("{element} may not reference {target} (allowed: {allowed})")]
    DisallowedReferenceTarget {
        element: String,
        target: String,
        allowed: String,
    },
}
