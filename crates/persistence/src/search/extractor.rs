//! Search parameter value extraction.
//!
//! Walks the element paths of each declared search parameter and converts
//! what it finds into [`IndexValue`]s. Both backends use the same extraction:
//! the SQLite backend writes the values into `search_index`, the document
//! backend evaluates filters against them directly.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schema::{ID_PARAM, ResourceDefinition, SearchParamDef, SearchParamType, select_path};

/// A value extracted for the search index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IndexValue {
    /// Text for string, token, date and reference parameters.
    Text(String),
    /// Numeric value for number parameters.
    Number(f64),
}

impl IndexValue {
    /// Returns the text, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            IndexValue::Text(text) => Some(text),
            IndexValue::Number(_) => None,
        }
    }

    /// Returns the number, if this is a numeric value.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            IndexValue::Number(n) => Some(*n),
            IndexValue::Text(_) => None,
        }
    }
}

/// A value extracted from a resource, tagged with its parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedValue {
    /// The parameter code (e.g., "family", "_id").
    pub param_name: &'static str,

    /// The parameter type.
    pub param_type: SearchParamType,

    /// The converted value.
    pub value: IndexValue,
}

/// Extracts every searchable value of a resource, including `_id`.
pub fn extract_all(definition: &ResourceDefinition, content: &Value) -> Vec<ExtractedValue> {
    std::iter::once(&ID_PARAM)
        .chain(definition.search_params.iter())
        .flat_map(|param| {
            extract_param(param, content)
                .into_iter()
                .map(move |value| ExtractedValue {
                    param_name: param.code,
                    param_type: param.param_type,
                    value,
                })
        })
        .collect()
}

/// Extracts the values of one search parameter.
pub fn extract_param(param: &SearchParamDef, content: &Value) -> Vec<IndexValue> {
    param
        .paths
        .iter()
        .flat_map(|path| select_path(content, path))
        .filter_map(|value| convert(param.param_type, value))
        .collect()
}

fn convert(param_type: SearchParamType, value: &Value) -> Option<IndexValue> {
    match (param_type, value) {
        (SearchParamType::Number, Value::Number(n)) => n.as_f64().map(IndexValue::Number),
        (SearchParamType::Number, Value::String(s)) => s.parse().ok().map(IndexValue::Number),
        (SearchParamType::Number, _) => None,
        (SearchParamType::Token, Value::Bool(b)) => Some(IndexValue::Text(b.to_string())),
        (SearchParamType::Token, Value::Number(n)) => Some(IndexValue::Text(n.to_string())),
        (_, Value::String(s)) if !s.is_empty() => Some(IndexValue::Text(s.clone())),
        _ => None,
    }
}
