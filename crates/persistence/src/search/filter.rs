//! Compilation of query filters and sort directives.
//!
//! Filters arrive as raw `name[:modifier]=value` triples. Compiling them
//! against a [`ResourceDefinition`] resolves the parameter, checks the
//! modifier against the parameter type, parses prefixes and numbers, and
//! yields a [`FilterOp`] that each backend can evaluate its own way.

use crate::error::ValidationError;
use crate::schema::{ResourceDefinition, SearchParamDef, SearchParamType};
use crate::types::{SearchFilter, SearchModifier, SearchPrefix, SortDirection, SortDirective};

/// A filter resolved against its parameter definition.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFilter {
    /// The parameter being filtered on.
    pub param: SearchParamDef,

    /// The comparison to apply to the parameter's values.
    pub op: FilterOp,
}

/// The comparison a filter applies to each extracted value.
///
/// A resource matches when any of its values satisfies the operation, except
/// for [`FilterOp::Missing`] and [`FilterOp::Not`], which look at the value set
/// as a whole.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOp {
    /// Case-insensitive prefix match. Holds the lowercased needle.
    StartsWith(String),
    /// Case-insensitive substring match. Holds the lowercased needle.
    Contains(String),
    /// Case-sensitive whole-value match.
    Exact(String),
    /// `Type/id` equality, or id suffix match when the needle has no type.
    Reference(String),
    /// Ordered comparison on a date or number.
    Compare(SearchPrefix, CompareValue),
    /// `true` matches resources with no values, `false` those with some.
    Missing(bool),
    /// Matches resources where no value satisfies the inner operation.
    Not(Box<FilterOp>),
}

/// The right-hand side of a [`FilterOp::Compare`].
#[derive(Debug, Clone, PartialEq)]
pub enum CompareValue {
    /// An ISO-8601 date or dateTime, possibly partial (`2020`, `2020-05`).
    Date(String),
    /// A decimal number.
    Number(f64),
}

/// A sort directive resolved against its parameter definition.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledSort {
    /// The parameter to order by.
    pub param: SearchParamDef,
    /// Whether to reverse the natural order.
    pub descending: bool,
}

/// Compiles all filters of a query.
///
/// # Errors
///
/// Returns a [`ValidationError`] for unknown parameters, modifiers that do
/// not apply to the parameter type, and values that cannot be parsed.
pub fn compile_filters(
    definition: &ResourceDefinition,
    filters: &[SearchFilter],
) -> Result<Vec<CompiledFilter>, ValidationError> {
    filters
        .iter()
        .map(|filter| compile_filter(definition, filter))
        .collect()
}

/// Compiles a single filter.
pub fn compile_filter(
    definition: &ResourceDefinition,
    filter: &SearchFilter,
) -> Result<CompiledFilter, ValidationError> {
    let param = *definition.search_param(&filter.name).ok_or_else(|| {
        ValidationError::UnknownSearchParameter {
            resource_type: definition.name.to_string(),
            parameter: filter.name.clone(),
        }
    })?;

    let op = match filter.modifier {
        None => base_op(&param, &filter.value)?,
        Some(SearchModifier::Missing) => match filter.value.as_str() {
            "true" => FilterOp::Missing(true),
            "false" => FilterOp::Missing(false),
            _ => {
                return Err(ValidationError::InvalidSearchValue {
                    parameter: filter.name.clone(),
                    message: "missing expects 'true' or 'false'".to_string(),
                });
            }
        },
        Some(SearchModifier::Exact) if param.param_type == SearchParamType::String => {
            FilterOp::Exact(filter.value.clone())
        }
        Some(SearchModifier::Contains) if param.param_type == SearchParamType::String => {
            FilterOp::Contains(filter.value.to_lowercase())
        }
        Some(SearchModifier::Not)
            if matches!(
                param.param_type,
                SearchParamType::Token | SearchParamType::Reference
            ) =>
        {
            FilterOp::Not(Box::new(base_op(&param, &filter.value)?))
        }
        Some(modifier) => {
            return Err(ValidationError::UnsupportedModifier {
                modifier: modifier.to_string(),
                param_type: param.param_type.to_string(),
            });
        }
    };

    Ok(CompiledFilter { param, op })
}

fn base_op(param: &SearchParamDef, raw: &str) -> Result<FilterOp, ValidationError> {
    let invalid = |message: &str| ValidationError::InvalidSearchValue {
        parameter: param.code.to_string(),
        message: message.to_string(),
    };

    match param.param_type {
        SearchParamType::String => Ok(FilterOp::StartsWith(raw.to_lowercase())),
        SearchParamType::Token => {
            // `system|code` searches on the code only.
            let code = raw.rsplit_once('|').map_or(raw, |(_, code)| code);
            if code.is_empty() {
                return Err(invalid("token value has no code"));
            }
            Ok(FilterOp::Exact(code.to_string()))
        }
        SearchParamType::Reference => Ok(FilterOp::Reference(raw.to_string())),
        SearchParamType::Date => {
            let (prefix, value) = SearchPrefix::extract(raw);
            if value.is_empty() || !value.starts_with(|c: char| c.is_ascii_digit()) {
                return Err(invalid("expected an ISO-8601 date"));
            }
            Ok(FilterOp::Compare(
                prefix,
                CompareValue::Date(value.to_string()),
            ))
        }
        SearchParamType::Number => {
            let (prefix, value) = SearchPrefix::extract(raw);
            let number = value
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .ok_or_else(|| invalid("expected a number"))?;
            Ok(FilterOp::Compare(prefix, CompareValue::Number(number)))
        }
    }
}

/// Compiles the sort directives of a query.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidSort`] for unknown or unsortable
/// parameters.
pub fn compile_sort(
    definition: &ResourceDefinition,
    sort: &[SortDirective],
) -> Result<Vec<CompiledSort>, ValidationError> {
    sort.iter()
        .map(|directive| {
            let param = definition
                .search_param(&directive.parameter)
                .filter(|p| p.param_type.is_sortable() || p.code == "_id")
                .ok_or_else(|| ValidationError::InvalidSort {
                    resource_type: definition.name.to_string(),
                    field: directive.parameter.clone(),
                })?;
            Ok(CompiledSort {
                param: *param,
                descending: directive.direction == SortDirection::Descending,
            })
        })
        .collect()
}
