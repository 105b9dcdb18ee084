//! URL to [`ResourceQuery`] parsing.
//!
//! The parser is pure: it checks syntax only. Whether a filter or include
//! names something the resource type actually has is decided by the model.
//!
//! Reserved parameters:
//!
//! | Parameter | Form | Effect |
//! |-----------|------|--------|
//! | `_count` | non-negative integer | page size |
//! | `_offset` | non-negative integer | matches to skip |
//! | `_sort` | `field,-field` | sort directives |
//! | `_include` | `relation` or `Type:relation`, comma-separated | include directives |
//!
//! Every other parameter is a filter. `_id` is an ordinary filter.

use std::sync::LazyLock;

use fhirmap_persistence::schema::is_valid_id;
use fhirmap_persistence::types::{
    IncludeDirective, Pagination, ResourceQuery, SearchFilter, SearchModifier, SortDirection,
    SortDirective,
};
use regex::Regex;
use thiserror::Error;
use url::form_urlencoded;

static RESOURCE_TYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][A-Za-z]*$").expect("valid resource type pattern"));

static PARAM_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_\-.]*$").expect("valid parameter name pattern")
});

/// A request URL that does not describe a valid query.
#[allow(missing_docs)]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryValidationError {
    #[error("request path is empty")]
    EmptyPath,

    #[error("'{segment}' is not a valid resource type name")]
    InvalidResourceType { segment: String },

    #[error("request path has {count} segments, expected 'Type' or 'Type/id'")]
    TooManySegments { count: usize },

    #[error("'{id}' is not a valid resource id")]
    InvalidId { id: String },

    #[error("search parameter name is empty")]
    EmptyParameterName,

    #[error("'{name}' is not a valid search parameter name")]
    InvalidParameterName { name: String },

    #[error("search parameter '{name}' has more than one modifier")]
    MultipleModifiers { name: String },

    #[error("unknown modifier ':{modifier}' on parameter '{name}'")]
    UnknownModifier { name: String, modifier: String },

    #[error("parameter '{name}' has no value")]
    MissingValue { name: String },

    #[error("parameter '{name}' must be a non-negative integer, got '{value}'")]
    InvalidNumber { name: String, value: String },

    #[error("malformed _sort value '{value}'")]
    InvalidSort { value: String },

    #[error("malformed _include value '{value}'")]
    InvalidInclude { value: String },
}

/// Parses a request URL into a query.
///
/// The URL may be relative (`Patient/1`, `/Patient?name=x`) or absolute, in
/// which case only its path and query are used.
///
/// # Errors
///
/// Returns a [`QueryValidationError`] describing the first problem found.
///
/// # Example
///
/// ```
/// use fhirmap_rest::query::parse_url;
///
/// let query = parse_url("Patient?family:exact=Chalmers&_count=5").unwrap();
/// assert_eq!(query.resource_type, "Patient");
/// assert_eq!(query.filters[0].name, "family");
/// assert_eq!(query.count, Some(5));
///
/// assert!(parse_url("patient").is_err());
/// ```
pub fn parse_url(url: &str) -> Result<ResourceQuery, QueryValidationError> {
    let (path, query_string) = split_url(url);

    let path = path.trim_matches('/');
    if path.is_empty() {
        return Err(QueryValidationError::EmptyPath);
    }

    let segments: Vec<&str> = path.split('/').collect();
    if segments.len() > 2 {
        return Err(QueryValidationError::TooManySegments {
            count: segments.len(),
        });
    }

    let resource_type = segments[0];
    if !RESOURCE_TYPE.is_match(resource_type) {
        return Err(QueryValidationError::InvalidResourceType {
            segment: resource_type.to_string(),
        });
    }

    let mut query = ResourceQuery::new(resource_type);
    if let Some(id) = segments.get(1) {
        if !is_valid_id(id) {
            return Err(QueryValidationError::InvalidId { id: id.to_string() });
        }
        query.id = Some(id.to_string());
    }

    for (key, value) in form_urlencoded::parse(query_string.as_bytes()) {
        apply_parameter(&mut query, &key, &value)?;
    }

    Ok(query)
}

/// Splits a URL into its path and query string, dropping any scheme,
/// authority and fragment.
fn split_url(url: &str) -> (&str, &str) {
    let url = url.split_once('#').map_or(url, |(before, _)| before);
    let (path, query) = url.split_once('?').unwrap_or((url, ""));

    let path = match path.split_once("://") {
        Some((_, rest)) => rest.find('/').map_or("", |slash| &rest[slash..]),
        None => path,
    };
    (path, query)
}

fn apply_parameter(
    query: &mut ResourceQuery,
    key: &str,
    value: &str,
) -> Result<(), QueryValidationError> {
    let mut parts = key.split(':');
    let name = parts.next().unwrap_or_default();
    let modifier = parts.next();
    if parts.next().is_some() {
        return Err(QueryValidationError::MultipleModifiers {
            name: name.to_string(),
        });
    }

    if name.is_empty() {
        return Err(QueryValidationError::EmptyParameterName);
    }
    if !PARAM_NAME.is_match(name) {
        return Err(QueryValidationError::InvalidParameterName {
            name: name.to_string(),
        });
    }
    if value.is_empty() {
        return Err(QueryValidationError::MissingValue {
            name: key.to_string(),
        });
    }

    let reserved = matches!(name, "_count" | "_offset" | "_sort" | "_include");
    let modifier = match modifier {
        None => None,
        Some(m) if reserved => {
            return Err(QueryValidationError::UnknownModifier {
                name: name.to_string(),
                modifier: m.to_string(),
            });
        }
        Some(m) => Some(m.parse::<SearchModifier>().map_err(|_| {
            QueryValidationError::UnknownModifier {
                name: name.to_string(),
                modifier: m.to_string(),
            }
        })?),
    };

    match name {
        "_count" => query.count = Some(parse_number(name, value)?),
        "_offset" => query.offset = Some(parse_number(name, value)?),
        "_sort" => query.sort.extend(parse_sort(value)?),
        "_include" => query.includes.extend(parse_include(value)?),
        _ => query.filters.push(SearchFilter {
            name: name.to_string(),
            modifier,
            value: value.to_string(),
        }),
    }
    Ok(())
}

fn parse_number(name: &str, value: &str) -> Result<usize, QueryValidationError> {
    value
        .parse()
        .map_err(|_| QueryValidationError::InvalidNumber {
            name: name.to_string(),
            value: value.to_string(),
        })
}

fn parse_sort(value: &str) -> Result<Vec<SortDirective>, QueryValidationError> {
    value
        .split(',')
        .map(|field| {
            let name = field.strip_prefix('-').unwrap_or(field);
            if PARAM_NAME.is_match(name) {
                Ok(SortDirective::parse(field))
            } else {
                Err(QueryValidationError::InvalidSort {
                    value: value.to_string(),
                })
            }
        })
        .collect()
}

fn parse_include(value: &str) -> Result<Vec<IncludeDirective>, QueryValidationError> {
    let invalid = || QueryValidationError::InvalidInclude {
        value: value.to_string(),
    };

    value
        .split(',')
        .map(|item| {
            let (source_type, relation) = match item.split_once(':') {
                Some((source, relation)) => {
                    if !RESOURCE_TYPE.is_match(source) {
                        return Err(invalid());
                    }
                    (Some(source.to_string()), relation)
                }
                None => (None, item),
            };
            if !PARAM_NAME.is_match(relation) {
                return Err(invalid());
            }
            Ok(IncludeDirective {
                source_type,
                relation: relation.to_string(),
            })
        })
        .collect()
}

/// Renders a query back into a URL under `base_url`, with an explicit
/// paging window.
///
/// Filters, sort and include directives are kept in order; `_count` and
/// `_offset` come last.
pub fn query_url(base_url: &str, query: &ResourceQuery, pagination: Pagination) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());

    for filter in &query.filters {
        let key = match filter.modifier {
            Some(modifier) => format!("{}:{}", filter.name, modifier),
            None => filter.name.clone(),
        };
        serializer.append_pair(&key, &filter.value);
    }

    if !query.sort.is_empty() {
        let sort: Vec<String> = query
            .sort
            .iter()
            .map(|s| match s.direction {
                SortDirection::Ascending => s.parameter.clone(),
                SortDirection::Descending => format!("-{}", s.parameter),
            })
            .collect();
        serializer.append_pair("_sort", &sort.join(","));
    }

    for include in &query.includes {
        let value = match &include.source_type {
            Some(source) => format!("{}:{}", source, include.relation),
            None => include.relation.clone(),
        };
        serializer.append_pair("_include", &value);
    }

    serializer.append_pair("_count", &pagination.count.to_string());
    serializer.append_pair("_offset", &pagination.offset.to_string());

    let mut url = format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        query.resource_type
    );
    if let Some(id) = &query.id {
        url.push('/');
        url.push_str(id);
    }
    url.push('?');
    url.push_str(&serializer.finish());
    url
}
