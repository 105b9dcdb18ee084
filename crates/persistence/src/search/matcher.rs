//! In-memory evaluation of compiled filters and sort orders.

use std::cmp::Ordering;

use serde_json::Value;

use crate::schema::SearchParamType;
use crate::types::{SearchPrefix, StoredResource};

use super::extractor::{IndexValue, extract_param};
use super::filter::{CompareValue, CompiledFilter, CompiledSort, FilterOp};

/// Tolerance for number equality.
const NUMBER_EPSILON: f64 = 1e-9;

/// Returns true if `content` satisfies every filter.
pub fn matches_all(filters: &[CompiledFilter], content: &Value) -> bool {
    filters.iter().all(|filter| matches(filter, content))
}

/// Returns true if `content` satisfies one filter.
pub fn matches(filter: &CompiledFilter, content: &Value) -> bool {
    let values = extract_param(&filter.param, content);
    op_matches(&filter.op, &values)
}

fn op_matches(op: &FilterOp, values: &[IndexValue]) -> bool {
    match op {
        FilterOp::Missing(missing) => values.is_empty() == *missing,
        FilterOp::Not(inner) => !op_matches(inner, values),
        _ => values.iter().any(|value| value_matches(op, value)),
    }
}

fn value_matches(op: &FilterOp, value: &IndexValue) -> bool {
    match (op, value) {
        (FilterOp::StartsWith(needle), IndexValue::Text(text)) => {
            text.to_lowercase().starts_with(needle.as_str())
        }
        (FilterOp::Contains(needle), IndexValue::Text(text)) => {
            text.to_lowercase().contains(needle.as_str())
        }
        (FilterOp::Exact(expected), IndexValue::Text(text)) => text == expected,
        (FilterOp::Reference(expected), IndexValue::Text(text)) => {
            reference_matches(text, expected)
        }
        (FilterOp::Compare(prefix, CompareValue::Date(wanted)), IndexValue::Text(text)) => {
            compare_date(*prefix, text, wanted)
        }
        (FilterOp::Compare(prefix, CompareValue::Number(wanted)), IndexValue::Number(n)) => {
            compare_number(*prefix, *n, *wanted)
        }
        _ => false,
    }
}

/// Matches a stored reference against a search value.
///
/// `Patient/1` must match exactly; a bare `1` matches any type.
pub fn reference_matches(actual: &str, expected: &str) -> bool {
    if expected.contains('/') {
        actual == expected
    } else {
        actual == expected
            || actual
                .strip_suffix(expected)
                .is_some_and(|head| head.ends_with('/'))
    }
}

/// Compares dates on their ISO-8601 text.
///
/// A partial search value covers every instant that starts with it, so
/// `eq2020` matches `2020-05-01` and `gt2020` does not.
pub fn compare_date(prefix: SearchPrefix, actual: &str, wanted: &str) -> bool {
    let within = actual.starts_with(wanted);
    match prefix {
        SearchPrefix::Eq => within,
        SearchPrefix::Ne => !within,
        SearchPrefix::Gt => !within && actual > wanted,
        SearchPrefix::Lt => !within && actual < wanted,
        SearchPrefix::Ge => within || actual > wanted,
        SearchPrefix::Le => within || actual < wanted,
    }
}

/// Compares numbers with the given prefix.
pub fn compare_number(prefix: SearchPrefix, actual: f64, wanted: f64) -> bool {
    let equal = (actual - wanted).abs() < NUMBER_EPSILON;
    match prefix {
        SearchPrefix::Eq => equal,
        SearchPrefix::Ne => !equal,
        SearchPrefix::Gt => actual > wanted,
        SearchPrefix::Lt => actual < wanted,
        SearchPrefix::Ge => actual >= wanted || equal,
        SearchPrefix::Le => actual <= wanted || equal,
    }
}

/// Orders resources by the given sort directives.
///
/// Ascending order uses each resource's smallest value, descending its
/// largest. Resources without a value sort last either way. The sort is
/// stable, so ties keep their storage order.
pub fn sort_resources(resources: &mut [StoredResource], sorts: &[CompiledSort]) {
    if sorts.is_empty() {
        return;
    }

    let mut keyed: Vec<(Vec<Option<IndexValue>>, StoredResource)> = resources
        .iter()
        .map(|resource| {
            let keys = sorts
                .iter()
                .map(|sort| sort_key(sort, resource.content()))
                .collect();
            (keys, resource.clone())
        })
        .collect();

    keyed.sort_by(|(a, _), (b, _)| {
        sorts
            .iter()
            .zip(a.iter().zip(b.iter()))
            .map(|(sort, (left, right))| compare_keys(left.as_ref(), right.as_ref(), sort.descending))
            .find(|ordering| *ordering != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });

    for (slot, (_, resource)) in resources.iter_mut().zip(keyed) {
        *slot = resource;
    }
}

fn sort_key(sort: &CompiledSort, content: &Value) -> Option<IndexValue> {
    let values = extract_param(&sort.param, content).into_iter().map(|value| match value {
        IndexValue::Text(text) if sort.param.param_type == SearchParamType::String => {
            IndexValue::Text(text.to_lowercase())
        }
        other => other,
    });

    let pick = if sort.descending {
        Ordering::Greater
    } else {
        Ordering::Less
    };
    values.reduce(|best, candidate| {
        if compare_values(&candidate, &best) == pick {
            candidate
        } else {
            best
        }
    })
}

fn compare_keys(left: Option<&IndexValue>, right: Option<&IndexValue>, descending: bool) -> Ordering {
    match (left, right) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(l), Some(r)) => {
            let ordering = compare_values(l, r);
            if descending {
                ordering.reverse()
            } else {
                ordering
            }
        }
    }
}

fn compare_values(left: &IndexValue, right: &IndexValue) -> Ordering {
    match (left, right) {
        (IndexValue::Text(l), IndexValue::Text(r)) => l.cmp(r),
        (IndexValue::Number(l), IndexValue::Number(r)) => l.partial_cmp(r).unwrap_or(Ordering::Equal),
        _ => Ordering::Equal,
    }
}
