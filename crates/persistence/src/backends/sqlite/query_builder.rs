//! Translation of compiled filters into SQL over `search_index`.
//!
//! Each filter becomes one `EXISTS` (or `NOT EXISTS`) subquery correlated
//! with the outer `resources r` row, so a resource matches a filter when any
//! of its indexed values for that parameter satisfies the condition. The
//! conditions mirror [`crate::search::matcher`] value for value.

use rusqlite::types::Value as SqlValue;

use crate::search::{CompareValue, CompiledFilter, FilterOp};
use crate::types::SearchPrefix;

/// Tolerance for number equality, kept in step with the in-memory matcher.
const NUMBER_EPSILON: f64 = 1e-9;

/// A SQL fragment with its positional parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlFragment {
    /// SQL text using `?` placeholders.
    pub sql: String,
    /// Values bound to the placeholders, in order.
    pub params: Vec<SqlValue>,
}

/// Builds the full search statement for a resource type.
///
/// Rows come back in insertion order; sorting is applied afterwards.
pub fn build_search(resource_type: &str, filters: &[CompiledFilter]) -> SqlFragment {
    let mut params = vec![SqlValue::Text(resource_type.to_string())];
    let mut sql = String::from(
        "SELECT r.resource_type, r.id, r.version_id, r.data, r.created_at, r.last_updated \
         FROM resources r WHERE r.resource_type = ?",
    );

    for filter in filters {
        let clause = filter_clause(filter.param.code, &filter.op, &mut params);
        sql.push_str(" AND ");
        sql.push_str(&clause);
    }

    sql.push_str(" ORDER BY r.rowid");
    SqlFragment { sql, params }
}

fn filter_clause(param_name: &str, op: &FilterOp, params: &mut Vec<SqlValue>) -> String {
    match op {
        FilterOp::Missing(true) => format!("NOT {}", exists(param_name, None, params)),
        FilterOp::Missing(false) => exists(param_name, None, params),
        FilterOp::Not(inner) => format!("NOT ({})", filter_clause(param_name, inner, params)),
        value_op => {
            let mut condition_params = Vec::new();
            let condition = value_condition(value_op, &mut condition_params);
            let clause = exists(param_name, Some(&condition), params);
            params.extend(condition_params);
            clause
        }
    }
}

fn exists(param_name: &str, condition: Option<&str>, params: &mut Vec<SqlValue>) -> String {
    params.push(SqlValue::Text(param_name.to_string()));
    let mut sql = String::from(
        "EXISTS (SELECT 1 FROM search_index si \
         WHERE si.resource_type = r.resource_type AND si.resource_id = r.id \
         AND si.param_name = ?",
    );
    if let Some(condition) = condition {
        sql.push_str(" AND (");
        sql.push_str(condition);
        sql.push(')');
    }
    sql.push(')');
    sql
}

fn text(value: &str) -> SqlValue {
    SqlValue::Text(value.to_string())
}

fn value_condition(op: &FilterOp, params: &mut Vec<SqlValue>) -> String {
    match op {
        FilterOp::StartsWith(needle) => {
            params.extend([text(needle), text(needle)]);
            "substr(si.value_lower, 1, length(?)) = ?".to_string()
        }
        FilterOp::Contains(needle) => {
            params.push(text(needle));
            "instr(si.value_lower, ?) > 0".to_string()
        }
        FilterOp::Exact(expected) => {
            params.push(text(expected));
            "si.value_text = ?".to_string()
        }
        FilterOp::Reference(expected) if expected.contains('/') => {
            params.push(text(expected));
            "si.value_text = ?".to_string()
        }
        FilterOp::Reference(expected) => {
            let suffix = format!("/{}", expected);
            params.extend([text(expected), text(&suffix), text(&suffix)]);
            "si.value_text = ? OR substr(si.value_text, -length(?)) = ?".to_string()
        }
        FilterOp::Compare(prefix, CompareValue::Date(wanted)) => {
            date_condition(*prefix, wanted, params)
        }
        FilterOp::Compare(prefix, CompareValue::Number(wanted)) => {
            number_condition(*prefix, *wanted, params)
        }
        // Handled by filter_clause before reaching here.
        FilterOp::Missing(_) | FilterOp::Not(_) => "0".to_string(),
    }
}

fn date_condition(prefix: SearchPrefix, wanted: &str, params: &mut Vec<SqlValue>) -> String {
    const WITHIN: &str = "substr(si.value_text, 1, length(?)) = ?";
    params.extend([text(wanted), text(wanted)]);

    match prefix {
        SearchPrefix::Eq => WITHIN.to_string(),
        SearchPrefix::Ne => format!("NOT ({})", WITHIN),
        SearchPrefix::Gt | SearchPrefix::Lt => {
            params.push(text(wanted));
            let cmp = if prefix == SearchPrefix::Gt { ">" } else { "<" };
            format!("NOT ({}) AND si.value_text {} ?", WITHIN, cmp)
        }
        SearchPrefix::Ge | SearchPrefix::Le => {
            params.push(text(wanted));
            let cmp = if prefix == SearchPrefix::Ge { ">" } else { "<" };
            format!("({}) OR si.value_text {} ?", WITHIN, cmp)
        }
    }
}

fn number_condition(prefix: SearchPrefix, wanted: f64, params: &mut Vec<SqlValue>) -> String {
    params.push(SqlValue::Real(wanted));
    match prefix {
        SearchPrefix::Eq => format!("abs(si.value_number - ?) < {:e}", NUMBER_EPSILON),
        SearchPrefix::Ne => format!("abs(si.value_number - ?) >= {:e}", NUMBER_EPSILON),
        SearchPrefix::Gt => "si.value_number > ?".to_string(),
        SearchPrefix::Lt => "si.value_number < ?".to_string(),
        SearchPrefix::Ge => "si.value_number >= ?".to_string(),
        SearchPrefix::Le => "si.value_number <= ?".to_string(),
    }
}
