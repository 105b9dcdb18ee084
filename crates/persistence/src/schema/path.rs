//! Dotted element path selection over JSON resources.

use serde_json::Value;

/// Selects every value reachable through a dotted element path.
///
/// Arrays are flattened at each step, so `name.given` on a Patient with two
/// names yields all given names of both. Null values are skipped.
///
/// ```
/// use fhirmap_persistence::schema::select_path;
/// use serde_json::json;
///
/// let patient = json!({"name": [{"given": ["Peter", "James"]}, {"given": ["Jim"]}]});
/// let given: Vec<_> = select_path(&patient, "name.given")
///     .into_iter()
///     .filter_map(|v| v.as_str())
///     .collect();
/// assert_eq!(given, ["Peter", "James", "Jim"]);
/// ```
pub fn select_path<'a>(content: &'a Value, path: &str) -> Vec<&'a Value> {
    let mut current = vec![content];
    for segment in path.split('.') {
        let mut next = Vec::new();
        for value in current {
            if let Some(child) = value.get(segment) {
                push_flattened(child, &mut next);
            }
        }
        if next.is_empty() {
            return next;
        }
        current = next;
    }
    current
}

fn push_flattened<'a>(value: &'a Value, out: &mut Vec<&'a Value>) {
    match value {
        Value::Null => {}
        Value::Array(items) => {
            for item in items {
                push_flattened(item, out);
            }
        }
        other => out.push(other),
    }
}
