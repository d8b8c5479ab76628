//! Structural cleanup of a record.

use serde_json::{Map, Value};

/// `null`, `false`, zero, `""` and empty containers.
pub fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// Remove falsy values and values equal to one of `sentinels`, recursively.
/// Containers left empty by the removal are removed from their parent too.
///
/// Returns `None` when `value` is not an object: there is nothing to keep.
///
/// # Example
/// ```
/// use nestcsv::tree::prune;
/// use serde_json::json;
///
/// let cleaned = prune(json!({"a": "", "b": {"c": null}, "d": "x"}), &[]);
/// assert_eq!(cleaned, Some(json!({"d": "x"})));
/// ```
pub fn prune(value: Value, sentinels: &[Value]) -> Option<Value> {
    match value {
        Value::Object(mut map) => {
            prune_map(&mut map, sentinels);
            Some(Value::Object(map))
        }
        _ => None,
    }
}

/// In-place variant of [`prune`] for a record that is already a map.
pub fn prune_map(map: &mut Map<String, Value>, sentinels: &[Value]) {
    let entries = std::mem::take(map);
    for (key, value) in entries {
        if let Some(kept) = prune_value(value, sentinels) {
            map.insert(key, kept);
        }
    }
}

fn prune_value(value: Value, sentinels: &[Value]) -> Option<Value> {
    if is_falsy(&value) || sentinels.contains(&value) {
        return None;
    }

    match value {
        Value::Object(mut child) => {
            prune_map(&mut child, sentinels);
            (!child.is_empty()).then_some(Value::Object(child))
        }
        Value::Array(items) => {
            let kept: Vec<Value> = items
                .into_iter()
                .filter_map(|item| prune_value(item, sentinels))
                .collect();
            (!kept.is_empty()).then_some(Value::Array(kept))
        }
        scalar => Some(scalar),
    }
}
