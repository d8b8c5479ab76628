//! Nested record -> flat `{ path: scalar }` view.

use serde_json::{Map, Value};

use crate::error::{RecordError, RecordResult};

/// Flatten a record into path strings that [`crate::path::parse_path`] and
/// [`super::assemble`] turn back into the same record.
///
/// Objects join keys with `.`, list elements get `[i]`. Empty objects and
/// lists produce no entries.
///
/// A path segment carries a single index, so a list directly inside a list
/// has no flat form and fails with [`RecordError::NestedList`].
///
/// # Example
/// ```
/// use nestcsv::tree::flatten;
/// use serde_json::{json, Value};
///
/// let record = json!({"key_1": {"key_2": "v1"}, "items": [{"n": "x"}]});
/// let flat = flatten(record.as_object().unwrap()).unwrap();
/// assert_eq!(Value::Object(flat), json!({"key_1.key_2": "v1", "items[0].n": "x"}));
/// ```
pub fn flatten(record: &Map<String, Value>) -> RecordResult<Map<String, Value>> {
    let mut flat = Map::new();
    for (key, value) in record {
        flatten_into(key.clone(), value, &mut flat)?;
    }
    Ok(flat)
}

fn flatten_into(prefix: String, value: &Value, flat: &mut Map<String, Value>) -> RecordResult<()> {
    match value {
        Value::Object(child) => {
            for (key, v) in child {
                flatten_into(format!("{}.{}", prefix, key), v, flat)?;
            }
        }
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                let path = format!("{}[{}]", prefix, i);
                if item.is_array() {
                    return Err(RecordError::NestedList(path));
                }
                flatten_into(path, item, flat)?;
            }
        }
        scalar => {
            flat.insert(prefix, scalar.clone());
        }
    }
    Ok(())
}
