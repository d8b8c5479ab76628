//! Fresh construction of a nested value from a path tail.

use serde_json::{Map, Value};

use crate::path::Segment;

/// Build the minimal tree that holds `value` at `segments`.
///
/// An indexed segment always starts a single-element list, whatever its
/// index: positions only matter when merging into an existing list.
///
/// # Example
/// ```
/// use nestcsv::path::parse_path;
/// use nestcsv::tree::build;
/// use serde_json::json;
///
/// let path = parse_path("first_key.nest_list[3].second_key").unwrap();
/// let tree = build(path.segments(), json!("some value"));
/// assert_eq!(tree, json!({"first_key": {"nest_list": [{"second_key": "some value"}]}}));
/// ```
pub fn build(segments: &[Segment], value: Value) -> Value {
    let Some((head, rest)) = segments.split_first() else {
        return value;
    };

    let child = build(rest, value);
    let mut map = Map::new();
    match head {
        Segment::Key(key) => {
            map.insert(key.clone(), child);
        }
        Segment::Indexed { key, .. } => {
            map.insert(key.clone(), Value::Array(vec![child]));
        }
    }
    Value::Object(map)
}
