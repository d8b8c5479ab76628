//! Rename, drop and re-nest the fields of a flat record.

use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::error::RecordResult;
use crate::path::DROP_KEY;
use crate::tree::{assemble_headers, flatten};

/// Original flat key -> new flat key, or [`DROP_KEY`] to discard the field.
pub type RenameMap = HashMap<String, String>;

/// New header for every original key.
///
/// Mapped keys take their new name. Unmapped keys become [`DROP_KEY`] when
/// `drop_unmapped` is set and keep their name otherwise.
pub fn remap_headers<S: AsRef<str>>(keys: &[S], rename: &RenameMap, drop_unmapped: bool) -> Vec<String> {
    keys.iter()
        .map(|key| {
            let key = key.as_ref();
            match rename.get(key) {
                Some(new_key) => new_key.clone(),
                None if drop_unmapped => DROP_KEY.to_string(),
                None => key.to_string(),
            }
        })
        .collect()
}

/// Rename the keys of a flat record and nest the result.
///
/// # Example
/// ```
/// use nestcsv::transform::{remap, RenameMap};
/// use serde_json::{json, Value};
///
/// let flat = json!({"a": "1", "b": "2"});
/// let rename = RenameMap::from([("a".to_string(), "x".to_string())]);
/// let record = remap(flat.as_object().unwrap(), &rename, true).unwrap();
/// assert_eq!(Value::Object(record), json!({"x": "1"}));
/// ```
pub fn remap(
    flat: &Map<String, Value>,
    rename: &RenameMap,
    drop_unmapped: bool,
) -> RecordResult<Map<String, Value>> {
    let keys: Vec<&String> = flat.keys().collect();
    let headers = remap_headers(&keys, rename, drop_unmapped);
    assemble_headers(&headers, flat.values().cloned())
}

/// [`flatten`] a nested record, then [`remap`] it.
pub fn remap_tree(
    record: &Map<String, Value>,
    rename: &RenameMap,
    drop_unmapped: bool,
) -> RecordResult<Map<String, Value>> {
    remap(&flatten(record)?, rename, drop_unmapped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RecordError;
    use serde_json::json;

    fn rename(pairs: &[(&str, &str)]) -> RenameMap {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn obj(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_rename_and_drop_unmapped() {
        let record = remap(&obj(json!({"a": "1", "b": "2"})), &rename(&[("a", "x")]), true).unwrap();
        assert_eq!(Value::Object(record), json!({"x": "1"}));
    }

    #[test]
    fn test_keep_unmapped() {
        let record = remap(&obj(json!({"a": "1", "b": "2"})), &rename(&[("a", "x")]), false).unwrap();
        assert_eq!(Value::Object(record), json!({"x": "1", "b": "2"}));
    }

    #[test]
    fn test_explicit_drop() {
        let record = remap(
            &obj(json!({"a": "1", "b": "2"})),
            &rename(&[("a", "drop")]),
            false,
        )
        .unwrap();
        assert_eq!(Value::Object(record), json!({"b": "2"}));
    }

    #[test]
    fn test_reshape_into_nested() {
        let flat = obj(json!({
            "first": "Ada",
            "last": "Lovelace",
            "phone1": "111",
            "phone2": "222"
        }));
        let map = rename(&[
            ("first", "person.name.first"),
            ("last", "person.name.last"),
            ("phone1", "person.phones[0]"),
            ("phone2", "person.phones[1]"),
        ]);
        let record = remap(&flat, &map, true).unwrap();
        assert_eq!(
            Value::Object(record),
            json!({"person": {"name": {"first": "Ada", "last": "Lovelace"}, "phones": ["111", "222"]}})
        );
    }

    #[test]
    fn test_remap_tree() {
        let record = obj(json!({"customer": {"name": "Ada", "id": 7}, "items": [{"sku": "X"}]}));
        let map = rename(&[("customer.name", "name"), ("items[0].sku", "skus[0]")]);
        let remapped = remap_tree(&record, &map, true).unwrap();
        assert_eq!(Value::Object(remapped), json!({"name": "Ada", "skus": ["X"]}));
    }

    #[test]
    fn test_conflicting_targets() {
        let flat = obj(json!({"a": "1", "b": "2"}));
        let err = remap(&flat, &rename(&[("a", "x"), ("b", "x.y")]), false).unwrap_err();
        assert!(matches!(err, RecordError::TypeConflict { .. }));
    }

    #[test]
    fn test_remap_tree_rejects_list_of_lists() {
        let record = obj(json!({"grid": [[1, 2], [3, 4]]}));
        let err = remap_tree(&record, &RenameMap::new(), false).unwrap_err();
        assert_eq!(err, RecordError::NestedList("grid[0]".into()));
    }

    #[test]
    fn test_bad_target_header() {
        let flat = obj(json!({"a": "1"}));
        let err = remap(&flat, &rename(&[("a", "x[oops]")]), false).unwrap_err();
        assert!(matches!(err, RecordError::Shape(_)));
    }
}
