//! In-place placement of a value into an existing tree.

use serde_json::{Map, Value};

use super::{build, is_blank, kind_name};
use crate::error::{RecordError, RecordResult};
use crate::path::{render, Index, Segment, StructuredPath};

/// Whether a merge may create structure that is not there yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeMode {
    /// Create missing keys, lists and list elements.
    #[default]
    Upsert,
    /// Only overwrite values whose path already exists.
    UpdateOnly,
}

impl MergeMode {
    fn adds(self) -> bool {
        self == MergeMode::Upsert
    }
}

/// Place `value` at `path` inside `target`, creating intermediate mappings and
/// lists as needed.
///
/// - A path whose first segment is `drop` is ignored.
/// - Blank values (`null`, `""`, `" "`, empty containers) are ignored.
/// - An existing value at the final key is overwritten.
/// - For `key[i]`: an existing element `i` is merged into; a missing one is
///   appended at the end of the list. Gaps are never padded.
///
/// Walking through a value of the wrong shape (a string where an object is
/// needed, say) fails with [`RecordError::TypeConflict`] and leaves what was
/// already written untouched.
///
/// # Example
/// ```
/// use nestcsv::path::parse_path;
/// use nestcsv::tree::{merge, MergeMode};
/// use serde_json::{json, Map, Value};
///
/// let mut record = Map::new();
/// merge(&mut record, &parse_path("items[0].name").unwrap(), json!("a"), MergeMode::Upsert).unwrap();
/// merge(&mut record, &parse_path("items[1].name").unwrap(), json!("b"), MergeMode::Upsert).unwrap();
/// assert_eq!(Value::Object(record), json!({"items": [{"name": "a"}, {"name": "b"}]}));
/// ```
pub fn merge(
    target: &mut Map<String, Value>,
    path: &StructuredPath,
    value: Value,
    mode: MergeMode,
) -> RecordResult<()> {
    if path.is_dropped() || is_blank(&value) {
        return Ok(());
    }
    if path.has_every() {
        return Err(RecordError::UnresolvedIndex(path.to_string()));
    }

    merge_into(target, path.segments(), 0, value, mode)
}

fn merge_into(
    map: &mut Map<String, Value>,
    full: &[Segment],
    depth: usize,
    value: Value,
    mode: MergeMode,
) -> RecordResult<()> {
    let rest = &full[depth + 1..];

    match &full[depth] {
        Segment::Indexed { key, index: Index::At(index) } => {
            merge_list(map, key, *index, full, depth, value, mode)
        }
        Segment::Indexed { index: Index::Every, .. } => {
            Err(RecordError::UnresolvedIndex(render(full)))
        }
        Segment::Key(key) => {
            if !map.contains_key(key) {
                if mode.adds() {
                    map.insert(key.clone(), build(rest, value));
                }
                return Ok(());
            }

            match map.get_mut(key) {
                Some(slot) if rest.is_empty() => {
                    *slot = value;
                    Ok(())
                }
                Some(Value::Object(child)) => merge_into(child, full, depth + 1, value, mode),
                Some(other) => Err(conflict(full, depth, "object", other)),
                None => Ok(()),
            }
        }
    }
}

fn merge_list(
    map: &mut Map<String, Value>,
    key: &str,
    index: usize,
    full: &[Segment],
    depth: usize,
    value: Value,
    mode: MergeMode,
) -> RecordResult<()> {
    let rest = &full[depth + 1..];

    if !map.contains_key(key) {
        if mode.adds() {
            map.insert(key.to_string(), Value::Array(vec![build(rest, value)]));
        }
        return Ok(());
    }

    let items = match map.get_mut(key) {
        Some(Value::Array(items)) => items,
        Some(other) => return Err(conflict(full, depth, "array", other)),
        None => return Ok(()),
    };

    if index >= items.len() {
        if mode.adds() {
            items.push(build(rest, value));
        }
        return Ok(());
    }

    if rest.is_empty() {
        items[index] = value;
        return Ok(());
    }

    match &mut items[index] {
        Value::Object(child) => merge_into(child, full, depth + 1, value, mode),
        other => Err(conflict(full, depth, "object", other)),
    }
}

fn conflict(full: &[Segment], depth: usize, expected: &'static str, found: &Value) -> RecordError {
    RecordError::TypeConflict {
        path: render(&full[..=depth]),
        expected,
        found: kind_name(found),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::parse_path;
    use serde_json::json;

    fn upsert(map: &mut Map<String, Value>, header: &str, value: Value) -> RecordResult<()> {
        merge(map, &parse_path(header).unwrap(), value, MergeMode::Upsert)
    }

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn test_overwrite_existing_leaf() {
        let mut map = object(json!({"firstKey": {"secondKey": "value"}}));
        upsert(&mut map, "firstKey.secondKey", json!("new_value")).unwrap();
        assert_eq!(Value::Object(map), json!({"firstKey": {"secondKey": "new_value"}}));
    }

    #[test]
    fn test_creates_intermediate_structure() {
        let mut map = Map::new();
        upsert(&mut map, "a.b.c", json!("x")).unwrap();
        upsert(&mut map, "a.b.d", json!("y")).unwrap();
        upsert(&mut map, "a.e", json!("z")).unwrap();
        assert_eq!(
            Value::Object(map),
            json!({"a": {"b": {"c": "x", "d": "y"}, "e": "z"}})
        );
    }

    #[test]
    fn test_drop_head_is_ignored() {
        let original = json!({"drop": "kept", "a": {"b": 1}});
        let mut map = object(original.clone());
        upsert(&mut map, "drop", json!("value")).unwrap();
        upsert(&mut map, "drop.a.b", json!("value")).unwrap();
        assert_eq!(Value::Object(map), original);
    }

    #[test]
    fn test_blank_values_are_ignored() {
        let original = json!({"a": {"b": "old"}});
        let mut map = object(original.clone());
        for blank in [json!(""), json!(" "), json!(null)] {
            upsert(&mut map, "a.b", blank.clone()).unwrap();
            upsert(&mut map, "new.path[0].x", blank).unwrap();
        }
        assert_eq!(Value::Object(map), original);
    }

    #[test]
    fn test_list_append_order() {
        let mut map = Map::new();
        upsert(&mut map, "items[0].name", json!("a")).unwrap();
        upsert(&mut map, "items[1].name", json!("b")).unwrap();
        upsert(&mut map, "items[2].name", json!("c")).unwrap();
        assert_eq!(
            Value::Object(map),
            json!({"items": [{"name": "a"}, {"name": "b"}, {"name": "c"}]})
        );
    }

    #[test]
    fn test_list_element_is_merged_into() {
        let mut map = Map::new();
        upsert(&mut map, "items[0].name", json!("a")).unwrap();
        upsert(&mut map, "items[0].qty", json!("2")).unwrap();
        upsert(&mut map, "items[1].name", json!("b")).unwrap();
        upsert(&mut map, "items[1].qty", json!("5")).unwrap();
        assert_eq!(
            Value::Object(map),
            json!({"items": [{"name": "a", "qty": "2"}, {"name": "b", "qty": "5"}]})
        );
    }

    #[test]
    fn test_sparse_index_appends_without_padding() {
        let mut map = Map::new();
        upsert(&mut map, "items[3].name", json!("first")).unwrap();
        upsert(&mut map, "items[7].name", json!("second")).unwrap();
        assert_eq!(
            Value::Object(map),
            json!({"items": [{"name": "first"}, {"name": "second"}]})
        );
    }

    #[test]
    fn test_scalar_list_elements() {
        let mut map = Map::new();
        upsert(&mut map, "tags[0]", json!("x")).unwrap();
        upsert(&mut map, "tags[1]", json!("y")).unwrap();
        upsert(&mut map, "tags[0]", json!("z")).unwrap();
        assert_eq!(Value::Object(map), json!({"tags": ["z", "y"]}));
    }

    #[test]
    fn test_update_only_does_not_create() {
        let mut map = object(json!({"a": {"b": 1}, "items": [{"n": "x"}]}));
        let path = parse_path("a.c").unwrap();
        merge(&mut map, &path, json!(2), MergeMode::UpdateOnly).unwrap();
        let path = parse_path("z.y").unwrap();
        merge(&mut map, &path, json!(2), MergeMode::UpdateOnly).unwrap();
        let path = parse_path("items[1].n").unwrap();
        merge(&mut map, &path, json!("y"), MergeMode::UpdateOnly).unwrap();
        let path = parse_path("others[0].n").unwrap();
        merge(&mut map, &path, json!("y"), MergeMode::UpdateOnly).unwrap();

        let path = parse_path("a.b").unwrap();
        merge(&mut map, &path, json!(3), MergeMode::UpdateOnly).unwrap();
        let path = parse_path("items[0].n").unwrap();
        merge(&mut map, &path, json!("w"), MergeMode::UpdateOnly).unwrap();

        assert_eq!(Value::Object(map), json!({"a": {"b": 3}, "items": [{"n": "w"}]}));
    }

    #[test]
    fn test_recursing_into_scalar_is_type_conflict() {
        let mut map = Map::new();
        upsert(&mut map, "a", json!("scalar")).unwrap();
        let err = upsert(&mut map, "a.b", json!("x")).unwrap_err();
        assert_eq!(
            err,
            RecordError::TypeConflict { path: "a".into(), expected: "object", found: "string" }
        );
        assert_eq!(Value::Object(map), json!({"a": "scalar"}));
    }

    #[test]
    fn test_indexing_into_non_list_is_type_conflict() {
        let mut map = Map::new();
        upsert(&mut map, "a.b", json!("x")).unwrap();
        let err = upsert(&mut map, "a[0].b", json!("y")).unwrap_err();
        assert!(matches!(err, RecordError::TypeConflict { expected: "array", found: "object", .. }));
    }

    #[test]
    fn test_list_element_of_wrong_shape() {
        let mut map = Map::new();
        upsert(&mut map, "tags[0]", json!("x")).unwrap();
        let err = upsert(&mut map, "tags[0].name", json!("y")).unwrap_err();
        match err {
            RecordError::TypeConflict { path, found, .. } => {
                assert_eq!(path, "tags[0]");
                assert_eq!(found, "string");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_every_marker_cannot_be_written() {
        let mut map = Map::new();
        let err = upsert(&mut map, "items[*].name", json!("x")).unwrap_err();
        assert_eq!(err, RecordError::UnresolvedIndex("items[*].name".into()));
    }

    #[test]
    fn test_zero_and_false_are_written() {
        let mut map = Map::new();
        upsert(&mut map, "count", json!(0)).unwrap();
        upsert(&mut map, "flag", json!(false)).unwrap();
        assert_eq!(Value::Object(map), json!({"count": 0, "flag": false}));
    }
}
