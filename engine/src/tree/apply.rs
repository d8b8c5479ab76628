//! Rewrite the values a path addresses.

use serde_json::Value;

use crate::path::{Index, Segment, StructuredPath};

/// Replace every value addressed by `path` with `transform(current)`.
///
/// Reads are tolerant: a missing key, a short list or a value of the wrong
/// shape along the way is skipped, not reported. `name[*]` applies the rest of
/// the path to each element of the list.
///
/// Returns how many values were replaced.
///
/// # Example
/// ```
/// use nestcsv::path::parse_path;
/// use nestcsv::tree::apply_at;
/// use serde_json::{json, Value};
///
/// let mut record = json!({"items": [{"name": " a "}, {"name": " b "}]});
/// let path = parse_path("items[*].name").unwrap();
/// let touched = apply_at(&mut record, &path, |v| Value::String(v.as_str().unwrap_or("").trim().to_string()));
/// assert_eq!(touched, 2);
/// assert_eq!(record, json!({"items": [{"name": "a"}, {"name": "b"}]}));
/// ```
pub fn apply_at<F>(tree: &mut Value, path: &StructuredPath, mut transform: F) -> usize
where
    F: FnMut(&Value) -> Value,
{
    apply_segments(tree, path.segments(), &mut transform)
}

fn apply_segments<F>(node: &mut Value, segments: &[Segment], transform: &mut F) -> usize
where
    F: FnMut(&Value) -> Value,
{
    let Some((head, rest)) = segments.split_first() else {
        let replaced = transform(node);
        *node = replaced;
        return 1;
    };

    let Value::Object(map) = node else {
        return 0;
    };
    let Some(child) = map.get_mut(head.key()) else {
        return 0;
    };

    match head {
        Segment::Key(_) => apply_segments(child, rest, transform),
        Segment::Indexed { index, .. } => {
            let Value::Array(items) = child else {
                return 0;
            };
            match index {
                Index::Every => items
                    .iter_mut()
                    .map(|item| apply_segments(item, rest, transform))
                    .sum::<usize>(),
                Index::At(i) => items
                    .get_mut(*i)
                    .map_or(0, |item| apply_segments(item, rest, transform)),
            }
        }
    }
}
