//! One row in, one nested record out.

use serde_json::{Map, Value};

use super::{merge, MergeMode};
use crate::error::{RecordError, RecordResult};
use crate::path::{parse_headers, StructuredPath};

/// Zip parsed headers with one row of values into a single nested record.
///
/// Values are merged in column order, so later columns win on repeated paths.
/// The first failing merge aborts the row; nothing partial is returned.
///
/// # Example
/// ```
/// use nestcsv::path::parse_headers;
/// use nestcsv::tree::assemble;
/// use serde_json::{json, Value};
///
/// let headers = parse_headers(&["key_1.key_2", "items[0].n"]).unwrap();
/// let record = assemble(&headers, vec!["v1", "x"]).unwrap();
/// assert_eq!(Value::Object(record), json!({"key_1": {"key_2": "v1"}, "items": [{"n": "x"}]}));
/// ```
pub fn assemble<I, V>(paths: &[StructuredPath], values: I) -> RecordResult<Map<String, Value>>
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    let values: Vec<Value> = values.into_iter().map(Into::into).collect();
    if paths.len() != values.len() {
        return Err(RecordError::LengthMismatch {
            paths: paths.len(),
            values: values.len(),
        });
    }

    let mut record = Map::new();
    for (path, value) in paths.iter().zip(values) {
        merge(&mut record, path, value, MergeMode::Upsert)?;
    }
    Ok(record)
}

/// Parse raw header strings, then [`assemble`]. Header problems surface as
/// [`RecordError::Shape`].
pub fn assemble_headers<S, I, V>(headers: &[S], values: I) -> RecordResult<Map<String, Value>>
where
    S: AsRef<str>,
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    let paths = parse_headers(headers)?;
    assemble(&paths, values)
}
