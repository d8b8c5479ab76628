//! Nested record engine.
//!
//! Records are `serde_json::Value` trees: objects for mappings, arrays for
//! lists, everything else a scalar. This module builds them from structured
//! paths and takes them apart again:
//!
//! - [`build`] - construct the minimal tree holding one value at a path
//! - [`merge`] - place a value into an existing tree in place
//! - [`assemble`] - one row of values + parsed headers -> one record
//! - [`flatten`] - record -> `{ "a.b[0].c": value }`
//! - [`prune`] - drop empty and sentinel values
//! - [`apply_at`] - rewrite the value(s) a path addresses
//!
//! ```text
//! headers: ["key_1.key_2", "items[0].n"]    row: ["v1", "x"]
//!                          │ assemble
//!                          ▼
//! {"key_1": {"key_2": "v1"}, "items": [{"n": "x"}]}
//!                          │ flatten
//!                          ▼
//! {"key_1.key_2": "v1", "items[0].n": "x"}
//! ```

pub mod apply;
pub mod assemble;
pub mod build;
pub mod flatten;
pub mod merge;
pub mod prune;

pub use apply::apply_at;
pub use assemble::{assemble, assemble_headers};
pub use build::build;
pub use flatten::flatten;
pub use merge::{merge, MergeMode};
pub use prune::{is_falsy, prune, prune_map};

use serde_json::Value;

/// Short name of a value's shape, used in error messages.
pub fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Values a merge skips: null, `""`, `" "` and empty containers.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty() || s == " ",
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}
