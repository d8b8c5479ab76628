//! Header path parsing.
//!
//! A header such as `order.items[2].sku` addresses a value inside a nested
//! record. Parsing it yields a [`StructuredPath`]: `order`, `items` at index 2,
//! then `sku`.
//!
//! # Syntax
//!
//! - Segments are separated by `.`
//! - `name[<n>]` says `name` holds a list and addresses element `n`
//! - `name[*]` addresses every element (only meaningful for [`crate::tree::apply_at`])
//! - A plain segment equal to [`DROP_KEY`] marks a column to discard
//!
//! Only the first bracket group of a segment is read as the index; every
//! bracket group is stripped from the key.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{PathError, PathResult};

/// Header value that marks a column as discarded.
pub const DROP_KEY: &str = "drop";

static BRACKET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\[\]]*)\]").expect("valid bracket regex"));

/// Position selected by an indexed segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Index {
    /// A single element.
    At(usize),
    /// Every element of the list.
    Every,
}

/// One unit of a structured path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// A mapping key.
    Key(String),
    /// A key holding a list, plus the position inside that list.
    Indexed { key: String, index: Index },
}

impl Segment {
    /// Key name regardless of segment kind.
    pub fn key(&self) -> &str {
        match self {
            Segment::Key(key) | Segment::Indexed { key, .. } => key,
        }
    }

    /// True for a plain segment equal to [`DROP_KEY`].
    pub fn is_drop(&self) -> bool {
        matches!(self, Segment::Key(key) if key == DROP_KEY)
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(key) => write!(f, "{}", key),
            Segment::Indexed { key, index: Index::At(i) } => write!(f, "{}[{}]", key, i),
            Segment::Indexed { key, index: Index::Every } => write!(f, "{}[*]", key),
        }
    }
}

/// Parsed, non-empty sequence of segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StructuredPath {
    segments: Vec<Segment>,
}

impl StructuredPath {
    /// Build a path from segments. Fails when `segments` is empty.
    pub fn from_segments(segments: Vec<Segment>) -> PathResult<Self> {
        if segments.is_empty() {
            return Err(PathError::Empty);
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always false; kept for the `len`/`is_empty` pairing.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// First segment.
    pub fn head(&self) -> &Segment {
        &self.segments[0]
    }

    /// True when the column this path came from should be discarded.
    pub fn is_dropped(&self) -> bool {
        self.head().is_drop()
    }

    /// True when any segment uses `[*]`.
    pub fn has_every(&self) -> bool {
        self.segments
            .iter()
            .any(|s| matches!(s, Segment::Indexed { index: Index::Every, .. }))
    }
}

impl fmt::Display for StructuredPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", render(&self.segments))
    }
}

impl FromStr for StructuredPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_path(s)
    }
}

impl TryFrom<String> for StructuredPath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse_path(&value)
    }
}

impl From<StructuredPath> for String {
    fn from(path: StructuredPath) -> Self {
        path.to_string()
    }
}

/// Render a segment slice back into its dotted form.
pub fn render(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(".")
}

/// Parse one header string into a [`StructuredPath`].
///
/// # Example
/// ```
/// use nestcsv::path::{parse_path, Index, Segment};
///
/// let path = parse_path("key_2.items[0].sku").unwrap();
/// assert_eq!(path.segments()[1], Segment::Indexed { key: "items".into(), index: Index::At(0) });
/// assert_eq!(path.to_string(), "key_2.items[0].sku");
/// ```
pub fn parse_path(header: &str) -> PathResult<StructuredPath> {
    let segments = header
        .split('.')
        .map(|token| parse_segment(header, token))
        .collect::<PathResult<Vec<_>>>()?;

    StructuredPath::from_segments(segments)
}

/// Parse every header of a header row.
pub fn parse_headers<S: AsRef<str>>(headers: &[S]) -> PathResult<Vec<StructuredPath>> {
    headers.iter().map(|h| parse_path(h.as_ref())).collect()
}

fn parse_segment(header: &str, token: &str) -> PathResult<Segment> {
    let Some(caps) = BRACKET_RE.captures(token) else {
        return Ok(Segment::Key(token.to_string()));
    };

    let index = parse_index(header, token, &caps[1])?;
    let key = BRACKET_RE.replace_all(token, "").into_owned();

    Ok(Segment::Indexed { key, index })
}

fn parse_index(header: &str, token: &str, body: &str) -> PathResult<Index> {
    let fail = |reason: String| PathError::Parse {
        header: header.to_string(),
        segment: token.to_string(),
        reason,
    };

    if body == "*" {
        return Ok(Index::Every);
    }

    if body.is_empty() || !body.bytes().all(|b| b.is_ascii_digit()) {
        return Err(fail(format!(
            "expected a non-negative integer or '*', got '{}'",
            body
        )));
    }

    body.parse::<usize>()
        .map(Index::At)
        .map_err(|e| fail(e.to_string()))
}
