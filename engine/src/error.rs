//! Error types for the nestcsv conversion pipeline.
//!
//! The hierarchy mirrors the layers of the crate:
//!
//! - [`PathError`] - header/path string parsing
//! - [`RecordError`] - building one nested record from one row
//! - [`CsvError`] - reading delimited input
//! - [`ProfileError`] - loading and compiling a conversion profile
//! - [`PipelineError`] - top-level orchestration
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Path Errors
// =============================================================================

/// Errors raised while parsing a dotted path string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    /// A bracket group did not contain a decimal index or `*`.
    #[error("Invalid index in header '{header}' (segment '{segment}'): {reason}")]
    Parse {
        header: String,
        segment: String,
        reason: String,
    },

    /// A path must hold at least one segment.
    #[error("Path has no segments")]
    Empty,
}

// =============================================================================
// Record Errors
// =============================================================================

/// Errors raised while assembling one nested record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// Row has a different number of fields than there are headers.
    #[error("Headers length does not match values length: {paths} headers, {values} values")]
    LengthMismatch { paths: usize, values: usize },

    /// A header is not a usable segment sequence.
    #[error("Header shape error: {0}")]
    Shape(#[from] PathError),

    /// The tree already holds a value of another shape where the path needs to go through.
    #[error("Cannot write '{path}': expected {expected} but found {found}")]
    TypeConflict {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A list directly inside a list cannot be written as a flat path.
    #[error("List nested directly in a list at '{0}' has no flat path")]
    NestedList(String),

    /// `[*]` selects many elements and cannot be used as a write target.
    #[error("Cannot write through '[*]' in '{0}'")]
    UnresolvedIndex(String),
}

// =============================================================================
// CSV Errors
// =============================================================================

/// Errors while reading delimited input.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to decode bytes.
    #[error("Failed to decode input as {0}")]
    Encoding(String),

    /// Invalid CSV format.
    #[error("Invalid CSV at line {line}: {message}")]
    Parse { line: u64, message: String },

    /// Empty file.
    #[error("CSV file is empty")]
    EmptyFile,

    /// No headers found.
    #[error("No headers found in CSV")]
    NoHeaders,
}

// =============================================================================
// Profile Errors
// =============================================================================

/// Errors while loading or compiling a conversion profile.
#[derive(Debug, Error)]
pub enum ProfileError {
    /// Profile file could not be read.
    #[error("Failed to read profile: {0}")]
    Io(#[from] std::io::Error),

    /// Profile is not valid JSON for the expected shape.
    #[error("Invalid profile JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A validation pattern is not a valid regex.
    #[error("Invalid pattern for field '{field}': {message}")]
    InvalidPattern { field: String, message: String },

    /// The embedded JSON Schema could not be compiled.
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    /// An enrichment path could not be parsed.
    #[error("Invalid enrichment path: {0}")]
    Path(#[from] PathError),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
///
/// Row-level [`RecordError`]s never surface here during a conversion run:
/// the pipeline diverts those rows to the error sink and keeps going.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// CSV reading error.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// Header parsing error.
    #[error("Header error: {0}")]
    Path(#[from] PathError),

    /// Record building error outside of a per-row loop.
    #[error("Record error: {0}")]
    Record(#[from] RecordError),

    /// Profile error.
    #[error("Profile error: {0}")]
    Profile(#[from] ProfileError),

    /// Output could not be written.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failed.
    #[error("JSON error on line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// NDJSON input line is not a JSON object.
    #[error("Line {line} is not a JSON object")]
    NotAnObject { line: usize },

    /// Writing delimited output failed.
    #[error("CSV write error: {0}")]
    CsvWrite(#[from] csv::Error),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for path parsing.
pub type PathResult<T> = Result<T, PathError>;

/// Result type for record assembly.
pub type RecordResult<T> = Result<T, RecordError>;

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for profile operations.
pub type ProfileResult<T> = Result<T, ProfileError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
