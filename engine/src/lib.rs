//! # nestcsv - CSV rows to nested JSON lines
//!
//! Column headers written as dotted paths (`customer.name`, `items[0].sku`)
//! describe where each cell goes in a nested record. nestcsv reads a CSV file,
//! builds one record per row, and writes the records as NDJSON. Rows that do
//! not fit are diverted to an error file instead of stopping the run.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   CSV File  │────▶│   Parser    │────▶│    Tree     │────▶│   NDJSON    │
//! │  (ISO/UTF8) │     │  (auto-enc) │     │ (paths+merge│     │ + error CSV │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use nestcsv::path::parse_headers;
//! use nestcsv::tree::{assemble, flatten};
//! use serde_json::json;
//!
//! let headers = parse_headers(&["id", "items[0].sku", "items[1].sku"]).unwrap();
//! let record = assemble(&headers, vec!["7", "A1", "B2"]).unwrap();
//! assert_eq!(
//!     serde_json::Value::Object(record.clone()),
//!     json!({"id": "7", "items": [{"sku": "A1"}, {"sku": "B2"}]})
//! );
//! assert_eq!(flatten(&record).unwrap().len(), 3);
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`path`] - Header path parsing
//! - [`tree`] - Build, merge, flatten, prune and rewrite nested records
//! - [`parser`] - CSV reading with auto-detection
//! - [`sink`] - NDJSON and CSV writers
//! - [`transform`] - Operations, key remapping and the conversion pipeline
//! - [`validation`] - Pattern and JSON Schema gates
//! - [`profile`] - Conversion profiles
//! - [`logs`] - Progress logging

// Core modules
pub mod error;
pub mod path;
pub mod tree;

// Input / output
pub mod parser;
pub mod sink;

// Transformation
pub mod transform;

// Validation
pub mod validation;

// Configuration
pub mod profile;

// Logging
pub mod logs;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    CsvError,
    PathError,
    PipelineError,
    ProfileError,
    RecordError,
};

// =============================================================================
// Re-exports - Paths and trees
// =============================================================================

pub use path::{parse_headers, parse_path, Index, Segment, StructuredPath, DROP_KEY};

pub use tree::{
    apply_at,
    assemble,
    assemble_headers,
    build,
    flatten,
    merge,
    prune,
    MergeMode,
};

// =============================================================================
// Re-exports - CSV Parsing
// =============================================================================

pub use parser::{detect_delimiter, detect_encoding, decode_content, RowSource};

// =============================================================================
// Re-exports - Transformation
// =============================================================================

pub use transform::{
    convert_bytes,
    convert_csv,
    export_csv,
    flatten_ndjson,
    operations_description,
    remap,
    remap_ndjson,
    ConvertOptions,
    ConvertStats,
    Operation,
    RenameMap,
};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{is_valid, validate, PatternValidator, SchemaValidator, ValidationMode};

// =============================================================================
// Re-exports - Profile
// =============================================================================

pub use profile::{example_profile, ConversionProfile};
