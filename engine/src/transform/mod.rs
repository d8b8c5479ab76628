//! Record transformation.
//!
//! - Operations: value rewrites used by enrichment rules
//! - Remap: rename, drop and re-nest the keys of flat records
//! - Pipeline: CSV to NDJSON conversion and the NDJSON to flat direction

pub mod operations;
pub mod pipeline;
pub mod remap;

pub use operations::{operations_description, Operation, OperationChain};
pub use pipeline::*;
pub use remap::{remap, remap_headers, remap_tree, RenameMap};
