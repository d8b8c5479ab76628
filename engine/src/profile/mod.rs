//! Conversion profiles.
//!
//! A profile is a JSON document describing how one family of CSV files is
//! turned into nested records: header overrides, renames, enrichment rules,
//! pruning and the accept/reject gates.
//!
//! ```json
//! {
//!   "version": "1.0",
//!   "rename": { "Order ID": "id", "Item 1": "items[0].sku" },
//!   "patterns": [{ "field": "id", "pattern": "\\d+" }],
//!   "enrich": [{ "path": "items[*].sku", "operations": [{ "type": "uppercase" }] }]
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;

use crate::error::{ProfileError, ProfileResult};
use crate::path::{parse_path, StructuredPath};
use crate::transform::{remap_headers, Operation, OperationChain, RenameMap};
use crate::validation::{FieldPattern, PatternValidator, SchemaValidator, ValidationMode};

/// Everything a conversion run can be configured with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionProfile {
    /// Version of the profile format
    #[serde(default = "default_version")]
    pub version: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Header paths used instead of the file's own header row
    #[serde(default)]
    pub headers: Option<Vec<String>>,

    /// Input delimiter; detected from the first line when absent
    #[serde(default)]
    pub delimiter: Option<char>,

    /// Field patterns, checked in declaration order
    #[serde(default)]
    pub patterns: Vec<FieldPattern>,

    /// How many patterns take part in the verdict
    #[serde(default)]
    pub validation: ValidationMode,

    /// Optional JSON Schema every record must satisfy
    #[serde(default)]
    pub schema: Option<Value>,

    /// Header name -> header path
    #[serde(default)]
    pub rename: RenameMap,

    /// Discard columns the rename table does not mention
    #[serde(default)]
    pub drop_unmapped: bool,

    /// Pruning of empty and sentinel values
    #[serde(default)]
    pub prune: PruneConfig,

    /// Value rewrites applied to every assembled record
    #[serde(default)]
    pub enrich: Vec<Enrichment>,
}

fn default_version() -> String {
    "1.0".to_string()
}

/// Pruning settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PruneConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Values removed in addition to falsy ones
    #[serde(default)]
    pub sentinels: Vec<Value>,
}

/// One enrichment rule: run `operations` on every value `path` addresses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrichment {
    pub path: String,
    #[serde(default)]
    pub operations: Vec<Operation>,
}

impl Default for ConversionProfile {
    fn default() -> Self {
        Self {
            version: default_version(),
            description: String::new(),
            headers: None,
            delimiter: None,
            patterns: Vec::new(),
            validation: ValidationMode::default(),
            schema: None,
            rename: RenameMap::new(),
            drop_unmapped: false,
            prune: PruneConfig::default(),
            enrich: Vec::new(),
        }
    }
}

impl ConversionProfile {
    /// Parse a profile from JSON string
    pub fn from_json(json: &str) -> ProfileResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a profile from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> ProfileResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> ProfileResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Header paths for a file whose own header row is `file_headers`.
    ///
    /// Explicit `headers` win over the file; renames and `drop_unmapped`
    /// then apply to whichever set was picked.
    pub fn resolve_headers(&self, file_headers: &[String]) -> Vec<String> {
        let base = self.headers.as_deref().unwrap_or(file_headers);
        if self.rename.is_empty() && !self.drop_unmapped {
            return base.to_vec();
        }
        remap_headers(base, &self.rename, self.drop_unmapped)
    }

    /// Rename sources that are missing from `headers`.
    pub fn missing_columns(&self, headers: &[String]) -> Vec<String> {
        let mut missing: Vec<String> = self
            .rename
            .keys()
            .filter(|col| !headers.contains(col))
            .cloned()
            .collect();
        missing.sort();
        missing
    }

    /// Compile regexes, the schema and enrichment paths.
    pub fn compile(&self) -> ProfileResult<CompiledProfile> {
        let patterns = PatternValidator::new(&self.patterns, self.validation)?;

        let schema = match &self.schema {
            Some(schema) => Some(SchemaValidator::new(schema)?),
            None => None,
        };

        let enrich = self
            .enrich
            .iter()
            .map(|rule| -> ProfileResult<_> {
                let path = parse_path(&rule.path)?;
                let chain = OperationChain::compile(&rule.operations).map_err(|e| {
                    ProfileError::InvalidPattern {
                        field: rule.path.clone(),
                        message: e.to_string(),
                    }
                })?;
                Ok((path, chain))
            })
            .collect::<ProfileResult<Vec<_>>>()?;

        let sentinels = self.prune.enabled.then(|| self.prune.sentinels.clone());

        Ok(CompiledProfile {
            patterns,
            schema,
            enrich,
            sentinels,
        })
    }
}

/// A profile with everything that can fail to compile already compiled.
pub struct CompiledProfile {
    pub patterns: PatternValidator,
    pub schema: Option<SchemaValidator>,
    pub enrich: Vec<(StructuredPath, OperationChain)>,
    /// `Some` when pruning is on.
    pub sentinels: Option<Vec<Value>>,
}

impl CompiledProfile {
    /// Accept everything, change nothing.
    pub fn passthrough() -> Self {
        Self {
            patterns: PatternValidator::accept_all(),
            schema: None,
            enrich: Vec::new(),
            sentinels: None,
        }
    }

    /// Run both gates, collecting every failure.
    pub fn validate(&self, record: &Value) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if let Err(errs) = self.patterns.validate(record) {
            errors.extend(errs);
        }
        if let Some(schema) = &self.schema {
            if let Err(errs) = schema.validate(record) {
                errors.extend(errs);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Example profile for an order export with two item column pairs.
pub fn example_profile() -> ConversionProfile {
    let rename = [
        ("Order ID", "id"),
        ("Customer", "customer.name"),
        ("Email", "customer.email"),
        ("Item 1", "items[0].sku"),
        ("Qty 1", "items[0].qty"),
        ("Item 2", "items[1].sku"),
        ("Qty 2", "items[1].qty"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    ConversionProfile {
        description: "Order export: one order per row, up to two items".to_string(),
        delimiter: Some(';'),
        patterns: vec![FieldPattern::new("id", r"\d+$")],
        rename,
        drop_unmapped: true,
        prune: PruneConfig {
            enabled: true,
            sentinels: vec![json!("N/A")],
        },
        enrich: vec![
            Enrichment {
                path: "customer.name".to_string(),
                operations: vec![Operation::Trim],
            },
            Enrichment {
                path: "items[*].sku".to_string(),
                operations: vec![Operation::Trim, Operation::Uppercase],
            },
            Enrichment {
                path: "items[*].qty".to_string(),
                operations: vec![Operation::ToNumber],
            },
        ],
        ..ConversionProfile::default()
    }
}
