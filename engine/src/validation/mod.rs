//! Accept/reject gates for assembled records.
//!
//! Two kinds of gate are available and can be combined:
//!
//! - [`PatternValidator`]: `{ field: regex }` checks on top-level fields
//! - [`SchemaValidator`]: a JSON Schema (Draft 7) the whole record must satisfy
//!
//! A rejected record is a normal outcome, not an error: the pipeline routes the
//! raw row to the error output and carries on.
//!
//! # Example
//!
//! ```rust
//! use serde_json::json;
//! use nestcsv::validation::{FieldPattern, PatternValidator, ValidationMode};
//!
//! let validator = PatternValidator::new(
//!     &[FieldPattern::new("id", r"\d+")],
//!     ValidationMode::All,
//! ).unwrap();
//!
//! assert!(validator.is_valid(&json!({"id": "42"})));
//! assert!(!validator.is_valid(&json!({"id": "x42"})));
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ProfileError, ProfileResult};

/// How many declared patterns take part in the verdict.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// Every declared field must match.
    #[default]
    All,
    /// Only the first declared field decides.
    First,
}

/// One `field -> regex` rule as written in a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldPattern {
    /// Top-level field of the assembled record.
    pub field: String,
    /// Regex matched at the start of the field's text.
    pub pattern: String,
}

impl FieldPattern {
    pub fn new(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            pattern: pattern.into(),
        }
    }
}

/// Compiled pattern rules.
#[derive(Debug, Clone)]
pub struct PatternValidator {
    rules: Vec<(String, Regex)>,
    mode: ValidationMode,
}

impl PatternValidator {
    /// Compile the rules. Patterns are anchored at the start of the value,
    /// so `\d+` accepts `"12ab"` but not `"ab12"`.
    pub fn new(patterns: &[FieldPattern], mode: ValidationMode) -> ProfileResult<Self> {
        let rules = patterns
            .iter()
            .map(|p| {
                Regex::new(&format!("^(?:{})", p.pattern))
                    .map(|re| (p.field.clone(), re))
                    .map_err(|e| ProfileError::InvalidPattern {
                        field: p.field.clone(),
                        message: e.to_string(),
                    })
            })
            .collect::<ProfileResult<Vec<_>>>()?;

        Ok(Self { rules, mode })
    }

    /// A validator that accepts everything.
    pub fn accept_all() -> Self {
        Self {
            rules: Vec::new(),
            mode: ValidationMode::All,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Check a record, listing every failed rule.
    pub fn validate(&self, record: &Value) -> Result<(), Vec<String>> {
        let rules = match self.mode {
            ValidationMode::All => &self.rules[..],
            ValidationMode::First => &self.rules[..self.rules.len().min(1)],
        };

        let errors: Vec<String> = rules
            .iter()
            .filter_map(|(field, re)| {
                let text = field_text(record.get(field));
                if re.is_match(&text) {
                    None
                } else {
                    Some(format!(
                        "Field '{}' value '{}' does not match '{}'",
                        field,
                        text,
                        re.as_str()
                    ))
                }
            })
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn is_valid(&self, record: &Value) -> bool {
        self.validate(record).is_ok()
    }
}

/// Text a pattern is matched against: strings as-is, missing or null as `""`,
/// anything else as compact JSON.
fn field_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// A compiled JSON Schema gate.
pub struct SchemaValidator {
    validator: jsonschema::Validator,
}

impl SchemaValidator {
    pub fn new(schema: &Value) -> ProfileResult<Self> {
        let validator = jsonschema::draft7::new(schema)
            .map_err(|e| ProfileError::InvalidSchema(e.to_string()))?;
        Ok(Self { validator })
    }

    pub fn validate(&self, data: &Value) -> Result<(), Vec<String>> {
        let errors: Vec<String> = self
            .validator
            .iter_errors(data)
            .map(|e| e.to_string())
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn is_valid(&self, data: &Value) -> bool {
        self.validator.is_valid(data)
    }
}

/// Validate an object against a schema in one call.
///
/// # Example
/// ```
/// use serde_json::json;
/// use nestcsv::validation::validate;
///
/// let schema = json!({
///     "type": "object",
///     "required": ["name"],
///     "properties": {
///         "name": { "type": "string" }
///     }
/// });
///
/// assert!(validate(&schema, &json!({ "name": "test" })).is_ok());
/// assert!(validate(&schema, &json!({ "age": 42 })).is_err());
/// ```
pub fn validate(schema: &Value, data: &Value) -> Result<(), Vec<String>> {
    let validator = SchemaValidator::new(schema).map_err(|e| vec![e.to_string()])?;
    validator.validate(data)
}

/// Boolean form of [`validate`].
pub fn is_valid(schema: &Value, data: &Value) -> bool {
    jsonschema::draft7::is_valid(schema, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn patterns() -> Vec<FieldPattern> {
        vec![
            FieldPattern::new("id", r"\d+$"),
            FieldPattern::new("country", "[A-Z]{2}$"),
        ]
    }

    #[test]
    fn test_all_mode_checks_every_field() {
        let validator = PatternValidator::new(&patterns(), ValidationMode::All).unwrap();

        assert!(validator.is_valid(&json!({"id": "12", "country": "FR"})));

        let errors = validator
            .validate(&json!({"id": "12", "country": "France"}))
            .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("country"));
    }

    #[test]
    fn test_first_mode_only_checks_first_field() {
        let validator = PatternValidator::new(&patterns(), ValidationMode::First).unwrap();

        assert!(validator.is_valid(&json!({"id": "12", "country": "France"})));
        assert!(!validator.is_valid(&json!({"id": "x", "country": "FR"})));
    }

    #[test]
    fn test_prefix_match() {
        let validator =
            PatternValidator::new(&[FieldPattern::new("code", "AB")], ValidationMode::All).unwrap();
        assert!(validator.is_valid(&json!({"code": "ABC"})));
        assert!(!validator.is_valid(&json!({"code": "CAB"})));
    }

    #[test]
    fn test_missing_and_nested_fields() {
        let validator =
            PatternValidator::new(&[FieldPattern::new("meta", r"\{")], ValidationMode::All).unwrap();
        assert!(validator.is_valid(&json!({"meta": {"a": 1}})));
        assert!(!validator.is_valid(&json!({"other": 1})));

        let optional =
            PatternValidator::new(&[FieldPattern::new("opt", ".*")], ValidationMode::All).unwrap();
        assert!(optional.is_valid(&json!({})));
    }

    #[test]
    fn test_no_patterns_accepts_everything() {
        assert!(PatternValidator::accept_all().is_valid(&json!({"anything": 1})));
        let empty = PatternValidator::new(&[], ValidationMode::First).unwrap();
        assert!(empty.is_empty());
        assert!(empty.is_valid(&json!({})));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = PatternValidator::new(&[FieldPattern::new("id", "(")], ValidationMode::All)
            .unwrap_err();
        assert!(matches!(err, ProfileError::InvalidPattern { ref field, .. } if field == "id"));
    }

    #[test]
    fn test_schema_validator() {
        let schema = json!({
            "type": "object",
            "required": ["id", "items"],
            "properties": {
                "id": { "type": "string" },
                "items": { "type": "array", "minItems": 1 }
            }
        });
        let validator = SchemaValidator::new(&schema).unwrap();

        assert!(validator.is_valid(&json!({"id": "1", "items": [{"n": "x"}]})));

        let errors = validator.validate(&json!({"id": "1"})).unwrap_err();
        assert!(!errors.is_empty());
    }

    #[test]
    fn test_invalid_schema() {
        let result = SchemaValidator::new(&json!({"type": 12}));
        assert!(matches!(result, Err(ProfileError::InvalidSchema(_))));
    }
}
