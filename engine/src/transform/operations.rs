//! Value operations used by enrichment rules.
//!
//! An enrichment rule pairs a path (usually with `[*]`) with a list of
//! operations; each addressed value is run through the list in order.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{4}").expect("valid year regex"));

/// All available value operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    /// Remove leading and trailing whitespace
    Trim,

    /// Convert to uppercase
    Uppercase,

    /// Convert to lowercase
    Lowercase,

    /// Replace every match of `pattern` with `value`
    Replace {
        pattern: String,
        #[serde(default)]
        value: String,
    },

    /// Pad string at start to reach target length
    PadStart {
        length: usize,
        #[serde(default = "default_pad_char")]
        char: String,
    },

    /// Pad string at end to reach target length
    PadEnd {
        length: usize,
        #[serde(default = "default_pad_char")]
        char: String,
    },

    /// First run of four digits as a number, null when there is none
    ExtractYear,

    /// Ensure string starts with given prefix
    EnsurePrefix {
        value: String,
    },

    /// Ensure string ends with given suffix
    EnsureSuffix {
        value: String,
    },

    /// Look the text up in `mapping`
    Map {
        mapping: HashMap<String, String>,
        #[serde(default)]
        case_insensitive: bool,
        /// Result when nothing matches; absent keeps the value
        #[serde(default)]
        default_unmapped: Option<String>,
    },

    /// Split into a list of trimmed strings
    Split {
        #[serde(default = "default_split_separator")]
        separator: String,
    },

    /// True when the trimmed text is one of `true_values`, ignoring case
    ToBoolean {
        #[serde(default = "default_true_values")]
        true_values: Vec<String>,
    },

    /// Convert to number (integer, or float when the text has a decimal point)
    ToNumber,

    /// Take a character range
    Substring {
        start: usize,
        #[serde(default)]
        length: Option<usize>,
    },

    Alphanumeric,

    DigitsOnly,

    /// Replace the value, whatever its type
    Constant {
        value: Value,
    },
}

fn default_pad_char() -> String {
    "0".to_string()
}

fn default_split_separator() -> String {
    ",".to_string()
}

fn default_true_values() -> Vec<String> {
    vec![
        "true".to_string(),
        "1".to_string(),
        "yes".to_string(),
        "y".to_string(),
    ]
}

impl Operation {
    /// Apply this operation to a value.
    ///
    /// `replace` compiles its pattern on every call and leaves the value
    /// alone when the pattern is invalid; [`OperationChain`] compiles once
    /// and reports bad patterns.
    pub fn apply(&self, value: &Value) -> Value {
        match self {
            Operation::Trim => map_string(value, |s| s.trim().to_string()),
            Operation::Uppercase => map_string(value, |s| s.to_uppercase()),
            Operation::Lowercase => map_string(value, |s| s.to_lowercase()),
            Operation::Replace { pattern, value: replacement } => match Regex::new(pattern) {
                Ok(re) => replace_all(value, &re, replacement),
                Err(_) => value.clone(),
            },
            Operation::PadStart { length, char } => map_string(value, |s| pad(s, *length, char, true)),
            Operation::PadEnd { length, char } => map_string(value, |s| pad(s, *length, char, false)),
            Operation::ExtractYear => self.apply_extract_year(value),
            Operation::EnsurePrefix { value: prefix } => map_string(value, |s| {
                if s.starts_with(prefix.as_str()) {
                    s.to_string()
                } else {
                    format!("{}{}", prefix, s)
                }
            }),
            Operation::EnsureSuffix { value: suffix } => map_string(value, |s| {
                if s.ends_with(suffix.as_str()) {
                    s.to_string()
                } else {
                    format!("{}{}", s, suffix)
                }
            }),
            Operation::Map { mapping, case_insensitive, default_unmapped } => {
                self.apply_map(value, mapping, *case_insensitive, default_unmapped.as_deref())
            }
            Operation::Split { separator } => self.apply_split(value, separator),
            Operation::ToBoolean { true_values } => self.apply_to_boolean(value, true_values),
            Operation::ToNumber => self.apply_to_number(value),
            Operation::Substring { start, length } => map_string(value, |s| {
                let chars: Vec<char> = s.chars().collect();
                let end = length.map(|l| start.saturating_add(l)).unwrap_or(chars.len()).min(chars.len());
                chars.get(*start..end).map(|c| c.iter().collect()).unwrap_or_default()
            }),
            Operation::Alphanumeric => {
                map_string(value, |s| s.chars().filter(|c| c.is_alphanumeric()).collect())
            }
            Operation::DigitsOnly => {
                map_string(value, |s| s.chars().filter(|c| c.is_ascii_digit()).collect())
            }
            Operation::Constant { value: constant } => constant.clone(),
        }
    }

    fn as_string(value: &Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    fn apply_extract_year(&self, value: &Value) -> Value {
        Self::as_string(value)
            .and_then(|s| YEAR_RE.find(&s).and_then(|m| m.as_str().parse::<i64>().ok()))
            .map(|n| Value::Number(n.into()))
            .unwrap_or(Value::Null)
    }

    fn apply_map(
        &self,
        value: &Value,
        mapping: &HashMap<String, String>,
        case_insensitive: bool,
        default_unmapped: Option<&str>,
    ) -> Value {
        let Some(s) = Self::as_string(value) else {
            return value.clone();
        };

        let found = if case_insensitive {
            let key = s.to_lowercase();
            mapping.iter().find(|(k, _)| k.to_lowercase() == key).map(|(_, v)| v)
        } else {
            mapping.get(&s)
        };

        match (found, default_unmapped) {
            (Some(v), _) => Value::String(v.clone()),
            (None, Some(d)) => Value::String(d.to_string()),
            (None, None) => value.clone(),
        }
    }

    fn apply_split(&self, value: &Value, separator: &str) -> Value {
        Self::as_string(value)
            .map(|s| {
                let parts: Vec<Value> = s
                    .split(separator)
                    .map(|p| Value::String(p.trim().to_string()))
                    .collect();
                Value::Array(parts)
            })
            .unwrap_or_else(|| value.clone())
    }

    fn apply_to_boolean(&self, value: &Value, true_values: &[String]) -> Value {
        match value {
            Value::Bool(b) => Value::Bool(*b),
            _ => Self::as_string(value)
                .map(|s| {
                    let lower = s.trim().to_lowercase();
                    Value::Bool(true_values.iter().any(|tv| tv.to_lowercase() == lower))
                })
                .unwrap_or(Value::Bool(false)),
        }
    }

    fn apply_to_number(&self, value: &Value) -> Value {
        match value {
            Value::Number(_) => value.clone(),
            _ => Self::as_string(value)
                .and_then(|s| {
                    let s = s.trim();
                    if let Ok(n) = s.parse::<i64>() {
                        return Some(Value::Number(n.into()));
                    }
                    s.parse::<f64>()
                        .ok()
                        .and_then(serde_json::Number::from_f64)
                        .map(Value::Number)
                })
                .unwrap_or(Value::Null),
        }
    }
}

/// A list of operations with every `replace` pattern compiled.
#[derive(Debug, Clone)]
pub struct OperationChain {
    steps: Vec<Step>,
}

#[derive(Debug, Clone)]
enum Step {
    Replace { re: Regex, value: String },
    Plain(Operation),
}

impl OperationChain {
    /// Compile `operations`; fails on the first invalid `replace` pattern.
    pub fn compile(operations: &[Operation]) -> Result<Self, regex::Error> {
        let steps = operations
            .iter()
            .map(|op| match op {
                Operation::Replace { pattern, value } => Ok(Step::Replace {
                    re: Regex::new(pattern)?,
                    value: value.clone(),
                }),
                other => Ok(Step::Plain(other.clone())),
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(Self { steps })
    }

    /// Run the operations left to right.
    pub fn apply(&self, value: &Value) -> Value {
        self.steps.iter().fold(value.clone(), |current, step| match step {
            Step::Replace { re, value } => replace_all(&current, re, value),
            Step::Plain(op) => op.apply(&current),
        })
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

fn replace_all(value: &Value, re: &Regex, replacement: &str) -> Value {
    map_string(value, |s| re.replace_all(s, replacement).into_owned())
}

fn map_string<F>(value: &Value, f: F) -> Value
where
    F: FnOnce(&str) -> String,
{
    match Operation::as_string(value) {
        Some(s) => Value::String(f(&s)),
        None => value.clone(),
    }
}

fn pad(s: &str, length: usize, pad_char: &str, at_start: bool) -> String {
    let current = s.chars().count();
    if current >= length {
        return s.to_string();
    }
    let fill = pad_char.chars().next().unwrap_or('0');
    let padding: String = std::iter::repeat(fill).take(length - current).collect();
    if at_start {
        format!("{}{}", padding, s)
    } else {
        format!("{}{}", s, padding)
    }
}

/// Get a description of all available operations
pub fn operations_description() -> String {
    r#"Available operations:

| Operation | Description | Parameters |
|-----------|-------------|------------|
| trim | Remove leading/trailing whitespace | - |
| uppercase | Convert to uppercase | - |
| lowercase | Convert to lowercase | - |
| replace | Regex pattern replacement | pattern: regex, value: replacement |
| pad_start | Pad string at start | length: target length, char: pad character (default "0") |
| pad_end | Pad string at end | length: target length, char: pad character (default "0") |
| extract_year | Extract 4-digit year from date | - |
| ensure_prefix | Add prefix if not present | value: prefix string |
| ensure_suffix | Add suffix if not present | value: suffix string |
| map | Map values using lookup table | mapping: {source: target}, case_insensitive: bool, default_unmapped: string |
| split | Split into array | separator: split string (default ",") |
| to_boolean | Convert to boolean | true_values: list of truthy strings |
| to_number | Convert to integer or float | - |
| substring | Extract substring | start: start index, length: optional length |
| alphanumeric | Keep only alphanumeric chars | - |
| digits_only | Keep only digits | - |
| constant | Replace with a fixed value | value: any JSON value |

Example enrichment rule in a profile:
{
  "path": "items[*].sku",
  "operations": [
    {"type": "trim"},
    {"type": "replace", "pattern": "[-. ]", "value": ""},
    {"type": "uppercase"}
  ]
}"#
    .to_string()
}
