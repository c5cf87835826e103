//! Document formats for configuration files. Formats are a tagged choice of
//! strategy rather than a trait hierarchy: each variant knows how to parse
//! text into a [`serde_json::Value`] tree and serialize one back. The tree
//! is the interchange form the field-encryption hooks operate on, whatever
//! the on-disk syntax.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("configuration could not be parsed as {0}: {1}")]
    Parse(&'static str, String),
    #[error("configuration could not be serialized as {0}: {1}")]
    Serialize(&'static str, String),
}

/// On-disk syntax of a configuration document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentFormat {
    /// Pretty-printed JSON, the default.
    #[default]
    Json,
    /// TOML. Null entries are dropped on serialize; TOML has no null, so
    /// absence stands in for it.
    Toml,
}

impl DocumentFormat {
    pub fn name(self) -> &'static str {
        match self {
            DocumentFormat::Json => "JSON",
            DocumentFormat::Toml => "TOML",
        }
    }

    /// Parses document text into a value tree.
    pub fn parse(self, text: &str) -> Result<Value, FormatError> {
        match self {
            DocumentFormat::Json => {
                serde_json::from_str(text).map_err(|e| FormatError::Parse(self.name(), e.to_string()))
            }
            DocumentFormat::Toml => {
                let table: toml::Value = toml::from_str(text)
                    .map_err(|e| FormatError::Parse(self.name(), e.to_string()))?;
                serde_json::to_value(table)
                    .map_err(|e| FormatError::Parse(self.name(), e.to_string()))
            }
        }
    }

    /// Serializes a value tree to document text.
    pub fn serialize(self, value: &Value) -> Result<String, FormatError> {
        match self {
            DocumentFormat::Json => serde_json::to_string_pretty(value)
                .map_err(|e| FormatError::Serialize(self.name(), e.to_string())),
            DocumentFormat::Toml => {
                let pruned = without_nulls(value.clone());
                toml::to_string_pretty(&pruned)
                    .map_err(|e| FormatError::Serialize(self.name(), e.to_string()))
            }
        }
    }
}

/// Recursively removes null entries; TOML cannot represent them.
fn without_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, without_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .filter(|v| !v.is_null())
                .map(without_nulls)
                .collect(),
        ),
        other => other,
    }
}
