//! Column kinds and schema columns.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of a table column.
///
/// RevDB supports exactly five scalar kinds. Textual input is coerced per
/// kind at the storage boundary; anything else is rejected at table
/// creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnKind {
    /// Signed 64-bit integer.
    Int,
    /// Double-precision floating point.
    Float,
    /// Boolean.
    Bool,
    /// UTF-8 string.
    String,
    /// RFC 3339 wall-clock instant.
    Timestamp,
}

impl ColumnKind {
    /// Parses a kind from its textual form, case-insensitively.
    ///
    /// Returns `None` for anything outside the five recognized kinds.
    pub fn parse(text: &str) -> Option<Self> {
        match text.to_ascii_uppercase().as_str() {
            "INT" => Some(ColumnKind::Int),
            "FLOAT" => Some(ColumnKind::Float),
            "BOOL" => Some(ColumnKind::Bool),
            "STRING" => Some(ColumnKind::String),
            "TIMESTAMP" => Some(ColumnKind::Timestamp),
            _ => None,
        }
    }

    /// Returns the canonical upper-case name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnKind::Int => "INT",
            ColumnKind::Float => "FLOAT",
            ColumnKind::Bool => "BOOL",
            ColumnKind::String => "STRING",
            ColumnKind::Timestamp => "TIMESTAMP",
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A schema column: a name paired with a kind.
///
/// Serializes to the on-disk `_schema.json` shape,
/// `{"name": "...", "type": "INT"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name, case-sensitive as received.
    pub name: String,
    /// Column kind.
    #[serde(rename = "type")]
    pub kind: ColumnKind,
}

impl Column {
    /// Creates a new column.
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parse() {
        assert_eq!(ColumnKind::parse("INT"), Some(ColumnKind::Int));
        assert_eq!(ColumnKind::parse("int"), Some(ColumnKind::Int));
        assert_eq!(ColumnKind::parse("Timestamp"), Some(ColumnKind::Timestamp));
        assert_eq!(ColumnKind::parse("TEXT"), None);
        assert_eq!(ColumnKind::parse(""), None);
    }

    #[test]
    fn test_column_serde_shape() {
        let col = Column::new("age", ColumnKind::Int);
        let json = serde_json::to_string(&col).unwrap();
        assert_eq!(json, r#"{"name":"age","type":"INT"}"#);

        let parsed: Column = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, col);
    }

    #[test]
    fn test_schema_round_trip() {
        let schema = vec![
            Column::new("name", ColumnKind::String),
            Column::new("score", ColumnKind::Float),
        ];
        let json = serde_json::to_string(&schema).unwrap();
        let parsed: Vec<Column> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, schema);
    }
}
