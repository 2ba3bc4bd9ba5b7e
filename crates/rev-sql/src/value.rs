//! Runtime row values.
//!
//! Row fields are heterogeneously typed at rest but typed per column by the
//! schema. `Value` is the tagged runtime representation; text is coerced
//! into it at the storage boundary and it is compared either natively
//! (ORDER BY) or through its textual rendering (WHERE).

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

use crate::types::ColumnKind;

/// A row: a mapping from column name to value.
///
/// `BTreeMap` keeps key order deterministic, so row files and query output
/// always serialize with sorted keys.
pub type Row = BTreeMap<String, Value>;

/// A dynamically typed field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent / null.
    Null,
    /// Signed integer.
    Int(i64),
    /// Double-precision float.
    Float(f64),
    /// Boolean.
    Bool(bool),
    /// String.
    Str(String),
    /// Wall-clock instant.
    Time(DateTime<Utc>),
}

/// Failure to coerce a textual literal into a typed value.
#[derive(Debug, Clone, Error)]
#[error("cannot parse {text:?} as {kind}")]
pub struct CoerceError {
    /// The literal that failed to parse.
    pub text: String,
    /// The kind it was coerced toward.
    pub kind: ColumnKind,
}

/// Coerces a textual literal to a typed value per column kind.
pub fn coerce(text: &str, kind: ColumnKind) -> Result<Value, CoerceError> {
    let fail = || CoerceError {
        text: text.to_string(),
        kind,
    };
    match kind {
        ColumnKind::Int => text.parse::<i64>().map(Value::Int).map_err(|_| fail()),
        ColumnKind::Float => text.parse::<f64>().map(Value::Float).map_err(|_| fail()),
        ColumnKind::Bool => match text {
            "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(Value::Bool(true)),
            "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(Value::Bool(false)),
            _ => Err(fail()),
        },
        ColumnKind::Timestamp => DateTime::parse_from_rfc3339(text)
            .map(|t| Value::Time(t.with_timezone(&Utc)))
            .map_err(|_| fail()),
        ColumnKind::String => Ok(Value::Str(text.to_string())),
    }
}

/// Returns the zero value for a column kind.
///
/// Used to back-fill columns omitted from an INSERT and rows predating an
/// ALTER TABLE ADD COLUMN.
pub fn zero(kind: ColumnKind) -> Value {
    match kind {
        ColumnKind::Int => Value::Int(0),
        ColumnKind::Float => Value::Float(0.0),
        ColumnKind::Bool => Value::Bool(false),
        ColumnKind::String => Value::Str(String::new()),
        ColumnKind::Timestamp => Value::Time(DateTime::UNIX_EPOCH),
    }
}

/// Total order over values, used by ORDER BY.
///
/// Nulls sort first. Numeric kinds compare numerically with int/float
/// mixing. Unrelated mixed kinds fall back to comparing textual renderings
/// so the order stays total.
pub fn cmp_values(a: &Value, b: &Value) -> Ordering {
    use Value::*;
    match (a, b) {
        (Null, Null) => Ordering::Equal,
        (Null, _) => Ordering::Less,
        (_, Null) => Ordering::Greater,
        (Int(x), Int(y)) => x.cmp(y),
        (Int(x), Float(y)) => cmp_f64(*x as f64, *y),
        (Float(x), Int(y)) => cmp_f64(*x, *y as f64),
        (Float(x), Float(y)) => cmp_f64(*x, *y),
        (Bool(x), Bool(y)) => x.cmp(y),
        (Time(x), Time(y)) => x.cmp(y),
        (Str(x), Str(y)) => x.cmp(y),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

fn cmp_f64(x: f64, y: f64) -> Ordering {
    x.partial_cmp(&y).unwrap_or(Ordering::Equal)
}

impl Value {
    /// Renders the value in the canonical join-key form.
    ///
    /// Whole-number floats collapse to their integer rendering so a float
    /// `100.0` buckets with an integer `100`; everything else uses the
    /// default textual form.
    pub fn canonical_key(&self) -> String {
        match self {
            Value::Float(f) if f.is_finite() && f.fract() == 0.0 => (*f as i64).to_string(),
            other => other.to_string(),
        }
    }

    /// Converts the value to its JSON representation.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Value::from(*f),
            Value::Bool(b) => serde_json::Value::from(*b),
            Value::Str(s) => serde_json::Value::from(s.clone()),
            Value::Time(t) => {
                serde_json::Value::from(t.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
        }
    }

    /// Converts a JSON value read from disk back into a `Value`.
    ///
    /// Integral JSON numbers come back as `Int`, everything else numeric as
    /// `Float`. Timestamps round-trip as strings; they were formatted at
    /// write time and are only compared textually afterwards.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(0.0)),
            },
            serde_json::Value::String(s) => Value::Str(s.clone()),
            other => Value::Str(other.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Str(s) => f.write_str(s),
            Value::Time(t) => f.write_str(&t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        }
    }
}

/// Converts a row to a JSON object with sorted keys.
pub fn row_to_json(row: &Row) -> serde_json::Map<String, serde_json::Value> {
    row.iter().map(|(k, v)| (k.clone(), v.to_json())).collect()
}

/// Converts a parsed JSON object into a row.
///
/// Returns `None` when the JSON value is not an object.
pub fn row_from_json(json: &serde_json::Value) -> Option<Row> {
    json.as_object().map(|obj| {
        obj.iter()
            .map(|(k, v)| (k.clone(), Value::from_json(v)))
            .collect()
    })
}

/// Formats the current instant as an RFC 3339 string at second precision.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}
