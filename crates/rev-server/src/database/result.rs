//! Statement outputs.
//!
//! DDL and DML that yields no rows returns the `{"status":"ok"}` object;
//! SELECT and JOIN return a sequence of row objects. A batch serializes as
//! a JSON array of per-statement outputs — always an array, even for a
//! single statement, because the client drivers unwrap the outer sequence
//! unconditionally.

use serde_json::{json, Map, Value};

/// Output of a single statement.
#[derive(Debug, Clone, PartialEq)]
pub enum StatementOutput {
    /// DDL/DML acknowledgement.
    Status,
    /// SELECT/JOIN result rows; empty when nothing matched.
    Rows(Vec<Map<String, Value>>),
}

impl StatementOutput {
    /// Converts the output to its JSON wire form.
    pub fn to_json(&self) -> Value {
        match self {
            StatementOutput::Status => json!({"status": "ok"}),
            StatementOutput::Rows(rows) => {
                Value::Array(rows.iter().cloned().map(Value::Object).collect())
            }
        }
    }

    /// Returns the rows when this is a query output.
    pub fn as_rows(&self) -> Option<&[Map<String, Value>]> {
        match self {
            StatementOutput::Rows(rows) => Some(rows),
            StatementOutput::Status => None,
        }
    }
}

/// Serializes a batch of outputs as the response array.
pub fn batch_to_json(outputs: &[StatementOutput]) -> Value {
    Value::Array(outputs.iter().map(StatementOutput::to_json).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_shape() {
        assert_eq!(
            StatementOutput::Status.to_json(),
            json!({"status": "ok"})
        );
    }

    #[test]
    fn test_batch_is_always_an_array() {
        let batch = batch_to_json(&[StatementOutput::Status]);
        assert_eq!(batch, json!([{"status": "ok"}]));

        let empty_rows = StatementOutput::Rows(Vec::new());
        let batch = batch_to_json(&[StatementOutput::Status, empty_rows]);
        assert_eq!(batch, json!([{"status": "ok"}, []]));
    }
}
