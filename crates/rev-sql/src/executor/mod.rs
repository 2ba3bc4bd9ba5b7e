//! Table-level query execution.
//!
//! The executor implements the row operations the dispatcher is built on:
//! Insert, Update by id, soft Delete, filtered/ordered/paginated Query,
//! and the two-table equi-Join. It operates over a [`RowStore`] with the
//! table's schema columns supplied by the caller, which resolves them from
//! the catalog under its own lock.

use std::collections::HashMap;

use chrono::Utc;

use crate::predicate::Predicate;
use crate::storage::{RowStore, StorageError, StorageResult};
use crate::types::{Column, ColumnKind};
use crate::value::{coerce, now_rfc3339, zero, Row, Value};

/// Scan options for [`Executor::query`].
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Row filter; the default matches everything.
    pub filter: Predicate,
    /// Column to order by, if any.
    pub order_by: Option<String>,
    /// True to reverse the order.
    pub descending: bool,
    /// Maximum rows to return; 0 means unlimited.
    pub limit: usize,
    /// Rows to skip from the front of the ordered result.
    pub offset: usize,
}

/// Executes table-level operations over a row store.
pub struct Executor<'a> {
    store: &'a RowStore,
}

impl<'a> Executor<'a> {
    /// Creates an executor over a row store.
    pub fn new(store: &'a RowStore) -> Self {
        Self { store }
    }

    /// Inserts a row.
    ///
    /// Every supplied column must exist in the schema and its literal must
    /// coerce to the column kind. Missing columns are back-filled with
    /// zero values. The engine-managed `id`, `deleted`, and `created_at`
    /// fields are stamped here; only Insert ever allocates an id.
    pub fn insert(
        &self,
        table: &str,
        columns: &[Column],
        fields: &[(String, String)],
    ) -> StorageResult<Row> {
        let mut row = coerce_fields(columns, fields)?;
        for column in columns {
            row.entry(column.name.clone())
                .or_insert_with(|| zero(column.kind));
        }

        let id = next_row_id();
        row.insert("id".to_string(), Value::Str(id.clone()));
        row.insert("deleted".to_string(), Value::Bool(false));
        row.insert("created_at".to_string(), Value::Str(now_rfc3339()));

        self.store.write_row(table, &id, &row, "Insert row")?;
        Ok(row)
    }

    /// Overlays a patch onto an existing row, stamping `updated_at`.
    ///
    /// The row id is preserved; patch columns are validated and coerced
    /// exactly like an insert.
    pub fn update(
        &self,
        table: &str,
        columns: &[Column],
        id: &str,
        patch: &[(String, String)],
    ) -> StorageResult<Row> {
        let mut row = self.store.read_row(table, id)?;
        for (name, value) in coerce_fields(columns, patch)? {
            row.insert(name, value);
        }
        row.insert("updated_at".to_string(), Value::Str(now_rfc3339()));

        self.store.write_row(table, id, &row, "Update row")?;
        Ok(row)
    }

    /// Soft-deletes a row: flags it deleted and stamps `deleted_at`.
    ///
    /// The row file stays on disk; scans stop returning it.
    pub fn delete(&self, table: &str, id: &str) -> StorageResult<()> {
        let mut row = self.store.read_row(table, id)?;
        row.insert("deleted".to_string(), Value::Bool(true));
        row.insert("deleted_at".to_string(), Value::Str(now_rfc3339()));

        self.store.write_row(table, id, &row, "Soft delete row")
    }

    /// Scans a table: filter, stable order, then the offset/limit slice.
    pub fn query(&self, table: &str, opts: &QueryOptions) -> StorageResult<Vec<Row>> {
        let mut rows: Vec<Row> = self
            .store
            .list_rows(table)?
            .into_iter()
            .filter(|row| opts.filter.matches(row))
            .collect();

        if let Some(order_col) = &opts.order_by {
            rows.sort_by(|a, b| {
                let av = a.get(order_col).unwrap_or(&Value::Null);
                let bv = b.get(order_col).unwrap_or(&Value::Null);
                let ord = crate::value::cmp_values(av, bv);
                if opts.descending {
                    ord.reverse()
                } else {
                    ord
                }
            });
        }

        if opts.offset > 0 {
            if opts.offset >= rows.len() {
                rows.clear();
            } else {
                rows.drain(..opts.offset);
            }
        }
        if opts.limit > 0 && opts.limit < rows.len() {
            rows.truncate(opts.limit);
        }
        Ok(rows)
    }

    /// Inner equi-join of two tables.
    ///
    /// Builds a canonical-key index on the right side, then probes it with
    /// every left row. Result keys carry `left.`/`right.` table prefixes
    /// for provenance; left rows without a match are dropped.
    pub fn join(
        &self,
        left: &str,
        right: &str,
        left_key: &str,
        right_key: &str,
    ) -> StorageResult<Vec<Row>> {
        let opts = QueryOptions::default();
        let left_rows = self.query(left, &opts)?;
        let right_rows = self.query(right, &opts)?;

        let mut index: HashMap<String, Vec<&Row>> = HashMap::new();
        for row in &right_rows {
            let key = row.get(right_key).unwrap_or(&Value::Null).canonical_key();
            index.entry(key).or_default().push(row);
        }

        let mut result = Vec::new();
        for left_row in &left_rows {
            let key = left_row
                .get(left_key)
                .unwrap_or(&Value::Null)
                .canonical_key();
            let Some(matches) = index.get(&key) else {
                continue;
            };
            for right_row in matches {
                let mut merged = Row::new();
                for (k, v) in left_row {
                    merged.insert(format!("{}.{}", left, k), v.clone());
                }
                for (k, v) in *right_row {
                    merged.insert(format!("{}.{}", right, k), v.clone());
                }
                result.push(merged);
            }
        }
        Ok(result)
    }
}

/// Validates field names against the schema and coerces their literals.
fn coerce_fields(columns: &[Column], fields: &[(String, String)]) -> StorageResult<Row> {
    let kinds: HashMap<&str, ColumnKind> = columns
        .iter()
        .map(|c| (c.name.as_str(), c.kind))
        .collect();

    let mut row = Row::new();
    for (name, raw) in fields {
        let kind = *kinds
            .get(name.as_str())
            .ok_or_else(|| StorageError::UnknownColumn(name.clone()))?;
        let value = coerce(raw, kind).map_err(|source| StorageError::InvalidLiteral {
            column: name.clone(),
            source,
        })?;
        row.insert(name.clone(), value);
    }
    Ok(row)
}

/// Allocates a row id from the wall-clock nanosecond counter.
fn next_row_id() -> String {
    Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_default()
        .to_string()
}
