//! Per-table row storage.
//!
//! Each database is a directory; each table is a sub-directory holding a
//! `_schema.json` file and one pretty-printed JSON file per row, keyed by
//! row id:
//!
//! ```text
//! <db>/<table>/_schema.json
//! <db>/<table>/<id>.json
//! ```
//!
//! Underscore-prefixed files are reserved and never scanned as rows. Row
//! writes commit a revision in the injected history store; DDL-level
//! commits are issued by the caller via [`RowStore::commit`] so catalog
//! updates can be sequenced between the write and the revision.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::history::History;
use crate::types::{Column, ColumnKind};
use crate::value::{row_from_json, row_to_json, Row, Value};

/// Reserved schema file name inside every table directory.
pub const SCHEMA_FILE: &str = "_schema.json";

/// Row storage rooted at one database directory.
pub struct RowStore {
    root: PathBuf,
    history: Arc<dyn History>,
}

impl RowStore {
    /// Creates a row store over a database directory.
    pub fn new(root: impl Into<PathBuf>, history: Arc<dyn History>) -> Self {
        Self {
            root: root.into(),
            history,
        }
    }

    /// Returns the database root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the directory of a table.
    pub fn table_dir(&self, table: &str) -> PathBuf {
        self.root.join(table)
    }

    /// Returns true when the table directory exists.
    pub fn table_exists(&self, table: &str) -> bool {
        self.table_dir(table).is_dir()
    }

    /// Records a revision at the database root.
    pub fn commit(&self, message: &str) -> StorageResult<()> {
        self.history.commit(&self.root, message)?;
        Ok(())
    }

    // ─── Tables ──────────────────────────────────────────────────────────

    /// Creates a table directory and writes its schema file.
    ///
    /// Rejects empty column names, unknown kinds, and duplicate names.
    /// Returns the validated, typed columns; the caller records them in
    /// the catalog and commits the revision.
    pub fn create_table(
        &self,
        table: &str,
        specs: &[(String, String)],
    ) -> StorageResult<Vec<Column>> {
        let mut columns = Vec::with_capacity(specs.len());
        for (index, (name, kind)) in specs.iter().enumerate() {
            if name.is_empty() {
                return Err(StorageError::EmptyColumnName(index));
            }
            let kind = ColumnKind::parse(kind)
                .ok_or_else(|| StorageError::UnsupportedType(kind.clone()))?;
            if columns.iter().any(|c: &Column| c.name == *name) {
                return Err(StorageError::DuplicateColumn(name.clone()));
            }
            columns.push(Column::new(name.clone(), kind));
        }

        fs::create_dir_all(self.table_dir(table))?;
        self.write_schema(table, &columns)?;
        Ok(columns)
    }

    /// Removes a table directory. Missing tables are not an error.
    pub fn drop_table(&self, table: &str) -> StorageResult<()> {
        match fs::remove_dir_all(self.table_dir(table)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Deletes every row file of a table, leaving `_`-prefixed files.
    ///
    /// A missing table directory is treated as already empty.
    pub fn truncate_table(&self, table: &str) -> StorageResult<()> {
        for path in self.row_files(table)? {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    // ─── Schema ──────────────────────────────────────────────────────────

    /// Reads the schema of a table.
    pub fn read_schema(&self, table: &str) -> StorageResult<Vec<Column>> {
        let path = self.table_dir(table).join(SCHEMA_FILE);
        let data = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::UnknownTable(table.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&data).map_err(|e| StorageError::EncodingError(e.to_string()))
    }

    /// Rewrites the schema file of a table.
    pub fn write_schema(&self, table: &str, columns: &[Column]) -> StorageResult<()> {
        let data = serde_json::to_string_pretty(columns)
            .map_err(|e| StorageError::EncodingError(e.to_string()))?;
        fs::write(self.table_dir(table).join(SCHEMA_FILE), data)?;
        Ok(())
    }

    // ─── Rows ────────────────────────────────────────────────────────────

    fn row_path(&self, table: &str, id: &str) -> PathBuf {
        self.table_dir(table).join(format!("{}.json", id))
    }

    /// Reads one row by id.
    pub fn read_row(&self, table: &str, id: &str) -> StorageResult<Row> {
        let data = match fs::read_to_string(self.row_path(table, id)) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::RowNotFound {
                    table: table.to_string(),
                    id: id.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };
        let json: serde_json::Value =
            serde_json::from_str(&data).map_err(|e| StorageError::EncodingError(e.to_string()))?;
        row_from_json(&json)
            .ok_or_else(|| StorageError::EncodingError(format!("row {} is not an object", id)))
    }

    /// Writes a row file and commits a revision describing it.
    ///
    /// The commit message carries the table, the row id, and a
    /// `- key: value` preview of every field.
    pub fn write_row(&self, table: &str, id: &str, row: &Row, action: &str) -> StorageResult<()> {
        let dir = self.table_dir(table);
        fs::create_dir_all(&dir)?;

        let json = serde_json::Value::Object(row_to_json(row));
        let data = serde_json::to_string_pretty(&json)
            .map_err(|e| StorageError::EncodingError(e.to_string()))?;
        fs::write(self.row_path(table, id), data)?;

        let mut preview = String::new();
        for (key, value) in row {
            preview.push_str(&format!("- {}: {}\n", key, value));
        }
        let message = format!(
            "{}\n\nTable: {}\nRow ID: {}\n\nData:\n{}",
            action, table, id, preview
        );
        self.history.commit(&dir, &message)?;
        Ok(())
    }

    /// Scans every live row of a table, in row-file name order.
    ///
    /// Files that are not `<id>.json`, `_`-prefixed files, and files that
    /// fail to parse are skipped; rows flagged deleted are filtered out.
    pub fn list_rows(&self, table: &str) -> StorageResult<Vec<Row>> {
        if !self.table_exists(table) {
            return Err(StorageError::UnknownTable(table.to_string()));
        }
        let mut rows = Vec::new();
        for path in self.row_files(table)? {
            let Ok(data) = fs::read_to_string(&path) else {
                continue;
            };
            let Ok(json) = serde_json::from_str::<serde_json::Value>(&data) else {
                tracing::debug!(path = %path.display(), "skipping unparseable row file");
                continue;
            };
            let Some(row) = row_from_json(&json) else {
                tracing::debug!(path = %path.display(), "skipping non-object row file");
                continue;
            };
            if row.get("deleted") == Some(&Value::Bool(true)) {
                continue;
            }
            rows.push(row);
        }
        Ok(rows)
    }

    /// Rewrites every row file missing `column`, filling in its zero
    /// value. Soft-deleted rows are rewritten too.
    pub fn backfill_column(&self, table: &str, column: &Column) -> StorageResult<()> {
        for path in self.row_files(table)? {
            let Ok(data) = fs::read_to_string(&path) else {
                continue;
            };
            let Ok(json) = serde_json::from_str::<serde_json::Value>(&data) else {
                continue;
            };
            let Some(mut row) = row_from_json(&json) else {
                continue;
            };
            if row.contains_key(&column.name) {
                continue;
            }
            row.insert(column.name.clone(), crate::value::zero(column.kind));
            let json = serde_json::Value::Object(row_to_json(&row));
            let data = serde_json::to_string_pretty(&json)
                .map_err(|e| StorageError::EncodingError(e.to_string()))?;
            fs::write(&path, data)?;
        }
        Ok(())
    }

    /// Lists row-file paths of a table, sorted by file name. A missing
    /// table directory yields an empty list for callers that treat it as
    /// already empty.
    fn row_files(&self, table: &str) -> StorageResult<Vec<PathBuf>> {
        let dir = self.table_dir(table);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut files = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.ends_with(".json") && !name.starts_with('_') {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::history::MemoryHistory;
    use tempfile::TempDir;

    fn store() -> (TempDir, RowStore, Arc<MemoryHistory>) {
        let dir = TempDir::new().unwrap();
        let history = Arc::new(MemoryHistory::new());
        let store = RowStore::new(dir.path().join("db"), history.clone());
        fs::create_dir_all(store.root()).unwrap();
        (dir, store, history)
    }

    fn specs(cols: &[(&str, &str)]) -> Vec<(String, String)> {
        cols.iter()
            .map(|(n, k)| (n.to_string(), k.to_string()))
            .collect()
    }

    fn row(pairs: &[(&str, Value)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_create_table_writes_schema() {
        let (_dir, store, _) = store();
        let columns = store
            .create_table("users", &specs(&[("name", "STRING"), ("age", "int")]))
            .unwrap();
        assert_eq!(columns[1].kind, ColumnKind::Int);

        let read_back = store.read_schema("users").unwrap();
        assert_eq!(read_back, columns);
    }

    #[test]
    fn test_create_table_validation() {
        let (_dir, store, _) = store();
        assert!(matches!(
            store.create_table("t", &specs(&[("x", "BLOB")])),
            Err(StorageError::UnsupportedType(_))
        ));
        assert!(matches!(
            store.create_table("t", &specs(&[("x", "INT"), ("x", "INT")])),
            Err(StorageError::DuplicateColumn(_))
        ));
        assert!(matches!(
            store.create_table("t", &specs(&[("", "INT")])),
            Err(StorageError::EmptyColumnName(0))
        ));
    }

    #[test]
    fn test_read_schema_unknown_table() {
        let (_dir, store, _) = store();
        assert!(matches!(
            store.read_schema("ghost"),
            Err(StorageError::UnknownTable(_))
        ));
    }

    #[test]
    fn test_write_and_read_row() {
        let (_dir, store, history) = store();
        store.create_table("t", &specs(&[("x", "INT")])).unwrap();

        let r = row(&[("id", Value::Str("1".into())), ("x", Value::Int(42))]);
        store.write_row("t", "1", &r, "Insert row").unwrap();

        let back = store.read_row("t", "1").unwrap();
        assert_eq!(back, r);

        let (path, message) = history.commits().last().cloned().unwrap();
        assert!(path.ends_with("t"));
        assert!(message.starts_with("Insert row\n\nTable: t\nRow ID: 1"));
        assert!(message.contains("- x: 42"));
    }

    #[test]
    fn test_read_row_not_found() {
        let (_dir, store, _) = store();
        store.create_table("t", &specs(&[("x", "INT")])).unwrap();
        assert!(matches!(
            store.read_row("t", "404"),
            Err(StorageError::RowNotFound { .. })
        ));
    }

    #[test]
    fn test_list_rows_skips_reserved_and_corrupt_files() {
        let (_dir, store, _) = store();
        store.create_table("t", &specs(&[("x", "INT")])).unwrap();
        store
            .write_row("t", "1", &row(&[("x", Value::Int(1))]), "Insert row")
            .unwrap();

        let dir = store.table_dir("t");
        fs::write(dir.join("_notes.json"), "{}").unwrap();
        fs::write(dir.join("broken.json"), "{ not json").unwrap();
        fs::write(dir.join("readme.txt"), "hi").unwrap();

        let rows = store.list_rows("t").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["x"], Value::Int(1));
    }

    #[test]
    fn test_list_rows_filters_soft_deleted() {
        let (_dir, store, _) = store();
        store.create_table("t", &specs(&[("x", "INT")])).unwrap();
        store
            .write_row(
                "t",
                "1",
                &row(&[("x", Value::Int(1)), ("deleted", Value::Bool(false))]),
                "Insert row",
            )
            .unwrap();
        store
            .write_row(
                "t",
                "2",
                &row(&[("x", Value::Int(2)), ("deleted", Value::Bool(true))]),
                "Soft delete row",
            )
            .unwrap();

        let rows = store.list_rows("t").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["x"], Value::Int(1));
        // The deleted row file is still on disk.
        assert!(store.table_dir("t").join("2.json").exists());
    }

    #[test]
    fn test_list_rows_unknown_table() {
        let (_dir, store, _) = store();
        assert!(matches!(
            store.list_rows("ghost"),
            Err(StorageError::UnknownTable(_))
        ));
    }

    #[test]
    fn test_truncate_keeps_schema() {
        let (_dir, store, _) = store();
        store.create_table("t", &specs(&[("x", "INT")])).unwrap();
        store
            .write_row("t", "1", &row(&[("x", Value::Int(1))]), "Insert row")
            .unwrap();

        store.truncate_table("t").unwrap();
        assert!(store.table_dir("t").join(SCHEMA_FILE).exists());
        assert!(store.list_rows("t").unwrap().is_empty());
    }

    #[test]
    fn test_drop_table_missing_is_ok() {
        let (_dir, store, _) = store();
        store.drop_table("nothing_here").unwrap();
    }

    #[test]
    fn test_backfill_column() {
        let (_dir, store, _) = store();
        store.create_table("t", &specs(&[("x", "INT")])).unwrap();
        store
            .write_row("t", "1", &row(&[("x", Value::Int(1))]), "Insert row")
            .unwrap();
        store
            .write_row(
                "t",
                "2",
                &row(&[("x", Value::Int(2)), ("deleted", Value::Bool(true))]),
                "Soft delete row",
            )
            .unwrap();

        store
            .backfill_column("t", &Column::new("nick", ColumnKind::String))
            .unwrap();

        let live = store.read_row("t", "1").unwrap();
        assert_eq!(live["nick"], Value::Str(String::new()));
        // Deleted rows are backfilled too.
        let dead = store.read_row("t", "2").unwrap();
        assert_eq!(dead["nick"], Value::Str(String::new()));
    }
}
