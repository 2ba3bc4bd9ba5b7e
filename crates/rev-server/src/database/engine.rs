//! The RevDB engine.
//!
//! `Engine` is the single entry point consumed by the HTTP layer. It owns
//! the global root directory, the injected history store, and the two
//! pieces of cross-request state — the catalog and the session registry —
//! behind one readers–writer gate. Statement batches are split on `;`,
//! parsed against the closed grammar, and dispatched to the executor; each
//! write is mirrored as a revision in the history store.
//!
//! Lock discipline: the gate is never held across filesystem or subprocess
//! work. Writers update the in-memory maps and release before the row
//! store or the history adapter runs. A DDL statement and an INSERT to the
//! same table may therefore interleave; that race is a known limitation.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use rev_sql::executor::{Executor, QueryOptions};
use rev_sql::parser::{
    ColumnSpec, DeleteStatement, InsertStatement, JoinStatement, Parser, SelectStatement,
    Statement, UpdateStatement,
};
use rev_sql::predicate::Predicate;
use rev_sql::storage::{History, RowStore, StorageError, SCHEMA_FILE};
use rev_sql::value::row_to_json;
use rev_sql::{Column, ColumnKind, Value};

use super::error::{EngineError, EngineResult};
use super::result::StatementOutput;
use super::session::Session;

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Global root directory holding one sub-directory per database.
    pub root: PathBuf,
    /// Idle time after which the sweeper evicts a session.
    pub session_timeout: Duration,
    /// Interval between sweeper runs.
    pub sweep_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(".gitdb"),
            session_timeout: Duration::from_secs(30 * 60),
            sweep_interval: Duration::from_secs(5 * 60),
        }
    }
}

impl EngineConfig {
    /// Creates a configuration rooted at the given directory.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }
}

/// Engine statistics.
#[derive(Debug)]
pub struct EngineStats {
    /// Sessions currently registered.
    pub active_sessions: usize,
    /// Tables known to the catalog.
    pub tables: usize,
    /// Time since the engine was opened.
    pub uptime: Duration,
}

/// Catalog and session registry, guarded by a single gate.
#[derive(Default)]
struct SharedState {
    /// `(database, table)` to declared columns.
    catalog: HashMap<(String, String), Vec<Column>>,
    /// Opaque session id to session state.
    sessions: HashMap<String, Arc<Session>>,
}

/// The database engine.
pub struct Engine {
    config: EngineConfig,
    history: Arc<dyn History>,
    shared: RwLock<SharedState>,
    started_at: Instant,
}

impl Engine {
    /// Opens an engine over the configured root, creating the root
    /// directory and seeding the catalog from every `_schema.json` found
    /// beneath it.
    pub fn open(config: EngineConfig, history: Arc<dyn History>) -> EngineResult<Self> {
        fs::create_dir_all(&config.root)?;
        let engine = Self {
            config,
            history,
            shared: RwLock::new(SharedState::default()),
            started_at: Instant::now(),
        };
        engine.load_schemas()?;
        Ok(engine)
    }

    /// Returns the configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns engine statistics.
    pub fn stats(&self) -> EngineStats {
        let shared = self.shared.read();
        EngineStats {
            active_sessions: shared.sessions.len(),
            tables: shared.catalog.len(),
            uptime: self.started_at.elapsed(),
        }
    }

    /// Walks the root for schema files and rebuilds the catalog.
    fn load_schemas(&self) -> EngineResult<()> {
        let mut catalog = HashMap::new();
        for db_entry in fs::read_dir(&self.config.root)? {
            let db_entry = db_entry?;
            let db_name = db_entry.file_name().to_string_lossy().into_owned();
            if !db_entry.file_type()?.is_dir() || db_name.starts_with('.') {
                continue;
            }
            for table_entry in fs::read_dir(db_entry.path())? {
                let table_entry = table_entry?;
                if !table_entry.file_type()?.is_dir() {
                    continue;
                }
                let schema_path = table_entry.path().join(SCHEMA_FILE);
                if !schema_path.is_file() {
                    continue;
                }
                let table = table_entry.file_name().to_string_lossy().into_owned();
                let columns = fs::read_to_string(&schema_path)
                    .ok()
                    .and_then(|data| serde_json::from_str::<Vec<Column>>(&data).ok());
                match columns {
                    Some(columns) => {
                        catalog.insert((db_name.clone(), table), columns);
                    }
                    None => {
                        tracing::warn!(path = %schema_path.display(), "skipping unreadable schema file")
                    }
                }
            }
        }

        let tables = catalog.len();
        self.shared.write().catalog = catalog;
        if tables > 0 {
            tracing::info!(tables, "catalog loaded");
        }
        Ok(())
    }

    // ─── Sessions ────────────────────────────────────────────────────────

    /// Returns the session for an id, creating it on first reference.
    ///
    /// Double-checked: shared-mode lookup first, exclusive-mode insert on
    /// miss. Every successful lookup bumps the activity instant.
    pub fn session(&self, id: &str) -> Arc<Session> {
        {
            let shared = self.shared.read();
            if let Some(session) = shared.sessions.get(id) {
                session.touch();
                return session.clone();
            }
        }

        let mut shared = self.shared.write();
        if let Some(session) = shared.sessions.get(id) {
            session.touch();
            return session.clone();
        }
        let session = Arc::new(Session::new());
        shared.sessions.insert(id.to_string(), session.clone());
        session
    }

    /// Returns the number of registered sessions.
    pub fn session_count(&self) -> usize {
        self.shared.read().sessions.len()
    }

    /// Evicts sessions idle past the configured timeout, returning how
    /// many were removed.
    pub fn purge_idle_sessions(&self) -> usize {
        let timeout = self.config.session_timeout;
        let mut shared = self.shared.write();
        let before = shared.sessions.len();
        shared.sessions.retain(|id, session| {
            let keep = session.idle_for() <= timeout;
            if !keep {
                tracing::info!(session = %id, "purged inactive session");
            }
            keep
        });
        before - shared.sessions.len()
    }

    /// Spawns the background sweeper that purges idle sessions on the
    /// configured interval.
    pub fn spawn_sweeper(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(engine.config.sweep_interval);
            // The first tick completes immediately; skip it.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                engine.purge_idle_sessions();
            }
        })
    }

    // ─── Facade ──────────────────────────────────────────────────────────

    /// Executes a statement batch for a session.
    ///
    /// Fragments run strictly in order and each sees the side effects of
    /// the ones before it, USE DATABASE included. The first error aborts
    /// the remaining fragments; effects already committed stay committed.
    pub fn execute(&self, session_id: &str, batch: &str) -> EngineResult<Vec<StatementOutput>> {
        let session = self.session(session_id);
        let mut outputs = Vec::new();
        for fragment in Parser::split_batch(batch) {
            tracing::debug!(session = %session_id, statement = %fragment, "executing");
            let statement = Parser::parse_statement(fragment)?;
            outputs.push(self.dispatch(&session, statement)?);
        }
        Ok(outputs)
    }

    fn dispatch(&self, session: &Session, statement: Statement) -> EngineResult<StatementOutput> {
        match statement {
            Statement::CreateDatabase { name } => self.create_database(&name),
            Statement::DropDatabase { name } => self.drop_database(&name),
            Statement::UseDatabase { name } => self.use_database(session, &name),
            Statement::CreateTable { table, columns } => {
                self.create_table(session, &table, columns)
            }
            Statement::DropTable { table } => self.drop_table(session, &table),
            Statement::TruncateTable { table } => self.truncate_table(session, &table),
            Statement::AlterAddColumn { table, column } => {
                self.alter_add_column(session, &table, column)
            }
            Statement::Insert(insert) => self.insert(session, insert),
            Statement::Update(update) => self.update(session, update),
            Statement::Delete(delete) => self.delete(session, delete),
            Statement::Select(select) => self.select(session, select),
            Statement::Join(join) => self.join(session, join),
        }
    }

    // ─── Helpers ─────────────────────────────────────────────────────────

    fn current_database(&self, session: &Session) -> EngineResult<String> {
        session
            .current_database()
            .ok_or(EngineError::NoDatabaseSelected)
    }

    fn store(&self, database: &str) -> RowStore {
        RowStore::new(self.config.root.join(database), self.history.clone())
    }

    /// Looks up a table's columns in the catalog under the shared lock.
    fn columns(&self, database: &str, table: &str) -> EngineResult<Vec<Column>> {
        self.shared
            .read()
            .catalog
            .get(&(database.to_string(), table.to_string()))
            .cloned()
            .ok_or_else(|| StorageError::UnknownTable(table.to_string()).into())
    }

    // ─── Database lifecycle ──────────────────────────────────────────────

    fn create_database(&self, name: &str) -> EngineResult<StatementOutput> {
        let path = self.config.root.join(name);
        fs::create_dir_all(&path)?;
        self.history.init(&path)?;
        Ok(StatementOutput::Status)
    }

    fn drop_database(&self, name: &str) -> EngineResult<StatementOutput> {
        match fs::remove_dir_all(self.config.root.join(name)) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.shared
            .write()
            .catalog
            .retain(|(db, _), _| db != name);
        Ok(StatementOutput::Status)
    }

    fn use_database(&self, session: &Session, name: &str) -> EngineResult<StatementOutput> {
        let path = self.config.root.join(name);
        if !path.is_dir() {
            return Err(EngineError::UnknownDatabase(name.to_string()));
        }
        // Re-init is idempotent and restores repositories whose metadata
        // was removed out of band.
        self.history.init(&path)?;
        session.set_database(name);
        Ok(StatementOutput::Status)
    }

    // ─── DDL ─────────────────────────────────────────────────────────────

    fn create_table(
        &self,
        session: &Session,
        table: &str,
        columns: Vec<ColumnSpec>,
    ) -> EngineResult<StatementOutput> {
        let database = self.current_database(session)?;
        let store = self.store(&database);

        let specs: Vec<(String, String)> =
            columns.into_iter().map(|c| (c.name, c.kind)).collect();
        let columns = store.create_table(table, &specs)?;

        self.shared
            .write()
            .catalog
            .insert((database, table.to_string()), columns);

        store.commit(&format!("Create table {}", table))?;
        Ok(StatementOutput::Status)
    }

    fn drop_table(&self, session: &Session, table: &str) -> EngineResult<StatementOutput> {
        let database = self.current_database(session)?;
        let store = self.store(&database);

        store.drop_table(table)?;
        self.shared
            .write()
            .catalog
            .remove(&(database, table.to_string()));

        store.commit(&format!("Drop table {}", table))?;
        Ok(StatementOutput::Status)
    }

    fn truncate_table(&self, session: &Session, table: &str) -> EngineResult<StatementOutput> {
        let database = self.current_database(session)?;
        let store = self.store(&database);

        store.truncate_table(table)?;
        store.commit(&format!("Truncate table {}", table))?;
        Ok(StatementOutput::Status)
    }

    fn alter_add_column(
        &self,
        session: &Session,
        table: &str,
        spec: ColumnSpec,
    ) -> EngineResult<StatementOutput> {
        let database = self.current_database(session)?;
        let store = self.store(&database);

        let kind = ColumnKind::parse(&spec.kind)
            .ok_or_else(|| StorageError::UnsupportedType(spec.kind.clone()))?;
        let mut columns = store.read_schema(table)?;
        if columns.iter().any(|c| c.name == spec.name) {
            return Err(StorageError::DuplicateColumn(spec.name).into());
        }

        let column = Column::new(spec.name, kind);
        columns.push(column.clone());
        store.write_schema(table, &columns)?;

        self.shared
            .write()
            .catalog
            .insert((database, table.to_string()), columns);

        store.backfill_column(table, &column)?;
        store.commit(&format!(
            "Alter table {}: add column {} {}",
            table, column.name, column.kind
        ))?;
        Ok(StatementOutput::Status)
    }

    // ─── DML ─────────────────────────────────────────────────────────────

    fn insert(&self, session: &Session, insert: InsertStatement) -> EngineResult<StatementOutput> {
        let database = self.current_database(session)?;
        let columns = self.columns(&database, &insert.table)?;
        let store = self.store(&database);

        Executor::new(&store).insert(&insert.table, &columns, &insert.fields)?;
        Ok(StatementOutput::Status)
    }

    fn update(&self, session: &Session, update: UpdateStatement) -> EngineResult<StatementOutput> {
        let database = self.current_database(session)?;
        let columns = self.columns(&database, &update.table)?;
        let store = self.store(&database);
        let executor = Executor::new(&store);

        let opts = QueryOptions {
            filter: Predicate::parse(&update.predicate),
            ..Default::default()
        };
        for row in executor.query(&update.table, &opts)? {
            let Some(Value::Str(id)) = row.get("id") else {
                continue;
            };
            if id.is_empty() {
                continue;
            }
            executor.update(&update.table, &columns, id, &update.assignments)?;
        }
        Ok(StatementOutput::Status)
    }

    fn delete(&self, session: &Session, delete: DeleteStatement) -> EngineResult<StatementOutput> {
        let database = self.current_database(session)?;
        let store = self.store(&database);
        let executor = Executor::new(&store);

        let opts = QueryOptions {
            filter: Predicate::parse(&delete.predicate),
            ..Default::default()
        };
        for row in executor.query(&delete.table, &opts)? {
            let Some(Value::Str(id)) = row.get("id") else {
                continue;
            };
            if id.is_empty() {
                continue;
            }
            executor.delete(&delete.table, id)?;
        }
        Ok(StatementOutput::Status)
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    fn select(&self, session: &Session, select: SelectStatement) -> EngineResult<StatementOutput> {
        let database = self.current_database(session)?;
        let store = self.store(&database);

        let opts = QueryOptions {
            filter: Predicate::parse(&select.predicate),
            order_by: select.order_by.clone(),
            descending: select.descending,
            limit: select.limit,
            offset: select.offset,
        };
        let rows = Executor::new(&store).query(&select.table, &opts)?;

        let star = select.columns.first().map(|c| c == "*").unwrap_or(false);
        let mut seen = HashSet::new();
        let mut result = Vec::new();
        for row in rows {
            let projected: serde_json::Map<String, serde_json::Value> = if star {
                // Full projection keeps id/created_at/updated_at but hides
                // the soft-delete bookkeeping.
                row.iter()
                    .filter(|(key, _)| key.as_str() != "deleted" && key.as_str() != "deleted_at")
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect()
            } else {
                select
                    .columns
                    .iter()
                    .map(|column| {
                        let value = row
                            .get(column)
                            .map(|v| v.to_json())
                            .unwrap_or(serde_json::Value::Null);
                        (column.clone(), value)
                    })
                    .collect()
            };

            if select.distinct {
                let key = serde_json::Value::Object(projected.clone()).to_string();
                if !seen.insert(key) {
                    continue;
                }
            }
            result.push(projected);
        }
        Ok(StatementOutput::Rows(result))
    }

    fn join(&self, session: &Session, join: JoinStatement) -> EngineResult<StatementOutput> {
        let database = self.current_database(session)?;
        let store = self.store(&database);

        let rows = Executor::new(&store).join(
            &join.left,
            &join.right,
            &join.left_key,
            &join.right_key,
        )?;
        Ok(StatementOutput::Rows(
            rows.iter().map(row_to_json).collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rev_sql::storage::MemoryHistory;
    use tempfile::TempDir;

    fn test_engine() -> (TempDir, Engine, Arc<MemoryHistory>) {
        let dir = TempDir::new().unwrap();
        let history = Arc::new(MemoryHistory::new());
        let engine = Engine::open(
            EngineConfig::with_root(dir.path().join("data")),
            history.clone(),
        )
        .unwrap();
        (dir, engine, history)
    }

    #[test]
    fn test_engine_open_creates_root() {
        let (dir, engine, _) = test_engine();
        assert!(dir.path().join("data").is_dir());
        assert_eq!(engine.session_count(), 0);
    }

    #[test]
    fn test_session_is_created_lazily_and_reused() {
        let (_dir, engine, _) = test_engine();
        let a = engine.session("s1");
        let b = engine.session("s1");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(engine.session_count(), 1);

        engine.session("s2");
        assert_eq!(engine.session_count(), 2);
    }

    #[test]
    fn test_purge_idle_sessions() {
        let dir = TempDir::new().unwrap();
        let mut config = EngineConfig::with_root(dir.path().join("data"));
        config.session_timeout = Duration::from_millis(10);
        let engine = Engine::open(config, Arc::new(MemoryHistory::new())).unwrap();

        engine.session("stale");
        std::thread::sleep(Duration::from_millis(30));
        engine.session("fresh");

        assert_eq!(engine.purge_idle_sessions(), 1);
        assert_eq!(engine.session_count(), 1);
    }

    #[test]
    fn test_no_database_selected() {
        let (_dir, engine, _) = test_engine();
        let err = engine.execute("s", "CREATE TABLE t (x INT)").unwrap_err();
        assert!(matches!(err, EngineError::NoDatabaseSelected));
    }

    #[test]
    fn test_use_unknown_database() {
        let (_dir, engine, _) = test_engine();
        let err = engine.execute("s", "USE DATABASE ghost").unwrap_err();
        assert!(matches!(err, EngineError::UnknownDatabase(_)));
    }

    #[test]
    fn test_database_lifecycle_without_selection() {
        let (_dir, engine, history) = test_engine();
        engine
            .execute("s", "CREATE DATABASE d; USE DATABASE d; DROP DATABASE d")
            .unwrap();
        assert_eq!(history.inits().len(), 2);
    }

    #[test]
    fn test_catalog_keyed_per_database() {
        let (_dir, engine, _) = test_engine();
        engine
            .execute(
                "s",
                "CREATE DATABASE a; USE DATABASE a; CREATE TABLE t (x INT)",
            )
            .unwrap();
        engine
            .execute(
                "s",
                "CREATE DATABASE b; USE DATABASE b; CREATE TABLE t (y STRING)",
            )
            .unwrap();

        assert_eq!(
            engine.columns("a", "t").unwrap()[0].name,
            "x".to_string()
        );
        assert_eq!(
            engine.columns("b", "t").unwrap()[0].name,
            "y".to_string()
        );
    }

    #[test]
    fn test_catalog_reloaded_on_open() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("data");
        let history = Arc::new(MemoryHistory::new());

        {
            let engine =
                Engine::open(EngineConfig::with_root(&root), history.clone()).unwrap();
            engine
                .execute(
                    "s",
                    "CREATE DATABASE d; USE DATABASE d; CREATE TABLE t (x INT)",
                )
                .unwrap();
        }

        let engine = Engine::open(EngineConfig::with_root(&root), history).unwrap();
        assert_eq!(engine.stats().tables, 1);
        // The reloaded catalog accepts inserts straight away.
        engine
            .execute("s2", "USE DATABASE d; INSERT INTO t (x) VALUES (5)")
            .unwrap();
    }
}
