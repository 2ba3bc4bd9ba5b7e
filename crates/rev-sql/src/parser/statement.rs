//! Parsed statement representation.

/// A raw `name kind` column spec as written in DDL.
///
/// The kind is kept textual here; the row store validates it against the
/// recognized kinds so that an unsupported type surfaces as a storage
/// error, not a syntax error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Column name.
    pub name: String,
    /// Column kind as written (validated later).
    pub kind: String,
}

/// A parsed INSERT statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertStatement {
    /// Target table.
    pub table: String,
    /// `(column, literal)` pairs, literals already quote-stripped.
    pub fields: Vec<(String, String)>,
}

/// A parsed UPDATE statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateStatement {
    /// Target table.
    pub table: String,
    /// `(column, literal)` pairs from the SET clause.
    pub assignments: Vec<(String, String)>,
    /// Raw WHERE clause for the predicate engine.
    pub predicate: String,
}

/// A parsed DELETE statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteStatement {
    /// Target table.
    pub table: String,
    /// Raw WHERE clause for the predicate engine.
    pub predicate: String,
}

/// A parsed SELECT statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectStatement {
    /// Whether DISTINCT was requested.
    pub distinct: bool,
    /// Projected columns; `["*"]` for a full projection.
    pub columns: Vec<String>,
    /// Source table.
    pub table: String,
    /// Raw WHERE clause; empty means match everything.
    pub predicate: String,
    /// ORDER BY column, if any.
    pub order_by: Option<String>,
    /// True when the order direction is DESC.
    pub descending: bool,
    /// LIMIT; 0 means unlimited.
    pub limit: usize,
    /// OFFSET into the ordered result.
    pub offset: usize,
}

/// A parsed two-table equi-join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinStatement {
    /// Left table.
    pub left: String,
    /// Right table.
    pub right: String,
    /// Join key on the left side.
    pub left_key: String,
    /// Join key on the right side.
    pub right_key: String,
}

/// A single statement of the closed grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// `CREATE DATABASE <name>`
    CreateDatabase {
        /// Database name.
        name: String,
    },
    /// `DROP DATABASE <name>`
    DropDatabase {
        /// Database name.
        name: String,
    },
    /// `USE DATABASE <name>`
    UseDatabase {
        /// Database name.
        name: String,
    },
    /// `CREATE TABLE <name> (<col> <kind>, ...)`
    CreateTable {
        /// Table name.
        table: String,
        /// Declared columns, in declaration order.
        columns: Vec<ColumnSpec>,
    },
    /// `DROP TABLE <name>`
    DropTable {
        /// Table name.
        table: String,
    },
    /// `TRUNCATE TABLE <name>`
    TruncateTable {
        /// Table name.
        table: String,
    },
    /// `ALTER TABLE <name> ADD COLUMN <col> <kind>`
    AlterAddColumn {
        /// Table name.
        table: String,
        /// The new column spec.
        column: ColumnSpec,
    },
    /// `INSERT INTO <t> (<cols>) VALUES (<lits>)`
    Insert(InsertStatement),
    /// `UPDATE <t> SET <col>=<lit>, ... WHERE <pred>`
    Update(UpdateStatement),
    /// `DELETE FROM <t> WHERE <pred>`
    Delete(DeleteStatement),
    /// `SELECT ... FROM <t> ...`
    Select(SelectStatement),
    /// `SELECT * FROM <l> JOIN <r> ON <t>.<c>=<t>.<c>`
    Join(JoinStatement),
}
