//! SQL statement parser for RevDB.
//!
//! The grammar is deliberately closed: each statement form is matched by a
//! dedicated recognizer over a hand-written keyword scanner, and anything
//! that matches no production is a syntax error. Keywords are
//! case-insensitive; identifiers are `[A-Za-z0-9_]` words (database names
//! may also contain `-`). WHERE clauses are captured as raw text and
//! handed to the predicate engine.
//!
//! # Supported SQL
//!
//! - `CREATE DATABASE` / `DROP DATABASE` / `USE DATABASE`
//! - `CREATE TABLE` / `DROP TABLE` / `TRUNCATE TABLE`
//! - `ALTER TABLE .. ADD COLUMN`
//! - `INSERT INTO .. (..) VALUES (..)`
//! - `UPDATE .. SET .. WHERE ..`
//! - `DELETE FROM .. WHERE ..`
//! - `SELECT [DISTINCT] cols|* FROM t [WHERE ..] [ORDER BY col [ASC|DESC]]
//!   [LIMIT n] [OFFSET n]`
//! - `SELECT * FROM l JOIN r ON l.c=r.c`

use thiserror::Error;

mod statement;

pub use statement::*;

use crate::predicate::strip_literal;

/// Errors that can occur while parsing a statement.
#[derive(Debug, Clone, Error)]
pub enum ParseError {
    /// No grammar production matches the statement.
    #[error("unsupported SQL: {0}")]
    Unrecognized(String),

    /// A CREATE TABLE column spec is not a `name kind` pair.
    #[error("bad column spec {0:?}")]
    BadColumnSpec(String),

    /// A statement matched a production but its operands are inconsistent.
    #[error("{0}")]
    Malformed(String),
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Statement parser.
pub struct Parser;

impl Parser {
    /// Splits a batch on `;`, trimming and discarding empty fragments.
    pub fn split_batch(batch: &str) -> Vec<&str> {
        batch
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Parses a single statement against the closed grammar.
    pub fn parse_statement(sql: &str) -> ParseResult<Statement> {
        let sql = sql.trim();
        let recognizers: &[fn(&str) -> Option<ParseResult<Statement>>] = &[
            try_create_database,
            try_drop_database,
            try_use_database,
            try_create_table,
            try_drop_table,
            try_truncate_table,
            try_insert,
            try_update,
            try_delete,
            try_alter_add_column,
            try_join,
            try_select,
        ];
        for recognize in recognizers {
            if let Some(result) = recognize(sql) {
                return result;
            }
        }
        Err(ParseError::Unrecognized(sql.to_string()))
    }
}

// ─── Scanner helpers ─────────────────────────────────────────────────────

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Strips a (possibly multi-word) keyword from the front of `input`,
/// case-insensitively, returning the remainder. Words must be separated by
/// whitespace and the keyword must end at a word boundary.
fn strip_keyword<'a>(input: &'a str, keyword: &str) -> Option<&'a str> {
    let mut rest = input;
    for (i, word) in keyword.split(' ').enumerate() {
        let trimmed = rest.trim_start();
        if i > 0 && trimmed.len() == rest.len() {
            return None;
        }
        rest = trimmed;
        if !rest.get(..word.len())?.eq_ignore_ascii_case(word) {
            return None;
        }
        rest = &rest[word.len()..];
        if rest.chars().next().map(is_ident_char).unwrap_or(false) {
            return None;
        }
    }
    Some(rest)
}

/// Takes a leading identifier after optional whitespace.
fn take_ident(input: &str) -> Option<(&str, &str)> {
    take_word(input, is_ident_char)
}

/// Takes a leading database identifier, which may also contain `-`.
fn take_db_ident(input: &str) -> Option<(&str, &str)> {
    take_word(input, |c| is_ident_char(c) || c == '-')
}

fn take_word(input: &str, accept: fn(char) -> bool) -> Option<(&str, &str)> {
    let rest = input.trim_start();
    let end = rest.find(|c: char| !accept(c)).unwrap_or(rest.len());
    if end == 0 {
        None
    } else {
        Some((&rest[..end], &rest[end..]))
    }
}

/// Takes a leading decimal number after optional whitespace.
fn take_number(input: &str) -> Option<(usize, &str)> {
    let rest = input.trim_start();
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if end == 0 {
        return None;
    }
    rest[..end].parse().ok().map(|n| (n, &rest[end..]))
}

/// Finds the first whitespace-delimited, case-insensitive occurrence of
/// `keyword` in `haystack`, returning its byte offset.
fn find_keyword(haystack: &str, keyword: &str) -> Option<usize> {
    let klen = keyword.len();
    let bytes = haystack.as_bytes();
    let mut i = 0;
    while i + klen <= haystack.len() {
        let at_boundary = i == 0 || bytes[i - 1].is_ascii_whitespace();
        if at_boundary
            && haystack
                .get(i..i + klen)
                .map_or(false, |s| s.eq_ignore_ascii_case(keyword))
        {
            let ends_word = haystack[i + klen..]
                .chars()
                .next()
                .map_or(true, |c| c.is_whitespace());
            if ends_word {
                return Some(i);
            }
        }
        i += 1;
    }
    None
}

// ─── Statement recognizers ───────────────────────────────────────────────

fn try_create_database(sql: &str) -> Option<ParseResult<Statement>> {
    let rest = strip_keyword(sql, "CREATE DATABASE")?;
    let (name, rest) = take_db_ident(rest)?;
    rest.trim().is_empty().then(|| {
        Ok(Statement::CreateDatabase {
            name: name.to_string(),
        })
    })
}

fn try_drop_database(sql: &str) -> Option<ParseResult<Statement>> {
    let rest = strip_keyword(sql, "DROP DATABASE")?;
    let (name, rest) = take_db_ident(rest)?;
    rest.trim().is_empty().then(|| {
        Ok(Statement::DropDatabase {
            name: name.to_string(),
        })
    })
}

fn try_use_database(sql: &str) -> Option<ParseResult<Statement>> {
    let rest = strip_keyword(sql, "USE DATABASE")?;
    let (name, rest) = take_db_ident(rest)?;
    rest.trim().is_empty().then(|| {
        Ok(Statement::UseDatabase {
            name: name.to_string(),
        })
    })
}

fn try_create_table(sql: &str) -> Option<ParseResult<Statement>> {
    let rest = strip_keyword(sql, "CREATE TABLE")?;
    let (table, rest) = take_ident(rest)?;
    let rest = rest.trim();
    let inner = rest.strip_prefix('(')?.strip_suffix(')')?;

    let mut columns = Vec::new();
    for spec in inner.split(',') {
        let words: Vec<&str> = spec.split_whitespace().collect();
        if words.len() != 2 {
            return Some(Err(ParseError::BadColumnSpec(spec.trim().to_string())));
        }
        columns.push(ColumnSpec {
            name: words[0].to_string(),
            kind: words[1].to_string(),
        });
    }
    Some(Ok(Statement::CreateTable {
        table: table.to_string(),
        columns,
    }))
}

fn try_drop_table(sql: &str) -> Option<ParseResult<Statement>> {
    let rest = strip_keyword(sql, "DROP TABLE")?;
    let (table, rest) = take_ident(rest)?;
    rest.trim().is_empty().then(|| {
        Ok(Statement::DropTable {
            table: table.to_string(),
        })
    })
}

fn try_truncate_table(sql: &str) -> Option<ParseResult<Statement>> {
    let rest = strip_keyword(sql, "TRUNCATE TABLE")?;
    let (table, rest) = take_ident(rest)?;
    rest.trim().is_empty().then(|| {
        Ok(Statement::TruncateTable {
            table: table.to_string(),
        })
    })
}

fn try_insert(sql: &str) -> Option<ParseResult<Statement>> {
    let rest = strip_keyword(sql, "INSERT INTO")?;
    let (table, rest) = take_ident(rest)?;
    let rest = rest.trim();
    if !rest.starts_with('(') || !rest.ends_with(')') {
        return None;
    }

    // Split on the last `) VALUES (` so literals containing the word VALUES
    // keep working.
    let mut split_at = None;
    let mut search_from = 0;
    while let Some(pos) = find_keyword(&rest[search_from..], "VALUES") {
        let abs = search_from + pos;
        let before = rest[..abs].trim_end();
        let after = rest[abs + "VALUES".len()..].trim_start();
        if before.ends_with(')') && after.starts_with('(') {
            split_at = Some(abs);
        }
        search_from = abs + "VALUES".len();
    }
    let abs = split_at?;

    let cols_inner = rest[..abs]
        .trim_end()
        .strip_prefix('(')?
        .strip_suffix(')')?;
    let vals_inner = rest[abs + "VALUES".len()..]
        .trim()
        .strip_prefix('(')?
        .strip_suffix(')')?;

    let fields: Vec<&str> = cols_inner.split(',').map(str::trim).collect();
    let values: Vec<&str> = vals_inner.split(',').map(strip_literal).collect();
    if fields.len() != values.len() {
        return Some(Err(ParseError::Malformed(format!(
            "INSERT into {}: {} columns but {} values",
            table,
            fields.len(),
            values.len()
        ))));
    }

    let fields = fields
        .into_iter()
        .zip(values)
        .map(|(f, v)| (f.to_string(), v.to_string()))
        .collect();
    Some(Ok(Statement::Insert(InsertStatement {
        table: table.to_string(),
        fields,
    })))
}

fn try_update(sql: &str) -> Option<ParseResult<Statement>> {
    let rest = strip_keyword(sql, "UPDATE")?;
    let (table, rest) = take_ident(rest)?;
    let rest = strip_keyword(rest, "SET")?;
    let wh = find_keyword(rest, "WHERE")?;
    let set_clause = rest[..wh].trim();
    let predicate = rest[wh + "WHERE".len()..].trim();
    if set_clause.is_empty() || predicate.is_empty() {
        return None;
    }

    let mut assignments = Vec::new();
    for part in set_clause.split(',') {
        let mut kv = part.splitn(2, '=');
        let (Some(key), Some(value)) = (kv.next(), kv.next()) else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        assignments.push((key.to_string(), strip_literal(value).to_string()));
    }
    Some(Ok(Statement::Update(UpdateStatement {
        table: table.to_string(),
        assignments,
        predicate: predicate.to_string(),
    })))
}

fn try_delete(sql: &str) -> Option<ParseResult<Statement>> {
    let rest = strip_keyword(sql, "DELETE FROM")?;
    let (table, rest) = take_ident(rest)?;
    let rest = strip_keyword(rest, "WHERE")?;
    let predicate = rest.trim();
    if predicate.is_empty() {
        return None;
    }
    Some(Ok(Statement::Delete(DeleteStatement {
        table: table.to_string(),
        predicate: predicate.to_string(),
    })))
}

fn try_alter_add_column(sql: &str) -> Option<ParseResult<Statement>> {
    let rest = strip_keyword(sql, "ALTER TABLE")?;
    let (table, rest) = take_ident(rest)?;
    let rest = strip_keyword(rest, "ADD COLUMN")?;
    let (name, rest) = take_ident(rest)?;
    let (kind, rest) = take_ident(rest)?;
    rest.trim().is_empty().then(|| {
        Ok(Statement::AlterAddColumn {
            table: table.to_string(),
            column: ColumnSpec {
                name: name.to_string(),
                kind: kind.to_string(),
            },
        })
    })
}

fn try_join(sql: &str) -> Option<ParseResult<Statement>> {
    let rest = strip_keyword(sql, "SELECT")?;
    let rest = rest.trim_start().strip_prefix('*')?;
    let rest = strip_keyword(rest, "FROM")?;
    let (left, rest) = take_ident(rest)?;
    let rest = strip_keyword(rest, "JOIN")?;
    let (right, rest) = take_ident(rest)?;
    let rest = strip_keyword(rest, "ON")?;

    // <qualifier>.<col> = <qualifier>.<col>; the qualifiers are not
    // validated against the table names.
    let (_, rest) = take_ident(rest)?;
    let rest = rest.strip_prefix('.')?;
    let (left_key, rest) = take_ident(rest)?;
    let rest = rest.trim_start().strip_prefix('=')?;
    let (_, rest) = take_ident(rest)?;
    let rest = rest.strip_prefix('.')?;
    let (right_key, rest) = take_ident(rest)?;

    rest.trim().is_empty().then(|| {
        Ok(Statement::Join(JoinStatement {
            left: left.to_string(),
            right: right.to_string(),
            left_key: left_key.to_string(),
            right_key: right_key.to_string(),
        }))
    })
}

fn try_select(sql: &str) -> Option<ParseResult<Statement>> {
    let rest = strip_keyword(sql, "SELECT")?;
    let (distinct, rest) = match strip_keyword(rest, "DISTINCT") {
        Some(r) => (true, r),
        None => (false, rest),
    };

    let from = find_keyword(rest, "FROM")?;
    let columns_text = rest[..from].trim();
    if columns_text.is_empty() {
        return None;
    }
    let columns: Vec<String> = columns_text
        .split(',')
        .map(|c| c.trim().to_string())
        .collect();
    if columns.iter().any(|c| c.is_empty()) {
        return None;
    }

    let (table, mut tail) = take_ident(&rest[from + "FROM".len()..])?;

    let mut predicate = "";
    if let Some(t) = strip_keyword(tail, "WHERE") {
        let cut = ["ORDER BY", "LIMIT", "OFFSET"]
            .iter()
            .filter_map(|k| find_keyword(t, k))
            .min()
            .unwrap_or(t.len());
        predicate = t[..cut].trim();
        if predicate.is_empty() {
            return None;
        }
        // IN and subqueries are outside the WHERE grammar; reject instead
        // of letting the clause degrade to an always-true predicate.
        if find_keyword(predicate, "IN").is_some() {
            return None;
        }
        tail = &t[cut..];
    }

    let mut order_by = None;
    let mut descending = false;
    if let Some(t) = strip_keyword(tail, "ORDER BY") {
        let (col, t) = take_ident(t)?;
        order_by = Some(col.to_string());
        tail = t;
        if let Some(t) = strip_keyword(tail, "ASC") {
            tail = t;
        } else if let Some(t) = strip_keyword(tail, "DESC") {
            descending = true;
            tail = t;
        }
    }

    let mut limit = 0;
    if let Some(t) = strip_keyword(tail, "LIMIT") {
        let (n, t) = take_number(t)?;
        limit = n;
        tail = t;
    }

    let mut offset = 0;
    if let Some(t) = strip_keyword(tail, "OFFSET") {
        let (n, t) = take_number(t)?;
        offset = n;
        tail = t;
    }

    if !tail.trim().is_empty() {
        return None;
    }
    Some(Ok(Statement::Select(SelectStatement {
        distinct,
        columns,
        table: table.to_string(),
        predicate: predicate.to_string(),
        order_by,
        descending,
        limit,
        offset,
    })))
}
