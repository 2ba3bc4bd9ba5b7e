//! WHERE-clause predicate engine.
//!
//! The accepted grammar is a conjunction of comparisons:
//!
//! ```text
//! predicate := conjunct ( " AND " conjunct )*
//! conjunct  := identifier ( "=" | "LIKE" ) literal
//! ```
//!
//! `=` matches when the textual rendering of the row field equals the
//! literal. `LIKE` treats `%` as "any sequence of characters" and every
//! other character as itself; the pattern is anchored to the full string.
//! Literals are stripped of surrounding whitespace and any of `' " )`.
//! Fields compare through their rendered text, so an INT-coerced `100`
//! matches the literal `100`. Missing fields render empty and compare
//! equal only to that rendering.

use regex::Regex;

use crate::value::Row;

/// Comparison operator of a single conjunct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// Exact textual equality.
    Eq,
    /// Anchored `%`-wildcard pattern match.
    Like,
}

/// A single `field <op> literal` condition.
#[derive(Debug, Clone)]
pub struct Condition {
    /// Field name, whitespace-trimmed.
    pub field: String,
    /// Comparison operator.
    pub op: CompareOp,
    /// Literal after quote stripping.
    pub literal: String,
    pattern: Option<Regex>,
}

impl Condition {
    fn new(field: String, op: CompareOp, literal: String) -> Self {
        let pattern = match op {
            CompareOp::Like => like_to_regex(&literal),
            CompareOp::Eq => None,
        };
        Self {
            field,
            op,
            literal,
            pattern,
        }
    }

    fn matches(&self, rendered: &str) -> bool {
        match &self.pattern {
            Some(re) => re.is_match(rendered),
            None => rendered == self.literal,
        }
    }
}

/// Translates a LIKE pattern to an anchored regex: `%` becomes `.*`, every
/// other character matches itself.
fn like_to_regex(pattern: &str) -> Option<Regex> {
    let body = pattern
        .split('%')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("^{}$", body)).ok()
}

/// A parsed WHERE clause: a conjunction of conditions.
#[derive(Debug, Clone, Default)]
pub struct Predicate {
    conditions: Vec<Condition>,
}

impl Predicate {
    /// Parses a raw WHERE clause.
    ///
    /// An empty clause yields the always-true predicate. Fragments that do
    /// not form a `field op literal` shape are ignored rather than
    /// rejected; the statement grammar is what decides syntax errors.
    pub fn parse(clause: &str) -> Self {
        let clause = clause.trim();
        if clause.is_empty() {
            return Self::default();
        }

        let mut conditions = Vec::new();
        for part in clause.split(" AND ") {
            let part = part.trim();
            let (field, op, raw) = if let Some(idx) = part.find("LIKE") {
                (&part[..idx], CompareOp::Like, &part[idx + "LIKE".len()..])
            } else if let Some(idx) = part.find('=') {
                (&part[..idx], CompareOp::Eq, &part[idx + 1..])
            } else {
                continue;
            };
            let field = field.trim();
            if field.is_empty() {
                continue;
            }
            conditions.push(Condition::new(
                field.to_string(),
                op,
                strip_literal(raw).to_string(),
            ));
        }
        Self { conditions }
    }

    /// Returns true when the predicate has no conditions.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Returns the parsed conditions.
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Evaluates the predicate against a row.
    pub fn matches(&self, row: &Row) -> bool {
        self.conditions.iter().all(|cond| {
            let rendered = row
                .get(&cond.field)
                .map(|v| v.to_string())
                .unwrap_or_default();
            cond.matches(&rendered)
        })
    }
}

/// Strips surrounding whitespace and any of `' " )` from a literal.
pub fn strip_literal(raw: &str) -> &str {
    raw.trim_matches(|c: char| c == ' ' || c == '\'' || c == '"' || c == ')')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn row(pairs: &[(&str, Value)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_empty_predicate_matches_everything() {
        let pred = Predicate::parse("");
        assert!(pred.is_empty());
        assert!(pred.matches(&row(&[("x", Value::Int(1))])));
        assert!(pred.matches(&Row::new()));
    }

    #[test]
    fn test_equality_on_rendered_text() {
        let pred = Predicate::parse("total = 100");
        assert!(pred.matches(&row(&[("total", Value::Int(100))])));
        assert!(pred.matches(&row(&[("total", Value::Str("100".into()))])));
        assert!(!pred.matches(&row(&[("total", Value::Int(99))])));
    }

    #[test]
    fn test_quoted_literals() {
        let pred = Predicate::parse("name = 'Alice Smith'");
        assert!(pred.matches(&row(&[("name", Value::Str("Alice Smith".into()))])));

        let pred = Predicate::parse(r#"name = "Bob""#);
        assert!(pred.matches(&row(&[("name", Value::Str("Bob".into()))])));
    }

    #[test]
    fn test_conjunction() {
        let pred = Predicate::parse("name = 'Alice' AND active = true");
        assert!(pred.matches(&row(&[
            ("name", Value::Str("Alice".into())),
            ("active", Value::Bool(true)),
        ])));
        assert!(!pred.matches(&row(&[
            ("name", Value::Str("Alice".into())),
            ("active", Value::Bool(false)),
        ])));
    }

    #[test]
    fn test_like_wildcards() {
        let pred = Predicate::parse("email LIKE '%@example.com'");
        assert!(pred.matches(&row(&[("email", Value::Str("a@example.com".into()))])));
        assert!(!pred.matches(&row(&[("email", Value::Str("a@example.org".into()))])));

        let pred = Predicate::parse("name LIKE 'User%'");
        assert!(pred.matches(&row(&[("name", Value::Str("User42".into()))])));
        assert!(!pred.matches(&row(&[("name", Value::Str("SuperUser42".into()))])));
    }

    #[test]
    fn test_like_is_anchored() {
        let pred = Predicate::parse("name LIKE 'li'");
        // No wildcard: the anchored pattern degenerates to exact equality.
        assert!(!pred.matches(&row(&[("name", Value::Str("Alice".into()))])));
        assert!(pred.matches(&row(&[("name", Value::Str("li".into()))])));
    }

    #[test]
    fn test_like_escapes_regex_metacharacters() {
        let pred = Predicate::parse("note LIKE 'a.c%'");
        assert!(pred.matches(&row(&[("note", Value::Str("a.cdef".into()))])));
        assert!(!pred.matches(&row(&[("note", Value::Str("abcdef".into()))])));
    }

    #[test]
    fn test_percent_in_equality_is_literal() {
        let pred = Predicate::parse("note = '50%'");
        assert!(pred.matches(&row(&[("note", Value::Str("50%".into()))])));
        assert!(!pred.matches(&row(&[("note", Value::Str("505".into()))])));
    }

    #[test]
    fn test_missing_field_matches_only_empty() {
        let pred = Predicate::parse("ghost = ");
        assert!(pred.matches(&row(&[("x", Value::Int(1))])));

        let pred = Predicate::parse("ghost = something");
        assert!(!pred.matches(&row(&[("x", Value::Int(1))])));
    }

    #[test]
    fn test_malformed_fragment_is_ignored() {
        let pred = Predicate::parse("justaword AND x = 1");
        assert_eq!(pred.conditions().len(), 1);
        assert!(pred.matches(&row(&[("x", Value::Int(1))])));
    }
}
