//! Engine error types.

use std::fmt;

use rev_sql::parser::ParseError;
use rev_sql::storage::{HistoryError, StorageError};

/// Errors surfaced to callers of the engine facade.
#[derive(Debug)]
pub enum EngineError {
    /// A statement other than database lifecycle ran with no session
    /// database selected.
    NoDatabaseSelected,
    /// USE DATABASE named a directory that does not exist.
    UnknownDatabase(String),
    /// The statement matched no grammar production or had bad operands.
    Parse(ParseError),
    /// Table, column, type, or literal error from the storage layer.
    Storage(StorageError),
    /// The external history tool failed.
    History(HistoryError),
    /// Filesystem error outside the row store.
    Io(std::io::Error),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::NoDatabaseSelected => {
                write!(f, "no database selected; run USE DATABASE first")
            }
            EngineError::UnknownDatabase(name) => {
                write!(f, "database {} does not exist", name)
            }
            EngineError::Parse(e) => write!(f, "{}", e),
            EngineError::Storage(e) => write!(f, "{}", e),
            EngineError::History(e) => write!(f, "{}", e),
            EngineError::Io(e) => write!(f, "io error: {}", e),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<ParseError> for EngineError {
    fn from(e: ParseError) -> Self {
        EngineError::Parse(e)
    }
}

impl From<StorageError> for EngineError {
    fn from(e: StorageError) -> Self {
        EngineError::Storage(e)
    }
}

impl From<HistoryError> for EngineError {
    fn from(e: HistoryError) -> Self {
        EngineError::History(e)
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Io(e)
    }
}

/// Engine result type.
pub type EngineResult<T> = Result<T, EngineError>;
