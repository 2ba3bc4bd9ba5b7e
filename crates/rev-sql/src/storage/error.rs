//! Storage error types.

use std::fmt;

use crate::storage::history::HistoryError;
use crate::value::CoerceError;

/// Storage error type.
#[derive(Debug)]
pub enum StorageError {
    /// Table directory or schema file does not exist.
    UnknownTable(String),
    /// Column is not declared in the table schema.
    UnknownColumn(String),
    /// Column name repeated in a schema or already present on ALTER.
    DuplicateColumn(String),
    /// Column kind outside the five recognized kinds.
    UnsupportedType(String),
    /// A column declaration has no name.
    EmptyColumnName(usize),
    /// A literal failed coercion to its column kind.
    InvalidLiteral {
        /// The column being coerced into.
        column: String,
        /// The underlying coercion failure.
        source: CoerceError,
    },
    /// A row file does not exist.
    RowNotFound {
        /// Table name.
        table: String,
        /// Row id.
        id: String,
    },
    /// A file could not be encoded or decoded as JSON.
    EncodingError(String),
    /// The history store rejected an operation.
    History(HistoryError),
    /// Filesystem error.
    Io(std::io::Error),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::UnknownTable(name) => write!(f, "table {:?} does not exist", name),
            StorageError::UnknownColumn(name) => write!(f, "unknown column {:?}", name),
            StorageError::DuplicateColumn(name) => write!(f, "duplicate column {:?}", name),
            StorageError::UnsupportedType(kind) => write!(f, "unsupported type {:?}", kind),
            StorageError::EmptyColumnName(index) => write!(f, "column {} has no name", index),
            StorageError::InvalidLiteral { column, source } => {
                write!(f, "{}: {}", column, source)
            }
            StorageError::RowNotFound { table, id } => {
                write!(f, "row {:?} not found in table {:?}", id, table)
            }
            StorageError::EncodingError(msg) => write!(f, "encoding error: {}", msg),
            StorageError::History(e) => write!(f, "{}", e),
            StorageError::Io(e) => write!(f, "io error: {}", e),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<HistoryError> for StorageError {
    fn from(e: HistoryError) -> Self {
        StorageError::History(e)
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Io(e)
    }
}

/// Storage result type.
pub type StorageResult<T> = Result<T, StorageError>;
