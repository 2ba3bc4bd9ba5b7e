//! On-disk storage: the JSON row store and the history-store adapter.

mod error;
mod history;
mod rowstore;

pub use error::{StorageError, StorageResult};
pub use history::{GitHistory, History, HistoryError, MemoryHistory};
pub use rowstore::{RowStore, SCHEMA_FILE};
