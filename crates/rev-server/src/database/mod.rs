//! # RevDB engine
//!
//! The unified engine interface wiring together the `rev-sql` pieces:
//!
//! - statement parsing and dispatch
//! - the catalog and session registry behind one readers–writer gate
//! - the row store and the history-store adapter
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        Engine                            │
//! │          execute(session_id, sql_batch)                  │
//! │                          │                               │
//! │        ┌─────────────────┼──────────────────┐            │
//! │        ▼                 ▼                  ▼            │
//! │  ┌───────────┐   ┌──────────────┐   ┌──────────────┐     │
//! │  │  Parser   │   │   Catalog    │   │  Sessions    │     │
//! │  │ (rev-sql) │   │ (db, table)  │   │ id → state   │     │
//! │  └───────────┘   └──────────────┘   └──────────────┘     │
//! │        │                                                 │
//! │        ▼                                                 │
//! │  ┌───────────┐   ┌──────────────┐   ┌──────────────┐     │
//! │  │ Executor  │──▶│   RowStore   │──▶│   History    │     │
//! │  │ (rev-sql) │   │  JSON files  │   │  git commits │     │
//! │  └───────────┘   └──────────────┘   └──────────────┘     │
//! └──────────────────────────────────────────────────────────┘
//! ```

mod engine;
mod error;
mod result;
mod session;

pub use engine::{Engine, EngineConfig, EngineStats};
pub use error::{EngineError, EngineResult};
pub use result::{batch_to_json, StatementOutput};
pub use session::Session;
