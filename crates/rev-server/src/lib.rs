//! # rev-server
//!
//! Engine facade and network server for RevDB.
//!
//! This crate provides:
//!
//! - **Engine**: the single entry point the HTTP layer consumes —
//!   `execute(session_id, sql_batch)` — owning the catalog, the session
//!   registry, and the commit discipline against the history store.
//!
//! - **Session registry**: opaque-id keyed per-session state with lazy
//!   creation and background eviction.
//!
//! - **HTTP server**: the `POST /sql` endpoint consumed by clients.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use rev_server::database::{Engine, EngineConfig};
//! use rev_sql::storage::GitHistory;
//!
//! let engine = Engine::open(EngineConfig::with_root(".gitdb"), Arc::new(GitHistory::new()))?;
//! engine.execute("session-1", "CREATE DATABASE d; USE DATABASE d")?;
//! engine.execute("session-1", "CREATE TABLE users (name STRING, age INT)")?;
//! let outputs = engine.execute("session-1", "SELECT * FROM users")?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Database engine — the main entry point for RevDB.
pub mod database;

/// HTTP service implementation.
pub mod http;

/// Server configuration.
pub mod config;

pub use config::ServerConfig;
pub use database::{Engine, EngineConfig, EngineError, EngineResult, StatementOutput};
