//! History store adapter.
//!
//! Every mutation RevDB makes is mirrored as a revision in an external
//! content-addressed history tool. The tool is injected behind the
//! [`History`] trait so the engine stays testable without the binary:
//! [`GitHistory`] shells out to `git`, [`MemoryHistory`] records revisions
//! in memory.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use parking_lot::Mutex;

/// Failure reported by the history tool.
///
/// Both standard streams of the underlying process are preserved in
/// `detail` so the cause is diagnosable from the error message alone.
#[derive(Debug, Clone)]
pub struct HistoryError {
    /// The operation that failed (`init`, `add`, `commit`).
    pub op: &'static str,
    /// Streams or error text from the underlying tool.
    pub detail: String,
}

impl fmt::Display for HistoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "history {} failed: {}", self.op, self.detail)
    }
}

impl std::error::Error for HistoryError {}

/// Content-addressed history store with two operations.
pub trait History: Send + Sync {
    /// Initializes a repository rooted at `path`. Idempotent: succeeding on
    /// an already-initialized repository is required.
    fn init(&self, path: &Path) -> Result<(), HistoryError>;

    /// Stages all working-tree changes under `path` and records one
    /// revision with `message`. Having nothing to commit is success.
    fn commit(&self, path: &Path, message: &str) -> Result<(), HistoryError>;
}

/// History store backed by the `git` binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct GitHistory;

impl GitHistory {
    /// Creates a new git-backed history store.
    pub fn new() -> Self {
        Self
    }

    fn run(op: &'static str, path: &Path, args: &[&str]) -> Result<RunOutput, HistoryError> {
        let output = Command::new("git")
            .args(args)
            .current_dir(path)
            .output()
            .map_err(|e| HistoryError {
                op,
                detail: e.to_string(),
            })?;
        Ok(RunOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

struct RunOutput {
    success: bool,
    stdout: String,
    stderr: String,
}

impl RunOutput {
    fn streams(&self) -> String {
        format!("{}\nOutput: {}", self.stderr.trim(), self.stdout.trim())
    }
}

impl History for GitHistory {
    fn init(&self, path: &Path) -> Result<(), HistoryError> {
        // `git init` re-initializes an existing repository and exits zero,
        // which gives the required idempotence for free.
        let out = Self::run("init", path, &["init"])?;
        if out.success {
            Ok(())
        } else {
            Err(HistoryError {
                op: "init",
                detail: out.streams(),
            })
        }
    }

    fn commit(&self, path: &Path, message: &str) -> Result<(), HistoryError> {
        let add = Self::run("add", path, &["add", "."])?;
        if !add.success {
            return Err(HistoryError {
                op: "add",
                detail: add.streams(),
            });
        }

        let commit = Self::run("commit", path, &["commit", "-m", message])?;
        let nothing_to_commit = commit.stdout.contains("nothing to commit")
            || commit.stderr.contains("nothing to commit");
        if commit.success || nothing_to_commit {
            Ok(())
        } else {
            Err(HistoryError {
                op: "commit",
                detail: commit.streams(),
            })
        }
    }
}

/// In-memory history store for tests.
///
/// Records every init and commit so a test can assert that a mutation
/// produced exactly one revision.
#[derive(Debug, Default)]
pub struct MemoryHistory {
    inits: Mutex<Vec<PathBuf>>,
    commits: Mutex<Vec<(PathBuf, String)>>,
}

impl MemoryHistory {
    /// Creates an empty in-memory history store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every recorded init path.
    pub fn inits(&self) -> Vec<PathBuf> {
        self.inits.lock().clone()
    }

    /// Returns every recorded commit as `(path, message)`.
    pub fn commits(&self) -> Vec<(PathBuf, String)> {
        self.commits.lock().clone()
    }

    /// Counts commits recorded at or below `prefix`.
    pub fn commit_count(&self, prefix: &Path) -> usize {
        self.commits
            .lock()
            .iter()
            .filter(|(path, _)| path.starts_with(prefix))
            .count()
    }
}

impl History for MemoryHistory {
    fn init(&self, path: &Path) -> Result<(), HistoryError> {
        self.inits.lock().push(path.to_path_buf());
        Ok(())
    }

    fn commit(&self, path: &Path, message: &str) -> Result<(), HistoryError> {
        self.commits
            .lock()
            .push((path.to_path_buf(), message.to_string()));
        Ok(())
    }
}
