//! Per-session state.
//!
//! A session is keyed by the opaque `Session-ID` the client sends with
//! every request. It carries only the selected database and an activity
//! instant; there is no authentication. Sessions are created lazily on
//! first reference and evicted by the engine's sweeper after 30 minutes
//! of inactivity.

use std::time::{Duration, Instant};

use parking_lot::RwLock;

/// State bound to one opaque session identifier.
pub struct Session {
    current_database: RwLock<Option<String>>,
    last_active: RwLock<Instant>,
}

impl Session {
    pub(crate) fn new() -> Self {
        Self {
            current_database: RwLock::new(None),
            last_active: RwLock::new(Instant::now()),
        }
    }

    /// Returns the database selected by USE DATABASE, if any.
    pub fn current_database(&self) -> Option<String> {
        self.current_database.read().clone()
    }

    pub(crate) fn set_database(&self, name: &str) {
        *self.current_database.write() = Some(name.to_string());
    }

    /// Marks the session active now.
    pub(crate) fn touch(&self) {
        *self.last_active.write() = Instant::now();
    }

    /// Returns how long the session has been idle.
    pub fn idle_for(&self) -> Duration {
        self.last_active.read().elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_database_selection() {
        let session = Session::new();
        assert_eq!(session.current_database(), None);

        session.set_database("shop");
        assert_eq!(session.current_database(), Some("shop".to_string()));
    }

    #[test]
    fn test_touch_resets_idle_time() {
        let session = Session::new();
        std::thread::sleep(Duration::from_millis(20));
        assert!(session.idle_for() >= Duration::from_millis(20));

        session.touch();
        assert!(session.idle_for() < Duration::from_millis(20));
    }
}
