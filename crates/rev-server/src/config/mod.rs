//! Server configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::database::EngineConfig;

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port for the HTTP endpoint.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Global root directory for databases.
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Log level (error, warn, info, debug, trace).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Seconds of inactivity before a session is evicted.
    #[serde(default = "default_session_timeout")]
    pub session_timeout_secs: u64,

    /// Seconds between session sweeper runs.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_root() -> PathBuf {
    PathBuf::from(".gitdb")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_session_timeout() -> u64 {
    30 * 60
}

fn default_sweep_interval() -> u64 {
    5 * 60
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            root: default_root(),
            log_level: default_log_level(),
            session_timeout_secs: default_session_timeout(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Converts configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Returns the socket address string.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Derives the engine configuration.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            root: self.root.clone(),
            session_timeout: Duration::from_secs(self.session_timeout_secs),
            sweep_interval: Duration::from_secs(self.sweep_interval_secs),
        }
    }
}
