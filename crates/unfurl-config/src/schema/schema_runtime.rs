//! Runtime configuration types (browser connection, logging).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Chrome DevTools endpoint and timeouts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// HTTP endpoint of the DevTools server.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Timeout for a single protocol request.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// How long to wait for a page to finish loading.
    #[serde(default = "default_load_timeout")]
    pub load_timeout_secs: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            request_timeout_secs: default_request_timeout(),
            load_timeout_secs: default_load_timeout(),
        }
    }
}

fn default_endpoint() -> String {
    "http://localhost:9222".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_load_timeout() -> u64 {
    30
}

/// Log output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is not set.
    #[serde(default = "default_level")]
    pub level: String,

    /// Also write daily-rotated log files.
    #[serde(default)]
    pub file: bool,

    /// Directory for log files. Defaults to `~/.unfurl/logs`.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            file: false,
            dir: None,
        }
    }
}

impl LoggingConfig {
    /// Log directory with `~` expanded.
    pub fn log_dir(&self) -> PathBuf {
        match &self.dir {
            Some(dir) => PathBuf::from(shellexpand::tilde(&dir.to_string_lossy()).to_string()),
            None => dirs::home_dir()
                .map(|home| home.join(".unfurl").join("logs"))
                .unwrap_or_else(|| PathBuf::from(".unfurl/logs")),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}
