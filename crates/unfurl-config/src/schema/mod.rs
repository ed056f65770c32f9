//! Configuration schema definitions.

use serde::{Deserialize, Serialize};

mod schema_runtime;

pub use schema_runtime::*;

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub selectors: SelectorsConfig,

    #[serde(default)]
    pub timing: TimingConfig,

    #[serde(default)]
    pub traversal: TraversalConfig,

    #[serde(default)]
    pub browser: BrowserConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which nodes are candidates, which are skipped, and how processed nodes
/// are tagged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorsConfig {
    /// Nodes carrying an expansion action.
    #[serde(default = "default_candidate")]
    pub candidate: String,

    /// Candidates inside a match are skipped (loading placeholders).
    #[serde(default = "default_exclude")]
    pub exclude: String,

    /// Inserted nodes matching or containing this trigger a re-scan.
    #[serde(default = "default_container")]
    pub container: String,

    /// Attribute written onto processed nodes.
    #[serde(default = "default_marker")]
    pub marker: String,
}

impl Default for SelectorsConfig {
    fn default() -> Self {
        Self {
            candidate: default_candidate(),
            exclude: default_exclude(),
            container: default_container(),
            marker: default_marker(),
        }
    }
}

fn default_candidate() -> String {
    r#"faceplate-partial[src*="/svc/shreddit/more-comments/"] button"#.to_string()
}

fn default_exclude() -> String {
    r#"[slot="loading"]"#.to_string()
}

fn default_container() -> String {
    "faceplate-partial".to_string()
}

fn default_marker() -> String {
    "data-unfurl-processed".to_string()
}

/// Pacing and grace periods, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Pause between consecutive actions.
    #[serde(default = "default_action_delay")]
    pub action_delay_ms: u64,

    /// Quiet time after the last relevant change before re-scanning.
    #[serde(default = "default_debounce")]
    pub debounce_ms: u64,

    /// Grace when the very first scan finds nothing.
    #[serde(default = "default_initial_grace")]
    pub initial_grace_ms: u64,

    /// Grace in every other case.
    #[serde(default = "default_settle_grace")]
    pub settle_grace_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            action_delay_ms: default_action_delay(),
            debounce_ms: default_debounce(),
            initial_grace_ms: default_initial_grace(),
            settle_grace_ms: default_settle_grace(),
        }
    }
}

fn default_action_delay() -> u64 {
    200
}

fn default_debounce() -> u64 {
    500
}

fn default_initial_grace() -> u64 {
    1000
}

fn default_settle_grace() -> u64 {
    3000
}

/// Traversal limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraversalConfig {
    /// Maximum nesting of encapsulated sub-trees a scan enters.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
        }
    }
}

fn default_max_depth() -> usize {
    64
}
