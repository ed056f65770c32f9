//! Error types for the expansion core.

use thiserror::Error;

/// Errors surfaced to callers. Tree failures during a run are never surfaced;
/// they are logged and resolved inside the run.
#[derive(Debug, Error)]
pub enum ExpanderError {
    #[error("Invalid configuration for {field}: {message}")]
    InvalidConfig { field: String, message: String },
}

impl ExpanderError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }
}
