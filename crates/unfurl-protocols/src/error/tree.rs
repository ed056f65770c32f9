//! Tree backend errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TreeError {
    #[error("Node no longer in tree: {0}")]
    NodeGone(String),

    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Capability not available: {0}")]
    Unsupported(String),

    #[error("Subscription closed")]
    SubscriptionClosed,

    #[error("Backend error: {0}")]
    Backend(String),
}

impl TreeError {
    pub fn invalid_selector(selector: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSelector {
            selector: selector.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error means the node itself went away, as opposed to the
    /// backend failing.
    pub fn is_node_gone(&self) -> bool {
        matches!(self, Self::NodeGone(_))
    }
}
