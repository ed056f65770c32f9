//! Selector type shared between the core and tree backends.
//!
//! A selector is an opaque CSS-style predicate string. The core never
//! interprets it; each backend evaluates it with its own engine.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TreeError;

/// A non-empty CSS-style selector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Selector(String);

impl Selector {
    /// Create a selector, rejecting blank input.
    pub fn new(selector: impl Into<String>) -> Result<Self, TreeError> {
        let selector = selector.into();
        let trimmed = selector.trim();
        if trimmed.is_empty() {
            return Err(TreeError::invalid_selector(selector, "selector is empty"));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Selector from a compile-time constant. Blank input yields `*`.
    pub fn from_static(selector: &'static str) -> Self {
        match selector.trim() {
            "" => Self("*".to_string()),
            trimmed => Self(trimmed.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Selector {
    type Err = TreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Selector {
    type Error = TreeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Selector> for String {
    fn from(selector: Selector) -> Self {
        selector.0
    }
}

impl AsRef<str> for Selector {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
