//! Runtime configuration of an expansion run.

use std::time::Duration;

use unfurl_protocols::Selector;

use crate::error::ExpanderError;

/// Default candidate selector: "load more" buttons of lazily fetched
/// comment partials.
pub const DEFAULT_CANDIDATE: &str =
    r#"faceplate-partial[src*="/svc/shreddit/more-comments/"] button"#;
/// Loading placeholders are not clickable yet.
pub const DEFAULT_EXCLUDE: &str = r#"[slot="loading"]"#;
pub const DEFAULT_CONTAINER: &str = "faceplate-partial";

/// Selectors, pacing and grace periods for one controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpanderConfig {
    /// Nodes carrying an expansion action.
    pub candidate: Selector,
    /// Candidates inside a node matching this are skipped.
    pub exclude: Selector,
    /// Inserted nodes matching (or containing) this trigger a re-scan.
    pub container: Selector,
    /// Pause between two consecutive actions.
    pub action_delay: Duration,
    /// Quiet time after the last relevant mutation before re-scanning.
    pub debounce: Duration,
    /// Grace used when the very first scan of a run finds nothing.
    pub initial_grace: Duration,
    /// Grace used in every other case.
    pub settle_grace: Duration,
    /// Maximum nesting of encapsulated sub-trees visited by a scan.
    pub max_depth: usize,
}

impl Default for ExpanderConfig {
    fn default() -> Self {
        Self {
            candidate: Selector::from_static(DEFAULT_CANDIDATE),
            exclude: Selector::from_static(DEFAULT_EXCLUDE),
            container: Selector::from_static(DEFAULT_CONTAINER),
            action_delay: Duration::from_millis(200),
            debounce: Duration::from_millis(500),
            initial_grace: Duration::from_millis(1000),
            settle_grace: Duration::from_millis(3000),
            max_depth: 64,
        }
    }
}

impl ExpanderConfig {
    pub fn with_selectors(
        mut self,
        candidate: Selector,
        exclude: Selector,
        container: Selector,
    ) -> Self {
        self.candidate = candidate;
        self.exclude = exclude;
        self.container = container;
        self
    }

    pub fn with_action_delay(mut self, delay: Duration) -> Self {
        self.action_delay = delay;
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_grace(mut self, initial: Duration, settle: Duration) -> Self {
        self.initial_grace = initial;
        self.settle_grace = settle;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Reject values the run loop cannot work with.
    pub fn validate(&self) -> Result<(), ExpanderError> {
        if self.initial_grace.is_zero() {
            return Err(ExpanderError::invalid(
                "initial_grace",
                "must be greater than zero",
            ));
        }
        if self.settle_grace.is_zero() {
            return Err(ExpanderError::invalid(
                "settle_grace",
                "must be greater than zero",
            ));
        }
        if self.debounce.is_zero() {
            return Err(ExpanderError::invalid("debounce", "must be greater than zero"));
        }
        if self.max_depth == 0 {
            return Err(ExpanderError::invalid("max_depth", "must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ExpanderConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.settle_grace, Duration::from_secs(3));
        assert_eq!(config.container.as_str(), "faceplate-partial");
    }

    #[test]
    fn test_zero_grace_rejected() {
        let config = ExpanderConfig::default().with_grace(Duration::ZERO, Duration::from_secs(3));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("initial_grace"));
    }

    #[test]
    fn test_zero_depth_rejected() {
        let config = ExpanderConfig::default().with_max_depth(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_action_delay_allowed() {
        let config = ExpanderConfig::default().with_action_delay(Duration::ZERO);
        assert!(config.validate().is_ok());
    }
}
