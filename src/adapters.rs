//! Conversions from file configuration to runtime types.

use std::time::Duration;

use unfurl_config::{Config, ConfigError};
use unfurl_core::{ExpanderConfig, Selector};

fn selector(field: &str, value: &str) -> Result<Selector, ConfigError> {
    Selector::new(value).map_err(|e| ConfigError::InvalidValue {
        field: field.to_string(),
        message: e.to_string(),
    })
}

/// Build the controller configuration from the `[selectors]`, `[timing]` and
/// `[traversal]` sections.
pub(crate) fn expander_config(config: &Config) -> Result<ExpanderConfig, ConfigError> {
    let selectors = &config.selectors;
    let timing = &config.timing;

    Ok(ExpanderConfig::default()
        .with_selectors(
            selector("selectors.candidate", &selectors.candidate)?,
            selector("selectors.exclude", &selectors.exclude)?,
            selector("selectors.container", &selectors.container)?,
        )
        .with_action_delay(Duration::from_millis(timing.action_delay_ms))
        .with_debounce(Duration::from_millis(timing.debounce_ms))
        .with_grace(
            Duration::from_millis(timing.initial_grace_ms),
            Duration::from_millis(timing.settle_grace_ms),
        )
        .with_max_depth(config.traversal.max_depth))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_expander_defaults() {
        let config = expander_config(&Config::default()).unwrap();
        assert_eq!(config, ExpanderConfig::default());
    }

    #[test]
    fn test_timing_is_converted_to_durations() {
        let mut config = Config::default();
        config.timing.action_delay_ms = 50;
        config.timing.settle_grace_ms = 5000;
        config.traversal.max_depth = 4;

        let expander = expander_config(&config).unwrap();
        assert_eq!(expander.action_delay, Duration::from_millis(50));
        assert_eq!(expander.settle_grace, Duration::from_secs(5));
        assert_eq!(expander.max_depth, 4);
    }

    #[test]
    fn test_blank_selector_is_rejected() {
        let mut config = Config::default();
        config.selectors.exclude = "  ".to_string();

        match expander_config(&config) {
            Err(ConfigError::InvalidValue { field, .. }) => {
                assert_eq!(field, "selectors.exclude");
            }
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
    }
}
