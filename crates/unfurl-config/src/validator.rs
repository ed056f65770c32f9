//! Configuration validation.

use crate::error::ConfigError;
use crate::schema::Config;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// First error as a [`ConfigError`], if any.
    pub fn into_error(self) -> Option<ConfigError> {
        self.errors
            .into_iter()
            .next()
            .map(|e| ConfigError::InvalidValue {
                field: e.path,
                message: e.message,
            })
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> Result<ValidationResult, ConfigError> {
        let mut result = ValidationResult::default();

        Self::validate_selectors(config, &mut result);
        Self::validate_timing(config, &mut result);
        Self::validate_traversal(config, &mut result);
        Self::validate_browser(config, &mut result);
        Self::validate_logging(config, &mut result);

        Ok(result)
    }

    fn validate_selectors(config: &Config, result: &mut ValidationResult) {
        let selectors = &config.selectors;
        for (path, value) in [
            ("selectors.candidate", &selectors.candidate),
            ("selectors.exclude", &selectors.exclude),
            ("selectors.container", &selectors.container),
        ] {
            if value.trim().is_empty() {
                result.add_error(ValidationError::new(path, "Selector cannot be empty"));
            }
        }

        let marker = selectors.marker.as_str();
        if marker.is_empty() {
            result.add_error(ValidationError::new(
                "selectors.marker",
                "Marker attribute cannot be empty",
            ));
        } else if !marker
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            result.add_error(ValidationError::new(
                "selectors.marker",
                format!("'{}' is not a valid attribute name", marker),
            ));
        } else if !marker.starts_with("data-") {
            result.add_warning(ValidationWarning::new(
                "selectors.marker",
                "Marker attribute does not start with 'data-', it may clash with page attributes",
            ));
        }
    }

    fn validate_timing(config: &Config, result: &mut ValidationResult) {
        let timing = &config.timing;
        for (path, value) in [
            ("timing.debounce_ms", timing.debounce_ms),
            ("timing.initial_grace_ms", timing.initial_grace_ms),
            ("timing.settle_grace_ms", timing.settle_grace_ms),
        ] {
            if value == 0 {
                result.add_error(ValidationError::new(path, "Must be greater than 0"));
            }
        }

        if timing.action_delay_ms == 0 {
            result.add_warning(ValidationWarning::new(
                "timing.action_delay_ms",
                "No delay between actions, the page may be flooded with requests",
            ));
        }

        if timing.initial_grace_ms > timing.settle_grace_ms {
            result.add_warning(ValidationWarning::new(
                "timing.initial_grace_ms",
                "initial_grace_ms is longer than settle_grace_ms",
            ));
        }

        if timing.settle_grace_ms <= timing.debounce_ms {
            result.add_warning(ValidationWarning::new(
                "timing.settle_grace_ms",
                "settle_grace_ms does not exceed debounce_ms, runs may complete before a pending re-scan",
            ));
        }
    }

    fn validate_traversal(config: &Config, result: &mut ValidationResult) {
        if config.traversal.max_depth == 0 {
            result.add_error(ValidationError::new(
                "traversal.max_depth",
                "max_depth must be at least 1",
            ));
        }
    }

    fn validate_browser(config: &Config, result: &mut ValidationResult) {
        let endpoint = &config.browser.endpoint;
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            result.add_error(ValidationError::new(
                "browser.endpoint",
                "endpoint must start with http:// or https://",
            ));
        }

        if config.browser.request_timeout_secs == 0 {
            result.add_error(ValidationError::new(
                "browser.request_timeout_secs",
                "request_timeout_secs must be greater than 0",
            ));
        }

        if config.browser.load_timeout_secs == 0 {
            result.add_error(ValidationError::new(
                "browser.load_timeout_secs",
                "load_timeout_secs must be greater than 0",
            ));
        }
    }

    fn validate_logging(config: &Config, result: &mut ValidationResult) {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        let level = config.logging.level.to_ascii_lowercase();
        // Full filter directives such as "unfurl_core=debug" are passed through.
        if !level.contains('=') && !valid_levels.contains(&level.as_str()) {
            result.add_warning(ValidationWarning::new(
                "logging.level",
                format!(
                    "Unknown log level '{}', valid values: {:?}",
                    config.logging.level, valid_levels
                ),
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
