//! # unfurl Config
//!
//! TOML configuration for unfurl: selectors, pacing, traversal limits,
//! browser connection and logging.

mod error;
mod loader;
mod schema;
mod validator;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
pub use validator::{ConfigValidator, ValidationError, ValidationResult, ValidationWarning};
