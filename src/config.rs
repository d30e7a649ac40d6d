//! Serializable retry configuration.
//!
//! `RetryConfig` is the plain-data form of [`RetryOptions`], suitable for settings files
//! or a JSON blob shipped with the application. Missing fields take the same defaults as
//! the builder; conversion applies the builder's validation.
//!
//! ```rust
//! use recordguard::config::RetryConfig;
//!
//! let config = RetryConfig::from_json(r#"{ "max_attempts": 5, "exponential": false }"#).unwrap();
//! let options = config.into_options().unwrap();
//! assert_eq!(options.max_attempts(), 5);
//! assert!(!options.backoff().is_exponential());
//! ```

use crate::error::BuildError;
use crate::retry::{Matcher, RetryOptions, DEFAULT_INITIAL_DELAY, DEFAULT_MAX_ATTEMPTS};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors loading a retry configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse retry config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid retry config: {0}")]
    Invalid(#[from] BuildError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    pub max_attempts: usize,
    pub initial_delay_ms: u64,
    pub exponential: bool,
    /// Status codes whose mention in an error message disables retry.
    pub non_retryable_statuses: Vec<u16>,
    /// Extra substrings that disable retry.
    pub non_retryable_substrings: Vec<String>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay_ms: DEFAULT_INITIAL_DELAY.as_millis() as u64,
            exponential: true,
            non_retryable_statuses: vec![401, 403],
            non_retryable_substrings: Vec::new(),
        }
    }
}

impl RetryConfig {
    /// Parse a JSON document; fields not present keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Validate and convert into runtime options.
    pub fn into_options(self) -> Result<RetryOptions, BuildError> {
        RetryOptions::try_from(self)
    }
}

/// Parse and validate in one step.
pub fn options_from_json(json: &str) -> Result<RetryOptions, ConfigError> {
    Ok(RetryConfig::from_json(json)?.into_options()?)
}

impl TryFrom<RetryConfig> for RetryOptions {
    type Error = BuildError;

    fn try_from(config: RetryConfig) -> Result<Self, Self::Error> {
        let mut builder = RetryOptions::builder()
            .retry_everything()
            .max_attempts(config.max_attempts)
            .initial_delay(Duration::from_millis(config.initial_delay_ms))
            .exponential(config.exponential);
        for status in config.non_retryable_statuses {
            builder = builder.non_retryable_status(status);
        }
        for needle in config.non_retryable_substrings {
            builder = builder.non_retryable(Matcher::contains(needle));
        }
        builder.build()
    }
}
