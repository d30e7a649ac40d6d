//! Error types for record-store access and policy construction.
//!
//! `RecordStoreError` is produced at the point of failure so that classification can use
//! the structured variant instead of sniffing message text. Its `Display` output keeps the
//! same keywords the text classifier looks for, so errors that are flattened to strings
//! (e.g. after crossing an FFI or a logging boundary) still classify identically.
use crate::classify::Category;
use std::time::Duration;
use thiserror::Error;

/// Failure raised by a record-store client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordStoreError {
    /// The request never reached the server or the connection dropped.
    #[error("network error: {message}")]
    Network { message: String },
    /// The request did not complete before the caller's deadline.
    #[error("network request timed out after {elapsed:?} (limit: {limit:?})")]
    Timeout { elapsed: Duration, limit: Duration },
    /// The remote API answered with a non-success status.
    #[error("Airtable API Error: {status} - {message}")]
    Api { status: u16, message: String },
    /// The local session is missing or no longer valid.
    #[error("authentication failed: {message}")]
    Auth { message: String },
    /// The current role may not perform the operation.
    #[error("permission denied: {message}")]
    Permission { message: String },
    /// A record failed local validation before it was sent.
    #[error("validation failed for `{field}`: {message}")]
    Validation { field: String, message: String },
    /// Session persistence failed (quota, unavailable backend, ...).
    #[error("storage error: {message}")]
    Storage { message: String },
    /// A view could not be rendered from the data it was given.
    #[error("render error: {message}")]
    Render { message: String },
}

impl RecordStoreError {
    /// Shorthand for an API failure with a status code.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api { status, message: message.into() }
    }

    /// Shorthand for a transport-level failure.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network { message: message.into() }
    }

    /// Shorthand for a session failure.
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth { message: message.into() }
    }

    /// Category implied by the variant.
    pub fn category(&self) -> Category {
        match self {
            Self::Network { .. } | Self::Timeout { .. } => Category::Network,
            Self::Api { .. } => Category::Api,
            Self::Auth { .. } => Category::Auth,
            Self::Permission { .. } => Category::Permission,
            Self::Validation { .. } => Category::Validation,
            Self::Storage { .. } => Category::Storage,
            Self::Render { .. } => Category::Render,
        }
    }

    /// HTTP status for API failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Errors produced while building retry options.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// `max_attempts` must be > 0.
    #[error("max_attempts must be > 0 (got {0})")]
    InvalidMaxAttempts(usize),
    /// `initial_delay` must be > 0.
    #[error("initial_delay must be greater than zero")]
    InvalidInitialDelay,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_display_embeds_status() {
        let err = RecordStoreError::api(401, "bad token");
        assert_eq!(err.to_string(), "Airtable API Error: 401 - bad token");
        assert_eq!(err.status(), Some(401));
    }

    #[test]
    fn timeout_is_a_network_failure() {
        let err = RecordStoreError::Timeout {
            elapsed: Duration::from_millis(5010),
            limit: Duration::from_secs(5),
        };
        assert_eq!(err.category(), Category::Network);
        assert!(err.to_string().contains("network"));
    }

    #[test]
    fn only_api_failures_carry_a_status() {
        assert_eq!(RecordStoreError::api(503, "x").status(), Some(503));
        assert_eq!(RecordStoreError::auth("expired").status(), None);
        assert_eq!(RecordStoreError::network("reset").status(), None);
    }

    #[test]
    fn validation_display_names_field() {
        let err = RecordStoreError::Validation {
            field: "email".into(),
            message: "is required".into(),
        };
        assert_eq!(err.to_string(), "validation failed for `email`: is required");
        assert_eq!(err.category(), Category::Validation);
    }

    #[test]
    fn build_error_display() {
        assert_eq!(BuildError::InvalidMaxAttempts(0).to_string(), "max_attempts must be > 0 (got 0)");
        assert!(BuildError::InvalidInitialDelay.to_string().contains("initial_delay"));
    }
}
