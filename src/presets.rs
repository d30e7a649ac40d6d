//! Retry presets per record-store operation.
//!
//! Reads and updates are idempotent and get the full default budget. Creates and deletes
//! are limited to two attempts: a create whose response was lost may already have
//! produced a record, and a repeated delete may hit a record that is already gone.
//!
//! | operation | attempts | first delay | backoff     | never retried |
//! |-----------|----------|-------------|-------------|---------------|
//! | Fetch     | 3        | 1000 ms     | exponential | 401, 403      |
//! | Update    | 3        | 1000 ms     | exponential | 401, 403      |
//! | Create    | 2        | 1000 ms     | exponential | 401, 403      |
//! | Delete    | 2        | 1000 ms     | exponential | 401, 403      |

use crate::retry::{RetryOptions, RetryOptionsBuilder, DEFAULT_MAX_ATTEMPTS};
use std::fmt;

const WRITE_ONCE_MAX_ATTEMPTS: usize = 2;

/// Kind of record-store call being protected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Fetch,
    Create,
    Update,
    Delete,
}

impl Operation {
    /// Total attempts allowed for this operation.
    pub fn max_attempts(&self) -> usize {
        match self {
            Self::Fetch | Self::Update => DEFAULT_MAX_ATTEMPTS,
            Self::Create | Self::Delete => WRITE_ONCE_MAX_ATTEMPTS,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builder pre-filled for `operation`, for call sites that want to tweak the preset.
pub fn builder_for(operation: Operation) -> RetryOptionsBuilder {
    RetryOptions::builder().max_attempts(operation.max_attempts())
}

/// Preset options for `operation` with the production sleeper.
pub fn options_for(operation: Operation) -> RetryOptions {
    builder_for(operation).build().expect("valid retry preset")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Backoff;
    use std::time::Duration;

    #[test]
    fn writes_with_side_effects_get_two_attempts() {
        assert_eq!(options_for(Operation::Create).max_attempts(), 2);
        assert_eq!(options_for(Operation::Delete).max_attempts(), 2);
        assert_eq!(options_for(Operation::Fetch).max_attempts(), 3);
        assert_eq!(options_for(Operation::Update).max_attempts(), 3);
    }

    #[test]
    fn presets_share_backoff_and_matchers() {
        for op in [Operation::Fetch, Operation::Create, Operation::Update, Operation::Delete] {
            let options = options_for(op);
            assert_eq!(options.backoff(), Backoff::exponential(Duration::from_millis(1000)));
            assert!(options.non_retryable_match("401 Unauthorized").is_some(), "{}", op);
        }
    }
}
