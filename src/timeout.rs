//! Deadline for a single record-store call.
//!
//! Retry runs to completion once started; callers that need an upper bound race each
//! attempt against a `TimeoutPolicy`. An expired attempt yields
//! `RecordStoreError::Timeout`, which classifies as a network failure.

use crate::RecordStoreError;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Largest accepted deadline (1 hour).
pub const MAX_TIMEOUT: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutPolicy {
    limit: Duration,
}

impl TimeoutPolicy {
    /// Deadline clamped to `1ms..=MAX_TIMEOUT`.
    pub fn new(limit: Duration) -> Self {
        Self { limit: limit.clamp(Duration::from_millis(1), MAX_TIMEOUT) }
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }

    /// Await `operation`, failing with `Timeout` once the deadline passes.
    pub async fn execute<T, Fut>(&self, operation: Fut) -> Result<T, RecordStoreError>
    where
        Fut: Future<Output = Result<T, RecordStoreError>>,
    {
        let start = Instant::now();
        match tokio::time::timeout(self.limit, operation).await {
            Ok(result) => result,
            Err(_) => {
                let elapsed = start.elapsed();
                tracing::debug!(limit = ?self.limit, ?elapsed, "record store call timed out");
                Err(RecordStoreError::Timeout { elapsed, limit: self.limit })
            }
        }
    }
}
