//! Bounded history of classified errors.
//!
//! `ErrorLog` is an explicitly owned ring buffer: the oldest entry is evicted once
//! `capacity` is reached. Clones share the same buffer, so one log can be handed to the
//! handler and to a diagnostics view at the same time. It also implements
//! `tower::Service<ClassifiedError>` so it can be used anywhere a sink is expected.
//!
//! ```rust
//! use recordguard::classify::{classify_message, ErrorContext};
//! use recordguard::history::ErrorLog;
//!
//! let log = ErrorLog::with_capacity(2);
//! for msg in ["Failed to fetch", "session expired", "something obscure"] {
//!     log.record(classify_message(msg, &ErrorContext::new()));
//! }
//! assert_eq!(log.len(), 2);
//! assert_eq!(log.evicted(), 1);
//! ```

use crate::classify::{ClassifiedError, Severity};
use std::collections::VecDeque;
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};
use tower_service::Service;

/// Default number of retained entries.
pub const DEFAULT_CAPACITY: usize = 100;

#[derive(Clone, Debug)]
pub struct ErrorLog {
    entries: Arc<Mutex<VecDeque<ClassifiedError>>>,
    capacity: usize,
    evicted: Arc<AtomicU64>,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Capacity is clamped to at least 1.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
            evicted: Arc::new(AtomicU64::new(0)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<ClassifiedError>> {
        // A panic while holding the lock cannot leave the deque half-updated.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append an entry, evicting the oldest when full.
    pub fn record(&self, error: ClassifiedError) {
        let mut guard = self.lock();
        if guard.len() >= self.capacity {
            guard.pop_front();
            self.evicted.fetch_add(1, Ordering::Relaxed);
        }
        guard.push_back(error);
    }

    /// Snapshot, oldest first.
    pub fn entries(&self) -> Vec<ClassifiedError> {
        self.lock().iter().cloned().collect()
    }

    /// Most recent `n` entries, oldest first.
    pub fn recent(&self, n: usize) -> Vec<ClassifiedError> {
        let guard = self.lock();
        let skip = guard.len().saturating_sub(n);
        guard.iter().skip(skip).cloned().collect()
    }

    /// Entries at or above `min` severity.
    pub fn at_least(&self, min: Severity) -> Vec<ClassifiedError> {
        self.lock().iter().filter(|e| e.severity >= min).cloned().collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries dropped because the buffer was full.
    pub fn evicted(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }

    /// Pretty-printed JSON array of the retained entries, oldest first.
    pub fn export_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.entries())
    }
}

impl Default for ErrorLog {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<ClassifiedError> for ErrorLog {
    type Response = ();
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<(), Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, error: ClassifiedError) -> Self::Future {
        self.record(error);
        Box::pin(async { Ok(()) })
    }
}
