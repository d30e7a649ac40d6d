//! Retry policy for fallible async record-store operations.
//!
//! Semantics:
//! - `max_attempts` counts total attempts (initial try + retries), numbered `1..=N`.
//! - After a failure the error's `Display` text is tested against the non-retryable
//!   matchers; a match surfaces the error immediately, without waiting.
//! - Otherwise, if attempts remain, the policy waits `Backoff::delay(attempt)` on the
//!   injected `Sleeper` and tries again.
//! - When the last attempt fails, that attempt's error is returned unchanged. There is no
//!   wrapper error, so downstream classification sees the real message.
//!
//! Invariants:
//! - The operation is invoked at most `max_attempts` times, exactly once on a
//!   non-retryable match.
//! - The sleeper is invoked exactly `attempts - 1` times, never after a success.
//! - Options are immutable once built; concurrent runs share nothing mutable.
//!
//! Example
//! ```rust
//! use std::time::Duration;
//! use recordguard::{run_with_retry, InstantSleeper, RetryOptions, RecordStoreError};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(async {
//! let options = RetryOptions::builder()
//!     .max_attempts(3)
//!     .initial_delay(Duration::from_millis(100))
//!     .with_sleeper(InstantSleeper)
//!     .build()
//!     .unwrap();
//! let result: Result<(), RecordStoreError> =
//!     run_with_retry(|| async { Err(RecordStoreError::api(401, "bad token")) }, &options).await;
//! assert_eq!(result.unwrap_err().status(), Some(401));
//! # });
//! ```

use crate::error::BuildError;
use crate::{Backoff, Sleeper, TokioSleeper};
use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use tower_layer::Layer;
use tower_service::Service;

/// Default total attempts for reads and updates.
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;
/// Default delay before the first retry.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(1000);

/// Predicate over an error's message text.
#[derive(Clone)]
pub struct Matcher {
    label: String,
    predicate: Arc<dyn Fn(&str) -> bool + Send + Sync>,
}

impl Matcher {
    /// Arbitrary predicate; `label` shows up in logs and `Debug` output.
    pub fn new<F>(label: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self { label: label.into(), predicate: Arc::new(predicate) }
    }

    /// Matches messages containing `needle` (case-sensitive).
    pub fn contains(needle: impl Into<String>) -> Self {
        let needle = needle.into();
        let label = format!("contains {:?}", needle);
        Self::new(label, move |message| message.contains(needle.as_str()))
    }

    /// Matches messages that mention the HTTP status code.
    pub fn status(code: u16) -> Self {
        Self::contains(code.to_string())
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn matches(&self, message: &str) -> bool {
        (self.predicate)(message)
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Matcher").field(&self.label).finish()
    }
}

/// Immutable retry configuration for one call site.
#[derive(Clone)]
pub struct RetryOptions {
    max_attempts: usize,
    backoff: Backoff,
    non_retryable: Vec<Matcher>,
    sleeper: Arc<dyn Sleeper>,
}

impl fmt::Debug for RetryOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryOptions")
            .field("max_attempts", &self.max_attempts)
            .field("backoff", &self.backoff)
            .field("non_retryable", &self.non_retryable)
            .field("sleeper", &"<sleeper>")
            .finish()
    }
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: Backoff::exponential(DEFAULT_INITIAL_DELAY),
            non_retryable: default_non_retryable(),
            sleeper: Arc::new(TokioSleeper),
        }
    }
}

fn default_non_retryable() -> Vec<Matcher> {
    vec![Matcher::status(401), Matcher::status(403)]
}

impl RetryOptions {
    /// Construct a new builder with defaults.
    pub fn builder() -> RetryOptionsBuilder {
        RetryOptionsBuilder::new()
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    pub fn backoff(&self) -> Backoff {
        self.backoff
    }

    pub fn non_retryable(&self) -> &[Matcher] {
        &self.non_retryable
    }

    /// First non-retryable matcher that accepts `message`.
    pub fn non_retryable_match(&self, message: &str) -> Option<&Matcher> {
        self.non_retryable.iter().find(|m| m.matches(message))
    }

    /// Same as [`run_with_retry`] with these options.
    pub async fn execute<T, E, Fut, Op>(&self, operation: Op) -> Result<T, E>
    where
        Op: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        run_with_retry(operation, self).await
    }
}

enum RetryState<T, E> {
    Attempting(usize),
    Waiting(usize),
    Succeeded(T),
    Failed(E),
}

/// Run `operation` under `options`, returning the first success or the last error.
pub async fn run_with_retry<T, E, Fut, Op>(mut operation: Op, options: &RetryOptions) -> Result<T, E>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let mut state = RetryState::Attempting(1);
    loop {
        state = match state {
            RetryState::Attempting(attempt) => match operation().await {
                Ok(value) => RetryState::Succeeded(value),
                Err(err) => {
                    let message = err.to_string();
                    if let Some(matcher) = options.non_retryable_match(&message) {
                        tracing::debug!(
                            attempt,
                            matcher = matcher.label(),
                            error = %message,
                            "non-retryable failure"
                        );
                        RetryState::Failed(err)
                    } else if attempt >= options.max_attempts {
                        tracing::warn!(attempts = attempt, error = %message, "retry attempts exhausted");
                        RetryState::Failed(err)
                    } else {
                        tracing::debug!(attempt, error = %message, "attempt failed");
                        RetryState::Waiting(attempt)
                    }
                }
            },
            RetryState::Waiting(attempt) => {
                let delay = options.backoff.delay(attempt);
                tracing::debug!(next_attempt = attempt + 1, ?delay, "retrying");
                options.sleeper.sleep(delay).await;
                RetryState::Attempting(attempt + 1)
            }
            RetryState::Succeeded(value) => return Ok(value),
            RetryState::Failed(err) => return Err(err),
        };
    }
}

/// Builder for `RetryOptions`.
#[derive(Debug, Clone)]
pub struct RetryOptionsBuilder {
    max_attempts: usize,
    initial_delay: Duration,
    exponential: bool,
    non_retryable: Vec<Matcher>,
    sleeper: Option<Arc<dyn Sleeper>>,
}

impl RetryOptionsBuilder {
    /// 3 attempts, 1s exponential backoff, 401/403 never retried.
    pub fn new() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: DEFAULT_INITIAL_DELAY,
            exponential: true,
            non_retryable: default_non_retryable(),
            sleeper: None,
        }
    }

    /// Set total attempts (initial + retries). Must be > 0.
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Delay before the first retry. Must be > 0.
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Double the delay after every failed attempt (default) or keep it fixed.
    pub fn exponential(mut self, enabled: bool) -> Self {
        self.exponential = enabled;
        self
    }

    /// Add a matcher that disables retry when it accepts the error message.
    pub fn non_retryable(mut self, matcher: Matcher) -> Self {
        self.non_retryable.push(matcher);
        self
    }

    /// Never retry errors whose message mentions `code`.
    pub fn non_retryable_status(self, code: u16) -> Self {
        self.non_retryable(Matcher::status(code))
    }

    /// Drop all matchers, including the 401/403 defaults.
    pub fn retry_everything(mut self) -> Self {
        self.non_retryable.clear();
        self
    }

    /// Provide a custom sleeper implementation.
    pub fn with_sleeper<S>(mut self, sleeper: S) -> Self
    where
        S: Sleeper + 'static,
    {
        self.sleeper = Some(Arc::new(sleeper));
        self
    }

    /// Share an existing sleeper.
    pub fn with_shared_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = Some(sleeper);
        self
    }

    /// Validate and freeze the options.
    pub fn build(self) -> Result<RetryOptions, BuildError> {
        if self.max_attempts == 0 {
            return Err(BuildError::InvalidMaxAttempts(0));
        }
        if self.initial_delay.is_zero() {
            return Err(BuildError::InvalidInitialDelay);
        }
        let backoff = if self.exponential {
            Backoff::exponential(self.initial_delay)
        } else {
            Backoff::fixed(self.initial_delay)
        };
        Ok(RetryOptions {
            max_attempts: self.max_attempts,
            backoff,
            non_retryable: self.non_retryable,
            sleeper: self.sleeper.unwrap_or_else(|| Arc::new(TokioSleeper)),
        })
    }
}

impl Default for RetryOptionsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Tower layer applying `RetryOptions` to a record-store service.
#[derive(Debug, Clone)]
pub struct RetryLayer {
    options: RetryOptions,
}

impl RetryLayer {
    pub fn new(options: RetryOptions) -> Self {
        Self { options }
    }
}

impl<S> Layer<S> for RetryLayer {
    type Service = RetryService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RetryService { inner, options: self.options.clone() }
    }
}

/// Retry service produced by `RetryLayer`. Errors pass through unchanged.
#[derive(Debug, Clone)]
pub struct RetryService<S> {
    inner: S,
    options: RetryOptions,
}

impl<S, Request> Service<Request> for RetryService<S>
where
    Request: Clone + Send + 'static,
    S: Service<Request> + Clone + Send + 'static,
    S::Response: Send + 'static,
    S::Error: fmt::Display + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let options = self.options.clone();
        let inner = self.inner.clone();
        Box::pin(async move {
            let operation = move || {
                let mut svc = inner.clone();
                let req = req.clone();
                async move { svc.ready().await?.call(req).await }
            };
            run_with_retry(operation, &options).await
        })
    }
}
