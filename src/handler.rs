//! Consumer side of classification: logging, history, presentation and session reset.
//!
//! The classifier never performs side effects. `ErrorHandler` owns them, reaching the
//! outside world only through two injected traits:
//!
//! - [`Notifier`]: the presentation layer (toast or modal).
//! - [`SessionControl`]: persisted session state and the re-authentication entry point.
//!
//! For a `Critical` auth failure the handler shows a modal, waits `reauth_delay` so the
//! user can read it, clears the session and then triggers re-authentication.

use crate::classify::{Category, ClassifiedError, ErrorClassifier, ErrorContext, Presentation, Severity};
use crate::history::ErrorLog;
use crate::{Sleeper, TokioSleeper};
use std::sync::Arc;
use std::time::Duration;

/// Pause between showing a critical error and redirecting.
pub const DEFAULT_REAUTH_DELAY: Duration = Duration::from_secs(2);

/// Presentation layer.
pub trait Notifier: Send + Sync {
    fn notify(&self, error: &ClassifiedError, presentation: Presentation);
}

/// Session persistence and navigation owned by the authentication consumer.
pub trait SessionControl: Send + Sync {
    /// Remove any persisted session token.
    fn clear_session(&self);
    /// Send the user to the login entry point.
    fn reauthenticate(&self);
}

/// What the handler decided for one error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryPlan {
    pub presentation: Presentation,
    /// `Some(delay)` when the session must be reset after `delay`.
    pub reset_session_after: Option<Duration>,
}

impl RecoveryPlan {
    /// Pure decision used by [`ErrorHandler::handle`].
    pub fn for_error(error: &ClassifiedError, reauth_delay: Duration) -> Self {
        Self {
            presentation: error.presentation(),
            reset_session_after: error.requires_reauthentication().then_some(reauth_delay),
        }
    }

    pub fn resets_session(&self) -> bool {
        self.reset_session_after.is_some()
    }
}

/// Classifies, records and reacts to failures.
pub struct ErrorHandler<N, S> {
    classifier: ErrorClassifier,
    log: ErrorLog,
    notifier: N,
    session: S,
    sleeper: Arc<dyn Sleeper>,
    reauth_delay: Duration,
}

impl<N, S> std::fmt::Debug for ErrorHandler<N, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorHandler")
            .field("classifier", &self.classifier)
            .field("log_len", &self.log.len())
            .field("reauth_delay", &self.reauth_delay)
            .finish_non_exhaustive()
    }
}

impl<N: Notifier, S: SessionControl> ErrorHandler<N, S> {
    pub fn new(notifier: N, session: S) -> Self {
        Self {
            classifier: ErrorClassifier::new(),
            log: ErrorLog::new(),
            notifier,
            session,
            sleeper: Arc::new(TokioSleeper),
            reauth_delay: DEFAULT_REAUTH_DELAY,
        }
    }

    pub fn with_classifier(mut self, classifier: ErrorClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Record into an existing (possibly shared) log.
    pub fn with_log(mut self, log: ErrorLog) -> Self {
        self.log = log;
        self
    }

    pub fn with_sleeper<Z: Sleeper + 'static>(mut self, sleeper: Z) -> Self {
        self.sleeper = Arc::new(sleeper);
        self
    }

    pub fn with_reauth_delay(mut self, delay: Duration) -> Self {
        self.reauth_delay = delay;
        self
    }

    pub fn log(&self) -> &ErrorLog {
        &self.log
    }

    pub fn classifier(&self) -> &ErrorClassifier {
        &self.classifier
    }

    /// Classify `error` and carry out the resulting plan.
    pub async fn handle(
        &self,
        error: &(dyn std::error::Error + 'static),
        context: &ErrorContext,
    ) -> (ClassifiedError, RecoveryPlan) {
        let classified = self.classifier.classify(error, context);
        let plan = self.react(&classified).await;
        (classified, plan)
    }

    /// Same as [`handle`](Self::handle) for a bare message.
    pub async fn handle_message(
        &self,
        message: &str,
        context: &ErrorContext,
    ) -> (ClassifiedError, RecoveryPlan) {
        let classified = self.classifier.classify_message(message, context);
        let plan = self.react(&classified).await;
        (classified, plan)
    }

    async fn react(&self, classified: &ClassifiedError) -> RecoveryPlan {
        trace_classified(classified);
        self.log.record(classified.clone());

        let plan = RecoveryPlan::for_error(classified, self.reauth_delay);
        self.notifier.notify(classified, plan.presentation);

        if let Some(delay) = plan.reset_session_after {
            tracing::warn!(?delay, "resetting session after critical auth failure");
            self.sleeper.sleep(delay).await;
            self.session.clear_session();
            self.session.reauthenticate();
        }
        plan
    }
}

fn trace_classified(error: &ClassifiedError) {
    let category = error.category.as_str();
    match error.severity {
        Severity::Critical => tracing::error!(category, error = %error.raw_message, "critical error"),
        Severity::High => tracing::error!(category, error = %error.raw_message, "error"),
        Severity::Medium => tracing::warn!(category, error = %error.raw_message, "error"),
        Severity::Low => tracing::info!(category, error = %error.raw_message, "error"),
    }
    if error.category == Category::Unknown {
        tracing::debug!(context = ?error.context, "unclassified error");
    }
}
