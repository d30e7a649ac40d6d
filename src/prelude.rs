//! Convenient re-exports for common recordguard types.
pub use crate::{
    backoff::{Backoff, MAX_BACKOFF},
    classify::{
        classify, classify_message, Category, ClassifiedError, ErrorClassifier, ErrorContext,
        Presentation, Severity,
    },
    clock::{Clock, FixedClock, SystemClock},
    config::{options_from_json, ConfigError, RetryConfig},
    error::{BuildError, RecordStoreError},
    handler::{ErrorHandler, Notifier, RecoveryPlan, SessionControl},
    history::ErrorLog,
    presets::{options_for, Operation},
    retry::{run_with_retry, Matcher, RetryLayer, RetryOptions, RetryOptionsBuilder},
    sleeper::{InstantSleeper, Sleeper, TokioSleeper, TrackingSleeper},
    timeout::TimeoutPolicy,
};
