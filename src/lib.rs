#![forbid(unsafe_code)]
#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::all))]

//! # recordguard
//!
//! Retry and error-classification primitives for clients of a hosted record store
//! (Airtable-style REST APIs).
//!
//! ## Features
//!
//! - **Retry** with fixed or exponential backoff, bounded attempts, and a non-retryable
//!   list that surfaces authorization failures immediately
//! - **Classification** of failures into a closed set of categories with severity,
//!   user message, and remediation hints
//! - **Error history** as a bounded, explicitly owned ring buffer
//! - **Handler** that applies the consumer obligations (toast/modal, session reset)
//!   through injected traits
//!
//! ## Quick Start
//!
//! ```rust
//! use recordguard::presets::{options_for, Operation};
//! use recordguard::classify::{classify, Category, ErrorContext};
//! use recordguard::{run_with_retry, RecordStoreError};
//!
//! #[tokio::main]
//! async fn main() {
//!     let options = options_for(Operation::Fetch);
//!     let result: Result<Vec<String>, RecordStoreError> = run_with_retry(
//!         || async { Err(RecordStoreError::api(401, "invalid API key")) },
//!         &options,
//!     )
//!     .await;
//!
//!     let err = result.unwrap_err();
//!     let classified = classify(&err, &ErrorContext::for_operation("loadClients"));
//!     assert_eq!(classified.category, Category::Api);
//! }
//! ```

pub mod backoff;
pub mod classify;
pub mod clock;
pub mod config;
pub mod error;
pub mod handler;
pub mod history;
pub mod prelude;
pub mod presets;
pub mod retry;
pub mod sleeper;
pub mod timeout;

// Re-exports
pub use backoff::Backoff;
pub use classify::{Category, ClassifiedError, ErrorClassifier, ErrorContext, Severity};
pub use error::{BuildError, RecordStoreError};
pub use handler::{ErrorHandler, Notifier, RecoveryPlan, SessionControl};
pub use history::ErrorLog;
pub use retry::{run_with_retry, Matcher, RetryLayer, RetryOptions, RetryOptionsBuilder};
pub use sleeper::{InstantSleeper, Sleeper, TokioSleeper, TrackingSleeper};
pub use timeout::TimeoutPolicy;
