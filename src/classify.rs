//! Deterministic classification of failures.
//!
//! A failure is mapped to a [`Category`], a [`Severity`], a user-facing message and a
//! fixed list of remediation hints. Errors raised as [`RecordStoreError`] (anywhere in
//! the source chain) are classified from their variant and status alone; keywords in the
//! variant's free text are ignored. Anything else falls back to keyword matching on the
//! lower-cased message, first match wins:
//!
//! | order | category   | keywords                                                   | severity |
//! |-------|------------|------------------------------------------------------------|----------|
//! | 1     | Network    | `fetch`, `network`, `failed to fetch`                      | High     |
//! | 2     | Api        | `airtable`, `api`, `401`, `403`, `404`                     | High     |
//! | 3     | Auth       | `auth`, `login`, `session`, `token`                        | Critical |
//! | 4     | Permission | `permission`, `access denied`, `not allowed`, `forbidden`  | Medium   |
//! | 5     | Validation | `required`, `invalid`, `validation`, `must`                | Low      |
//! | 6     | Storage    | `storage`, `localstorage`, `quota`                         | Medium   |
//! | 7     | Render     | `render`, `undefined`, `null`, or `operation == "render"`  | Medium   |
//! | 8     | Unknown    | anything else                                              | Medium   |
//!
//! Classification has no side effects. Presenting the result, logging it and resetting
//! the session on `Critical` failures belong to [`crate::handler::ErrorHandler`].
//!
//! ```rust
//! use recordguard::classify::{classify_message, Category, ErrorContext, Severity};
//!
//! let classified = classify_message("session expired", &ErrorContext::new());
//! assert_eq!(classified.category, Category::Auth);
//! assert_eq!(classified.severity, Severity::Critical);
//! assert!(classified.recoverable);
//! ```

use crate::clock::{Clock, SystemClock};
use crate::RecordStoreError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

/// Closed set of failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Network,
    Api,
    Auth,
    Permission,
    Validation,
    Storage,
    Render,
    Unknown,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Api => "api",
            Self::Auth => "auth",
            Self::Permission => "permission",
            Self::Validation => "validation",
            Self::Storage => "storage",
            Self::Render => "render",
            Self::Unknown => "unknown",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::Network | Self::Api => Severity::High,
            Self::Auth => Severity::Critical,
            Self::Validation => Severity::Low,
            Self::Permission | Self::Storage | Self::Render | Self::Unknown => Severity::Medium,
        }
    }

    /// Static remediation hints, never empty.
    pub fn suggestions(&self) -> &'static [&'static str] {
        match self {
            Self::Network => &[
                "Check your internet connection",
                "Try refreshing the page",
                "Contact IT support if the problem persists",
            ],
            Self::Api => &[
                "Wait a moment and try again",
                "Verify the API credentials in settings",
                "Contact an administrator if the problem persists",
            ],
            Self::Auth => &["Log in again", "Clear saved session data and retry"],
            Self::Permission => &[
                "Ask an administrator for access",
                "Check that your role allows this action",
            ],
            Self::Validation => &[
                "Fill in all required fields",
                "Check the format of the values you entered",
            ],
            Self::Storage => &[
                "Clear saved data for this site",
                "Free up local storage space",
            ],
            Self::Render => &["Refresh the page", "Switch to another view and back"],
            Self::Unknown => &[
                "Refresh the page",
                "Contact support if the problem persists",
                "Check the console for details",
            ],
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered so that `Critical > High > Medium > Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// How a classified error should be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Presentation {
    /// Transient, non-blocking notification.
    Toast,
    /// Blocking dialog.
    Modal,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    pub fn presentation(&self) -> Presentation {
        match self {
            Self::Critical => Presentation::Modal,
            _ => Presentation::Toast,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-supplied diagnostics attached to a classification.
///
/// Only the `operation` key is ever read, and only to detect render failures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorContext(BTreeMap<String, serde_json::Value>);

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context carrying only an `operation` entry.
    pub fn for_operation(operation: impl Into<String>) -> Self {
        Self::new().with("operation", operation.into())
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    pub fn operation(&self) -> Option<&str> {
        self.get("operation").and_then(|v| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &serde_json::Value)> {
        self.0.iter()
    }
}

impl From<BTreeMap<String, serde_json::Value>> for ErrorContext {
    fn from(map: BTreeMap<String, serde_json::Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<serde_json::Value>> FromIterator<(K, V)> for ErrorContext {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Fully populated classification of one failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedError {
    pub timestamp: SystemTime,
    pub raw_message: String,
    pub category: Category,
    pub severity: Severity,
    pub user_message: String,
    pub suggestions: Vec<String>,
    /// False only when the application cannot continue at all; re-authentication counts
    /// as a recovery path.
    pub recoverable: bool,
    pub context: ErrorContext,
}

impl ClassifiedError {
    /// Whether the consumer must clear the session and re-authenticate.
    pub fn requires_reauthentication(&self) -> bool {
        self.category == Category::Auth && self.severity == Severity::Critical
    }

    pub fn presentation(&self) -> Presentation {
        self.severity.presentation()
    }
}

/// Which API failure a status code denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ApiDetail {
    Unauthorized,
    Forbidden,
    NotFound,
    Unavailable,
}

impl ApiDetail {
    fn from_status(status: Option<u16>) -> Self {
        match status {
            Some(401) => Self::Unauthorized,
            Some(403) => Self::Forbidden,
            Some(404) => Self::NotFound,
            _ => Self::Unavailable,
        }
    }

    fn from_message(lowered: &str) -> Self {
        if lowered.contains("401") {
            Self::Unauthorized
        } else if lowered.contains("403") {
            Self::Forbidden
        } else if lowered.contains("404") {
            Self::NotFound
        } else {
            Self::Unavailable
        }
    }

    fn user_message(&self) -> &'static str {
        match self {
            Self::Unauthorized => "Invalid or expired API credentials. Please sign in again.",
            Self::Forbidden => "Your account does not have permission to access this data.",
            Self::NotFound => "The requested record could not be found.",
            Self::Unavailable => "The data service is temporarily unavailable. Please try again later.",
        }
    }
}

const NETWORK_KEYWORDS: &[&str] = &["fetch", "network", "failed to fetch"];
const API_KEYWORDS: &[&str] = &["airtable", "api", "401", "403", "404"];
const AUTH_KEYWORDS: &[&str] = &["auth", "login", "session", "token"];
const PERMISSION_KEYWORDS: &[&str] = &["permission", "access denied", "not allowed", "forbidden"];
const VALIDATION_KEYWORDS: &[&str] = &["required", "invalid", "validation", "must"];
const STORAGE_KEYWORDS: &[&str] = &["storage", "localstorage", "quota"];
const RENDER_KEYWORDS: &[&str] = &["render", "undefined", "null"];

fn mentions(haystack: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| haystack.contains(k))
}

/// Keyword fallback for errors with no structured variant.
fn categorize_message(message: &str, context: &ErrorContext) -> (Category, Option<ApiDetail>) {
    let lowered = message.to_lowercase();
    if mentions(&lowered, NETWORK_KEYWORDS) {
        (Category::Network, None)
    } else if mentions(&lowered, API_KEYWORDS) {
        (Category::Api, Some(ApiDetail::from_message(&lowered)))
    } else if mentions(&lowered, AUTH_KEYWORDS) {
        (Category::Auth, None)
    } else if mentions(&lowered, PERMISSION_KEYWORDS) {
        (Category::Permission, None)
    } else if mentions(&lowered, VALIDATION_KEYWORDS) {
        (Category::Validation, None)
    } else if mentions(&lowered, STORAGE_KEYWORDS) {
        (Category::Storage, None)
    } else if mentions(&lowered, RENDER_KEYWORDS) || context.operation() == Some("render") {
        (Category::Render, None)
    } else {
        (Category::Unknown, None)
    }
}

fn user_message(category: Category, api: Option<ApiDetail>) -> &'static str {
    match category {
        Category::Network => {
            "Unable to connect to the server. Please check your internet connection."
        }
        Category::Api => api.unwrap_or(ApiDetail::Unavailable).user_message(),
        Category::Auth => "Your session has expired. Please log in again.",
        Category::Permission => "You don't have permission to perform this action.",
        Category::Validation => "Some of the information entered is invalid. Please check and try again.",
        Category::Storage => "Unable to save data on this device.",
        Category::Render => "There was a problem displaying this content.",
        Category::Unknown => "An unexpected error occurred.",
    }
}

/// Stateless classifier with an injectable clock for timestamps.
#[derive(Debug, Clone)]
pub struct ErrorClassifier {
    clock: Arc<dyn Clock>,
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorClassifier {
    pub fn new() -> Self {
        Self { clock: Arc::new(SystemClock) }
    }

    pub fn with_clock<C: Clock + 'static>(clock: C) -> Self {
        Self { clock: Arc::new(clock) }
    }

    /// Classify an error, preferring a `RecordStoreError` anywhere in its source chain.
    pub fn classify(
        &self,
        error: &(dyn std::error::Error + 'static),
        context: &ErrorContext,
    ) -> ClassifiedError {
        let structured = std::iter::successors(Some(error), |e| e.source())
            .find_map(|e| e.downcast_ref::<RecordStoreError>());
        match structured {
            Some(record_err) => {
                let category = record_err.category();
                let api = (category == Category::Api)
                    .then(|| ApiDetail::from_status(record_err.status()));
                self.assemble(error.to_string(), category, api, context)
            }
            None => self.classify_message(&error.to_string(), context),
        }
    }

    /// Classify from message text alone.
    pub fn classify_message(&self, message: &str, context: &ErrorContext) -> ClassifiedError {
        let (category, api) = categorize_message(message, context);
        self.assemble(message.to_string(), category, api, context)
    }

    fn assemble(
        &self,
        raw_message: String,
        category: Category,
        api: Option<ApiDetail>,
        context: &ErrorContext,
    ) -> ClassifiedError {
        ClassifiedError {
            timestamp: self.clock.now(),
            raw_message,
            category,
            severity: category.severity(),
            user_message: user_message(category, api).to_string(),
            suggestions: category.suggestions().iter().map(|s| s.to_string()).collect(),
            recoverable: true,
            context: context.clone(),
        }
    }
}

/// Classify with the system clock.
pub fn classify(error: &(dyn std::error::Error + 'static), context: &ErrorContext) -> ClassifiedError {
    ErrorClassifier::new().classify(error, context)
}

/// Classify message text with the system clock.
pub fn classify_message(message: &str, context: &ErrorContext) -> ClassifiedError {
    ErrorClassifier::new().classify_message(message, context)
}
