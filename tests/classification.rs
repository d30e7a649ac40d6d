use recordguard::classify::{Category, ErrorClassifier, ErrorContext, Presentation, Severity};
use recordguard::clock::FixedClock;
use recordguard::handler::{ErrorHandler, Notifier, SessionControl};
use recordguard::{ClassifiedError, ErrorLog, RecordStoreError, TrackingSleeper};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn classifier() -> ErrorClassifier {
    ErrorClassifier::with_clock(FixedClock::from_unix_millis(1_734_000_000_000))
}

fn message(msg: &str) -> ClassifiedError {
    classifier().classify_message(msg, &ErrorContext::new())
}

#[test]
fn failed_to_fetch() {
    let c = message("Failed to fetch");
    assert_eq!(c.category, Category::Network);
    assert_eq!(c.severity, Severity::High);
}

#[test]
fn airtable_unauthorized() {
    let c = message("Airtable API Error: 401 - bad token");
    assert_eq!(c.category, Category::Api);
    assert_eq!(c.severity, Severity::High);
    assert!(c.user_message.to_lowercase().contains("invalid or expired"));
}

#[test]
fn session_expired() {
    let c = message("session expired");
    assert_eq!(c.category, Category::Auth);
    assert_eq!(c.severity, Severity::Critical);
    assert!(c.recoverable);
    assert!(c.requires_reauthentication());
    assert_eq!(c.presentation(), Presentation::Modal);
}

#[test]
fn something_obscure() {
    let c = message("something obscure");
    assert_eq!(c.category, Category::Unknown);
    assert_eq!(c.severity, Severity::Medium);
    assert!(!c.suggestions.is_empty());
    assert!(c.suggestions.iter().any(|s| s.contains("Refresh")));
    assert!(c.suggestions.iter().any(|s| s.contains("support")));
    assert!(c.suggestions.iter().any(|s| s.contains("console")));
}

#[test]
fn classification_is_idempotent() {
    let ctx = ErrorContext::for_operation("loadLeads").with("page", 3);
    let c = classifier();
    for msg in ["Failed to fetch", "token missing", "must be a number", "???"] {
        assert_eq!(c.classify_message(msg, &ctx), c.classify_message(msg, &ctx));
    }
    let err = RecordStoreError::api(404, "recABC");
    assert_eq!(c.classify(&err, &ctx), c.classify(&err, &ctx));
}

#[test]
fn context_round_trips_unchanged() {
    let ctx: ErrorContext = [
        ("operation", serde_json::json!("deleteClient")),
        ("clientId", serde_json::json!("rec9")),
        ("tags", serde_json::json!(["vip", "renewal"])),
        ("nested", serde_json::json!({ "a": null })),
    ]
    .into_iter()
    .collect();
    let c = classifier().classify_message("anything", &ctx);
    assert_eq!(c.context, ctx);
    assert_eq!(c.context.len(), 4);
    assert_eq!(c.context.operation(), Some("deleteClient"));
}

#[test]
fn structured_and_text_paths_agree_on_plain_text() {
    let cases = [
        RecordStoreError::network("connection refused"),
        RecordStoreError::api(401, "bad token"),
        RecordStoreError::api(403, "nope"),
        RecordStoreError::api(404, "recX"),
        RecordStoreError::api(500, "oops"),
        RecordStoreError::auth("login required"),
        RecordStoreError::Storage { message: "quota exceeded".into() },
        RecordStoreError::Render { message: "view failed".into() },
    ];
    let c = classifier();
    for err in cases {
        let structured = c.classify(&err, &ErrorContext::new());
        let text = c.classify_message(&err.to_string(), &ErrorContext::new());
        assert_eq!(structured, text, "{}", err);
    }
}

#[test]
fn structured_variant_wins_over_keywords_in_its_text() {
    let c = classifier();
    let ctx = ErrorContext::new();

    let err = RecordStoreError::Validation { field: "token".into(), message: "is required".into() };
    let structured = c.classify(&err, &ctx);
    assert_eq!(structured.category, Category::Validation);
    assert_eq!(structured.severity, Severity::Low);
    assert!(!structured.requires_reauthentication());
    assert_eq!(c.classify_message(&err.to_string(), &ctx).category, Category::Auth);

    let err = RecordStoreError::auth("api key revoked");
    let structured = c.classify(&err, &ctx);
    assert_eq!(structured.category, Category::Auth);
    assert_eq!(structured.severity, Severity::Critical);
    assert_eq!(c.classify_message(&err.to_string(), &ctx).category, Category::Api);

    let err = RecordStoreError::api(500, "failed to fetch upstream");
    let structured = c.classify(&err, &ctx);
    assert_eq!(structured.category, Category::Api);
    assert_eq!(structured.severity, Severity::High);
    assert!(structured.user_message.contains("temporarily unavailable"));
    assert_eq!(c.classify_message(&err.to_string(), &ctx).category, Category::Network);
}

#[test]
fn classified_error_serializes() {
    let c = message("Airtable API Error: 404 - not found");
    let json = serde_json::to_value(&c).expect("serialize");
    assert_eq!(json["category"], "api");
    assert_eq!(json["severity"], "high");
    let back: ClassifiedError = serde_json::from_value(json).expect("deserialize");
    assert_eq!(back, c);
}

#[derive(Default, Clone)]
struct Ui {
    shown: Arc<Mutex<Vec<(Category, Presentation)>>>,
    cleared: Arc<Mutex<usize>>,
    redirected: Arc<Mutex<usize>>,
}

impl Notifier for Ui {
    fn notify(&self, error: &ClassifiedError, presentation: Presentation) {
        self.shown.lock().unwrap().push((error.category, presentation));
    }
}

impl SessionControl for Ui {
    fn clear_session(&self) {
        *self.cleared.lock().unwrap() += 1;
    }
    fn reauthenticate(&self) {
        *self.redirected.lock().unwrap() += 1;
    }
}

#[tokio::test]
async fn handler_records_history_and_resets_on_critical() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let ui = Ui::default();
    let log = ErrorLog::with_capacity(10);
    let sleeper = TrackingSleeper::new();
    let handler = ErrorHandler::new(ui.clone(), ui.clone())
        .with_classifier(classifier())
        .with_log(log.clone())
        .with_sleeper(sleeper.clone());

    handler.handle_message("Failed to fetch", &ErrorContext::new()).await;
    handler.handle_message("Email is required", &ErrorContext::new()).await;
    let (_, plan) = handler
        .handle(&RecordStoreError::auth("session expired"), &ErrorContext::for_operation("loadClients"))
        .await;

    assert!(plan.resets_session());
    assert_eq!(
        *ui.shown.lock().unwrap(),
        vec![
            (Category::Network, Presentation::Toast),
            (Category::Validation, Presentation::Toast),
            (Category::Auth, Presentation::Modal),
        ]
    );
    assert_eq!(*ui.cleared.lock().unwrap(), 1);
    assert_eq!(*ui.redirected.lock().unwrap(), 1);
    assert_eq!(sleeper.delays(), vec![Duration::from_secs(2)]);

    assert_eq!(log.len(), 3);
    assert_eq!(log.at_least(Severity::High).len(), 2);
    log.clear();
    assert!(handler.log().is_empty());
}
