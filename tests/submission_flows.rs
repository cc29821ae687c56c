use std::sync::Arc;
use std::time::Duration;

use listing_desk::http::{HttpResponse, MockHttpClient};
use listing_desk::session::{MemoryStore, TOKEN_KEY, USER_KEY};
use listing_desk::view::{NoticeKind, RecordingView, SubmitControl, ViewEvent};
use listing_desk::{
    AttemptBlocked, FailureReason, FormField, ListingConfig, ListingError, ListingPage,
    MockFileDecoder, StatField, SubmissionOutcome,
};
use serde_json::json;

type TestPage = ListingPage<MockHttpClient, RecordingView, MockFileDecoder>;

const PLACEHOLDER: &str = "https://img.example/no-image.png";
const CREATE: &str = "POST /create";
const CONSOLE_TEST: &str = "POST /create?console_test=1";

fn config() -> ListingConfig {
    ListingConfig {
        api_base: "https://market.example/api/accounts".to_string(),
        placeholder_image: PLACEHOLDER.to_string(),
        ..Default::default()
    }
}

fn logged_in_store() -> MemoryStore {
    MemoryStore::new()
        .with(TOKEN_KEY, "session-token")
        .with(USER_KEY, r#"{"id": 17, "username": "ace"}"#)
}

/// A page past the session guard, with the scenario form filled in.
fn setup() -> (TestPage, Arc<MockHttpClient>, Arc<RecordingView>) {
    let http_client = Arc::new(MockHttpClient::new());
    let view = Arc::new(RecordingView::new());
    let mut page = ListingPage::init(
        &logged_in_store(),
        config(),
        http_client.clone(),
        view.clone(),
        Arc::new(MockFileDecoder::new()),
    )
    .expect("session guard should pass");

    page.set_field(FormField::Uid, "ABC123");
    page.set_field(FormField::Title, "Conqueror Account");
    page.set_field(FormField::Stat(StatField::Level), "80");

    (page, http_client, view)
}

/// The last two view events of a finished submit must be the cleanup.
fn assert_cleaned_up(view: &RecordingView) {
    let events = view.events();
    let tail = &events[events.len() - 2..];
    assert_eq!(
        tail,
        &[
            ViewEvent::Loading(false),
            ViewEvent::SubmitControl(SubmitControl::Ready)
        ]
    );
    assert!(!view.loading());
    assert_eq!(view.submit_control(), SubmitControl::Ready);
}

#[test_log::test(tokio::test)]
async fn test_successful_submission_resets_page() {
    let (mut page, http_client, view) = setup();
    http_client.add_json_response(CREATE, 200, json!({"id": 991}));

    assert_eq!(page.estimate(), 800);
    assert_eq!(view.price(), Some(800));

    let outcome = page.submit().await;
    assert!(outcome.is_success());

    let calls = http_client.get_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].endpoint, "https://market.example/api/accounts");
    assert_eq!(calls[0].path, "/create");
    assert_eq!(calls[0].bearer, "session-token");

    let body = calls[0].json();
    assert_eq!(body["level"], json!(80));
    assert_eq!(body["uid"], json!("ABC123"));
    assert_eq!(body["title"], json!("Conqueror Account"));
    assert_eq!(body["seller_id"], json!(17));
    assert_eq!(body["images"], json!([PLACEHOLDER]));

    assert_eq!(page.form().get(FormField::Uid), "");
    assert!(page.gallery().is_empty());
    assert!(view.gallery().is_empty());
    assert_eq!(view.price(), None);
    assert!(view.events().contains(&ViewEvent::ResetForm));

    let notice = view.last_notice().unwrap();
    assert_eq!(notice.kind, NoticeKind::Success);
    assert_eq!(notice.duration_ms, 3000);

    assert_cleaned_up(&view);
}

#[test_log::test(tokio::test)]
async fn test_submit_shows_loading_while_in_flight() {
    let (mut page, http_client, view) = setup();
    let trigger = http_client.add_response_with_trigger(
        CREATE,
        Ok(HttpResponse {
            status: 201,
            body: "{}".to_string(),
        }),
    );

    let watcher = {
        let view = view.clone();
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            let busy = view.loading() && view.submit_control() == SubmitControl::Busy;
            trigger.send(()).unwrap();
            busy
        })
    };

    assert!(page.submit().await.is_success());
    assert!(watcher.await.unwrap(), "form should be busy while the call is pending");
    assert_cleaned_up(&view);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_unauthorized_redirects_after_delay() {
    let (mut page, http_client, view) = setup();
    http_client.add_json_response(CREATE, 401, json!({"error": "expired"}));

    let outcome = page.submit().await;
    assert!(matches!(
        outcome.failure(),
        Some(FailureReason::Unauthorized { .. })
    ));

    let notice = view.last_notice().unwrap();
    assert_eq!(notice.kind, NoticeKind::Error);
    assert!(notice.text.contains("login again"));
    assert_cleaned_up(&view);

    // Nothing happens before the delay elapses
    assert!(view.navigations().is_empty());
    tokio::time::sleep(Duration::from_millis(1499)).await;
    assert!(view.navigations().is_empty());

    tokio::time::sleep(Duration::from_millis(2)).await;
    assert_eq!(view.navigations(), vec!["/login.html".to_string()]);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(view.navigations().len(), 1);
}

#[test_log::test(tokio::test)]
async fn test_foreign_key_failure_offers_console_test_once() {
    let (mut page, http_client, view) = setup();
    let server_error = json!({
        "message": "Internal Server Error",
        "details": "insert or update violates foreign key constraint"
    });
    http_client.add_json_response(CREATE, 500, server_error.clone());
    http_client.add_json_response(CREATE, 500, server_error);

    let outcome = page.submit().await;
    assert!(matches!(
        outcome.failure(),
        Some(FailureReason::ServerError { .. })
    ));
    assert_eq!(
        view.last_notice().unwrap().text,
        "Server error: Internal Server Error"
    );
    assert_eq!(view.console_helper_shown(), 1);
    assert!(view.console_helper_present());
    assert_cleaned_up(&view);

    // A second qualifying failure does not add another helper
    page.submit().await;
    assert_eq!(view.console_helper_shown(), 1);

    http_client.add_json_response(CONSOLE_TEST, 200, json!({"id": 5}));
    assert_eq!(page.run_console_test().await, Some(true));

    let calls = http_client.get_calls();
    assert_eq!(calls.len(), 3);
    let bypass = &calls[2];
    assert_eq!(bypass.path, "/create?console_test=1");
    assert!(!bypass.has_authorization());
    assert_eq!(bypass.json(), calls[0].json());

    assert!(!view.console_helper_present());
    assert!(page.console_helper().is_none());
    assert_eq!(view.last_notice().unwrap().kind, NoticeKind::Success);
}

#[test_log::test(tokio::test)]
async fn test_console_test_failure_reenables_helper() {
    let (mut page, http_client, view) = setup();
    http_client.add_json_response(
        CREATE,
        500,
        json!({"error": "db", "details": "violates FOREIGN KEY constraint \"fk_seller\""}),
    );
    page.submit().await;
    assert!(page.console_helper().is_some());

    http_client.add_json_response(CONSOLE_TEST, 503, json!({"error": "unavailable"}));
    assert_eq!(page.run_console_test().await, Some(false));

    let helper = page.console_helper().expect("helper stays after a failure");
    assert!(helper.is_enabled());
    assert!(view.console_helper_present());
    assert_eq!(
        view.events()
            .iter()
            .filter(|e| matches!(e, ViewEvent::ConsoleHelperEnabled(_)))
            .cloned()
            .collect::<Vec<_>>(),
        vec![
            ViewEvent::ConsoleHelperEnabled(false),
            ViewEvent::ConsoleHelperEnabled(true)
        ]
    );
    let notice = view.last_notice().unwrap();
    assert_eq!(notice.kind, NoticeKind::Error);
    assert!(notice.text.contains("unavailable"));

    // Retry through the helper
    http_client.add_json_response(CONSOLE_TEST, 200, json!({}));
    assert_eq!(page.run_console_test().await, Some(true));
    assert!(page.console_helper().is_none());
}

#[test_log::test(tokio::test)]
async fn test_structured_foreign_key_code_offers_console_test() {
    let (mut page, http_client, view) = setup();
    http_client.add_json_response(CREATE, 500, json!({"code": "23503"}));

    page.submit().await;
    assert_eq!(view.console_helper_shown(), 1);
    assert_eq!(
        view.last_notice().unwrap().text,
        "Server error, please try again later"
    );
}

#[test_log::test(tokio::test)]
async fn test_plain_server_error_has_no_helper() {
    let (mut page, http_client, view) = setup();
    http_client.add_json_response(CREATE, 500, json!({"message": "disk full"}));

    page.submit().await;
    assert_eq!(view.console_helper_shown(), 0);
    assert_eq!(view.last_notice().unwrap().text, "Server error: disk full");
    assert_eq!(page.run_console_test().await, None);
}

#[test_log::test(tokio::test)]
async fn test_other_status_uses_server_text() {
    let (mut page, http_client, view) = setup();
    http_client.add_json_response(CREATE, 422, json!({"error": "UID already listed"}));
    http_client.add_response(
        CREATE,
        Ok(HttpResponse {
            status: 400,
            body: "Bad Request".to_string(),
        }),
    );

    let outcome = page.submit().await;
    assert!(matches!(
        outcome.failure(),
        Some(FailureReason::Rejected { status: 422, .. })
    ));
    assert_eq!(view.last_notice().unwrap().text, "UID already listed");
    assert_cleaned_up(&view);

    page.submit().await;
    assert_eq!(view.last_notice().unwrap().text, "Failed to list account");

    // Failed attempts keep the form for the seller to correct
    assert_eq!(page.form().get(FormField::Uid), "ABC123");
}

#[test_log::test(tokio::test)]
async fn test_transport_failure_is_reported() {
    let (mut page, http_client, view) = setup();
    http_client.add_response(
        CREATE,
        Err(ListingError::Other(anyhow::anyhow!("connection refused"))),
    );

    let outcome = page.submit().await;
    assert!(matches!(
        outcome.failure(),
        Some(FailureReason::NetworkError { .. })
    ));
    assert_eq!(
        view.last_notice().unwrap().text,
        "Network request failed, please check your connection"
    );
    assert_cleaned_up(&view);
}

#[test_log::test(tokio::test)]
async fn test_validation_failure_marks_fields_without_calling() {
    let (mut page, http_client, view) = setup();
    page.set_field(FormField::Uid, "  ");
    page.set_field(FormField::Stat(StatField::Level), "max");

    let outcome = page.submit().await;
    let SubmissionOutcome::Blocked(AttemptBlocked::Invalid(report)) = outcome else {
        panic!("expected a validation block");
    };
    assert!(report.is_invalid(FormField::Uid));
    assert!(!report.is_invalid(FormField::Title));
    assert_eq!(http_client.call_count(), 0);
    assert!(!view.events().contains(&ViewEvent::Loading(true)));

    let invalid = view.invalid_fields();
    assert!(invalid.contains(&FormField::Uid));
    assert!(invalid.contains(&FormField::Stat(StatField::Level)));

    // Fixing the fields clears the marks and lets the submit through
    http_client.add_json_response(CREATE, 200, json!({}));
    page.set_field(FormField::Uid, "ABC123");
    page.set_field(FormField::Stat(StatField::Level), "80");
    assert!(page.submit().await.is_success());
    assert!(view.invalid_fields().is_empty());
}

#[test_log::test(tokio::test)]
async fn test_missing_session_redirects_and_never_submits() {
    let http_client = Arc::new(MockHttpClient::new());
    let view = Arc::new(RecordingView::new());
    let store = MemoryStore::new().with(USER_KEY, r#"{"id": 17}"#);

    let result = TestPage::init(
        &store,
        config(),
        http_client.clone(),
        view.clone(),
        Arc::new(MockFileDecoder::new()),
    );
    assert!(matches!(result, Err(ListingError::SessionMissing(_))));
    assert_eq!(view.navigations(), vec!["/login.html".to_string()]);

    // Even a page built without a session refuses to call the API
    let mut page = TestPage::new(
        None,
        config(),
        http_client.clone(),
        view.clone(),
        Arc::new(MockFileDecoder::new()),
    );
    page.set_field(FormField::Uid, "ABC123");
    page.set_field(FormField::Title, "Conqueror Account");

    let outcome = page.submit().await;
    assert!(matches!(
        outcome,
        SubmissionOutcome::Blocked(AttemptBlocked::LoginRequired)
    ));
    assert_eq!(http_client.call_count(), 0);
    assert_eq!(
        view.last_notice().unwrap().text,
        "Please log in before listing an account"
    );
    assert_eq!(view.navigations().len(), 1);
}

#[test_log::test(tokio::test)]
async fn test_each_submit_is_independent() {
    let (mut page, http_client, _view) = setup();
    http_client.add_json_response(CREATE, 500, json!({}));
    http_client.add_json_response(CREATE, 200, json!({}));

    let first = page.submit().await;
    let second = page.submit().await;
    assert!(!first.is_success());
    assert!(second.is_success());

    let (SubmissionOutcome::Failed(a), SubmissionOutcome::Succeeded(b)) = (first, second) else {
        panic!("unexpected outcomes");
    };
    assert_ne!(a.id, b.id);
    assert_eq!(http_client.call_count(), 2);
}
