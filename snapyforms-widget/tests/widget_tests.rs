use pretty_assertions::assert_eq;
use snapyforms_widget::renderer::ACTIVE_CLASS;
use snapyforms_widget::rules::TriggerState;
use snapyforms_widget::{
    render_html, validate_email, validate_phone, ApiClient, Control, DomEvent, Effect,
    FormDefinition, FormWidget, NodeId, PageEvent, PageListener, SubmitPayload, SubmitPhase,
    WidgetConfig, WidgetError, WidgetOptions,
};
use std::fs;
use std::path::PathBuf;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn get_fixture_path(filename: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("fixtures");
    path.push(filename);
    path
}

fn read_fixture(filename: &str) -> String {
    fs::read_to_string(get_fixture_path(filename)).unwrap()
}

fn load_fixture(filename: &str) -> FormDefinition {
    FormDefinition::from_json(&read_fixture(filename)).unwrap()
}

fn mount_fixture(filename: &str, page: &str) -> FormWidget {
    let config = WidgetConfig::new("form-1", "pk_test").unwrap();
    FormWidget::mount(config, load_fixture(filename), page, WidgetOptions::default())
}

fn text_control(widget: &FormWidget, id: &str) -> NodeId {
    match widget.block(id).map(|b| &b.control) {
        Some(Control::Input(n)) | Some(Control::TextArea(n)) => *n,
        other => panic!("no text control for {}: {:?}", id, other),
    }
}

fn scroll_to(widget: &mut FormWidget, scroll_y: f64) {
    widget.handle_page_event(PageEvent::Scroll {
        scroll_y,
        document_height: 2000.0,
        viewport_height: 1000.0,
    });
}

// Fixtures

#[test]
fn test_valid_fixtures_parse() {
    for name in [
        "feedback.json",
        "minimal.json",
        "pricing-only.json",
        "unsafe-metadata.json",
        "null-members.json",
    ] {
        let result = FormDefinition::from_json(&read_fixture(name));
        assert!(result.is_ok(), "{} should be valid: {:?}", name, result.err());
    }
}

#[test]
fn test_duplicate_ids_fixture_rejected() {
    let result = FormDefinition::from_json(&read_fixture("duplicate-ids.json"));
    assert_eq!(
        result.unwrap_err(),
        WidgetError::DuplicateFieldId {
            id: "email".to_string()
        }
    );
}

// Rendering

#[test]
fn test_one_block_per_field_in_order() {
    let widget = mount_fixture("feedback.json", "/");
    let ids: Vec<&str> = widget
        .view()
        .blocks
        .iter()
        .map(|b| b.field_id.as_str())
        .collect();
    let expected: Vec<&str> = widget
        .definition()
        .fields
        .iter()
        .map(|f| f.id.as_str())
        .collect();
    assert_eq!(ids.len(), 11);
    assert_eq!(ids, expected);

    let wrappers = widget
        .dom()
        .find_by_class(widget.view().form, "snapyforms-field");
    assert_eq!(wrappers.len(), 11);
}

#[test]
fn test_feedback_fixture_markup() {
    let html = render_html(&read_fixture("feedback.json")).unwrap();
    assert!(html.contains("background-color: #6D28D9; left: 20px; bottom: 20px"));
    assert!(html.contains("font-family: Inter, sans-serif"));
    assert!(html.contains(">Send feedback</button>"));
    assert!(html.contains("<span>Send me product updates</span>"));
    assert!(html.contains("https://www.youtube.com/embed/dQw4w9WgXcQ?modestbranding=1&amp;rel=0"));
    assert!(html.contains("<span class=\"snapyforms-required\">*</span>"));
    assert!(!html.contains("class=\"snapyforms-form open\""));
}

#[test]
fn test_unsafe_metadata_is_neutralised() {
    let html = render_html(&read_fixture("unsafe-metadata.json")).unwrap();
    assert!(html.contains("&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;"));
    assert!(html.contains("&lt;b&gt;Note&lt;/b&gt;"));
    assert!(html.contains("background-color: #0EA5E9"));
    assert!(!html.contains("javascript:"));
    assert!(!html.contains("<script"));
}

// Validation

#[test]
fn test_email_and_phone_rules() {
    assert!(validate_email("a@b.co"));
    assert!(!validate_email("a@b"));
    assert!(validate_phone("+14155550123"));
    assert!(!validate_phone("4155550123"));
}

#[test]
fn test_empty_optional_email_is_valid() {
    let mut widget = mount_fixture("minimal.json", "/");
    let name = text_control(&widget, "name");
    widget.input(name, "Alice");
    assert!(widget.begin_submit().is_some());
    assert!(widget.last_validation().unwrap().is_valid());
}

#[test]
fn test_field_errors_are_marked() {
    let mut widget = mount_fixture("feedback.json", "/");
    let email = text_control(&widget, "email");
    let phone = text_control(&widget, "phone");
    widget.input(email, "a@b");
    widget.input(phone, "4155550123");
    assert_eq!(widget.begin_submit(), None);

    let report = widget.last_validation().unwrap();
    let failing: Vec<&str> = report.errors.iter().map(|e| e.field_id.as_str()).collect();
    assert_eq!(failing, vec!["name", "email", "phone"]);
    for id in failing {
        let wrapper = widget.block(id).unwrap().wrapper;
        assert!(widget.dom().has_class(wrapper, "has-error"), "{}", id);
    }
    let comments = widget.block("comments").unwrap().wrapper;
    assert!(!widget.dom().has_class(comments, "has-error"));
}

// Display rules

#[test]
fn test_scroll_trigger_opens_once() {
    let mut widget = mount_fixture("feedback.json", "/blog/post");
    assert_eq!(
        widget.drain_effects(),
        vec![Effect::Listen {
            listener: PageListener::Scroll
        }]
    );

    scroll_to(&mut widget, 400.0);
    assert!(!widget.is_open());

    scroll_to(&mut widget, 500.0);
    assert!(widget.is_open());
    assert!(widget.drain_effects().contains(&Effect::Unlisten {
        listener: PageListener::Scroll
    }));

    widget.close();
    scroll_to(&mut widget, 900.0);
    assert!(!widget.is_open());
}

#[test]
fn test_short_page_never_fires_scroll() {
    let mut widget = mount_fixture("feedback.json", "/");
    widget.handle_page_event(PageEvent::Scroll {
        scroll_y: 0.0,
        document_height: 700.0,
        viewport_height: 900.0,
    });
    assert!(!widget.is_open());
}

#[test]
fn test_url_rules() {
    assert!(mount_fixture("feedback.json", "/checkout/step1").is_removed());
    assert!(!mount_fixture("feedback.json", "/blog").is_removed());
    assert!(mount_fixture("pricing-only.json", "/about").is_removed());
    assert!(!mount_fixture("pricing-only.json", "/pricing").is_removed());
    assert!(!mount_fixture("minimal.json", "/anything").is_removed());
}

fn mount_with_url_rules(show_on: &[&str], hide_on: &[&str], page: &str) -> FormWidget {
    let json = serde_json::json!({
        "fields": [{"id": "comment", "type": "textarea", "label": "Comment"}],
        "embedSettings": {"urlRules": {"showOn": show_on, "hideOn": hide_on}}
    });
    let definition = FormDefinition::from_json(&json.to_string()).unwrap();
    let config = WidgetConfig::new("form-1", "pk_test").unwrap();
    FormWidget::mount(config, definition, page, WidgetOptions::default())
}

#[test]
fn test_broken_url_rules_remove_widget() {
    assert!(mount_with_url_rules(&["(unclosed"], &[], "/about").is_removed());
    assert!(mount_with_url_rules(&[], &["(unclosed"], "/about").is_removed());
}

#[test]
fn test_lookahead_url_rules() {
    assert!(mount_with_url_rules(&["^/(?!admin)pricing"], &[], "/about").is_removed());
    assert!(!mount_with_url_rules(&["^/(?!admin)pricing"], &[], "/pricing").is_removed());
    assert!(mount_with_url_rules(&[], &["^/(?=checkout)"], "/checkout/step1").is_removed());
    assert!(!mount_with_url_rules(&[], &["^/(?=checkout)"], "/blog").is_removed());
}

#[test]
fn test_null_members_fixture_mounts() {
    let widget = mount_fixture("null-members.json", "/anywhere");
    assert!(!widget.is_removed());
    assert_eq!(widget.view().blocks.len(), 2);
    assert_eq!(widget.definition().metadata.submit_label(), "Submit");
    assert_eq!(widget.trigger_state(), TriggerState::Armed);
}

#[test]
fn test_delay_trigger_schedules_timer() {
    let mut widget = mount_fixture("pricing-only.json", "/pricing");
    assert_eq!(
        widget.drain_effects(),
        vec![Effect::ScheduleTimer {
            timer: snapyforms_widget::Timer::AutoOpen,
            after: std::time::Duration::from_secs(10)
        }]
    );
    widget.handle_page_event(PageEvent::TimerElapsed(snapyforms_widget::Timer::AutoOpen));
    assert!(widget.is_open());
}

// Ratings

#[test]
fn test_second_of_three_stars() {
    let mut widget = mount_fixture("feedback.json", "/");
    let Some(Control::Rating { hidden, units, .. }) =
        widget.block("rating").map(|b| b.control.clone())
    else {
        panic!("expected rating control");
    };
    assert_eq!(units.len(), 3);
    widget.dispatch(units[1], DomEvent::Click);

    assert_eq!(widget.dom().value(hidden), Some("2"));
    let active: Vec<bool> = units
        .iter()
        .map(|u| widget.dom().has_class(*u, ACTIVE_CLASS))
        .collect();
    assert_eq!(active, vec![true, true, false]);
}

// Submission

#[test]
fn test_payload_round_trip() {
    let mut widget = mount_fixture("minimal.json", "/");
    let name = text_control(&widget, "name");
    let email = text_control(&widget, "email");
    widget.input(name, "Alice");
    widget.input(email, "alice@x.com");

    let payload = widget.begin_submit().unwrap();
    assert_eq!(
        serde_json::to_value(&payload).unwrap(),
        serde_json::json!({
            "formId": "form-1",
            "responseData": {"name": "Alice", "email": "alice@x.com"}
        })
    );
}

#[test]
fn test_feedback_payload_follows_form_data() {
    let mut widget = mount_fixture("feedback.json", "/");
    let name = text_control(&widget, "name");
    let email = text_control(&widget, "email");
    widget.input(name, "Alice");
    widget.input(email, "alice@x.com");
    widget.rate(9, 4);

    let payload = widget.begin_submit().unwrap();
    let keys: Vec<&str> = payload.response_data.keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        vec!["comments", "email", "mood", "name", "phone", "rating", "team_size"]
    );
    assert_eq!(payload.response_data["mood"], "4");
    assert_eq!(payload.response_data["rating"], "");
}

async fn mount_remote(server: &MockServer, fixture: &str) -> (ApiClient, FormWidget) {
    Mock::given(method("GET"))
        .and(path("/get-published-form"))
        .and(query_param("formId", "form-1"))
        .and(header("Authorization", "Bearer pk_test"))
        .respond_with(ResponseTemplate::new(200).set_body_string(read_fixture(fixture)))
        .mount(server)
        .await;
    let config = WidgetConfig::new("form-1", "pk_test")
        .unwrap()
        .with_api_url(server.uri())
        .unwrap();
    let client = ApiClient::new(config);
    let widget = FormWidget::load(&client, "/", WidgetOptions::default())
        .await
        .unwrap();
    (client, widget)
}

#[tokio::test]
async fn test_load_and_submit_end_to_end() {
    let server = MockServer::start().await;
    let (client, mut widget) = mount_remote(&server, "minimal.json").await;

    Mock::given(method("POST"))
        .and(path("/submit-form-response"))
        .and(header("Authorization", "Bearer pk_test"))
        .and(body_json(serde_json::json!({
            "formId": "form-1",
            "responseData": {"name": "Alice", "email": "alice@x.com"}
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    widget.open();
    let name = text_control(&widget, "name");
    let email = text_control(&widget, "email");
    widget.input(name, "Alice");
    widget.input(email, "alice@x.com");

    assert!(widget.submit(&client).await.unwrap());
    assert_eq!(widget.phase(), SubmitPhase::Submitted);
    assert!(!widget.is_open());
    assert_eq!(widget.dom().value(name), Some(""));
}

#[tokio::test]
async fn test_invalid_form_sends_no_request() {
    let server = MockServer::start().await;
    let (client, mut widget) = mount_remote(&server, "minimal.json").await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    assert!(!widget.submit(&client).await.unwrap());
    assert_eq!(widget.phase(), SubmitPhase::Idle);
}

#[tokio::test]
async fn test_failed_submit_keeps_values() {
    let server = MockServer::start().await;
    let (client, mut widget) = mount_remote(&server, "minimal.json").await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let name = text_control(&widget, "name");
    widget.input(name, "Alice");
    let err = widget.submit(&client).await.unwrap_err();
    assert!(err.is_submit());
    assert_eq!(widget.phase(), SubmitPhase::Error);
    assert_eq!(widget.dom().value(name), Some("Alice"));
    assert!(!widget.dom().is_disabled(widget.view().submit_button));
}

#[tokio::test]
async fn test_load_failure_renders_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    let config = WidgetConfig::new("form-1", "pk_bad")
        .unwrap()
        .with_api_url(server.uri())
        .unwrap();
    let result = FormWidget::load(&ApiClient::new(config), "/", WidgetOptions::default()).await;
    assert!(result.unwrap_err().is_load());
}

#[test]
fn test_submit_payload_shape() {
    let payload = SubmitPayload::from_pairs("abc", vec![("q".to_string(), "hi".to_string())]);
    assert_eq!(
        serde_json::to_string(&payload).unwrap(),
        r#"{"formId":"abc","responseData":{"q":"hi"}}"#
    );
}
