use calendarBot::clients::google_calendar_client::{event_body, GoogleCalendarClient};
use calendarBot::error::SinkError;
use calendarBot::models::event::{EventRecord, RawExtraction};
use calendarBot::service::calendar_sink::CalendarSink;
use calendarBot::service::date_context::DateContext;
use calendarBot::service::event_extractor::build_record;
use calendarBot::service::guest_directory::GuestDirectory;
use chrono::NaiveDate;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn record(guest: Option<&str>) -> EventRecord {
    let raw = RawExtraction {
        summary: Some("Meeting with Dan".to_string()),
        date: Some("2024-06-11".to_string()),
        time: Some("15:00".to_string()),
        duration_hours: Some(1.0),
        guest: guest.map(str::to_string),
    };
    let ctx = DateContext::for_date(NaiveDate::from_ymd_opt(2024, 6, 10).unwrap());
    let guests = GuestDirectory::new([("Bareket", "bareket@example.com")]);
    build_record(raw, &ctx, &guests).unwrap()
}

fn client(server: &MockServer) -> GoogleCalendarClient {
    GoogleCalendarClient::new("ya29.test".to_string()).with_base_url(server.uri())
}

#[tokio::test]
async fn inserts_event_and_returns_link() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/calendars/primary/events"))
        .and(query_param("sendUpdates", "all"))
        .and(header("authorization", "Bearer ya29.test"))
        .and(body_partial_json(json!({
            "summary": "Meeting with Dan",
            "start": { "dateTime": "2024-06-11T15:00:00+03:00", "timeZone": "Asia/Jerusalem" },
            "end": { "dateTime": "2024-06-11T16:00:00+03:00", "timeZone": "Asia/Jerusalem" },
            "attendees": [{ "email": "bareket@example.com" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "evt123",
            "htmlLink": "https://www.google.com/calendar/event?eid=evt123"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let link = client(&server)
        .create_event(&record(Some("Bareket")))
        .await
        .unwrap();
    assert_eq!(link, "https://www.google.com/calendar/event?eid=evt123");
}

#[tokio::test]
async fn writes_to_configured_calendar() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/calendars/work/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "htmlLink": "https://www.google.com/calendar/event?eid=w1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .with_calendar_id("work")
        .create_event(&record(None))
        .await
        .unwrap();
}

#[test]
fn body_sets_popup_reminder_and_omits_unknown_guest() {
    let body = event_body(&record(Some("Yossi")));
    assert_eq!(body["reminders"]["useDefault"], false);
    assert_eq!(body["reminders"]["overrides"][0]["method"], "popup");
    assert_eq!(body["reminders"]["overrides"][0]["minutes"], 30);
    assert!(body.get("attendees").is_none());
}

#[tokio::test]
async fn unauthorized_is_an_authentication_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/calendars/primary/events"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "code": 401, "message": "Invalid Credentials" }
        })))
        .mount(&server)
        .await;

    match client(&server).create_event(&record(None)).await {
        Err(SinkError::Authentication(message)) => assert_eq!(message, "Invalid Credentials"),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn quota_errors_keep_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/calendars/primary/events"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": { "code": 403, "message": "Rate Limit Exceeded" }
        })))
        .mount(&server)
        .await;

    assert!(matches!(
        client(&server).create_event(&record(None)).await,
        Err(SinkError::Api { status: 403, .. })
    ));
}

#[tokio::test]
async fn response_without_link_is_invalid() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/calendars/primary/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "evt" })))
        .mount(&server)
        .await;

    assert!(matches!(
        client(&server).create_event(&record(None)).await,
        Err(SinkError::InvalidResponse(_))
    ));
}
