use std::sync::{Arc, Mutex};
use std::time::Duration;

use calendarBot::error::{CompletionError, ExtractionError};
use calendarBot::service::completion_service::CompletionService;
use calendarBot::service::event_extractor::{EventExtractor, Extraction};
use calendarBot::service::guest_directory::GuestDirectory;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};

struct FakeCompletion {
    response: Result<String, u16>,
    delay: Duration,
    prompts: Mutex<Vec<String>>,
}

impl FakeCompletion {
    fn answering(body: &str) -> Arc<Self> {
        Arc::new(Self {
            response: Ok(body.to_string()),
            delay: Duration::ZERO,
            prompts: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait::async_trait]
impl CompletionService for FakeCompletion {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        tokio::time::sleep(self.delay).await;
        match &self.response {
            Ok(body) => Ok(body.clone()),
            Err(status) => Err(CompletionError::Api {
                status: *status,
                message: "overloaded".to_string(),
            }),
        }
    }
}

fn monday() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 10, 9, 0, 0).unwrap()
}

fn extractor(completion: Arc<FakeCompletion>) -> EventExtractor {
    EventExtractor::new(
        completion,
        GuestDirectory::new([("Bareket", "bareket@example.com")]),
    )
}

async fn extract(body: &str) -> Result<Extraction, ExtractionError> {
    extractor(FakeCompletion::answering(body))
        .extract("some meeting text", monday())
        .await
}

#[tokio::test]
async fn resolves_basic_event() {
    let body = r#"{"summary":"Meeting with Dan","date":"2024-06-11","time":"15:00","duration_hours":1}"#;
    let Extraction::Event(record) = extract(body).await.unwrap() else {
        panic!("expected an event");
    };

    assert_eq!(record.summary, "Meeting with Dan");
    assert_eq!(
        record.start.naive_local(),
        NaiveDate::from_ymd_opt(2024, 6, 11)
            .unwrap()
            .and_hms_opt(15, 0, 0)
            .unwrap()
    );
    assert_eq!(record.start.to_rfc3339(), "2024-06-11T15:00:00+03:00");
    assert_eq!(record.end.to_rfc3339(), "2024-06-11T16:00:00+03:00");
    assert_eq!((record.end - record.start).num_minutes(), 60);
    assert_eq!(record.display_time_range, "15:00 - 16:00");
    assert_eq!(record.display_date, "יום שלישי, 11/06/2024");
    assert_eq!(record.guest_name, None);
    assert_eq!(record.guest_email, None);
}

#[tokio::test]
async fn tolerates_prose_and_code_fences_around_the_object() {
    let body = "Sure, here you go:\n```json\n{\"summary\": \"Standup\", \"date\": \"2024-06-12\", \"time\": \"09:00\", \"duration_hours\": \"1.5\"}\n```\nAnything else?";
    let Extraction::Event(record) = extract(body).await.unwrap() else {
        panic!("expected an event");
    };
    assert_eq!(record.duration_hours, 1.5);
    assert_eq!(record.display_time_range, "09:00 - 10:30");
}

#[tokio::test]
async fn sentinel_means_no_event() {
    assert_eq!(extract("null").await.unwrap(), Extraction::NoEvent);
    assert_eq!(extract("  Null  ").await.unwrap(), Extraction::NoEvent);
}

#[tokio::test]
async fn text_without_object_means_no_event() {
    assert_eq!(
        extract("I could not find any meeting in that message.").await.unwrap(),
        Extraction::NoEvent
    );
}

#[tokio::test]
async fn known_guest_gets_an_address() {
    let body = r#"{"summary":"Review","date":"2024-06-11","time":"11:00","guest":"Bareket"}"#;
    let Extraction::Event(record) = extract(body).await.unwrap() else {
        panic!("expected an event");
    };
    assert_eq!(record.guest_name.as_deref(), Some("Bareket"));
    assert_eq!(record.guest_email.as_deref(), Some("bareket@example.com"));
}

#[tokio::test]
async fn unknown_guest_keeps_name_without_address() {
    let body = r#"{"summary":"Review","date":"2024-06-11","time":"11:00","guest":"Yossi"}"#;
    let Extraction::Event(record) = extract(body).await.unwrap() else {
        panic!("expected an event");
    };
    assert_eq!(record.guest_name.as_deref(), Some("Yossi"));
    assert_eq!(record.guest_email, None);
}

#[tokio::test]
async fn missing_date_is_an_extraction_error() {
    let body = r#"{"summary":"Review","time":"11:00"}"#;
    assert!(matches!(
        extract(body).await,
        Err(ExtractionError::MissingField("date"))
    ));
}

#[tokio::test]
async fn invalid_json_is_malformed() {
    assert!(matches!(
        extract(r#"{"summary": "Review", "date": }"#).await,
        Err(ExtractionError::Malformed(_))
    ));
}

#[tokio::test]
async fn truncated_object_means_no_event() {
    assert_eq!(
        extract("I think the event is { summary: Meeting").await.unwrap(),
        Extraction::NoEvent
    );
    assert_eq!(
        extract(r#"{"summary": "Review""#).await.unwrap(),
        Extraction::NoEvent
    );
}

#[tokio::test]
async fn long_duration_is_not_rejected() {
    let body = r#"{"summary":"Reserve duty","date":"2024-06-11","time":"08:00","duration_hours":200}"#;
    let Extraction::Event(record) = extract(body).await.unwrap() else {
        panic!("expected an event");
    };
    assert_eq!(record.duration_hours, 200.0);
    assert_eq!((record.end - record.start).num_hours(), 200);
}

#[tokio::test]
async fn missing_duration_defaults_to_one_hour() {
    let body = r#"{"summary":"Dentist","date":"2024-12-25","time":"09:30"}"#;
    let Extraction::Event(record) = extract(body).await.unwrap() else {
        panic!("expected an event");
    };
    assert_eq!(record.duration_hours, 1.0);
    // Winter time in Jerusalem.
    assert_eq!(record.start.to_rfc3339(), "2024-12-25T09:30:00+02:00");
    assert_eq!(record.display_time_range, "09:30 - 10:30");
}

#[tokio::test]
async fn completion_failure_is_an_extraction_error() {
    let completion = Arc::new(FakeCompletion {
        response: Err(529),
        delay: Duration::ZERO,
        prompts: Mutex::new(Vec::new()),
    });
    let result = extractor(completion).extract("meeting", monday()).await;
    assert!(matches!(
        result,
        Err(ExtractionError::Completion(CompletionError::Api { status: 529, .. }))
    ));
}

#[tokio::test]
async fn slow_completion_times_out() {
    let completion = Arc::new(FakeCompletion {
        response: Ok("null".to_string()),
        delay: Duration::from_secs(5),
        prompts: Mutex::new(Vec::new()),
    });
    let result = extractor(completion)
        .with_timeout(Duration::from_millis(20))
        .extract("meeting", monday())
        .await;
    assert!(matches!(result, Err(ExtractionError::Timeout(_))));
}

#[tokio::test]
async fn prompt_is_built_from_one_reference_date() {
    let completion = FakeCompletion::answering("null");
    extractor(completion.clone())
        .extract("ישיבת צוות מחר ב-10:00 כולל Bareket", monday())
        .await
        .unwrap();

    let prompts = completion.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    let prompt = &prompts[0];
    assert!(prompt.contains("Today is 2024-06-10"));
    assert!(prompt.contains("= 2024-06-11"));
    assert!(prompt.contains("Tuesday / יום שלישי = 2024-06-11"));
    assert!(prompt.contains("ישיבת צוות מחר ב-10:00 כולל Bareket"));
    assert!(prompt.contains("\"including Bareket\""));
    assert!(prompt.contains("\"duration_hours\""));
}
