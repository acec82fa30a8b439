use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::error::SinkError;
use crate::models::event::EventRecord;
use crate::service::calendar_sink::CalendarSink;
use crate::service::date_context::EVENT_TIMEZONE;

const GOOGLE_CALENDAR_API_URL: &str = "https://www.googleapis.com/calendar/v3";
pub const DEFAULT_CALENDAR_ID: &str = "primary";
const REMINDER_MINUTES: u32 = 30;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Deserialize)]
struct CreatedEvent {
    #[serde(rename = "htmlLink")]
    html_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Inserts events through the Google Calendar v3 REST API.
///
/// Token acquisition is handled elsewhere; this client only presents the
/// bearer token it was given.
pub struct GoogleCalendarClient {
    http: reqwest::Client,
    access_token: String,
    calendar_id: String,
    base_url: String,
}

impl GoogleCalendarClient {
    pub fn new(access_token: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            access_token,
            calendar_id: DEFAULT_CALENDAR_ID.to_string(),
            base_url: GOOGLE_CALENDAR_API_URL.to_string(),
        }
    }

    pub fn with_calendar_id(mut self, calendar_id: impl Into<String>) -> Self {
        self.calendar_id = calendar_id.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn events_url(&self) -> Result<Url, SinkError> {
        let invalid = || SinkError::InvalidResponse(format!("invalid calendar URL {}", self.base_url));
        let mut url = Url::parse(&self.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .extend(["calendars", self.calendar_id.as_str(), "events"]);
        url.query_pairs_mut().append_pair("sendUpdates", "all");
        Ok(url)
    }
}

pub fn event_body(record: &EventRecord) -> serde_json::Value {
    let mut body = json!({
        "summary": record.summary,
        "start": {
            "dateTime": record.start.to_rfc3339(),
            "timeZone": EVENT_TIMEZONE.name(),
        },
        "end": {
            "dateTime": record.end.to_rfc3339(),
            "timeZone": EVENT_TIMEZONE.name(),
        },
        "reminders": {
            "useDefault": false,
            "overrides": [
                { "method": "popup", "minutes": REMINDER_MINUTES },
            ],
        },
    });
    if let Some(email) = &record.guest_email {
        body["attendees"] = json!([{ "email": email }]);
    }
    body
}

#[async_trait]
impl CalendarSink for GoogleCalendarClient {
    async fn create_event(&self, record: &EventRecord) -> Result<String, SinkError> {
        let response = self
            .http
            .post(self.events_url()?)
            .timeout(REQUEST_TIMEOUT)
            .bearer_auth(&self.access_token)
            .json(&event_body(record))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SinkError::Timeout(REQUEST_TIMEOUT)
                } else {
                    SinkError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| SinkError::Network(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|envelope| envelope.error.message)
                .unwrap_or(text);
            warn!(status = status.as_u16(), %message, "calendar insert rejected");
            return Err(match status {
                StatusCode::UNAUTHORIZED => SinkError::Authentication(message),
                _ => SinkError::Api {
                    status: status.as_u16(),
                    message,
                },
            });
        }

        let created: CreatedEvent = serde_json::from_str(&text)
            .map_err(|e| SinkError::InvalidResponse(e.to_string()))?;
        let link = created
            .html_link
            .ok_or_else(|| SinkError::InvalidResponse("response has no htmlLink".to_string()))?;
        info!(calendar_id = %self.calendar_id, %link, "calendar event created");
        Ok(link)
    }
}
