use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc};
use tracing::{debug, info, warn};

use crate::error::ExtractionError;
use crate::models::event::{EventRecord, RawExtraction};
use crate::service::completion_service::CompletionService;
use crate::service::date_context::{
    weekday_name_en, weekday_name_he, DateContext, ALL_WEEKDAYS, EVENT_TIMEZONE,
};
use crate::service::guest_directory::GuestDirectory;

/// What the backend must answer, verbatim, when the text holds no event.
pub const NO_EVENT_SENTINEL: &str = "null";
pub const DEFAULT_START_TIME: &str = "09:00";
pub const DEFAULT_DURATION_HOURS: f64 = 1.0;
pub const DEFAULT_COMPLETION_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Event(EventRecord),
    /// Not enough information; the user should rephrase.
    NoEvent,
}

pub struct EventExtractor {
    completion: Arc<dyn CompletionService>,
    guests: GuestDirectory,
    timeout: Duration,
}

impl EventExtractor {
    pub fn new(completion: Arc<dyn CompletionService>, guests: GuestDirectory) -> Self {
        Self {
            completion,
            guests,
            timeout: DEFAULT_COMPLETION_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Turns free text into an event, resolving relative dates against `now`.
    ///
    /// # Errors
    /// `ExtractionError` when the backend fails, times out, or answers with
    /// something that looks like an event but cannot be validated.
    pub async fn extract(
        &self,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<Extraction, ExtractionError> {
        let ctx = DateContext::resolve(now);
        let prompt = build_prompt(text, &ctx, &self.guests);

        debug!(reference_date = %ctx.reference_date, "requesting event extraction");
        let response = match tokio::time::timeout(self.timeout, self.completion.complete(&prompt))
            .await
        {
            Ok(result) => result?,
            Err(_) => return Err(ExtractionError::Timeout(self.timeout)),
        };
        debug!(response = %response, "completion response received");

        let extraction = interpret_response(&response, &ctx, &self.guests)?;
        match &extraction {
            Extraction::Event(record) => info!(
                summary = %record.summary,
                start = %record.start,
                guest = record.guest_name.as_deref().unwrap_or("-"),
                "event extracted"
            ),
            Extraction::NoEvent => info!("no event found in message"),
        }
        Ok(extraction)
    }
}

pub fn build_prompt(text: &str, ctx: &DateContext, guests: &GuestDirectory) -> String {
    let mut prompt = format!(
        "Today is {today} ({weekday_en}, יום {weekday_he}). All times are local to {zone}.\n\
         \n\
         Find the details of a meeting or appointment in the following message:\n\
         \"{text}\"\n\
         \n\
         Reply with a single JSON object and no other text, shaped exactly like:\n\
         {{\"summary\": \"<event title>\", \"date\": \"YYYY-MM-DD\", \"time\": \"HH:MM\", \"duration_hours\": <number>, \"guest\": <string or null>}}\n\
         \n\
         Rules:\n\
         - \"today\" / \"היום\" = {today}\n\
         - \"tomorrow\" / \"מחר\" = {tomorrow}\n\
         - A weekday name means its nearest upcoming date, today included:\n",
        today = ctx.today(),
        tomorrow = ctx.tomorrow(),
        weekday_en = weekday_name_en(ctx.reference_weekday),
        weekday_he = weekday_name_he(ctx.reference_weekday),
        zone = EVENT_TIMEZONE.name(),
    );

    let start = ctx.reference_weekday.num_days_from_monday() as usize;
    for weekday in ALL_WEEKDAYS.iter().cycle().skip(start).take(7) {
        prompt.push_str(&format!(
            "  - {} / יום {} = {}\n",
            weekday_name_en(*weekday),
            weekday_name_he(*weekday),
            ctx.next_weekday(*weekday)
        ));
    }

    prompt.push_str(&format!(
        "- If no time is given, use {DEFAULT_START_TIME}\n\
         - If no duration is given, use {DEFAULT_DURATION_HOURS:.0}\n"
    ));
    for name in guests.names() {
        prompt.push_str(&format!(
            "- If the message says \"כולל {name}\" or \"including {name}\", set guest to \"{name}\"\n"
        ));
    }
    prompt.push_str("- Otherwise set guest to null\n");
    prompt.push_str(&format!(
        "- If there is not enough information for an event, reply with exactly: {NO_EVENT_SENTINEL}\n"
    ));
    prompt
}

/// Second half of the pipeline: locate the embedded object, then validate it.
pub fn interpret_response(
    response: &str,
    ctx: &DateContext,
    guests: &GuestDirectory,
) -> Result<Extraction, ExtractionError> {
    let trimmed = response.trim();
    if trimmed.to_lowercase() == NO_EVENT_SENTINEL {
        return Ok(Extraction::NoEvent);
    }

    let Some(object) = find_json_object(trimmed) else {
        warn!("completion response contained no JSON object");
        return Ok(Extraction::NoEvent);
    };

    let raw: RawExtraction =
        serde_json::from_str(object).map_err(|e| ExtractionError::Malformed(e.to_string()))?;
    build_record(raw, ctx, guests).map(Extraction::Event)
}

/// Returns the first balanced `{...}` in `text`.
///
/// Braces inside JSON string literals do not count. An object cut off before
/// its closing brace (a truncated completion) is not an object.
pub fn find_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

pub fn build_record(
    raw: RawExtraction,
    ctx: &DateContext,
    guests: &GuestDirectory,
) -> Result<EventRecord, ExtractionError> {
    let summary = required(raw.summary, "summary")?;
    let date_text = required(raw.date, "date")?;
    let time_text = required(raw.time, "time")?;

    let date = parse_date(&date_text, ctx).ok_or_else(|| ExtractionError::InvalidField {
        field: "date",
        value: date_text.clone(),
    })?;
    let time = parse_time(&time_text).ok_or_else(|| ExtractionError::InvalidField {
        field: "time",
        value: time_text.clone(),
    })?;

    let duration_hours = match raw.duration_hours {
        Some(hours) if hours.is_finite() && hours > 0.0 => hours,
        _ => DEFAULT_DURATION_HOURS,
    };
    let mut seconds = (duration_hours * 3600.0).round() as i64;
    let duration_hours = if seconds > 0 {
        duration_hours
    } else {
        seconds = (DEFAULT_DURATION_HOURS * 3600.0) as i64;
        DEFAULT_DURATION_HOURS
    };

    // A local time skipped by a DST jump has no instant.
    let start = EVENT_TIMEZONE
        .from_local_datetime(&date.and_time(time))
        .earliest()
        .ok_or_else(|| ExtractionError::InvalidField {
            field: "time",
            value: format!("{date_text} {time_text}"),
        })?;
    let end = TimeDelta::try_seconds(seconds)
        .and_then(|delta| start.checked_add_signed(delta))
        .ok_or_else(|| ExtractionError::InvalidField {
            field: "duration_hours",
            value: duration_hours.to_string(),
        })?;

    let guest_name = raw
        .guest
        .map(|g| g.trim().to_string())
        .filter(|g| !g.is_empty() && g.to_lowercase() != NO_EVENT_SENTINEL);
    let guest_email = guest_name
        .as_deref()
        .and_then(|name| guests.lookup(name))
        .map(str::to_string);

    Ok(EventRecord {
        summary,
        display_date: format!(
            "יום {}, {}",
            weekday_name_he(start.weekday()),
            start.format("%d/%m/%Y")
        ),
        display_time_range: format!("{} - {}", start.format("%H:%M"), end.format("%H:%M")),
        start,
        end,
        duration_hours,
        guest_name,
        guest_email,
    })
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ExtractionError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ExtractionError::MissingField(field))
}

fn parse_date(text: &str, ctx: &DateContext) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(text, "%d/%m/%Y"))
        .ok()
        .or_else(|| ctx.resolve_expression(text))
}

fn parse_time(text: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(text, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M:%S"))
        .ok()
}
