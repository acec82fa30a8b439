use chrono::DateTime;
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Unvalidated payload as the completion backend produced it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawExtraction {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default, alias = "durationHours", deserialize_with = "lenient_hours")]
    pub duration_hours: Option<f64>,
    #[serde(default)]
    pub guest: Option<String>,
}

// Backends sometimes quote numbers; anything unreadable falls back to the default.
fn lenient_hours<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// A validated, display-ready calendar event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRecord {
    pub summary: String,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
    pub duration_hours: f64,
    pub display_date: String,
    pub display_time_range: String,
    pub guest_name: Option<String>,
    pub guest_email: Option<String>,
}

impl EventRecord {
    /// Duration rendered without a trailing `.0` for whole hours.
    pub fn duration_label(&self) -> String {
        if self.duration_hours.fract() == 0.0 {
            format!("{}", self.duration_hours as i64)
        } else {
            format!("{}", self.duration_hours)
        }
    }
}
