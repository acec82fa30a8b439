use crate::error::{ExtractionError, SinkError};
use crate::models::event::EventRecord;

pub const HELP_MESSAGE: &str = "👋 שלום! אני הבוט שלך ליומן.\n\n\
    שלח לי הודעה עם פרטי הפגישה, לדוגמה:\n\
    • *פגישה עם דן ביום שלישי ב-15:00*\n\
    • *ישיבת צוות מחר ב-10:00 לשעה*\n\
    • *רופא שיניים 25/12 ב-9:30*\n\n\
    ואני אוסיף אותה ל-Google Calendar שלך! 📅";

pub const PERMISSION_DENIED_MESSAGE: &str = "⛔ אין לך הרשאה להשתמש בבוט זה.";

pub const PROCESSING_MESSAGE: &str = "⏳ מעבד את ההודעה...";

pub const NO_EVENT_MESSAGE: &str = "❌ לא הצלחתי לזהות פרטי אירוע בהודעה.\n\
    נסה לכלול תאריך/יום ושעה, לדוגמה:\n\
    *פגישה עם יוסי מחר ב-14:00*";

pub fn extraction_error_message(err: &ExtractionError) -> String {
    format!("❌ לא הצלחתי לפענח את ההודעה: {err}")
}

pub fn sink_error_message(err: &SinkError) -> String {
    format!("❌ האירוע לא נוסף ליומן: {err}")
}

/// Markdown confirmation sent after the calendar accepted the event.
pub fn confirmation_message(record: &EventRecord, link: &str) -> String {
    let guest_line = match (&record.guest_name, &record.guest_email) {
        (Some(name), Some(_)) => format!("\n👤 זימון נשלח ל: {}", escape_markdown(name)),
        _ => String::new(),
    };
    format!(
        "✅ נוסף ליומן!\n\n\
         📌 {summary}\n\
         📅 {date}\n\
         ⏰ {time}\n\
         ⏱ משך: {duration} שעה{guest_line}\n\n\
         🔗 [פתח באירוע]({link})",
        summary = bold_markdown(&record.summary),
        date = record.display_date,
        time = record.display_time_range,
        duration = record.duration_label(),
    )
}

/// Wraps `text` in a bold entity. Legacy Markdown has no escapes inside an
/// entity, so each `*` closes the entity, is escaped, and reopens it.
pub fn bold_markdown(text: &str) -> String {
    text.split('*')
        .map(|part| {
            if part.is_empty() {
                String::new()
            } else {
                format!("*{part}*")
            }
        })
        .collect::<Vec<_>>()
        .join("\\*")
}

/// Escapes the characters Telegram's legacy Markdown treats as markup outside
/// an entity.
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '_' | '*' | '`' | '[') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
