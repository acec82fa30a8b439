use chrono::Utc;
use clap::{Parser, Subcommand};
use inquire::Text;

use calendarBot::config::ExtractionSettings;
use calendarBot::runtime::build_extractor;
use calendarBot::service::event_extractor::Extraction;

#[derive(Parser)]
#[command(about = "Turns chat messages into calendar events")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Poll Telegram and add events to the calendar (default).
    Run,
    /// Extract a single event and print it without touching the calendar.
    Parse { text: Option<String> },
}

pub async fn parse_once(
    settings: &ExtractionSettings,
    text: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let text = match text {
        Some(text) => text,
        None => specify_text()?,
    };

    let extractor = build_extractor(settings);
    match extractor.extract(&text, Utc::now()).await? {
        Extraction::Event(record) => println!("{}", serde_json::to_string_pretty(&record)?),
        Extraction::NoEvent => println!("No event found in {text:?}"),
    }
    Ok(())
}

fn specify_text() -> Result<String, Box<dyn std::error::Error>> {
    Ok(Text::new("Describe the meeting.").prompt()?)
}
