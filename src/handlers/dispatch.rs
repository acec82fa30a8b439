use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::error::SinkError;
use crate::models::update::UpdateEnvelope;
use crate::service::calendar_sink::CalendarSink;
use crate::service::event_extractor::{EventExtractor, Extraction};
use crate::service::reply_text::{
    confirmation_message, extraction_error_message, sink_error_message, HELP_MESSAGE,
    NO_EVENT_MESSAGE, PERMISSION_DENIED_MESSAGE, PROCESSING_MESSAGE,
};
use crate::service::transport::{Formatting, MessageSender};
use crate::tasks::ingestion_loop::UpdateHandler;

pub const DEFAULT_CALENDAR_TIMEOUT: Duration = Duration::from_secs(20);

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Empty text or a command the bot does not handle. No reply.
    Ignored,
    Denied,
    Help,
    NoEvent,
    ExtractionFailed,
    SinkFailed,
    Created { link: String },
}

/// Per-update pipeline: authorize, extract, insert, reply.
pub struct DispatchHandler {
    extractor: EventExtractor,
    sink: Arc<dyn CalendarSink>,
    sender: Arc<dyn MessageSender>,
    allowed_sender: Option<String>,
    sink_timeout: Duration,
    clock: Clock,
}

impl DispatchHandler {
    pub fn new(
        extractor: EventExtractor,
        sink: Arc<dyn CalendarSink>,
        sender: Arc<dyn MessageSender>,
    ) -> Self {
        Self {
            extractor,
            sink,
            sender,
            allowed_sender: None,
            sink_timeout: DEFAULT_CALENDAR_TIMEOUT,
            clock: Arc::new(Utc::now),
        }
    }

    /// Restricts the bot to one sender. `None` leaves it open.
    pub fn with_allowed_sender(mut self, sender_id: Option<String>) -> Self {
        self.allowed_sender = sender_id;
        self
    }

    pub fn with_sink_timeout(mut self, timeout: Duration) -> Self {
        self.sink_timeout = timeout;
        self
    }

    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    pub async fn dispatch(&self, update: &UpdateEnvelope) -> DispatchOutcome {
        let text = update.text.trim();
        if text.is_empty() {
            return DispatchOutcome::Ignored;
        }

        if let Some(allowed) = &self.allowed_sender {
            if &update.sender_id != allowed {
                warn!(sender_id = %update.sender_id, "rejected message from unauthorized sender");
                self.reply(&update.chat_id, PERMISSION_DENIED_MESSAGE, Formatting::Plain)
                    .await;
                return DispatchOutcome::Denied;
            }
        }

        if let Some(command) = command_name(text) {
            return match command {
                "start" | "help" => {
                    self.reply(&update.chat_id, HELP_MESSAGE, Formatting::Markdown)
                        .await;
                    DispatchOutcome::Help
                }
                _ => DispatchOutcome::Ignored,
            };
        }

        self.reply(&update.chat_id, PROCESSING_MESSAGE, Formatting::Plain)
            .await;

        let record = match self.extractor.extract(text, (self.clock)()).await {
            Ok(Extraction::Event(record)) => record,
            Ok(Extraction::NoEvent) => {
                self.reply(&update.chat_id, NO_EVENT_MESSAGE, Formatting::Markdown)
                    .await;
                return DispatchOutcome::NoEvent;
            }
            Err(err) => {
                error!(update_id = update.id, error = %err, "event extraction failed");
                self.reply(
                    &update.chat_id,
                    &extraction_error_message(&err),
                    Formatting::Plain,
                )
                .await;
                return DispatchOutcome::ExtractionFailed;
            }
        };

        let created = match tokio::time::timeout(self.sink_timeout, self.sink.create_event(&record))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(SinkError::Timeout(self.sink_timeout)),
        };

        match created {
            Ok(link) => {
                self.reply(
                    &update.chat_id,
                    &confirmation_message(&record, &link),
                    Formatting::Markdown,
                )
                .await;
                DispatchOutcome::Created { link }
            }
            Err(err) => {
                error!(update_id = update.id, error = %err, "calendar insert failed");
                self.reply(&update.chat_id, &sink_error_message(&err), Formatting::Plain)
                    .await;
                DispatchOutcome::SinkFailed
            }
        }
    }

    // A failed reply is logged; the update is still considered handled. A
    // Markdown reply the transport rejects is sent once more as plain text.
    async fn reply(&self, chat_id: &str, text: &str, formatting: Formatting) {
        let Err(err) = self.sender.send_message(chat_id, text, formatting).await else {
            return;
        };
        if formatting == Formatting::Plain {
            warn!(chat_id, error = %err, "failed to send reply");
            return;
        }

        warn!(chat_id, error = %err, "markdown reply rejected, resending as plain text");
        if let Err(err) = self
            .sender
            .send_message(chat_id, text, Formatting::Plain)
            .await
        {
            warn!(chat_id, error = %err, "failed to send reply");
        }
    }
}

#[async_trait]
impl UpdateHandler for DispatchHandler {
    async fn handle(&self, update: UpdateEnvelope) {
        let outcome = self.dispatch(&update).await;
        info!(update_id = update.id, outcome = ?outcome, "update handled");
    }
}

/// `/start@my_bot extra` -> `start`.
fn command_name(text: &str) -> Option<&str> {
    let token = text.strip_prefix('/')?.split_whitespace().next()?;
    token.split('@').next()
}
