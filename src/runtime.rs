use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::clients::anthropic_client::AnthropicClient;
use crate::clients::google_calendar_client::GoogleCalendarClient;
use crate::clients::telegram_client::TelegramClient;
use crate::config::{BotSettings, ExtractionSettings};
use crate::handlers::dispatch::DispatchHandler;
use crate::service::event_extractor::EventExtractor;
use crate::tasks::ingestion_loop::IngestionLoop;

pub fn build_extractor(settings: &ExtractionSettings) -> EventExtractor {
    if settings.guests.is_empty() {
        warn!("GUESTS is empty; events will be created without invitations");
    }
    let completion = AnthropicClient::new(settings.anthropic_api_key.clone())
        .with_model(settings.completion_model.clone());
    EventExtractor::new(Arc::new(completion), settings.guests.clone())
        .with_timeout(settings.completion_timeout)
}

/// Wires the real clients together and polls until Ctrl-C.
pub async fn run_bot(settings: BotSettings) {
    let telegram = Arc::new(TelegramClient::new(settings.telegram_token.clone()));
    let calendar = Arc::new(
        GoogleCalendarClient::new(settings.calendar_token.clone())
            .with_calendar_id(settings.calendar_id.clone()),
    );
    let handler = DispatchHandler::new(
        build_extractor(&settings.extraction),
        calendar,
        telegram.clone(),
    )
    .with_allowed_sender(settings.allowed_sender.clone())
    .with_sink_timeout(settings.calendar_timeout);

    let ingestion = IngestionLoop::new(telegram, Arc::new(handler), settings.ingestion);
    let shutdown = CancellationToken::new();
    let worker = tokio::spawn(ingestion.run(shutdown.clone()));
    info!(
        restricted = settings.allowed_sender.is_some(),
        guests = settings.extraction.guests.names().count(),
        "bot is running"
    );

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown requested"),
        Err(err) => error!(error = %err, "failed to listen for shutdown signal"),
    }
    shutdown.cancel();

    match worker.await {
        Ok(offset) => info!(offset, "bot stopped"),
        Err(err) => error!(error = %err, "ingestion task failed"),
    }
}
