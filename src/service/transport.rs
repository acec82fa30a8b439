use std::time::Duration;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::models::update::UpdateEnvelope;

/// How much longer than the server-side wait a poll may take before the
/// client gives up on it.
pub const POLL_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Formatting {
    Plain,
    Markdown,
}

/// Long-polling side of the chat transport.
#[async_trait]
pub trait UpdateSource: Send + Sync {
    /// Returns updates with `id >= offset`, waiting up to `wait` server-side
    /// when none are pending. May return an empty batch.
    async fn poll_updates(
        &self,
        offset: i64,
        wait: Duration,
    ) -> Result<Vec<UpdateEnvelope>, TransportError>;
}

#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        formatting: Formatting,
    ) -> Result<(), TransportError>;
}
