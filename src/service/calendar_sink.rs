use async_trait::async_trait;

use crate::error::SinkError;
use crate::models::event::EventRecord;

/// Destination calendar. Returns a link to the created event.
#[async_trait]
pub trait CalendarSink: Send + Sync {
    async fn create_event(&self, record: &EventRecord) -> Result<String, SinkError>;
}
