use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::TransportError;
use crate::models::update::UpdateEnvelope;
use crate::service::transport::{UpdateSource, POLL_GRACE};

pub const DEFAULT_POLL_WAIT: Duration = Duration::from_secs(30);
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(5);

/// Receives every update exactly once, in id order.
#[async_trait]
pub trait UpdateHandler: Send + Sync {
    async fn handle(&self, update: UpdateEnvelope);
}

#[derive(Debug, Clone, Copy)]
pub struct LoopSettings {
    pub initial_offset: i64,
    pub poll_wait: Duration,
    pub backoff: Duration,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            initial_offset: 0,
            poll_wait: DEFAULT_POLL_WAIT,
            backoff: DEFAULT_BACKOFF,
        }
    }
}

#[derive(Debug)]
pub enum TickOutcome {
    Dispatched(usize),
    Idle,
    /// The offset was left untouched; the caller should back off.
    TransportFailed(TransportError),
}

/// Pulls updates from the transport and hands them to the handler one at a
/// time.
///
/// The delivery offset lives here and only here. It moves to `max(id) + 1`
/// as soon as a batch arrives, before dispatch, so a failing handler never
/// causes the same update to be fetched again. It is not persisted: after a
/// restart the transport may redeliver whatever it had not yet seen
/// acknowledged.
pub struct IngestionLoop {
    source: Arc<dyn UpdateSource>,
    handler: Arc<dyn UpdateHandler>,
    offset: i64,
    poll_wait: Duration,
    backoff: Duration,
}

impl IngestionLoop {
    pub fn new(
        source: Arc<dyn UpdateSource>,
        handler: Arc<dyn UpdateHandler>,
        settings: LoopSettings,
    ) -> Self {
        Self {
            source,
            handler,
            offset: settings.initial_offset,
            poll_wait: settings.poll_wait,
            backoff: settings.backoff,
        }
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// One poll followed by dispatch of whatever arrived. Never sleeps.
    pub async fn tick(&mut self) -> TickOutcome {
        match self.poll().await {
            Ok(batch) => self.dispatch(batch).await,
            Err(err) => TickOutcome::TransportFailed(err),
        }
    }

    /// Runs until `shutdown` fires and returns the final offset.
    ///
    /// Shutdown interrupts a pending poll or backoff sleep, but a dispatch
    /// already underway runs to completion.
    pub async fn run(mut self, shutdown: CancellationToken) -> i64 {
        info!(offset = self.offset, "ingestion loop started");
        while !shutdown.is_cancelled() {
            let polled = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                polled = self.poll() => polled,
            };

            match polled {
                Ok(batch) => {
                    if let TickOutcome::Dispatched(count) = self.dispatch(batch).await {
                        debug!(count, offset = self.offset, "batch dispatched");
                    }
                }
                Err(err) => {
                    warn!(
                        error = %err,
                        offset = self.offset,
                        backoff_secs = self.backoff.as_secs_f64(),
                        "polling failed, backing off"
                    );
                    tokio::select! {
                        biased;
                        _ = shutdown.cancelled() => break,
                        _ = sleep(self.backoff) => {}
                    }
                }
            }
        }
        info!(offset = self.offset, "ingestion loop stopped");
        self.offset
    }

    async fn poll(&self) -> Result<Vec<UpdateEnvelope>, TransportError> {
        let cap = self.poll_wait + POLL_GRACE;
        match timeout(cap, self.source.poll_updates(self.offset, self.poll_wait)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(cap)),
        }
    }

    async fn dispatch(&mut self, batch: Vec<UpdateEnvelope>) -> TickOutcome {
        let updates = self.accept(batch);
        if updates.is_empty() {
            return TickOutcome::Idle;
        }
        let count = updates.len();
        for update in updates {
            debug!(update_id = update.id, chat_id = %update.chat_id, "dispatching update");
            self.handler.handle(update).await;
        }
        TickOutcome::Dispatched(count)
    }

    // Orders the batch, drops anything already acknowledged, and advances
    // the offset past the batch.
    fn accept(&mut self, mut batch: Vec<UpdateEnvelope>) -> Vec<UpdateEnvelope> {
        batch.sort_by_key(|update| update.id);
        batch.dedup_by_key(|update| update.id);

        let offset = self.offset;
        let before = batch.len();
        batch.retain(|update| update.id >= offset);
        if batch.len() < before {
            debug!(dropped = before - batch.len(), offset, "dropped stale updates");
        }

        if let Some(last) = batch.last() {
            self.offset = self.offset.max(last.id + 1);
        }
        batch
    }
}
