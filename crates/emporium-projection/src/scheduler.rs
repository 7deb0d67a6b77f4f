//! Catch-up scheduling over the global event feed.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use emporium_core::error::DomainError;
use emporium_core::store::EventStore;

use crate::engine::ProjectionEngine;

/// Polls the event store and feeds new events to a [`ProjectionEngine`].
///
/// Catch-up passes are single-flight: the poll loop awaits each pass before
/// taking another tick, and missed ticks are skipped rather than queued, so
/// a slow pass never stacks concurrent runs behind itself.
pub struct CatchUpScheduler {
    engine: Arc<ProjectionEngine>,
    store: Arc<dyn EventStore>,
    batch_size: usize,
    poll_interval: Duration,
    shutdown: watch::Receiver<bool>,
}

impl CatchUpScheduler {
    /// Creates a scheduler and the sender used to shut it down.
    #[must_use]
    pub fn new(
        engine: Arc<ProjectionEngine>,
        store: Arc<dyn EventStore>,
        batch_size: usize,
        poll_interval: Duration,
    ) -> (Self, watch::Sender<bool>) {
        let (shutdown_tx, shutdown) = watch::channel(false);
        (
            Self {
                engine,
                store,
                batch_size,
                poll_interval,
                shutdown,
            },
            shutdown_tx,
        )
    }

    /// Runs one catch-up batch: read up to `batch_size` events past the
    /// current position and apply them in order. Returns the number of
    /// events read.
    ///
    /// A failing event aborts the batch; the position stays just before it,
    /// so the next pass retries from the failure.
    ///
    /// # Errors
    ///
    /// Propagates any error from the event store or the engine.
    pub async fn run_once(&self) -> Result<usize, DomainError> {
        let position = self.engine.position().await?;
        let events = self
            .store
            .read_all(position.global_sequence, self.batch_size)
            .await?;
        let count = events.len();
        for event in &events {
            self.engine.process_event(event).await?;
        }
        Ok(count)
    }

    /// Runs catch-up batches until the feed is drained. Returns the total
    /// number of events processed.
    ///
    /// # Errors
    ///
    /// Propagates any error from the event store or the engine.
    pub async fn run_to_end(&self) -> Result<usize, DomainError> {
        let mut total = 0;
        loop {
            let count = self.run_once().await?;
            total += count;
            if count == 0 {
                return Ok(total);
            }
        }
    }

    /// Rebuilds the projection from scratch: clear the read model, reset
    /// the position, and replay the entire feed.
    ///
    /// # Errors
    ///
    /// Propagates any error from the event store or the engine.
    pub async fn rebuild(&self) -> Result<usize, DomainError> {
        self.engine.reset().await?;
        self.run_to_end().await
    }

    /// Runs the poll loop until the shutdown sender flips to `true` or is
    /// dropped. Catch-up errors are logged and retried on the next tick.
    pub async fn run(self) {
        let mut shutdown = self.shutdown.clone();
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(
            projection = %self.engine.name(),
            batch_size = self.batch_size,
            poll_interval_ms = self.poll_interval.as_millis(),
            "catch-up scheduler started"
        );
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(cause) = self.run_to_end().await {
                        error!(
                            projection = %self.engine.name(),
                            %cause,
                            retryable = cause.is_retryable(),
                            "catch-up pass failed"
                        );
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!(projection = %self.engine.name(), "catch-up scheduler stopping");
                        return;
                    }
                }
            }
        }
    }
}
