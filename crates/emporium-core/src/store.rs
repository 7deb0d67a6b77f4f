//! Event store abstraction.
//!
//! Streams are append-only and created implicitly on first append. Within a
//! stream, `aggregate_version` values form a gapless ascending sequence
//! starting at 1; across streams, `global_sequence` gives a total order used
//! by projection catch-up.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DomainError;
use crate::event::EventMetadata;

/// An event submitted for appending. Stream coordinates (`stream_id`,
/// `aggregate_version`, `global_sequence`) are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewEvent {
    /// Globally unique event identifier, assigned by the producer.
    pub event_id: Uuid,
    /// The aggregate this event belongs to. Every event in a batch must
    /// name the same aggregate.
    pub aggregate_id: Uuid,
    /// Event type name for codec routing.
    pub event_type: String,
    /// Schema version of the payload.
    pub event_version: i32,
    /// Serialized event payload.
    pub payload: serde_json::Value,
    /// Causation/correlation/actor context.
    pub metadata: EventMetadata,
    /// Timestamp of event creation.
    pub occurred_at: DateTime<Utc>,
}

/// A durably persisted event, as returned by read paths.
#[derive(Debug, Clone)]
pub struct RecordedEvent {
    /// Globally unique event identifier.
    pub event_id: Uuid,
    /// The stream this event was appended to.
    pub stream_id: Uuid,
    /// The aggregate the stream belongs to.
    pub aggregate_id: Uuid,
    /// Position in the store-wide total order, ascending from 1.
    pub global_sequence: i64,
    /// Event type name for codec routing.
    pub event_type: String,
    /// Schema version of the payload at write time.
    pub event_version: i32,
    /// Stream version *after* this event; gapless, ascending from 1.
    pub aggregate_version: i64,
    /// Serialized event payload.
    pub payload: serde_json::Value,
    /// Causation/correlation/actor context.
    pub metadata: EventMetadata,
    /// Timestamp of event creation.
    pub occurred_at: DateTime<Utc>,
}

/// One aggregate's stream row.
#[derive(Debug, Clone)]
pub struct StreamRecord {
    /// Stream identifier.
    pub stream_id: Uuid,
    /// Kind of aggregate this stream records (e.g. `"product"`).
    pub aggregate_type: String,
    /// The aggregate whose history this stream is.
    pub aggregate_id: Uuid,
    /// Count of events persisted for this stream.
    pub version: i64,
    /// When the stream was implicitly created.
    pub created_at: DateTime<Utc>,
    /// When the stream last accepted an append.
    pub updated_at: DateTime<Utc>,
}

/// Half-open occurrence-time filter for audit queries.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeRange {
    /// Inclusive lower bound.
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound.
    pub until: Option<DateTime<Utc>>,
}

impl TimeRange {
    /// An unbounded range matching every event.
    #[must_use]
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Whether `at` falls within this range.
    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from.is_none_or(|from| at >= from) && self.until.is_none_or(|until| at < until)
    }
}

/// Append-only event persistence with optimistic concurrency.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Atomically append a batch of events to one aggregate's stream.
    ///
    /// The stream row for (`aggregate_type`, `aggregate_id`) is created on
    /// first append. Each event is assigned `expected_version + 1`,
    /// `expected_version + 2`, … in submitted order, and the stream version
    /// becomes `expected_version + events.len()`. Either all events become
    /// durably visible or none do.
    ///
    /// Returns the new stream version.
    ///
    /// # Errors
    ///
    /// - [`DomainError::InvalidEventBatch`] if any event in the batch names
    ///   a different aggregate (checked before any write).
    /// - [`DomainError::ConcurrencyConflict`] if the stream's current
    ///   version differs from `expected_version`; nothing is written.
    /// - [`DomainError::Infrastructure`] on storage failure.
    async fn append(
        &self,
        aggregate_type: &str,
        aggregate_id: Uuid,
        expected_version: i64,
        events: Vec<NewEvent>,
    ) -> Result<i64, DomainError>;

    /// Load a stream's events in ascending `aggregate_version` order,
    /// skipping any with version `<= from_version`.
    ///
    /// A missing stream yields an empty vector, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Infrastructure`] on storage failure.
    async fn read_stream(
        &self,
        aggregate_id: Uuid,
        from_version: i64,
    ) -> Result<Vec<RecordedEvent>, DomainError>;

    /// Read up to `limit` events across all streams with
    /// `global_sequence > after_sequence`, in global-sequence order.
    ///
    /// This is the projection catch-up feed.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Infrastructure`] on storage failure.
    async fn read_all(
        &self,
        after_sequence: i64,
        limit: usize,
    ) -> Result<Vec<RecordedEvent>, DomainError>;

    /// Audit read: all events of one type within a time range, ordered by
    /// occurrence time.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Infrastructure`] on storage failure.
    async fn query_by_type(
        &self,
        event_type: &str,
        range: TimeRange,
    ) -> Result<Vec<RecordedEvent>, DomainError>;

    /// Audit read: all events sharing a correlation ID, ordered by
    /// occurrence time.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Infrastructure`] on storage failure.
    async fn query_by_correlation_id(
        &self,
        correlation_id: Uuid,
    ) -> Result<Vec<RecordedEvent>, DomainError>;

    /// Current version of an aggregate's stream; 0 if no stream exists.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Infrastructure`] on storage failure.
    async fn stream_version(&self, aggregate_id: Uuid) -> Result<i64, DomainError>;
}
