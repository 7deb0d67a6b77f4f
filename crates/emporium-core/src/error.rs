//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An aggregate was not found.
    #[error("aggregate not found: {0}")]
    AggregateNotFound(Uuid),

    /// Optimistic concurrency conflict. Retryable: the caller must re-read
    /// the stream and resubmit with the current version.
    #[error("concurrency conflict on aggregate {aggregate_id}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        /// The aggregate that had the conflict.
        aggregate_id: Uuid,
        /// The version the caller expected.
        expected: i64,
        /// The actual version found in storage.
        actual: i64,
    },

    /// An append batch mixed events from more than one aggregate. Detected
    /// before any write; not retryable without fixing the batch.
    #[error("invalid event batch: {0}")]
    InvalidEventBatch(String),

    /// An event type is not registered with the codec. Fatal for that
    /// record; must not be silently skipped.
    #[error("unknown event type: {0}")]
    UnknownEventType(String),

    /// An event payload could not be decoded or migrated to the current
    /// schema version.
    #[error("failed to decode event {event_type}: {reason}")]
    EventDecodeFailure {
        /// The stored event type name.
        event_type: String,
        /// Why decoding failed.
        reason: String,
    },

    /// A non-creation event arrived for a read-model record that does not
    /// exist. Recoverable; handling is a projection policy decision.
    #[error("read-model record not found for aggregate {0}")]
    ProjectionRecordNotFound(Uuid),

    /// A validation error in domain or query input.
    #[error("validation error: {0}")]
    Validation(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl DomainError {
    /// Whether the caller can retry the operation after re-reading state.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConcurrencyConflict { .. } | Self::Infrastructure(_)
        )
    }
}
