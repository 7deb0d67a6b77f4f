//! In-memory event store.
//!
//! Thread-safe, process-local implementation used by tests and the
//! development loop. A single vector holds every event in global-sequence
//! order; stream rows live in a map keyed by aggregate ID.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use emporium_core::error::DomainError;
use emporium_core::store::{EventStore, NewEvent, RecordedEvent, StreamRecord, TimeRange};

struct Inner {
    /// Stream rows, keyed by aggregate ID (one stream per aggregate).
    streams: HashMap<Uuid, StreamRecord>,
    /// Every event ever appended, in global-sequence order.
    log: Vec<RecordedEvent>,
}

/// In-memory [`EventStore`] with the same optimistic-concurrency semantics
/// as the PostgreSQL store.
#[derive(Clone)]
pub struct InMemoryEventStore {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryEventStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                streams: HashMap::new(),
                log: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, DomainError> {
        self.inner
            .lock()
            .map_err(|_| DomainError::Infrastructure("in-memory store lock poisoned".into()))
    }
}

impl Default for InMemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

fn check_batch(aggregate_id: Uuid, events: &[NewEvent]) -> Result<(), DomainError> {
    if let Some(stray) = events.iter().find(|e| e.aggregate_id != aggregate_id) {
        return Err(DomainError::InvalidEventBatch(format!(
            "batch for aggregate {aggregate_id} contains event {} for aggregate {}",
            stray.event_id, stray.aggregate_id
        )));
    }
    Ok(())
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(
        &self,
        aggregate_type: &str,
        aggregate_id: Uuid,
        expected_version: i64,
        events: Vec<NewEvent>,
    ) -> Result<i64, DomainError> {
        check_batch(aggregate_id, &events)?;

        let mut inner = self.lock()?;

        let actual = inner
            .streams
            .get(&aggregate_id)
            .map_or(0, |stream| stream.version);
        if actual != expected_version {
            return Err(DomainError::ConcurrencyConflict {
                aggregate_id,
                expected: expected_version,
                actual,
            });
        }
        if events.is_empty() {
            return Ok(actual);
        }

        let first_occurred_at = events[0].occurred_at;
        let last_occurred_at = events[events.len() - 1].occurred_at;
        let stream_id = match inner.streams.get(&aggregate_id) {
            Some(stream) => stream.stream_id,
            None => {
                let stream_id = Uuid::new_v4();
                inner.streams.insert(
                    aggregate_id,
                    StreamRecord {
                        stream_id,
                        aggregate_type: aggregate_type.to_owned(),
                        aggregate_id,
                        version: 0,
                        created_at: first_occurred_at,
                        updated_at: first_occurred_at,
                    },
                );
                stream_id
            }
        };

        let new_version = expected_version
            + i64::try_from(events.len())
                .map_err(|_| DomainError::InvalidEventBatch("batch too large".into()))?;
        let mut next_sequence = i64::try_from(inner.log.len())
            .map_err(|_| DomainError::Infrastructure("event log overflow".into()))?
            + 1;
        let mut next_aggregate_version = expected_version + 1;

        for event in events {
            inner.log.push(RecordedEvent {
                event_id: event.event_id,
                stream_id,
                aggregate_id,
                global_sequence: next_sequence,
                event_type: event.event_type,
                event_version: event.event_version,
                aggregate_version: next_aggregate_version,
                payload: event.payload,
                metadata: event.metadata,
                occurred_at: event.occurred_at,
            });
            next_sequence += 1;
            next_aggregate_version += 1;
        }

        let stream = inner
            .streams
            .get_mut(&aggregate_id)
            .ok_or_else(|| DomainError::Infrastructure("stream row vanished mid-append".into()))?;
        stream.version = new_version;
        stream.updated_at = last_occurred_at;

        tracing::debug!(
            %aggregate_id,
            expected_version,
            new_version,
            "appended event batch"
        );
        Ok(new_version)
    }

    async fn read_stream(
        &self,
        aggregate_id: Uuid,
        from_version: i64,
    ) -> Result<Vec<RecordedEvent>, DomainError> {
        let inner = self.lock()?;
        Ok(inner
            .log
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id && e.aggregate_version > from_version)
            .cloned()
            .collect())
    }

    async fn read_all(
        &self,
        after_sequence: i64,
        limit: usize,
    ) -> Result<Vec<RecordedEvent>, DomainError> {
        let inner = self.lock()?;
        Ok(inner
            .log
            .iter()
            .filter(|e| e.global_sequence > after_sequence)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn query_by_type(
        &self,
        event_type: &str,
        range: TimeRange,
    ) -> Result<Vec<RecordedEvent>, DomainError> {
        let inner = self.lock()?;
        let mut matches: Vec<RecordedEvent> = inner
            .log
            .iter()
            .filter(|e| e.event_type == event_type && range.contains(e.occurred_at))
            .cloned()
            .collect();
        matches.sort_by_key(|e| (e.occurred_at, e.global_sequence));
        Ok(matches)
    }

    async fn query_by_correlation_id(
        &self,
        correlation_id: Uuid,
    ) -> Result<Vec<RecordedEvent>, DomainError> {
        let inner = self.lock()?;
        let mut matches: Vec<RecordedEvent> = inner
            .log
            .iter()
            .filter(|e| e.metadata.correlation_id == Some(correlation_id))
            .cloned()
            .collect();
        matches.sort_by_key(|e| (e.occurred_at, e.global_sequence));
        Ok(matches)
    }

    async fn stream_version(&self, aggregate_id: Uuid) -> Result<i64, DomainError> {
        let inner = self.lock()?;
        Ok(inner
            .streams
            .get(&aggregate_id)
            .map_or(0, |stream| stream.version))
    }
}
