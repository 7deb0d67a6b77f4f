//! Test stores — mock `EventStore` implementations for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use emporium_core::error::DomainError;
use emporium_core::store::{EventStore, NewEvent, RecordedEvent, TimeRange};
use uuid::Uuid;

/// An event store that serves a canned event list from every read path and
/// records every append without version checking.
#[derive(Debug, Default)]
pub struct RecordingEventStore {
    events: Mutex<Vec<RecordedEvent>>,
    appended: Mutex<Vec<(Uuid, i64, Vec<NewEvent>)>>,
}

impl RecordingEventStore {
    /// Creates a store that will serve `events` from its read paths.
    #[must_use]
    pub fn with_events(events: Vec<RecordedEvent>) -> Self {
        Self {
            events: Mutex::new(events),
            appended: Mutex::new(Vec::new()),
        }
    }

    /// Returns a snapshot of all append calls made so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn appended_batches(&self) -> Vec<(Uuid, i64, Vec<NewEvent>)> {
        self.appended.lock().unwrap().clone()
    }

    fn canned(&self) -> Vec<RecordedEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventStore for RecordingEventStore {
    async fn append(
        &self,
        _aggregate_type: &str,
        aggregate_id: Uuid,
        expected_version: i64,
        events: Vec<NewEvent>,
    ) -> Result<i64, DomainError> {
        let new_version = expected_version
            + i64::try_from(events.len()).unwrap_or(0);
        self.appended
            .lock()
            .unwrap()
            .push((aggregate_id, expected_version, events));
        Ok(new_version)
    }

    async fn read_stream(
        &self,
        aggregate_id: Uuid,
        from_version: i64,
    ) -> Result<Vec<RecordedEvent>, DomainError> {
        Ok(self
            .canned()
            .into_iter()
            .filter(|e| e.aggregate_id == aggregate_id && e.aggregate_version > from_version)
            .collect())
    }

    async fn read_all(
        &self,
        after_sequence: i64,
        limit: usize,
    ) -> Result<Vec<RecordedEvent>, DomainError> {
        Ok(self
            .canned()
            .into_iter()
            .filter(|e| e.global_sequence > after_sequence)
            .take(limit)
            .collect())
    }

    async fn query_by_type(
        &self,
        event_type: &str,
        range: TimeRange,
    ) -> Result<Vec<RecordedEvent>, DomainError> {
        Ok(self
            .canned()
            .into_iter()
            .filter(|e| e.event_type == event_type && range.contains(e.occurred_at))
            .collect())
    }

    async fn query_by_correlation_id(
        &self,
        correlation_id: Uuid,
    ) -> Result<Vec<RecordedEvent>, DomainError> {
        Ok(self
            .canned()
            .into_iter()
            .filter(|e| e.metadata.correlation_id == Some(correlation_id))
            .collect())
    }

    async fn stream_version(&self, aggregate_id: Uuid) -> Result<i64, DomainError> {
        Ok(self
            .canned()
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .map(|e| e.aggregate_version)
            .max()
            .unwrap_or(0))
    }
}

/// An event store with no history that silently accepts appends. Useful for
/// "aggregate not found" scenarios and creation commands.
#[derive(Debug)]
pub struct EmptyEventStore;

#[async_trait]
impl EventStore for EmptyEventStore {
    async fn append(
        &self,
        _aggregate_type: &str,
        _aggregate_id: Uuid,
        expected_version: i64,
        events: Vec<NewEvent>,
    ) -> Result<i64, DomainError> {
        Ok(expected_version + i64::try_from(events.len()).unwrap_or(0))
    }

    async fn read_stream(
        &self,
        _aggregate_id: Uuid,
        _from_version: i64,
    ) -> Result<Vec<RecordedEvent>, DomainError> {
        Ok(vec![])
    }

    async fn read_all(
        &self,
        _after_sequence: i64,
        _limit: usize,
    ) -> Result<Vec<RecordedEvent>, DomainError> {
        Ok(vec![])
    }

    async fn query_by_type(
        &self,
        _event_type: &str,
        _range: TimeRange,
    ) -> Result<Vec<RecordedEvent>, DomainError> {
        Ok(vec![])
    }

    async fn query_by_correlation_id(
        &self,
        _correlation_id: Uuid,
    ) -> Result<Vec<RecordedEvent>, DomainError> {
        Ok(vec![])
    }

    async fn stream_version(&self, _aggregate_id: Uuid) -> Result<i64, DomainError> {
        Ok(0)
    }
}

/// An event store that always returns an infrastructure error. Useful for
/// testing error-handling paths.
#[derive(Debug)]
pub struct FailingEventStore;

fn refused<T>() -> Result<T, DomainError> {
    Err(DomainError::Infrastructure("connection refused".into()))
}

#[async_trait]
impl EventStore for FailingEventStore {
    async fn append(
        &self,
        _aggregate_type: &str,
        _aggregate_id: Uuid,
        _expected_version: i64,
        _events: Vec<NewEvent>,
    ) -> Result<i64, DomainError> {
        refused()
    }

    async fn read_stream(
        &self,
        _aggregate_id: Uuid,
        _from_version: i64,
    ) -> Result<Vec<RecordedEvent>, DomainError> {
        refused()
    }

    async fn read_all(
        &self,
        _after_sequence: i64,
        _limit: usize,
    ) -> Result<Vec<RecordedEvent>, DomainError> {
        refused()
    }

    async fn query_by_type(
        &self,
        _event_type: &str,
        _range: TimeRange,
    ) -> Result<Vec<RecordedEvent>, DomainError> {
        refused()
    }

    async fn query_by_correlation_id(
        &self,
        _correlation_id: Uuid,
    ) -> Result<Vec<RecordedEvent>, DomainError> {
        refused()
    }

    async fn stream_version(&self, _aggregate_id: Uuid) -> Result<i64, DomainError> {
        refused()
    }
}
