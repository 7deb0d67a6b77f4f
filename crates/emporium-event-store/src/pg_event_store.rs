//! `PostgreSQL` implementation of the `EventStore` trait.
//!
//! Appends run inside a single transaction: the stream row is locked with
//! `SELECT ... FOR UPDATE`, the expected version is checked, events are
//! inserted, and the stream version is bumped. Either everything commits or
//! nothing does.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use emporium_core::error::DomainError;
use emporium_core::event::EventMetadata;
use emporium_core::store::{EventStore, NewEvent, RecordedEvent, TimeRange};

/// PostgreSQL-backed event store.
#[derive(Debug, Clone)]
pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    /// Creates a new `PgEventStore` on an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the event store tables if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the DDL fails.
    pub async fn ensure_schema(&self) -> Result<(), DomainError> {
        sqlx::raw_sql(crate::schema::CREATE_EVENT_STORE_TABLES)
            .execute(&self.pool)
            .await
            .map_err(infra)?;
        Ok(())
    }
}

fn infra(e: sqlx::Error) -> DomainError {
    DomainError::Infrastructure(e.to_string())
}

fn row_to_event(row: &PgRow) -> Result<RecordedEvent, sqlx::Error> {
    Ok(RecordedEvent {
        event_id: row.try_get("event_id")?,
        stream_id: row.try_get("stream_id")?,
        aggregate_id: row.try_get("aggregate_id")?,
        global_sequence: row.try_get("global_sequence")?,
        event_type: row.try_get("event_type")?,
        event_version: row.try_get("event_version")?,
        aggregate_version: row.try_get("aggregate_version")?,
        payload: row.try_get("payload")?,
        metadata: EventMetadata {
            causation_id: row.try_get("causation_id")?,
            correlation_id: row.try_get("correlation_id")?,
            actor: row.try_get("actor")?,
        },
        occurred_at: row.try_get("occurred_at")?,
    })
}

const SELECT_EVENT_COLUMNS: &str = "SELECT event_id, stream_id, aggregate_id, global_sequence, \
     event_type, event_version, aggregate_version, payload, \
     causation_id, correlation_id, actor, occurred_at FROM domain_events";

#[async_trait]
impl EventStore for PgEventStore {
    async fn append(
        &self,
        aggregate_type: &str,
        aggregate_id: Uuid,
        expected_version: i64,
        events: Vec<NewEvent>,
    ) -> Result<i64, DomainError> {
        if let Some(stray) = events.iter().find(|e| e.aggregate_id != aggregate_id) {
            return Err(DomainError::InvalidEventBatch(format!(
                "batch for aggregate {aggregate_id} contains event {} for aggregate {}",
                stray.event_id, stray.aggregate_id
            )));
        }

        let mut tx = self.pool.begin().await.map_err(infra)?;

        let stream_row = sqlx::query(
            "SELECT stream_id, version FROM event_streams WHERE aggregate_id = $1 FOR UPDATE",
        )
        .bind(aggregate_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(infra)?;

        let (stream_id, actual) = match stream_row {
            Some(row) => (
                row.try_get::<Uuid, _>("stream_id").map_err(infra)?,
                row.try_get::<i64, _>("version").map_err(infra)?,
            ),
            None => {
                let stream_id = Uuid::new_v4();
                let inserted = sqlx::query(
                    "INSERT INTO event_streams (stream_id, aggregate_type, aggregate_id, version) \
                     VALUES ($1, $2, $3, 0)",
                )
                .bind(stream_id)
                .bind(aggregate_type)
                .bind(aggregate_id)
                .execute(&mut *tx)
                .await;
                match inserted {
                    Ok(_) => (stream_id, 0),
                    Err(e)
                        if e.as_database_error()
                            .is_some_and(sqlx::error::DatabaseError::is_unique_violation) =>
                    {
                        // Two writers raced on a fresh aggregate: both missed
                        // the FOR UPDATE row and the loser hit the
                        // aggregate_id unique index once the winner
                        // committed. Surface it as the version conflict it
                        // is, against the committed stream row.
                        drop(tx);
                        let actual = self.stream_version(aggregate_id).await?;
                        return Err(DomainError::ConcurrencyConflict {
                            aggregate_id,
                            expected: expected_version,
                            actual,
                        });
                    }
                    Err(e) => return Err(infra(e)),
                }
            }
        };

        if actual != expected_version {
            // Dropping the transaction rolls back the speculative stream row.
            return Err(DomainError::ConcurrencyConflict {
                aggregate_id,
                expected: expected_version,
                actual,
            });
        }

        let new_version = expected_version
            + i64::try_from(events.len())
                .map_err(|_| DomainError::InvalidEventBatch("batch too large".into()))?;

        for (offset, event) in events.into_iter().enumerate() {
            let offset = i64::try_from(offset)
                .map_err(|_| DomainError::InvalidEventBatch("batch too large".into()))?;
            let aggregate_version = expected_version + 1 + offset;
            sqlx::query(
                "INSERT INTO domain_events \
                 (event_id, stream_id, aggregate_id, event_type, event_version, \
                  aggregate_version, payload, causation_id, correlation_id, actor, occurred_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
            )
            .bind(event.event_id)
            .bind(stream_id)
            .bind(aggregate_id)
            .bind(&event.event_type)
            .bind(event.event_version)
            .bind(aggregate_version)
            .bind(&event.payload)
            .bind(event.metadata.causation_id)
            .bind(event.metadata.correlation_id)
            .bind(&event.metadata.actor)
            .bind(event.occurred_at)
            .execute(&mut *tx)
            .await
            .map_err(infra)?;
        }

        sqlx::query("UPDATE event_streams SET version = $2, updated_at = NOW() WHERE stream_id = $1")
            .bind(stream_id)
            .bind(new_version)
            .execute(&mut *tx)
            .await
            .map_err(infra)?;

        tx.commit().await.map_err(infra)?;

        tracing::debug!(%aggregate_id, expected_version, new_version, "appended event batch");
        Ok(new_version)
    }

    async fn read_stream(
        &self,
        aggregate_id: Uuid,
        from_version: i64,
    ) -> Result<Vec<RecordedEvent>, DomainError> {
        let sql = format!(
            "{SELECT_EVENT_COLUMNS} WHERE aggregate_id = $1 AND aggregate_version > $2 \
             ORDER BY aggregate_version"
        );
        let rows = sqlx::query(&sql)
            .bind(aggregate_id)
            .bind(from_version)
            .fetch_all(&self.pool)
            .await
            .map_err(infra)?;
        rows.iter()
            .map(|row| row_to_event(row).map_err(infra))
            .collect()
    }

    async fn read_all(
        &self,
        after_sequence: i64,
        limit: usize,
    ) -> Result<Vec<RecordedEvent>, DomainError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let sql = format!(
            "{SELECT_EVENT_COLUMNS} WHERE global_sequence > $1 \
             ORDER BY global_sequence LIMIT $2"
        );
        let rows = sqlx::query(&sql)
            .bind(after_sequence)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(infra)?;
        rows.iter()
            .map(|row| row_to_event(row).map_err(infra))
            .collect()
    }

    async fn query_by_type(
        &self,
        event_type: &str,
        range: TimeRange,
    ) -> Result<Vec<RecordedEvent>, DomainError> {
        let sql = format!(
            "{SELECT_EVENT_COLUMNS} WHERE event_type = $1 \
             AND ($2::timestamptz IS NULL OR occurred_at >= $2) \
             AND ($3::timestamptz IS NULL OR occurred_at < $3) \
             ORDER BY occurred_at, global_sequence"
        );
        let rows = sqlx::query(&sql)
            .bind(event_type)
            .bind(range.from)
            .bind(range.until)
            .fetch_all(&self.pool)
            .await
            .map_err(infra)?;
        rows.iter()
            .map(|row| row_to_event(row).map_err(infra))
            .collect()
    }

    async fn query_by_correlation_id(
        &self,
        correlation_id: Uuid,
    ) -> Result<Vec<RecordedEvent>, DomainError> {
        let sql = format!(
            "{SELECT_EVENT_COLUMNS} WHERE correlation_id = $1 \
             ORDER BY occurred_at, global_sequence"
        );
        let rows = sqlx::query(&sql)
            .bind(correlation_id)
            .fetch_all(&self.pool)
            .await
            .map_err(infra)?;
        rows.iter()
            .map(|row| row_to_event(row).map_err(infra))
            .collect()
    }

    async fn stream_version(&self, aggregate_id: Uuid) -> Result<i64, DomainError> {
        let row = sqlx::query("SELECT version FROM event_streams WHERE aggregate_id = $1")
            .bind(aggregate_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(infra)?;
        match row {
            Some(row) => row.try_get("version").map_err(infra),
            None => Ok(0),
        }
    }
}
