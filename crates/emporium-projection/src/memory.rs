//! In-memory position and read-model stores.
//!
//! Production deployments back these traits with durable storage; tests and
//! the single-process daemon use these lock-based implementations.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use emporium_catalog::domain::events::ProductStatus;
use emporium_core::error::DomainError;
use emporium_core::position::{PositionStore, ProjectionPosition};

use crate::read_model::{CursorKey, ProductRecord, ReadModelStore, SortField, WriteOutcome};

fn lock<'a, T>(mutex: &'a Mutex<T>) -> Result<MutexGuard<'a, T>, DomainError> {
    mutex
        .lock()
        .map_err(|_| DomainError::Infrastructure("position store lock poisoned".into()))
}

/// Projection positions keyed by projection name, held in a mutex.
#[derive(Debug, Default)]
pub struct InMemoryPositionStore {
    positions: Mutex<HashMap<String, ProjectionPosition>>,
}

impl InMemoryPositionStore {
    /// Creates an empty position store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PositionStore for InMemoryPositionStore {
    async fn load(&self, projection_name: &str) -> Result<Option<ProjectionPosition>, DomainError> {
        Ok(lock(&self.positions)?.get(projection_name).cloned())
    }

    async fn save(
        &self,
        projection_name: &str,
        position: &ProjectionPosition,
    ) -> Result<(), DomainError> {
        lock(&self.positions)?.insert(projection_name.to_owned(), position.clone());
        Ok(())
    }

    async fn reset(&self, projection_name: &str) -> Result<(), DomainError> {
        lock(&self.positions)?.remove(projection_name);
        Ok(())
    }
}

/// Product records keyed by product ID, held in a mutex.
///
/// `put_if_newer` performs its version comparison under the same lock as the
/// write, which is what makes redelivered events harmless even with
/// concurrent workers.
#[derive(Debug, Default)]
pub struct InMemoryReadModelStore {
    records: Mutex<HashMap<Uuid, ProductRecord>>,
}

impl InMemoryReadModelStore {
    /// Creates an empty read-model store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn visible(&self, status: Option<ProductStatus>) -> Result<Vec<ProductRecord>, DomainError> {
        Ok(lock(&self.records)?
            .values()
            .filter(|r| !r.is_deleted)
            .filter(|r| status.is_none_or(|s| r.status == s))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ReadModelStore for InMemoryReadModelStore {
    async fn get(&self, product_id: Uuid) -> Result<Option<ProductRecord>, DomainError> {
        Ok(lock(&self.records)?.get(&product_id).cloned())
    }

    async fn put_if_newer(&self, record: ProductRecord) -> Result<WriteOutcome, DomainError> {
        let mut records = lock(&self.records)?;
        match records.get(&record.id) {
            Some(existing) if existing.version >= record.version => Ok(WriteOutcome::SkippedStale),
            Some(_) => {
                records.insert(record.id, record);
                Ok(WriteOutcome::Updated)
            }
            None => {
                records.insert(record.id, record);
                Ok(WriteOutcome::Inserted)
            }
        }
    }

    async fn clear(&self) -> Result<(), DomainError> {
        lock(&self.records)?.clear();
        Ok(())
    }

    async fn count(&self, status: Option<ProductStatus>) -> Result<u64, DomainError> {
        Ok(self.visible(status)?.len() as u64)
    }

    async fn list(
        &self,
        status: Option<ProductStatus>,
        sort: SortField,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<ProductRecord>, DomainError> {
        let mut records = self.visible(status)?;
        records.sort_by(|a, b| sort.compare(a, b));
        Ok(records
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .collect())
    }

    async fn list_after(
        &self,
        sort: SortField,
        after: Option<&CursorKey>,
        limit: u64,
    ) -> Result<Vec<ProductRecord>, DomainError> {
        let mut records = self.visible(None)?;
        records.sort_by(|a, b| sort.compare(a, b));
        let mut page = Vec::new();
        for record in records {
            if let Some(cursor) = after {
                if !cursor.precedes(&record)? {
                    continue;
                }
            }
            page.push(record);
            if page.len() as u64 == limit {
                break;
            }
        }
        Ok(page)
    }

    async fn search(
        &self,
        tokens: &[String],
        status: Option<ProductStatus>,
        limit: u64,
    ) -> Result<Vec<ProductRecord>, DomainError> {
        let mut ranked: Vec<(usize, ProductRecord)> = self
            .visible(status)?
            .into_iter()
            .filter_map(|record| {
                // Every token must occur; rank by total occurrence count.
                let mut score = 0;
                for token in tokens {
                    let hits = record.search_text.matches(token.as_str()).count();
                    if hits == 0 {
                        return None;
                    }
                    score += hits;
                }
                Some((score, record))
            })
            .collect();
        ranked.sort_by(|(score_a, a), (score_b, b)| {
            score_b
                .cmp(score_a)
                .then_with(|| SortField::Name.compare(a, b))
        });
        Ok(ranked
            .into_iter()
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .map(|(_, record)| record)
            .collect())
    }
}
