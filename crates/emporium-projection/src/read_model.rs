//! The denormalized product read model.

use std::cmp::Ordering;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use emporium_catalog::domain::events::ProductStatus;
use emporium_core::error::DomainError;

/// Denormalized projection of one product's current state.
///
/// `version` equals the `aggregate_version` of the last event applied and
/// never decreases; it is the idempotency truth for the projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Product (aggregate) identifier.
    pub id: Uuid,
    /// Stock keeping unit.
    pub sku: String,
    /// Display name.
    pub name: String,
    /// Long-form description.
    pub description: String,
    /// Category tag.
    pub category: String,
    /// Price in minor currency units.
    pub price_cents: i64,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Lifecycle status.
    pub status: ProductStatus,
    /// Precomputed display string, e.g. `"EUR 12.34"`.
    pub display_price: String,
    /// Precomputed lowercase text used by full-text search.
    pub search_text: String,
    /// Aggregate version of the last event applied.
    pub version: i64,
    /// The last event applied, for diagnostics.
    pub last_event_id: Uuid,
    /// Soft-delete flag: excluded from queries, retained in storage.
    pub is_deleted: bool,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record last changed.
    pub updated_at: DateTime<Utc>,
}

impl ProductRecord {
    /// Recomputes `display_price` and `search_text` from the domain fields.
    /// Must be called after every field transform so reads never compute.
    pub fn recompute_derived_fields(&mut self) {
        self.display_price = format_price(self.price_cents, &self.currency);
        self.search_text = [
            self.sku.as_str(),
            self.name.as_str(),
            self.description.as_str(),
            self.category.as_str(),
        ]
        .join(" ")
        .to_lowercase();
    }
}

fn format_price(price_cents: i64, currency: &str) -> String {
    let sign = if price_cents < 0 { "-" } else { "" };
    let abs = price_cents.unsigned_abs();
    format!("{currency} {sign}{}.{:02}", abs / 100, abs % 100)
}

/// Outcome of a version-guarded write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// No record existed; the record was inserted.
    Inserted,
    /// An older record existed and was replaced.
    Updated,
    /// The stored record was already at or past this version; nothing
    /// changed (idempotent redelivery).
    SkippedStale,
}

/// Sort fields supported by the query surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    /// Sort by display name.
    Name,
    /// Sort by price in minor units.
    PriceCents,
    /// Sort by last update time.
    UpdatedAt,
}

impl SortField {
    /// The sort value of a record, as a JSON value for cursor payloads.
    #[must_use]
    pub fn value_of(self, record: &ProductRecord) -> serde_json::Value {
        match self {
            Self::Name => serde_json::Value::from(record.name.clone()),
            Self::PriceCents => serde_json::Value::from(record.price_cents),
            Self::UpdatedAt => serde_json::Value::from(record.updated_at.to_rfc3339()),
        }
    }

    /// Total order over records: sort value first, record ID as the tie
    /// breaker. The tie breaker is what keeps cursor pages stable when sort
    /// values repeat.
    #[must_use]
    pub fn compare(self, a: &ProductRecord, b: &ProductRecord) -> Ordering {
        let primary = match self {
            Self::Name => a.name.cmp(&b.name),
            Self::PriceCents => a.price_cents.cmp(&b.price_cents),
            Self::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }
}

/// The (sort value, record ID) tuple a cursor points at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CursorKey {
    /// The sort field the cursor was issued for.
    pub sort: SortField,
    /// The sort value of the last record on the previous page.
    pub value: serde_json::Value,
    /// The ID of the last record on the previous page.
    pub id: Uuid,
}

impl CursorKey {
    /// Whether `record` sorts strictly after this cursor tuple.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the cursor value does not match
    /// the sort field's type.
    pub fn precedes(&self, record: &ProductRecord) -> Result<bool, DomainError> {
        let bad_cursor = || DomainError::Validation("cursor does not match sort field".into());
        let primary = match self.sort {
            SortField::Name => {
                let value = self.value.as_str().ok_or_else(bad_cursor)?;
                value.cmp(record.name.as_str())
            }
            SortField::PriceCents => {
                let value = self.value.as_i64().ok_or_else(bad_cursor)?;
                value.cmp(&record.price_cents)
            }
            SortField::UpdatedAt => {
                let raw = self.value.as_str().ok_or_else(bad_cursor)?;
                let value = DateTime::parse_from_rfc3339(raw)
                    .map_err(|_| bad_cursor())?
                    .with_timezone(&Utc);
                value.cmp(&record.updated_at)
            }
        };
        Ok(primary.then_with(|| self.id.cmp(&record.id)) == Ordering::Less)
    }
}

/// Storage for product read-model records.
///
/// The write path is a single atomic conditional operation
/// ([`ReadModelStore::put_if_newer`]) so concurrent projection workers
/// cannot lose updates through read-then-write races.
#[async_trait]
pub trait ReadModelStore: Send + Sync {
    /// Load one record by product ID, including soft-deleted records.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Infrastructure`] on storage failure.
    async fn get(&self, product_id: Uuid) -> Result<Option<ProductRecord>, DomainError>;

    /// Insert `record`, or replace the stored record if its `version` is
    /// strictly older than `record.version`. The comparison and write are
    /// one atomic step.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Infrastructure`] on storage failure.
    async fn put_if_newer(&self, record: ProductRecord) -> Result<WriteOutcome, DomainError>;

    /// Remove every record (projection rebuild).
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Infrastructure`] on storage failure.
    async fn clear(&self) -> Result<(), DomainError>;

    /// Count non-deleted records, optionally restricted to one status.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Infrastructure`] on storage failure.
    async fn count(&self, status: Option<ProductStatus>) -> Result<u64, DomainError>;

    /// List non-deleted records in `(sort, id)` order with offset/limit.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Infrastructure`] on storage failure.
    async fn list(
        &self,
        status: Option<ProductStatus>,
        sort: SortField,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<ProductRecord>, DomainError>;

    /// List up to `limit` non-deleted records in `(sort, id)` order,
    /// strictly after the cursor tuple when one is given.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Validation`] for a cursor that does not match
    /// the sort field, or [`DomainError::Infrastructure`] on storage
    /// failure.
    async fn list_after(
        &self,
        sort: SortField,
        after: Option<&CursorKey>,
        limit: u64,
    ) -> Result<Vec<ProductRecord>, DomainError>;

    /// Full-text search over `search_text`, ranked by relevance, optionally
    /// restricted to one status. `tokens` are lowercase.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Infrastructure`] on storage failure.
    async fn search(
        &self,
        tokens: &[String],
        status: Option<ProductStatus>,
        limit: u64,
    ) -> Result<Vec<ProductRecord>, DomainError>;
}
