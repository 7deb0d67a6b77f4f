//! The projection engine: applies recorded events to the product read model.

use std::sync::Arc;

use tracing::{debug, warn};

use emporium_catalog::codec::EventCodec;
use emporium_catalog::domain::events::{CatalogEventKind, ProductStatus};
use emporium_core::error::DomainError;
use emporium_core::position::{PositionStore, ProjectionPosition};
use emporium_core::store::RecordedEvent;

use crate::read_model::{ProductRecord, ReadModelStore, WriteOutcome};

/// What to do when a non-creation event arrives for a product that has no
/// read-model record (out-of-order delivery or a partially rebuilt store).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingRecordPolicy {
    /// Log a warning, advance past the event, and keep going. The record
    /// heals on the next rebuild.
    SkipAndWarn,
    /// Stop the batch with [`DomainError::ProjectionRecordNotFound`].
    Halt,
}

/// Applies catalog events to [`ProductRecord`]s, idempotently.
///
/// Idempotency rests on the record's own `version`: an event whose
/// `aggregate_version` is not strictly greater than the stored version is a
/// redelivery and changes nothing. The projection position is bookkeeping
/// for catch-up, never the dedup mechanism.
pub struct ProjectionEngine {
    name: String,
    codec: EventCodec,
    read_models: Arc<dyn ReadModelStore>,
    positions: Arc<dyn PositionStore>,
    missing_record_policy: MissingRecordPolicy,
}

impl ProjectionEngine {
    /// Creates an engine for the named projection.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        codec: EventCodec,
        read_models: Arc<dyn ReadModelStore>,
        positions: Arc<dyn PositionStore>,
        missing_record_policy: MissingRecordPolicy,
    ) -> Self {
        Self {
            name: name.into(),
            codec,
            read_models,
            positions,
            missing_record_policy,
        }
    }

    /// The projection's name, used as its position-store key.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The read-model store this engine writes to.
    #[must_use]
    pub fn read_models(&self) -> Arc<dyn ReadModelStore> {
        Arc::clone(&self.read_models)
    }

    /// The engine's current position, or the beginning if none is recorded.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Infrastructure`] on storage failure.
    pub async fn position(&self) -> Result<ProjectionPosition, DomainError> {
        Ok(self
            .positions
            .load(&self.name)
            .await?
            .unwrap_or_else(ProjectionPosition::beginning))
    }

    /// Drops every read-model record and resets the position to the
    /// beginning. The next catch-up run replays the full feed.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Infrastructure`] on storage failure.
    pub async fn reset(&self) -> Result<(), DomainError> {
        self.read_models.clear().await?;
        self.positions.reset(&self.name).await?;
        warn!(projection = %self.name, "projection reset for rebuild");
        Ok(())
    }

    /// Applies one recorded event and advances the position past it.
    ///
    /// # Errors
    ///
    /// - Decode failures ([`DomainError::UnknownEventType`],
    ///   [`DomainError::EventDecodeFailure`]) propagate without advancing
    ///   the position, halting the batch for operator attention.
    /// - [`DomainError::ProjectionRecordNotFound`] under
    ///   [`MissingRecordPolicy::Halt`] when a non-creation event has no
    ///   record to apply to.
    /// - [`DomainError::Infrastructure`] on storage failure.
    pub async fn process_event(&self, event: &RecordedEvent) -> Result<(), DomainError> {
        let kind = self
            .codec
            .decode(&event.event_type, event.event_version, event.payload.clone())?;

        if kind.is_creation() {
            self.apply_creation(event, &kind).await?;
        } else if !self.apply_transform(event, &kind).await? {
            // Missing record, policy says skip: advance and move on.
            warn!(
                projection = %self.name,
                product_id = %kind.product_id(),
                event_type = %event.event_type,
                global_sequence = event.global_sequence,
                "no read-model record for event, skipping"
            );
        }

        self.advance_past(event).await
    }

    async fn apply_creation(
        &self,
        event: &RecordedEvent,
        kind: &CatalogEventKind,
    ) -> Result<(), DomainError> {
        let CatalogEventKind::ProductRegistered(registered) = kind else {
            return Ok(());
        };
        let mut record = ProductRecord {
            id: registered.product_id,
            sku: registered.sku.clone(),
            name: registered.name.clone(),
            description: registered.description.clone(),
            category: registered.category.clone(),
            price_cents: registered.price_cents,
            currency: registered.currency.clone(),
            status: ProductStatus::Draft,
            display_price: String::new(),
            search_text: String::new(),
            version: event.aggregate_version,
            last_event_id: event.event_id,
            is_deleted: false,
            created_at: event.occurred_at,
            updated_at: event.occurred_at,
        };
        record.recompute_derived_fields();
        let outcome = self.read_models.put_if_newer(record).await?;
        self.trace_outcome(event, outcome);
        Ok(())
    }

    /// Applies a non-creation event. Returns `false` if no record existed
    /// and the policy allows skipping.
    async fn apply_transform(
        &self,
        event: &RecordedEvent,
        kind: &CatalogEventKind,
    ) -> Result<bool, DomainError> {
        let product_id = kind.product_id();
        let Some(mut record) = self.read_models.get(product_id).await? else {
            return match self.missing_record_policy {
                MissingRecordPolicy::SkipAndWarn => Ok(false),
                MissingRecordPolicy::Halt => {
                    Err(DomainError::ProjectionRecordNotFound(product_id))
                }
            };
        };

        if record.version >= event.aggregate_version {
            debug!(
                projection = %self.name,
                product_id = %product_id,
                record_version = record.version,
                event_version = event.aggregate_version,
                "redelivered event, record already current"
            );
            return Ok(true);
        }

        match kind {
            CatalogEventKind::ProductRegistered(_) => {}
            CatalogEventKind::ProductDetailsCorrected(corrected) => {
                record.name = corrected.name.clone();
                record.description = corrected.description.clone();
                record.category = corrected.category.clone();
            }
            CatalogEventKind::PriceChanged(changed) => {
                record.price_cents = changed.price_cents;
                record.currency = changed.currency.clone();
            }
            CatalogEventKind::StatusChanged(changed) => {
                record.status = changed.status;
            }
            CatalogEventKind::ProductDelisted(_) => {
                record.is_deleted = true;
            }
        }
        record.version = event.aggregate_version;
        record.last_event_id = event.event_id;
        record.updated_at = event.occurred_at;
        record.recompute_derived_fields();

        let outcome = self.read_models.put_if_newer(record).await?;
        self.trace_outcome(event, outcome);
        Ok(true)
    }

    async fn advance_past(&self, event: &RecordedEvent) -> Result<(), DomainError> {
        let advanced = self
            .position()
            .await?
            .advanced_to(event.event_id, event.global_sequence);
        self.positions.save(&self.name, &advanced).await
    }

    fn trace_outcome(&self, event: &RecordedEvent, outcome: WriteOutcome) {
        debug!(
            projection = %self.name,
            event_id = %event.event_id,
            event_type = %event.event_type,
            global_sequence = event.global_sequence,
            applied = outcome != WriteOutcome::SkippedStale,
            "event processed"
        );
    }
}

/// Helper for tests elsewhere in the crate.
#[cfg(test)]
pub(crate) fn recorded(
    kind: &CatalogEventKind,
    codec: &EventCodec,
    global_sequence: i64,
    aggregate_version: i64,
) -> RecordedEvent {
    use chrono::{TimeZone, Utc};
    use emporium_core::event::EventMetadata;
    use uuid::Uuid;

    let encoded = codec.encode(kind);
    RecordedEvent {
        event_id: Uuid::new_v4(),
        stream_id: Uuid::new_v4(),
        aggregate_id: kind.product_id(),
        global_sequence,
        event_type: encoded.event_type.to_owned(),
        event_version: encoded.schema_version,
        aggregate_version,
        payload: encoded.payload,
        metadata: EventMetadata::correlated(Uuid::new_v4()),
        occurred_at: Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use uuid::Uuid;

    use super::{MissingRecordPolicy, ProjectionEngine, recorded};
    use crate::memory::{InMemoryPositionStore, InMemoryReadModelStore};
    use crate::read_model::ReadModelStore;
    use emporium_catalog::codec::EventCodec;
    use emporium_catalog::domain::events::{
        CatalogEventKind, PriceChanged, ProductDelisted, ProductRegistered, ProductStatus,
        StatusChanged,
    };
    use emporium_core::error::DomainError;
    use emporium_core::event::EventMetadata;
    use emporium_core::store::RecordedEvent;

    fn engine(policy: MissingRecordPolicy) -> (ProjectionEngine, Arc<InMemoryReadModelStore>) {
        let read_models = Arc::new(InMemoryReadModelStore::new());
        let engine = ProjectionEngine::new(
            "product_catalog",
            EventCodec::new(),
            Arc::clone(&read_models) as Arc<dyn ReadModelStore>,
            Arc::new(InMemoryPositionStore::new()),
            policy,
        );
        (engine, read_models)
    }

    fn registered(product_id: Uuid) -> CatalogEventKind {
        CatalogEventKind::ProductRegistered(ProductRegistered {
            product_id,
            sku: "SKU-1".to_owned(),
            name: "Astrolabe".to_owned(),
            description: "Brass astrolabe".to_owned(),
            category: "instruments".to_owned(),
            price_cents: 12_500,
            currency: "EUR".to_owned(),
        })
    }

    #[tokio::test]
    async fn test_registration_creates_record_with_derived_fields() {
        let (engine, read_models) = engine(MissingRecordPolicy::SkipAndWarn);
        let product_id = Uuid::new_v4();
        let codec = EventCodec::new();
        let event = recorded(&registered(product_id), &codec, 1, 1);

        engine.process_event(&event).await.unwrap();

        let record = read_models.get(product_id).await.unwrap().unwrap();
        assert_eq!(record.version, 1);
        assert_eq!(record.status, ProductStatus::Draft);
        assert_eq!(record.display_price, "EUR 125.00");
        assert!(record.search_text.contains("astrolabe"));
        assert_eq!(engine.position().await.unwrap().global_sequence, 1);
    }

    #[tokio::test]
    async fn test_redelivered_event_changes_nothing_but_advances_position() {
        let (engine, read_models) = engine(MissingRecordPolicy::SkipAndWarn);
        let product_id = Uuid::new_v4();
        let codec = EventCodec::new();
        engine
            .process_event(&recorded(&registered(product_id), &codec, 1, 1))
            .await
            .unwrap();
        let price_change = recorded(
            &CatalogEventKind::PriceChanged(PriceChanged {
                product_id,
                price_cents: 9_900,
                currency: "EUR".to_owned(),
            }),
            &codec,
            2,
            2,
        );
        engine.process_event(&price_change).await.unwrap();
        let before = read_models.get(product_id).await.unwrap().unwrap();

        // The same event arrives again.
        engine.process_event(&price_change).await.unwrap();

        let after = read_models.get(product_id).await.unwrap().unwrap();
        assert_eq!(after, before);
        assert_eq!(after.version, 2);
        // The position still moved: it tracks consumption, not dedup.
        assert_eq!(engine.position().await.unwrap().processed_count, 3);
    }

    #[tokio::test]
    async fn test_delist_soft_deletes_the_record() {
        let (engine, read_models) = engine(MissingRecordPolicy::SkipAndWarn);
        let product_id = Uuid::new_v4();
        let codec = EventCodec::new();
        engine
            .process_event(&recorded(&registered(product_id), &codec, 1, 1))
            .await
            .unwrap();
        engine
            .process_event(&recorded(
                &CatalogEventKind::StatusChanged(StatusChanged {
                    product_id,
                    status: ProductStatus::Active,
                }),
                &codec,
                2,
                2,
            ))
            .await
            .unwrap();

        engine
            .process_event(&recorded(
                &CatalogEventKind::ProductDelisted(ProductDelisted {
                    product_id,
                    reason: None,
                }),
                &codec,
                3,
                3,
            ))
            .await
            .unwrap();

        let record = read_models.get(product_id).await.unwrap().unwrap();
        assert!(record.is_deleted);
        assert_eq!(record.version, 3);
        assert_eq!(read_models.count(None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_missing_record_skip_policy_advances_position() {
        let (engine, _) = engine(MissingRecordPolicy::SkipAndWarn);
        let codec = EventCodec::new();
        let orphan = recorded(
            &CatalogEventKind::PriceChanged(PriceChanged {
                product_id: Uuid::new_v4(),
                price_cents: 1,
                currency: "USD".to_owned(),
            }),
            &codec,
            7,
            2,
        );

        engine.process_event(&orphan).await.unwrap();

        assert_eq!(engine.position().await.unwrap().global_sequence, 7);
    }

    #[tokio::test]
    async fn test_missing_record_halt_policy_fails_without_advancing() {
        let (engine, _) = engine(MissingRecordPolicy::Halt);
        let codec = EventCodec::new();
        let product_id = Uuid::new_v4();
        let orphan = recorded(
            &CatalogEventKind::PriceChanged(PriceChanged {
                product_id,
                price_cents: 1,
                currency: "USD".to_owned(),
            }),
            &codec,
            7,
            2,
        );

        let result = engine.process_event(&orphan).await;

        match result {
            Err(DomainError::ProjectionRecordNotFound(id)) => assert_eq!(id, product_id),
            other => panic!("expected ProjectionRecordNotFound, got {other:?}"),
        }
        assert_eq!(engine.position().await.unwrap().global_sequence, 0);
    }

    #[tokio::test]
    async fn test_undecodable_event_halts_without_advancing() {
        let (engine, _) = engine(MissingRecordPolicy::SkipAndWarn);
        let event = RecordedEvent {
            event_id: Uuid::new_v4(),
            stream_id: Uuid::new_v4(),
            aggregate_id: Uuid::new_v4(),
            global_sequence: 1,
            event_type: "catalog.unheard_of".to_owned(),
            event_version: 1,
            aggregate_version: 1,
            payload: serde_json::json!({}),
            metadata: EventMetadata::correlated(Uuid::new_v4()),
            occurred_at: chrono::Utc::now(),
        };

        let result = engine.process_event(&event).await;

        assert!(matches!(result, Err(DomainError::UnknownEventType(_))));
        assert_eq!(engine.position().await.unwrap().global_sequence, 0);
    }

    #[tokio::test]
    async fn test_historical_v1_price_payload_is_migrated_on_apply() {
        let (engine, read_models) = engine(MissingRecordPolicy::SkipAndWarn);
        let product_id = Uuid::new_v4();
        let codec = EventCodec::new();
        engine
            .process_event(&recorded(&registered(product_id), &codec, 1, 1))
            .await
            .unwrap();
        let v1_event = RecordedEvent {
            event_version: 1,
            payload: emporium_catalog::codec::price_changed_v1_payload(product_id, 42.5),
            ..recorded(
                &CatalogEventKind::PriceChanged(PriceChanged {
                    product_id,
                    price_cents: 0,
                    currency: String::new(),
                }),
                &codec,
                2,
                2,
            )
        };

        engine.process_event(&v1_event).await.unwrap();

        let record = read_models.get(product_id).await.unwrap().unwrap();
        assert_eq!(record.price_cents, 4_250);
        assert_eq!(record.currency, "USD");
        assert_eq!(record.display_price, "USD 42.50");
    }
}
