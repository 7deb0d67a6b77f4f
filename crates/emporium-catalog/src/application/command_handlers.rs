//! Command handlers for the product catalog.
//!
//! Each handler orchestrates one write: load the stream, reconstitute the
//! `Product`, produce the event, and append it with the reconstituted
//! version as the optimistic-concurrency check. On a
//! [`DomainError::ConcurrencyConflict`] the caller re-reads and resubmits.

use emporium_core::aggregate::AggregateRoot;
use emporium_core::clock::Clock;
use emporium_core::error::DomainError;
use emporium_core::event::EventMetadata;
use emporium_core::store::{EventStore, NewEvent, RecordedEvent};
use uuid::Uuid;

use crate::codec::EventCodec;
use crate::domain::aggregates::Product;
use crate::domain::commands::{
    ChangePrice, ChangeProductStatus, CorrectProductDetails, DelistProduct, RegisterProduct,
};
use crate::domain::events::{
    CatalogEventKind, PriceChanged, ProductDelisted, ProductDetailsCorrected, ProductRegistered,
    StatusChanged,
};

/// The stream `aggregate_type` for catalog products.
pub const PRODUCT_AGGREGATE_TYPE: &str = "product";

/// Result of a successfully handled command.
#[derive(Debug)]
pub struct CatalogCommandResult {
    /// The aggregate ID affected by the command.
    pub aggregate_id: Uuid,
    /// The stream version after the append.
    pub new_version: i64,
}

fn to_new_event(
    codec: &EventCodec,
    kind: &CatalogEventKind,
    correlation_id: Uuid,
    actor: Option<String>,
    clock: &dyn Clock,
) -> NewEvent {
    let encoded = codec.encode(kind);
    NewEvent {
        event_id: Uuid::new_v4(),
        aggregate_id: kind.product_id(),
        event_type: encoded.event_type.to_owned(),
        event_version: encoded.schema_version,
        payload: encoded.payload,
        metadata: EventMetadata {
            causation_id: None,
            correlation_id: Some(correlation_id),
            actor,
        },
        occurred_at: clock.now(),
    }
}

/// Reconstitutes a `Product` from its recorded events, migrating historical
/// payload versions through the codec.
///
/// # Errors
///
/// Returns codec errors if any stored event cannot be decoded.
pub fn reconstitute(
    product_id: Uuid,
    recorded: &[RecordedEvent],
    codec: &EventCodec,
) -> Result<Product, DomainError> {
    let mut product = Product::new(product_id);
    for event in recorded {
        let kind = codec.decode(&event.event_type, event.event_version, event.payload.clone())?;
        product.apply(&kind);
    }
    Ok(product)
}

async fn load_product(
    product_id: Uuid,
    store: &dyn EventStore,
    codec: &EventCodec,
) -> Result<Product, DomainError> {
    let recorded = store.read_stream(product_id, 0).await?;
    if recorded.is_empty() {
        return Err(DomainError::AggregateNotFound(product_id));
    }
    reconstitute(product_id, &recorded, codec)
}

async fn append_one(
    kind: CatalogEventKind,
    expected_version: i64,
    correlation_id: Uuid,
    actor: Option<String>,
    clock: &dyn Clock,
    store: &dyn EventStore,
    codec: &EventCodec,
) -> Result<CatalogCommandResult, DomainError> {
    let aggregate_id = kind.product_id();
    let event = to_new_event(codec, &kind, correlation_id, actor, clock);
    let new_version = store
        .append(PRODUCT_AGGREGATE_TYPE, aggregate_id, expected_version, vec![event])
        .await?;
    tracing::info!(%aggregate_id, new_version, "handled catalog command");
    Ok(CatalogCommandResult {
        aggregate_id,
        new_version,
    })
}

/// Handles `RegisterProduct`: creates a fresh aggregate and appends the
/// registration event at expected version 0.
///
/// # Errors
///
/// Returns `DomainError` if the append fails.
pub async fn handle_register_product(
    command: &RegisterProduct,
    clock: &dyn Clock,
    store: &dyn EventStore,
    codec: &EventCodec,
) -> Result<CatalogCommandResult, DomainError> {
    let product_id = Uuid::new_v4();
    let kind = CatalogEventKind::ProductRegistered(ProductRegistered {
        product_id,
        sku: command.sku.clone(),
        name: command.name.clone(),
        description: command.description.clone(),
        category: command.category.clone(),
        price_cents: command.price_cents,
        currency: command.currency.clone(),
    });
    append_one(
        kind,
        0,
        command.correlation_id,
        command.actor.clone(),
        clock,
        store,
        codec,
    )
    .await
}

/// Handles `CorrectProductDetails`.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the product has no stream,
/// or any load/append error.
pub async fn handle_correct_product_details(
    command: &CorrectProductDetails,
    clock: &dyn Clock,
    store: &dyn EventStore,
    codec: &EventCodec,
) -> Result<CatalogCommandResult, DomainError> {
    let product = load_product(command.product_id, store, codec).await?;
    let kind = CatalogEventKind::ProductDetailsCorrected(ProductDetailsCorrected {
        product_id: command.product_id,
        name: command.name.clone(),
        description: command.description.clone(),
        category: command.category.clone(),
    });
    append_one(
        kind,
        product.version(),
        command.correlation_id,
        command.actor.clone(),
        clock,
        store,
        codec,
    )
    .await
}

/// Handles `ChangePrice`.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the product has no stream,
/// or any load/append error.
pub async fn handle_change_price(
    command: &ChangePrice,
    clock: &dyn Clock,
    store: &dyn EventStore,
    codec: &EventCodec,
) -> Result<CatalogCommandResult, DomainError> {
    let product = load_product(command.product_id, store, codec).await?;
    let kind = CatalogEventKind::PriceChanged(PriceChanged {
        product_id: command.product_id,
        price_cents: command.price_cents,
        currency: command.currency.clone(),
    });
    append_one(
        kind,
        product.version(),
        command.correlation_id,
        command.actor.clone(),
        clock,
        store,
        codec,
    )
    .await
}

/// Handles `ChangeProductStatus`.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the product has no stream,
/// or any load/append error.
pub async fn handle_change_product_status(
    command: &ChangeProductStatus,
    clock: &dyn Clock,
    store: &dyn EventStore,
    codec: &EventCodec,
) -> Result<CatalogCommandResult, DomainError> {
    let product = load_product(command.product_id, store, codec).await?;
    let kind = CatalogEventKind::StatusChanged(StatusChanged {
        product_id: command.product_id,
        status: command.status,
    });
    append_one(
        kind,
        product.version(),
        command.correlation_id,
        command.actor.clone(),
        clock,
        store,
        codec,
    )
    .await
}

/// Handles `DelistProduct` (soft delete).
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the product has no stream,
/// or any load/append error.
pub async fn handle_delist_product(
    command: &DelistProduct,
    clock: &dyn Clock,
    store: &dyn EventStore,
    codec: &EventCodec,
) -> Result<CatalogCommandResult, DomainError> {
    let product = load_product(command.product_id, store, codec).await?;
    let kind = CatalogEventKind::ProductDelisted(ProductDelisted {
        product_id: command.product_id,
        reason: command.reason.clone(),
    });
    append_one(
        kind,
        product.version(),
        command.correlation_id,
        command.actor.clone(),
        clock,
        store,
        codec,
    )
    .await
}
