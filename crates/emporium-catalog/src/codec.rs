//! Event payload codec with a schema-version registry and migration chains.
//!
//! Each event type has a current schema version. Payloads stored at an older
//! version are walked through an ordered chain of pure `Value -> Value`
//! migration functions until they reach the current version, then
//! deserialized into [`CatalogEventKind`].

use serde_json::Value;
use uuid::Uuid;

use emporium_core::error::DomainError;

use crate::domain::events::{
    CatalogEventKind, PRICE_CHANGED_EVENT_TYPE, PRODUCT_DELISTED_EVENT_TYPE,
    PRODUCT_DETAILS_CORRECTED_EVENT_TYPE, PRODUCT_REGISTERED_EVENT_TYPE, PriceChanged,
    ProductDelisted, ProductDetailsCorrected, ProductRegistered, STATUS_CHANGED_EVENT_TYPE,
    StatusChanged,
};

/// A payload encoded for storage.
#[derive(Debug, Clone)]
pub struct EncodedEvent {
    /// Event type name.
    pub event_type: &'static str,
    /// Schema version the payload was written at.
    pub schema_version: i32,
    /// The serialized payload.
    pub payload: Value,
}

/// A pure payload transform from one schema version to the next.
type MigrationFn = fn(Value) -> Result<Value, String>;

struct Migration {
    from_version: i32,
    to_version: i32,
    migrate: MigrationFn,
}

/// Encodes and decodes catalog event payloads.
pub struct EventCodec {
    migrations: Vec<(&'static str, Migration)>,
}

impl Default for EventCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl EventCodec {
    /// Creates a codec with every known migration registered.
    #[must_use]
    pub fn new() -> Self {
        Self {
            migrations: vec![(
                PRICE_CHANGED_EVENT_TYPE,
                Migration {
                    from_version: 1,
                    to_version: 2,
                    migrate: migrate_price_changed_v1_to_v2,
                },
            )],
        }
    }

    /// The registry's current schema version for an event type, or `None`
    /// for unknown types.
    #[must_use]
    pub fn current_version(event_type: &str) -> Option<i32> {
        match event_type {
            PRICE_CHANGED_EVENT_TYPE => Some(2),
            PRODUCT_REGISTERED_EVENT_TYPE
            | PRODUCT_DETAILS_CORRECTED_EVENT_TYPE
            | STATUS_CHANGED_EVENT_TYPE
            | PRODUCT_DELISTED_EVENT_TYPE => Some(1),
            _ => None,
        }
    }

    /// Encodes an event kind at its current schema version.
    #[must_use]
    pub fn encode(&self, kind: &CatalogEventKind) -> EncodedEvent {
        // Serialization of derived Serialize types to Value is infallible.
        let (event_type, payload) = match kind {
            CatalogEventKind::ProductRegistered(e) => (
                PRODUCT_REGISTERED_EVENT_TYPE,
                serde_json::to_value(e).expect("ProductRegistered serialization is infallible"),
            ),
            CatalogEventKind::ProductDetailsCorrected(e) => (
                PRODUCT_DETAILS_CORRECTED_EVENT_TYPE,
                serde_json::to_value(e)
                    .expect("ProductDetailsCorrected serialization is infallible"),
            ),
            CatalogEventKind::PriceChanged(e) => (
                PRICE_CHANGED_EVENT_TYPE,
                serde_json::to_value(e).expect("PriceChanged serialization is infallible"),
            ),
            CatalogEventKind::StatusChanged(e) => (
                STATUS_CHANGED_EVENT_TYPE,
                serde_json::to_value(e).expect("StatusChanged serialization is infallible"),
            ),
            CatalogEventKind::ProductDelisted(e) => (
                PRODUCT_DELISTED_EVENT_TYPE,
                serde_json::to_value(e).expect("ProductDelisted serialization is infallible"),
            ),
        };
        let schema_version = Self::current_version(event_type)
            .unwrap_or(1);
        EncodedEvent {
            event_type,
            schema_version,
            payload,
        }
    }

    /// Decodes a stored payload, migrating older schema versions forward.
    ///
    /// # Errors
    ///
    /// - [`DomainError::UnknownEventType`] if `event_type` is not registered.
    /// - [`DomainError::EventDecodeFailure`] if the migration chain has a
    ///   gap, a migration fails, the stored version is newer than the
    ///   registry knows, or final deserialization fails.
    pub fn decode(
        &self,
        event_type: &str,
        schema_version: i32,
        payload: Value,
    ) -> Result<CatalogEventKind, DomainError> {
        let current = Self::current_version(event_type)
            .ok_or_else(|| DomainError::UnknownEventType(event_type.to_owned()))?;
        if schema_version > current {
            return Err(DomainError::EventDecodeFailure {
                event_type: event_type.to_owned(),
                reason: format!(
                    "stored schema version {schema_version} is newer than registry version {current}"
                ),
            });
        }

        let mut payload = payload;
        let mut version = schema_version;
        while version < current {
            let migration = self
                .migrations
                .iter()
                .find(|(t, m)| *t == event_type && m.from_version == version)
                .map(|(_, m)| m)
                .ok_or_else(|| DomainError::EventDecodeFailure {
                    event_type: event_type.to_owned(),
                    reason: format!("no migration registered from schema version {version}"),
                })?;
            payload = (migration.migrate)(payload).map_err(|reason| {
                DomainError::EventDecodeFailure {
                    event_type: event_type.to_owned(),
                    reason,
                }
            })?;
            version = migration.to_version;
        }

        decode_current(event_type, payload)
    }
}

/// Deserializes a payload already at the current schema version.
fn decode_current(event_type: &str, payload: Value) -> Result<CatalogEventKind, DomainError> {
    let decode_failure = |e: serde_json::Error| DomainError::EventDecodeFailure {
        event_type: event_type.to_owned(),
        reason: e.to_string(),
    };
    match event_type {
        PRODUCT_REGISTERED_EVENT_TYPE => serde_json::from_value::<ProductRegistered>(payload)
            .map(CatalogEventKind::ProductRegistered)
            .map_err(decode_failure),
        PRODUCT_DETAILS_CORRECTED_EVENT_TYPE => {
            serde_json::from_value::<ProductDetailsCorrected>(payload)
                .map(CatalogEventKind::ProductDetailsCorrected)
                .map_err(decode_failure)
        }
        PRICE_CHANGED_EVENT_TYPE => serde_json::from_value::<PriceChanged>(payload)
            .map(CatalogEventKind::PriceChanged)
            .map_err(decode_failure),
        STATUS_CHANGED_EVENT_TYPE => serde_json::from_value::<StatusChanged>(payload)
            .map(CatalogEventKind::StatusChanged)
            .map_err(decode_failure),
        PRODUCT_DELISTED_EVENT_TYPE => serde_json::from_value::<ProductDelisted>(payload)
            .map(CatalogEventKind::ProductDelisted)
            .map_err(decode_failure),
        other => Err(DomainError::UnknownEventType(other.to_owned())),
    }
}

/// v1 carried a fractional `price` in major units and no currency; v2 uses
/// integer `price_cents` plus an explicit ISO 4217 code.
fn migrate_price_changed_v1_to_v2(mut payload: Value) -> Result<Value, String> {
    let obj = payload
        .as_object_mut()
        .ok_or_else(|| "payload is not a JSON object".to_owned())?;
    let price = obj
        .remove("price")
        .as_ref()
        .and_then(Value::as_f64)
        .ok_or_else(|| "missing fractional `price` field".to_owned())?;
    #[allow(clippy::cast_possible_truncation)]
    let price_cents = (price * 100.0).round() as i64;
    obj.insert("price_cents".to_owned(), Value::from(price_cents));
    obj.entry("currency".to_owned())
        .or_insert_with(|| Value::from("USD"));
    Ok(payload)
}

/// Convenience for tests and fixtures: a v1 `PriceChanged` payload.
#[must_use]
pub fn price_changed_v1_payload(product_id: Uuid, price: f64) -> Value {
    serde_json::json!({ "product_id": product_id, "price": price })
}
