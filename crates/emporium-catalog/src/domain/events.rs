//! Domain events for the product catalog.

use emporium_core::event::DomainEvent;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event type name for `ProductRegistered`.
pub const PRODUCT_REGISTERED_EVENT_TYPE: &str = "catalog.product_registered";
/// Event type name for `ProductDetailsCorrected`.
pub const PRODUCT_DETAILS_CORRECTED_EVENT_TYPE: &str = "catalog.product_details_corrected";
/// Event type name for `PriceChanged`.
pub const PRICE_CHANGED_EVENT_TYPE: &str = "catalog.price_changed";
/// Event type name for `StatusChanged`.
pub const STATUS_CHANGED_EVENT_TYPE: &str = "catalog.status_changed";
/// Event type name for `ProductDelisted`.
pub const PRODUCT_DELISTED_EVENT_TYPE: &str = "catalog.product_delisted";

/// Lifecycle status of a catalog product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    /// Registered but not yet offered for sale.
    Draft,
    /// Offered for sale.
    Active,
    /// Withdrawn from sale but still visible in history.
    Retired,
}

/// Emitted when a product is first registered in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRegistered {
    /// The product identifier.
    pub product_id: Uuid,
    /// Merchant-facing stock keeping unit.
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
}

/// Emitted when a product's descriptive fields are corrected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDetailsCorrected {
    /// The product identifier.
    pub product_id: Uuid,
    /// Corrected display name.
    pub name: String,
    /// Corrected description.
    pub description: String,
    /// Corrected category tag.
    pub category: String,
}

/// Emitted when a product's price changes.
///
/// Schema history: v1 carried a fractional `price` in major units; v2 uses
/// `price_cents` plus an explicit currency code (see the codec migration).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceChanged {
    /// The product identifier.
    pub product_id: Uuid,
    /// New price in minor currency units.
    pub price_cents: i64,
    /// ISO 4217 currency code.
    pub currency: String,
}

/// Emitted when a product's lifecycle status changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChanged {
    /// The product identifier.
    pub product_id: Uuid,
    /// The new status.
    pub status: ProductStatus,
}

/// Emitted when a product is removed from the catalog (soft delete).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDelisted {
    /// The product identifier.
    pub product_id: Uuid,
    /// Optional operator-supplied reason.
    pub reason: Option<String>,
}

/// The closed set of catalog event kinds.
///
/// Both the codec and the projection engine dispatch exhaustively over this
/// enum, so adding a kind is a compile-time-checked change.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogEventKind {
    /// A product entered the catalog.
    ProductRegistered(ProductRegistered),
    /// Descriptive fields were corrected.
    ProductDetailsCorrected(ProductDetailsCorrected),
    /// The price changed.
    PriceChanged(PriceChanged),
    /// The lifecycle status changed.
    StatusChanged(StatusChanged),
    /// The product was soft-deleted.
    ProductDelisted(ProductDelisted),
}

impl CatalogEventKind {
    /// The aggregate this event belongs to.
    #[must_use]
    pub fn product_id(&self) -> Uuid {
        match self {
            Self::ProductRegistered(e) => e.product_id,
            Self::ProductDetailsCorrected(e) => e.product_id,
            Self::PriceChanged(e) => e.product_id,
            Self::StatusChanged(e) => e.product_id,
            Self::ProductDelisted(e) => e.product_id,
        }
    }

    /// Whether this kind creates the aggregate's read-model record.
    #[must_use]
    pub fn is_creation(&self) -> bool {
        matches!(self, Self::ProductRegistered(_))
    }
}

impl DomainEvent for CatalogEventKind {
    fn event_type(&self) -> &'static str {
        match self {
            Self::ProductRegistered(_) => PRODUCT_REGISTERED_EVENT_TYPE,
            Self::ProductDetailsCorrected(_) => PRODUCT_DETAILS_CORRECTED_EVENT_TYPE,
            Self::PriceChanged(_) => PRICE_CHANGED_EVENT_TYPE,
            Self::StatusChanged(_) => STATUS_CHANGED_EVENT_TYPE,
            Self::ProductDelisted(_) => PRODUCT_DELISTED_EVENT_TYPE,
        }
    }
}
