//! The `Product` aggregate root.
//!
//! The aggregate records state and tracks its version for optimistic
//! concurrency. It deliberately validates no business invariants — commands
//! produce events unconditionally and the read side interprets them.

use emporium_core::aggregate::AggregateRoot;
use uuid::Uuid;

use crate::domain::events::{CatalogEventKind, ProductStatus};

/// The aggregate root for one catalog product.
#[derive(Debug, Clone)]
pub struct Product {
    /// Aggregate identifier.
    pub id: Uuid,
    /// Current version (event count).
    pub version: i64,
    /// Stock keeping unit, set on registration.
    pub sku: Option<String>,
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
    /// Whether the product has been delisted.
    pub delisted: bool,
}

impl Product {
    /// Creates an empty product at version 0.
    #[must_use]
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            version: 0,
            sku: None,
            name: String::new(),
            description: String::new(),
            category: String::new(),
            price_cents: 0,
            currency: String::new(),
            status: ProductStatus::Draft,
            delisted: false,
        }
    }
}

impl AggregateRoot for Product {
    type Event = CatalogEventKind;

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn apply(&mut self, event: &CatalogEventKind) {
        match event {
            CatalogEventKind::ProductRegistered(e) => {
                self.sku = Some(e.sku.clone());
                self.name = e.name.clone();
                self.description = e.description.clone();
                self.category = e.category.clone();
                self.price_cents = e.price_cents;
                self.currency = e.currency.clone();
                self.status = ProductStatus::Draft;
            }
            CatalogEventKind::ProductDetailsCorrected(e) => {
                self.name = e.name.clone();
                self.description = e.description.clone();
                self.category = e.category.clone();
            }
            CatalogEventKind::PriceChanged(e) => {
                self.price_cents = e.price_cents;
                self.currency = e.currency.clone();
            }
            CatalogEventKind::StatusChanged(e) => {
                self.status = e.status;
            }
            CatalogEventKind::ProductDelisted(_) => {
                self.delisted = true;
            }
        }
        self.version += 1;
    }
}
