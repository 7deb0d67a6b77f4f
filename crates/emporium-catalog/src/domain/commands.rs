//! Commands for the product catalog.

use emporium_core::command::Command;
use uuid::Uuid;

use crate::domain::events::ProductStatus;

/// Registers a new product in the catalog.
#[derive(Debug, Clone)]
pub struct RegisterProduct {
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
    /// Correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The principal issuing the command.
    pub actor: Option<String>,
}

impl Command for RegisterProduct {
    fn command_type(&self) -> &'static str {
        "catalog.register_product"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Corrects a product's descriptive fields.
#[derive(Debug, Clone)]
pub struct CorrectProductDetails {
    /// The product to correct.
    pub product_id: Uuid,
    /// Corrected display name.
    pub name: String,
    /// Corrected description.
    pub description: String,
    /// Corrected category tag.
    pub category: String,
    /// Correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The principal issuing the command.
    pub actor: Option<String>,
}

impl Command for CorrectProductDetails {
    fn command_type(&self) -> &'static str {
        "catalog.correct_product_details"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Changes a product's price.
#[derive(Debug, Clone)]
pub struct ChangePrice {
    /// The product to reprice.
    pub product_id: Uuid,
    /// New price in minor currency units.
    pub price_cents: i64,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The principal issuing the command.
    pub actor: Option<String>,
}

impl Command for ChangePrice {
    fn command_type(&self) -> &'static str {
        "catalog.change_price"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Changes a product's lifecycle status.
#[derive(Debug, Clone)]
pub struct ChangeProductStatus {
    /// The product to update.
    pub product_id: Uuid,
    /// The new status.
    pub status: ProductStatus,
    /// Correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The principal issuing the command.
    pub actor: Option<String>,
}

impl Command for ChangeProductStatus {
    fn command_type(&self) -> &'static str {
        "catalog.change_product_status"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Removes a product from the catalog (soft delete).
#[derive(Debug, Clone)]
pub struct DelistProduct {
    /// The product to delist.
    pub product_id: Uuid,
    /// Optional operator-supplied reason.
    pub reason: Option<String>,
    /// Correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The principal issuing the command.
    pub actor: Option<String>,
}

impl Command for DelistProduct {
    fn command_type(&self) -> &'static str {
        "catalog.delist_product"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}
