//! Product and variant records as seen by the cart engine.

use crate::ids::{CategoryId, ProductId, VariantId};
use crate::money::Money;
use serde::{Deserialize, Serialize};

/// A product in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductRecord {
    /// Unique product identifier.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Category, used for discount eligibility.
    pub category_id: Option<CategoryId>,
    /// Whether the product can be sold.
    pub active: bool,
    /// Price when no variant is selected.
    pub base_price: Money,
    /// Stock across the product (used when no variant is selected).
    pub total_stock: i64,
}

impl ProductRecord {
    /// Create an active product.
    pub fn new(id: impl Into<ProductId>, name: impl Into<String>, base_price: Money, stock: i64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category_id: None,
            active: true,
            base_price,
            total_stock: stock,
        }
    }

    /// Set the category.
    pub fn in_category(mut self, category_id: impl Into<CategoryId>) -> Self {
        self.category_id = Some(category_id.into());
        self
    }
}

/// A purchasable variant of a product (e.g., "Large / Blue").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VariantRecord {
    /// Unique variant identifier.
    pub id: VariantId,
    /// Parent product.
    pub product_id: ProductId,
    /// Variant name.
    pub name: String,
    /// Whether the variant can be sold.
    pub active: bool,
    /// Variant price.
    pub price: Money,
    /// Units in stock.
    pub stock: i64,
}

impl VariantRecord {
    /// Create an active variant.
    pub fn new(
        id: impl Into<VariantId>,
        product_id: impl Into<ProductId>,
        name: impl Into<String>,
        price: Money,
        stock: i64,
    ) -> Self {
        Self {
            id: id.into(),
            product_id: product_id.into(),
            name: name.into(),
            active: true,
            price,
            stock,
        }
    }
}
