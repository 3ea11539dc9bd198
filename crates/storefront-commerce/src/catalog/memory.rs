//! In-memory catalog, used by tests and the CLI.

use super::{CatalogStore, ProductRecord, VariantRecord};
use crate::ids::{ProductId, VariantId};
use serde::{Deserialize, Serialize};

/// Catalog held in memory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryCatalog {
    #[serde(default)]
    products: Vec<ProductRecord>,
    #[serde(default)]
    variants: Vec<VariantRecord>,
}

impl InMemoryCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a product.
    pub fn insert_product(&mut self, product: ProductRecord) {
        match self.products.iter_mut().find(|p| p.id == product.id) {
            Some(existing) => *existing = product,
            None => self.products.push(product),
        }
    }

    /// Add or replace a variant.
    pub fn insert_variant(&mut self, variant: VariantRecord) {
        self.variants
            .retain(|v| !(v.product_id == variant.product_id && v.id == variant.id));
        self.variants.push(variant);
    }

    /// Builder-style product insert.
    pub fn with_product(mut self, product: ProductRecord) -> Self {
        self.insert_product(product);
        self
    }

    /// Builder-style variant insert.
    pub fn with_variant(mut self, variant: VariantRecord) -> Self {
        self.insert_variant(variant);
        self
    }

    /// Number of products.
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// Check if the catalog has no products.
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl CatalogStore for InMemoryCatalog {
    fn product(&self, id: &ProductId) -> Option<ProductRecord> {
        self.products.iter().find(|p| &p.id == id).cloned()
    }

    fn variant(&self, product_id: &ProductId, variant_id: &VariantId) -> Option<VariantRecord> {
        self.variants
            .iter()
            .find(|v| &v.product_id == product_id && &v.id == variant_id)
            .cloned()
    }
}
