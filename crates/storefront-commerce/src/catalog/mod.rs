//! Catalog collaborator contract.
//!
//! The core only reads price, stock and display names from the catalog and
//! never writes to it.

mod memory;
mod product;

pub use memory::InMemoryCatalog;
pub use product::{ProductRecord, VariantRecord};

use crate::ids::{ProductId, VariantId};

/// Read-only access to product and variant records.
pub trait CatalogStore: Send + Sync {
    /// Look up a product by ID.
    fn product(&self, id: &ProductId) -> Option<ProductRecord>;

    /// Look up a variant of a product.
    fn variant(&self, product_id: &ProductId, variant_id: &VariantId) -> Option<VariantRecord>;
}
