//! JSON scenario files read by `quote` and `checkout`.
//!
//! Amounts are integers in the minor unit of the configured currency.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use storefront_commerce::catalog::{InMemoryCatalog, ProductRecord, VariantRecord};
use storefront_commerce::discount::{DiscountAttachment, DiscountCode, DiscountKind};
use storefront_commerce::identity::CartIdentity;
use storefront_commerce::ids::{CategoryId, ProductId, VariantId};
use storefront_commerce::order::OrderStatus;
use storefront_commerce::{CheckoutRequest, PricingPolicy};

/// Read and parse a scenario file.
pub fn load<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    tracing::debug!(path = %path.display(), "loading scenario");
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read scenario: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse scenario: {}", path.display()))
}

/// A cart priced without a catalog: every line carries its own unit price.
#[derive(Debug, Clone, Deserialize)]
pub struct QuoteScenario {
    /// Defaults to a throwaway guest session.
    #[serde(default)]
    pub identity: Option<CartIdentity>,
    pub lines: Vec<PricedLine>,
    #[serde(default)]
    pub discount: Option<DiscountSpec>,
    #[serde(default)]
    pub loyalty_points: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PricedLine {
    pub product_id: String,
    #[serde(default)]
    pub variant_id: Option<String>,
    pub quantity: i64,
    pub unit_price: i64,
}

impl PricedLine {
    pub fn product_id(&self) -> ProductId {
        ProductId::new(self.product_id.as_str())
    }

    pub fn variant_id(&self) -> Option<VariantId> {
        self.variant_id.as_deref().map(VariantId::new)
    }
}

/// A discount attached directly to a quoted cart.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscountSpec {
    pub code: String,
    pub kind: DiscountKind,
    pub value: i64,
    #[serde(default)]
    pub max_discount: Option<i64>,
}

impl DiscountSpec {
    pub fn to_attachment(&self, policy: &PricingPolicy) -> Result<DiscountAttachment> {
        let attachment = DiscountAttachment::new(
            &self.code,
            self.kind,
            self.value,
            self.max_discount.map(|m| policy.money(m)),
        )?;
        Ok(attachment)
    }
}

/// A complete shopping session: catalog, codes, balance, cart and checkout.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutScenario {
    pub identity: CartIdentity,
    pub products: Vec<ProductSpec>,
    #[serde(default)]
    pub variants: Vec<VariantSpec>,
    #[serde(default)]
    pub discounts: Vec<DiscountDefinition>,
    /// Points credited to a registered customer before shopping.
    #[serde(default)]
    pub loyalty_balance: i64,
    pub lines: Vec<CartLine>,
    #[serde(default)]
    pub discount_code: Option<String>,
    #[serde(default)]
    pub loyalty_points: i64,
    pub request: CheckoutRequest,
    /// Status changes applied to the placed order, in order.
    #[serde(default)]
    pub transitions: Vec<TransitionStep>,
}

impl CheckoutScenario {
    pub fn catalog(&self, policy: &PricingPolicy) -> InMemoryCatalog {
        let mut catalog = InMemoryCatalog::new();
        for product in &self.products {
            catalog.insert_product(product.to_record(policy));
        }
        for variant in &self.variants {
            catalog.insert_variant(variant.to_record(policy));
        }
        catalog
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductSpec {
    pub id: String,
    pub name: String,
    pub price: i64,
    pub stock: i64,
    #[serde(default)]
    pub category_id: Option<String>,
}

impl ProductSpec {
    fn to_record(&self, policy: &PricingPolicy) -> ProductRecord {
        let record = ProductRecord::new(
            self.id.as_str(),
            self.name.as_str(),
            policy.money(self.price),
            self.stock,
        );
        match self.category_id {
            Some(ref category) => record.in_category(CategoryId::new(category.as_str())),
            None => record,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VariantSpec {
    pub id: String,
    pub product_id: String,
    pub name: String,
    pub price: i64,
    pub stock: i64,
}

impl VariantSpec {
    fn to_record(&self, policy: &PricingPolicy) -> VariantRecord {
        VariantRecord::new(
            self.id.as_str(),
            self.product_id.as_str(),
            self.name.as_str(),
            policy.money(self.price),
            self.stock,
        )
    }
}

/// A discount code seeded into the registry.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscountDefinition {
    pub code: String,
    pub kind: DiscountKind,
    pub value: i64,
    pub max_uses: u32,
    #[serde(default)]
    pub min_order_amount: i64,
    #[serde(default)]
    pub max_discount: Option<i64>,
    #[serde(default)]
    pub first_time_only: bool,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl DiscountDefinition {
    pub fn to_code(&self, policy: &PricingPolicy) -> Result<DiscountCode> {
        let min_order = policy.money(self.min_order_amount);
        let mut code = match self.kind {
            DiscountKind::Percentage => {
                DiscountCode::percentage(&self.code, self.value, self.max_uses, min_order)?
            }
            DiscountKind::Fixed => DiscountCode::fixed(
                &self.code,
                policy.money(self.value),
                self.max_uses,
                min_order,
            )?,
        };
        if let Some(max) = self.max_discount {
            code = code.with_max_discount(policy.money(max));
        }
        if self.first_time_only {
            code = code.first_time_only();
        }
        if !self.categories.is_empty() {
            code = code.for_categories(self.categories.iter().map(|c| CategoryId::new(c.as_str())));
        }
        if let Some(ref description) = self.description {
            code = code.with_description(description.as_str());
        }
        Ok(code)
    }
}

/// A cart line priced from the scenario catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct CartLine {
    pub product_id: String,
    #[serde(default)]
    pub variant_id: Option<String>,
    pub quantity: i64,
}

impl CartLine {
    pub fn product_id(&self) -> ProductId {
        ProductId::new(self.product_id.as_str())
    }

    pub fn variant_id(&self) -> Option<VariantId> {
        self.variant_id.as_deref().map(VariantId::new)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransitionStep {
    pub status: OrderStatus,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub actor: Option<String>,
}
