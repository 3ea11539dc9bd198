//! Cart and line item types.

use crate::cart::{CartSummary, CartTotals};
use crate::discount::DiscountAttachment;
use crate::identity::CartIdentity;
use crate::ids::{CartId, ProductId, VariantId};
use crate::money::{Currency, Money};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A shopping cart.
///
/// Items, totals and attachments are only changed through
/// [`CartEngine`](crate::cart::CartEngine), which recomputes totals after
/// every mutation. Readers use the accessors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cart {
    /// Unique cart identifier.
    pub id: CartId,
    /// Who owns the cart.
    pub identity: CartIdentity,
    pub(crate) items: Vec<CartLineItem>,
    pub(crate) totals: CartTotals,
    pub(crate) discount: Option<DiscountAttachment>,
    pub(crate) loyalty_points_used: i64,
    pub(crate) is_active: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Time of the last mutation.
    pub updated_at: DateTime<Utc>,
    /// After this instant the cart is no longer served as the active cart.
    pub expires_at: DateTime<Utc>,
}

impl Cart {
    pub(crate) fn new(identity: CartIdentity, currency: Currency, ttl_days: i64, now: DateTime<Utc>) -> Self {
        Self {
            id: CartId::generate(),
            identity,
            items: Vec::new(),
            totals: CartTotals::zero(currency),
            discount: None,
            loyalty_points_used: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
            expires_at: now + Duration::days(ttl_days),
        }
    }

    /// Line items in insertion order.
    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    /// Current totals.
    pub fn totals(&self) -> &CartTotals {
        &self.totals
    }

    /// Attached discount, if any.
    pub fn discount(&self) -> Option<&DiscountAttachment> {
        self.discount.as_ref()
    }

    /// Loyalty points applied to this cart.
    pub fn loyalty_points_used(&self) -> i64 {
        self.loyalty_points_used
    }

    /// False once the cart has been merged into another.
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Whether the cart's TTL has elapsed at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Active and not expired at `now`.
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && !self.is_expired_at(now)
    }

    /// Check if cart is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Get total item count (sum of quantities).
    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Find the line for a (product, variant) pair.
    pub fn find_item(&self, product_id: &ProductId, variant_id: Option<&VariantId>) -> Option<&CartLineItem> {
        self.items.iter().find(|i| i.matches(product_id, variant_id))
    }

    /// Quantity of a (product, variant) pair already in the cart.
    pub fn quantity_of(&self, product_id: &ProductId, variant_id: Option<&VariantId>) -> i64 {
        self.find_item(product_id, variant_id)
            .map(|i| i.quantity)
            .unwrap_or(0)
    }

    /// Compact view for display.
    pub fn summary(&self) -> CartSummary {
        CartSummary {
            item_count: self.item_count(),
            subtotal: self.totals.subtotal,
            tax: self.totals.tax,
            shipping: self.totals.shipping,
            discount: self.totals.discount,
            loyalty_discount: self.totals.loyalty_discount,
            total: self.totals.total,
            discount_code: self.discount.as_ref().map(|d| d.code.clone()),
            loyalty_points_used: self.loyalty_points_used,
        }
    }
}

/// A line item in the cart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartLineItem {
    /// Product being purchased.
    pub product_id: ProductId,
    /// Selected variant, if the product has variants.
    pub variant_id: Option<VariantId>,
    /// Quantity, between 1 and the configured maximum.
    pub quantity: i64,
    /// Unit price captured when the line was last added to.
    pub unit_price: Money,
    /// When the line was first added.
    pub added_at: DateTime<Utc>,
}

impl CartLineItem {
    /// Whether this line is for the given (product, variant) pair.
    pub fn matches(&self, product_id: &ProductId, variant_id: Option<&VariantId>) -> bool {
        &self.product_id == product_id && self.variant_id.as_ref() == variant_id
    }

    /// `unit_price * quantity`, or `None` on overflow.
    pub fn line_total(&self) -> Option<Money> {
        self.unit_price.try_multiply(self.quantity)
    }
}
