//! Cart pricing calculations.

use crate::cart::CartLineItem;
use crate::config::PricingPolicy;
use crate::discount::DiscountAttachment;
use crate::error::CommerceError;
use crate::money::{Currency, Money};
use serde::{Deserialize, Serialize};

/// Complete pricing breakdown for a cart.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CartTotals {
    /// Sum of line totals.
    pub subtotal: Money,
    /// Tax on the subtotal.
    pub tax: Money,
    /// Shipping fee.
    pub shipping: Money,
    /// Discount from the attached code.
    pub discount: Money,
    /// Deduction from redeemed loyalty points.
    pub loyalty_discount: Money,
    /// `max(0, subtotal + tax + shipping - discount - loyalty_discount)`.
    pub total: Money,
}

impl CartTotals {
    /// All-zero totals.
    pub fn zero(currency: Currency) -> Self {
        let zero = Money::zero(currency);
        Self {
            subtotal: zero,
            tax: zero,
            shipping: zero,
            discount: zero,
            loyalty_discount: zero,
            total: zero,
        }
    }
}

/// Compute totals from the cart's inputs.
///
/// Pure: the same items, attachment and points always give the same
/// totals. An empty cart prices to zero, shipping included.
pub fn compute_totals(
    items: &[CartLineItem],
    discount: Option<&DiscountAttachment>,
    loyalty_points: i64,
    policy: &PricingPolicy,
) -> Result<CartTotals, CommerceError> {
    let currency = policy.currency;
    if items.is_empty() {
        return Ok(CartTotals::zero(currency));
    }

    let line_totals = items
        .iter()
        .map(|item| {
            if item.unit_price.currency != currency {
                return Err(CommerceError::CurrencyMismatch {
                    expected: currency.code().to_string(),
                    got: item.unit_price.currency.code().to_string(),
                });
            }
            item.line_total().ok_or(CommerceError::Overflow)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let subtotal = Money::try_sum(line_totals.iter(), currency).ok_or(CommerceError::Overflow)?;
    let tax = subtotal.apply_rate_bps(policy.tax_rate_bps);
    let shipping = policy.shipping_for(&subtotal);

    let discount = discount
        .map(|d| d.amount_for(&subtotal))
        .unwrap_or_else(|| Money::zero(currency));

    let loyalty_discount = policy
        .money(loyalty_points.max(0).saturating_mul(policy.loyalty_point_value))
        .min(subtotal);

    let total = subtotal
        .try_add(&tax)
        .and_then(|m| m.try_add(&shipping))
        .and_then(|m| m.try_subtract(&discount))
        .and_then(|m| m.try_subtract(&loyalty_discount))
        .ok_or(CommerceError::Overflow)?
        .non_negative();

    Ok(CartTotals {
        subtotal,
        tax,
        shipping,
        discount,
        loyalty_discount,
        total,
    })
}

/// Display-oriented cart summary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartSummary {
    pub item_count: i64,
    pub subtotal: Money,
    pub tax: Money,
    pub shipping: Money,
    pub discount: Money,
    pub loyalty_discount: Money,
    pub total: Money,
    pub discount_code: Option<String>,
    pub loyalty_points_used: i64,
}
