//! Store pricing policy.

use crate::error::CommerceError;
use crate::money::{Currency, Money};
use serde::{Deserialize, Serialize};

/// Tunable constants used by the cart engine and order lifecycle.
///
/// Every field has a default, so a partial config file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingPolicy {
    /// Store currency.
    #[serde(default)]
    pub currency: Currency,

    /// Tax rate in basis points (1000 = 10%).
    #[serde(default = "default_tax_rate_bps")]
    pub tax_rate_bps: u32,

    /// Shipping fee charged below the free-shipping threshold.
    #[serde(default = "default_flat_shipping_fee")]
    pub flat_shipping_fee: i64,

    /// Subtotal at or above which shipping is free.
    #[serde(default = "default_free_shipping_threshold")]
    pub free_shipping_threshold: i64,

    /// Value of one redeemed loyalty point.
    #[serde(default = "default_loyalty_point_value")]
    pub loyalty_point_value: i64,

    /// One point is earned per this much order total.
    #[serde(default = "default_loyalty_earn_divisor")]
    pub loyalty_earn_divisor: i64,

    /// Upper bound on a single line's quantity.
    #[serde(default = "default_max_quantity_per_item")]
    pub max_quantity_per_item: i64,

    /// Days after delivery during which a return may be requested.
    #[serde(default = "default_return_window_days")]
    pub return_window_days: i64,

    /// Days an untouched cart stays active.
    #[serde(default = "default_cart_ttl_days")]
    pub cart_ttl_days: i64,
}

fn default_tax_rate_bps() -> u32 {
    1000
}

fn default_flat_shipping_fee() -> i64 {
    30_000
}

fn default_free_shipping_threshold() -> i64 {
    1_000_000
}

fn default_loyalty_point_value() -> i64 {
    1_000
}

fn default_loyalty_earn_divisor() -> i64 {
    10_000
}

fn default_max_quantity_per_item() -> i64 {
    99
}

fn default_return_window_days() -> i64 {
    7
}

fn default_cart_ttl_days() -> i64 {
    30
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            currency: Currency::default(),
            tax_rate_bps: default_tax_rate_bps(),
            flat_shipping_fee: default_flat_shipping_fee(),
            free_shipping_threshold: default_free_shipping_threshold(),
            loyalty_point_value: default_loyalty_point_value(),
            loyalty_earn_divisor: default_loyalty_earn_divisor(),
            max_quantity_per_item: default_max_quantity_per_item(),
            return_window_days: default_return_window_days(),
            cart_ttl_days: default_cart_ttl_days(),
        }
    }
}

impl PricingPolicy {
    /// Money in the store currency.
    pub fn money(&self, amount: i64) -> Money {
        Money::new(amount, self.currency)
    }

    /// Shipping charged for a given subtotal.
    pub fn shipping_for(&self, subtotal: &Money) -> Money {
        if subtotal.amount >= self.free_shipping_threshold {
            Money::zero(self.currency)
        } else {
            self.money(self.flat_shipping_fee)
        }
    }

    /// Check every value is in range. Returns all problems at once.
    pub fn validate(&self) -> Result<(), CommerceError> {
        let mut problems = Vec::new();

        if self.tax_rate_bps > 10_000 {
            problems.push("tax_rate_bps must be 0-10000");
        }
        if self.flat_shipping_fee < 0 {
            problems.push("flat_shipping_fee must not be negative");
        }
        if self.free_shipping_threshold < 0 {
            problems.push("free_shipping_threshold must not be negative");
        }
        if self.loyalty_point_value < 0 {
            problems.push("loyalty_point_value must not be negative");
        }
        if self.loyalty_earn_divisor <= 0 {
            problems.push("loyalty_earn_divisor must be positive");
        }
        if self.max_quantity_per_item < 1 {
            problems.push("max_quantity_per_item must be at least 1");
        }
        if self.return_window_days < 0 {
            problems.push("return_window_days must not be negative");
        }
        if self.cart_ttl_days < 1 {
            problems.push("cart_ttl_days must be at least 1");
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(CommerceError::ValidationError(problems.join("; ")))
        }
    }
}
