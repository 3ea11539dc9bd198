//! Discount codes, eligibility, and the registry collaborator.

mod code;
mod registry;

pub use code::{
    compute_discount, normalize_code, DiscountCode, DiscountKind, DiscountUsage, Eligibility,
    CODE_LENGTH, MAX_USES_LIMIT,
};
pub use registry::{CacheDiscountRegistry, DiscountRegistry};

use crate::error::CommerceError;
use crate::money::Money;
use serde::{Deserialize, Serialize};

/// The discount currently attached to a cart.
///
/// Attaching only previews the amount; the code is redeemed against the
/// registry when the order is placed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountAttachment {
    /// Normalized code.
    pub code: String,
    /// Percentage or fixed.
    pub kind: DiscountKind,
    /// Percent (for `Percentage`) or amount in minor units (for `Fixed`).
    pub value: i64,
    /// Cap on the computed amount.
    pub max_discount: Option<Money>,
}

impl DiscountAttachment {
    /// Build an attachment from raw parts. The code is normalized.
    pub fn new(
        code: &str,
        kind: DiscountKind,
        value: i64,
        max_discount: Option<Money>,
    ) -> Result<Self, CommerceError> {
        if value <= 0 {
            return Err(CommerceError::ValidationError(
                "discount value must be positive".to_string(),
            ));
        }
        if kind == DiscountKind::Percentage && value > 100 {
            return Err(CommerceError::ValidationError(
                "percentage discount cannot exceed 100".to_string(),
            ));
        }
        Ok(Self {
            code: normalize_code(code)?,
            kind,
            value,
            max_discount,
        })
    }

    /// Build an attachment from a registry definition.
    pub fn from_code(code: &DiscountCode) -> Self {
        Self {
            code: code.code.clone(),
            kind: code.kind,
            value: code.value,
            max_discount: code.max_discount_amount,
        }
    }

    /// Amount this attachment takes off `subtotal`.
    pub fn amount_for(&self, subtotal: &Money) -> Money {
        compute_discount(self.kind, self.value, self.max_discount.as_ref(), subtotal)
    }
}
