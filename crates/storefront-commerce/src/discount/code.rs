//! Discount code definitions.

use crate::error::CommerceError;
use crate::identity::CartIdentity;
use crate::ids::{CategoryId, DiscountId, ProductId, UserId};
use crate::money::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Codes are exactly this many ASCII alphanumerics.
pub const CODE_LENGTH: usize = 5;

/// Upper bound for `max_uses`.
pub const MAX_USES_LIMIT: u32 = 10;

/// Type of discount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    /// Percentage off the order amount.
    Percentage,
    /// Fixed amount off.
    Fixed,
}

/// Compute a discount amount against `base`.
///
/// Percentage: `round(base * value / 100)`. Fixed: `value`. The result is
/// capped by `max_discount`, then by `base`, and is never negative.
pub fn compute_discount(
    kind: DiscountKind,
    value: i64,
    max_discount: Option<&Money>,
    base: &Money,
) -> Money {
    let raw = match kind {
        DiscountKind::Percentage => base.percent_of(value),
        DiscountKind::Fixed => Money::new(value, base.currency),
    };

    let capped = match max_discount {
        Some(max) => raw.min(*max),
        None => raw,
    };

    capped.min(*base).non_negative()
}

/// Normalize a user-entered code to its canonical uppercase form.
pub fn normalize_code(code: &str) -> Result<String, CommerceError> {
    let trimmed = code.trim();
    if trimmed.len() != CODE_LENGTH || !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(CommerceError::InvalidDiscountCode(format!(
            "'{}' must be {} letters or digits",
            code, CODE_LENGTH
        )));
    }
    Ok(trimmed.to_ascii_uppercase())
}

/// Outcome of an eligibility check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eligibility {
    /// Whether the code can be used.
    pub valid: bool,
    /// Human-readable reason when not valid.
    pub reason: Option<String>,
}

impl Eligibility {
    fn ok() -> Self {
        Self {
            valid: true,
            reason: None,
        }
    }

    fn denied(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: Some(reason.into()),
        }
    }

    /// Convert to a `Result`, mapping a denial to `DiscountIneligible`.
    pub fn into_result(self) -> Result<(), CommerceError> {
        if self.valid {
            Ok(())
        } else {
            Err(CommerceError::DiscountIneligible(
                self.reason
                    .unwrap_or_else(|| "discount code cannot be used".to_string()),
            ))
        }
    }
}

/// One redemption of a code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountUsage {
    /// Who redeemed it.
    pub identity: CartIdentity,
    /// Order the discount was applied to.
    pub order_number: String,
    /// Amount discounted.
    pub amount: Money,
    /// When it was redeemed.
    pub used_at: DateTime<Utc>,
}

/// A discount code definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountCode {
    /// Unique discount identifier.
    pub id: DiscountId,
    /// Normalized code (e.g., "SAVE5").
    pub code: String,
    /// Description for display.
    pub description: Option<String>,
    /// Percentage or fixed.
    pub kind: DiscountKind,
    /// Percent (for `Percentage`) or amount in minor units (for `Fixed`).
    pub value: i64,
    /// Minimum order amount for the code to apply.
    pub min_order_amount: Money,
    /// Cap on the computed discount.
    pub max_discount_amount: Option<Money>,
    /// Maximum number of redemptions (1-10).
    pub max_uses: u32,
    /// Redemptions so far.
    pub used_count: u32,
    /// If non-empty, the order must contain one of these products.
    pub eligible_products: Vec<ProductId>,
    /// If non-empty, the order must contain a product from one of these categories.
    pub eligible_categories: Vec<CategoryId>,
    /// If non-empty, only these users may use the code.
    pub eligible_users: Vec<UserId>,
    /// Only usable once per identity.
    pub first_time_only: bool,
    /// Whether the code is enabled.
    pub active: bool,
    /// Redemption log.
    pub usage_history: Vec<DiscountUsage>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl DiscountCode {
    /// Create a percentage discount.
    pub fn percentage(code: &str, percent: i64, max_uses: u32, min_order_amount: Money) -> Result<Self, CommerceError> {
        Self::build(code, DiscountKind::Percentage, percent, max_uses, min_order_amount)
    }

    /// Create a fixed amount discount.
    pub fn fixed(code: &str, amount: Money, max_uses: u32, min_order_amount: Money) -> Result<Self, CommerceError> {
        Self::build(code, DiscountKind::Fixed, amount.amount, max_uses, min_order_amount)
    }

    fn build(
        code: &str,
        kind: DiscountKind,
        value: i64,
        max_uses: u32,
        min_order_amount: Money,
    ) -> Result<Self, CommerceError> {
        let now = Utc::now();
        let discount = Self {
            id: DiscountId::generate(),
            code: normalize_code(code)?,
            description: None,
            kind,
            value,
            min_order_amount,
            max_discount_amount: None,
            max_uses,
            used_count: 0,
            eligible_products: Vec::new(),
            eligible_categories: Vec::new(),
            eligible_users: Vec::new(),
            first_time_only: false,
            active: true,
            usage_history: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        discount.validate()?;
        Ok(discount)
    }

    /// Cap the discount amount.
    pub fn with_max_discount(mut self, max: Money) -> Self {
        self.max_discount_amount = Some(max);
        self
    }

    /// Restrict to first-time use per identity.
    pub fn first_time_only(mut self) -> Self {
        self.first_time_only = true;
        self
    }

    /// Restrict to specific users.
    pub fn for_users(mut self, users: impl IntoIterator<Item = UserId>) -> Self {
        self.eligible_users.extend(users);
        self
    }

    /// Restrict to orders containing specific products.
    pub fn for_products(mut self, products: impl IntoIterator<Item = ProductId>) -> Self {
        self.eligible_products.extend(products);
        self
    }

    /// Restrict to orders containing products from specific categories.
    pub fn for_categories(mut self, categories: impl IntoIterator<Item = CategoryId>) -> Self {
        self.eligible_categories.extend(categories);
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Check the definition's invariants.
    pub fn validate(&self) -> Result<(), CommerceError> {
        normalize_code(&self.code)?;

        if !(1..=MAX_USES_LIMIT).contains(&self.max_uses) {
            return Err(CommerceError::ValidationError(format!(
                "max_uses must be between 1 and {}",
                MAX_USES_LIMIT
            )));
        }
        if self.used_count > self.max_uses {
            return Err(CommerceError::ValidationError(
                "used_count exceeds max_uses".to_string(),
            ));
        }
        match self.kind {
            DiscountKind::Percentage if !(1..=100).contains(&self.value) => {
                return Err(CommerceError::ValidationError(
                    "percentage value must be between 1 and 100".to_string(),
                ))
            }
            DiscountKind::Fixed if self.value <= 0 => {
                return Err(CommerceError::ValidationError(
                    "fixed value must be positive".to_string(),
                ))
            }
            _ => {}
        }
        if self.min_order_amount.is_negative() {
            return Err(CommerceError::ValidationError(
                "min_order_amount must not be negative".to_string(),
            ));
        }
        if self.max_discount_amount.is_some_and(|m| m.is_negative()) {
            return Err(CommerceError::ValidationError(
                "max_discount_amount must not be negative".to_string(),
            ));
        }
        Ok(())
    }

    /// Active and not yet exhausted.
    pub fn is_valid(&self) -> bool {
        self.active && self.used_count < self.max_uses
    }

    /// Check if the code has been used up.
    pub fn is_exhausted(&self) -> bool {
        self.used_count >= self.max_uses
    }

    /// Whether `identity` has redeemed this code before.
    pub fn used_by(&self, identity: &CartIdentity) -> bool {
        self.usage_history.iter().any(|u| &u.identity == identity)
    }

    /// Check whether `identity` may use the code on an order of `amount`.
    ///
    /// Fails closed: the first failing rule decides the reason.
    pub fn can_be_used_by(&self, identity: &CartIdentity, amount: &Money) -> Eligibility {
        if !self.active {
            return Eligibility::denied("Discount code is not active");
        }
        if self.is_exhausted() {
            return Eligibility::denied("Discount code has reached its usage limit");
        }
        if amount.amount < self.min_order_amount.amount {
            return Eligibility::denied(format!(
                "Minimum order amount is {}",
                self.min_order_amount.display()
            ));
        }
        if !self.eligible_users.is_empty() {
            let allowed = identity
                .user_id()
                .is_some_and(|user| self.eligible_users.contains(user));
            if !allowed {
                return Eligibility::denied("Discount code is not available for this account");
            }
        }
        if self.first_time_only && self.used_by(identity) {
            return Eligibility::denied("Discount code can only be used once per customer");
        }
        Eligibility::ok()
    }

    /// Check product/category restrictions against the order's lines.
    ///
    /// Each item is a product with its category, if known.
    pub fn covers_items<'a, I>(&self, items: I) -> Eligibility
    where
        I: IntoIterator<Item = (&'a ProductId, Option<&'a CategoryId>)>,
    {
        if self.eligible_products.is_empty() && self.eligible_categories.is_empty() {
            return Eligibility::ok();
        }

        let matched = items.into_iter().any(|(product, category)| {
            self.eligible_products.contains(product)
                || category.is_some_and(|c| self.eligible_categories.contains(c))
        });

        if matched {
            Eligibility::ok()
        } else {
            Eligibility::denied("Discount code does not apply to the items in this cart")
        }
    }

    /// Discount this code gives on `amount`.
    pub fn calculate_discount(&self, amount: &Money) -> Money {
        compute_discount(self.kind, self.value, self.max_discount_amount.as_ref(), amount)
    }

    /// Record a redemption.
    ///
    /// Redeeming twice for the same order is a no-op. Fails once
    /// `used_count` has reached `max_uses`.
    pub fn use_code(
        &mut self,
        identity: &CartIdentity,
        order_number: &str,
        amount: Money,
        at: DateTime<Utc>,
    ) -> Result<(), CommerceError> {
        if self
            .usage_history
            .iter()
            .any(|u| u.order_number == order_number)
        {
            return Ok(());
        }
        if self.is_exhausted() {
            return Err(CommerceError::DiscountUsageLimitReached(self.code.clone()));
        }

        self.usage_history.push(DiscountUsage {
            identity: identity.clone(),
            order_number: order_number.to_string(),
            amount,
            used_at: at,
        });
        self.used_count += 1;
        self.updated_at = at;
        Ok(())
    }

    /// Undo the redemption recorded for `order_number`.
    ///
    /// Returns whether a usage was removed.
    pub fn release_usage(&mut self, order_number: &str, at: DateTime<Utc>) -> bool {
        let before = self.usage_history.len();
        self.usage_history.retain(|u| u.order_number != order_number);
        if self.usage_history.len() == before {
            return false;
        }
        self.used_count = self.used_count.saturating_sub(1);
        self.updated_at = at;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SessionId;
    use crate::money::Currency;

    fn vnd(amount: i64) -> Money {
        Money::new(amount, Currency::VND)
    }

    fn user(id: &str) -> CartIdentity {
        CartIdentity::Registered(UserId::new(id))
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code(" save5 ").unwrap(), "SAVE5");
        assert!(normalize_code("SAVE").is_err());
        assert!(normalize_code("SAVE10").is_err());
        assert!(normalize_code("SA-E5").is_err());
    }

    #[test]
    fn test_percentage_discount() {
        let discount = DiscountCode::percentage("SAVE1", 10, 5, vnd(0)).unwrap();
        assert_eq!(discount.calculate_discount(&vnd(100_000)).amount, 10_000);
    }

    #[test]
    fn test_percentage_discount_capped_by_max() {
        let discount = DiscountCode::percentage("TENPC", 10, 5, vnd(0))
            .unwrap()
            .with_max_discount(vnd(50_000));
        assert_eq!(discount.calculate_discount(&vnd(1_000_000)).amount, 50_000);
    }

    #[test]
    fn test_fixed_discount_capped_by_amount() {
        let discount = DiscountCode::fixed("FIX50", vnd(50_000), 5, vnd(0)).unwrap();
        assert_eq!(discount.calculate_discount(&vnd(200_000)).amount, 50_000);
        assert_eq!(discount.calculate_discount(&vnd(30_000)).amount, 30_000);
    }

    #[test]
    fn test_definition_validation() {
        assert!(DiscountCode::percentage("BAD01", 0, 5, vnd(0)).is_err());
        assert!(DiscountCode::percentage("BAD02", 101, 5, vnd(0)).is_err());
        assert!(DiscountCode::percentage("BAD03", 10, 0, vnd(0)).is_err());
        assert!(DiscountCode::percentage("BAD04", 10, 11, vnd(0)).is_err());
        assert!(DiscountCode::fixed("BAD05", vnd(0), 5, vnd(0)).is_err());
        assert!(DiscountCode::fixed("TOOLONG", vnd(10), 5, vnd(0)).is_err());
    }

    #[test]
    fn test_exhausted_code_is_invalid() {
        let mut discount = DiscountCode::percentage("LIMIT", 10, 2, vnd(0)).unwrap();
        assert!(discount.is_valid());

        discount.used_count = 2;
        assert!(!discount.is_valid());
        let result = discount.can_be_used_by(&user("u1"), &vnd(100_000));
        assert!(!result.valid);
        assert!(result.reason.unwrap().contains("usage limit"));
    }

    #[test]
    fn test_inactive_code_is_invalid() {
        let mut discount = DiscountCode::percentage("OFF10", 10, 2, vnd(0)).unwrap();
        discount.active = false;
        assert!(!discount.can_be_used_by(&user("u1"), &vnd(100_000)).valid);
    }

    #[test]
    fn test_minimum_order_amount() {
        let discount = DiscountCode::percentage("MIN50", 10, 5, vnd(500_000)).unwrap();
        assert!(!discount.can_be_used_by(&user("u1"), &vnd(499_999)).valid);
        assert!(discount.can_be_used_by(&user("u1"), &vnd(500_000)).valid);
    }

    #[test]
    fn test_user_allow_list() {
        let discount = DiscountCode::percentage("VIP01", 10, 5, vnd(0))
            .unwrap()
            .for_users([UserId::new("vip")]);

        assert!(discount.can_be_used_by(&user("vip"), &vnd(1)).valid);
        assert!(!discount.can_be_used_by(&user("other"), &vnd(1)).valid);
        let guest = CartIdentity::Guest(SessionId::new("s1"));
        assert!(!discount.can_be_used_by(&guest, &vnd(1)).valid);
    }

    #[test]
    fn test_first_time_only() {
        let mut discount = DiscountCode::percentage("FIRST", 10, 5, vnd(0))
            .unwrap()
            .first_time_only();
        let buyer = user("u1");

        assert!(discount.can_be_used_by(&buyer, &vnd(100)).valid);
        discount
            .use_code(&buyer, "ORD-1", vnd(10), Utc::now())
            .unwrap();
        assert!(!discount.can_be_used_by(&buyer, &vnd(100)).valid);
        assert!(discount.can_be_used_by(&user("u2"), &vnd(100)).valid);
    }

    #[test]
    fn test_use_code_increments_and_records() {
        let mut discount = DiscountCode::percentage("TWICE", 10, 2, vnd(0)).unwrap();
        let buyer = user("u1");

        discount.use_code(&buyer, "ORD-1", vnd(100), Utc::now()).unwrap();
        assert_eq!(discount.used_count, 1);
        assert_eq!(discount.usage_history.len(), 1);
        assert_eq!(discount.usage_history[0].order_number, "ORD-1");

        discount.use_code(&buyer, "ORD-2", vnd(100), Utc::now()).unwrap();
        let err = discount
            .use_code(&buyer, "ORD-3", vnd(100), Utc::now())
            .unwrap_err();
        assert!(matches!(err, CommerceError::DiscountUsageLimitReached(_)));
        assert_eq!(discount.used_count, 2);
    }

    #[test]
    fn test_use_code_is_idempotent_per_order() {
        let mut discount = DiscountCode::percentage("ONCE1", 10, 3, vnd(0)).unwrap();
        let buyer = user("u1");

        discount.use_code(&buyer, "ORD-1", vnd(100), Utc::now()).unwrap();
        discount.use_code(&buyer, "ORD-1", vnd(100), Utc::now()).unwrap();
        assert_eq!(discount.used_count, 1);
        assert_eq!(discount.usage_history.len(), 1);
    }

    #[test]
    fn test_release_usage_frees_a_slot() {
        let mut discount = DiscountCode::percentage("ONCE1", 10, 1, vnd(0)).unwrap();
        let buyer = user("u1");

        discount.use_code(&buyer, "ORD-1", vnd(100), Utc::now()).unwrap();
        assert!(!discount.is_valid());

        assert!(!discount.release_usage("ORD-9", Utc::now()));
        assert_eq!(discount.used_count, 1);

        assert!(discount.release_usage("ORD-1", Utc::now()));
        assert_eq!(discount.used_count, 0);
        assert!(discount.usage_history.is_empty());
        assert!(discount.is_valid());
        assert!(!discount.release_usage("ORD-1", Utc::now()));
    }

    #[test]
    fn test_covers_items() {
        let discount = DiscountCode::percentage("SHOES", 10, 5, vnd(0))
            .unwrap()
            .for_categories([CategoryId::new("shoes")]);

        let sneaker = ProductId::new("p1");
        let shoes = CategoryId::new("shoes");
        let shirt = ProductId::new("p2");

        assert!(discount.covers_items([(&sneaker, Some(&shoes))]).valid);
        assert!(!discount.covers_items([(&shirt, None)]).valid);

        let unrestricted = DiscountCode::percentage("ALL10", 10, 5, vnd(0)).unwrap();
        assert!(unrestricted.covers_items([(&shirt, None)]).valid);
    }

    #[test]
    fn test_eligibility_into_result() {
        let denied = Eligibility::denied("nope");
        let err = denied.into_result().unwrap_err();
        assert!(matches!(err, CommerceError::DiscountIneligible(ref r) if r == "nope"));
        assert!(Eligibility::ok().into_result().is_ok());
    }
}
