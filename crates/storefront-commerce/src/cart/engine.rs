//! Cart mutations.
//!
//! Every mutating operation checks that the cart is active, validates its
//! input, builds the next item list and recomputes totals before anything
//! is written back. A failed operation leaves the cart untouched.

use crate::cart::{compute_totals, Cart, CartLineItem, CartTotals};
use crate::config::PricingPolicy;
use crate::discount::DiscountAttachment;
use crate::error::CommerceError;
use crate::identity::CartIdentity;
use crate::ids::{ProductId, VariantId};
use crate::money::Money;
use chrono::{DateTime, Duration, Utc};

/// Applies cart operations under a pricing policy.
#[derive(Debug, Clone, Default)]
pub struct CartEngine {
    policy: PricingPolicy,
}

impl CartEngine {
    pub fn new(policy: PricingPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &PricingPolicy {
        &self.policy
    }

    /// Create an empty cart for `identity`.
    pub fn new_cart(&self, identity: CartIdentity) -> Cart {
        self.new_cart_at(identity, Utc::now())
    }

    pub fn new_cart_at(&self, identity: CartIdentity, now: DateTime<Utc>) -> Cart {
        Cart::new(identity, self.policy.currency, self.policy.cart_ttl_days, now)
    }

    /// Add `quantity` of a (product, variant) pair.
    ///
    /// An existing line for the pair gets the quantities summed and its
    /// price replaced by `unit_price`.
    pub fn add_item(
        &self,
        cart: &mut Cart,
        product_id: ProductId,
        variant_id: Option<VariantId>,
        quantity: i64,
        unit_price: Money,
    ) -> Result<CartTotals, CommerceError> {
        ensure_active(cart)?;
        if quantity < 1 {
            return Err(CommerceError::InvalidQuantity(quantity));
        }
        self.check_price(&unit_price)?;

        let now = Utc::now();
        let mut items = cart.items.clone();
        match items
            .iter_mut()
            .find(|i| i.matches(&product_id, variant_id.as_ref()))
        {
            Some(existing) => {
                let new_quantity = existing
                    .quantity
                    .checked_add(quantity)
                    .ok_or(CommerceError::Overflow)?;
                self.check_quantity(new_quantity)?;
                existing.quantity = new_quantity;
                existing.unit_price = unit_price;
            }
            None => {
                self.check_quantity(quantity)?;
                items.push(CartLineItem {
                    product_id,
                    variant_id,
                    quantity,
                    unit_price,
                    added_at: now,
                });
            }
        }

        let discount = cart.discount.clone();
        let points = cart.loyalty_points_used;
        self.commit(cart, items, discount, points, now)?;
        tracing::debug!(
            cart_id = %cart.id,
            identity = %cart.identity,
            total = cart.totals.total.amount,
            "item added"
        );
        Ok(cart.totals)
    }

    /// Set the quantity of an existing line. Zero or less removes it.
    pub fn update_item_quantity(
        &self,
        cart: &mut Cart,
        product_id: &ProductId,
        variant_id: Option<&VariantId>,
        quantity: i64,
    ) -> Result<CartTotals, CommerceError> {
        ensure_active(cart)?;
        if quantity <= 0 {
            return self.remove_item(cart, product_id, variant_id);
        }

        let mut items = cart.items.clone();
        let line = items
            .iter_mut()
            .find(|i| i.matches(product_id, variant_id))
            .ok_or_else(|| CommerceError::ItemNotFound(describe(product_id, variant_id)))?;
        self.check_quantity(quantity)?;
        line.quantity = quantity;

        let discount = cart.discount.clone();
        let points = cart.loyalty_points_used;
        self.commit(cart, items, discount, points, Utc::now())?;
        tracing::debug!(
            cart_id = %cart.id,
            product_id = %product_id,
            quantity,
            "item quantity updated"
        );
        Ok(cart.totals)
    }

    /// Remove a line. Removing a missing line is a no-op.
    pub fn remove_item(
        &self,
        cart: &mut Cart,
        product_id: &ProductId,
        variant_id: Option<&VariantId>,
    ) -> Result<CartTotals, CommerceError> {
        ensure_active(cart)?;

        let mut items = cart.items.clone();
        items.retain(|i| !i.matches(product_id, variant_id));

        let discount = cart.discount.clone();
        let points = cart.loyalty_points_used;
        self.commit(cart, items, discount, points, Utc::now())?;
        tracing::debug!(cart_id = %cart.id, product_id = %product_id, "item removed");
        Ok(cart.totals)
    }

    /// Empty the cart and drop any discount or loyalty redemption.
    pub fn clear(&self, cart: &mut Cart) -> Result<CartTotals, CommerceError> {
        ensure_active(cart)?;
        self.commit(cart, Vec::new(), None, 0, Utc::now())?;
        tracing::debug!(cart_id = %cart.id, "cart cleared");
        Ok(cart.totals)
    }

    /// Attach a discount, replacing any previous one.
    ///
    /// Returns the discount amount the cart now carries.
    pub fn apply_discount(
        &self,
        cart: &mut Cart,
        attachment: DiscountAttachment,
    ) -> Result<Money, CommerceError> {
        ensure_active(cart)?;
        if let Some(max) = attachment.max_discount {
            self.check_price(&max)?;
        }

        let code = attachment.code.clone();
        let items = cart.items.clone();
        let points = cart.loyalty_points_used;
        self.commit(cart, items, Some(attachment), points, Utc::now())?;
        tracing::debug!(
            cart_id = %cart.id,
            code = %code,
            discount = cart.totals.discount.amount,
            "discount applied"
        );
        Ok(cart.totals.discount)
    }

    pub fn remove_discount(&self, cart: &mut Cart) -> Result<CartTotals, CommerceError> {
        ensure_active(cart)?;
        let items = cart.items.clone();
        let points = cart.loyalty_points_used;
        self.commit(cart, items, None, points, Utc::now())?;
        Ok(cart.totals)
    }

    /// Redeem `points` against the cart. The deduction is capped at the
    /// subtotal; balance checks belong to the caller.
    pub fn use_loyalty_points(&self, cart: &mut Cart, points: i64) -> Result<CartTotals, CommerceError> {
        ensure_active(cart)?;
        if points < 0 {
            return Err(CommerceError::ValidationError(format!(
                "loyalty points must not be negative, got {}",
                points
            )));
        }

        let (items, discount) = (cart.items.clone(), cart.discount.clone());
        self.commit(cart, items, discount, points, Utc::now())?;
        tracing::debug!(
            cart_id = %cart.id,
            points,
            deduction = cart.totals.loyalty_discount.amount,
            "loyalty points applied"
        );
        Ok(cart.totals)
    }

    pub fn remove_loyalty_points(&self, cart: &mut Cart) -> Result<CartTotals, CommerceError> {
        ensure_active(cart)?;
        let (items, discount) = (cart.items.clone(), cart.discount.clone());
        self.commit(cart, items, discount, 0, Utc::now())?;
        Ok(cart.totals)
    }

    /// Merge a guest cart into `target` and deactivate the guest cart.
    ///
    /// Lines merge with add-item semantics, except that a merged quantity
    /// is clamped to the per-line maximum instead of failing. When `target`
    /// has no items, the guest's discount and loyalty redemption carry over.
    pub fn merge_into(&self, guest: &mut Cart, target: &mut Cart) -> Result<CartTotals, CommerceError> {
        ensure_active(guest)?;
        ensure_active(target)?;

        let max = self.policy.max_quantity_per_item;
        let now = Utc::now();
        let mut items = target.items.clone();
        for line in &guest.items {
            self.check_price(&line.unit_price)?;
            match items
                .iter_mut()
                .find(|i| i.matches(&line.product_id, line.variant_id.as_ref()))
            {
                Some(existing) => {
                    existing.quantity = existing.quantity.saturating_add(line.quantity).min(max);
                    existing.unit_price = line.unit_price;
                }
                None => {
                    let mut added = line.clone();
                    added.quantity = added.quantity.min(max);
                    items.push(added);
                }
            }
        }

        let (discount, points) = if target.items.is_empty() {
            (guest.discount.clone(), guest.loyalty_points_used)
        } else {
            (target.discount.clone(), target.loyalty_points_used)
        };

        self.commit(target, items, discount, points, now)?;
        guest.is_active = false;
        guest.updated_at = now;

        tracing::debug!(
            guest_cart = %guest.id,
            target_cart = %target.id,
            items = target.items.len(),
            "guest cart merged"
        );
        Ok(target.totals)
    }

    fn commit(
        &self,
        cart: &mut Cart,
        items: Vec<CartLineItem>,
        discount: Option<DiscountAttachment>,
        loyalty_points: i64,
        now: DateTime<Utc>,
    ) -> Result<(), CommerceError> {
        let totals = compute_totals(&items, discount.as_ref(), loyalty_points, &self.policy)?;
        cart.items = items;
        cart.discount = discount;
        cart.loyalty_points_used = loyalty_points;
        cart.totals = totals;
        cart.updated_at = now;
        cart.expires_at = now + Duration::days(self.policy.cart_ttl_days);
        Ok(())
    }

    fn check_quantity(&self, quantity: i64) -> Result<(), CommerceError> {
        if quantity > self.policy.max_quantity_per_item {
            return Err(CommerceError::QuantityExceedsLimit(
                quantity,
                self.policy.max_quantity_per_item,
            ));
        }
        Ok(())
    }

    fn check_price(&self, price: &Money) -> Result<(), CommerceError> {
        if price.currency != self.policy.currency {
            return Err(CommerceError::CurrencyMismatch {
                expected: self.policy.currency.code().to_string(),
                got: price.currency.code().to_string(),
            });
        }
        if price.is_negative() {
            return Err(CommerceError::ValidationError(format!(
                "price must not be negative, got {}",
                price.amount
            )));
        }
        Ok(())
    }
}

fn ensure_active(cart: &Cart) -> Result<(), CommerceError> {
    if cart.is_active {
        Ok(())
    } else {
        Err(CommerceError::CartInactive(cart.id.to_string()))
    }
}

fn describe(product_id: &ProductId, variant_id: Option<&VariantId>) -> String {
    match variant_id {
        Some(variant) => format!("{}/{}", product_id, variant),
        None => product_id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discount::DiscountKind;
    use crate::error::ErrorKind;
    use crate::ids::{SessionId, UserId};
    use crate::money::Currency;

    fn vnd(amount: i64) -> Money {
        Money::new(amount, Currency::VND)
    }

    fn setup() -> (CartEngine, Cart) {
        let engine = CartEngine::default();
        let cart = engine.new_cart(CartIdentity::Registered(UserId::new("u1")));
        (engine, cart)
    }

    fn p(id: &str) -> ProductId {
        ProductId::new(id)
    }

    fn assert_subtotal_identity(cart: &Cart) {
        let expected: i64 = cart
            .items()
            .iter()
            .map(|i| i.unit_price.amount * i.quantity)
            .sum();
        assert_eq!(cart.totals().subtotal.amount, expected);
    }

    fn assert_total_formula(cart: &Cart) {
        let t = cart.totals();
        let expected = (t.subtotal.amount + t.tax.amount + t.shipping.amount
            - t.discount.amount
            - t.loyalty_discount.amount)
            .max(0);
        assert_eq!(t.total.amount, expected);
    }

    #[test]
    fn test_add_item_scenario() {
        let (engine, mut cart) = setup();
        let totals = engine
            .add_item(&mut cart, p("p1"), None, 2, vnd(500_000))
            .unwrap();

        assert_eq!(totals.subtotal.amount, 1_000_000);
        assert_eq!(totals.tax.amount, 100_000);
        assert_eq!(totals.shipping.amount, 0);
        assert_eq!(totals.total.amount, 1_100_000);
    }

    #[test]
    fn test_same_pair_merges_into_one_line() {
        let (engine, mut cart) = setup();
        engine.add_item(&mut cart, p("p1"), None, 2, vnd(1_000)).unwrap();
        engine.add_item(&mut cart, p("p1"), None, 3, vnd(1_200)).unwrap();

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 5);
        assert_eq!(cart.items()[0].unit_price.amount, 1_200);
        assert_subtotal_identity(&cart);
    }

    #[test]
    fn test_variants_are_separate_lines() {
        let (engine, mut cart) = setup();
        let v1 = VariantId::new("v1");
        engine.add_item(&mut cart, p("p1"), Some(v1.clone()), 1, vnd(1_000)).unwrap();
        engine.add_item(&mut cart, p("p1"), None, 1, vnd(900)).unwrap();

        assert_eq!(cart.items().len(), 2);
        assert_eq!(cart.quantity_of(&p("p1"), Some(&v1)), 1);
    }

    #[test]
    fn test_add_item_validation() {
        let (engine, mut cart) = setup();

        let err = engine.add_item(&mut cart, p("p1"), None, 0, vnd(1)).unwrap_err();
        assert!(matches!(err, CommerceError::InvalidQuantity(0)));

        let err = engine.add_item(&mut cart, p("p1"), None, 1, vnd(-1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = engine.add_item(&mut cart, p("p1"), None, 100, vnd(1)).unwrap_err();
        assert!(matches!(err, CommerceError::QuantityExceedsLimit(100, 99)));

        let err = engine
            .add_item(&mut cart, p("p1"), None, 1, Money::new(1, Currency::USD))
            .unwrap_err();
        assert!(matches!(err, CommerceError::CurrencyMismatch { .. }));

        assert!(cart.is_empty());
    }

    #[test]
    fn test_add_past_limit_leaves_cart_unchanged() {
        let (engine, mut cart) = setup();
        engine.add_item(&mut cart, p("p1"), None, 60, vnd(10)).unwrap();
        let before = cart.clone();

        let err = engine.add_item(&mut cart, p("p1"), None, 40, vnd(10)).unwrap_err();
        assert!(matches!(err, CommerceError::QuantityExceedsLimit(100, 99)));
        assert_eq!(cart, before);
    }

    #[test]
    fn test_update_to_zero_equals_remove() {
        let (engine, mut a) = setup();
        engine.add_item(&mut a, p("p1"), None, 2, vnd(10_000)).unwrap();
        engine.add_item(&mut a, p("p2"), None, 1, vnd(5_000)).unwrap();
        let mut b = a.clone();

        engine.update_item_quantity(&mut a, &p("p1"), None, 0).unwrap();
        engine.remove_item(&mut b, &p("p1"), None).unwrap();

        assert_eq!(a.items(), b.items());
        assert_eq!(a.totals(), b.totals());
    }

    #[test]
    fn test_update_missing_item() {
        let (engine, mut cart) = setup();
        let err = engine
            .update_item_quantity(&mut cart, &p("ghost"), None, 2)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_update_quantity_limit() {
        let (engine, mut cart) = setup();
        engine.add_item(&mut cart, p("p1"), None, 1, vnd(10)).unwrap();
        assert!(engine.update_item_quantity(&mut cart, &p("p1"), None, 99).is_ok());
        assert!(engine.update_item_quantity(&mut cart, &p("p1"), None, 100).is_err());
        assert_eq!(cart.items()[0].quantity, 99);
    }

    #[test]
    fn test_remove_missing_item_is_noop() {
        let (engine, mut cart) = setup();
        engine.add_item(&mut cart, p("p1"), None, 1, vnd(10)).unwrap();
        engine.remove_item(&mut cart, &p("ghost"), None).unwrap();
        assert_eq!(cart.items().len(), 1);
    }

    #[test]
    fn test_invariants_hold_over_operation_sequence() {
        let (engine, mut cart) = setup();
        let steps: Vec<Box<dyn Fn(&CartEngine, &mut Cart)>> = vec![
            Box::new(|e, c| {
                e.add_item(c, p("a"), None, 3, vnd(120_000)).unwrap();
            }),
            Box::new(|e, c| {
                e.add_item(c, p("b"), Some(VariantId::new("x")), 2, vnd(455_555)).unwrap();
            }),
            Box::new(|e, c| {
                e.update_item_quantity(c, &p("a"), None, 7).unwrap();
            }),
            Box::new(|e, c| {
                e.apply_discount(
                    c,
                    DiscountAttachment::new("SAVE5", DiscountKind::Percentage, 5, None).unwrap(),
                )
                .unwrap();
            }),
            Box::new(|e, c| {
                e.use_loyalty_points(c, 40).unwrap();
            }),
            Box::new(|e, c| {
                e.remove_item(c, &p("b"), Some(&VariantId::new("x"))).unwrap();
            }),
            Box::new(|e, c| {
                e.update_item_quantity(c, &p("a"), None, 0).unwrap();
            }),
        ];

        for step in steps {
            step(&engine, &mut cart);
            assert_subtotal_identity(&cart);
            assert_total_formula(&cart);
            assert!(cart.totals().total.amount >= 0);
            assert!(cart.totals().loyalty_discount.amount <= cart.totals().subtotal.amount);
        }
    }

    #[test]
    fn test_capped_discount_preview() {
        let (engine, mut cart) = setup();
        engine.add_item(&mut cart, p("p1"), None, 2, vnd(500_000)).unwrap();
        let before = cart.totals().total;

        let preview = engine
            .apply_discount(
                &mut cart,
                DiscountAttachment::new("TENPC", DiscountKind::Percentage, 10, Some(vnd(50_000)))
                    .unwrap(),
            )
            .unwrap();

        assert_eq!(preview.amount, 50_000);
        assert_eq!(before.amount - cart.totals().total.amount, 50_000);
        assert_eq!(cart.summary().discount_code.as_deref(), Some("TENPC"));
    }

    #[test]
    fn test_apply_discount_replaces_previous() {
        let (engine, mut cart) = setup();
        engine.add_item(&mut cart, p("p1"), None, 1, vnd(200_000)).unwrap();
        engine
            .apply_discount(&mut cart, DiscountAttachment::new("FIRST", DiscountKind::Fixed, 10_000, None).unwrap())
            .unwrap();
        engine
            .apply_discount(&mut cart, DiscountAttachment::new("SECND", DiscountKind::Percentage, 50, None).unwrap())
            .unwrap();

        assert_eq!(cart.discount().unwrap().code, "SECND");
        assert_eq!(cart.totals().discount.amount, 100_000);

        engine.remove_discount(&mut cart).unwrap();
        assert!(cart.discount().is_none());
        assert_eq!(cart.totals().discount.amount, 0);
    }

    #[test]
    fn test_fixed_discount_capped_by_subtotal() {
        let (engine, mut cart) = setup();
        engine.add_item(&mut cart, p("p1"), None, 1, vnd(40_000)).unwrap();
        let preview = engine
            .apply_discount(&mut cart, DiscountAttachment::new("BIG50", DiscountKind::Fixed, 50_000, None).unwrap())
            .unwrap();
        assert_eq!(preview.amount, 40_000);
    }

    #[test]
    fn test_loyalty_points_scenario() {
        let (engine, mut cart) = setup();
        engine.add_item(&mut cart, p("p1"), None, 1, vnd(80_000)).unwrap();
        let totals = engine.use_loyalty_points(&mut cart, 100).unwrap();

        assert_eq!(totals.loyalty_discount.amount, 80_000);
        assert_eq!(cart.loyalty_points_used(), 100);

        let totals = engine.remove_loyalty_points(&mut cart).unwrap();
        assert_eq!(totals.loyalty_discount.amount, 0);
        assert_eq!(cart.loyalty_points_used(), 0);
    }

    #[test]
    fn test_negative_loyalty_points_rejected() {
        let (engine, mut cart) = setup();
        let err = engine.use_loyalty_points(&mut cart, -1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_clear_resets_everything() {
        let (engine, mut cart) = setup();
        engine.add_item(&mut cart, p("p1"), None, 1, vnd(80_000)).unwrap();
        engine
            .apply_discount(&mut cart, DiscountAttachment::new("SAVE5", DiscountKind::Percentage, 5, None).unwrap())
            .unwrap();
        engine.use_loyalty_points(&mut cart, 3).unwrap();

        let totals = engine.clear(&mut cart).unwrap();
        assert!(cart.is_empty());
        assert!(cart.discount().is_none());
        assert_eq!(cart.loyalty_points_used(), 0);
        assert_eq!(totals, CartTotals::zero(Currency::VND));
    }

    #[test]
    fn test_merge_into_empty_target_carries_attachments() {
        let engine = CartEngine::default();
        let mut guest = engine.new_cart(CartIdentity::Guest(SessionId::new("s1")));
        let mut user = engine.new_cart(CartIdentity::Registered(UserId::new("u1")));

        engine.add_item(&mut guest, p("p1"), None, 2, vnd(50_000)).unwrap();
        engine
            .apply_discount(&mut guest, DiscountAttachment::new("SAVE5", DiscountKind::Percentage, 5, None).unwrap())
            .unwrap();
        engine.use_loyalty_points(&mut guest, 2).unwrap();

        engine.merge_into(&mut guest, &mut user).unwrap();

        assert!(!guest.is_active());
        assert_eq!(user.items().len(), 1);
        assert_eq!(user.discount().unwrap().code, "SAVE5");
        assert_eq!(user.loyalty_points_used(), 2);
        assert_eq!(user.totals().discount.amount, 5_000);
    }

    #[test]
    fn test_merge_into_non_empty_target_keeps_target_attachments() {
        let engine = CartEngine::default();
        let mut guest = engine.new_cart(CartIdentity::Guest(SessionId::new("s1")));
        let mut user = engine.new_cart(CartIdentity::Registered(UserId::new("u1")));

        engine.add_item(&mut guest, p("p1"), None, 60, vnd(1_100)).unwrap();
        engine.add_item(&mut guest, p("p2"), None, 1, vnd(500)).unwrap();
        engine
            .apply_discount(&mut guest, DiscountAttachment::new("GUEST", DiscountKind::Fixed, 100, None).unwrap())
            .unwrap();
        engine.add_item(&mut user, p("p1"), None, 50, vnd(1_000)).unwrap();

        engine.merge_into(&mut guest, &mut user).unwrap();

        let merged = user.find_item(&p("p1"), None).unwrap();
        assert_eq!(merged.quantity, 99);
        assert_eq!(merged.unit_price.amount, 1_100);
        assert_eq!(user.quantity_of(&p("p2"), None), 1);
        assert!(user.discount().is_none());
        assert_subtotal_identity(&user);
    }

    #[test]
    fn test_inactive_cart_rejects_mutation() {
        let engine = CartEngine::default();
        let mut guest = engine.new_cart(CartIdentity::Guest(SessionId::new("s1")));
        let mut user = engine.new_cart(CartIdentity::Registered(UserId::new("u1")));
        engine.merge_into(&mut guest, &mut user).unwrap();

        let err = engine.add_item(&mut guest, p("p1"), None, 1, vnd(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::State);
        assert!(engine.clear(&mut guest).is_err());
        assert!(engine.merge_into(&mut guest, &mut user).is_err());
    }

    #[test]
    fn test_mutation_refreshes_expiry() {
        let (engine, mut cart) = setup();
        let original = cart.expires_at;
        engine.add_item(&mut cart, p("p1"), None, 1, vnd(1)).unwrap();
        assert!(cart.expires_at >= original);
        assert_eq!(cart.expires_at, cart.updated_at + Duration::days(30));
    }
}
