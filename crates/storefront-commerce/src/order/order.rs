//! Order types.

use super::number::generate_order_number;
use super::{Address, OrderStatus, PaymentMethod, PaymentStatus, StatusHistoryEntry};
use crate::cart::{Cart, CartLineItem, CartTotals};
use crate::config::PricingPolicy;
use crate::error::CommerceError;
use crate::identity::OrderCustomer;
use crate::ids::{OrderId, ProductId, VariantId};
use crate::money::Money;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Points earned for an order total: `floor(total / divisor)`.
pub fn compute_loyalty_points_earned(total: &Money, divisor: i64) -> i64 {
    if divisor <= 0 || total.amount <= 0 {
        return 0;
    }
    total.amount / divisor
}

/// A line item captured at checkout. Never re-read from the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderLineItem {
    /// Product ID.
    pub product_id: ProductId,
    /// Variant ID.
    pub variant_id: Option<VariantId>,
    /// Product name at time of order.
    pub product_name: String,
    /// Variant name at time of order (e.g., "Large / Blue").
    pub variant_name: Option<String>,
    /// Quantity ordered.
    pub quantity: i64,
    /// Unit price at time of order.
    pub unit_price: Money,
    /// `unit_price * quantity`.
    pub line_total: Money,
}

/// Everything taken from a cart to place an order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDraft {
    pub lines: Vec<OrderLineItem>,
    pub totals: CartTotals,
    pub discount_code: Option<String>,
    pub loyalty_points_used: i64,
}

impl OrderDraft {
    /// Snapshot a cart. `names` supplies the display names for each line.
    pub fn from_cart<F>(cart: &Cart, mut names: F) -> Result<Self, CommerceError>
    where
        F: FnMut(&CartLineItem) -> (String, Option<String>),
    {
        let lines = cart
            .items()
            .iter()
            .map(|item| {
                let (product_name, variant_name) = names(item);
                Ok(OrderLineItem {
                    product_id: item.product_id.clone(),
                    variant_id: item.variant_id.clone(),
                    product_name,
                    variant_name,
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                    line_total: item.line_total().ok_or(CommerceError::Overflow)?,
                })
            })
            .collect::<Result<Vec<_>, CommerceError>>()?;

        Ok(Self {
            lines,
            totals: *cart.totals(),
            discount_code: cart.discount().map(|d| d.code.clone()),
            loyalty_points_used: cart.loyalty_points_used(),
        })
    }
}

/// The current status together with the history entry that set it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusInfo {
    pub status: OrderStatus,
    pub since: DateTime<Utc>,
    pub note: Option<String>,
    pub actor: Option<String>,
}

/// A placed order.
///
/// Line items and prices are fixed at creation. Afterwards only status,
/// payment status and logistics fields change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    /// Unique order identifier.
    pub(crate) id: OrderId,
    /// Human-readable order number.
    pub(crate) order_number: String,
    /// Registered user or guest contact.
    pub(crate) customer: OrderCustomer,
    /// Items in the order.
    pub(crate) items: Vec<OrderLineItem>,
    /// Shipping address.
    pub(crate) shipping_address: Address,
    /// Billing address, when different from shipping.
    pub(crate) billing_address: Option<Address>,
    /// Payment method chosen at checkout.
    pub(crate) payment_method: PaymentMethod,
    /// Payment status.
    pub(crate) payment_status: PaymentStatus,
    pub(crate) status: OrderStatus,
    pub(crate) status_history: Vec<StatusHistoryEntry>,
    pub(crate) subtotal: Money,
    pub(crate) tax: Money,
    pub(crate) shipping: Money,
    pub(crate) discount: Money,
    pub(crate) loyalty_discount: Money,
    pub(crate) total: Money,
    /// Code redeemed for this order.
    pub(crate) discount_code: Option<String>,
    pub(crate) loyalty_points_used: i64,
    pub(crate) loyalty_points_earned: i64,
    pub(crate) tracking_number: Option<String>,
    pub(crate) carrier: Option<String>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
    /// First time the order entered `delivered`.
    pub(crate) delivered_at: Option<DateTime<Utc>>,
    pub(crate) cancelled_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Place an order from a cart snapshot.
    pub fn finalize(
        draft: OrderDraft,
        shipping_address: Address,
        billing_address: Option<Address>,
        payment_method: PaymentMethod,
        customer: OrderCustomer,
        policy: &PricingPolicy,
    ) -> Result<Self, CommerceError> {
        Self::finalize_at(
            draft,
            shipping_address,
            billing_address,
            payment_method,
            customer,
            policy,
            Utc::now(),
        )
    }

    pub fn finalize_at(
        draft: OrderDraft,
        shipping_address: Address,
        billing_address: Option<Address>,
        payment_method: PaymentMethod,
        customer: OrderCustomer,
        policy: &PricingPolicy,
        now: DateTime<Utc>,
    ) -> Result<Self, CommerceError> {
        if draft.lines.is_empty() {
            return Err(CommerceError::EmptyCart);
        }
        shipping_address.validate("shipping")?;
        if let Some(ref billing) = billing_address {
            billing.validate("billing")?;
        }
        customer.validate()?;

        let totals = draft.totals;
        let order = Self {
            id: OrderId::generate(),
            order_number: generate_order_number(now),
            customer,
            items: draft.lines,
            shipping_address,
            billing_address,
            payment_method,
            payment_status: PaymentStatus::Pending,
            status: OrderStatus::Pending,
            status_history: vec![StatusHistoryEntry {
                status: OrderStatus::Pending,
                timestamp: now,
                note: Some("Order placed".to_string()),
                actor: None,
            }],
            subtotal: totals.subtotal,
            tax: totals.tax,
            shipping: totals.shipping,
            discount: totals.discount,
            loyalty_discount: totals.loyalty_discount,
            total: totals.total,
            discount_code: draft.discount_code,
            loyalty_points_used: draft.loyalty_points_used,
            loyalty_points_earned: compute_loyalty_points_earned(
                &totals.total,
                policy.loyalty_earn_divisor,
            ),
            tracking_number: None,
            carrier: None,
            created_at: now,
            updated_at: now,
            delivered_at: None,
            cancelled_at: None,
        };

        tracing::info!(
            order_number = %order.order_number,
            total = order.total.amount,
            items = order.items.len(),
            "order finalized"
        );
        Ok(order)
    }

    pub fn id(&self) -> &OrderId {
        &self.id
    }

    /// Human-readable order number, e.g. `ORD-36000000-K3Z9Q`.
    pub fn order_number(&self) -> &str {
        &self.order_number
    }

    pub fn customer(&self) -> &OrderCustomer {
        &self.customer
    }

    /// Line items as captured at checkout.
    pub fn items(&self) -> &[OrderLineItem] {
        &self.items
    }

    pub fn shipping_address(&self) -> &Address {
        &self.shipping_address
    }

    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    pub fn subtotal(&self) -> Money {
        self.subtotal
    }

    pub fn tax(&self) -> Money {
        self.tax
    }

    pub fn shipping(&self) -> Money {
        self.shipping
    }

    /// Amount taken off by the discount code.
    pub fn discount(&self) -> Money {
        self.discount
    }

    /// Amount paid with loyalty points.
    pub fn loyalty_discount(&self) -> Money {
        self.loyalty_discount
    }

    pub fn total(&self) -> Money {
        self.total
    }

    /// Code redeemed for this order.
    pub fn discount_code(&self) -> Option<&str> {
        self.discount_code.as_deref()
    }

    pub fn loyalty_points_used(&self) -> i64 {
        self.loyalty_points_used
    }

    pub fn loyalty_points_earned(&self) -> i64 {
        self.loyalty_points_earned
    }

    pub fn tracking_number(&self) -> Option<&str> {
        self.tracking_number.as_deref()
    }

    pub fn carrier(&self) -> Option<&str> {
        self.carrier.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// First time the order entered `delivered`.
    pub fn delivered_at(&self) -> Option<DateTime<Utc>> {
        self.delivered_at
    }

    pub fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        self.cancelled_at
    }

    /// Current status.
    pub fn status(&self) -> OrderStatus {
        self.status
    }

    /// Status history, oldest first.
    pub fn status_history(&self) -> &[StatusHistoryEntry] {
        &self.status_history
    }

    /// Billing address, falling back to the shipping address.
    pub fn billing_address(&self) -> &Address {
        self.billing_address.as_ref().unwrap_or(&self.shipping_address)
    }

    /// Get total item count.
    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Move to `status`. Returns `false` and records nothing when the order
    /// is already in that status.
    ///
    /// Any status may follow any other; callers consult
    /// [`can_be_cancelled`](Self::can_be_cancelled) and
    /// [`can_be_returned`](Self::can_be_returned) first when it matters.
    pub fn transition_status(
        &mut self,
        status: OrderStatus,
        note: Option<String>,
        actor: Option<String>,
    ) -> bool {
        self.transition_status_at(status, note, actor, Utc::now())
    }

    pub fn transition_status_at(
        &mut self,
        status: OrderStatus,
        note: Option<String>,
        actor: Option<String>,
        now: DateTime<Utc>,
    ) -> bool {
        if status == self.status {
            return false;
        }

        let previous = self.status;
        self.status = status;
        self.status_history.push(StatusHistoryEntry {
            status,
            timestamp: now,
            note,
            actor,
        });
        match status {
            OrderStatus::Delivered if self.delivered_at.is_none() => self.delivered_at = Some(now),
            OrderStatus::Cancelled => self.cancelled_at = Some(now),
            _ => {}
        }
        self.updated_at = now;

        tracing::info!(
            order_number = %self.order_number,
            from = %previous,
            to = %status,
            "order status changed"
        );
        true
    }

    /// The current status and the history entry that set it.
    pub fn current_status_info(&self) -> StatusInfo {
        match self.status_history.last() {
            Some(entry) => StatusInfo {
                status: self.status,
                since: entry.timestamp,
                note: entry.note.clone(),
                actor: entry.actor.clone(),
            },
            None => StatusInfo {
                status: self.status,
                since: self.created_at,
                note: None,
                actor: None,
            },
        }
    }

    /// Points this order earns under `policy`.
    pub fn compute_loyalty_points_earned(&self, policy: &PricingPolicy) -> i64 {
        compute_loyalty_points_earned(&self.total, policy.loyalty_earn_divisor)
    }

    /// Pending or confirmed.
    pub fn can_be_cancelled(&self) -> bool {
        self.status.allows_cancellation()
    }

    /// Delivered, and still inside the return window.
    pub fn can_be_returned(&self, return_window_days: i64) -> bool {
        self.can_be_returned_at(return_window_days, Utc::now())
    }

    pub fn can_be_returned_at(&self, return_window_days: i64, now: DateTime<Utc>) -> bool {
        if self.status != OrderStatus::Delivered {
            return false;
        }
        match self.delivered_at {
            Some(delivered) => now <= delivered + Duration::days(return_window_days),
            None => false,
        }
    }

    /// Record carrier tracking details.
    pub fn set_tracking(&mut self, tracking_number: impl Into<String>, carrier: impl Into<String>) {
        self.tracking_number = Some(tracking_number.into());
        self.carrier = Some(carrier.into());
        self.updated_at = Utc::now();
    }

    /// Update payment status.
    pub fn set_payment_status(&mut self, status: PaymentStatus) {
        self.payment_status = status;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::CartEngine;
    use crate::identity::{CartIdentity, GuestContact};
    use crate::ids::{SessionId, UserId};
    use crate::money::Currency;

    fn address() -> Address {
        Address::new("Le Hoa", "0912345678", "5 Nguyen Hue", "Ho Chi Minh", "VN")
    }

    fn customer() -> OrderCustomer {
        OrderCustomer::Registered {
            user_id: UserId::new("u1"),
        }
    }

    fn draft(price: i64, quantity: i64) -> OrderDraft {
        let engine = CartEngine::default();
        let mut cart = engine.new_cart(CartIdentity::Registered(UserId::new("u1")));
        engine
            .add_item(
                &mut cart,
                ProductId::new("p1"),
                None,
                quantity,
                Money::new(price, Currency::VND),
            )
            .unwrap();
        OrderDraft::from_cart(&cart, |_| ("Ao dai".to_string(), None)).unwrap()
    }

    fn order() -> Order {
        Order::finalize(
            draft(500_000, 2),
            address(),
            None,
            PaymentMethod::CashOnDelivery,
            customer(),
            &PricingPolicy::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_finalize_captures_snapshot() {
        let order = order();

        assert!(order.order_number().starts_with("ORD-"));
        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.payment_status(), PaymentStatus::Pending);
        assert_eq!(order.status_history().len(), 1);
        assert_eq!(order.items()[0].product_name, "Ao dai");
        assert_eq!(order.items()[0].line_total.amount, 1_000_000);
        assert_eq!(order.total().amount, 1_100_000);
        assert_eq!(order.loyalty_points_earned(), 110);
        assert_eq!(order.billing_address(), order.shipping_address());
    }

    #[test]
    fn test_finalize_empty_cart() {
        let engine = CartEngine::default();
        let cart = engine.new_cart(CartIdentity::Guest(SessionId::new("s1")));
        let draft = OrderDraft::from_cart(&cart, |_| (String::new(), None)).unwrap();

        let err = Order::finalize(
            draft,
            address(),
            None,
            PaymentMethod::Card,
            customer(),
            &PricingPolicy::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CommerceError::EmptyCart));
    }

    #[test]
    fn test_finalize_validates_address_and_guest() {
        let policy = PricingPolicy::default();
        let err = Order::finalize(
            draft(10_000, 1),
            Address::default(),
            None,
            PaymentMethod::Card,
            customer(),
            &policy,
        )
        .unwrap_err();
        assert!(err.to_string().contains("shipping address"));

        let guest = OrderCustomer::Guest {
            contact: GuestContact::new("Mai", "mai-at-example"),
        };
        assert!(Order::finalize(draft(10_000, 1), address(), None, PaymentMethod::Card, guest, &policy).is_err());
    }

    #[test]
    fn test_repeated_transition_is_noop() {
        let mut order = order();

        assert!(order.transition_status(OrderStatus::Shipped, None, Some("warehouse".into())));
        let updated_at = order.updated_at();
        assert!(!order.transition_status(OrderStatus::Shipped, None, None));

        assert_eq!(order.status_history().len(), 2);
        assert_eq!(order.status_history()[0].status, OrderStatus::Pending);
        assert_eq!(order.status_history()[1].status, OrderStatus::Shipped);
        assert_eq!(order.updated_at(), updated_at);
    }

    #[test]
    fn test_status_matches_last_history_entry() {
        let mut order = order();
        for status in [
            OrderStatus::Confirmed,
            OrderStatus::Processing,
            OrderStatus::Pending,
            OrderStatus::Delivered,
        ] {
            order.transition_status(status, Some("step".into()), None);
            let info = order.current_status_info();
            assert_eq!(info.status, status);
            assert_eq!(order.status_history().last().unwrap().status, status);
            assert_eq!(info.note.as_deref(), Some("step"));
        }
    }

    #[test]
    fn test_can_be_cancelled() {
        let mut order = order();
        assert!(order.can_be_cancelled());
        order.transition_status(OrderStatus::Confirmed, None, None);
        assert!(order.can_be_cancelled());
        order.transition_status(OrderStatus::Processing, None, None);
        assert!(!order.can_be_cancelled());
    }

    #[test]
    fn test_cancel_stamps_time() {
        let mut order = order();
        order.transition_status(OrderStatus::Cancelled, Some("customer request".into()), None);
        assert!(order.cancelled_at().is_some());
    }

    #[test]
    fn test_return_window() {
        let mut order = order();
        let delivered = Utc::now();
        assert!(!order.can_be_returned_at(7, delivered));

        order.transition_status_at(OrderStatus::Delivered, None, None, delivered);
        assert_eq!(order.delivered_at(), Some(delivered));
        assert!(order.can_be_returned_at(7, delivered + Duration::days(7)));
        assert!(!order.can_be_returned_at(7, delivered + Duration::days(7) + Duration::seconds(1)));

        order.transition_status_at(OrderStatus::Returned, None, None, delivered + Duration::days(1));
        assert!(!order.can_be_returned_at(7, delivered + Duration::days(1)));
    }

    #[test]
    fn test_delivered_at_kept_on_redelivery() {
        let mut order = order();
        let first = Utc::now();
        order.transition_status_at(OrderStatus::Delivered, None, None, first);
        order.transition_status_at(OrderStatus::Shipped, None, None, first + Duration::hours(1));
        order.transition_status_at(OrderStatus::Delivered, None, None, first + Duration::hours(2));
        assert_eq!(order.delivered_at(), Some(first));
    }

    #[test]
    fn test_logistics_do_not_touch_prices() {
        let mut order = order();
        let items = order.items().to_vec();
        let total = order.total();

        order.set_tracking("VN123456", "GHN");
        order.set_payment_status(PaymentStatus::Paid);

        assert_eq!(order.tracking_number(), Some("VN123456"));
        assert_eq!(order.carrier(), Some("GHN"));
        assert_eq!(order.payment_status(), PaymentStatus::Paid);
        assert_eq!(order.items(), items.as_slice());
        assert_eq!(order.total(), total);
        assert!(order.updated_at() >= order.created_at());
    }

    #[test]
    fn test_loaded_order_exposes_snapshot() {
        let placed = order();
        let json = serde_json::to_string(&placed).unwrap();
        let loaded: Order = serde_json::from_str(&json).unwrap();

        assert_eq!(loaded.id(), placed.id());
        assert_eq!(loaded.order_number(), placed.order_number());
        assert_eq!(loaded.customer().user_id(), Some(&UserId::new("u1")));
        assert_eq!(loaded.payment_method(), PaymentMethod::CashOnDelivery);
        assert_eq!(loaded.subtotal().amount, 1_000_000);
        assert_eq!(loaded.tax().amount, 100_000);
        assert_eq!(loaded.discount().amount, 0);
        assert_eq!(loaded.loyalty_discount().amount, 0);
        assert_eq!(loaded.total(), placed.total());
        assert_eq!(loaded.discount_code(), None);
        assert_eq!(loaded.loyalty_points_used(), 0);
        assert_eq!(loaded.delivered_at(), None);
        assert_eq!(loaded.cancelled_at(), None);
        assert_eq!(loaded, placed);
    }

    #[test]
    fn test_loyalty_points_floor() {
        let total = Money::new(19_999, Currency::VND);
        assert_eq!(compute_loyalty_points_earned(&total, 10_000), 1);
        assert_eq!(compute_loyalty_points_earned(&Money::zero(Currency::VND), 10_000), 0);
    }
}
