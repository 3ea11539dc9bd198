//! Storefront service.
//!
//! Each operation loads the cart or order document, applies an engine or
//! lifecycle step, persists the result and then publishes an event.

use crate::cart::{Cart, CartEngine};
use crate::catalog::CatalogStore;
use crate::config::PricingPolicy;
use crate::discount::{CacheDiscountRegistry, DiscountAttachment, DiscountRegistry};
use crate::error::CommerceError;
use crate::identity::{CartIdentity, GuestContact, OrderCustomer};
use crate::ids::{CategoryId, ProductId, SessionId, UserId, VariantId};
use crate::loyalty::LoyaltyLedger;
use crate::money::Money;
use crate::notify::{dispatch, CommerceEvent, NoopNotifier, Notifier};
use crate::order::{Address, Order, OrderDraft, OrderStatus, PaymentMethod, PaymentStatus};
use crate::store::{CartStore, OrderStore};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storefront_cache::Cache;

/// Details collected on the checkout page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub shipping_address: Address,
    /// Defaults to the shipping address.
    #[serde(default)]
    pub billing_address: Option<Address>,
    pub payment_method: PaymentMethod,
    /// Required for guest checkouts, ignored otherwise.
    #[serde(default)]
    pub guest_contact: Option<GuestContact>,
}

/// Price, stock and display names resolved from the catalog.
struct Listing {
    price: Money,
    stock: i64,
    product_name: String,
    variant_name: Option<String>,
}

/// Cart, checkout and order operations over the configured collaborators.
pub struct Storefront {
    engine: CartEngine,
    catalog: Arc<dyn CatalogStore>,
    discounts: Arc<dyn DiscountRegistry>,
    notifier: Arc<dyn Notifier>,
    carts: CartStore,
    orders: OrderStore,
    loyalty: LoyaltyLedger,
}

impl Storefront {
    /// Create a storefront whose carts, orders, discount codes and loyalty
    /// balances all live in `cache`.
    pub fn new(policy: PricingPolicy, cache: Cache, catalog: Arc<dyn CatalogStore>) -> Self {
        Self {
            engine: CartEngine::new(policy),
            catalog,
            discounts: Arc::new(CacheDiscountRegistry::new(cache.clone())),
            notifier: Arc::new(NoopNotifier),
            carts: CartStore::new(cache.clone()),
            orders: OrderStore::new(cache.clone()),
            loyalty: LoyaltyLedger::new(cache),
        }
    }

    /// Replace the notifier.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Replace the discount registry.
    pub fn with_discounts(mut self, discounts: Arc<dyn DiscountRegistry>) -> Self {
        self.discounts = discounts;
        self
    }

    pub fn policy(&self) -> &PricingPolicy {
        self.engine.policy()
    }

    pub fn discounts(&self) -> &dyn DiscountRegistry {
        self.discounts.as_ref()
    }

    pub fn loyalty(&self) -> &LoyaltyLedger {
        &self.loyalty
    }

    // ----- cart -----

    /// The active cart for `identity`, created on first access.
    ///
    /// An expired or merged cart is replaced by a fresh one.
    pub fn cart(&self, identity: &CartIdentity) -> Result<Cart, CommerceError> {
        let now = Utc::now();
        if let Some(cart) = self.carts.load(identity)? {
            if cart.is_usable_at(now) {
                return Ok(cart);
            }
            tracing::debug!(cart_id = %cart.id, %identity, "stored cart expired or inactive, starting a new one");
        }

        let cart = self.engine.new_cart_at(identity.clone(), now);
        self.carts.save(&cart)?;
        Ok(cart)
    }

    /// Add a product (or variant) at its current catalog price.
    pub fn add_item(
        &self,
        identity: &CartIdentity,
        product_id: &ProductId,
        variant_id: Option<&VariantId>,
        quantity: i64,
    ) -> Result<Cart, CommerceError> {
        if quantity < 1 {
            return Err(CommerceError::InvalidQuantity(quantity));
        }
        let listing = self.listing(product_id, variant_id)?;
        let mut cart = self.cart(identity)?;

        let requested = cart
            .quantity_of(product_id, variant_id)
            .saturating_add(quantity);
        check_stock(product_id, requested, listing.stock)?;

        self.engine.add_item(
            &mut cart,
            product_id.clone(),
            variant_id.cloned(),
            quantity,
            listing.price,
        )?;
        self.save_cart(&cart)?;
        Ok(cart)
    }

    /// Set a line's quantity. Zero or less removes the line.
    pub fn update_item_quantity(
        &self,
        identity: &CartIdentity,
        product_id: &ProductId,
        variant_id: Option<&VariantId>,
        quantity: i64,
    ) -> Result<Cart, CommerceError> {
        let mut cart = self.cart(identity)?;
        if quantity > 0 && cart.find_item(product_id, variant_id).is_some() {
            let listing = self.listing(product_id, variant_id)?;
            check_stock(product_id, quantity, listing.stock)?;
        }

        self.engine
            .update_item_quantity(&mut cart, product_id, variant_id, quantity)?;
        self.save_cart(&cart)?;
        Ok(cart)
    }

    pub fn remove_item(
        &self,
        identity: &CartIdentity,
        product_id: &ProductId,
        variant_id: Option<&VariantId>,
    ) -> Result<Cart, CommerceError> {
        let mut cart = self.cart(identity)?;
        self.engine.remove_item(&mut cart, product_id, variant_id)?;
        self.save_cart(&cart)?;
        Ok(cart)
    }

    pub fn clear_cart(&self, identity: &CartIdentity) -> Result<Cart, CommerceError> {
        let mut cart = self.cart(identity)?;
        self.engine.clear(&mut cart)?;
        self.save_cart(&cart)?;
        Ok(cart)
    }

    /// Look up `code`, check it against this cart and attach it.
    ///
    /// Returns the discount amount the cart now carries. Nothing is
    /// redeemed until checkout.
    pub fn apply_discount(&self, identity: &CartIdentity, code: &str) -> Result<Money, CommerceError> {
        let mut cart = self.cart(identity)?;
        let attachment = self.eligible_attachment(&cart, code)?;

        let preview = self.engine.apply_discount(&mut cart, attachment)?;
        self.save_cart(&cart)?;
        Ok(preview)
    }

    pub fn remove_discount(&self, identity: &CartIdentity) -> Result<Cart, CommerceError> {
        let mut cart = self.cart(identity)?;
        self.engine.remove_discount(&mut cart)?;
        self.save_cart(&cart)?;
        Ok(cart)
    }

    /// Redeem loyalty points against the cart. Registered users only.
    pub fn use_loyalty_points(&self, identity: &CartIdentity, points: i64) -> Result<Cart, CommerceError> {
        let user = registered_user(identity)?;
        let available = self.loyalty.balance(user)?;
        if points > available {
            return Err(CommerceError::InsufficientLoyaltyPoints {
                requested: points,
                available,
            });
        }

        let mut cart = self.cart(identity)?;
        self.engine.use_loyalty_points(&mut cart, points)?;
        self.save_cart(&cart)?;
        Ok(cart)
    }

    pub fn remove_loyalty_points(&self, identity: &CartIdentity) -> Result<Cart, CommerceError> {
        let mut cart = self.cart(identity)?;
        self.engine.remove_loyalty_points(&mut cart)?;
        self.save_cart(&cart)?;
        Ok(cart)
    }

    /// Fold a guest session's cart into the user's cart after login.
    pub fn merge_guest_cart(&self, session: &SessionId, user: &UserId) -> Result<Cart, CommerceError> {
        let guest_identity = CartIdentity::Guest(session.clone());
        let user_identity = CartIdentity::Registered(user.clone());
        let mut target = self.cart(&user_identity)?;

        let mut guest = match self.carts.load(&guest_identity)? {
            Some(cart) if cart.is_usable_at(Utc::now()) => cart,
            _ => return Ok(target),
        };

        self.engine.merge_into(&mut guest, &mut target)?;
        self.carts.save(&guest)?;
        self.save_cart(&target)?;
        Ok(target)
    }

    // ----- checkout -----

    /// Turn the identity's cart into an order.
    ///
    /// Stock, discount and loyalty balance are re-checked first. Points are
    /// debited before the code is redeemed and the order stored; if either
    /// step fails both are given back. Earned points are credited once the
    /// order is stored, then the cart is emptied.
    pub fn checkout(&self, identity: &CartIdentity, request: CheckoutRequest) -> Result<Order, CommerceError> {
        let mut cart = self.cart(identity)?;
        if cart.is_empty() {
            return Err(CommerceError::EmptyCart);
        }

        let mut listings = Vec::with_capacity(cart.items().len());
        for item in cart.items() {
            let listing = self.listing(&item.product_id, item.variant_id.as_ref())?;
            check_stock(&item.product_id, item.quantity, listing.stock)?;
            listings.push(listing);
        }

        let customer = match identity {
            CartIdentity::Registered(user_id) => OrderCustomer::Registered {
                user_id: user_id.clone(),
            },
            CartIdentity::Guest(_) => OrderCustomer::Guest {
                contact: request.guest_contact.clone().ok_or_else(|| {
                    CommerceError::ValidationError(
                        "guest checkout requires contact details".to_string(),
                    )
                })?,
            },
        };

        let points_used = cart.loyalty_points_used();
        if points_used > 0 {
            let user = registered_user(identity)?;
            let available = self.loyalty.balance(user)?;
            if points_used > available {
                return Err(CommerceError::InsufficientLoyaltyPoints {
                    requested: points_used,
                    available,
                });
            }
        }

        if let Some(code) = cart.discount().map(|d| d.code.clone()) {
            self.eligible_attachment(&cart, &code)?;
        }

        let mut names = listings
            .iter()
            .map(|l| (l.product_name.clone(), l.variant_name.clone()));
        let draft = OrderDraft::from_cart(&cart, |_| names.next().unwrap_or_default())?;

        let order = Order::finalize(
            draft,
            request.shipping_address,
            request.billing_address,
            request.payment_method,
            customer,
            self.engine.policy(),
        )?;

        // The debit is conditional on the balance, so it goes first. Anything
        // failing after it is compensated before the error is returned.
        let user = order.customer.user_id();
        if let Some(user) = user {
            if order.loyalty_points_used > 0 {
                self.loyalty.debit(user, order.loyalty_points_used)?;
            }
        }

        if let Err(e) = self.redeem_and_store(identity, &order) {
            self.compensate(&order);
            return Err(e);
        }

        if let Some(user) = user {
            if order.loyalty_points_earned > 0 {
                if let Err(e) = self.loyalty.credit(user, order.loyalty_points_earned) {
                    tracing::warn!(
                        order_number = %order.order_number,
                        user_id = %user,
                        points = order.loyalty_points_earned,
                        error = %e,
                        "earned loyalty points not credited"
                    );
                }
            }
        }

        self.engine.clear(&mut cart)?;
        self.save_cart(&cart)?;

        tracing::info!(
            order_number = %order.order_number,
            %identity,
            total = order.total.amount,
            points_earned = order.loyalty_points_earned,
            "checkout completed"
        );
        self.publish(CommerceEvent::OrderCreated {
            order: Box::new(order.clone()),
        });
        Ok(order)
    }

    // ----- orders -----

    pub fn order(&self, order_number: &str) -> Result<Order, CommerceError> {
        self.orders
            .get(order_number)?
            .ok_or_else(|| CommerceError::OrderNotFound(order_number.to_string()))
    }

    /// Move an order to `status`. Publishes only when the status changed.
    pub fn transition_order(
        &self,
        order_number: &str,
        status: OrderStatus,
        note: Option<String>,
        actor: Option<String>,
    ) -> Result<Order, CommerceError> {
        let mut order = self.order(order_number)?;
        if order.transition_status(status, note, actor) {
            self.orders.save(&order)?;
            self.publish_status_change(&order);
        }
        Ok(order)
    }

    /// Cancel an order that is still pending or confirmed.
    pub fn cancel_order(
        &self,
        order_number: &str,
        note: Option<String>,
        actor: Option<String>,
    ) -> Result<Order, CommerceError> {
        let order = self.order(order_number)?;
        if !order.can_be_cancelled() {
            let status = order.status().as_str();
            return Err(CommerceError::OrderStateConflict {
                order_number: order.order_number,
                action: "cancelled",
                status,
            });
        }
        self.transition_order(order_number, OrderStatus::Cancelled, note, actor)
    }

    /// Mark a delivered order as returned, within the return window.
    pub fn request_return(
        &self,
        order_number: &str,
        note: Option<String>,
        actor: Option<String>,
    ) -> Result<Order, CommerceError> {
        let order = self.order(order_number)?;
        if !order.can_be_returned(self.engine.policy().return_window_days) {
            let status = order.status().as_str();
            return Err(CommerceError::OrderStateConflict {
                order_number: order.order_number,
                action: "returned",
                status,
            });
        }
        self.transition_order(order_number, OrderStatus::Returned, note, actor)
    }

    /// Record carrier tracking details.
    pub fn set_tracking(
        &self,
        order_number: &str,
        tracking_number: &str,
        carrier: &str,
    ) -> Result<Order, CommerceError> {
        let mut order = self.order(order_number)?;
        order.set_tracking(tracking_number, carrier);
        self.orders.save(&order)?;
        Ok(order)
    }

    pub fn set_payment_status(&self, order_number: &str, status: PaymentStatus) -> Result<Order, CommerceError> {
        let mut order = self.order(order_number)?;
        order.set_payment_status(status);
        self.orders.save(&order)?;
        Ok(order)
    }

    // ----- helpers -----

    fn listing(&self, product_id: &ProductId, variant_id: Option<&VariantId>) -> Result<Listing, CommerceError> {
        let product = self
            .catalog
            .product(product_id)
            .filter(|p| p.active)
            .ok_or_else(|| CommerceError::ProductNotFound(product_id.to_string()))?;

        match variant_id {
            Some(variant_id) => {
                let variant = self
                    .catalog
                    .variant(product_id, variant_id)
                    .filter(|v| v.active)
                    .ok_or_else(|| CommerceError::VariantNotFound(variant_id.to_string()))?;
                Ok(Listing {
                    price: variant.price,
                    stock: variant.stock,
                    product_name: product.name,
                    variant_name: Some(variant.name),
                })
            }
            None => Ok(Listing {
                price: product.base_price,
                stock: product.total_stock,
                product_name: product.name,
                variant_name: None,
            }),
        }
    }

    /// Registry lookup plus every eligibility rule, against `cart`.
    fn eligible_attachment(&self, cart: &Cart, code: &str) -> Result<DiscountAttachment, CommerceError> {
        let discount = self
            .discounts
            .find_by_code(code)?
            .ok_or_else(|| CommerceError::DiscountNotFound(code.trim().to_ascii_uppercase()))?;

        discount
            .can_be_used_by(&cart.identity, &cart.totals().subtotal)
            .into_result()?;

        let categorized: Vec<(ProductId, Option<CategoryId>)> = cart
            .items()
            .iter()
            .map(|item| {
                let category = self
                    .catalog
                    .product(&item.product_id)
                    .and_then(|p| p.category_id);
                (item.product_id.clone(), category)
            })
            .collect();
        discount
            .covers_items(categorized.iter().map(|(p, c)| (p, c.as_ref())))
            .into_result()?;

        Ok(DiscountAttachment::from_code(&discount))
    }

    fn redeem_and_store(&self, identity: &CartIdentity, order: &Order) -> Result<(), CommerceError> {
        if let Some(ref code) = order.discount_code {
            self.discounts
                .redeem(code, identity, &order.order_number, order.discount, order.created_at)?;
        }
        self.orders.insert(order)
    }

    /// Give back what a failed checkout took: the discount redemption and
    /// the debited points. Failures here are logged only.
    fn compensate(&self, order: &Order) {
        if let Some(ref code) = order.discount_code {
            if let Err(e) = self.discounts.release(code, &order.order_number) {
                tracing::warn!(order_number = %order.order_number, code = %code, error = %e, "discount redemption not released");
            }
        }
        if let Some(user) = order.customer.user_id() {
            if order.loyalty_points_used > 0 {
                if let Err(e) = self.loyalty.credit(user, order.loyalty_points_used) {
                    tracing::warn!(order_number = %order.order_number, user_id = %user, error = %e, "loyalty points not refunded");
                }
            }
        }
        tracing::debug!(order_number = %order.order_number, "checkout rolled back");
    }

    fn save_cart(&self, cart: &Cart) -> Result<(), CommerceError> {
        self.carts.save(cart)?;
        self.publish(CommerceEvent::CartUpdated {
            identity: cart.identity.clone(),
            totals: *cart.totals(),
        });
        Ok(())
    }

    fn publish_status_change(&self, order: &Order) {
        self.publish(CommerceEvent::OrderStatusChanged {
            customer: order.customer.clone(),
            order: Box::new(order.clone()),
        });
    }

    fn publish(&self, event: CommerceEvent) {
        dispatch(self.notifier.as_ref(), event);
    }
}

fn registered_user(identity: &CartIdentity) -> Result<&UserId, CommerceError> {
    identity.user_id().ok_or_else(|| {
        CommerceError::ValidationError("loyalty points require a registered account".to_string())
    })
}

fn check_stock(product_id: &ProductId, requested: i64, available: i64) -> Result<(), CommerceError> {
    if requested > available {
        return Err(CommerceError::InsufficientInventory {
            product_id: product_id.to_string(),
            requested,
            available,
        });
    }
    Ok(())
}
