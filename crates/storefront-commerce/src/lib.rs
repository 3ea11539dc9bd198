//! Cart pricing, discount codes and order lifecycle for Storefront.
//!
//! - **Cart**: line items, a pure totals computation and the engine that
//!   applies every mutation
//! - **Discount**: code definitions, eligibility and atomic redemption
//! - **Order**: immutable snapshots with a status history
//! - **Service**: [`Storefront`] wires the above to the catalog, the
//!   document cache and a notifier
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use storefront_cache::Cache;
//! use storefront_commerce::prelude::*;
//!
//! let catalog = InMemoryCatalog::new().with_product(ProductRecord::new(
//!     "ao-dai",
//!     "Ao dai",
//!     Money::new(500_000, Currency::VND),
//!     10,
//! ));
//! let storefront = Storefront::new(PricingPolicy::default(), Cache::in_memory(), Arc::new(catalog));
//!
//! let me = CartIdentity::Registered(UserId::new("u1"));
//! let cart = storefront.add_item(&me, &ProductId::new("ao-dai"), None, 2).unwrap();
//!
//! assert_eq!(cart.totals().subtotal.amount, 1_000_000);
//! assert_eq!(cart.totals().shipping.amount, 0);
//! assert_eq!(cart.totals().total.display(), "1,100,000\u{20ab}");
//! ```

pub mod cart;
pub mod catalog;
pub mod config;
pub mod discount;
pub mod error;
pub mod identity;
pub mod ids;
pub mod loyalty;
pub mod money;
pub mod notify;
pub mod order;
pub mod service;
pub mod store;

pub use config::PricingPolicy;
pub use error::{CommerceError, ErrorKind};
pub use ids::*;
pub use money::{Currency, Money};
pub use service::{CheckoutRequest, Storefront};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::PricingPolicy;
    pub use crate::error::{CommerceError, ErrorKind};
    pub use crate::identity::{CartIdentity, GuestContact, OrderCustomer};
    pub use crate::ids::*;
    pub use crate::money::{Currency, Money};

    // Catalog
    pub use crate::catalog::{CatalogStore, InMemoryCatalog, ProductRecord, VariantRecord};

    // Cart
    pub use crate::cart::{compute_totals, Cart, CartEngine, CartLineItem, CartSummary, CartTotals};

    // Discount
    pub use crate::discount::{
        CacheDiscountRegistry, DiscountAttachment, DiscountCode, DiscountKind, DiscountRegistry,
        Eligibility,
    };

    // Order
    pub use crate::order::{
        Address, Order, OrderDraft, OrderLineItem, OrderStatus, PaymentMethod, PaymentStatus,
        StatusHistoryEntry,
    };

    // Collaborators and service
    pub use crate::loyalty::LoyaltyLedger;
    pub use crate::notify::{CommerceEvent, LogNotifier, NoopNotifier, Notifier, RecordingNotifier};
    pub use crate::service::{CheckoutRequest, Storefront};
}
