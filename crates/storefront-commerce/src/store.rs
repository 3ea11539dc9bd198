//! Cart and order documents in the cache.

use crate::cart::Cart;
use crate::error::CommerceError;
use crate::identity::CartIdentity;
use crate::order::Order;
use storefront_cache::{cache_key, Cache, CacheError};

/// One cart document per identity under `cart:<user|guest>:<id>`.
#[derive(Debug, Clone)]
pub struct CartStore {
    cache: Cache,
}

impl CartStore {
    pub fn new(cache: Cache) -> Self {
        Self { cache }
    }

    fn key(identity: &CartIdentity) -> String {
        cache_key!("cart", identity.storage_key())
    }

    /// The stored cart for `identity`, active or not.
    pub fn load(&self, identity: &CartIdentity) -> Result<Option<Cart>, CommerceError> {
        Ok(self.cache.get(&Self::key(identity))?)
    }

    pub fn save(&self, cart: &Cart) -> Result<(), CommerceError> {
        self.cache.set(&Self::key(&cart.identity), cart)?;
        Ok(())
    }
}

/// Orders keyed by order number under `order:<number>`.
#[derive(Debug, Clone)]
pub struct OrderStore {
    cache: Cache,
}

impl OrderStore {
    pub fn new(cache: Cache) -> Self {
        Self { cache }
    }

    fn key(order_number: &str) -> String {
        cache_key!("order", order_number)
    }

    /// Store a new order. Order numbers are unique.
    pub fn insert(&self, order: &Order) -> Result<(), CommerceError> {
        match self.cache.set_if_version(&Self::key(&order.order_number), 0, order) {
            Ok(_) => Ok(()),
            Err(CacheError::ConcurrentModification(_)) => Err(CommerceError::StorageError(format!(
                "order number already used: {}",
                order.order_number
            ))),
            Err(e) => Err(e.into()),
        }
    }

    pub fn get(&self, order_number: &str) -> Result<Option<Order>, CommerceError> {
        Ok(self.cache.get(&Self::key(order_number))?)
    }

    /// Overwrite an existing order.
    pub fn save(&self, order: &Order) -> Result<(), CommerceError> {
        self.cache.set(&Self::key(&order.order_number), order)?;
        Ok(())
    }
}
