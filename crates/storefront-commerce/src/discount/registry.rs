//! Discount code storage and atomic redemption.

use super::code::{normalize_code, DiscountCode};
use crate::error::CommerceError;
use crate::identity::CartIdentity;
use crate::money::Money;
use chrono::{DateTime, Utc};
use storefront_cache::{cache_key, Cache, CacheError};

/// Source of discount definitions.
pub trait DiscountRegistry: Send + Sync {
    /// Look up a code. Input is normalized before the lookup.
    fn find_by_code(&self, code: &str) -> Result<Option<DiscountCode>, CommerceError>;

    /// Store a new definition. Fails if the code is already taken.
    fn create(&self, discount: DiscountCode) -> Result<DiscountCode, CommerceError>;

    /// Record one redemption.
    ///
    /// The usable check and the increment happen as one atomic step, so
    /// concurrent checkouts can never push `used_count` past `max_uses`.
    fn redeem(
        &self,
        code: &str,
        identity: &CartIdentity,
        order_number: &str,
        amount: Money,
        at: DateTime<Utc>,
    ) -> Result<DiscountCode, CommerceError>;

    /// Undo the redemption made for `order_number`, if any.
    ///
    /// Used when a checkout fails after redeeming. Releasing an order that
    /// holds no redemption changes nothing.
    fn release(&self, code: &str, order_number: &str) -> Result<(), CommerceError>;
}

/// [`DiscountRegistry`] backed by the versioned document cache.
#[derive(Debug, Clone)]
pub struct CacheDiscountRegistry {
    cache: Cache,
}

impl CacheDiscountRegistry {
    pub fn new(cache: Cache) -> Self {
        Self { cache }
    }

    fn key(code: &str) -> String {
        cache_key!("discount", code)
    }
}

impl DiscountRegistry for CacheDiscountRegistry {
    fn find_by_code(&self, code: &str) -> Result<Option<DiscountCode>, CommerceError> {
        let code = match normalize_code(code) {
            Ok(code) => code,
            Err(_) => return Ok(None),
        };
        Ok(self.cache.get(&Self::key(&code))?)
    }

    fn create(&self, discount: DiscountCode) -> Result<DiscountCode, CommerceError> {
        discount.validate()?;
        let key = Self::key(&discount.code);

        match self.cache.set_if_version(&key, 0, &discount) {
            Ok(_) => {
                tracing::debug!(code = %discount.code, "discount code created");
                Ok(discount)
            }
            Err(CacheError::ConcurrentModification(_)) => {
                Err(CommerceError::DiscountCodeExists(discount.code))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn redeem(
        &self,
        code: &str,
        identity: &CartIdentity,
        order_number: &str,
        amount: Money,
        at: DateTime<Utc>,
    ) -> Result<DiscountCode, CommerceError> {
        let code = normalize_code(code)?;
        let key = Self::key(&code);

        let updated = self
            .cache
            .update(&key, |current: Option<DiscountCode>| -> Result<DiscountCode, CommerceError> {
                let mut discount =
                    current.ok_or_else(|| CommerceError::DiscountNotFound(code.clone()))?;
                if !discount.active {
                    return Err(CommerceError::DiscountIneligible(
                        "Discount code is not active".to_string(),
                    ));
                }
                discount.use_code(identity, order_number, amount, at)?;
                Ok(discount)
            })?;

        tracing::info!(
            code = %updated.code,
            order_number,
            used = updated.used_count,
            max = updated.max_uses,
            "discount code redeemed"
        );
        Ok(updated)
    }

    fn release(&self, code: &str, order_number: &str) -> Result<(), CommerceError> {
        let code = normalize_code(code)?;
        let key = Self::key(&code);
        if !self.cache.exists(&key)? {
            return Ok(());
        }

        let released = self
            .cache
            .update(&key, |current: Option<DiscountCode>| -> Result<DiscountCode, CommerceError> {
                let mut discount =
                    current.ok_or_else(|| CommerceError::DiscountNotFound(code.clone()))?;
                discount.release_usage(order_number, Utc::now());
                Ok(discount)
            })?;

        tracing::info!(
            code = %released.code,
            order_number,
            used = released.used_count,
            "discount redemption released"
        );
        Ok(())
    }
}
