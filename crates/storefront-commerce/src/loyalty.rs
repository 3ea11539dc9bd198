//! Loyalty point balances per registered user.

use crate::error::CommerceError;
use crate::ids::UserId;
use storefront_cache::{cache_key, Cache};

/// Point balances stored in the document cache.
///
/// Credits and debits are read-modify-write cycles through
/// [`Cache::update`], so concurrent changes to one balance never get lost.
#[derive(Debug, Clone)]
pub struct LoyaltyLedger {
    cache: Cache,
}

impl LoyaltyLedger {
    pub fn new(cache: Cache) -> Self {
        Self { cache }
    }

    fn key(user: &UserId) -> String {
        cache_key!("loyalty", user)
    }

    /// Current balance; zero for users never credited.
    pub fn balance(&self, user: &UserId) -> Result<i64, CommerceError> {
        Ok(self.cache.get::<i64>(&Self::key(user))?.unwrap_or(0))
    }

    /// Add points. Returns the new balance.
    pub fn credit(&self, user: &UserId, points: i64) -> Result<i64, CommerceError> {
        check_points(points)?;
        let balance = self.cache.update(&Self::key(user), |current: Option<i64>| {
            current
                .unwrap_or(0)
                .checked_add(points)
                .ok_or(CommerceError::Overflow)
        })?;
        tracing::debug!(user_id = %user, points, balance, "loyalty points credited");
        Ok(balance)
    }

    /// Remove points. Fails without changing anything when the balance is
    /// too low.
    pub fn debit(&self, user: &UserId, points: i64) -> Result<i64, CommerceError> {
        check_points(points)?;
        let balance = self.cache.update(&Self::key(user), |current: Option<i64>| {
            let available = current.unwrap_or(0);
            if available < points {
                return Err(CommerceError::InsufficientLoyaltyPoints {
                    requested: points,
                    available,
                });
            }
            Ok(available - points)
        })?;
        tracing::debug!(user_id = %user, points, balance, "loyalty points debited");
        Ok(balance)
    }
}

fn check_points(points: i64) -> Result<(), CommerceError> {
    if points < 0 {
        return Err(CommerceError::ValidationError(format!(
            "loyalty points must not be negative, got {}",
            points
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_credit_and_debit() {
        let ledger = LoyaltyLedger::new(Cache::in_memory());
        let user = UserId::new("u1");

        assert_eq!(ledger.balance(&user).unwrap(), 0);
        assert_eq!(ledger.credit(&user, 120).unwrap(), 120);
        assert_eq!(ledger.debit(&user, 20).unwrap(), 100);
        assert_eq!(ledger.balance(&user).unwrap(), 100);
    }

    #[test]
    fn test_overdraw_is_rejected() {
        let ledger = LoyaltyLedger::new(Cache::in_memory());
        let user = UserId::new("u1");
        ledger.credit(&user, 5).unwrap();

        let err = ledger.debit(&user, 6).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientResource);
        assert_eq!(ledger.balance(&user).unwrap(), 5);
    }

    #[test]
    fn test_negative_points_rejected() {
        let ledger = LoyaltyLedger::new(Cache::in_memory());
        assert!(ledger.credit(&UserId::new("u1"), -1).is_err());
    }
}
