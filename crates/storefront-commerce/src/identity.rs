//! Who a cart or order belongs to.
//!
//! Both enums make "both set" and "neither set" unrepresentable.

use crate::error::CommerceError;
use crate::ids::{SessionId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Owner of a cart: a registered user or a guest session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum CartIdentity {
    /// Authenticated user.
    Registered(UserId),
    /// Anonymous browser session.
    Guest(SessionId),
}

impl CartIdentity {
    /// The user ID, if registered.
    pub fn user_id(&self) -> Option<&UserId> {
        match self {
            CartIdentity::Registered(id) => Some(id),
            CartIdentity::Guest(_) => None,
        }
    }

    /// Whether this is a guest identity.
    pub fn is_guest(&self) -> bool {
        matches!(self, CartIdentity::Guest(_))
    }

    /// Stable key fragment used for storage (`user:<id>` / `guest:<id>`).
    pub fn storage_key(&self) -> String {
        match self {
            CartIdentity::Registered(id) => format!("user:{}", id),
            CartIdentity::Guest(id) => format!("guest:{}", id),
        }
    }
}

impl fmt::Display for CartIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.storage_key())
    }
}

/// Contact details captured for a guest checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestContact {
    /// Full name.
    pub name: String,
    /// Email address for order updates.
    pub email: String,
    /// Phone number.
    pub phone: Option<String>,
}

impl GuestContact {
    /// Create guest contact details.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            phone: None,
        }
    }

    /// Check required fields.
    pub fn validate(&self) -> Result<(), CommerceError> {
        if self.name.trim().is_empty() {
            return Err(CommerceError::ValidationError(
                "guest name is required".to_string(),
            ));
        }
        let email = self.email.trim();
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
            _ => Err(CommerceError::ValidationError(format!(
                "invalid guest email: {}",
                self.email
            ))),
        }
    }
}

/// Customer of an order: a registered user or a guest's contact details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OrderCustomer {
    /// Registered account.
    Registered { user_id: UserId },
    /// Guest checkout.
    Guest { contact: GuestContact },
}

impl OrderCustomer {
    /// The user ID, if registered.
    pub fn user_id(&self) -> Option<&UserId> {
        match self {
            OrderCustomer::Registered { user_id } => Some(user_id),
            OrderCustomer::Guest { .. } => None,
        }
    }

    /// Validate guest contact details. Registered customers always pass.
    pub fn validate(&self) -> Result<(), CommerceError> {
        match self {
            OrderCustomer::Registered { .. } => Ok(()),
            OrderCustomer::Guest { contact } => contact.validate(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_keys() {
        let user = CartIdentity::Registered(UserId::new("u1"));
        let guest = CartIdentity::Guest(SessionId::new("s1"));
        assert_eq!(user.storage_key(), "user:u1");
        assert_eq!(guest.storage_key(), "guest:s1");
        assert!(guest.is_guest());
        assert_eq!(user.user_id(), Some(&UserId::new("u1")));
    }

    #[test]
    fn test_identity_serialization() {
        let guest = CartIdentity::Guest(SessionId::new("s1"));
        let json = serde_json::to_string(&guest).unwrap();
        assert_eq!(json, r#"{"kind":"guest","id":"s1"}"#);
        let back: CartIdentity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, guest);
    }

    #[test]
    fn test_guest_contact_validation() {
        assert!(GuestContact::new("An Nguyen", "an@example.com").validate().is_ok());
        assert!(GuestContact::new("", "an@example.com").validate().is_err());
        assert!(GuestContact::new("An", "not-an-email").validate().is_err());
        assert!(GuestContact::new("An", "@example.com").validate().is_err());
    }
}
