//! Typed identifiers.
//!
//! Each entity gets its own string newtype so a `UserId` can never be
//! passed where a `SessionId` is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

// Expands to a serde-transparent string newtype with a random generator.
macro_rules! define_id {
    ($name:ident, $prefix:literal) => {
        #[doc = concat!("Identifier with the `", $prefix, "_` prefix when generated.")]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing identifier.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Fresh random identifier.
            pub fn generate() -> Self {
                Self(generate_id($prefix))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(ProductId, "prod");
define_id!(VariantId, "var");
define_id!(CategoryId, "cat");
define_id!(CartId, "cart");
define_id!(OrderId, "ord");
define_id!(DiscountId, "disc");
define_id!(UserId, "user");
define_id!(SessionId, "sess");

/// Generate `<prefix>_<24 url-safe base64 chars>` from 18 random bytes.
fn generate_id(prefix: &str) -> String {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use rand::Rng;

    let bytes: [u8; 18] = rand::thread_rng().gen();
    format!("{}_{}", prefix, URL_SAFE_NO_PAD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_creation() {
        let id = ProductId::new("prod-123");
        assert_eq!(id.as_str(), "prod-123");
    }

    #[test]
    fn test_id_generation() {
        let id1 = ProductId::generate();
        let id2 = ProductId::generate();
        assert_ne!(id1, id2);
        assert!(id1.as_str().starts_with("prod_"));
    }

    #[test]
    fn test_session_id_format() {
        let id = SessionId::generate();
        // "sess_" + 24 base64 chars
        assert!(id.as_str().starts_with("sess_"));
        assert_eq!(id.as_str().len(), 29);
    }

    #[test]
    fn test_id_from_string() {
        let id: ProductId = "prod-456".into();
        assert_eq!(id.as_str(), "prod-456");
    }

    #[test]
    fn test_id_display() {
        let id = UserId::new("user-789");
        assert_eq!(format!("{}", id), "user-789");
    }

    #[test]
    fn test_id_serializes_as_plain_string() {
        let id = VariantId::new("var-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""var-1""#);
    }
}
