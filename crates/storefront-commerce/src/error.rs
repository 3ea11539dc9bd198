//! Commerce error types.

use serde::Serialize;
use thiserror::Error;

/// Coarse error category, for rendering a user-facing response without
/// matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad input: quantity, address, code format.
    Validation,
    /// Item, cart, order or discount absent.
    NotFound,
    /// Duplicate entity.
    Conflict,
    /// Discount not usable for this identity or amount.
    Ineligible,
    /// Stock or loyalty balance too low.
    InsufficientResource,
    /// Operation not allowed in the entity's current state.
    State,
    /// Storage, serialization or arithmetic failure.
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Ineligible => "ineligible",
            ErrorKind::InsufficientResource => "insufficient_resource",
            ErrorKind::State => "state",
            ErrorKind::Internal => "internal",
        }
    }
}

/// Errors that can occur in e-commerce operations.
#[derive(Error, Debug)]
pub enum CommerceError {
    /// Product not found or not active.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Variant not found or not active.
    #[error("Variant not found: {0}")]
    VariantNotFound(String),

    /// Order not found.
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// Discount code not found.
    #[error("Discount code not found: {0}")]
    DiscountNotFound(String),

    /// Item not in cart.
    #[error("Item not in cart: {0}")]
    ItemNotFound(String),

    /// Invalid quantity.
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(i64),

    /// Quantity exceeds maximum allowed.
    #[error("Quantity {0} exceeds maximum allowed ({1})")]
    QuantityExceedsLimit(i64, i64),

    /// Checkout attempted on a cart without items.
    #[error("Cannot place an order from an empty cart")]
    EmptyCart,

    /// Malformed discount code.
    #[error("Invalid discount code: {0}")]
    InvalidDiscountCode(String),

    /// Discount code already exists.
    #[error("Discount code already exists: {0}")]
    DiscountCodeExists(String),

    /// Discount not usable by this identity or amount.
    #[error("Discount not applicable: {0}")]
    DiscountIneligible(String),

    /// Discount usage limit reached.
    #[error("Discount usage limit reached: {0}")]
    DiscountUsageLimitReached(String),

    /// Insufficient inventory.
    #[error("Insufficient inventory for {product_id}: requested {requested}, available {available}")]
    InsufficientInventory {
        product_id: String,
        requested: i64,
        available: i64,
    },

    /// Insufficient loyalty points.
    #[error("Insufficient loyalty points: requested {requested}, available {available}")]
    InsufficientLoyaltyPoints { requested: i64, available: i64 },

    /// Cart has been deactivated (merged or checked out).
    #[error("Cart is no longer active: {0}")]
    CartInactive(String),

    /// Operation not permitted for the order's status.
    #[error("Order {order_number} cannot be {action} while {status}")]
    OrderStateConflict {
        order_number: String,
        action: &'static str,
        status: &'static str,
    },

    /// Currency mismatch.
    #[error("Currency mismatch: expected {expected}, got {got}")]
    CurrencyMismatch { expected: String, got: String },

    /// Arithmetic overflow.
    #[error("Arithmetic overflow in money calculation")]
    Overflow,

    /// Storage error.
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Validation error.
    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl CommerceError {
    /// The category this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CommerceError::InvalidQuantity(_)
            | CommerceError::QuantityExceedsLimit(..)
            | CommerceError::EmptyCart
            | CommerceError::InvalidDiscountCode(_)
            | CommerceError::CurrencyMismatch { .. }
            | CommerceError::ValidationError(_) => ErrorKind::Validation,
            CommerceError::ProductNotFound(_)
            | CommerceError::VariantNotFound(_)
            | CommerceError::OrderNotFound(_)
            | CommerceError::DiscountNotFound(_)
            | CommerceError::ItemNotFound(_) => ErrorKind::NotFound,
            CommerceError::DiscountCodeExists(_) => ErrorKind::Conflict,
            CommerceError::DiscountIneligible(_)
            | CommerceError::DiscountUsageLimitReached(_) => ErrorKind::Ineligible,
            CommerceError::InsufficientInventory { .. }
            | CommerceError::InsufficientLoyaltyPoints { .. } => ErrorKind::InsufficientResource,
            CommerceError::CartInactive(_) | CommerceError::OrderStateConflict { .. } => {
                ErrorKind::State
            }
            CommerceError::Overflow
            | CommerceError::StorageError(_)
            | CommerceError::SerializationError(_) => ErrorKind::Internal,
        }
    }
}

impl From<storefront_cache::CacheError> for CommerceError {
    fn from(e: storefront_cache::CacheError) -> Self {
        CommerceError::StorageError(e.to_string())
    }
}

impl From<serde_json::Error> for CommerceError {
    fn from(e: serde_json::Error) -> Self {
        CommerceError::SerializationError(e.to_string())
    }
}
