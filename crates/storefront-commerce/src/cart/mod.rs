//! Shopping cart module.
//!
//! Contains the cart, its line items, the pure totals computation and the
//! engine that applies mutations.

mod cart;
mod engine;
mod pricing;

pub use cart::{Cart, CartLineItem};
pub use engine::CartEngine;
pub use pricing::{compute_totals, CartSummary, CartTotals};
