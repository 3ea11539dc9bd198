//! Order lifecycle.
//!
//! An order is created once from a cart snapshot and then only moves
//! through statuses. Transitions are not guarded; the cancel and return
//! predicates are advisory.

mod address;
mod number;
mod order;
mod status;

pub use address::Address;
pub use number::generate_order_number;
pub use order::{compute_loyalty_points_earned, Order, OrderDraft, OrderLineItem, StatusInfo};
pub use status::{OrderStatus, PaymentMethod, PaymentStatus, StatusHistoryEntry};
