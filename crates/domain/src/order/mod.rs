//! Order aggregate, status lifecycle and cart-to-order conversion.

mod aggregate;
mod service;
mod state;

pub use aggregate::{Conversion, Order, OrderItem};
pub use service::{OrderLine, OrderService, OrderView, PlaceOrder, Placement};
pub use state::OrderStatus;

use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The user has no cart, or the cart holds no items.
    #[error("Cart is empty")]
    EmptyCart,

    /// The order total does not fit the money range.
    #[error("order total is too large")]
    TotalOverflow,
}
