//! Cart aggregate and the service that mutates it.

mod aggregate;
mod service;

pub use aggregate::{Cart, CartItem};
pub use service::{CartLine, CartService, CartView};

use common::ProductId;
use thiserror::Error;

/// Errors that can occur during cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The product reference was missing.
    #[error("productId is required")]
    ProductIdRequired,

    /// The product reference was not a valid id.
    #[error("invalid productId: {0}")]
    InvalidProductId(String),

    /// Quantity resolved to zero, a negative number, or overflowed.
    #[error("quantity must be >= 1")]
    InvalidQuantity(i64),

    /// The referenced product does not exist.
    #[error("Product not found")]
    ProductNotFound(ProductId),

    /// The cart total does not fit the money range.
    #[error("cart total is too large")]
    TotalOverflow,
}
