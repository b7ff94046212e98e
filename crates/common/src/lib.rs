//! Identifier types shared across the storefront crates.

pub mod types;

pub use types::{CartId, DocumentId, OrderId, ProductId, UserId};
