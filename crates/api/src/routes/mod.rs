//! HTTP route handlers.

pub mod accounts;
pub mod cart;
pub mod ops;
pub mod orders;
pub mod products;
