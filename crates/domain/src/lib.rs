//! Domain layer for the storefront backend.
//!
//! This crate provides:
//! - Credential store: registration and password login ([`AccountService`])
//! - Session issuer: signed, time-bounded identity tokens ([`SessionIssuer`])
//! - Catalog store: seller-owned products ([`CatalogService`])
//! - Cart aggregate: one mutable cart per user ([`CartService`])
//! - Order conversion: cart snapshots into immutable orders ([`OrderService`])

pub mod account;
pub mod cart;
pub mod catalog;
pub mod error;
pub mod money;
pub mod order;
pub mod password;
pub mod repository;
pub mod retry;
pub mod schema;
pub mod session;
pub mod user;

pub use account::{AccountError, AccountService, Registration};
pub use cart::{Cart, CartError, CartItem, CartLine, CartService, CartView};
pub use catalog::{CatalogError, CatalogService, NewProduct, Product, ProductSummary};
pub use common::{CartId, OrderId, ProductId, UserId};
pub use error::DomainError;
pub use money::Money;
pub use order::{
    Order, OrderError, OrderItem, OrderLine, OrderService, OrderStatus, OrderView, PlaceOrder,
    Placement,
};
pub use password::PasswordHasher;
pub use repository::{Entity, Repository, Stored};
pub use retry::RetryPolicy;
pub use schema::ensure_indexes;
pub use session::{SessionIssuer, TokenError};
pub use user::{Identity, Role, User};
