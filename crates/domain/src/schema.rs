//! Collection names and the unique indexes the domain relies on.

use doc_store::{DocumentStore, UniqueIndex};

use crate::error::DomainError;

pub const USERS: &str = "users";
pub const PRODUCTS: &str = "products";
pub const CARTS: &str = "carts";
pub const ORDERS: &str = "orders";

/// One account per email address.
pub const USERS_BY_EMAIL: UniqueIndex = UniqueIndex::new(USERS, &["email"]);

/// One cart per user.
pub const CARTS_BY_USER: UniqueIndex = UniqueIndex::new(CARTS, &["userId"]);

/// One order per (user, idempotency key); orders without a key are unconstrained.
pub const ORDERS_BY_IDEMPOTENCY_KEY: UniqueIndex =
    UniqueIndex::new(ORDERS, &["userId", "idempotencyKey"]);

/// Every unique index, in creation order.
pub const UNIQUE_INDEXES: [UniqueIndex; 3] =
    [USERS_BY_EMAIL, CARTS_BY_USER, ORDERS_BY_IDEMPOTENCY_KEY];

/// Creates the unique indexes on `store`. Safe to call on every startup.
#[tracing::instrument(skip(store))]
pub async fn ensure_indexes<S: DocumentStore>(store: &S) -> Result<(), DomainError> {
    for index in UNIQUE_INDEXES {
        store.ensure_unique_index(index).await?;
    }
    Ok(())
}
