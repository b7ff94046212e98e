//! Shared application state.

use std::sync::Arc;

use doc_store::DocumentStore;
use domain::{
    AccountService, CartService, CatalogService, OrderService, PasswordHasher, SessionIssuer,
};

/// Services shared by every handler, all backed by one document store.
pub struct AppState<S: DocumentStore + Clone> {
    pub accounts: AccountService<S>,
    pub catalog: CatalogService<S>,
    pub carts: CartService<S>,
    pub orders: OrderService<S>,
    pub sessions: Arc<SessionIssuer>,
}

impl<S: DocumentStore + Clone> AppState<S> {
    /// Creates the state with default password hashing parameters.
    pub fn new(store: S, sessions: SessionIssuer) -> Self {
        Self::with_hasher(store, sessions, PasswordHasher::default())
    }

    /// Creates the state with a specific password hasher.
    pub fn with_hasher(store: S, sessions: SessionIssuer, hasher: PasswordHasher) -> Self {
        Self {
            accounts: AccountService::with_hasher(store.clone(), hasher),
            catalog: CatalogService::new(store.clone()),
            carts: CartService::new(store.clone()),
            orders: OrderService::new(store),
            sessions: Arc::new(sessions),
        }
    }
}
