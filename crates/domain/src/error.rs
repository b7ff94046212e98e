//! Domain error types.

use doc_store::StoreError;
use thiserror::Error;

use crate::account::AccountError;
use crate::cart::CartError;
use crate::catalog::CatalogError;
use crate::order::OrderError;
use crate::session::TokenError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in the document store.
    #[error("Document store error: {0}")]
    Store(#[from] StoreError),

    /// Registration or login was rejected.
    #[error(transparent)]
    Account(#[from] AccountError),

    /// A catalog operation was rejected.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// A cart operation was rejected.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// Order placement was rejected.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// A session token could not be issued or verified.
    #[error(transparent)]
    Token(#[from] TokenError),

    /// Optimistic writes kept losing to concurrent writers.
    #[error("Gave up after {attempts} attempts due to concurrent updates")]
    Contention { attempts: u32 },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DomainError {
    /// Returns true if the error is an optimistic concurrency conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, DomainError::Store(err) if err.is_conflict())
    }
}
