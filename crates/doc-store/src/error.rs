use thiserror::Error;

use crate::{DocumentId, Version};

/// Errors that can occur when interacting with the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The stored version did not match the version the caller read.
    #[error(
        "Concurrency conflict for {collection}/{id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        collection: String,
        id: DocumentId,
        expected: Version,
        actual: Version,
    },

    /// The document to update does not exist.
    #[error("Document not found: {collection}/{id}")]
    NotFound { collection: String, id: DocumentId },

    /// A document with the same id already exists in the collection.
    #[error("Duplicate document id: {collection}/{id}")]
    DuplicateId { collection: String, id: DocumentId },

    /// A unique index rejected the write.
    #[error("Duplicate key in {collection} violates unique index {index}")]
    DuplicateKey { collection: String, index: String },

    /// A write batch was malformed.
    #[error("Invalid write batch: {0}")]
    InvalidBatch(String),

    /// A unique index definition was rejected.
    #[error("Invalid index definition: {0}")]
    InvalidIndex(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Returns true when re-reading and retrying the operation may succeed.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::ConcurrencyConflict { .. })
    }
}

/// Result type for document store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
