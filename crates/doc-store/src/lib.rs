//! Document persistence for the storefront backend.
//!
//! Collections of JSON documents addressed by id, with field-equality
//! queries, optimistic versioning on update, unique indexes, and atomic
//! multi-document commits. Two backends share the [`DocumentStore`] trait:
//! an in-memory store for tests and local runs, and PostgreSQL (JSONB).

pub mod document;
pub mod error;
pub mod index;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;

pub use common::DocumentId;
pub use document::{Document, Version};
pub use error::{Result, StoreError};
pub use index::UniqueIndex;
pub use memory::InMemoryDocumentStore;
pub use postgres::PostgresDocumentStore;
pub use query::DocumentQuery;
pub use store::{DocumentStore, DocumentStoreExt, WriteOp};
