use async_trait::async_trait;

use crate::{Document, DocumentId, DocumentQuery, Result, StoreError, UniqueIndex, Version};

/// A single write inside an atomic batch.
#[derive(Debug, Clone)]
pub enum WriteOp {
    /// Store a new document at [`Version::first`].
    Insert(Document),

    /// Replace the body of an existing document, provided it is still at
    /// `expected_version`.
    Update {
        document: Document,
        expected_version: Version,
    },
}

impl WriteOp {
    /// Returns the collection and id the operation targets.
    pub fn target(&self) -> (&str, DocumentId) {
        match self {
            WriteOp::Insert(doc) | WriteOp::Update { document: doc, .. } => {
                (doc.collection.as_str(), doc.id)
            }
        }
    }
}

/// Core trait for document store implementations.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Registers a unique index. Idempotent.
    async fn ensure_unique_index(&self, index: UniqueIndex) -> Result<()>;

    /// Loads a document by id.
    async fn get(&self, collection: &str, id: DocumentId) -> Result<Option<Document>>;

    /// Loads every listed document that exists. Missing ids are skipped and
    /// the result order is unspecified.
    async fn get_many(&self, collection: &str, ids: &[DocumentId]) -> Result<Vec<Document>>;

    /// Retrieves documents matching a query, in insertion order.
    async fn find(&self, query: DocumentQuery) -> Result<Vec<Document>>;

    /// Applies a batch of writes atomically - either all succeed or none do.
    ///
    /// Returns the stored documents (with their new versions) in batch order.
    async fn commit(&self, batch: Vec<WriteOp>) -> Result<Vec<Document>>;
}

/// Extension trait providing convenience methods for document stores.
#[async_trait]
pub trait DocumentStoreExt: DocumentStore {
    /// Inserts a single document.
    async fn insert(&self, document: Document) -> Result<Document> {
        single(self.commit(vec![WriteOp::Insert(document)]).await?)
    }

    /// Updates a single document with an optimistic version check.
    async fn update(&self, document: Document, expected_version: Version) -> Result<Document> {
        single(
            self.commit(vec![WriteOp::Update {
                document,
                expected_version,
            }])
            .await?,
        )
    }

    /// Returns the first document matching the query.
    async fn find_one(&self, query: DocumentQuery) -> Result<Option<Document>> {
        Ok(self.find(query.limit(1)).await?.into_iter().next())
    }
}

// Blanket implementation for all DocumentStore implementations
impl<T: DocumentStore + ?Sized> DocumentStoreExt for T {}

fn single(mut docs: Vec<Document>) -> Result<Document> {
    docs.pop()
        .ok_or_else(|| StoreError::InvalidBatch("commit returned no documents".to_string()))
}

/// Validates a batch before it is applied.
///
/// A batch must be non-empty and may touch each document at most once.
pub fn validate_batch(batch: &[WriteOp]) -> Result<()> {
    if batch.is_empty() {
        return Err(StoreError::InvalidBatch(
            "Cannot commit an empty batch".to_string(),
        ));
    }

    for (i, op) in batch.iter().enumerate() {
        let target = op.target();
        if batch.iter().skip(i + 1).any(|other| other.target() == target) {
            return Err(StoreError::InvalidBatch(format!(
                "Document {}/{} appears more than once in the batch",
                target.0, target.1
            )));
        }
        if target.0.is_empty() {
            return Err(StoreError::InvalidBatch(
                "Document collection must not be empty".to_string(),
            ));
        }
    }

    Ok(())
}
