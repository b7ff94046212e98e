use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    Document, DocumentId, DocumentQuery, Result, StoreError, UniqueIndex, Version,
    store::{DocumentStore, WriteOp, validate_batch},
};

/// In-memory document store implementation for testing and local runs.
///
/// Documents are kept in insertion order. A commit applies its batch to a
/// staged copy under the write lock and only publishes it once every
/// operation has passed its checks, so a failed batch leaves no trace.
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    documents: Arc<RwLock<Vec<Document>>>,
    indexes: Arc<RwLock<Vec<UniqueIndex>>>,
}

impl InMemoryDocumentStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of documents stored across all collections.
    pub async fn document_count(&self) -> usize {
        self.documents.read().await.len()
    }

    /// Clears all documents. Registered indexes are kept.
    pub async fn clear(&self) {
        self.documents.write().await.clear();
    }

    fn check_unique(
        staged: &[Document],
        indexes: &[UniqueIndex],
        candidate: &Document,
    ) -> Result<()> {
        for index in indexes
            .iter()
            .filter(|i| i.collection == candidate.collection)
        {
            let Some(key) = index.key(&candidate.body) else {
                continue;
            };
            let clash = staged.iter().any(|doc| {
                doc.collection == candidate.collection
                    && doc.id != candidate.id
                    && index.key(&doc.body).as_ref() == Some(&key)
            });
            if clash {
                return Err(StoreError::DuplicateKey {
                    collection: candidate.collection.clone(),
                    index: index.name(),
                });
            }
        }
        Ok(())
    }

    fn apply(staged: &mut Vec<Document>, indexes: &[UniqueIndex], op: WriteOp) -> Result<Document> {
        let now = Utc::now();
        match op {
            WriteOp::Insert(mut doc) => {
                if staged
                    .iter()
                    .any(|d| d.collection == doc.collection && d.id == doc.id)
                {
                    return Err(StoreError::DuplicateId {
                        collection: doc.collection,
                        id: doc.id,
                    });
                }
                Self::check_unique(staged, indexes, &doc)?;

                doc.version = Version::first();
                doc.created_at = now;
                doc.updated_at = now;
                staged.push(doc.clone());
                Ok(doc)
            }
            WriteOp::Update {
                mut document,
                expected_version,
            } => {
                let position = staged
                    .iter()
                    .position(|d| d.collection == document.collection && d.id == document.id)
                    .ok_or_else(|| StoreError::NotFound {
                        collection: document.collection.clone(),
                        id: document.id,
                    })?;

                let current = &staged[position];
                if current.version != expected_version {
                    return Err(StoreError::ConcurrencyConflict {
                        collection: document.collection,
                        id: document.id,
                        expected: expected_version,
                        actual: current.version,
                    });
                }
                Self::check_unique(staged, indexes, &document)?;

                document.version = current.version.next();
                document.created_at = current.created_at;
                document.updated_at = now;
                staged[position] = document.clone();
                Ok(document)
            }
        }
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn ensure_unique_index(&self, index: UniqueIndex) -> Result<()> {
        index.validate()?;

        let mut indexes = self.indexes.write().await;
        if !indexes.contains(&index) {
            // Existing data must already satisfy the constraint.
            let documents = self.documents.read().await;
            let mut seen = Vec::new();
            for doc in documents.iter().filter(|d| d.collection == index.collection) {
                if let Some(key) = index.key(&doc.body) {
                    if seen.contains(&key) {
                        return Err(StoreError::DuplicateKey {
                            collection: index.collection.to_string(),
                            index: index.name(),
                        });
                    }
                    seen.push(key);
                }
            }
            indexes.push(index);
        }
        Ok(())
    }

    async fn get(&self, collection: &str, id: DocumentId) -> Result<Option<Document>> {
        let documents = self.documents.read().await;
        Ok(documents
            .iter()
            .find(|d| d.collection == collection && d.id == id)
            .cloned())
    }

    async fn get_many(&self, collection: &str, ids: &[DocumentId]) -> Result<Vec<Document>> {
        let documents = self.documents.read().await;
        Ok(documents
            .iter()
            .filter(|d| d.collection == collection && ids.contains(&d.id))
            .cloned()
            .collect())
    }

    async fn find(&self, query: DocumentQuery) -> Result<Vec<Document>> {
        let documents = self.documents.read().await;
        let matching = documents
            .iter()
            .filter(|d| d.collection == query.collection && query.matches(&d.body))
            .skip(query.offset.unwrap_or(0));

        let results = match query.limit {
            Some(limit) => matching.take(limit).cloned().collect(),
            None => matching.cloned().collect(),
        };
        Ok(results)
    }

    async fn commit(&self, batch: Vec<WriteOp>) -> Result<Vec<Document>> {
        validate_batch(&batch)?;

        let indexes = self.indexes.read().await.clone();
        let mut documents = self.documents.write().await;

        let mut staged = documents.clone();
        let mut written = Vec::with_capacity(batch.len());
        for op in batch {
            written.push(Self::apply(&mut staged, &indexes, op)?);
        }

        *documents = staged;
        Ok(written)
    }
}
