//! Typed access to document collections.

use std::collections::HashMap;
use std::hash::Hash;
use std::marker::PhantomData;

use common::DocumentId;
use doc_store::{Document, DocumentQuery, DocumentStore, DocumentStoreExt, Version, WriteOp};
use serde::{Serialize, de::DeserializeOwned};

use crate::error::DomainError;

/// A domain type persisted as one document in a named collection.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + Sized {
    /// Strongly typed identifier of the entity.
    type Id: Copy + Eq + Hash + Send + Sync + Into<DocumentId> + From<DocumentId>;

    /// Collection the entity lives in.
    const COLLECTION: &'static str;

    /// Returns the entity's identifier.
    fn id(&self) -> Self::Id;
}

/// An entity as loaded from the store, together with the version it was read at.
#[derive(Debug, Clone)]
pub struct Stored<E> {
    pub entity: E,
    pub version: Version,
}

impl<E: Entity> Stored<E> {
    fn from_document(doc: Document) -> Result<Self, DomainError> {
        Ok(Self {
            entity: doc.decode()?,
            version: doc.version,
        })
    }
}

/// Repository mapping an [`Entity`] type onto its collection.
///
/// Every write goes through the document store's versioned operations; the
/// caller keeps the [`Version`] it read and hands it back on update.
pub struct Repository<S, E>
where
    S: DocumentStore,
    E: Entity,
{
    store: S,
    _phantom: PhantomData<E>,
}

impl<S, E> Clone for Repository<S, E>
where
    S: DocumentStore + Clone,
    E: Entity,
{
    fn clone(&self) -> Self {
        Self::new(self.store.clone())
    }
}

impl<S, E> Repository<S, E>
where
    S: DocumentStore,
    E: Entity,
{
    /// Creates a new repository over the given store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            _phantom: PhantomData,
        }
    }

    /// Returns a reference to the underlying document store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Starts a query over this repository's collection.
    pub fn query(&self) -> DocumentQuery {
        DocumentQuery::collection(E::COLLECTION)
    }

    /// Loads an entity by id.
    pub async fn get(&self, id: E::Id) -> Result<Option<Stored<E>>, DomainError> {
        self.store
            .get(E::COLLECTION, id.into())
            .await?
            .map(Stored::from_document)
            .transpose()
    }

    /// Loads every entity whose id is listed, keyed by id. Missing ids are absent from the map.
    pub async fn get_many(&self, ids: &[E::Id]) -> Result<HashMap<E::Id, E>, DomainError> {
        let doc_ids: Vec<DocumentId> = ids.iter().map(|&id| id.into()).collect();
        let docs = self.store.get_many(E::COLLECTION, &doc_ids).await?;

        docs.into_iter()
            .map(|doc| -> Result<(E::Id, E), DomainError> {
                let entity: E = doc.decode()?;
                Ok((entity.id(), entity))
            })
            .collect()
    }

    /// Returns all entities matching the query, in insertion order.
    pub async fn find(&self, query: DocumentQuery) -> Result<Vec<Stored<E>>, DomainError> {
        self.store
            .find(query)
            .await?
            .into_iter()
            .map(Stored::from_document)
            .collect()
    }

    /// Returns the first entity matching the query.
    pub async fn find_one(&self, query: DocumentQuery) -> Result<Option<Stored<E>>, DomainError> {
        self.store
            .find_one(query)
            .await?
            .map(Stored::from_document)
            .transpose()
    }

    /// Stores a new entity.
    pub async fn insert(&self, entity: E) -> Result<Stored<E>, DomainError> {
        let doc = self.store.insert(Self::to_document(&entity)?).await?;
        Ok(Stored {
            entity,
            version: doc.version,
        })
    }

    /// Replaces a stored entity, failing with a conflict if it moved past `expected`.
    pub async fn update(&self, entity: E, expected: Version) -> Result<Stored<E>, DomainError> {
        let doc = self
            .store
            .update(Self::to_document(&entity)?, expected)
            .await?;
        Ok(Stored {
            entity,
            version: doc.version,
        })
    }

    /// Builds an insert operation for use in an atomic batch.
    pub fn insert_op(&self, entity: &E) -> Result<WriteOp, DomainError> {
        Ok(WriteOp::Insert(Self::to_document(entity)?))
    }

    /// Builds a versioned update operation for use in an atomic batch.
    pub fn update_op(&self, entity: &E, expected: Version) -> Result<WriteOp, DomainError> {
        Ok(WriteOp::Update {
            document: Self::to_document(entity)?,
            expected_version: expected,
        })
    }

    fn to_document(entity: &E) -> Result<Document, DomainError> {
        Ok(Document::from_value(E::COLLECTION, entity.id(), entity)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::ProductId;
    use doc_store::InMemoryDocumentStore;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: ProductId,
        text: String,
    }

    impl Entity for Note {
        type Id = ProductId;
        const COLLECTION: &'static str = "notes";

        fn id(&self) -> ProductId {
            self.id
        }
    }

    fn note(text: &str) -> Note {
        Note {
            id: ProductId::new(),
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn insert_then_get_roundtrips_entity() {
        let repo: Repository<_, Note> = Repository::new(InMemoryDocumentStore::new());
        let stored = repo.insert(note("hello")).await.unwrap();
        assert_eq!(stored.version, Version::first());

        let loaded = repo.get(stored.entity.id).await.unwrap().unwrap();
        assert_eq!(loaded.entity, stored.entity);
    }

    #[tokio::test]
    async fn update_bumps_version_and_detects_stale_writes() {
        let repo: Repository<_, Note> = Repository::new(InMemoryDocumentStore::new());
        let stored = repo.insert(note("v1")).await.unwrap();

        let mut changed = stored.entity.clone();
        changed.text = "v2".to_string();
        let updated = repo.update(changed.clone(), stored.version).await.unwrap();
        assert_eq!(updated.version, Version::new(2));

        let err = repo.update(changed, stored.version).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn get_many_keys_by_id() {
        let repo: Repository<_, Note> = Repository::new(InMemoryDocumentStore::new());
        let a = repo.insert(note("a")).await.unwrap().entity;
        let b = repo.insert(note("b")).await.unwrap().entity;

        let found = repo.get_many(&[a.id, ProductId::new(), b.id]).await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[&a.id].text, "a");
        assert_eq!(found[&b.id].text, "b");
    }

    #[tokio::test]
    async fn find_filters_on_body_fields() {
        let repo: Repository<_, Note> = Repository::new(InMemoryDocumentStore::new());
        repo.insert(note("keep")).await.unwrap();
        repo.insert(note("skip")).await.unwrap();

        let found = repo
            .find(repo.query().filter("text", "keep"))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].entity.text, "keep");
    }
}
