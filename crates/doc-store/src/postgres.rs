use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::{
    Document, DocumentId, DocumentQuery, Result, StoreError, UniqueIndex, Version,
    store::{DocumentStore, WriteOp, validate_batch},
};

const PRIMARY_KEY_CONSTRAINT: &str = "documents_pkey";

/// PostgreSQL-backed document store, one JSONB row per document.
#[derive(Clone)]
pub struct PostgresDocumentStore {
    pool: PgPool,
}

impl PostgresDocumentStore {
    /// Creates a new PostgreSQL document store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_document(row: PgRow) -> Result<Document> {
        Ok(Document {
            id: DocumentId::from_uuid(row.try_get::<Uuid, _>("id")?),
            collection: row.try_get("collection")?,
            version: Version::new(row.try_get("version")?),
            body: row.try_get("body")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn map_write_error(err: sqlx::Error, collection: &str, id: DocumentId) -> StoreError {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_unique_violation()
        {
            return match db_err.constraint() {
                Some(PRIMARY_KEY_CONSTRAINT) => StoreError::DuplicateId {
                    collection: collection.to_string(),
                    id,
                },
                other => StoreError::DuplicateKey {
                    collection: collection.to_string(),
                    index: other.unwrap_or("unknown").to_string(),
                },
            };
        }
        StoreError::Database(err)
    }

    async fn insert_in(tx: &mut Transaction<'_, Postgres>, doc: Document) -> Result<Document> {
        let collection = doc.collection.clone();
        let id = doc.id;

        let row = sqlx::query(
            r#"
            INSERT INTO documents (collection, id, version, body, created_at, updated_at)
            VALUES ($1, $2, 1, $3, NOW(), NOW())
            RETURNING collection, id, version, body, created_at, updated_at
            "#,
        )
        .bind(&doc.collection)
        .bind(doc.id.as_uuid())
        .bind(&doc.body)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| Self::map_write_error(e, &collection, id))?;

        Self::row_to_document(row)
    }

    async fn update_in(
        tx: &mut Transaction<'_, Postgres>,
        doc: Document,
        expected_version: Version,
    ) -> Result<Document> {
        let collection = doc.collection.clone();
        let id = doc.id;

        let row: Option<PgRow> = sqlx::query(
            r#"
            UPDATE documents
            SET body = $3, version = version + 1, updated_at = NOW()
            WHERE collection = $1 AND id = $2 AND version = $4
            RETURNING collection, id, version, body, created_at, updated_at
            "#,
        )
        .bind(&doc.collection)
        .bind(doc.id.as_uuid())
        .bind(&doc.body)
        .bind(expected_version.as_i64())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| Self::map_write_error(e, &collection, id))?;

        if let Some(row) = row {
            return Self::row_to_document(row);
        }

        // Zero rows: either the document is gone or someone else wrote first.
        let actual: Option<i64> =
            sqlx::query_scalar("SELECT version FROM documents WHERE collection = $1 AND id = $2")
                .bind(&collection)
                .bind(id.as_uuid())
                .fetch_optional(&mut **tx)
                .await?;

        match actual {
            Some(actual) => Err(StoreError::ConcurrencyConflict {
                collection,
                id,
                expected: expected_version,
                actual: Version::new(actual),
            }),
            None => Err(StoreError::NotFound { collection, id }),
        }
    }
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    async fn ensure_unique_index(&self, index: UniqueIndex) -> Result<()> {
        index.validate()?;

        let columns = index
            .fields
            .iter()
            .map(|f| format!("(body->>'{f}')"))
            .collect::<Vec<_>>()
            .join(", ");
        let present = index
            .fields
            .iter()
            .map(|f| format!("body->>'{f}' IS NOT NULL"))
            .collect::<Vec<_>>()
            .join(" AND ");
        let sql = format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS {name} ON documents ({columns}) \
             WHERE collection = '{collection}' AND {present}",
            name = index.name(),
            collection = index.collection,
        );

        sqlx::raw_sql(&sql).execute(&self.pool).await?;
        tracing::debug!(index = %index.name(), "unique index ensured");
        Ok(())
    }

    async fn get(&self, collection: &str, id: DocumentId) -> Result<Option<Document>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT collection, id, version, body, created_at, updated_at
            FROM documents
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection)
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_document).transpose()
    }

    async fn get_many(&self, collection: &str, ids: &[DocumentId]) -> Result<Vec<Document>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let uuids: Vec<Uuid> = ids.iter().map(|id| id.as_uuid()).collect();

        let rows = sqlx::query(
            r#"
            SELECT collection, id, version, body, created_at, updated_at
            FROM documents
            WHERE collection = $1 AND id = ANY($2)
            "#,
        )
        .bind(collection)
        .bind(uuids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_document).collect()
    }

    async fn find(&self, query: DocumentQuery) -> Result<Vec<Document>> {
        let mut sql = String::from(
            "SELECT collection, id, version, body, created_at, updated_at FROM documents \
             WHERE collection = $1 AND body @> $2 ORDER BY seq ASC",
        );
        let mut param_count = 2;

        if query.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }
        if query.offset.is_some() {
            param_count += 1;
            sql.push_str(&format!(" OFFSET ${param_count}"));
        }

        let mut sqlx_query = sqlx::query(&sql)
            .bind(&query.collection)
            .bind(query.filter_object());

        if let Some(limit) = query.limit {
            sqlx_query = sqlx_query.bind(limit as i64);
        }
        if let Some(offset) = query.offset {
            sqlx_query = sqlx_query.bind(offset as i64);
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_document).collect()
    }

    async fn commit(&self, batch: Vec<WriteOp>) -> Result<Vec<Document>> {
        validate_batch(&batch)?;

        let mut tx = self.pool.begin().await?;
        let mut written = Vec::with_capacity(batch.len());

        for op in batch {
            let doc = match op {
                WriteOp::Insert(doc) => Self::insert_in(&mut tx, doc).await?,
                WriteOp::Update {
                    document,
                    expected_version,
                } => Self::update_in(&mut tx, document, expected_version).await?,
            };
            written.push(doc);
        }

        tx.commit().await?;
        Ok(written)
    }
}
