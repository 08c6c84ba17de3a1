use async_trait::async_trait;
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, postgres::PgRow, PgPool, Row};
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use super::store::{Document, DocumentStore, StoreError};
use super::unique_constraint_name;
use crate::config::DatabaseConfig;
use crate::filter::Filter;

/// Document store over a single Postgres table of JSONB bodies keyed by
/// `(collection, id)`.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    /// Connect using `DATABASE_URL`; failure here is fatal to startup.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let url = config
            .url
            .as_deref()
            .ok_or(StoreError::ConfigMissing("DATABASE_URL"))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await?;

        info!("Connected document store (max_connections={})", config.max_connections);
        Ok(Self { pool })
    }

    /// Create the documents table and one partial unique index per
    /// `(collection, field)` constraint. Idempotent.
    pub async fn bootstrap(&self, constraints: &[(&str, &str)]) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                id UUID NOT NULL,
                version BIGINT NOT NULL DEFAULT 1,
                body JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                PRIMARY KEY (collection, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        for (collection, field) in constraints {
            let index = unique_constraint_name(collection, field);
            let ddl = format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS {} ON documents ((body->>{})) WHERE collection = {}",
                Self::quote_identifier(&index),
                Self::quote_literal(field),
                Self::quote_literal(collection),
            );
            sqlx::query(&ddl).execute(&self.pool).await?;
        }

        info!("Document store schema ready ({} unique constraints)", constraints.len());
        Ok(())
    }

    fn row_to_document(row: PgRow) -> Result<Document, StoreError> {
        Ok(Document {
            id: row.try_get("id")?,
            version: row.try_get("version")?,
            body: row.try_get("body")?,
        })
    }

    fn map_write_error(collection: &str, err: sqlx::Error) -> StoreError {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                return StoreError::UniqueViolation {
                    collection: collection.to_string(),
                    constraint: db.constraint().unwrap_or("documents_pkey").to_string(),
                };
            }
        }
        StoreError::Sqlx(err)
    }

    /// SELECT over one collection with the filter's containment test and sort.
    fn select_sql(filter: &Filter) -> String {
        let mut sql = String::from(
            "SELECT id, version, body FROM documents WHERE collection = $1 AND body @> $2",
        );
        match filter.order_info() {
            // Field names are validated identifiers; timestamps are fixed-width
            // text so byte order is chronological order.
            Some(order) => sql.push_str(&format!(
                " ORDER BY (body->>{}) COLLATE \"C\" {}, created_at",
                Self::quote_literal(&order.field),
                order.sort.to_sql()
            )),
            None => sql.push_str(" ORDER BY created_at"),
        }
        sql
    }

    /// Quote SQL identifier to prevent injection
    fn quote_identifier(name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn quote_literal(value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn insert(&self, collection: &str, id: Uuid, body: Value) -> Result<Document, StoreError> {
        let row = sqlx::query(
            "INSERT INTO documents (collection, id, version, body) VALUES ($1, $2, 1, $3)
             RETURNING id, version, body",
        )
        .bind(collection)
        .bind(id)
        .bind(&body)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Self::map_write_error(collection, e))?;

        Self::row_to_document(row)
    }

    async fn find_by_id(&self, collection: &str, id: Uuid) -> Result<Option<Document>, StoreError> {
        sqlx::query("SELECT id, version, body FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Self::row_to_document)
            .transpose()
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Document>, StoreError> {
        filter.validate()?;
        let sql = format!("{} LIMIT 1", Self::select_sql(filter));
        sqlx::query(&sql)
            .bind(collection)
            .bind(filter.to_containment())
            .fetch_optional(&self.pool)
            .await?
            .map(Self::row_to_document)
            .transpose()
    }

    async fn find_many(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        filter.validate()?;
        let sql = Self::select_sql(filter);
        sqlx::query(&sql)
            .bind(collection)
            .bind(filter.to_containment())
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Self::row_to_document)
            .collect()
    }

    async fn replace(
        &self,
        collection: &str,
        id: Uuid,
        expected_version: i64,
        body: Value,
    ) -> Result<Document, StoreError> {
        let row = sqlx::query(
            "UPDATE documents SET body = $4, version = version + 1, updated_at = now()
             WHERE collection = $1 AND id = $2 AND version = $3
             RETURNING id, version, body",
        )
        .bind(collection)
        .bind(id)
        .bind(expected_version)
        .bind(&body)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Self::map_write_error(collection, e))?;

        if let Some(row) = row {
            return Self::row_to_document(row);
        }

        // Nothing updated: either the document is gone or someone else won
        match self.find_by_id(collection, id).await? {
            Some(_) => Err(StoreError::VersionConflict {
                collection: collection.to_string(),
                id,
            }),
            None => Err(StoreError::NotFound(format!("{}/{}", collection, id))),
        }
    }

    async fn delete(&self, collection: &str, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        filter.validate()?;
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND body @> $2")
            .bind(collection)
            .bind(filter.to_containment())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Pings the pool to ensure connectivity
    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
