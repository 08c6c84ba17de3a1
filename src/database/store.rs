use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::filter::{Filter, FilterError};

/// Errors from a `DocumentStore`
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unique constraint '{constraint}' violated in {collection}")]
    UniqueViolation { collection: String, constraint: String },

    #[error("Version conflict on {collection}/{id}")]
    VersionConflict { collection: String, id: Uuid },

    #[error("Gave up updating {collection}/{id} after repeated concurrent modification")]
    Contention { collection: String, id: Uuid },

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("Document serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// A stored JSON document. `version` starts at 1 and increases by one on every
/// successful `replace`.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: Uuid,
    pub version: i64,
    pub body: Value,
}

/// Persistent collections of JSON documents addressed by id.
///
/// Each call is a single atomic operation on the backing store. `replace` is a
/// compare-and-swap: it only writes when the stored version still equals
/// `expected_version`, which lets callers run read-modify-write sequences
/// without losing concurrent updates.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert(&self, collection: &str, id: Uuid, body: Value) -> Result<Document, StoreError>;

    async fn find_by_id(&self, collection: &str, id: Uuid) -> Result<Option<Document>, StoreError>;

    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Document>, StoreError>;

    /// Matching documents, in filter order or insertion order when unsorted.
    async fn find_many(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, StoreError>;

    async fn replace(
        &self,
        collection: &str,
        id: Uuid,
        expected_version: i64,
        body: Value,
    ) -> Result<Document, StoreError>;

    async fn delete(&self, collection: &str, id: Uuid) -> Result<bool, StoreError>;

    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}
