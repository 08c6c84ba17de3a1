use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::store::{Document, DocumentStore, StoreError};
use super::unique_constraint_name;
use crate::filter::Filter;

/// Process-local document store. Backs `--memory` mode and the test suites.
///
/// A single `RwLock` over all collections serializes writers, so every call
/// is atomic with respect to every other.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
    unique: Vec<(String, String)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store enforcing unique `(collection, field)` pairs, mirroring the
    /// indexes the Postgres store creates.
    pub fn with_constraints(constraints: &[(&str, &str)]) -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            unique: constraints
                .iter()
                .map(|(c, f)| (c.to_string(), f.to_string()))
                .collect(),
        }
    }

    fn check_unique(&self, collection: &str, docs: &[Document], id: Uuid, body: &Value) -> Result<(), StoreError> {
        for (_, field) in self.unique.iter().filter(|(c, _)| c == collection) {
            let Some(value) = body.get(field).filter(|v| !v.is_null()) else {
                continue;
            };
            let taken = docs
                .iter()
                .any(|doc| doc.id != id && doc.body.get(field) == Some(value));
            if taken {
                return Err(StoreError::UniqueViolation {
                    collection: collection.to_string(),
                    constraint: unique_constraint_name(collection, field),
                });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(&self, collection: &str, id: Uuid, body: Value) -> Result<Document, StoreError> {
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();

        if docs.iter().any(|doc| doc.id == id) {
            return Err(StoreError::UniqueViolation {
                collection: collection.to_string(),
                constraint: "documents_pkey".to_string(),
            });
        }
        self.check_unique(collection, docs, id, &body)?;

        let doc = Document { id, version: 1, body };
        docs.push(doc.clone());
        Ok(doc)
    }

    async fn find_by_id(&self, collection: &str, id: Uuid) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|doc| doc.id == id))
            .cloned())
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Document>, StoreError> {
        Ok(self.find_many(collection, filter).await?.into_iter().next())
    }

    async fn find_many(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        filter.validate()?;
        let collections = self.collections.read().await;
        let mut found: Vec<Document> = collections
            .get(collection)
            .map(|docs| docs.iter().filter(|doc| filter.matches(&doc.body)).cloned().collect())
            .unwrap_or_default();

        // Stable sort keeps insertion order between equal keys
        found.sort_by(|a, b| filter.compare(&a.body, &b.body));
        Ok(found)
    }

    async fn replace(
        &self,
        collection: &str,
        id: Uuid,
        expected_version: i64,
        body: Value,
    ) -> Result<Document, StoreError> {
        let mut collections = self.collections.write().await;
        let docs = collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::NotFound(format!("{}/{}", collection, id)))?;

        self.check_unique(collection, docs, id, &body)?;

        let doc = docs
            .iter_mut()
            .find(|doc| doc.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("{}/{}", collection, id)))?;

        if doc.version != expected_version {
            return Err(StoreError::VersionConflict {
                collection: collection.to_string(),
                id,
            });
        }

        doc.version += 1;
        doc.body = body;
        Ok(doc.clone())
    }

    async fn delete(&self, collection: &str, id: Uuid) -> Result<bool, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(false);
        };
        let before = docs.len();
        docs.retain(|doc| doc.id != id);
        Ok(docs.len() != before)
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        filter.validate()?;
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let before = docs.len();
        docs.retain(|doc| !filter.matches(&doc.body));
        Ok((before - docs.len()) as u64)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::SortDirection;
    use serde_json::json;

    #[tokio::test]
    async fn insert_and_find() {
        let store = MemoryStore::new();
        let id = Uuid::new_v4();
        store.insert("things", id, json!({ "name": "a" })).await.unwrap();

        let doc = store.find_by_id("things", id).await.unwrap().unwrap();
        assert_eq!(doc.version, 1);
        assert_eq!(doc.body["name"], "a");
        assert!(store.find_by_id("things", Uuid::new_v4()).await.unwrap().is_none());
        assert!(store.find_by_id("other", id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn replace_is_compare_and_swap() {
        let store = MemoryStore::new();
        let id = Uuid::new_v4();
        store.insert("things", id, json!({ "n": 1 })).await.unwrap();

        let updated = store.replace("things", id, 1, json!({ "n": 2 })).await.unwrap();
        assert_eq!(updated.version, 2);

        let stale = store.replace("things", id, 1, json!({ "n": 3 })).await;
        assert!(matches!(stale, Err(StoreError::VersionConflict { .. })));

        let doc = store.find_by_id("things", id).await.unwrap().unwrap();
        assert_eq!(doc.body["n"], 2);
    }

    #[tokio::test]
    async fn replace_missing_document_is_not_found() {
        let store = MemoryStore::new();
        store.insert("things", Uuid::new_v4(), json!({})).await.unwrap();
        let result = store.replace("things", Uuid::new_v4(), 1, json!({})).await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn enforces_unique_fields() {
        let store = MemoryStore::with_constraints(&[("users", "email")]);
        store.insert("users", Uuid::new_v4(), json!({ "email": "a@x.com" })).await.unwrap();

        let dup = store.insert("users", Uuid::new_v4(), json!({ "email": "a@x.com" })).await;
        match dup {
            Err(StoreError::UniqueViolation { constraint, .. }) => {
                assert_eq!(constraint, "documents_users_email_key")
            }
            other => panic!("expected unique violation, got {:?}", other),
        }

        // Other collections are unconstrained
        store.insert("posts", Uuid::new_v4(), json!({ "email": "a@x.com" })).await.unwrap();
        store.insert("posts", Uuid::new_v4(), json!({ "email": "a@x.com" })).await.unwrap();
    }

    #[tokio::test]
    async fn find_many_filters_and_sorts() {
        let store = MemoryStore::new();
        for (n, owner) in [(1, "a"), (3, "b"), (2, "a")] {
            store.insert("things", Uuid::new_v4(), json!({ "n": n, "owner": owner })).await.unwrap();
        }

        let filter = Filter::new().where_eq("owner", "a").order("n", SortDirection::Desc);
        let found = store.find_many("things", &filter).await.unwrap();
        let ns: Vec<i64> = found.iter().map(|d| d.body["n"].as_i64().unwrap()).collect();
        assert_eq!(ns, vec![2, 1]);
    }

    #[tokio::test]
    async fn delete_many_removes_matches_only() {
        let store = MemoryStore::new();
        let keep = Uuid::new_v4();
        store.insert("things", Uuid::new_v4(), json!({ "owner": "a" })).await.unwrap();
        store.insert("things", Uuid::new_v4(), json!({ "owner": "a" })).await.unwrap();
        store.insert("things", keep, json!({ "owner": "b" })).await.unwrap();

        let removed = store.delete_many("things", &Filter::new().where_eq("owner", "a")).await.unwrap();
        assert_eq!(removed, 2);
        assert!(store.find_by_id("things", keep).await.unwrap().is_some());
        assert!(store.delete("things", keep).await.unwrap());
        assert!(!store.delete("things", keep).await.unwrap());
    }
}
