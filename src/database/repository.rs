use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::database::store::{Document, DocumentStore, StoreError};
use crate::filter::Filter;

/// How many times `update_with` re-reads and re-applies a mutation after
/// losing a compare-and-swap race before giving up.
const MAX_UPDATE_ATTEMPTS: usize = 5;

/// A type stored as one document per value in a named collection.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync {
    const COLLECTION: &'static str;

    fn id(&self) -> Uuid;
}

/// Typed access to one collection of a shared `DocumentStore`.
pub struct Repository<T> {
    store: Arc<dyn DocumentStore>,
    _phantom: std::marker::PhantomData<fn() -> T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<T: Entity> Repository<T> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _phantom: std::marker::PhantomData,
        }
    }

    fn decode(doc: Document) -> Result<T, StoreError> {
        Ok(serde_json::from_value(doc.body)?)
    }

    pub async fn insert(&self, entity: T) -> Result<T, StoreError> {
        let body = serde_json::to_value(&entity)?;
        let doc = self.store.insert(T::COLLECTION, entity.id(), body).await?;
        Self::decode(doc)
    }

    pub async fn select_id(&self, id: Uuid) -> Result<Option<T>, StoreError> {
        self.store
            .find_by_id(T::COLLECTION, id)
            .await?
            .map(Self::decode)
            .transpose()
    }

    pub async fn select_404(&self, id: Uuid) -> Result<T, StoreError> {
        self.select_id(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("{}/{}", T::COLLECTION, id)))
    }

    pub async fn select_one(&self, filter: Filter) -> Result<Option<T>, StoreError> {
        self.store
            .find_one(T::COLLECTION, &filter)
            .await?
            .map(Self::decode)
            .transpose()
    }

    pub async fn select_any(&self, filter: Filter) -> Result<Vec<T>, StoreError> {
        self.store
            .find_many(T::COLLECTION, &filter)
            .await?
            .into_iter()
            .map(Self::decode)
            .collect()
    }

    /// Read, mutate in memory, then write back only if nobody else wrote in
    /// between. On a lost race the mutation is re-applied to the fresh
    /// document. Returns `Ok(None)` if the document does not exist.
    ///
    /// An error from `mutate` aborts without writing anything.
    pub async fn update_with<F, E>(&self, id: Uuid, mut mutate: F) -> Result<Option<T>, E>
    where
        F: FnMut(&mut T) -> Result<(), E> + Send,
        E: From<StoreError>,
    {
        for attempt in 1..=MAX_UPDATE_ATTEMPTS {
            let Some(doc) = self.store.find_by_id(T::COLLECTION, id).await? else {
                return Ok(None);
            };
            let version = doc.version;
            let mut entity = Self::decode(doc)?;

            mutate(&mut entity)?;

            let body = serde_json::to_value(&entity).map_err(StoreError::from)?;
            match self.store.replace(T::COLLECTION, id, version, body).await {
                Ok(stored) => return Ok(Some(Self::decode(stored)?)),
                Err(StoreError::VersionConflict { .. }) => {
                    tracing::debug!(
                        "Concurrent write on {}/{} (attempt {}), re-applying",
                        T::COLLECTION,
                        id,
                        attempt
                    );
                }
                Err(StoreError::NotFound(_)) => return Ok(None),
                Err(e) => return Err(e.into()),
            }
        }

        Err(StoreError::Contention {
            collection: T::COLLECTION.to_string(),
            id,
        }
        .into())
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        self.store.delete(T::COLLECTION, id).await
    }

    pub async fn delete_any(&self, filter: Filter) -> Result<u64, StoreError> {
        self.store.delete_many(T::COLLECTION, &filter).await
    }
}
