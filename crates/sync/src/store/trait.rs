use std::sync::Arc;

use async_trait::async_trait;
use pantry_core::LocalId;
use thiserror::Error;

use crate::types::StoredRecord;

/// Local store operation error.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<anyhow::Error> for StoreError {
    fn from(err: anyhow::Error) -> Self {
        StoreError::Storage(format!("{err:#}"))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Key/value storage for records, partitioned by collection and keyed by
/// [`LocalId`].
///
/// Implementations must:
/// - survive process restarts (except the in-memory one)
/// - make `put` an upsert (the latest write for a key wins)
/// - treat `remove` of an unknown key as success
/// - return records of a collection in `LocalId` order (creation order)
#[async_trait]
pub trait LocalStore: Send + Sync {
    async fn load(&self, collection: &str) -> Result<Vec<StoredRecord>, StoreError>;

    async fn put(&self, collection: &str, record: &StoredRecord) -> Result<(), StoreError>;

    async fn remove(&self, collection: &str, local_id: LocalId) -> Result<(), StoreError>;
}

#[async_trait]
impl<S> LocalStore for Arc<S>
where
    S: LocalStore + ?Sized,
{
    async fn load(&self, collection: &str) -> Result<Vec<StoredRecord>, StoreError> {
        (**self).load(collection).await
    }

    async fn put(&self, collection: &str, record: &StoredRecord) -> Result<(), StoreError> {
        (**self).put(collection, record).await
    }

    async fn remove(&self, collection: &str, local_id: LocalId) -> Result<(), StoreError> {
        (**self).remove(collection, local_id).await
    }
}
