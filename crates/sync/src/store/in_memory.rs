use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use pantry_core::LocalId;

use super::r#trait::{LocalStore, StoreError};
use crate::types::StoredRecord;

/// In-memory local store.
///
/// Intended for tests/dev. Writes can be made to fail with
/// [`fail_writes`](Self::fail_writes) to exercise storage error paths.
#[derive(Debug, Default)]
pub struct InMemoryLocalStore {
    collections: RwLock<BTreeMap<String, BTreeMap<LocalId, StoredRecord>>>,
    fail_writes: AtomicBool,
}

impl InMemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of records stored for `collection`.
    pub fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .map(|c| c.get(collection).map_or(0, BTreeMap::len))
            .unwrap_or(0)
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Storage("writes disabled".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl LocalStore for InMemoryLocalStore {
    async fn load(&self, collection: &str) -> Result<Vec<StoredRecord>, StoreError> {
        let collections = self
            .collections
            .read()
            .map_err(|_| StoreError::Storage("lock poisoned".to_string()))?;

        Ok(collections
            .get(collection)
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn put(&self, collection: &str, record: &StoredRecord) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut collections = self
            .collections
            .write()
            .map_err(|_| StoreError::Storage("lock poisoned".to_string()))?;

        collections
            .entry(collection.to_string())
            .or_default()
            .insert(record.local_id, record.clone());
        Ok(())
    }

    async fn remove(&self, collection: &str, local_id: LocalId) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut collections = self
            .collections
            .write()
            .map_err(|_| StoreError::Storage("lock poisoned".to_string()))?;

        if let Some(records) = collections.get_mut(collection) {
            records.remove(&local_id);
        }
        Ok(())
    }
}
