//! In-process key-value backend.
//!
//! Holds all items in one ordered map guarded by a mutex, which gives the
//! same prefix-scan ordering as the managed store. Every batch delete is
//! fully processed.

use crate::repo::kv_backend::{
    ensure_batch_size, BackendError, BackendResult, Item, ItemKey, KvBackend, StoredItem,
    WriteCondition, BATCH_WRITE_LIMIT,
};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

/// Mutex-guarded ordered map keyed by `(partition, sort)`.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    items: Mutex<BTreeMap<ItemKey, Item>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored items across all partitions.
    pub fn len(&self) -> usize {
        self.lock().map(|items| items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> BackendResult<MutexGuard<'_, BTreeMap<ItemKey, Item>>> {
        self.items
            .lock()
            .map_err(|_| BackendError::Unavailable("memory backend lock poisoned".to_string()))
    }
}

impl KvBackend for MemoryBackend {
    fn put_item(&self, key: &ItemKey, item: &Item) -> BackendResult<()> {
        self.lock()?.insert(key.clone(), item.clone());
        Ok(())
    }

    fn get_item(&self, key: &ItemKey) -> BackendResult<Option<Item>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn update_item(
        &self,
        key: &ItemKey,
        changes: &Item,
        condition: WriteCondition,
    ) -> BackendResult<()> {
        let mut items = self.lock()?;
        if condition == WriteCondition::ItemExists && !items.contains_key(key) {
            return Err(BackendError::ConditionFailed(key.clone()));
        }
        let entry = items.entry(key.clone()).or_default();
        for (name, value) in changes {
            entry.insert(name.clone(), value.clone());
        }
        Ok(())
    }

    fn delete_item(&self, key: &ItemKey) -> BackendResult<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn query_prefix(&self, partition: &str, sort_prefix: &str) -> BackendResult<Vec<StoredItem>> {
        let items = self.lock()?;
        let start = ItemKey::new(partition, sort_prefix);
        Ok(items
            .range(start..)
            .take_while(|(key, _)| key.partition == partition && key.sort.starts_with(sort_prefix))
            .map(|(key, item)| StoredItem {
                key: key.clone(),
                item: item.clone(),
            })
            .collect())
    }

    fn batch_delete(&self, keys: &[ItemKey]) -> BackendResult<Vec<ItemKey>> {
        ensure_batch_size(keys, BATCH_WRITE_LIMIT)?;
        let mut items = self.lock()?;
        for key in keys {
            items.remove(key);
        }
        Ok(Vec::new())
    }
}
