use async_trait::async_trait;
use tokio::sync::{broadcast, Mutex};

use super::{apply_remove, apply_set, select, KvStore, Map, StorageChange};
use crate::error::StorageError;

/// Process-local store. Contents vanish with the process.
pub struct MemoryStore {
    data: Mutex<Map>,
    changes: broadcast::Sender<StorageChange>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_contents(Map::new())
    }

    pub fn with_contents(data: Map) -> Self {
        let (changes, _) = broadcast::channel(64);
        Self {
            data: Mutex::new(data),
            changes,
        }
    }

    /// Copy of everything stored.
    pub async fn snapshot(&self) -> Map {
        self.data.lock().await.clone()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, keys: &[&str]) -> Result<Map, StorageError> {
        Ok(select(&*self.data.lock().await, keys))
    }

    async fn set(&self, values: Map) -> Result<(), StorageError> {
        let change = apply_set(&mut *self.data.lock().await, values);
        if !change.is_empty() {
            self.changes.send(change).ok();
        }
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> Result<(), StorageError> {
        let change = apply_remove(&mut *self.data.lock().await, keys);
        if !change.is_empty() {
            self.changes.send(change).ok();
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn get_returns_only_present_keys() {
        let store = MemoryStore::new();
        let mut values = Map::new();
        values.insert("phase".into(), json!("study"));
        store.set(values).await.unwrap();

        let got = store.get(&["phase", "deadline"]).await.unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got["phase"], json!("study"));
    }

    #[tokio::test]
    async fn subscribers_see_changes_but_not_noops() {
        let store = MemoryStore::new();
        let mut rx = store.subscribe();

        let mut values = Map::new();
        values.insert("deadline".into(), json!(10));
        store.set(values.clone()).await.unwrap();
        store.set(values).await.unwrap();
        store.remove(&["deadline"]).await.unwrap();

        let first = rx.recv().await.unwrap();
        assert_eq!(first.changes["deadline"].new, Some(json!(10)));
        let second = rx.recv().await.unwrap();
        assert_eq!(second.changes["deadline"].new, None);
        assert!(rx.try_recv().is_err());
    }
}
