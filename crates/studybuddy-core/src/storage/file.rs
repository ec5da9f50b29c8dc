//! JSON-document store on disk.
//!
//! The whole map is rewritten on every mutation: temp file first, then a
//! rename over the real path, so a crash leaves either the old document or
//! the new one.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::{broadcast, Mutex};
use tracing::debug;

use super::{apply_remove, apply_set, data_dir, select, KvStore, Map, StorageChange};
use crate::error::{ConfigError, StorageError};

pub struct JsonFileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
    changes: broadcast::Sender<StorageChange>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let (changes, _) = broadcast::channel(64);
        Self {
            path: path.into(),
            lock: Mutex::new(()),
            changes,
        }
    }

    /// Store at `<data_dir>/storage.json`.
    pub fn open_default() -> Result<Self, ConfigError> {
        Ok(Self::new(data_dir()?.join("storage.json")))
    }

    async fn read_all(&self) -> Result<Map, StorageError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(Map::new()),
            Ok(content) => serde_json::from_str(&content)
                .map_err(|e| StorageError::Corrupt(format!("{}: {e}", self.path.display()))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Map::new()),
            Err(e) => Err(StorageError::ReadFailed {
                path: self.path.clone(),
                message: e.to_string(),
            }),
        }
    }

    async fn write_all(&self, data: &Map) -> Result<(), StorageError> {
        let write_err = |e: &dyn std::fmt::Display| StorageError::WriteFailed {
            path: self.path.clone(),
            message: e.to_string(),
        };

        let content = serde_json::to_string_pretty(data).map_err(|e| write_err(&e))?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| write_err(&e))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content)
            .await
            .map_err(|e| write_err(&e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| write_err(&e))?;
        debug!(path = %self.path.display(), keys = data.len(), "store written");
        Ok(())
    }
}

#[async_trait]
impl KvStore for JsonFileStore {
    async fn get(&self, keys: &[&str]) -> Result<Map, StorageError> {
        let _guard = self.lock.lock().await;
        let data = self.read_all().await?;
        Ok(select(&data, keys))
    }

    async fn set(&self, values: Map) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        let mut data = self.read_all().await?;
        let change = apply_set(&mut data, values);
        if change.is_empty() {
            return Ok(());
        }
        self.write_all(&data).await?;
        self.changes.send(change).ok();
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        let mut data = self.read_all().await?;
        let change = apply_remove(&mut data, keys);
        if change.is_empty() {
            return Ok(());
        }
        self.write_all(&data).await?;
        self.changes.send(change).ok();
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
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_file_reads_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("storage.json"));
        assert!(store.get(&["phase"]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn values_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("storage.json");

        let store = JsonFileStore::new(&path);
        let mut values = Map::new();
        values.insert("phase".into(), json!("break"));
        values.insert("deadline".into(), json!(1_700_000_000_000i64));
        store.set(values).await.unwrap();
        drop(store);

        let reopened = JsonFileStore::new(&path);
        let got = reopened.get(&["phase", "deadline"]).await.unwrap();
        assert_eq!(got["phase"], json!("break"));
        assert_eq!(got["deadline"], json!(1_700_000_000_000i64));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn corrupt_document_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = JsonFileStore::new(&path);
        let err = store.get(&["phase"]).await.unwrap_err();
        assert!(matches!(err, StorageError::Corrupt(_)));
    }

    #[tokio::test]
    async fn remove_deletes_keys() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("storage.json"));
        let mut values = Map::new();
        values.insert("allowedWebsites".into(), json!(["https://example.com"]));
        store.set(values).await.unwrap();

        let mut rx = store.subscribe();
        store.remove(&["allowedWebsites"]).await.unwrap();
        assert!(store.get(&["allowedWebsites"]).await.unwrap().is_empty());
        assert!(rx.recv().await.unwrap().touches("allowedWebsites"));
    }
}
