//! Store wrapper whose reads and writes can be switched off.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::broadcast;

use super::{KvStore, Map, MemoryStore, StorageChange};
use crate::error::StorageError;

pub struct FlakyStore {
    inner: MemoryStore,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl FlakyStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check(flag: &AtomicBool, op: &str) -> Result<(), StorageError> {
        if flag.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable(format!("{op} switched off")));
        }
        Ok(())
    }
}

#[async_trait]
impl KvStore for FlakyStore {
    async fn get(&self, keys: &[&str]) -> Result<Map, StorageError> {
        Self::check(&self.fail_reads, "get")?;
        self.inner.get(keys).await
    }

    async fn set(&self, values: Map) -> Result<(), StorageError> {
        Self::check(&self.fail_writes, "set")?;
        self.inner.set(values).await
    }

    async fn remove(&self, keys: &[&str]) -> Result<(), StorageError> {
        Self::check(&self.fail_writes, "remove")?;
        self.inner.remove(keys).await
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.inner.subscribe()
    }
}
