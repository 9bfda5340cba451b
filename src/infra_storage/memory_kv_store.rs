use crate::domain_port::{KvStore, StorageError};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// Process-local store. `fail_writes` makes every write fail, for
/// exercising storage errors.
#[derive(Default)]
pub struct MemoryKvStore {
    items: DashMap<String, String>,
    fail_writes: AtomicBool,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn check_writable(&self) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Io("store is read-only".to_string()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl KvStore for MemoryKvStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items.get(key).map(|v| v.value().clone()))
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check_writable()?;
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.check_writable()?;
        self.items.remove(key);
        Ok(())
    }
}
