//! In-memory storage backend.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::traits::KeyValueStorage;
use crate::error::StorageError;

/// Storage that lives as long as the process. Used by tests and headless runs.
#[derive(Default)]
pub struct MemoryStorage {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a key (e.g. a blob written by an older release).
    pub fn with_value(key: &str, value: &str) -> Self {
        let mut values = HashMap::new();
        values.insert(key.to_string(), value.to_string());
        Self {
            values: RwLock::new(values),
        }
    }
}

#[async_trait]
impl KeyValueStorage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.values.write().await.remove(key).is_some())
    }
}
