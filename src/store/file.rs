//! File-backed storage: one file per key under a base directory.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tracing::info;

use super::traits::KeyValueStorage;
use crate::error::StorageError;

/// Durable storage rooted at a directory on disk.
pub struct FileStorage {
    base_path: PathBuf,
}

impl FileStorage {
    /// Open (or create) a storage directory.
    pub async fn open(base_path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path).await?;
        info!(path = %base_path.display(), "Guide storage opened");
        Ok(Self { base_path })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Anything outside [A-Za-z0-9_-] becomes `_`.
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.base_path.join(format!("{safe}.json"))
    }
}

#[async_trait]
impl KeyValueStorage for FileStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Read {
                key: key.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::write(self.path_for(key), value)
            .await
            .map_err(|e| StorageError::Write {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}
