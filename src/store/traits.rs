//! `KeyValueStorage` trait: the durable storage the guide persists into.
//!
//! Values are opaque strings, the way browser local storage holds them.
//! Callers own the encoding; the progress store needs the raw text to report
//! corrupt blobs.

use async_trait::async_trait;

use crate::error::StorageError;

/// Backend-agnostic durable key-value storage.
#[async_trait]
pub trait KeyValueStorage: Send + Sync {
    /// Read a value. `Ok(None)` when the key was never written.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write (overwrite) a value.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete a value. Returns whether the key existed.
    async fn remove(&self, key: &str) -> Result<bool, StorageError>;
}
