//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use async_trait::async_trait;
use mediatree_core::{MediaTreeError, StorageBackend};
use std::path::Path;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for MediaTreeError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::ConfigError(msg) => MediaTreeError::InvalidConfiguration(msg),
            other => MediaTreeError::Storage(other.to_string()),
        }
    }
}

/// Storage abstraction trait
///
/// A named filesystem resolves to one of these. Keys come from a naming
/// strategy; see the crate root documentation for the key format.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Write `data` at `storage_key`, replacing any existing object, and return its URL
    async fn write(&self, storage_key: &str, data: Vec<u8>, content_type: &str)
        -> StorageResult<String>;

    /// Read the object stored at `storage_key`
    async fn read(&self, storage_key: &str) -> StorageResult<Vec<u8>>;

    /// Delete the object at `storage_key`; deleting a missing object succeeds
    async fn delete(&self, storage_key: &str) -> StorageResult<()>;

    /// Check if an object exists
    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;

    /// Public URL of the object at `storage_key`
    fn url(&self, storage_key: &str) -> String;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;

    /// Copy a local file into storage
    async fn write_file(
        &self,
        storage_key: &str,
        path: &Path,
        content_type: &str,
    ) -> StorageResult<String> {
        let data = tokio::fs::read(path).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to read {}: {}", path.display(), e))
        })?;
        self.write(storage_key, data, content_type).await
    }
}
