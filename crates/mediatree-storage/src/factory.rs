#[cfg(feature = "storage-local")]
use crate::LocalStorage;
use crate::{MemoryStorage, Storage, StorageBackend, StorageError, StorageResult};
use mediatree_core::FilesystemConfig;
use std::sync::Arc;

/// Create a storage backend from a filesystem declaration
pub async fn create_storage(config: &FilesystemConfig) -> StorageResult<Arc<dyn Storage>> {
    let backend = config
        .backend
        .parse::<StorageBackend>()
        .map_err(|e| StorageError::ConfigError(format!("Filesystem \"{}\": {}", config.name, e)))?;

    match backend {
        #[cfg(feature = "storage-local")]
        StorageBackend::Local => {
            let base_path = config.path.clone().ok_or_else(|| {
                StorageError::ConfigError(format!(
                    "Filesystem \"{}\": local backend requires a path",
                    config.name
                ))
            })?;
            let base_url = config.base_url.clone().ok_or_else(|| {
                StorageError::ConfigError(format!(
                    "Filesystem \"{}\": local backend requires a base_url",
                    config.name
                ))
            })?;

            let storage = LocalStorage::new(base_path, base_url).await?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-local"))]
        StorageBackend::Local => Err(StorageError::ConfigError(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        )),

        StorageBackend::Memory => {
            let base_url = config
                .base_url
                .clone()
                .unwrap_or_else(|| format!("memory://{}", config.name));
            Ok(Arc::new(MemoryStorage::new(base_url)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn declaration(backend: &str) -> FilesystemConfig {
        FilesystemConfig {
            name: "media".to_string(),
            backend: backend.to_string(),
            path: None,
            base_url: None,
        }
    }

    #[tokio::test]
    async fn test_create_memory_storage() {
        let storage = create_storage(&declaration("memory")).await.unwrap();
        assert_eq!(storage.backend_type(), StorageBackend::Memory);
        assert_eq!(storage.url("a.png"), "memory://media/a.png");
    }

    #[tokio::test]
    async fn test_unknown_backend() {
        let result = create_storage(&declaration("ftp")).await;
        assert!(matches!(result, Err(StorageError::ConfigError(_))));
    }

    #[cfg(feature = "storage-local")]
    #[tokio::test]
    async fn test_local_requires_path() {
        let result = create_storage(&declaration("local")).await;
        assert!(matches!(result, Err(StorageError::ConfigError(_))));

        let dir = tempfile::tempdir().unwrap();
        let mut config = declaration("local");
        config.path = Some(dir.path().to_path_buf());
        config.base_url = Some("http://localhost/media".to_string());
        let storage = create_storage(&config).await.unwrap();
        assert_eq!(storage.backend_type(), StorageBackend::Local);
    }
}
