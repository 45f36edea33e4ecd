//! Filesystem lookup
//!
//! Resolves the filesystem name a context declares to a storage handle.

use mediatree_core::{FilesystemConfig, MediaTreeError, Result};
use std::collections::HashMap;
use std::sync::Arc;

use crate::factory::create_storage;
use crate::traits::Storage;

#[derive(Clone)]
enum Mount {
    Ready(Arc<dyn Storage>),
    /// Declared, but the backend could not be created
    Unavailable(String),
}

/// Map of storage handles indexed by filesystem name
#[derive(Clone, Default)]
pub struct FilesystemMap {
    mounts: HashMap<String, Mount>,
}

impl FilesystemMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a storage handle, replacing any previous entry with that name
    pub fn register(&mut self, name: impl Into<String>, storage: Arc<dyn Storage>) {
        self.mounts.insert(name.into(), Mount::Ready(storage));
    }

    pub fn with(mut self, name: impl Into<String>, storage: Arc<dyn Storage>) -> Self {
        self.register(name, storage);
        self
    }

    /// Record a declared filesystem whose backend is unusable; lookups of it
    /// fail with `InvalidConfiguration` and `reason`.
    pub fn register_unavailable(&mut self, name: impl Into<String>, reason: impl Into<String>) {
        self.mounts.insert(name.into(), Mount::Unavailable(reason.into()));
    }

    /// Create every declared backend. A backend that fails to initialize does
    /// not abort the others; it is reported when looked up.
    pub async fn from_config(declarations: &[FilesystemConfig]) -> Self {
        let mut map = FilesystemMap::new();
        for declaration in declarations {
            match create_storage(declaration).await {
                Ok(storage) => {
                    tracing::debug!(
                        filesystem = %declaration.name,
                        backend = %storage.backend_type(),
                        "Filesystem mounted"
                    );
                    map.register(declaration.name.clone(), storage);
                }
                Err(e) => {
                    tracing::warn!(filesystem = %declaration.name, error = %e, "Filesystem unavailable");
                    map.register_unavailable(declaration.name.clone(), e.to_string());
                }
            }
        }
        map
    }

    /// Resolve a filesystem by name
    pub fn get(&self, name: &str) -> Result<Arc<dyn Storage>> {
        match self.mounts.get(name) {
            Some(Mount::Ready(storage)) => Ok(Arc::clone(storage)),
            Some(Mount::Unavailable(reason)) => Err(MediaTreeError::InvalidConfiguration(format!(
                "Filesystem \"{}\" is not a usable storage: {}",
                name, reason
            ))),
            None => Err(MediaTreeError::NotFound(format!(
                "No filesystem registered for name \"{}\"",
                name
            ))),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.mounts.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.mounts.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStorage;

    #[test]
    fn test_get_registered() {
        let map = FilesystemMap::new().with("media", Arc::new(MemoryStorage::default()));
        assert!(map.get("media").is_ok());
        assert!(map.contains("media"));
        assert_eq!(map.names(), vec!["media"]);
    }

    #[test]
    fn test_get_unknown() {
        let map = FilesystemMap::new();
        let err = map.get("missing").err().unwrap();
        assert!(matches!(err, MediaTreeError::NotFound(ref msg) if msg.contains("missing")));
    }

    #[tokio::test]
    async fn test_from_config_records_unusable_backend() {
        let declarations = vec![
            FilesystemConfig {
                name: "memory".to_string(),
                backend: "memory".to_string(),
                path: None,
                base_url: None,
            },
            FilesystemConfig {
                name: "broken".to_string(),
                backend: "local".to_string(),
                path: None,
                base_url: None,
            },
        ];
        let map = FilesystemMap::from_config(&declarations).await;
        assert!(map.get("memory").is_ok());
        let err = map.get("broken").err().unwrap();
        assert!(matches!(err, MediaTreeError::InvalidConfiguration(_)));
    }
}
