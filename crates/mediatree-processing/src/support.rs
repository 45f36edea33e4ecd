//! Behavior shared by every provider
//!
//! Concrete providers embed a [`ProviderSupport`] and expose it through
//! [`Provider::support`](crate::provider::Provider::support); the trait's default
//! methods (option merging, change detection, temp-file cleanup) delegate here.

use mediatree_core::{Media, Result};
use serde_json::{Map, Value as JsonValue};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use uuid::Uuid;

const TEMP_FILE_PREFIX: &str = "mediatree-";

#[derive(Debug)]
pub struct ProviderSupport {
    defaults: Map<String, JsonValue>,
    options: Map<String, JsonValue>,
    temp_dir: PathBuf,
    temp_files: Mutex<Vec<PathBuf>>,
}

impl ProviderSupport {
    /// Create support state with the provider's declared default options in effect.
    pub fn new(defaults: Map<String, JsonValue>) -> Self {
        Self {
            options: defaults.clone(),
            defaults,
            temp_dir: std::env::temp_dir(),
            temp_files: Mutex::new(Vec::new()),
        }
    }

    pub fn defaults(&self) -> &Map<String, JsonValue> {
        &self.defaults
    }

    /// Effective options become the defaults with every supplied key overwritten.
    /// Unknown keys are kept as-is.
    pub fn set_options(&mut self, supplied: &Map<String, JsonValue>) {
        let mut merged = self.defaults.clone();
        for (key, value) in supplied {
            merged.insert(key.clone(), value.clone());
        }
        self.options = merged;
    }

    pub fn options(&self) -> &Map<String, JsonValue> {
        &self.options
    }

    pub fn option_u32(&self, key: &str) -> Option<u32> {
        self.options
            .get(key)
            .and_then(JsonValue::as_u64)
            .and_then(|v| u32::try_from(v).ok())
    }

    pub fn option_bool(&self, key: &str) -> Option<bool> {
        self.options.get(key).and_then(JsonValue::as_bool)
    }

    pub fn option_str(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(JsonValue::as_str)
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    pub fn set_temp_dir(&mut self, dir: impl Into<PathBuf>) {
        self.temp_dir = dir.into();
    }

    /// Default change detection: any submitted content counts as new content.
    pub fn has_changed_content(&self, media: &Media) -> bool {
        media.content.is_some()
    }

    /// Track a working file for later cleanup
    pub fn add_temp_file(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        tracing::trace!(path = %path.display(), "Temp file registered");
        self.ledger().push(path);
    }

    /// Allocate a unique path under the temp dir and register it.
    pub fn new_temp_path(&self, extension: &str) -> PathBuf {
        let extension = extension.trim_start_matches('.');
        let file_name = if extension.is_empty() {
            format!("{}{}", TEMP_FILE_PREFIX, Uuid::new_v4())
        } else {
            format!("{}{}.{}", TEMP_FILE_PREFIX, Uuid::new_v4(), extension)
        };
        let path = self.temp_dir.join(file_name);
        self.add_temp_file(path.clone());
        path
    }

    /// Snapshot of the ledger, in registration order
    pub fn temp_files(&self) -> Vec<PathBuf> {
        self.ledger().clone()
    }

    /// Delete every registered temp file in registration order.
    ///
    /// Files that no longer exist are skipped. Other failures (e.g. permission
    /// denied) stop the cleanup and are returned. The ledger is not cleared, so
    /// a later call walks the same entries again.
    pub async fn remove_temp_files(&self) -> Result<()> {
        let files = self.temp_files();
        let mut removed = 0usize;
        for path in &files {
            match tokio::fs::remove_file(path).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::error!(path = %path.display(), error = %e, "Failed to remove temp file");
                    return Err(e.into());
                }
            }
        }
        tracing::debug!(registered = files.len(), removed, "Temp files cleaned up");
        Ok(())
    }

    fn ledger(&self) -> std::sync::MutexGuard<'_, Vec<PathBuf>> {
        self.temp_files
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ProviderSupport {
    fn default() -> Self {
        Self::new(Map::new())
    }
}
