//! Provider registry
//!
//! Maps provider names to factories. Every [`ProviderRegistry::create`] call
//! returns a fresh instance so options and the temp-file ledger are never
//! shared between two saves.

use mediatree_core::{Context, MediaTreeError, Result};
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::provider::Provider;
use crate::providers::{FileProvider, VimeoProvider, YoutubeProvider};

pub type ProviderFactory = Arc<dyn Fn() -> Box<dyn Provider> + Send + Sync>;

#[derive(Clone)]
pub struct ProviderRegistry {
    factories: Arc<RwLock<HashMap<String, ProviderFactory>>>,
    temp_dir: Option<PathBuf>,
}

impl ProviderRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            factories: Arc::new(RwLock::new(HashMap::new())),
            temp_dir: None,
        }
    }

    /// Registry with the built-in providers
    pub async fn with_defaults() -> Self {
        let registry = Self::new();
        #[cfg(feature = "image")]
        registry
            .register(crate::providers::image::NAME, || {
                Box::new(crate::providers::ImageProvider::new())
            })
            .await;
        registry
            .register(crate::providers::file::NAME, || Box::new(FileProvider::new()))
            .await;
        registry
            .register(crate::providers::youtube::NAME, || Box::new(YoutubeProvider::new()))
            .await;
        registry
            .register(crate::providers::vimeo::NAME, || Box::new(VimeoProvider::new()))
            .await;
        registry
    }

    /// Directory handed to every created provider for its working files
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Register a factory under `name`, replacing any previous one
    pub async fn register<F>(&self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn Provider> + Send + Sync + 'static,
    {
        let name = name.into();
        tracing::debug!(provider = %name, "Provider registered");
        self.factories.write().await.insert(name, Arc::new(factory));
    }

    /// New provider instance with `options` merged over its defaults
    pub async fn create(
        &self,
        name: &str,
        options: &Map<String, JsonValue>,
    ) -> Result<Box<dyn Provider>> {
        let factory = self
            .factories
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| {
                MediaTreeError::NotFound(format!("No provider registered for name \"{}\"", name))
            })?;

        let mut provider = factory();
        if let Some(dir) = &self.temp_dir {
            provider.support_mut().set_temp_dir(dir.clone());
        }
        provider.set_options(options);
        Ok(provider)
    }

    /// Provider configured for `context`
    pub async fn create_for(&self, context: &Context) -> Result<Box<dyn Provider>> {
        self.create(context.provider_name(), context.provider_options())
            .await
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.factories.read().await.contains_key(name)
    }

    /// Registered provider names, sorted
    pub async fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.read().await.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediatree_core::{ContextConfig, VariantDefinition, VariantDefinitions};
    use serde_json::json;

    fn context(provider: &str, options: serde_json::Value) -> Context {
        Context::new(ContextConfig {
            name: "videos".to_string(),
            provider: provider.to_string(),
            provider_options: options.as_object().cloned().unwrap(),
            filesystem: "memory".to_string(),
            cdn: None,
            naming_strategy: "slug".to_string(),
            variants: VariantDefinitions::new().with("default", VariantDefinition::root()),
            default_variant: "default".to_string(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_defaults_registered() {
        let registry = ProviderRegistry::with_defaults().await;
        assert!(registry.contains("file").await);
        assert!(registry.contains("youtube").await);
        assert!(registry.contains("vimeo").await);
        #[cfg(feature = "image")]
        assert_eq!(registry.list().await, vec!["file", "image", "vimeo", "youtube"]);
    }

    #[tokio::test]
    async fn test_unknown_provider_is_not_found() {
        let registry = ProviderRegistry::with_defaults().await;
        let err = registry.create("flickr", &Map::new()).await.err().unwrap();
        assert!(matches!(err, MediaTreeError::NotFound(msg) if msg.contains("flickr")));
    }

    #[tokio::test]
    async fn test_create_for_context_applies_options() {
        let registry = ProviderRegistry::with_defaults()
            .await
            .with_temp_dir("/tmp/mediatree-test");
        let context = context("youtube", json!({"width": 800}));

        let provider = registry.create_for(&context).await.unwrap();
        assert_eq!(provider.name(), "youtube");
        assert_eq!(provider.options().get("width"), Some(&json!(800)));
        assert_eq!(provider.options().get("height"), Some(&json!(315)));
        assert_eq!(
            provider.support().temp_dir(),
            std::path::Path::new("/tmp/mediatree-test")
        );
    }

    #[tokio::test]
    async fn test_instances_are_independent() {
        let registry = ProviderRegistry::with_defaults().await;
        let a = registry.create("file", &Map::new()).await.unwrap();
        let b = registry.create("file", &Map::new()).await.unwrap();
        a.support().add_temp_file("/tmp/only-in-a");
        assert_eq!(a.temp_files().len(), 1);
        assert!(b.temp_files().is_empty());
    }
}
