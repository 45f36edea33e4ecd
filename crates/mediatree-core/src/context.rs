//! Per-media-type configuration bundle
//!
//! A [`Context`] is immutable after construction. Its variant tree is built on
//! first request and cached for the lifetime of the instance; there is no
//! invalidation. A context with a different configuration is a new instance.

use serde_json::{Map, Value as JsonValue};
use std::sync::{Arc, Mutex, OnceLock};

use crate::config::{ContextConfig, VariantDefinitions};
use crate::error::{MediaTreeError, Result};
use crate::tree::VariantTree;

#[derive(Debug)]
pub struct Context {
    config: ContextConfig,
    tree: OnceLock<Arc<VariantTree>>,
    build_lock: Mutex<()>,
}

impl Context {
    /// Create a context, rejecting a default variant that is not declared.
    pub fn new(config: ContextConfig) -> Result<Self> {
        if !config.variants.contains(&config.default_variant) {
            return Err(MediaTreeError::InvalidConfiguration(format!(
                "Context \"{}\": default variant \"{}\" is not declared in its variants",
                config.name, config.default_variant
            )));
        }
        Ok(Self {
            config,
            tree: OnceLock::new(),
            build_lock: Mutex::new(()),
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn provider_name(&self) -> &str {
        &self.config.provider
    }

    pub fn provider_options(&self) -> &Map<String, JsonValue> {
        &self.config.provider_options
    }

    pub fn filesystem_name(&self) -> &str {
        &self.config.filesystem
    }

    pub fn cdn_name(&self) -> Option<&str> {
        self.config.cdn.as_deref()
    }

    pub fn naming_strategy_name(&self) -> &str {
        &self.config.naming_strategy
    }

    pub fn variants(&self) -> &VariantDefinitions {
        &self.config.variants
    }

    pub fn default_variant(&self) -> &str {
        &self.config.default_variant
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Membership test against the declared variants; does not build the tree.
    pub fn has_variant(&self, name: &str) -> bool {
        self.config.variants.contains(name)
    }

    /// Return the cached tree, building it on first call.
    ///
    /// At most one build runs per instance. A failed build caches nothing, so
    /// calling again on the same instance fails the same way.
    pub fn build_variant_tree(&self) -> Result<Arc<VariantTree>> {
        if let Some(tree) = self.tree.get() {
            return Ok(Arc::clone(tree));
        }

        let _guard = self
            .build_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(tree) = self.tree.get() {
            return Ok(Arc::clone(tree));
        }

        let tree = VariantTree::from_definitions(&self.config.variants).map_err(|e| {
            tracing::warn!(context = %self.config.name, error = %e, "Variant tree build failed");
            e
        })?;
        let tree = Arc::new(tree);
        let _ = self.tree.set(Arc::clone(&tree));
        tracing::info!(
            context = %self.config.name,
            variants = tree.len(),
            "Variant tree cached"
        );
        Ok(tree)
    }
}

impl TryFrom<ContextConfig> for Context {
    type Error = MediaTreeError;

    fn try_from(config: ContextConfig) -> Result<Self> {
        Context::new(config)
    }
}
