//! Naming strategies
//!
//! A naming strategy maps (media, variant) to the storage key the variant's
//! output is written to. Strategies are deterministic so reprocessing a media
//! overwrites the previous output instead of leaving orphans behind.

use mediatree_core::{Media, MediaTreeError, NamingStrategyConfig, Result, Variant};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;

const FALLBACK_NAME: &str = "media";

/// Generates storage keys for processed variants
pub trait NamingStrategy: Send + Sync {
    /// Storage key for `variant` of `media`; `extension` has no leading dot and may be empty
    fn generate(&self, media: &Media, variant: &Variant, extension: &str) -> String;
}

/// Lowercase ASCII slug: runs of anything but `[a-z0-9]` become a single `-`.
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut pending_dash = false;
    for c in value.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

fn with_extension(stem: String, extension: &str) -> String {
    let extension = extension.trim_start_matches('.');
    if extension.is_empty() {
        stem
    } else {
        format!("{}.{}", stem, extension)
    }
}

/// Variant names go in verbatim, percent-encoded, so distinct names never share a key.
fn encode_variant(name: &str) -> String {
    urlencoding::encode(name).into_owned()
}

/// `{context}/{media-id}/{media-slug}_{variant}.{ext}`
#[derive(Debug, Clone, Copy, Default)]
pub struct SlugNamingStrategy;

impl NamingStrategy for SlugNamingStrategy {
    fn generate(&self, media: &Media, variant: &Variant, extension: &str) -> String {
        let mut name = slugify(&media.name);
        if name.is_empty() {
            name = FALLBACK_NAME.to_string();
        }
        let context = slugify(&media.context);
        let stem = format!("{}/{}_{}", media.id, name, encode_variant(variant.name()));
        if context.is_empty() {
            with_extension(stem, extension)
        } else {
            with_extension(format!("{}/{}", context, stem), extension)
        }
    }
}

/// `ab/cd/{sha256(context, id, name, variant)}.{ext}`, spreading keys over 65536 directories
#[derive(Debug, Clone, Copy, Default)]
pub struct HashedNamingStrategy;

impl NamingStrategy for HashedNamingStrategy {
    fn generate(&self, media: &Media, variant: &Variant, extension: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(media.context.as_bytes());
        hasher.update([0u8]);
        hasher.update(media.id.as_bytes());
        hasher.update([0u8]);
        hasher.update(media.name.as_bytes());
        hasher.update([0u8]);
        hasher.update(variant.name().as_bytes());
        let digest = hex::encode(hasher.finalize());
        with_extension(
            format!("{}/{}/{}", &digest[0..2], &digest[2..4], digest),
            extension,
        )
    }
}

#[derive(Clone)]
enum Slot {
    Ready(Arc<dyn NamingStrategy>),
    /// Declared with a kind no strategy implements
    Unavailable(String),
}

/// Naming strategies indexed by name
#[derive(Clone, Default)]
pub struct NamingStrategyRegistry {
    strategies: HashMap<String, Slot>,
}

impl NamingStrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, strategy: Arc<dyn NamingStrategy>) {
        self.strategies.insert(name.into(), Slot::Ready(strategy));
    }

    pub fn with(mut self, name: impl Into<String>, strategy: Arc<dyn NamingStrategy>) -> Self {
        self.register(name, strategy);
        self
    }

    /// Build strategies from declarations; unknown kinds are kept and reported on lookup.
    pub fn from_config(declarations: &[NamingStrategyConfig]) -> Self {
        let mut registry = NamingStrategyRegistry::new();
        for declaration in declarations {
            match Self::strategy_for_kind(&declaration.kind) {
                Some(strategy) => registry.register(declaration.name.clone(), strategy),
                None => {
                    tracing::warn!(
                        naming_strategy = %declaration.name,
                        kind = %declaration.kind,
                        "Unknown naming strategy kind"
                    );
                    registry.strategies.insert(
                        declaration.name.clone(),
                        Slot::Unavailable(format!("unknown kind \"{}\"", declaration.kind)),
                    );
                }
            }
        }
        registry
    }

    fn strategy_for_kind(kind: &str) -> Option<Arc<dyn NamingStrategy>> {
        match kind.to_lowercase().as_str() {
            "slug" => Some(Arc::new(SlugNamingStrategy)),
            "hashed" => Some(Arc::new(HashedNamingStrategy)),
            _ => None,
        }
    }

    /// Resolve a naming strategy by name
    pub fn get(&self, name: &str) -> Result<Arc<dyn NamingStrategy>> {
        match self.strategies.get(name) {
            Some(Slot::Ready(strategy)) => Ok(Arc::clone(strategy)),
            Some(Slot::Unavailable(reason)) => Err(MediaTreeError::InvalidConfiguration(format!(
                "Naming strategy \"{}\" is not a usable naming strategy: {}",
                name, reason
            ))),
            None => Err(MediaTreeError::NotFound(format!(
                "The naming strategy \"{}\" has not been defined",
                name
            ))),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.strategies.contains_key(name)
    }
}
