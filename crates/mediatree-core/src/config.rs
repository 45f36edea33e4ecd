//! Configuration module
//!
//! Declarative configuration for contexts, filesystems and naming strategies.
//! Everything here is plain data; structural validation of the variant
//! hierarchy happens when a [`Context`](crate::context::Context) builds its tree.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::constants::{DEFAULT_VARIANT_NAME, ENV_PREFIX};
use crate::error::{MediaTreeError, Result};
use crate::variant::VariantMode;

/// Declaration of one variant inside a context
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariantDefinition {
    #[serde(default)]
    pub mode: VariantMode,
    /// Name of the variant this one is derived from; none (or empty) for the root
    #[serde(default)]
    pub parent: Option<String>,
    /// Processing options handed to the provider
    #[serde(default)]
    pub process: Map<String, JsonValue>,
}

impl VariantDefinition {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn child_of(parent: impl Into<String>) -> Self {
        Self {
            parent: Some(parent.into()),
            ..Self::default()
        }
    }

    pub fn with_mode(mut self, mode: VariantMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.process.insert(key.into(), value.into());
        self
    }

    /// Declared parent, with an empty name treated as no parent
    pub fn parent_name(&self) -> Option<&str> {
        self.parent.as_deref().filter(|p| !p.is_empty())
    }
}

/// Flat, insertion-ordered set of variant declarations.
///
/// Document order is kept so sibling order in the built tree follows the
/// configuration. Repeated names are kept as well; the tree build reports them
/// as duplicates instead of one silently replacing the other.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariantDefinitions {
    entries: Vec<(String, VariantDefinition)>,
    index: HashMap<String, usize>,
}

impl VariantDefinitions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, definition: VariantDefinition) {
        let name = name.into();
        self.index.entry(name.clone()).or_insert(self.entries.len());
        self.entries.push((name, definition));
    }

    pub fn with(mut self, name: impl Into<String>, definition: VariantDefinition) -> Self {
        self.insert(name, definition);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&VariantDefinition> {
        self.index.get(name).map(|&i| &self.entries[i].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &VariantDefinition)> {
        self.entries.iter().map(|(name, def)| (name.as_str(), def))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, VariantDefinition)> for VariantDefinitions {
    fn from_iter<I: IntoIterator<Item = (S, VariantDefinition)>>(iter: I) -> Self {
        let mut definitions = VariantDefinitions::new();
        for (name, definition) in iter {
            definitions.insert(name, definition);
        }
        definitions
    }
}

impl Serialize for VariantDefinitions {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, definition) in &self.entries {
            map.serialize_entry(name, definition)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for VariantDefinitions {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct V;
        impl<'de> Visitor<'de> for V {
            type Value = VariantDefinitions;
            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of variant name to variant definition")
            }
            fn visit_map<M>(self, mut map: M) -> std::result::Result<Self::Value, M::Error>
            where
                M: MapAccess<'de>,
            {
                let mut definitions = VariantDefinitions::new();
                while let Some((name, definition)) =
                    map.next_entry::<String, VariantDefinition>()?
                {
                    definitions.insert(name, definition);
                }
                Ok(definitions)
            }
        }
        deserializer.deserialize_map(V)
    }
}

fn default_variant_name() -> String {
    DEFAULT_VARIANT_NAME.to_string()
}

/// Configuration of one media context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextConfig {
    pub name: String,
    pub provider: String,
    #[serde(default)]
    pub provider_options: Map<String, JsonValue>,
    pub filesystem: String,
    #[serde(default)]
    pub cdn: Option<String>,
    pub naming_strategy: String,
    #[serde(default)]
    pub variants: VariantDefinitions,
    #[serde(default = "default_variant_name")]
    pub default_variant: String,
}

/// A named storage backend declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilesystemConfig {
    pub name: String,
    /// Backend kind, e.g. "local" or "memory"
    pub backend: String,
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub base_url: Option<String>,
}

/// A named naming strategy declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamingStrategyConfig {
    pub name: String,
    /// Strategy kind, e.g. "slug" or "hashed"
    pub kind: String,
}

/// Root configuration document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaTreeConfig {
    #[serde(default)]
    pub contexts: Vec<ContextConfig>,
    #[serde(default)]
    pub filesystems: Vec<FilesystemConfig>,
    #[serde(default)]
    pub naming_strategies: Vec<NamingStrategyConfig>,
    /// Directory for provider working files; the system temp dir when unset
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
}

impl MediaTreeConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: MediaTreeConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            MediaTreeError::InvalidConfiguration(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        tracing::debug!(path = %path.display(), "Loading configuration");
        Self::from_json_str(&raw)
    }

    /// Load the file named by `MEDIATREE_CONFIG`, applying `MEDIATREE_TEMP_DIR` on top.
    pub fn from_env() -> Result<Self> {
        let env = EnvSettings::from_env()?;
        let path = env.config.ok_or_else(|| {
            MediaTreeError::InvalidConfiguration(format!("{}CONFIG not set", ENV_PREFIX))
        })?;
        let mut config = Self::from_file(path)?;
        if env.temp_dir.is_some() {
            config.temp_dir = env.temp_dir;
        }
        Ok(config)
    }

    /// Reject duplicate context, filesystem or naming strategy names
    pub fn validate(&self) -> Result<()> {
        fn unique<'a>(kind: &str, names: impl Iterator<Item = &'a str>) -> Result<()> {
            let mut seen = std::collections::HashSet::new();
            for name in names {
                if !seen.insert(name) {
                    return Err(MediaTreeError::InvalidConfiguration(format!(
                        "{} \"{}\" is declared more than once",
                        kind, name
                    )));
                }
            }
            Ok(())
        }

        unique("Context", self.contexts.iter().map(|c| c.name.as_str()))?;
        unique("Filesystem", self.filesystems.iter().map(|f| f.name.as_str()))?;
        unique(
            "Naming strategy",
            self.naming_strategies.iter().map(|n| n.name.as_str()),
        )?;
        Ok(())
    }

    pub fn context(&self, name: &str) -> Option<&ContextConfig> {
        self.contexts.iter().find(|c| c.name == name)
    }
}

/// Settings read from `MEDIATREE_*` environment variables
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnvSettings {
    pub config: Option<PathBuf>,
    pub temp_dir: Option<PathBuf>,
}

impl EnvSettings {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Ok(envy::prefixed(ENV_PREFIX).from_env::<EnvSettings>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "contexts": [{
            "name": "pictures",
            "provider": "image",
            "provider_options": {"quality": 80},
            "filesystem": "local",
            "naming_strategy": "slug",
            "variants": {
                "default": {"process": {"width": 800}},
                "thumb": {"parent": "medium", "mode": "crop", "process": {"width": 50, "height": 50}},
                "medium": {"parent": "default", "process": {"width": 300}}
            },
            "default_variant": "default"
        }],
        "filesystems": [{"name": "local", "backend": "memory"}],
        "naming_strategies": [{"name": "slug", "kind": "slug"}]
    }"#;

    #[test]
    fn test_parse_keeps_variant_order() {
        let config = MediaTreeConfig::from_json_str(SAMPLE).unwrap();
        let context = config.context("pictures").unwrap();
        let names: Vec<&str> = context.variants.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["default", "thumb", "medium"]);
        let thumb = context.variants.get("thumb").unwrap();
        assert_eq!(thumb.mode, VariantMode::Crop);
        assert_eq!(thumb.parent_name(), Some("medium"));
        assert_eq!(context.cdn, None);
    }

    #[test]
    fn test_duplicate_variant_keys_are_kept() {
        let definitions: VariantDefinitions =
            serde_json::from_str(r#"{"a": {}, "b": {"parent": "a"}, "a": {"parent": "b"}}"#)
                .unwrap();
        assert_eq!(definitions.len(), 3);
        // Lookup resolves to the first declaration
        assert_eq!(definitions.get("a").unwrap().parent_name(), None);
    }

    #[test]
    fn test_empty_parent_is_root() {
        let definition = VariantDefinition::child_of("");
        assert_eq!(definition.parent_name(), None);
    }

    #[test]
    fn test_duplicate_context_rejected() {
        let json = r#"{"contexts": [
            {"name": "a", "provider": "file", "filesystem": "f", "naming_strategy": "n"},
            {"name": "a", "provider": "file", "filesystem": "f", "naming_strategy": "n"}
        ]}"#;
        let err = MediaTreeConfig::from_json_str(json).unwrap_err();
        assert!(matches!(err, MediaTreeError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_default_variant_name() {
        let json = r#"{"contexts": [
            {"name": "a", "provider": "file", "filesystem": "f", "naming_strategy": "n"}
        ]}"#;
        let config = MediaTreeConfig::from_json_str(json).unwrap();
        assert_eq!(config.contexts[0].default_variant, "default");
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = MediaTreeConfig::from_file(file.path()).unwrap();
        assert_eq!(config.filesystems[0].backend, "memory");
        assert_eq!(config.naming_strategies[0].kind, "slug");

        let err = MediaTreeConfig::from_file("/nonexistent/mediatree.json").unwrap_err();
        assert!(matches!(err, MediaTreeError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_round_trip_preserves_order() {
        let definitions = VariantDefinitions::new()
            .with("z", VariantDefinition::root())
            .with("a", VariantDefinition::child_of("z"));
        let json = serde_json::to_string(&definitions).unwrap();
        assert!(json.find("\"z\"").unwrap() < json.find("\"a\"").unwrap());
    }
}
