//! Helpers behind the `mediatree` binary.

use anyhow::Context as _;
use mediatree_core::{Context, MediaContent, MediaTreeConfig, VariantMode};
use mediatree_processing::{ProviderRegistry, VariantPipeline};
use mediatree_storage::{FilesystemMap, NamingStrategyRegistry};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Load the configuration from `path`, or from `MEDIATREE_CONFIG` when absent.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<MediaTreeConfig> {
    let config = match path {
        Some(path) => MediaTreeConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => MediaTreeConfig::from_env()
            .context("No --config given and MEDIATREE_CONFIG could not be loaded")?,
    };
    Ok(config)
}

pub fn context(config: &MediaTreeConfig, name: &str) -> anyhow::Result<Context> {
    let declaration = config
        .context(name)
        .cloned()
        .with_context(|| format!("Context \"{}\" is not configured", name))?;
    Ok(Context::new(declaration)?)
}

/// One line of `mediatree tree` output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeLine {
    pub name: String,
    pub parent: Option<String>,
    pub mode: VariantMode,
    pub depth: usize,
}

impl TreeLine {
    pub fn render(&self) -> String {
        format!("{}{} ({})", "  ".repeat(self.depth), self.name, self.mode)
    }
}

/// Variants of `context` in traversal order, with their depth
pub fn describe_tree(context: &Context) -> anyhow::Result<Vec<TreeLine>> {
    let tree = context.build_variant_tree()?;
    let mut lines: Vec<TreeLine> = Vec::with_capacity(tree.len());
    for variant in tree.traverse() {
        let parent = tree.parent(variant).map(|p| p.name().to_string());
        // Pre-order: the parent line is always already emitted
        let depth = match &parent {
            Some(parent) => lines
                .iter()
                .find(|line| &line.name == parent)
                .map(|line| line.depth + 1)
                .unwrap_or(0),
            None => 0,
        };
        lines.push(TreeLine {
            name: variant.name().to_string(),
            parent,
            mode: variant.mode(),
            depth,
        });
    }
    Ok(lines)
}

/// Interpret a command-line value as the content kind `kind` names
pub fn parse_content(kind: &str, value: &str) -> anyhow::Result<MediaContent> {
    match kind {
        "file" => Ok(MediaContent::File(PathBuf::from(value))),
        "int" => Ok(MediaContent::Int(
            value
                .parse()
                .with_context(|| format!("\"{}\" is not an integer id", value))?,
        )),
        "string" => Ok(MediaContent::String(value.to_string())),
        other => anyhow::bail!("Unknown content kind \"{}\" (expected file, int or string)", other),
    }
}

/// Everything needed to save media for any configured context
pub struct Runtime {
    pub pipeline: VariantPipeline,
    pub providers: ProviderRegistry,
}

impl Runtime {
    pub async fn from_config(config: &MediaTreeConfig) -> Self {
        let pipeline = VariantPipeline::new(
            FilesystemMap::from_config(&config.filesystems).await,
            NamingStrategyRegistry::from_config(&config.naming_strategies),
        );
        let mut providers = ProviderRegistry::with_defaults().await;
        if let Some(dir) = &config.temp_dir {
            providers = providers.with_temp_dir(dir.clone());
        }
        Self { pipeline, providers }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"{
        "filesystems": [{"name": "memory", "backend": "memory"}],
        "naming_strategies": [{"name": "slug", "kind": "slug"}],
        "contexts": [{
            "name": "videos",
            "provider": "youtube",
            "filesystem": "memory",
            "naming_strategy": "slug",
            "variants": {
                "small": {"parent": "default"},
                "default": {},
                "tiny": {"parent": "small", "mode": "crop"},
                "large": {"parent": "default"}
            }
        }]
    }"#;

    #[test]
    fn test_describe_tree() {
        let config = MediaTreeConfig::from_json_str(CONFIG).unwrap();
        let context = context(&config, "videos").unwrap();
        let rendered: Vec<String> = describe_tree(&context)
            .unwrap()
            .iter()
            .map(TreeLine::render)
            .collect();
        assert_eq!(
            rendered,
            vec!["default (resize)", "  small (resize)", "    tiny (crop)", "  large (resize)"]
        );
    }

    #[test]
    fn test_unknown_context() {
        let config = MediaTreeConfig::from_json_str(CONFIG).unwrap();
        let err = context(&config, "pictures").err().unwrap();
        assert!(err.to_string().contains("pictures"));
    }

    #[test]
    fn test_parse_content() {
        assert_eq!(parse_content("int", "42").unwrap(), MediaContent::Int(42));
        assert_eq!(
            parse_content("string", "dQw4w9WgXcQ").unwrap(),
            MediaContent::String("dQw4w9WgXcQ".to_string())
        );
        assert!(parse_content("int", "abc").is_err());
        assert!(parse_content("url", "x").is_err());
    }

    #[tokio::test]
    async fn test_runtime_saves_configured_context() {
        let config = MediaTreeConfig::from_json_str(CONFIG).unwrap();
        let runtime = Runtime::from_config(&config).await;
        let context = context(&config, "videos").unwrap();
        let provider = runtime.providers.create_for(&context).await.unwrap();
        let mut media = mediatree_core::Media::new(
            "videos",
            parse_content("string", "https://youtu.be/dQw4w9WgXcQ").unwrap(),
        );

        let report = runtime
            .pipeline
            .save(&mut media, &context, provider.as_ref())
            .await
            .unwrap();
        assert_eq!(report.variants.len(), 4);
        assert_eq!(media.name, "dQw4w9WgXcQ");
    }
}
