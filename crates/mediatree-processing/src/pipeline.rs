//! Variant pipeline
//!
//! Drives one provider through a context's variant tree for one media:
//! the root variant is produced from the submitted content, every other
//! variant from the output of its parent. Outputs are written to the
//! context's filesystem under keys from its naming strategy.
//!
//! A variant the provider produces nothing for is recorded as skipped and
//! its children are fed the same input the skipped variant received.

use mediatree_core::{
    Context, ErrorMetadata, LogLevel, Media, MediaContent, MediaTreeError, Result, VariantRecord,
    VariantStatus,
};
use mediatree_storage::{FilesystemMap, NamingStrategyRegistry};
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::time::Instant;

use crate::provider::Provider;

/// Outcome of [`VariantPipeline::save`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineReport {
    /// The provider reported no new content; nothing was processed
    pub unchanged: bool,
    /// Visited variants with their status, in traversal order
    pub variants: Vec<(String, VariantStatus)>,
}

impl PipelineReport {
    fn unchanged() -> Self {
        Self {
            unchanged: true,
            variants: Vec::new(),
        }
    }

    pub fn ready(&self) -> impl Iterator<Item = &str> {
        self.variants
            .iter()
            .filter(|(_, status)| *status == VariantStatus::Ready)
            .map(|(name, _)| name.as_str())
    }
}

#[derive(Clone, Default)]
pub struct VariantPipeline {
    filesystems: FilesystemMap,
    naming_strategies: NamingStrategyRegistry,
}

impl VariantPipeline {
    pub fn new(filesystems: FilesystemMap, naming_strategies: NamingStrategyRegistry) -> Self {
        Self {
            filesystems,
            naming_strategies,
        }
    }

    pub fn filesystems(&self) -> &FilesystemMap {
        &self.filesystems
    }

    pub fn naming_strategies(&self) -> &NamingStrategyRegistry {
        &self.naming_strategies
    }

    /// Process and store every variant of `media`.
    ///
    /// The provider's temp files are removed before returning, whether or
    /// not processing succeeded.
    pub async fn save(
        &self,
        media: &mut Media,
        context: &Context,
        provider: &dyn Provider,
    ) -> Result<PipelineReport> {
        if !provider.has_changed_content(media) {
            tracing::debug!(
                context = %context.name(),
                media = %media.name,
                "Media content unchanged, skipping processing"
            );
            return Ok(PipelineReport::unchanged());
        }

        let start = Instant::now();
        let result = self.process_variants(media, context, provider).await;
        let cleanup = provider.remove_temp_files().await;

        match result {
            Ok(report) => {
                cleanup?;
                tracing::info!(
                    context = %context.name(),
                    provider = %provider.name(),
                    media = %media.name,
                    variants = report.variants.len(),
                    duration_ms = start.elapsed().as_millis(),
                    "Media saved"
                );
                Ok(report)
            }
            Err(e) => {
                if let Err(cleanup_error) = cleanup {
                    tracing::warn!(error = %cleanup_error, "Temp file cleanup failed after processing error");
                }
                log_failure(&e, context, media);
                Err(e)
            }
        }
    }

    async fn process_variants(
        &self,
        media: &mut Media,
        context: &Context,
        provider: &dyn Provider,
    ) -> Result<PipelineReport> {
        let content = media.content.as_ref().ok_or_else(|| {
            MediaTreeError::InvalidContent(format!("Media \"{}\" has no content", media.name))
        })?;
        check_content(content, provider)?;

        let storage = self.filesystems.get(context.filesystem_name())?;
        let naming = self.naming_strategies.get(context.naming_strategy_name())?;
        let tree = context.build_variant_tree()?;

        provider.prepare(media, context).await?;

        let original: Option<PathBuf> = media
            .content
            .as_ref()
            .and_then(MediaContent::as_path)
            .map(PathBuf::from);

        // Input each visited variant hands down to its children
        let mut handed_down: HashMap<&str, Option<PathBuf>> = HashMap::with_capacity(tree.len());
        let mut records = BTreeMap::new();
        // Storage key -> variant written there
        let mut written: HashMap<String, &str> = HashMap::with_capacity(tree.len());
        let mut report = PipelineReport::default();

        for variant in tree.traverse() {
            let source = match tree.parent(variant) {
                Some(parent) => handed_down.get(parent.name()).cloned().flatten(),
                None => original.clone(),
            };

            let processed = provider.process(media, variant, source.as_deref()).await?;

            let (record, output) = match processed {
                Some(file) => {
                    let key = naming.generate(media, variant, &file.extension);
                    if let Some(previous) = written.insert(key.clone(), variant.name()) {
                        return Err(MediaTreeError::InvalidConfiguration(format!(
                            "Variants \"{}\" and \"{}\" of context \"{}\" map to the same storage key \"{}\"",
                            previous,
                            variant.name(),
                            context.name(),
                            key
                        )));
                    }
                    let url = storage
                        .write_file(&key, &file.path, &file.content_type)
                        .await?;
                    tracing::debug!(
                        variant = %variant.name(),
                        key = %key,
                        content_type = %file.content_type,
                        "Variant stored"
                    );
                    let record = VariantRecord {
                        status: VariantStatus::Ready,
                        storage_key: Some(key),
                        url: Some(url),
                        content_type: Some(file.content_type),
                    };
                    (record, Some(file.path))
                }
                None => {
                    tracing::debug!(variant = %variant.name(), "Variant produced no output");
                    (VariantRecord::skipped(), source)
                }
            };

            report.variants.push((variant.name().to_string(), record.status));
            records.insert(variant.name().to_string(), record);
            handed_down.insert(variant.name(), output);
        }

        media.variants = records;
        Ok(report)
    }

    /// Markup for one variant of `media`; the context's default variant when
    /// `variant_name` is `None`.
    pub fn render(
        &self,
        media: &Media,
        context: &Context,
        provider: &dyn Provider,
        variant_name: Option<&str>,
        options: &Map<String, JsonValue>,
    ) -> Result<String> {
        let name = variant_name.unwrap_or_else(|| context.default_variant());
        let tree = context.build_variant_tree()?;
        let variant = tree.get_node(name)?;
        let url = media.variant(name).and_then(|record| record.url.as_deref());
        Ok(provider.render(media, variant, url, options))
    }

    /// Delete every stored variant of `media` and clear its records
    pub async fn remove(&self, media: &mut Media, context: &Context) -> Result<()> {
        let storage = self.filesystems.get(context.filesystem_name())?;
        for (name, record) in &media.variants {
            if let Some(key) = &record.storage_key {
                storage.delete(key).await?;
                tracing::debug!(variant = %name, key = %key, "Variant removed");
            }
        }
        media.variants.clear();
        Ok(())
    }
}

fn check_content(content: &MediaContent, provider: &dyn Provider) -> Result<()> {
    let actual = content.content_type();
    if actual != provider.content_type() {
        return Err(MediaTreeError::InvalidContent(format!(
            "Provider \"{}\" expects {} content, got {}",
            provider.name(),
            provider.content_type(),
            actual
        )));
    }
    if !provider.validate_content(content) {
        return Err(MediaTreeError::InvalidContent(format!(
            "Content rejected by provider \"{}\"",
            provider.name()
        )));
    }
    Ok(())
}

fn log_failure(error: &MediaTreeError, context: &Context, media: &Media) {
    let code = error.error_code();
    match error.log_level() {
        LogLevel::Debug => tracing::debug!(
            context = %context.name(),
            media = %media.name,
            error_code = code,
            error = %error,
            "Media save rejected"
        ),
        LogLevel::Warn => tracing::warn!(
            context = %context.name(),
            media = %media.name,
            error_code = code,
            error = %error,
            "Media save failed"
        ),
        LogLevel::Error => tracing::error!(
            context = %context.name(),
            media = %media.name,
            error_code = code,
            recoverable = error.is_recoverable(),
            error = %error,
            "Media save failed"
        ),
    }
}
