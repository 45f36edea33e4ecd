//! Provider abstraction
//!
//! One provider per content type turns a media's source into the output of
//! each variant. Lifecycle of one instance for one media:
//! options set, `validate_content`, `prepare`, `process` once per visited tree
//! node, `render` any number of times, then `remove_temp_files`.

use async_trait::async_trait;
use mediatree_core::{ContentType, Context, Media, MediaContent, Result, Variant};
use serde_json::{Map, Value as JsonValue};
use std::path::{Path, PathBuf};

use crate::support::ProviderSupport;

/// File produced by [`Provider::process`] for one variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedFile {
    pub path: PathBuf,
    /// MIME type of the file
    pub content_type: String,
    /// Extension for the storage key, without leading dot
    pub extension: String,
}

impl ProcessedFile {
    pub fn new(
        path: impl Into<PathBuf>,
        content_type: impl Into<String>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            content_type: content_type.into(),
            extension: extension.into(),
        }
    }
}

/// Content-type specific validation and transformation logic.
///
/// Instances are not meant to be shared between concurrent sessions: the
/// temp-file ledger grows across calls and is only drained on request.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider name as referenced by contexts
    fn name(&self) -> &str;

    /// How this provider interprets raw media content
    fn content_type(&self) -> ContentType;

    fn support(&self) -> &ProviderSupport;

    fn support_mut(&mut self) -> &mut ProviderSupport;

    /// Merge `options` over the provider's defaults; supplied values win.
    fn set_options(&mut self, options: &Map<String, JsonValue>) {
        self.support_mut().set_options(options);
    }

    /// Effective options
    fn options(&self) -> &Map<String, JsonValue> {
        self.support().options()
    }

    /// Whether the media carries content that still needs processing
    fn has_changed_content(&self, media: &Media) -> bool {
        self.support().has_changed_content(media)
    }

    /// Whether `content` is acceptable input for this provider
    fn validate_content(&self, content: &MediaContent) -> bool;

    /// Set or normalize metadata on `media` before any variant is processed
    async fn prepare(&self, media: &mut Media, context: &Context) -> Result<()>;

    /// Produce the output of `variant`.
    ///
    /// `source` is the original file for the tree root and the output of the
    /// parent for every other node. `None` output means the variant has nothing
    /// to store. Calling again with the same inputs yields an equivalent output.
    async fn process(
        &self,
        media: &Media,
        variant: &Variant,
        source: Option<&Path>,
    ) -> Result<Option<ProcessedFile>>;

    /// Markup for embedding a processed variant
    fn render(
        &self,
        media: &Media,
        variant: &Variant,
        url: Option<&str>,
        options: &Map<String, JsonValue>,
    ) -> String;

    /// Delete every temp file this instance registered
    async fn remove_temp_files(&self) -> Result<()> {
        self.support().remove_temp_files().await
    }

    fn temp_files(&self) -> Vec<PathBuf> {
        self.support().temp_files()
    }
}
