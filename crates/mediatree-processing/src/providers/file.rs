//! Generic file provider: stores the upload as-is for every variant.

use async_trait::async_trait;
use mediatree_core::{ContentType, Context, Media, MediaContent, MediaTreeError, Result, Variant};
use serde_json::{Map, Value as JsonValue};
use std::path::Path;

use crate::html;
use crate::provider::{ProcessedFile, Provider};
use crate::support::ProviderSupport;

pub const NAME: &str = "file";

const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// MIME type for a file extension, falling back to `application/octet-stream`
pub fn mime_type_for(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "json" => "application/json",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "mp3" => "audio/mpeg",
        "mp4" => "video/mp4",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => DEFAULT_MIME_TYPE,
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default()
}

pub struct FileProvider {
    support: ProviderSupport,
}

impl FileProvider {
    pub fn new() -> Self {
        let mut defaults = Map::new();
        defaults.insert("allowed_extensions".to_string(), JsonValue::Array(Vec::new()));
        Self {
            support: ProviderSupport::new(defaults),
        }
    }

    /// An empty list allows every extension
    fn extension_allowed(&self, extension: &str) -> bool {
        match self.options().get("allowed_extensions").and_then(JsonValue::as_array) {
            Some(allowed) if !allowed.is_empty() => allowed
                .iter()
                .filter_map(JsonValue::as_str)
                .any(|a| a.trim_start_matches('.').eq_ignore_ascii_case(extension)),
            _ => true,
        }
    }
}

impl Default for FileProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for FileProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn content_type(&self) -> ContentType {
        ContentType::File
    }

    fn support(&self) -> &ProviderSupport {
        &self.support
    }

    fn support_mut(&mut self) -> &mut ProviderSupport {
        &mut self.support
    }

    fn validate_content(&self, content: &MediaContent) -> bool {
        match content.as_path() {
            Some(path) => path.is_file() && self.extension_allowed(&extension_of(path)),
            None => false,
        }
    }

    async fn prepare(&self, media: &mut Media, _context: &Context) -> Result<()> {
        let path = media
            .content
            .as_ref()
            .and_then(MediaContent::as_path)
            .map(Path::to_path_buf)
            .ok_or_else(|| MediaTreeError::InvalidContent("File media has no file content".to_string()))?;

        let size = tokio::fs::metadata(&path).await?.len();
        let extension = extension_of(&path);
        media.set_metadata("size", size);
        media.set_metadata("extension", extension.as_str());
        media.set_metadata("content_type", mime_type_for(&extension));
        if let Some(file_name) = path.file_name().and_then(|n| n.to_str()) {
            media.set_metadata("original_name", file_name);
            if media.name.is_empty() {
                media.name = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or(file_name)
                    .to_string();
            }
        }
        Ok(())
    }

    async fn process(
        &self,
        _media: &Media,
        _variant: &Variant,
        source: Option<&Path>,
    ) -> Result<Option<ProcessedFile>> {
        Ok(source.map(|path| {
            let extension = extension_of(path);
            ProcessedFile::new(path, mime_type_for(&extension), extension)
        }))
    }

    fn render(
        &self,
        media: &Media,
        _variant: &Variant,
        url: Option<&str>,
        options: &Map<String, JsonValue>,
    ) -> String {
        let href = url.map(JsonValue::from).unwrap_or(JsonValue::Null);
        let label = options
            .get("label")
            .and_then(JsonValue::as_str)
            .or_else(|| media.metadata_value("original_name").and_then(JsonValue::as_str))
            .unwrap_or(media.name.as_str());
        format!(
            "<a{}{}>{}</a>",
            html::attributes([("href", &href)]),
            html::extra_attributes(options, &["href", "label"]),
            html::escape(label)
        )
    }
}
