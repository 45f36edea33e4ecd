//! Vimeo provider: content is the numeric video id.

use async_trait::async_trait;
use mediatree_core::{ContentType, Context, Media, MediaContent, MediaTreeError, Result, Variant};
use serde_json::{Map, Value as JsonValue};
use std::path::Path;

use crate::provider::{ProcessedFile, Provider};
use crate::providers::youtube::embed_iframe;
use crate::support::ProviderSupport;

pub const NAME: &str = "vimeo";

const PLAYER_BASE_URL: &str = "https://player.vimeo.com/video/";

pub struct VimeoProvider {
    support: ProviderSupport,
}

impl VimeoProvider {
    pub fn new() -> Self {
        let mut defaults = Map::new();
        defaults.insert("width".to_string(), JsonValue::from(640));
        defaults.insert("height".to_string(), JsonValue::from(360));
        defaults.insert("allowfullscreen".to_string(), JsonValue::Bool(true));
        Self {
            support: ProviderSupport::new(defaults),
        }
    }

    fn submitted_id(media: &Media) -> Option<i64> {
        match media.content {
            Some(MediaContent::Int(id)) if id > 0 => Some(id),
            _ => None,
        }
    }
}

impl Default for VimeoProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for VimeoProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn content_type(&self) -> ContentType {
        ContentType::Int
    }

    fn support(&self) -> &ProviderSupport {
        &self.support
    }

    fn support_mut(&mut self) -> &mut ProviderSupport {
        &mut self.support
    }

    fn has_changed_content(&self, media: &Media) -> bool {
        match Self::submitted_id(media) {
            Some(id) => media.metadata_value("id").and_then(JsonValue::as_i64) != Some(id),
            None => media.content.is_some(),
        }
    }

    fn validate_content(&self, content: &MediaContent) -> bool {
        matches!(content, MediaContent::Int(id) if *id > 0)
    }

    async fn prepare(&self, media: &mut Media, _context: &Context) -> Result<()> {
        let id = Self::submitted_id(media).ok_or_else(|| {
            MediaTreeError::InvalidContent("Media has no valid Vimeo video id".to_string())
        })?;
        media.set_metadata("id", id);
        media.set_metadata("url", format!("https://vimeo.com/{}", id));
        if media.name.is_empty() {
            media.name = id.to_string();
        }
        Ok(())
    }

    async fn process(
        &self,
        _media: &Media,
        _variant: &Variant,
        _source: Option<&Path>,
    ) -> Result<Option<ProcessedFile>> {
        Ok(None)
    }

    fn render(
        &self,
        media: &Media,
        variant: &Variant,
        _url: Option<&str>,
        options: &Map<String, JsonValue>,
    ) -> String {
        let id = media
            .metadata_value("id")
            .and_then(JsonValue::as_i64)
            .unwrap_or_default();
        embed_iframe(&format!("{}{}", PLAYER_BASE_URL, id), self.options(), variant, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediatree_core::VariantMode;
    use serde_json::json;

    #[test]
    fn test_validate_content() {
        let provider = VimeoProvider::new();
        assert!(provider.validate_content(&MediaContent::Int(76979871)));
        assert!(!provider.validate_content(&MediaContent::Int(0)));
        assert!(!provider.validate_content(&MediaContent::Int(-3)));
        assert!(!provider.validate_content(&MediaContent::String("76979871".to_string())));
    }

    #[test]
    fn test_change_detection_compares_stored_id() {
        let provider = VimeoProvider::new();
        let mut media = Media::new("videos", MediaContent::Int(76979871));
        assert!(provider.has_changed_content(&media));
        media.set_metadata("id", 76979871);
        assert!(!provider.has_changed_content(&media));
        media.content = Some(MediaContent::Int(1));
        assert!(provider.has_changed_content(&media));
    }

    #[test]
    fn test_render_uses_provider_options() {
        let mut provider = VimeoProvider::new();
        provider.set_options(json!({"allowfullscreen": false}).as_object().unwrap());
        let mut media = Media::default();
        media.set_metadata("id", 42);
        let variant = Variant::new("default", VariantMode::Resize, Map::new());

        let html = provider.render(&media, &variant, None, &Map::new());
        assert_eq!(
            html,
            r#"<iframe src="https://player.vimeo.com/video/42" width="640" height="360" frameborder="0"></iframe>"#
        );
    }
}
