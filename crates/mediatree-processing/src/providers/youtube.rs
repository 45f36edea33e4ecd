//! YouTube provider: content is a video id or a watch URL. Nothing is stored,
//! variants only differ in how the player is embedded.

use async_trait::async_trait;
use mediatree_core::{ContentType, Context, Media, MediaContent, MediaTreeError, Result, Variant};
use regex::Regex;
use serde_json::{Map, Value as JsonValue};
use std::path::Path;
use std::sync::OnceLock;

use crate::html;
use crate::provider::{ProcessedFile, Provider};
use crate::support::ProviderSupport;

pub const NAME: &str = "youtube";

const EMBED_BASE_URL: &str = "https://www.youtube.com/embed/";

fn id_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(
                r"^(?:https?://)?(?:www\.|m\.)?(?:youtube\.com/(?:watch\?(?:.*&)?v=|embed/|shorts/)|youtu\.be/)?([A-Za-z0-9_-]{11})(?:[?&#].*)?$",
            )
            .ok()
        })
        .as_ref()
}

/// Extract the 11 character video id from an id or a YouTube URL
pub fn parse_video_id(value: &str) -> Option<String> {
    id_pattern()?
        .captures(value.trim())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

pub struct YoutubeProvider {
    support: ProviderSupport,
}

impl YoutubeProvider {
    pub fn new() -> Self {
        let mut defaults = Map::new();
        defaults.insert("width".to_string(), JsonValue::from(560));
        defaults.insert("height".to_string(), JsonValue::from(315));
        defaults.insert("allowfullscreen".to_string(), JsonValue::Bool(true));
        Self {
            support: ProviderSupport::new(defaults),
        }
    }

    fn submitted_id(media: &Media) -> Option<String> {
        match media.content.as_ref()? {
            MediaContent::String(value) => parse_video_id(value),
            _ => None,
        }
    }
}

impl Default for YoutubeProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for YoutubeProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn content_type(&self) -> ContentType {
        ContentType::String
    }

    fn support(&self) -> &ProviderSupport {
        &self.support
    }

    fn support_mut(&mut self) -> &mut ProviderSupport {
        &mut self.support
    }

    /// Resubmitting the id already stored on the media is not a change.
    fn has_changed_content(&self, media: &Media) -> bool {
        match Self::submitted_id(media) {
            Some(id) => media.metadata_value("id").and_then(JsonValue::as_str) != Some(id.as_str()),
            None => media.content.is_some(),
        }
    }

    fn validate_content(&self, content: &MediaContent) -> bool {
        matches!(content, MediaContent::String(value) if parse_video_id(value).is_some())
    }

    async fn prepare(&self, media: &mut Media, _context: &Context) -> Result<()> {
        let id = Self::submitted_id(media).ok_or_else(|| {
            MediaTreeError::InvalidContent("Media has no valid YouTube video id".to_string())
        })?;
        media.set_metadata("url", format!("https://www.youtube.com/watch?v={}", id));
        if media.name.is_empty() {
            media.name = id.clone();
        }
        media.set_metadata("id", id);
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
            .and_then(JsonValue::as_str)
            .unwrap_or_default();
        embed_iframe(
            &format!("{}{}", EMBED_BASE_URL, id),
            self.options(),
            variant,
            options,
        )
    }
}

/// `<iframe>` with size taken from render options, then the variant, then provider options
pub(crate) fn embed_iframe(
    src: &str,
    provider_options: &Map<String, JsonValue>,
    variant: &Variant,
    options: &Map<String, JsonValue>,
) -> String {
    let pick = |key: &str| {
        options
            .get(key)
            .or_else(|| variant.option(key))
            .or_else(|| provider_options.get(key))
            .cloned()
            .unwrap_or(JsonValue::Null)
    };
    let src = JsonValue::from(src);
    let width = pick("width");
    let height = pick("height");
    let frameborder = JsonValue::from(0);
    let fullscreen = match pick("allowfullscreen") {
        JsonValue::Bool(true) => " allowfullscreen",
        _ => "",
    };
    format!(
        "<iframe{}{}{}></iframe>",
        html::attributes([
            ("src", &src),
            ("width", &width),
            ("height", &height),
            ("frameborder", &frameborder),
        ]),
        html::extra_attributes(options, &["src", "width", "height", "frameborder", "allowfullscreen"]),
        fullscreen
    )
}
