//! Image provider: decodes an uploaded file once per variant and re-encodes
//! it to the variant's box, mode and format.

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader};
use mediatree_core::{
    ContentType, Context, Media, MediaContent, MediaTreeError, Result, Variant, VariantMode,
};
use serde_json::{Map, Value as JsonValue};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::html;
use crate::image::{ImageResize, TargetBox};
use crate::provider::{ProcessedFile, Provider};
use crate::support::ProviderSupport;

pub const NAME: &str = "image";

const DEFAULT_QUALITY: u8 = 85;

/// Output encodings the provider can write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    Png,
    Gif,
    WebP,
}

impl OutputFormat {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(OutputFormat::Jpeg),
            "png" => Some(OutputFormat::Png),
            "gif" => Some(OutputFormat::Gif),
            "webp" => Some(OutputFormat::WebP),
            _ => None,
        }
    }

    pub fn from_image_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Jpeg => Some(OutputFormat::Jpeg),
            ImageFormat::Png => Some(OutputFormat::Png),
            ImageFormat::Gif => Some(OutputFormat::Gif),
            ImageFormat::WebP => Some(OutputFormat::WebP),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::Gif => "gif",
            OutputFormat::WebP => "webp",
        }
    }

    pub fn to_mime_type(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::Gif => "image/gif",
            OutputFormat::WebP => "image/webp",
        }
    }

    pub fn to_image_format(self) -> ImageFormat {
        match self {
            OutputFormat::Jpeg => ImageFormat::Jpeg,
            OutputFormat::Png => ImageFormat::Png,
            OutputFormat::Gif => ImageFormat::Gif,
            OutputFormat::WebP => ImageFormat::WebP,
        }
    }
}

/// Encoding settings resolved for one variant
#[derive(Debug, Clone, Copy)]
struct EncodeSettings {
    mode: VariantMode,
    target: TargetBox,
    upscale: bool,
    format: OutputFormat,
    quality: u8,
}

pub struct ImageProvider {
    support: ProviderSupport,
}

impl ImageProvider {
    pub fn new() -> Self {
        let mut defaults = Map::new();
        defaults.insert("quality".to_string(), JsonValue::from(DEFAULT_QUALITY));
        defaults.insert("upscale".to_string(), JsonValue::Bool(false));
        Self {
            support: ProviderSupport::new(defaults),
        }
    }

    fn sniff_format(path: &Path) -> Option<OutputFormat> {
        ImageReader::open(path)
            .ok()?
            .with_guessed_format()
            .ok()?
            .format()
            .and_then(OutputFormat::from_image_format)
    }

    /// Variant options win over provider options, which win over the source.
    fn settings(&self, variant: &Variant, source_format: Option<OutputFormat>) -> EncodeSettings {
        let format = variant
            .option_str("format")
            .or_else(|| self.support.option_str("format"))
            .and_then(OutputFormat::from_name)
            .or(source_format)
            .unwrap_or(OutputFormat::Jpeg);
        let quality = variant
            .option_u32("quality")
            .or_else(|| self.support.option_u32("quality"))
            .map(|q| q.clamp(1, 100) as u8)
            .unwrap_or(DEFAULT_QUALITY);
        let upscale = variant
            .option("upscale")
            .and_then(JsonValue::as_bool)
            .or_else(|| self.support.option_bool("upscale"))
            .unwrap_or(false);

        EncodeSettings {
            mode: variant.mode(),
            target: TargetBox::new(variant.option_u32("width"), variant.option_u32("height")),
            upscale,
            format,
            quality,
        }
    }

    fn transform(source: &Path, output: &Path, settings: EncodeSettings) -> anyhow::Result<(u32, u32)> {
        let img = ImageReader::open(source)?.with_guessed_format()?.decode()?;
        let out = ImageResize::apply(&img, settings.mode, settings.target, settings.upscale);
        Self::encode(&out, settings.format, settings.quality, output)?;
        Ok(out.dimensions())
    }

    fn encode(img: &DynamicImage, format: OutputFormat, quality: u8, path: &Path) -> anyhow::Result<()> {
        match format {
            OutputFormat::Jpeg => {
                let mut writer = BufWriter::new(std::fs::File::create(path)?);
                let encoder = JpegEncoder::new_with_quality(&mut writer, quality);
                DynamicImage::ImageRgb8(img.to_rgb8()).write_with_encoder(encoder)?;
                writer.flush()?;
            }
            other => {
                DynamicImage::ImageRgba8(img.to_rgba8()).save_with_format(path, other.to_image_format())?;
            }
        }
        Ok(())
    }
}

impl Default for ImageProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for ImageProvider {
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
        content
            .as_path()
            .map(|path| path.is_file() && Self::sniff_format(path).is_some())
            .unwrap_or(false)
    }

    async fn prepare(&self, media: &mut Media, _context: &Context) -> Result<()> {
        let path = match media.content.as_ref().and_then(MediaContent::as_path) {
            Some(path) => path.to_path_buf(),
            None => {
                return Err(MediaTreeError::InvalidContent(
                    "Image media has no file content".to_string(),
                ))
            }
        };

        let probe_path = path.clone();
        let (format, (width, height), size) = tokio::task::spawn_blocking(move || {
            let reader = ImageReader::open(&probe_path)?.with_guessed_format()?;
            let format = reader
                .format()
                .and_then(OutputFormat::from_image_format)
                .ok_or_else(|| anyhow::anyhow!("Unsupported image format"))?;
            let dimensions = reader.into_dimensions()?;
            let size = std::fs::metadata(&probe_path)?.len();
            Ok::<_, anyhow::Error>((format, dimensions, size))
        })
        .await
        .map_err(|e| MediaTreeError::processing("Image probe task failed", e))?
        .map_err(|e| MediaTreeError::processing(format!("Failed to read image {}", path.display()), e))?;

        media.set_metadata("width", width);
        media.set_metadata("height", height);
        media.set_metadata("format", format.extension());
        media.set_metadata("size", size);
        media.set_metadata("content_type", format.to_mime_type());
        if media.name.is_empty() {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                media.name = stem.to_string();
            }
        }

        tracing::debug!(
            path = %path.display(),
            width = width,
            height = height,
            format = format.extension(),
            "Image prepared"
        );
        Ok(())
    }

    async fn process(
        &self,
        media: &Media,
        variant: &Variant,
        source: Option<&Path>,
    ) -> Result<Option<ProcessedFile>> {
        let Some(source) = source else {
            return Ok(None);
        };

        let source_format = Self::sniff_format(source);
        let settings = self.settings(variant, source_format);

        if settings.mode == VariantMode::Copy && source_format == Some(settings.format) {
            return Ok(Some(ProcessedFile::new(
                source,
                settings.format.to_mime_type(),
                settings.format.extension(),
            )));
        }

        let output = self.support.new_temp_path(settings.format.extension());
        let start = Instant::now();
        let source_buf: PathBuf = source.to_path_buf();
        let output_buf = output.clone();
        let (width, height) =
            tokio::task::spawn_blocking(move || Self::transform(&source_buf, &output_buf, settings))
                .await
                .map_err(|e| MediaTreeError::processing("Image transform task failed", e))?
                .map_err(|e| {
                    MediaTreeError::processing(
                        format!("Failed to process variant \"{}\" of \"{}\"", variant.name(), media.name),
                        e,
                    )
                })?;

        tracing::debug!(
            variant = %variant.name(),
            mode = %settings.mode,
            width = width,
            height = height,
            duration_ms = start.elapsed().as_millis(),
            "Image variant processed"
        );

        Ok(Some(ProcessedFile::new(
            output,
            settings.format.to_mime_type(),
            settings.format.extension(),
        )))
    }

    fn render(
        &self,
        media: &Media,
        variant: &Variant,
        url: Option<&str>,
        options: &Map<String, JsonValue>,
    ) -> String {
        let src = url.map(JsonValue::from).unwrap_or(JsonValue::Null);
        let width = options
            .get("width")
            .or_else(|| variant.option("width"))
            .cloned()
            .unwrap_or(JsonValue::Null);
        let height = options
            .get("height")
            .or_else(|| variant.option("height"))
            .cloned()
            .unwrap_or(JsonValue::Null);
        let alt = options
            .get("alt")
            .cloned()
            .unwrap_or_else(|| JsonValue::from(media.name.as_str()));

        format!(
            "<img{}{} />",
            html::attributes([("src", &src), ("width", &width), ("height", &height), ("alt", &alt)]),
            html::extra_attributes(options, &["src", "width", "height", "alt"])
        )
    }
}
