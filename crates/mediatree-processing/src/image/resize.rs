use image::{imageops, DynamicImage, GenericImageView, Rgba, RgbaImage};
use mediatree_core::VariantMode;

/// Target dimensions requested by a variant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TargetBox {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl TargetBox {
    pub fn new(width: Option<u32>, height: Option<u32>) -> Self {
        Self {
            width: width.filter(|w| *w > 0),
            height: height.filter(|h| *h > 0),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.width.is_none() && self.height.is_none()
    }
}

/// Image resize operations
pub struct ImageResize;

impl ImageResize {
    /// Dimensions that fit `orig` inside `target` keeping aspect ratio.
    /// A missing side is unconstrained. Without `upscale` the image never grows.
    pub fn fit_dimensions(
        orig_width: u32,
        orig_height: u32,
        target: TargetBox,
        upscale: bool,
    ) -> (u32, u32) {
        let scale_w = target.width.map(|w| w as f32 / orig_width as f32);
        let scale_h = target.height.map(|h| h as f32 / orig_height as f32);
        let mut scale = match (scale_w, scale_h) {
            (Some(w), Some(h)) => w.min(h),
            (Some(w), None) => w,
            (None, Some(h)) => h,
            (None, None) => 1.0,
        };
        if !upscale {
            scale = scale.min(1.0);
        }
        let width = ((orig_width as f32 * scale).round() as u32).max(1);
        let height = ((orig_height as f32 * scale).round() as u32).max(1);
        (width, height)
    }

    /// Select appropriate filter type based on resize ratio
    pub fn select_filter(
        orig_width: u32,
        orig_height: u32,
        new_width: u32,
        new_height: u32,
    ) -> imageops::FilterType {
        let width_ratio = orig_width as f32 / new_width as f32;
        let height_ratio = orig_height as f32 / new_height as f32;
        let max_ratio = width_ratio.max(height_ratio);

        if max_ratio > 2.0 {
            imageops::FilterType::Triangle
        } else if max_ratio > 1.5 {
            imageops::FilterType::CatmullRom
        } else {
            imageops::FilterType::Lanczos3
        }
    }

    /// Resize image to exact dimensions
    pub fn resize_image(img: &DynamicImage, width: u32, height: u32) -> DynamicImage {
        let (orig_width, orig_height) = img.dimensions();
        if (orig_width, orig_height) == (width, height) {
            return img.clone();
        }
        let filter = Self::select_filter(orig_width, orig_height, width, height);
        img.resize_exact(width, height, filter)
    }

    /// Crop box for a `w`x`h` crop of `orig`. Without `upscale` the box shrinks,
    /// keeping its aspect ratio, until the source covers it.
    pub fn crop_dimensions(
        orig_width: u32,
        orig_height: u32,
        width: u32,
        height: u32,
        upscale: bool,
    ) -> (u32, u32) {
        if upscale {
            return (width, height);
        }
        let scale = (orig_width as f32 / width as f32)
            .min(orig_height as f32 / height as f32)
            .min(1.0);
        let width = ((width as f32 * scale).round() as u32).max(1);
        let height = ((height as f32 * scale).round() as u32).max(1);
        (width, height)
    }

    /// Fit inside the box, then center on a white canvas of exactly the box size
    pub fn pad(img: &DynamicImage, target_width: u32, target_height: u32, upscale: bool) -> DynamicImage {
        let (orig_width, orig_height) = img.dimensions();
        let (scaled_width, scaled_height) = Self::fit_dimensions(
            orig_width,
            orig_height,
            TargetBox::new(Some(target_width), Some(target_height)),
            upscale,
        );

        let bg_color = Rgba([255u8, 255u8, 255u8, 255u8]);
        let canvas_img = RgbaImage::from_pixel(target_width, target_height, bg_color);
        let mut canvas = DynamicImage::ImageRgba8(canvas_img);

        let x_offset = target_width.saturating_sub(scaled_width) / 2;
        let y_offset = target_height.saturating_sub(scaled_height) / 2;

        let resized = Self::resize_image(img, scaled_width, scaled_height);
        imageops::overlay(&mut canvas, &resized, x_offset as i64, y_offset as i64);
        canvas
    }

    /// Map `img` onto `target` according to the variant mode.
    ///
    /// `Crop` and `Pad` need both sides; with only one they behave like `Resize`.
    pub fn apply(img: &DynamicImage, mode: VariantMode, target: TargetBox, upscale: bool) -> DynamicImage {
        let (orig_width, orig_height) = img.dimensions();
        match (mode, target.width, target.height) {
            (VariantMode::Copy, _, _) => img.clone(),
            (_, None, None) => img.clone(),
            (VariantMode::Crop, Some(w), Some(h)) => {
                let (w, h) = Self::crop_dimensions(orig_width, orig_height, w, h, upscale);
                let filter = Self::select_filter(orig_width, orig_height, w, h);
                img.resize_to_fill(w, h, filter)
            }
            (VariantMode::Pad, Some(w), Some(h)) => Self::pad(img, w, h, upscale),
            _ => {
                let (w, h) = Self::fit_dimensions(orig_width, orig_height, target, upscale);
                Self::resize_image(img, w, h)
            }
        }
    }
}
