// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page touch-up. The edits a user makes to a single scanned page before it
// is written back into its collection: quarter-turn rotation, crop,
// brightness/contrast, and filter presets.

use image::{DynamicImage, ImageFormat};
use pagekeep_core::error::PagekeepError;
use pagekeep_core::{PageImage, PageOrientation};
use tracing::{debug, info, instrument};

use super::filter::PageFilter;

/// Crop rectangle in pixel coordinates of the upright page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Edit pipeline for one page image.
///
/// Each method consumes `self` and returns the edited processor, so edits
/// chain:
///
/// ```ignore
/// let page = ImageProcessor::from_page(&page)
///     .rotate_quarter_turns(1)
///     .apply_filter(PageFilter::BlackAndWhite)
///     .into_page();
/// ```
pub struct ImageProcessor {
    image: DynamicImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Load an image from a file path.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self, PagekeepError> {
        let img = image::open(path.as_ref()).map_err(|err| {
            PagekeepError::ImageError(format!(
                "failed to open {}: {}",
                path.as_ref().display(),
                err
            ))
        })?;
        debug!(width = img.width(), height = img.height(), "Image loaded");
        Ok(Self { image: img })
    }

    /// Decode encoded bytes (JPEG, PNG, etc.).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self, PagekeepError> {
        let img = image::load_from_memory(data).map_err(|err| {
            PagekeepError::ImageError(format!("failed to decode image: {}", err))
        })?;
        Ok(Self { image: img })
    }

    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    /// Start editing a page; its orientation is baked into the pixels.
    pub fn from_page(page: &PageImage) -> Self {
        Self {
            image: page.upright(),
        }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    /// Finish editing, producing an upright page.
    pub fn into_page(self) -> PageImage {
        PageImage::new(self.image)
    }

    // -- Edits ----------------------------------------------------------------

    /// Rotate by `turns` clockwise quarter turns (negative turns rotate
    /// counter-clockwise). Lossless.
    #[instrument(skip(self))]
    pub fn rotate_quarter_turns(self, turns: i32) -> Self {
        let mut orientation = PageOrientation::Up;
        for _ in 0..turns.rem_euclid(4) {
            orientation = orientation.rotated_clockwise();
        }
        let image = PageImage::with_orientation(self.image, orientation).into_upright();
        Self { image }
    }

    /// Crop to `rect`, clamped to the image bounds. A rectangle that falls
    /// entirely outside the image leaves it unchanged.
    #[instrument(skip(self))]
    pub fn crop(self, rect: CropRect) -> Self {
        let (img_w, img_h) = (self.image.width(), self.image.height());
        if rect.x >= img_w || rect.y >= img_h || rect.width == 0 || rect.height == 0 {
            debug!("Crop rectangle outside image; ignoring");
            return self;
        }

        let width = rect.width.min(img_w - rect.x);
        let height = rect.height.min(img_h - rect.y);
        info!(x = rect.x, y = rect.y, width, height, "Cropping page");

        Self {
            image: self.image.crop_imm(rect.x, rect.y, width, height),
        }
    }

    /// Brighten (positive) or darken (negative), clamped to -255..=255.
    pub fn adjust_brightness(self, value: i32) -> Self {
        Self {
            image: self.image.brighten(value.clamp(-255, 255)),
        }
    }

    /// Contrast change in percent; positive values increase contrast.
    pub fn adjust_contrast(self, percent: f32) -> Self {
        Self {
            image: self.image.adjust_contrast(percent),
        }
    }

    pub fn grayscale(self) -> Self {
        self.apply_filter(PageFilter::Grayscale)
    }

    #[instrument(skip(self))]
    pub fn apply_filter(self, filter: PageFilter) -> Self {
        Self {
            image: filter.apply(self.image),
        }
    }

    // -- Output ---------------------------------------------------------------

    pub fn to_png_bytes(&self) -> Result<Vec<u8>, PagekeepError> {
        encode_png(&self.image)
    }

    /// Encode as JPEG with the given quality (1-100).
    pub fn to_jpeg_bytes(&self, quality: u8) -> Result<Vec<u8>, PagekeepError> {
        encode_jpeg(&self.image, quality)
    }
}

/// Encode an image as PNG bytes.
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, PagekeepError> {
    let mut buffer = Vec::new();
    image
        .write_to(&mut std::io::Cursor::new(&mut buffer), ImageFormat::Png)
        .map_err(|err| PagekeepError::ImageError(format!("PNG encoding failed: {}", err)))?;
    Ok(buffer)
}

/// Encode an image as baseline JPEG. Alpha is dropped.
pub fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, PagekeepError> {
    let mut buffer = Vec::new();
    let encoder =
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
    image
        .to_rgb8()
        .write_with_encoder(encoder)
        .map_err(|err| PagekeepError::ImageError(format!("JPEG encoding failed: {}", err)))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn sample(width: u32, height: u32) -> ImageProcessor {
        ImageProcessor::from_dynamic(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            width,
            height,
            Rgb([120, 130, 140]),
        )))
    }

    #[test]
    fn quarter_turns_swap_dimensions() {
        let rotated = sample(30, 10).rotate_quarter_turns(1);
        assert_eq!((rotated.width(), rotated.height()), (10, 30));

        let back = rotated.rotate_quarter_turns(-1);
        assert_eq!((back.width(), back.height()), (30, 10));

        let full = sample(30, 10).rotate_quarter_turns(4);
        assert_eq!((full.width(), full.height()), (30, 10));
    }

    #[test]
    fn crop_is_clamped_to_bounds() {
        let cropped = sample(100, 50).crop(CropRect {
            x: 80,
            y: 10,
            width: 500,
            height: 20,
        });
        assert_eq!((cropped.width(), cropped.height()), (20, 20));
    }

    #[test]
    fn crop_outside_image_is_ignored() {
        let cropped = sample(100, 50).crop(CropRect {
            x: 200,
            y: 0,
            width: 10,
            height: 10,
        });
        assert_eq!((cropped.width(), cropped.height()), (100, 50));
    }

    #[test]
    fn jpeg_round_trip_keeps_dimensions() {
        let bytes = sample(64, 48).to_jpeg_bytes(80).expect("encode");
        let decoded = ImageProcessor::from_bytes(&bytes).expect("decode");
        assert_eq!((decoded.width(), decoded.height()), (64, 48));
    }

    #[test]
    fn from_page_bakes_orientation() {
        let page = PageImage::with_orientation(
            DynamicImage::ImageRgb8(RgbImage::new(40, 20)),
            PageOrientation::Left,
        );
        let processor = ImageProcessor::from_page(&page);
        assert_eq!((processor.width(), processor.height()), (20, 40));
        assert_eq!(processor.into_page().orientation(), PageOrientation::Up);
    }

    #[test]
    fn brightness_saturates() {
        let bright = sample(2, 2).adjust_brightness(1000).into_dynamic().to_rgb8();
        assert_eq!(bright.get_pixel(0, 0), &Rgb([255, 255, 255]));
    }
}
