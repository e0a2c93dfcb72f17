// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan filter presets offered in the page editor.

use image::{DynamicImage, GrayImage, Luma};
use imageproc::contrast::otsu_level;
use imageproc::filter::gaussian_blur_f32;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Contrast boost applied by [`PageFilter::Enhanced`], in percent.
const ENHANCE_CONTRAST: f32 = 25.0;
/// Brightness lift applied by [`PageFilter::Enhanced`].
const ENHANCE_BRIGHTNESS: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageFilter {
    #[default]
    Original,
    Grayscale,
    /// Global Otsu threshold after a light blur; good for text-only pages.
    BlackAndWhite,
    /// Colour kept, contrast and brightness lifted.
    Enhanced,
}

impl PageFilter {
    pub fn apply(self, image: DynamicImage) -> DynamicImage {
        match self {
            Self::Original => image,
            Self::Grayscale => DynamicImage::ImageLuma8(image.to_luma8()),
            Self::BlackAndWhite => DynamicImage::ImageLuma8(binarize(&image.to_luma8())),
            Self::Enhanced => image
                .adjust_contrast(ENHANCE_CONTRAST)
                .brighten(ENHANCE_BRIGHTNESS),
        }
    }

    /// Parse a user-facing keyword.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.to_ascii_lowercase().as_str() {
            "original" | "none" => Some(Self::Original),
            "grayscale" | "gray" | "grey" => Some(Self::Grayscale),
            "bw" | "black-and-white" => Some(Self::BlackAndWhite),
            "enhanced" | "enhance" => Some(Self::Enhanced),
            _ => None,
        }
    }
}

fn binarize(gray: &GrayImage) -> GrayImage {
    if gray.width() == 0 || gray.height() == 0 {
        return gray.clone();
    }
    let smoothed = gaussian_blur_f32(gray, 1.0);
    let level = otsu_level(&smoothed);
    debug!(level, "Otsu threshold computed");

    let mut output = smoothed;
    for pixel in output.pixels_mut() {
        *pixel = if pixel.0[0] <= level { Luma([0]) } else { Luma([255]) };
    }
    output
}
