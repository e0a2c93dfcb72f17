// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page images read from files, in the order given.

use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageDecoder, ImageReader};
use pagekeep_core::PageImage;
use pagekeep_core::error::{PagekeepError, Result};
use tracing::{debug, warn};

use crate::traits::PageImageSource;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tif", "tiff", "webp", "bmp", "gif"];

/// A fixed list of image files standing in for a capture.
#[derive(Debug, Clone, Default)]
pub struct FileImageSource {
    paths: Vec<PathBuf>,
}

impl FileImageSource {
    pub fn new(paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    /// Every image file directly inside `dir`, sorted by filename.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir.as_ref())?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_image_file(path))
            .collect();
        paths.sort();
        Ok(Self { paths })
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

impl PageImageSource for FileImageSource {
    /// An empty file list counts as cancelled. Files that fail to decode
    /// are skipped.
    fn acquire(&self) -> Result<Option<Vec<PageImage>>> {
        if self.paths.is_empty() {
            return Ok(None);
        }
        let mut pages = Vec::with_capacity(self.paths.len());
        for path in &self.paths {
            match load_upright(path) {
                Ok(image) => pages.push(PageImage::new(image)),
                Err(err) => warn!(path = %path.display(), %err, "skipping unreadable image"),
            }
        }
        debug!(requested = self.paths.len(), loaded = pages.len(), "images acquired");
        Ok(Some(pages))
    }
}

/// Decode an image with its EXIF orientation applied.
fn load_upright(path: &Path) -> Result<DynamicImage> {
    let image_err = |e: image::ImageError| PagekeepError::ImageError(e.to_string());
    let mut decoder = ImageReader::open(path)?
        .with_guessed_format()?
        .into_decoder()
        .map_err(image_err)?;
    let orientation = decoder.orientation().map_err(image_err)?;
    let mut image = DynamicImage::from_decoder(decoder).map_err(image_err)?;
    image.apply_orientation(orientation);
    Ok(image)
}

fn is_image_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| IMAGE_EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x)))
}
