// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader: page count, page sizes, and first-page thumbnails for library
// documents, using the `lopdf` crate.
//
// Thumbnails are produced by decoding the largest image XObject on page 1.
// Library PDFs are image-only, so that image *is* the page. Anything that
// cannot be decoded yields no thumbnail rather than an error.

use std::path::Path;

use image::{DynamicImage, GrayImage, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use pagekeep_core::error::PagekeepError;
use tracing::{debug, instrument, warn};

/// Guard against cyclic /Parent chains in malformed files.
const MAX_PARENT_DEPTH: usize = 32;

/// Read-only view of an existing PDF.
pub struct PdfReader {
    document: Document,
    /// Source path, if opened from a file (useful for diagnostics).
    source_path: Option<String>,
}

impl PdfReader {
    // -- Construction ---------------------------------------------------------

    /// Open a PDF from the filesystem. Missing files and invalid PDFs both
    /// fail with [`PagekeepError::UnreadablePdf`].
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PagekeepError> {
        let path_ref = path.as_ref();
        let document = Document::load(path_ref).map_err(|err| {
            PagekeepError::UnreadablePdf(format!("{}: {}", path_ref.display(), err))
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded");

        Ok(Self {
            document,
            source_path: Some(path_ref.display().to_string()),
        })
    }

    /// Create a reader from raw PDF bytes already in memory.
    pub fn from_bytes(data: &[u8]) -> Result<Self, PagekeepError> {
        let document = Document::load_mem(data)
            .map_err(|err| PagekeepError::UnreadablePdf(format!("in-memory PDF: {}", err)))?;
        Ok(Self {
            document,
            source_path: None,
        })
    }

    // -- Inspection -----------------------------------------------------------

    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    pub fn source_path(&self) -> Option<&str> {
        self.source_path.as_deref()
    }

    /// (width, height) in points for each page, in page order. `None` for a
    /// page without a usable media box.
    pub fn page_sizes(&self) -> Vec<Option<(f32, f32)>> {
        self.document
            .get_pages()
            .values()
            .map(|&page_id| self.media_box(page_id))
            .collect()
    }

    /// Media box of a page, following /Parent inheritance.
    fn media_box(&self, page_id: ObjectId) -> Option<(f32, f32)> {
        let mut dict = self.document.get_dictionary(page_id).ok()?;
        for _ in 0..MAX_PARENT_DEPTH {
            if let Ok(obj) = dict.get(b"MediaBox") {
                let values: Vec<f32> = self
                    .resolve(obj)?
                    .as_array()
                    .ok()?
                    .iter()
                    .filter_map(|v| number(self.resolve(v)?))
                    .collect();
                if values.len() != 4 {
                    return None;
                }
                let width = (values[2] - values[0]).abs();
                let height = (values[3] - values[1]).abs();
                return (width > 0.0 && height > 0.0).then_some((width, height));
            }
            let parent = dict.get(b"Parent").ok()?;
            dict = self.resolve(parent)?.as_dict().ok()?;
        }
        None
    }

    // -- Thumbnails -----------------------------------------------------------

    /// Render page 1 scaled so its longest side is at most `max_dimension`.
    pub fn thumbnail(&self, max_dimension: u32) -> Option<DynamicImage> {
        let image = self.first_page_image()?;
        Some(image.thumbnail(max_dimension.max(1), max_dimension.max(1)))
    }

    /// Decode the largest image drawn on page 1.
    fn first_page_image(&self) -> Option<DynamicImage> {
        let first_page = *self.document.get_pages().values().next()?;
        let page = self.document.get_dictionary(first_page).ok()?;
        let resources = self.resolve(page.get(b"Resources").ok()?)?.as_dict().ok()?;
        let xobjects = self.resolve(resources.get(b"XObject").ok()?)?.as_dict().ok()?;

        let largest = xobjects
            .iter()
            .filter_map(|(_, obj)| match self.resolve(obj)? {
                Object::Stream(stream) if is_image(&stream.dict) => Some(stream),
                _ => None,
            })
            .max_by_key(|stream| {
                let w = int(&stream.dict, b"Width").unwrap_or(0);
                let h = int(&stream.dict, b"Height").unwrap_or(0);
                w.saturating_mul(h)
            })?;

        let components = self.color_components(&largest.dict);
        match decode_image_stream(largest, components) {
            Some(img) => Some(img),
            None => {
                warn!(source = ?self.source_path, "Could not decode first-page image");
                None
            }
        }
    }

    /// Colour channels of an image's /ColorSpace. Handles device names and
    /// `[/ICCBased <stream>]`, direct or by reference.
    fn color_components(&self, dict: &Dictionary) -> Option<usize> {
        match self.resolve(dict.get(b"ColorSpace").ok()?)? {
            Object::Name(space) => device_components(space),
            Object::Array(items) => {
                let family = match self.resolve(items.first()?)? {
                    Object::Name(n) => n.as_slice(),
                    _ => return None,
                };
                match family {
                    b"ICCBased" => match self.resolve(items.get(1)?)? {
                        Object::Stream(profile) => {
                            usize::try_from(int(&profile.dict, b"N")?).ok()
                        }
                        _ => None,
                    },
                    b"CalRGB" => Some(3),
                    b"CalGray" => Some(1),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    fn resolve<'a>(&'a self, object: &'a Object) -> Option<&'a Object> {
        match object {
            Object::Reference(id) => self.document.get_object(*id).ok(),
            other => Some(other),
        }
    }
}

/// Page count of the PDF at `path`.
pub fn page_count(path: impl AsRef<Path>) -> Result<usize, PagekeepError> {
    Ok(PdfReader::open(path)?.page_count())
}

/// First-page thumbnail of the PDF at `path`; `None` on any failure.
#[instrument(skip_all, fields(path = %path.as_ref().display(), max_dimension))]
pub fn render_thumbnail(path: impl AsRef<Path>, max_dimension: u32) -> Option<DynamicImage> {
    match PdfReader::open(path) {
        Ok(reader) => reader.thumbnail(max_dimension),
        Err(err) => {
            debug!(%err, "No thumbnail");
            None
        }
    }
}

// -- lopdf helpers -------------------------------------------------------------

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

fn int(dict: &Dictionary, key: &[u8]) -> Option<u64> {
    match dict.get(key).ok()? {
        Object::Integer(i) if *i >= 0 => Some(*i as u64),
        _ => None,
    }
}

fn name<'a>(dict: &'a Dictionary, key: &[u8]) -> Option<&'a [u8]> {
    match dict.get(key).ok()? {
        Object::Name(n) => Some(n.as_slice()),
        _ => None,
    }
}

fn is_image(dict: &Dictionary) -> bool {
    name(dict, b"Subtype") == Some(b"Image".as_slice())
}

/// Filter chain of a stream, outermost first.
fn filters(dict: &Dictionary) -> Vec<Vec<u8>> {
    match dict.get(b"Filter") {
        Ok(Object::Name(n)) => vec![n.clone()],
        Ok(Object::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Object::Name(n) => Some(n.clone()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn device_components(space: &[u8]) -> Option<usize> {
    match space {
        b"DeviceRGB" => Some(3),
        b"DeviceGray" => Some(1),
        _ => None,
    }
}

/// Decode an image XObject encoded as JPEG, or as raw/Flate 8-bit RGB or
/// gray with `components` channels.
fn decode_image_stream(stream: &Stream, components: Option<usize>) -> Option<DynamicImage> {
    let filters = filters(&stream.dict);

    if filters.iter().any(|f| f.as_slice() == b"DCTDecode") {
        let jpeg = if filters.len() == 1 {
            stream.content.clone()
        } else {
            stream.decompressed_content().ok()?
        };
        return image::load_from_memory(&jpeg).ok();
    }

    let width = u32::try_from(int(&stream.dict, b"Width")?).ok()?;
    let height = u32::try_from(int(&stream.dict, b"Height")?).ok()?;
    if int(&stream.dict, b"BitsPerComponent") != Some(8) {
        return None;
    }

    let pixels = if filters.is_empty() {
        stream.content.clone()
    } else {
        stream.decompressed_content().ok()?
    };

    match components? {
        3 => {
            let expected = width as usize * height as usize * 3;
            let pixels = pixels.get(..expected)?.to_vec();
            RgbImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgb8)
        }
        1 => {
            let expected = width as usize * height as usize;
            let pixels = pixels.get(..expected)?.to_vec();
            GrayImage::from_raw(width, height, pixels).map(DynamicImage::ImageLuma8)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::processor::encode_jpeg;
    use image::Rgb;
    use lopdf::dictionary;

    /// Single-page PDF whose page is one JPEG image of `width` x `height`.
    fn jpeg_pdf(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([10, 120, 240])));
        let jpeg = encode_jpeg(&img, 85).expect("jpeg");

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let image_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            jpeg,
        ));
        let resources_id = doc.add_object(dictionary! {
            "XObject" => dictionary! { "Im0" => image_id },
        });
        let content = format!("q {width} 0 0 {height} 0 0 cm /Im0 Do Q");
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "MediaBox" => vec![0.into(), 0.into(), (width as i64).into(), (height as i64).into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).expect("save");
        bytes
    }

    #[test]
    fn page_count_and_inherited_media_box() {
        let reader = PdfReader::from_bytes(&jpeg_pdf(200, 100)).expect("load");
        assert_eq!(reader.page_count(), 1);
        assert_eq!(reader.page_sizes(), vec![Some((200.0, 100.0))]);
    }

    #[test]
    fn thumbnail_is_bounded_and_keeps_aspect() {
        let reader = PdfReader::from_bytes(&jpeg_pdf(400, 200)).expect("load");
        let thumb = reader.thumbnail(64).expect("thumbnail");
        assert_eq!((thumb.width(), thumb.height()), (64, 32));
    }

    #[test]
    fn missing_file_is_unreadable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let result = page_count(dir.path().join("nope.pdf"));
        assert!(matches!(result, Err(PagekeepError::UnreadablePdf(_))));
    }

    #[test]
    fn garbage_file_is_unreadable_and_has_no_thumbnail() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("junk.pdf");
        std::fs::write(&path, b"this is not a pdf").expect("write");

        assert!(matches!(page_count(&path), Err(PagekeepError::UnreadablePdf(_))));
        assert!(render_thumbnail(&path, 128).is_none());
    }
}
