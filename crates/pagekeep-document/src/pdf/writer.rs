// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF assembly: flatten an ordered list of page images into one PDF using
// `printpdf` 0.8.
//
// Every image becomes one page whose media box has exactly the image's
// aspect ratio; the image fills the page with no margins or letterboxing.
// One pixel maps to one point unless the image is larger than the PDF
// page-size limit, in which case the effective DPI is raised just enough to
// fit.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use image::DynamicImage;
use pagekeep_core::PageImage;
use pagekeep_core::error::PagekeepError;
use printpdf::{
    Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Pt, RawImage, RawImageData,
    RawImageFormat, XObjectTransform,
};
use tracing::{debug, info, instrument, warn};

/// Largest page side PDF viewers are required to support (200 inches).
const MAX_PAGE_SIDE_PT: f32 = 14_400.0;
/// Points per inch.
const POINTS_PER_INCH: f32 = 72.0;
/// Filename-safe timestamp embedded in assembled file names.
const FILE_STAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// One page handed to the assembler.
#[derive(Debug, Clone)]
pub enum PageInput {
    /// Already decoded page.
    Page(PageImage),
    /// Encoded image bytes (JPEG, PNG, ...).
    Encoded(Vec<u8>),
    /// Image file on disk, e.g. a persisted collection page.
    File(PathBuf),
}

impl PageInput {
    fn describe(&self) -> String {
        match self {
            Self::Page(_) => "decoded page".to_string(),
            Self::Encoded(bytes) => format!("{} encoded bytes", bytes.len()),
            Self::File(path) => path.display().to_string(),
        }
    }

    fn decode(&self) -> Result<DynamicImage, PagekeepError> {
        match self {
            Self::Page(page) => Ok(page.upright()),
            Self::Encoded(bytes) => image::load_from_memory(bytes)
                .map_err(|err| PagekeepError::ImageError(err.to_string())),
            Self::File(path) => image::open(path)
                .map_err(|err| PagekeepError::ImageError(err.to_string())),
        }
    }
}

impl From<PageImage> for PageInput {
    fn from(page: PageImage) -> Self {
        Self::Page(page)
    }
}

impl From<PathBuf> for PageInput {
    fn from(path: PathBuf) -> Self {
        Self::File(path)
    }
}

/// Result of writing an assembled PDF to disk.
#[derive(Debug, Clone)]
pub struct AssembledPdf {
    pub path: PathBuf,
    pub page_count: usize,
    /// Inputs skipped because they were missing, undecodable, or degenerate.
    pub skipped: usize,
    pub byte_size: u64,
}

/// Builds image-only PDFs, one page per input image.
#[derive(Debug, Clone, Copy)]
pub struct PdfAssembler {
    /// Images with a side shorter than this are skipped.
    min_page_dimension: u32,
}

impl Default for PdfAssembler {
    fn default() -> Self {
        Self {
            min_page_dimension: 1,
        }
    }
}

impl PdfAssembler {
    pub fn new(min_page_dimension: u32) -> Self {
        Self {
            min_page_dimension: min_page_dimension.max(1),
        }
    }

    /// Render `pages` into PDF bytes.
    ///
    /// Unusable inputs are skipped with a warning; if none remain the call
    /// fails with [`PagekeepError::EmptyInput`]. Returns the bytes and the
    /// number of pages written.
    #[instrument(skip_all, fields(inputs = pages.len(), title))]
    pub fn render(
        &self,
        pages: &[PageInput],
        title: &str,
    ) -> Result<(Vec<u8>, usize), PagekeepError> {
        let mut doc = PdfDocument::new(title);
        let mut pdf_pages: Vec<PdfPage> = Vec::with_capacity(pages.len());

        for (index, input) in pages.iter().enumerate() {
            let decoded = match input.decode() {
                Ok(img) => img,
                Err(err) => {
                    warn!(index, source = %input.describe(), %err, "Skipping unreadable page image");
                    continue;
                }
            };
            let (width, height) = (decoded.width(), decoded.height());
            if width < self.min_page_dimension || height < self.min_page_dimension {
                warn!(index, width, height, "Skipping degenerate page image");
                continue;
            }

            let raw = RawImage {
                pixels: RawImageData::U8(decoded.to_rgb8().into_raw()),
                width: width as usize,
                height: height as usize,
                data_format: RawImageFormat::RGB8,
                tag: Vec::new(),
            };
            let xobject_id = doc.add_image(&raw);

            let dpi = effective_dpi(width, height);
            let page_w_pt = width as f32 * POINTS_PER_INCH / dpi;
            let page_h_pt = height as f32 * POINTS_PER_INCH / dpi;

            let ops = vec![Op::UseXobject {
                id: xobject_id,
                transform: XObjectTransform {
                    translate_x: Some(Pt(0.0)),
                    translate_y: Some(Pt(0.0)),
                    scale_x: None,
                    scale_y: None,
                    dpi: Some(dpi),
                    rotate: None,
                },
            }];

            pdf_pages.push(PdfPage::new(
                Mm::from(Pt(page_w_pt)),
                Mm::from(Pt(page_h_pt)),
                ops,
            ));
            debug!(index, width, height, dpi, "Page added");
        }

        if pdf_pages.is_empty() {
            return Err(PagekeepError::EmptyInput);
        }

        let page_count = pdf_pages.len();
        doc.with_pages(pdf_pages);

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let output = doc.save(&PdfSaveOptions::default(), &mut warnings);
        if !warnings.is_empty() {
            debug!(warnings = warnings.len(), "printpdf reported warnings");
        }

        Ok((output, page_count))
    }

    /// Render `pages` and write them to a new file in `output_dir`.
    ///
    /// The filename is derived from `display_name` plus a timestamp, with a
    /// numeric suffix when that name is taken. Existing files are never
    /// overwritten and nothing is written when assembly fails.
    #[instrument(skip(self, pages), fields(inputs = pages.len(), output_dir = %output_dir.as_ref().display()))]
    pub fn assemble(
        &self,
        pages: &[PageInput],
        display_name: &str,
        output_dir: impl AsRef<Path>,
    ) -> Result<AssembledPdf, PagekeepError> {
        if pages.is_empty() {
            return Err(PagekeepError::EmptyInput);
        }

        let (bytes, page_count) = self.render(pages, display_name)?;

        let stem = format!(
            "{}-{}",
            sanitize_file_stem(display_name),
            Local::now().format(FILE_STAMP_FORMAT)
        );
        let path = write_new_file(output_dir.as_ref(), &stem, "pdf", &bytes)?;

        info!(
            path = %path.display(),
            page_count,
            skipped = pages.len() - page_count,
            "Assembled PDF"
        );

        Ok(AssembledPdf {
            path,
            page_count,
            skipped: pages.len() - page_count,
            byte_size: bytes.len() as u64,
        })
    }
}

/// DPI at which an image of this size fits within the PDF page limit.
fn effective_dpi(width: u32, height: u32) -> f32 {
    let longest = width.max(height) as f32;
    if longest <= MAX_PAGE_SIDE_PT {
        POINTS_PER_INCH
    } else {
        POINTS_PER_INCH * longest / MAX_PAGE_SIDE_PT
    }
}

/// Turn a display name into something safe to use as a filename stem.
pub fn sanitize_file_stem(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            c if c.is_control() => '-',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim_matches(|c: char| c == '.' || c.is_whitespace());
    if cleaned.is_empty() {
        "Document".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Create `dir/stem.ext`, or `dir/stem-2.ext`, `dir/stem-3.ext`, ... when
/// taken. Uses `create_new` so a concurrent writer cannot be clobbered.
fn write_new_file(
    dir: &Path,
    stem: &str,
    ext: &str,
    bytes: &[u8],
) -> Result<PathBuf, PagekeepError> {
    std::fs::create_dir_all(dir)?;

    let mut attempt: u32 = 1;
    loop {
        let name = if attempt == 1 {
            format!("{stem}.{ext}")
        } else {
            format!("{stem}-{attempt}.{ext}")
        };
        let path = dir.join(name);

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                if let Err(err) = file.write_all(bytes).and_then(|_| file.sync_all()) {
                    drop(file);
                    let _ = std::fs::remove_file(&path);
                    return Err(err.into());
                }
                return Ok(path);
            }
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                attempt += 1;
            }
            Err(err) => return Err(err.into()),
        }
    }
}
