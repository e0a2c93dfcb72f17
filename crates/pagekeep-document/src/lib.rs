// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pagekeep-document — Document processing for Pagekeep.
//
// Provides PDF assembly (one page per image, sized to the image), PDF
// inspection (page count, page sizes, first-page thumbnails), page touch-up
// (rotate, crop, filters), and the text recognition contract with an
// optional `ocrs`-backed engine.

pub mod image;
pub mod ocr;
pub mod pdf;

// Re-export the primary structs so callers can use `pagekeep_document::PdfAssembler` etc.
pub use self::image::filter::PageFilter;
pub use self::image::processor::{CropRect, ImageProcessor};
pub use ocr::{LanguageHint, Recognition, TextRecognizer};
pub use pdf::reader::PdfReader;
pub use pdf::writer::{AssembledPdf, PageInput, PdfAssembler};

#[cfg(feature = "ocr")]
pub use ocr::engine::OcrEngine;
