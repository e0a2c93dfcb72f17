// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Pagekeep.

use thiserror::Error;

use crate::types::{CollectionId, DocumentId, FolderId};

/// Top-level error type for all Pagekeep operations.
#[derive(Debug, Error)]
pub enum PagekeepError {
    // -- Assembly / document errors --
    #[error("no usable page images were supplied")]
    EmptyInput,

    #[error("unreadable PDF: {0}")]
    UnreadablePdf(String),

    #[error("PDF operation failed: {0}")]
    PdfError(String),

    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("text recognition failed: {0}")]
    OcrError(String),

    // -- Catalog lookups --
    #[error("scanned collection {0} not found")]
    CollectionNotFound(CollectionId),

    #[error("document {0} not found")]
    DocumentNotFound(DocumentId),

    #[error("folder {0} not found")]
    FolderNotFound(FolderId),

    #[error("page {index} out of range (collection has {len} pages)")]
    PageOutOfRange { index: usize, len: usize },

    // -- Storage / persistence --
    #[error("catalog file is corrupt: {0}")]
    CatalogCorrupt(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -- Collaborators --
    #[error("page source error: {0}")]
    Bridge(String),

    #[error("feature not available on this platform")]
    PlatformUnavailable,

    #[error("background task did not complete: {0}")]
    Cancelled(String),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PagekeepError>;
