// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Contracts for page image sources.

use pagekeep_core::error::Result;
use pagekeep_core::{CollectionSource, PageImage};

/// Produces an ordered batch of page images.
///
/// `Ok(None)` means the user backed out. `Ok(Some(vec![]))` is a completed
/// capture with nothing usable in it. Neither is an error; the collection
/// store treats both as "nothing to add".
pub trait PageImageSource: Send {
    fn acquire(&self) -> Result<Option<Vec<PageImage>>>;
}

/// Native capture capabilities grouped per host.
pub trait PlatformBridge: Send + Sync {
    /// Human-readable platform name (e.g. "iOS 17").
    fn platform_name(&self) -> &str;

    /// Run the document camera and return the scanned pages.
    fn scan_document(&self) -> Result<Option<Vec<PageImage>>>;

    /// Let the user pick photos from their library.
    fn pick_photos(&self) -> Result<Option<Vec<PageImage>>>;

    /// Dispatch on where a new collection's pages should come from.
    fn acquire(&self, source: CollectionSource) -> Result<Option<Vec<PageImage>>> {
        match source {
            CollectionSource::Scan => self.scan_document(),
            CollectionSource::PhotoImport => self.pick_photos(),
        }
    }
}
