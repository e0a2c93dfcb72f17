// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Library configuration. The storage root is always injected by the caller;
// nothing in Pagekeep looks up a global documents directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

const FOLDERS_FILE: &str = "folders.json";
const DOCUMENTS_FILE: &str = "documents.json";
const COLLECTIONS_DB: &str = "collections.db";
const COLLECTIONS_DIR: &str = "collections";

/// Persistent library settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Root directory holding library PDFs and all catalog records.
    pub storage_root: PathBuf,
    /// Longest side of generated thumbnails, in pixels.
    pub thumbnail_max_dimension: u32,
    /// Images with a side shorter than this are treated as degenerate.
    pub min_page_dimension: u32,
    /// JPEG quality (1-100) for persisted page images.
    pub page_jpeg_quality: u8,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            storage_root: PathBuf::from("."),
            thumbnail_max_dimension: 256,
            min_page_dimension: 4,
            page_jpeg_quality: 90,
        }
    }
}

impl LibraryConfig {
    /// Default settings rooted at `storage_root`.
    pub fn new(storage_root: impl Into<PathBuf>) -> Self {
        Self {
            storage_root: storage_root.into(),
            ..Self::default()
        }
    }

    pub fn storage_root(&self) -> &Path {
        &self.storage_root
    }

    /// Folder metadata record.
    pub fn folders_path(&self) -> PathBuf {
        self.storage_root.join(FOLDERS_FILE)
    }

    /// Per-document display names and tags, keyed by storage filename.
    pub fn documents_path(&self) -> PathBuf {
        self.storage_root.join(DOCUMENTS_FILE)
    }

    /// SQLite database with scanned collection metadata.
    pub fn collections_db_path(&self) -> PathBuf {
        self.storage_root.join(COLLECTIONS_DB)
    }

    /// Parent directory of the per-collection page image directories.
    pub fn collections_dir(&self) -> PathBuf {
        self.storage_root.join(COLLECTIONS_DIR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_paths_live_under_root() {
        let config = LibraryConfig::new("/data/pagekeep");
        assert_eq!(config.folders_path(), PathBuf::from("/data/pagekeep/folders.json"));
        assert_eq!(
            config.collections_dir(),
            PathBuf::from("/data/pagekeep/collections")
        );
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: LibraryConfig =
            serde_json::from_str(r#"{"storage_root":"/tmp/x","page_jpeg_quality":70}"#)
                .expect("parse");
        assert_eq!(config.page_jpeg_quality, 70);
        assert_eq!(config.thumbnail_max_dimension, 256);
        assert_eq!(config.storage_root, PathBuf::from("/tmp/x"));
    }
}
