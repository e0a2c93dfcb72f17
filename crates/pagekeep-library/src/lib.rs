// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pagekeep-library — the durable catalogs behind Pagekeep.
//
// - `collections`: in-progress scans (SQLite metadata + one image file per
//   page), lazily hydrated.
// - `editor`: session-scoped reorder/delete/replace over one collection.
// - `library`: the PDF library index with folders, tags, sort, and search.
// - `folders` / `catalog`: the JSON records behind the library index.
//
// None of these types lock. They are owned by one coordinating task and
// mutated through `&mut self`; background work hands back finished results.

pub mod catalog;
pub mod collections;
pub mod editor;
pub mod folders;
pub mod integrity;
pub mod library;
pub mod ordering;

pub use collections::{CollectionStore, CollectionSummary, ScannedCollection};
pub use editor::{CloseOutcome, EditSession, PageRemoval};
pub use folders::Folder;
pub use library::{DocumentLibrary, PdfFile};
