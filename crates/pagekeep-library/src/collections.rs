// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanned collection store.
//
// Metadata lives in SQLite (`collections.db` under the storage root); every
// page is its own JPEG at `collections/<id>/page-<index>.jpg`, so replacing
// one page rewrites one file. Collections are two-state: the summary is
// always in memory, the decoded pages only after `ensure_images_loaded`.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use pagekeep_core::error::{PagekeepError, Result};
use pagekeep_core::{
    CollectionId, CollectionSource, LibraryConfig, PageImage, SortOrder, normalized_name,
};
use pagekeep_document::PageInput;
use pagekeep_document::image::processor::encode_jpeg;
use rusqlite::{Connection, params};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::editor::EditSession;
use crate::ordering::{self, Listing};

/// SQLite schema for the collections table.
const CREATE_TABLE_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS collections (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        source TEXT NOT NULL,
        created_at TEXT NOT NULL,
        page_count INTEGER NOT NULL,
        byte_size INTEGER NOT NULL DEFAULT 0
    )
"#;

const PAGE_EXTENSION: &str = "jpg";

/// Always-resident description of a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionSummary {
    pub id: CollectionId,
    pub name: String,
    pub source: CollectionSource,
    pub created_at: DateTime<Utc>,
    pub page_count: usize,
    /// Bytes on disk across all page files.
    pub byte_size: u64,
}

impl Listing for CollectionSummary {
    fn display_name(&self) -> &str {
        &self.name
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn byte_size(&self) -> u64 {
        self.byte_size
    }
    fn listing_id(&self) -> Uuid {
        self.id.0
    }
}

/// A collection: its summary plus, once loaded, its pages.
#[derive(Debug, Clone)]
pub struct ScannedCollection {
    summary: CollectionSummary,
    pages: Option<Vec<PageImage>>,
    /// Loaded pages no longer line up with `page-<n>` files (a file was
    /// skipped or numbering has gaps); the next save rewrites every page.
    needs_compaction: bool,
}

impl ScannedCollection {
    pub fn summary(&self) -> &CollectionSummary {
        &self.summary
    }

    /// Pages, if they have been loaded.
    pub fn pages(&self) -> Option<&[PageImage]> {
        self.pages.as_deref()
    }

    pub fn is_loaded(&self) -> bool {
        self.pages.is_some()
    }
}

/// Which page files need rewriting on save.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageChanges {
    /// Pages moved or removed: every file is rewritten.
    pub layout_changed: bool,
    /// Indices whose content changed in place.
    pub replaced: BTreeSet<usize>,
}

impl PageChanges {
    pub fn is_empty(&self) -> bool {
        !self.layout_changed && self.replaced.is_empty()
    }
}

/// Durable catalog of scanned collections, newest first.
pub struct CollectionStore {
    config: LibraryConfig,
    conn: Connection,
    collections: Vec<ScannedCollection>,
}

impl CollectionStore {
    /// Open (or create) the store under `config.storage_root`.
    ///
    /// Rows whose page directory has vanished are dropped.
    #[instrument(skip_all, fields(root = %config.storage_root().display()))]
    pub fn open(config: &LibraryConfig) -> Result<Self> {
        std::fs::create_dir_all(config.collections_dir())?;

        let conn = Connection::open(config.collections_db_path())
            .map_err(|e| PagekeepError::Database(format!("open: {e}")))?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| PagekeepError::Database(format!("WAL pragma: {e}")))?;
        conn.execute_batch(CREATE_TABLE_SQL)
            .map_err(|e| PagekeepError::Database(format!("create table: {e}")))?;

        let mut store = Self {
            config: config.clone(),
            conn,
            collections: Vec::new(),
        };
        store.reload()?;
        info!(collections = store.collections.len(), "collection store opened");
        Ok(store)
    }

    /// Re-read metadata from disk, discarding loaded pages.
    pub fn reload(&mut self) -> Result<()> {
        let summaries = self.read_summaries()?;
        let mut collections = Vec::with_capacity(summaries.len());

        for summary in summaries {
            if self.page_files(summary.id)?.is_empty() {
                warn!(id = %summary.id, "collection has no page files; dropping");
                self.delete_row(summary.id)?;
                continue;
            }
            collections.push(ScannedCollection {
                summary,
                pages: None,
                needs_compaction: false,
            });
        }

        self.collections = collections;
        Ok(())
    }

    fn read_summaries(&self) -> Result<Vec<CollectionSummary>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, name, source, created_at, page_count, byte_size
                 FROM collections ORDER BY created_at DESC, rowid DESC",
            )
            .map_err(|e| PagekeepError::Database(format!("prepare: {e}")))?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, i64>(5)?,
                ))
            })
            .map_err(|e| PagekeepError::Database(format!("query: {e}")))?;

        let mut summaries = Vec::new();
        for row in rows {
            let (id, name, source, created_at, page_count, byte_size) =
                row.map_err(|e| PagekeepError::Database(format!("row: {e}")))?;

            let Ok(id) = id.parse::<CollectionId>() else {
                warn!(%id, "skipping collection row with invalid id");
                continue;
            };
            let created_at = DateTime::parse_from_rfc3339(&created_at)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| PagekeepError::Database(format!("created_at: {e}")))?;

            summaries.push(CollectionSummary {
                id,
                name,
                source: CollectionSource::from_keyword(&source).unwrap_or(CollectionSource::Scan),
                created_at,
                page_count: page_count.max(0) as usize,
                byte_size: byte_size.max(0) as u64,
            });
        }
        Ok(summaries)
    }

    // -- Queries --------------------------------------------------------------

    /// Collections in store order (newest first).
    pub fn collections(&self) -> impl Iterator<Item = &ScannedCollection> {
        self.collections.iter()
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    pub fn get(&self, id: CollectionId) -> Option<&ScannedCollection> {
        self.collections.iter().find(|c| c.summary.id == id)
    }

    /// Summaries in an explicit order; store order is unchanged.
    pub fn sorted(&self, order: SortOrder) -> Vec<&CollectionSummary> {
        ordering::sorted(self.collections.iter().map(|c| &c.summary), order)
    }

    /// Directory holding a collection's page files.
    pub fn collection_dir(&self, id: CollectionId) -> PathBuf {
        self.config.collections_dir().join(id.to_string())
    }

    fn page_path(&self, id: CollectionId, index: usize) -> PathBuf {
        self.collection_dir(id)
            .join(format!("page-{index}.{PAGE_EXTENSION}"))
    }

    /// Existing page files in page order.
    fn page_files(&self, id: CollectionId) -> Result<Vec<(usize, PathBuf)>> {
        let dir = self.collection_dir(id);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut files: Vec<(usize, PathBuf)> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let path = entry.path();
                let index = parse_page_index(&path)?;
                Some((index, path))
            })
            .collect();
        files.sort_by_key(|(index, _)| *index);
        Ok(files)
    }

    /// Inputs for PDF assembly: the in-memory pages when loaded (so unsaved
    /// edits are included), otherwise the persisted page files.
    pub fn assembly_inputs(&self, id: CollectionId) -> Result<Vec<PageInput>> {
        let collection = self.get(id).ok_or(PagekeepError::CollectionNotFound(id))?;
        match &collection.pages {
            Some(pages) => Ok(pages.iter().cloned().map(PageInput::Page).collect()),
            None => Ok(self
                .page_files(id)?
                .into_iter()
                .map(|(_, path)| PageInput::File(path))
                .collect()),
        }
    }

    // -- Mutations ------------------------------------------------------------

    /// Persist a new collection from freshly captured or imported pages.
    ///
    /// Degenerate images are dropped first; if nothing is left this is a
    /// no-op returning `None`.
    #[instrument(skip(self, images), fields(images = images.len()))]
    pub fn add(
        &mut self,
        images: Vec<PageImage>,
        source: CollectionSource,
    ) -> Result<Option<CollectionId>> {
        let min = self.config.min_page_dimension;
        let pages: Vec<PageImage> = images
            .into_iter()
            .filter(|page| !page.is_degenerate(min))
            .map(|page| PageImage::new(page.into_upright()))
            .collect();

        if pages.is_empty() {
            debug!("no usable images; nothing added");
            return Ok(None);
        }

        let id = CollectionId::new();
        let created_at = Utc::now();
        let name = source.default_name_now();

        let byte_size = match self.write_all_pages(id, &pages) {
            Ok(size) => size,
            Err(err) => {
                let _ = std::fs::remove_dir_all(self.collection_dir(id));
                return Err(err);
            }
        };

        let summary = CollectionSummary {
            id,
            name,
            source,
            created_at,
            page_count: pages.len(),
            byte_size,
        };

        if let Err(err) = self.insert_row(&summary) {
            let _ = std::fs::remove_dir_all(self.collection_dir(id));
            return Err(err);
        }

        info!(%id, name = %summary.name, pages = pages.len(), "collection added");
        self.collections.insert(
            0,
            ScannedCollection {
                summary,
                pages: Some(pages),
                needs_compaction: false,
            },
        );
        Ok(Some(id))
    }

    /// Rename a collection. Blank names are ignored (`Ok(false)`).
    #[instrument(skip(self))]
    pub fn rename(&mut self, id: CollectionId, new_name: &str) -> Result<bool> {
        let Some(name) = normalized_name(new_name) else {
            debug!("blank name; rename ignored");
            return Ok(false);
        };
        let index = self.index_of(id)?;

        self.conn
            .execute(
                "UPDATE collections SET name = ?1 WHERE id = ?2",
                params![name, id.to_string()],
            )
            .map_err(|e| PagekeepError::Database(format!("rename: {e}")))?;

        self.collections[index].summary.name = name.to_string();
        info!(%id, name, "collection renamed");
        Ok(true)
    }

    /// Delete a collection's metadata and page files. Returns whether
    /// anything was removed; removing an unknown id is not an error.
    #[instrument(skip(self))]
    pub fn remove(&mut self, id: CollectionId) -> Result<bool> {
        match std::fs::remove_dir_all(self.collection_dir(id)) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }

        let existed = self.delete_row(id)?;

        let before = self.collections.len();
        self.collections.retain(|c| c.summary.id != id);
        let removed = existed || before != self.collections.len();
        if removed {
            info!(%id, "collection removed");
        }
        Ok(removed)
    }

    /// Decode a collection's pages into memory. Idempotent; already loaded
    /// collections return immediately. Missing or corrupt page files are
    /// skipped with a warning.
    #[instrument(skip(self))]
    pub fn ensure_images_loaded(&mut self, id: CollectionId) -> Result<&[PageImage]> {
        let index = self.index_of(id)?;

        if self.collections[index].pages.is_none() {
            let mut pages = Vec::new();
            let mut in_place = true;
            for (page_index, path) in self.page_files(id)? {
                match image::open(&path) {
                    Ok(img) => {
                        in_place &= page_index == pages.len();
                        pages.push(PageImage::new(img));
                    }
                    Err(err) => {
                        warn!(%id, page_index, %err, "skipping unreadable page file");
                        in_place = false;
                    }
                }
            }
            debug!(%id, pages = pages.len(), in_place, "pages loaded");

            let collection = &mut self.collections[index];
            collection.summary.page_count = pages.len();
            collection.pages = Some(pages);
            collection.needs_compaction = !in_place;
        }

        Ok(self.collections[index].pages.as_deref().unwrap_or_default())
    }

    /// Drop decoded pages, keeping the summary.
    pub fn unload_images(&mut self, id: CollectionId) {
        if let Some(collection) = self.collections.iter_mut().find(|c| c.summary.id == id) {
            collection.pages = None;
            collection.needs_compaction = false;
        }
    }

    /// Start an editing session on one collection.
    pub fn edit(&mut self, id: CollectionId) -> Result<EditSession<'_>> {
        EditSession::open(self, id)
    }

    /// Live, loaded page list for the editor.
    pub(crate) fn pages_mut(&mut self, id: CollectionId) -> Result<&mut Vec<PageImage>> {
        self.ensure_images_loaded(id)?;
        let index = self.index_of(id)?;
        let collection = &mut self.collections[index];
        collection.summary.page_count = collection.pages.as_ref().map_or(0, Vec::len);
        collection
            .pages
            .as_mut()
            .ok_or(PagekeepError::CollectionNotFound(id))
    }

    /// Write the in-memory pages of `id` back to disk.
    ///
    /// A collection left with no pages is removed instead.
    #[instrument(skip(self, changes), fields(layout_changed = changes.layout_changed, replaced = changes.replaced.len()))]
    pub fn save_pages(&mut self, id: CollectionId, changes: &PageChanges) -> Result<()> {
        let index = self.index_of(id)?;
        let Some(pages) = self.collections[index].pages.take() else {
            return Ok(());
        };

        if pages.is_empty() {
            self.remove(id)?;
            return Ok(());
        }

        let rewrite_all = changes.layout_changed || self.collections[index].needs_compaction;
        let result = self.write_changes(id, &pages, rewrite_all, &changes.replaced);
        let collection = &mut self.collections[index];
        collection.summary.page_count = pages.len();
        collection.pages = Some(pages);
        let byte_size = result?;
        collection.summary.byte_size = byte_size;
        collection.needs_compaction = false;

        let page_count = collection.summary.page_count;
        self.conn
            .execute(
                "UPDATE collections SET page_count = ?1, byte_size = ?2 WHERE id = ?3",
                params![page_count as i64, byte_size as i64, id.to_string()],
            )
            .map_err(|e| PagekeepError::Database(format!("update pages: {e}")))?;

        info!(%id, page_count, byte_size, "collection saved");
        Ok(())
    }

    fn write_changes(
        &self,
        id: CollectionId,
        pages: &[PageImage],
        rewrite_all: bool,
        replaced: &BTreeSet<usize>,
    ) -> Result<u64> {
        if rewrite_all {
            let size = self.write_all_pages(id, pages)?;
            for (index, path) in self.page_files(id)? {
                if index >= pages.len() {
                    std::fs::remove_file(&path)?;
                }
            }
            return Ok(size);
        }

        for &index in replaced {
            if let Some(page) = pages.get(index) {
                self.write_page(id, index, page)?;
            }
        }
        self.disk_size(id)
    }

    fn write_all_pages(&self, id: CollectionId, pages: &[PageImage]) -> Result<u64> {
        std::fs::create_dir_all(self.collection_dir(id))?;
        let mut total = 0u64;
        for (index, page) in pages.iter().enumerate() {
            total += self.write_page(id, index, page)?;
        }
        Ok(total)
    }

    fn write_page(&self, id: CollectionId, index: usize, page: &PageImage) -> Result<u64> {
        let bytes = encode_jpeg(&page.upright(), self.config.page_jpeg_quality)?;
        let path = self.page_path(id, index);
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, &bytes)?;
        std::fs::rename(&tmp, &path)?;
        Ok(bytes.len() as u64)
    }

    fn disk_size(&self, id: CollectionId) -> Result<u64> {
        let mut total = 0;
        for (_, path) in self.page_files(id)? {
            total += std::fs::metadata(&path)?.len();
        }
        Ok(total)
    }

    fn insert_row(&self, summary: &CollectionSummary) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO collections (id, name, source, created_at, page_count, byte_size)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    summary.id.to_string(),
                    summary.name,
                    summary.source.as_str(),
                    summary.created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
                    summary.page_count as i64,
                    summary.byte_size as i64,
                ],
            )
            .map_err(|e| PagekeepError::Database(format!("insert: {e}")))?;
        Ok(())
    }

    fn delete_row(&self, id: CollectionId) -> Result<bool> {
        let affected = self
            .conn
            .execute(
                "DELETE FROM collections WHERE id = ?1",
                params![id.to_string()],
            )
            .map_err(|e| PagekeepError::Database(format!("delete: {e}")))?;
        Ok(affected > 0)
    }

    fn index_of(&self, id: CollectionId) -> Result<usize> {
        self.collections
            .iter()
            .position(|c| c.summary.id == id)
            .ok_or(PagekeepError::CollectionNotFound(id))
    }
}

/// `page-12.jpg` → `Some(12)`.
fn parse_page_index(path: &Path) -> Option<usize> {
    if path.extension()? != PAGE_EXTENSION {
        return None;
    }
    path.file_stem()?
        .to_str()?
        .strip_prefix("page-")?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage};

    fn page(width: u32, height: u32) -> PageImage {
        PageImage::new(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            width,
            height,
            Rgb([90, 100, 110]),
        )))
    }

    fn store(dir: &tempfile::TempDir) -> CollectionStore {
        CollectionStore::open(&LibraryConfig::new(dir.path())).expect("open store")
    }

    fn file_count(dir: &Path) -> usize {
        walk(dir).len()
    }

    fn walk(dir: &Path) -> Vec<PathBuf> {
        let mut out = Vec::new();
        if let Ok(entries) = std::fs::read_dir(dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    out.extend(walk(&path));
                } else {
                    out.push(path);
                }
            }
        }
        out
    }

    #[test]
    fn add_persists_pages_and_metadata() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = store(&dir);

        let id = store
            .add(vec![page(40, 60), page(50, 70)], CollectionSource::Scan)
            .expect("add")
            .expect("created");

        let summary = store.get(id).expect("present").summary().clone();
        assert_eq!(summary.page_count, 2);
        assert!(summary.byte_size > 0);
        assert!(!summary.name.starts_with("Photos-"));

        drop(store);
        let mut reopened = CollectionStore::open(&LibraryConfig::new(dir.path())).expect("reopen");
        let loaded = reopened.get(id).expect("persisted");
        assert!(!loaded.is_loaded());
        assert_eq!(loaded.summary().name, summary.name);

        let pages = reopened.ensure_images_loaded(id).expect("load");
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].dimensions(), (50, 70));
    }

    #[test]
    fn photo_imports_get_prefixed_names() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = store(&dir);
        let id = store
            .add(vec![page(20, 20)], CollectionSource::PhotoImport)
            .expect("add")
            .expect("created");
        assert!(store.get(id).expect("present").summary().name.starts_with("Photos-"));
    }

    #[test]
    fn all_degenerate_images_are_a_no_op() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = store(&dir);
        store
            .add(vec![page(30, 30)], CollectionSource::Scan)
            .expect("seed");
        let files_before = file_count(&dir.path().join("collections"));

        let result = store
            .add(vec![page(0, 0), page(100, 1), page(2, 2)], CollectionSource::Scan)
            .expect("add");
        assert!(result.is_none());
        assert_eq!(store.len(), 1);
        assert_eq!(file_count(&dir.path().join("collections")), files_before);
    }

    #[test]
    fn degenerate_pages_are_filtered_from_mixed_input() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = store(&dir);
        let id = store
            .add(vec![page(0, 10), page(30, 40)], CollectionSource::Scan)
            .expect("add")
            .expect("created");
        assert_eq!(store.get(id).expect("present").summary().page_count, 1);
    }

    #[test]
    fn newest_collection_comes_first() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = store(&dir);
        let first = store.add(vec![page(10, 10)], CollectionSource::Scan).expect("a").expect("a");
        let second = store.add(vec![page(10, 10)], CollectionSource::Scan).expect("b").expect("b");

        let ids: Vec<_> = store.collections().map(|c| c.summary().id).collect();
        assert_eq!(ids, vec![second, first]);

        drop(store);
        let reopened = CollectionStore::open(&LibraryConfig::new(dir.path())).expect("reopen");
        let ids: Vec<_> = reopened.collections().map(|c| c.summary().id).collect();
        assert_eq!(ids, vec![second, first]);
    }

    #[test]
    fn blank_rename_keeps_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = store(&dir);
        let id = store.add(vec![page(10, 10)], CollectionSource::Scan).expect("add").expect("id");
        let original = store.get(id).expect("present").summary().name.clone();

        assert!(!store.rename(id, "   ").expect("rename"));
        assert_eq!(store.get(id).expect("present").summary().name, original);

        assert!(store.rename(id, "  Lease  ").expect("rename"));
        assert_eq!(store.get(id).expect("present").summary().name, "Lease");
    }

    #[test]
    fn remove_deletes_metadata_and_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = store(&dir);
        let id = store
            .add(vec![page(10, 10), page(12, 12)], CollectionSource::Scan)
            .expect("add")
            .expect("id");

        assert!(store.remove(id).expect("remove"));
        assert!(store.get(id).is_none());
        assert!(!store.collection_dir(id).exists());
        assert!(!store.remove(id).expect("second remove"));

        drop(store);
        let reopened = CollectionStore::open(&LibraryConfig::new(dir.path())).expect("reopen");
        assert!(reopened.is_empty());
    }

    #[test]
    fn ensure_images_loaded_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = store(&dir);
        let id = store.add(vec![page(10, 10)], CollectionSource::Scan).expect("add").expect("id");
        store.unload_images(id);
        assert!(!store.get(id).expect("present").is_loaded());

        assert_eq!(store.ensure_images_loaded(id).expect("first").len(), 1);
        assert_eq!(store.ensure_images_loaded(id).expect("second").len(), 1);
    }

    #[test]
    fn missing_page_directory_is_dropped_on_reload() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = store(&dir);
        let id = store.add(vec![page(10, 10)], CollectionSource::Scan).expect("add").expect("id");
        std::fs::remove_dir_all(store.collection_dir(id)).expect("rm");

        store.reload().expect("reload");
        assert!(store.get(id).is_none());
    }

    #[test]
    fn sorted_by_size_does_not_change_store_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = store(&dir);
        let small = store.add(vec![page(8, 8)], CollectionSource::Scan).expect("a").expect("a");
        let large = store
            .add(vec![page(200, 200), page(200, 200)], CollectionSource::Scan)
            .expect("b")
            .expect("b");
        store.rename(small, "zeta").expect("rename");
        store.rename(large, "alpha").expect("rename");

        let by_size: Vec<_> = store.sorted(SortOrder::SizeDescending).iter().map(|s| s.id).collect();
        assert_eq!(by_size, vec![large, small]);
        let by_name: Vec<_> = store.sorted(SortOrder::NameAscending).iter().map(|s| s.id).collect();
        assert_eq!(by_name, vec![large, small]);

        let stored: Vec<_> = store.collections().map(|c| c.summary().id).collect();
        assert_eq!(stored, vec![large, small]);
    }

    #[test]
    fn unreadable_middle_page_is_compacted_away_on_save() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = store(&dir);
        let id = store
            .add(vec![page(10, 10), page(20, 20), page(30, 30)], CollectionSource::Scan)
            .expect("add")
            .expect("id");
        store.unload_images(id);
        std::fs::write(store.collection_dir(id).join("page-1.jpg"), b"garbage").expect("corrupt");

        let mut session = store.edit(id).expect("edit");
        let dims: Vec<_> = session.pages().iter().map(PageImage::dimensions).collect();
        assert_eq!(dims, vec![(10, 10), (30, 30)]);
        session.replace(1, page(40, 40)).expect("replace");
        session.close().expect("close");

        assert!(!store.collection_dir(id).join("page-2.jpg").exists());
        drop(store);
        let mut reopened = CollectionStore::open(&LibraryConfig::new(dir.path())).expect("reopen");
        let dims: Vec<_> = reopened
            .ensure_images_loaded(id)
            .expect("load")
            .iter()
            .map(PageImage::dimensions)
            .collect();
        assert_eq!(dims, vec![(10, 10), (40, 40)]);
        assert_eq!(reopened.get(id).expect("present").summary().page_count, 2);
    }

    #[test]
    fn parse_page_index_accepts_only_page_files() {
        assert_eq!(parse_page_index(Path::new("/x/page-3.jpg")), Some(3));
        assert_eq!(parse_page_index(Path::new("/x/page-3.tmp")), None);
        assert_eq!(parse_page_index(Path::new("/x/cover.jpg")), None);
    }
}
