// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Editing surface over one collection's pages.
//
// The session edits the store's live page list directly, so what the
// caller sees is always what will be saved. Deleting the last page removes
// the collection on the spot; otherwise changes are written on `close`.

use pagekeep_core::error::{PagekeepError, Result};
use pagekeep_core::{CollectionId, PageImage};
use tracing::{debug, info};

use crate::collections::{CollectionStore, PageChanges};

/// What a page deletion left behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRemoval {
    Remaining(usize),
    /// The deleted page was the last one; the collection is gone.
    CollectionRemoved,
}

/// What closing the session did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    Unchanged,
    Saved,
    CollectionRemoved,
}

/// Mutable view of one collection's pages, bound to its store.
pub struct EditSession<'s> {
    store: &'s mut CollectionStore,
    id: CollectionId,
    changes: PageChanges,
    removed: bool,
}

impl<'s> EditSession<'s> {
    /// Load the collection's pages and start editing.
    pub fn open(store: &'s mut CollectionStore, id: CollectionId) -> Result<Self> {
        store.ensure_images_loaded(id)?;
        debug!(%id, "edit session opened");
        Ok(Self {
            store,
            id,
            changes: PageChanges::default(),
            removed: false,
        })
    }

    pub fn collection_id(&self) -> CollectionId {
        self.id
    }

    /// Current pages, in order. Empty once the collection has been removed.
    pub fn pages(&self) -> &[PageImage] {
        if self.removed {
            return &[];
        }
        self.store
            .get(self.id)
            .and_then(|c| c.pages())
            .unwrap_or_default()
    }

    pub fn page_count(&self) -> usize {
        self.pages().len()
    }

    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    fn live_pages(&mut self) -> Result<&mut Vec<PageImage>> {
        if self.removed {
            return Err(PagekeepError::CollectionNotFound(self.id));
        }
        self.store.pages_mut(self.id)
    }

    /// Move the page at `from` so it ends up at `to`.
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<()> {
        let pages = self.live_pages()?;
        let len = pages.len();
        for index in [from, to] {
            if index >= len {
                return Err(PagekeepError::PageOutOfRange { index, len });
            }
        }
        if from == to {
            return Ok(());
        }
        let page = pages.remove(from);
        pages.insert(to, page);
        self.changes.layout_changed = true;
        debug!(id = %self.id, from, to, "page moved");
        Ok(())
    }

    /// Exchange two pages.
    pub fn swap(&mut self, a: usize, b: usize) -> Result<()> {
        let pages = self.live_pages()?;
        let len = pages.len();
        for index in [a, b] {
            if index >= len {
                return Err(PagekeepError::PageOutOfRange { index, len });
            }
        }
        if a != b {
            pages.swap(a, b);
            self.changes.layout_changed = true;
        }
        Ok(())
    }

    /// Remove one page. Removing the only page deletes the collection.
    pub fn delete(&mut self, index: usize) -> Result<PageRemoval> {
        let pages = self.live_pages()?;
        let len = pages.len();
        if index >= len {
            return Err(PagekeepError::PageOutOfRange { index, len });
        }
        pages.remove(index);
        let remaining = pages.len();

        if remaining == 0 {
            self.store.remove(self.id)?;
            self.removed = true;
            info!(id = %self.id, "last page deleted; collection removed");
            return Ok(PageRemoval::CollectionRemoved);
        }

        self.changes.layout_changed = true;
        debug!(id = %self.id, index, remaining, "page deleted");
        Ok(PageRemoval::Remaining(remaining))
    }

    /// Swap in new content for one page, e.g. after a crop or filter.
    pub fn replace(&mut self, index: usize, page: PageImage) -> Result<()> {
        let pages = self.live_pages()?;
        let len = pages.len();
        let slot = pages
            .get_mut(index)
            .ok_or(PagekeepError::PageOutOfRange { index, len })?;
        *slot = PageImage::new(page.into_upright());
        self.changes.replaced.insert(index);
        Ok(())
    }

    /// Persist pending changes and end the session.
    pub fn close(self) -> Result<CloseOutcome> {
        if self.removed {
            return Ok(CloseOutcome::CollectionRemoved);
        }
        if self.changes.is_empty() {
            return Ok(CloseOutcome::Unchanged);
        }
        self.store.save_pages(self.id, &self.changes)?;
        Ok(CloseOutcome::Saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
    use pagekeep_core::{CollectionSource, LibraryConfig};
    use pagekeep_document::{PdfAssembler, PdfReader};

    fn solid(width: u32, height: u32, shade: u8) -> PageImage {
        PageImage::new(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            width,
            height,
            Rgb([shade, shade, shade]),
        )))
    }

    fn three_page_store(dir: &tempfile::TempDir) -> (CollectionStore, CollectionId) {
        let mut store = CollectionStore::open(&LibraryConfig::new(dir.path())).expect("open");
        let id = store
            .add(
                vec![solid(100, 100, 10), solid(120, 80, 128), solid(60, 90, 250)],
                CollectionSource::Scan,
            )
            .expect("add")
            .expect("created");
        (store, id)
    }

    #[test]
    fn deleting_middle_page_keeps_order_and_assembles() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (mut store, id) = three_page_store(&dir);

        let mut session = store.edit(id).expect("edit");
        assert_eq!(session.delete(1).expect("delete"), PageRemoval::Remaining(2));
        let dims: Vec<_> = session.pages().iter().map(PageImage::dimensions).collect();
        assert_eq!(dims, vec![(100, 100), (60, 90)]);
        assert_eq!(session.close().expect("close"), CloseOutcome::Saved);

        let out = dir.path().join("out");
        std::fs::create_dir_all(&out).expect("mkdir");
        let inputs = store.assembly_inputs(id).expect("inputs");
        let pdf = PdfAssembler::default()
            .assemble(&inputs, "Scan", &out)
            .expect("assemble");
        assert_eq!(pdf.page_count, 2);
        assert_eq!(PdfReader::open(&pdf.path).expect("reopen").page_count(), 2);
    }

    #[test]
    fn saved_edits_survive_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (mut store, id) = three_page_store(&dir);

        let mut session = store.edit(id).expect("edit");
        session.reorder(2, 0).expect("reorder");
        session.delete(2).expect("delete");
        session.close().expect("close");
        drop(store);

        let mut reopened = CollectionStore::open(&LibraryConfig::new(dir.path())).expect("reopen");
        assert_eq!(reopened.get(id).expect("present").summary().page_count, 2);
        let pages = reopened.ensure_images_loaded(id).expect("load");
        let dims: Vec<_> = pages.iter().map(PageImage::dimensions).collect();
        assert_eq!(dims, vec![(60, 90), (100, 100)]);
        assert!(!reopened.collection_dir(id).join("page-2.jpg").exists());
    }

    #[test]
    fn replacing_a_page_rewrites_its_content() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (mut store, id) = three_page_store(&dir);

        let mut session = store.edit(id).expect("edit");
        session.replace(0, solid(30, 40, 200)).expect("replace");
        assert!(session.has_changes());
        session.close().expect("close");
        store.unload_images(id);

        let pages = store.ensure_images_loaded(id).expect("load");
        assert_eq!(pages[0].dimensions(), (30, 40));
        let pixel = pages[0].image().get_pixel(15, 20);
        assert!(pixel[0] > 180);
    }

    #[test]
    fn deleting_last_page_removes_collection() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = CollectionStore::open(&LibraryConfig::new(dir.path())).expect("open");
        let id = store
            .add(vec![solid(20, 20, 50)], CollectionSource::Scan)
            .expect("add")
            .expect("created");

        let mut session = store.edit(id).expect("edit");
        assert_eq!(session.delete(0).expect("delete"), PageRemoval::CollectionRemoved);
        assert!(session.pages().is_empty());
        assert!(matches!(
            session.delete(0),
            Err(PagekeepError::CollectionNotFound(_))
        ));
        assert_eq!(session.close().expect("close"), CloseOutcome::CollectionRemoved);

        assert!(store.get(id).is_none());
        assert!(!store.collection_dir(id).exists());
    }

    #[test]
    fn out_of_range_indices_are_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (mut store, id) = three_page_store(&dir);
        let mut session = store.edit(id).expect("edit");

        assert!(matches!(
            session.delete(3),
            Err(PagekeepError::PageOutOfRange { index: 3, len: 3 })
        ));
        assert!(session.reorder(0, 5).is_err());
        assert!(session.swap(7, 0).is_err());
        assert!(!session.has_changes());
        assert_eq!(session.close().expect("close"), CloseOutcome::Unchanged);
    }

    #[test]
    fn swap_exchanges_pages() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (mut store, id) = three_page_store(&dir);
        let mut session = store.edit(id).expect("edit");
        session.swap(0, 2).expect("swap");
        let dims: Vec<_> = session.pages().iter().map(PageImage::dimensions).collect();
        assert_eq!(dims, vec![(60, 90), (120, 80), (100, 100)]);
    }
}
