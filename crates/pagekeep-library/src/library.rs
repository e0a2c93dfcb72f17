// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document library index.
//
// The storage root is the source of truth for which PDFs exist; the
// document catalog adds identity, display names and tags, and the folder
// records add grouping. Every mutation writes the affected record file
// before returning.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use image::DynamicImage;
use pagekeep_core::error::{PagekeepError, Result};
use pagekeep_core::{DocumentId, FolderId, LibraryConfig, SortOrder, normalized_name};
use pagekeep_document::PdfReader;
use pagekeep_document::pdf::reader::{page_count, render_thumbnail};
use pagekeep_document::pdf::writer::sanitize_file_stem;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::catalog::{DocumentRecord, load_catalog, save_catalog};
use crate::folders::{Folder, load_folders, save_folders};
use crate::integrity::same_content;
use crate::ordering::{self, Listing};

/// A PDF in the library.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfFile {
    pub id: DocumentId,
    /// User-facing name; independent of the storage filename.
    pub display_name: String,
    /// Filename under the storage root.
    pub file_name: String,
    pub path: PathBuf,
    pub created_at: DateTime<Utc>,
    pub byte_size: u64,
    pub tags: Vec<String>,
}

impl PdfFile {
    pub fn page_count(&self) -> Result<usize> {
        page_count(&self.path)
    }

    /// First-page preview; generated on every call.
    pub fn thumbnail(&self, max_dimension: u32) -> Option<DynamicImage> {
        render_thumbnail(&self.path, max_dimension)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag.trim()))
    }

    fn record(&self) -> DocumentRecord {
        DocumentRecord {
            id: self.id,
            file_name: self.file_name.clone(),
            display_name: self.display_name.clone(),
            created_at: self.created_at,
            tags: self.tags.clone(),
        }
    }
}

impl Listing for PdfFile {
    fn display_name(&self) -> &str {
        &self.display_name
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

/// Catalog and query layer over the library's PDFs and folders.
pub struct DocumentLibrary {
    config: LibraryConfig,
    documents: Vec<PdfFile>,
    folders: Vec<Folder>,
}

impl DocumentLibrary {
    #[instrument(skip_all, fields(root = %config.storage_root().display()))]
    pub fn open(config: &LibraryConfig) -> Result<Self> {
        std::fs::create_dir_all(config.storage_root())?;
        let mut library = Self {
            config: config.clone(),
            documents: Vec::new(),
            folders: Vec::new(),
        };
        library.load_pdf_files()?;
        library.reload_folders()?;
        info!(
            documents = library.documents.len(),
            folders = library.folders.len(),
            "library opened"
        );
        Ok(library)
    }

    pub fn storage_root(&self) -> &Path {
        self.config.storage_root()
    }

    // -- Loading --------------------------------------------------------------

    /// Rescan the storage root and rebuild the document list.
    ///
    /// Catalog entries whose file has gone are dropped, as are folder
    /// references to them; new files get a fresh identity named after
    /// their file stem.
    #[instrument(skip(self))]
    pub fn load_pdf_files(&mut self) -> Result<()> {
        let mut records = load_catalog(&self.config.documents_path())?;
        let root = self.config.storage_root().to_path_buf();
        let mut documents = Vec::new();
        let mut changed = false;

        for entry in std::fs::read_dir(&root)? {
            let Ok(entry) = entry else { continue };
            let path = entry.path();
            if !is_pdf(&path) {
                continue;
            }
            // The file may vanish between listing and stat.
            let Ok(metadata) = std::fs::metadata(&path) else {
                debug!(path = %path.display(), "file vanished during scan");
                continue;
            };
            if !metadata.is_file() {
                continue;
            }
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string)
            else {
                warn!(path = %path.display(), "skipping file with non-UTF-8 name");
                continue;
            };

            let record = match records.iter().position(|r| r.file_name == file_name) {
                Some(index) => records.swap_remove(index),
                None => {
                    changed = true;
                    DocumentRecord {
                        id: DocumentId::new(),
                        display_name: file_stem(&file_name).to_string(),
                        created_at: file_created_at(&metadata),
                        file_name: file_name.clone(),
                        tags: Vec::new(),
                    }
                }
            };

            documents.push(PdfFile {
                id: record.id,
                display_name: record.display_name,
                file_name: record.file_name,
                path,
                created_at: record.created_at,
                byte_size: metadata.len(),
                tags: record.tags,
            });
        }

        for stale in &records {
            warn!(file = %stale.file_name, "dropping catalog entry with no file");
            changed = true;
        }

        documents.sort_by(|a, b| ordering::compare(a, b, SortOrder::CreatedDescending));
        self.documents = documents;
        if changed {
            self.persist_catalog()?;
        }
        self.prune_folder_members()?;

        debug!(documents = self.documents.len(), "library rescanned");
        Ok(())
    }

    /// Re-read folder records, writing them back in the current layout if
    /// they needed migration or repair.
    #[instrument(skip(self))]
    pub fn reload_folders(&mut self) -> Result<()> {
        let loaded = load_folders(&self.config.folders_path(), self.config.storage_root())?;
        self.folders = loaded.folders;
        if loaded.needs_rewrite {
            info!("rewriting folder records");
            self.persist_folders()?;
        }
        Ok(())
    }

    // -- Queries --------------------------------------------------------------

    /// Documents in stored order (newest first).
    pub fn documents(&self) -> &[PdfFile] {
        &self.documents
    }

    pub fn get(&self, id: DocumentId) -> Option<&PdfFile> {
        self.documents.iter().find(|d| d.id == id)
    }

    pub fn folders(&self) -> &[Folder] {
        &self.folders
    }

    pub fn folder(&self, id: FolderId) -> Option<&Folder> {
        self.folders.iter().find(|f| f.id == id)
    }

    /// The folder holding `doc`, if any.
    pub fn folder_of(&self, doc: DocumentId) -> Option<&Folder> {
        let file_name = &self.get(doc)?.file_name;
        self.folders.iter().find(|f| f.contains(file_name))
    }

    /// All documents, sorted then filtered by `search`.
    pub fn query(&self, order: SortOrder, search: Option<&str>) -> Vec<&PdfFile> {
        ordering::query(&self.documents, order, search)
    }

    /// Members of one folder, sorted then filtered.
    pub fn folder_documents(
        &self,
        folder: FolderId,
        order: SortOrder,
        search: Option<&str>,
    ) -> Result<Vec<&PdfFile>> {
        let folder = self.folder(folder).ok_or(PagekeepError::FolderNotFound(folder))?;
        Ok(ordering::query(
            self.documents.iter().filter(|d| folder.contains(&d.file_name)),
            order,
            search,
        ))
    }

    /// Documents that belong to no folder.
    pub fn unfiled_documents(&self, order: SortOrder, search: Option<&str>) -> Vec<&PdfFile> {
        ordering::query(
            self.documents
                .iter()
                .filter(|d| !self.folders.iter().any(|f| f.contains(&d.file_name))),
            order,
            search,
        )
    }

    pub fn documents_tagged(&self, tag: &str, order: SortOrder) -> Vec<&PdfFile> {
        ordering::sorted(self.documents.iter().filter(|d| d.has_tag(tag)), order)
    }

    /// Every tag in use, sorted case-insensitively, first spelling wins.
    pub fn all_tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = Vec::new();
        for tag in self.documents.iter().flat_map(|d| d.tags.iter()) {
            if !tags.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
                tags.push(tag.clone());
            }
        }
        tags.sort_by_key(|t| t.to_lowercase());
        tags
    }

    // -- Documents ------------------------------------------------------------

    /// Copy an external PDF into the storage root.
    ///
    /// Importing a file that already lives at its target path is a no-op.
    /// A name clash with identical content returns the existing document;
    /// with different content the copy is stored as `name (1).pdf`,
    /// `name (2).pdf`, and so on.
    #[instrument(skip(self), fields(source = %source.display()))]
    pub fn import_pdf(&mut self, source: &Path) -> Result<DocumentId> {
        PdfReader::open(source)?;

        let root = self.config.storage_root();
        let source_name = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| PagekeepError::UnreadablePdf(source.display().to_string()))?;
        let stem = file_stem(source_name).to_string();

        if same_location(source.parent(), root) {
            if let Some(existing) = self.documents.iter().find(|d| d.file_name == source_name) {
                debug!("already in library");
                return Ok(existing.id);
            }
            return self.register(source_name.to_string(), stem, Vec::new());
        }

        let mut n = 0u32;
        let file_name = loop {
            let candidate = if n == 0 {
                format!("{stem}.pdf")
            } else {
                format!("{stem} ({n}).pdf")
            };
            let target = root.join(&candidate);
            if !target.exists() {
                break candidate;
            }
            if same_content(source, &target)? {
                info!(file = %candidate, "identical file already imported");
                return match self.documents.iter().find(|d| d.file_name == candidate) {
                    Some(existing) => Ok(existing.id),
                    None => self.register(candidate, stem, Vec::new()),
                };
            }
            n += 1;
        };

        std::fs::copy(source, root.join(&file_name))?;
        info!(file = %file_name, "PDF imported");
        self.register(file_name, stem, Vec::new())
    }

    /// Register a freshly assembled PDF under `display_name`.
    ///
    /// Files outside the storage root are imported first.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub fn add_assembled(&mut self, path: &Path, display_name: &str) -> Result<DocumentId> {
        let display_name = normalized_name(display_name).unwrap_or("Document").to_string();

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| PagekeepError::PdfError(format!("bad output path {}", path.display())))?;

        if !same_location(path.parent(), self.config.storage_root()) {
            let id = self.import_pdf(path)?;
            self.rename_pdf(id, &display_name)?;
            return Ok(id);
        }
        if let Some(existing) = self.documents.iter().find(|d| d.file_name == file_name) {
            return Ok(existing.id);
        }
        self.register(file_name, display_name, Vec::new())
    }

    /// Delete the backing file and every folder reference to it.
    /// Unknown ids are ignored.
    #[instrument(skip(self))]
    pub fn delete_pdf(&mut self, id: DocumentId) -> Result<bool> {
        let Some(index) = self.documents.iter().position(|d| d.id == id) else {
            return Ok(false);
        };
        let doc = self.documents.remove(index);

        match std::fs::remove_file(&doc.path) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                self.documents.insert(index, doc);
                return Err(err.into());
            }
        }

        let mut folders_changed = false;
        for folder in &mut self.folders {
            folders_changed |= folder.remove(&doc.file_name);
        }
        if folders_changed {
            self.persist_folders()?;
        }
        self.persist_catalog()?;

        info!(file = %doc.file_name, "PDF deleted");
        Ok(true)
    }

    /// Change the display name only; the storage filename stays.
    #[instrument(skip(self))]
    pub fn rename_pdf(&mut self, id: DocumentId, new_name: &str) -> Result<bool> {
        let Some(name) = normalized_name(new_name) else {
            return Ok(false);
        };
        let doc = self.document_mut(id)?;
        doc.display_name = name.to_string();
        self.persist_catalog()?;
        Ok(true)
    }

    /// Point a document at a new file under the storage root, deleting the
    /// old one. Identity, display name, tags and folder membership carry
    /// over.
    #[instrument(skip(self), fields(new = %new_path.display()))]
    pub fn replace_file(&mut self, id: DocumentId, new_path: &Path) -> Result<()> {
        self.get(id).ok_or(PagekeepError::DocumentNotFound(id))?;
        let new_name = new_path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| PagekeepError::PdfError(format!("bad path {}", new_path.display())))?;
        let new_path = self.config.storage_root().join(&new_name);
        let byte_size = std::fs::metadata(&new_path)?.len();

        // Drop any separate entry a rescan may have created for the new file.
        self.documents.retain(|d| d.id == id || d.file_name != new_name);

        let doc = self.document_mut(id)?;
        let old_path = std::mem::replace(&mut doc.path, new_path);
        let old_name = std::mem::replace(&mut doc.file_name, new_name.clone());
        doc.byte_size = byte_size;

        let mut folders_changed = false;
        for folder in &mut self.folders {
            if folder.remove(&old_name) {
                folder.insert(&new_name);
                folders_changed = true;
            }
        }

        if old_name != new_name {
            match std::fs::remove_file(&old_path) {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => warn!(%err, file = %old_name, "could not delete replaced file"),
            }
        }

        self.persist_catalog()?;
        if folders_changed {
            self.persist_folders()?;
        }
        info!(old = %old_name, new = %new_name, "document file replaced");
        Ok(())
    }

    /// Copy a document out of the library under its display name.
    #[instrument(skip(self), fields(dest = %dest_dir.display()))]
    pub fn export_pdf(&self, id: DocumentId, dest_dir: &Path) -> Result<PathBuf> {
        let doc = self.get(id).ok_or(PagekeepError::DocumentNotFound(id))?;
        std::fs::create_dir_all(dest_dir)?;

        let stem = sanitize_file_stem(&doc.display_name);
        let mut target = dest_dir.join(format!("{stem}.pdf"));
        let mut n = 1;
        while target.exists() {
            target = dest_dir.join(format!("{stem} ({n}).pdf"));
            n += 1;
        }
        std::fs::copy(&doc.path, &target)?;
        info!(target = %target.display(), "PDF exported");
        Ok(target)
    }

    // -- Tags -----------------------------------------------------------------

    pub fn tag_document(&mut self, id: DocumentId, tag: &str) -> Result<bool> {
        let Some(tag) = normalized_name(tag) else {
            return Ok(false);
        };
        let doc = self.document_mut(id)?;
        if doc.has_tag(tag) {
            return Ok(false);
        }
        doc.tags.push(tag.to_string());
        self.persist_catalog()?;
        Ok(true)
    }

    pub fn untag_document(&mut self, id: DocumentId, tag: &str) -> Result<bool> {
        let Some(tag) = normalized_name(tag) else {
            return Ok(false);
        };
        let doc = self.document_mut(id)?;
        let before = doc.tags.len();
        doc.tags.retain(|t| !t.eq_ignore_ascii_case(tag));
        if doc.tags.len() == before {
            return Ok(false);
        }
        self.persist_catalog()?;
        Ok(true)
    }

    // -- Folders --------------------------------------------------------------

    /// Create a folder. Blank names are ignored.
    #[instrument(skip(self))]
    pub fn create_folder(&mut self, name: &str) -> Result<Option<FolderId>> {
        let Some(name) = normalized_name(name) else {
            return Ok(None);
        };
        let folder = Folder::new(name);
        let id = folder.id;
        self.folders.push(folder);
        self.persist_folders()?;
        info!(%id, name, "folder created");
        Ok(Some(id))
    }

    pub fn rename_folder(&mut self, id: FolderId, new_name: &str) -> Result<bool> {
        let Some(name) = normalized_name(new_name) else {
            return Ok(false);
        };
        let folder = self.folder_mut(id)?;
        folder.name = name.to_string();
        self.persist_folders()?;
        Ok(true)
    }

    /// Delete a folder. Member files stay in the library.
    #[instrument(skip(self))]
    pub fn delete_folder(&mut self, id: FolderId) -> Result<bool> {
        let before = self.folders.len();
        self.folders.retain(|f| f.id != id);
        if self.folders.len() == before {
            return Ok(false);
        }
        self.persist_folders()?;
        info!(%id, "folder deleted");
        Ok(true)
    }

    /// File `doc` under `folder`, taking it out of any other folder.
    /// Returns `false` when it was already there.
    #[instrument(skip(self))]
    pub fn add_to_folder(&mut self, doc: DocumentId, folder: FolderId) -> Result<bool> {
        let file_name = self
            .get(doc)
            .ok_or(PagekeepError::DocumentNotFound(doc))?
            .file_name
            .clone();
        if self.folder_mut(folder)?.contains(&file_name) {
            return Ok(false);
        }

        for other in &mut self.folders {
            if other.id == folder {
                other.insert(&file_name);
            } else {
                other.remove(&file_name);
            }
        }
        self.persist_folders()?;
        Ok(true)
    }

    pub fn remove_from_folder(&mut self, doc: DocumentId, folder: FolderId) -> Result<bool> {
        let file_name = self
            .get(doc)
            .ok_or(PagekeepError::DocumentNotFound(doc))?
            .file_name
            .clone();
        if !self.folder_mut(folder)?.remove(&file_name) {
            return Ok(false);
        }
        self.persist_folders()?;
        Ok(true)
    }

    /// Move `doc` from one folder to another.
    pub fn move_across_folders(
        &mut self,
        doc: DocumentId,
        from: FolderId,
        to: FolderId,
    ) -> Result<bool> {
        self.folder(from).ok_or(PagekeepError::FolderNotFound(from))?;
        self.add_to_folder(doc, to)
    }

    // -- Internals ------------------------------------------------------------

    fn register(
        &mut self,
        file_name: String,
        display_name: String,
        tags: Vec<String>,
    ) -> Result<DocumentId> {
        let path = self.config.storage_root().join(&file_name);
        let metadata = std::fs::metadata(&path)?;
        let doc = PdfFile {
            id: DocumentId::new(),
            display_name,
            file_name,
            path,
            created_at: Utc::now(),
            byte_size: metadata.len(),
            tags,
        };
        let id = doc.id;
        self.documents.insert(0, doc);
        self.persist_catalog()?;
        Ok(id)
    }

    fn prune_folder_members(&mut self) -> Result<()> {
        let documents = &self.documents;
        let mut changed = false;
        for folder in &mut self.folders {
            let before = folder.file_names.len();
            folder
                .file_names
                .retain(|name| documents.iter().any(|d| &d.file_name == name));
            changed |= before != folder.file_names.len();
        }
        if changed {
            self.persist_folders()?;
        }
        Ok(())
    }

    fn document_mut(&mut self, id: DocumentId) -> Result<&mut PdfFile> {
        self.documents
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or(PagekeepError::DocumentNotFound(id))
    }

    fn folder_mut(&mut self, id: FolderId) -> Result<&mut Folder> {
        self.folders
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or(PagekeepError::FolderNotFound(id))
    }

    fn persist_catalog(&self) -> Result<()> {
        let records: Vec<DocumentRecord> = self.documents.iter().map(PdfFile::record).collect();
        save_catalog(&self.config.documents_path(), &records)
    }

    fn persist_folders(&self) -> Result<()> {
        save_folders(&self.config.folders_path(), &self.folders)
    }
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

fn file_stem(file_name: &str) -> &str {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if ext.eq_ignore_ascii_case("pdf") && !stem.is_empty() => stem,
        _ => file_name,
    }
}

fn file_created_at(metadata: &std::fs::Metadata) -> DateTime<Utc> {
    metadata
        .created()
        .or_else(|_| metadata.modified())
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| DateTime::<Utc>::from(SystemTime::now()))
}

fn same_location(dir: Option<&Path>, root: &Path) -> bool {
    let Some(dir) = dir else { return false };
    let dir = if dir.as_os_str().is_empty() { Path::new(".") } else { dir };
    match (dir.canonicalize(), root.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
