// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Central coordinator. Owns the collection store and the document library
// and is the only thing that mutates them. Image decoding, PDF assembly,
// text recognition and thumbnail rendering run on tokio's blocking pool
// with owned inputs; their results come back here and are applied through
// `&mut self`, so nothing needs a lock.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::DynamicImage;
use pagekeep_bridge::{PageImageSource, PlatformBridge};
use pagekeep_core::error::{PagekeepError, Result};
use pagekeep_core::{CollectionId, CollectionSource, DocumentId, LibraryConfig};
use pagekeep_document::pdf::reader::render_thumbnail;
use pagekeep_document::{AssembledPdf, LanguageHint, PageInput, PdfAssembler, Recognition, TextRecognizer};
use pagekeep_library::{CollectionStore, DocumentLibrary};
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use super::data_dir;

const CONFIG_FILE: &str = "config.json";

pub struct AppServices {
    data_dir: PathBuf,
    config: LibraryConfig,
    collections: CollectionStore,
    library: DocumentLibrary,
    bridge: Arc<dyn PlatformBridge>,
}

impl AppServices {
    /// Open everything under the default data directory.
    pub fn init() -> Result<Self> {
        Self::with_root(data_dir::data_dir(None)?)
    }

    /// Open everything under `dir`, loading `config.json` there or writing
    /// a default one.
    #[instrument(skip_all, fields(dir = %dir.as_ref().display()))]
    pub fn with_root(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = data_dir::data_dir(Some(dir.as_ref().to_path_buf()))?;

        let config = match load_config(&dir)? {
            Some(config) => config,
            None => {
                let config = LibraryConfig::new(&dir);
                persist_config(&dir, &config)?;
                config
            }
        };

        let collections = CollectionStore::open(&config)?;
        let library = DocumentLibrary::open(&config)?;
        info!(root = %config.storage_root().display(), "app services initialised");

        Ok(Self {
            data_dir: dir,
            config,
            collections,
            library,
            bridge: Arc::from(pagekeep_bridge::platform_bridge()),
        })
    }

    /// Replace the capture bridge (e.g. a real camera on mobile).
    pub fn with_bridge(mut self, bridge: Arc<dyn PlatformBridge>) -> Self {
        self.bridge = bridge;
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn config(&self) -> &LibraryConfig {
        &self.config
    }

    /// Persist a new config. Takes effect on the next start.
    pub fn save_config(&mut self, config: LibraryConfig) -> Result<()> {
        persist_config(&self.data_dir, &config)?;
        self.config = config;
        Ok(())
    }

    pub fn collections(&self) -> &CollectionStore {
        &self.collections
    }

    pub fn collections_mut(&mut self) -> &mut CollectionStore {
        &mut self.collections
    }

    pub fn library(&self) -> &DocumentLibrary {
        &self.library
    }

    pub fn library_mut(&mut self) -> &mut DocumentLibrary {
        &mut self.library
    }

    // -- Capture --------------------------------------------------------------

    /// Pull pages from `source` on a worker and store them as a new
    /// collection. Cancelled or empty captures add nothing.
    pub async fn capture<S>(
        &mut self,
        source: S,
        kind: CollectionSource,
    ) -> Result<Option<CollectionId>>
    where
        S: PageImageSource + 'static,
    {
        let pages = run_blocking(move || source.acquire()).await?;
        self.store_capture(pages, kind)
    }

    /// Same as [`capture`](Self::capture), using the platform bridge.
    pub async fn capture_from_platform(
        &mut self,
        kind: CollectionSource,
    ) -> Result<Option<CollectionId>> {
        let bridge = Arc::clone(&self.bridge);
        let pages = run_blocking(move || bridge.acquire(kind)).await?;
        self.store_capture(pages, kind)
    }

    fn store_capture(
        &mut self,
        pages: Option<Vec<pagekeep_core::PageImage>>,
        kind: CollectionSource,
    ) -> Result<Option<CollectionId>> {
        match pages {
            None => {
                info!("capture cancelled");
                Ok(None)
            }
            Some(pages) => self.collections.add(pages, kind),
        }
    }

    // -- Assembly -------------------------------------------------------------

    /// Assemble a collection into a new library PDF. The collection is kept.
    #[instrument(skip(self))]
    pub async fn assemble_collection(
        &mut self,
        collection: CollectionId,
        display_name: Option<&str>,
    ) -> Result<DocumentId> {
        let name = match display_name.and_then(pagekeep_core::normalized_name) {
            Some(name) => name.to_string(),
            None => self
                .collections
                .get(collection)
                .ok_or(PagekeepError::CollectionNotFound(collection))?
                .summary()
                .name
                .clone(),
        };

        let assembled = self.assemble(collection, &name).await?;
        let id = self.library.add_assembled(&assembled.path, &name)?;
        info!(%collection, document = %id, pages = assembled.page_count, "collection assembled");
        Ok(id)
    }

    /// Rebuild an existing document from a collection's current pages.
    /// The document keeps its identity, name, tags and folder.
    #[instrument(skip(self))]
    pub async fn regenerate_pdf(
        &mut self,
        document: DocumentId,
        collection: CollectionId,
    ) -> Result<()> {
        let name = self
            .library
            .get(document)
            .ok_or(PagekeepError::DocumentNotFound(document))?
            .display_name
            .clone();

        let assembled = self.assemble(collection, &name).await?;
        if let Err(err) = self.library.replace_file(document, &assembled.path) {
            let _ = std::fs::remove_file(&assembled.path);
            return Err(err);
        }
        info!(%document, pages = assembled.page_count, "document regenerated");
        Ok(())
    }

    async fn assemble(&self, collection: CollectionId, name: &str) -> Result<AssembledPdf> {
        let inputs: Vec<PageInput> = self.collections.assembly_inputs(collection)?;
        let assembler = PdfAssembler::new(self.config.min_page_dimension);
        let output_dir = self.config.storage_root().to_path_buf();
        let name = name.to_string();
        run_blocking(move || assembler.assemble(&inputs, &name, &output_dir)).await
    }

    // -- Recognition and previews ---------------------------------------------

    /// Recognise text on one page of a collection.
    #[instrument(skip(self, recognizer, language))]
    pub async fn recognize_page(
        &mut self,
        recognizer: Arc<dyn TextRecognizer>,
        collection: CollectionId,
        page_index: usize,
        language: LanguageHint,
    ) -> Result<Recognition> {
        let pages = self.collections.ensure_images_loaded(collection)?;
        let image = pages
            .get(page_index)
            .ok_or(PagekeepError::PageOutOfRange {
                index: page_index,
                len: pages.len(),
            })?
            .upright();

        let recognition =
            run_blocking(move || recognizer.recognize(&image, &language)).await?;
        info!(
            %collection,
            page_index,
            confidence = recognition.confidence,
            chars = recognition.text.len(),
            "page recognised"
        );
        Ok(recognition)
    }

    /// First-page thumbnail of a library document. `Ok(None)` when it
    /// cannot be rendered.
    pub async fn thumbnail(&self, document: DocumentId) -> Result<Option<DynamicImage>> {
        let path = self
            .library
            .get(document)
            .ok_or(PagekeepError::DocumentNotFound(document))?
            .path
            .clone();
        let max = self.config.thumbnail_max_dimension;
        run_blocking(move || Ok(render_thumbnail(path, max))).await
    }

    /// Thumbnails for several documents, rendered concurrently. Unknown ids
    /// and failed renders come back as `None`.
    pub async fn thumbnails(
        &self,
        documents: &[DocumentId],
    ) -> Vec<(DocumentId, Option<DynamicImage>)> {
        let max = self.config.thumbnail_max_dimension;
        let tasks: Vec<(DocumentId, JoinHandle<Option<DynamicImage>>)> = documents
            .iter()
            .map(|&id| {
                let path = self.library.get(id).map(|d| d.path.clone());
                let task = tokio::task::spawn_blocking(move || {
                    path.and_then(|p| render_thumbnail(p, max))
                });
                (id, task)
            })
            .collect();

        let mut out = Vec::with_capacity(tasks.len());
        for (id, task) in tasks {
            match task.await {
                Ok(thumbnail) => out.push((id, thumbnail)),
                Err(err) => {
                    warn!(%id, %err, "thumbnail task failed");
                    out.push((id, None));
                }
            }
        }
        out
    }
}

/// Run `work` on the blocking pool and flatten the join error.
async fn run_blocking<T, F>(work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| PagekeepError::Cancelled(err.to_string()))?
}

// -- Config file persistence -------------------------------------------------

fn load_config(data_dir: &Path) -> Result<Option<LibraryConfig>> {
    let path = data_dir.join(CONFIG_FILE);
    let data = match std::fs::read_to_string(&path) {
        Ok(data) => data,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    let mut config: LibraryConfig = serde_json::from_str(&data)?;
    if config.storage_root.is_relative() {
        config.storage_root = data_dir.join(&config.storage_root);
    }
    Ok(Some(config))
}

fn persist_config(data_dir: &Path, config: &LibraryConfig) -> Result<()> {
    let path = data_dir.join(CONFIG_FILE);
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, json)?;
    Ok(())
}
