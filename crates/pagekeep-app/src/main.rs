// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pagekeep — scan collections, assemble PDFs, keep a document library.
//
// Entry point. Initialises logging, opens the services under the data
// directory, and runs one command.

mod services;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pagekeep_bridge::FileImageSource;
use pagekeep_core::error::{PagekeepError, Result};
use pagekeep_core::human_errors::humanize_error;
use pagekeep_core::{CollectionId, CollectionSource, DocumentId, FolderId, SortOrder};
use pagekeep_document::{CropRect, ImageProcessor, PageFilter};
use pagekeep_library::{CloseOutcome, PageRemoval, PdfFile};

use services::app_services::AppServices;

#[derive(Debug, Parser)]
#[command(name = "pagekeep", version)]
#[command(about = "Scanned page collections, PDF assembly, and a local document library")]
struct Cli {
    /// Data directory (defaults to $XDG_DATA_HOME/pagekeep).
    #[arg(long, global = true, value_name = "DIR")]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Store scanned page images as a new collection.
    Scan {
        /// Image files, or a single directory of images.
        #[arg(required = true, value_name = "IMAGE")]
        images: Vec<PathBuf>,
    },
    /// Store photos as a new collection named `Photos-<timestamp>`.
    ImportPhotos {
        #[arg(required = true, value_name = "IMAGE")]
        images: Vec<PathBuf>,
    },
    /// List scanned collections.
    Collections {
        #[arg(long, default_value = "date", value_parser = parse_sort)]
        sort: SortOrder,
    },
    RenameCollection { id: CollectionId, name: String },
    DeleteCollection { id: CollectionId },
    /// Delete one page (1-based) from a collection.
    DeletePage { id: CollectionId, page: usize },
    /// Move a page (1-based positions).
    MovePage { id: CollectionId, from: usize, to: usize },
    /// Touch up one page (1-based) in place.
    Touchup {
        id: CollectionId,
        page: usize,
        #[arg(long, value_parser = parse_filter)]
        filter: Option<PageFilter>,
        /// Clockwise quarter turns; negative turns counter-clockwise.
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        rotate: i32,
        /// Crop rectangle as `x,y,width,height` in pixels.
        #[arg(long, value_parser = parse_crop)]
        crop: Option<CropRect>,
    },
    /// Assemble a collection into a library PDF.
    Assemble {
        id: CollectionId,
        #[arg(long)]
        name: Option<String>,
    },
    /// Rebuild a library PDF from a collection's current pages.
    Regenerate {
        document: DocumentId,
        collection: CollectionId,
    },
    /// Copy an external PDF into the library.
    ImportPdf { file: PathBuf },
    /// List library documents.
    List {
        #[arg(long, default_value = "date", value_parser = parse_sort)]
        sort: SortOrder,
        #[arg(long)]
        search: Option<String>,
        #[arg(long, conflicts_with_all = ["tag", "unfiled"])]
        folder: Option<FolderId>,
        #[arg(long, conflicts_with = "unfiled")]
        tag: Option<String>,
        /// Only documents in no folder.
        #[arg(long)]
        unfiled: bool,
    },
    /// Change a document's display name.
    Rename { id: DocumentId, name: String },
    Delete { id: DocumentId },
    Folders,
    FolderCreate { name: String },
    FolderRename { id: FolderId, name: String },
    FolderDelete { id: FolderId },
    FolderAdd { document: DocumentId, folder: FolderId },
    FolderRemove { document: DocumentId, folder: FolderId },
    Tag { document: DocumentId, tag: String },
    Untag { document: DocumentId, tag: String },
    /// Write a first-page thumbnail as PNG.
    Thumbnail {
        document: DocumentId,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Copy a document out of the library under its display name.
    Export { document: DocumentId, dest: PathBuf },
    /// Recognise text on one page (1-based) of a collection.
    #[cfg(feature = "ocr")]
    Ocr {
        id: CollectionId,
        page: usize,
        #[arg(long)]
        lang: Option<String>,
        /// Directory holding the detection and recognition models.
        #[arg(long)]
        models: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        tracing::error!(error = %err, "command failed");
        eprintln!("{}", humanize_error(&err).alert_text());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut services = match cli.root {
        Some(root) => AppServices::with_root(root)?,
        None => AppServices::init()?,
    };

    match cli.command {
        Command::Scan { images } => {
            capture(&mut services, images, CollectionSource::Scan).await?;
        }
        Command::ImportPhotos { images } => {
            capture(&mut services, images, CollectionSource::PhotoImport).await?;
        }
        Command::Collections { sort } => {
            for summary in services.collections().sorted(sort) {
                println!(
                    "{}  {:<28} {:>3} pages  {:>9}  {}",
                    summary.id,
                    summary.name,
                    summary.page_count,
                    human_size(summary.byte_size),
                    summary.created_at.format("%Y-%m-%d %H:%M"),
                );
            }
        }
        Command::RenameCollection { id, name } => {
            if !services.collections_mut().rename(id, &name)? {
                println!("Name unchanged.");
            }
        }
        Command::DeleteCollection { id } => {
            if !services.collections_mut().remove(id)? {
                println!("No such collection.");
            }
        }
        Command::DeletePage { id, page } => {
            let mut session = services.collections_mut().edit(id)?;
            match session.delete(to_index(page)?)? {
                PageRemoval::Remaining(n) => println!("{n} pages left."),
                PageRemoval::CollectionRemoved => println!("Last page deleted; collection removed."),
            }
            session.close()?;
        }
        Command::MovePage { id, from, to } => {
            let mut session = services.collections_mut().edit(id)?;
            session.reorder(to_index(from)?, to_index(to)?)?;
            session.close()?;
        }
        Command::Touchup { id, page, filter, rotate, crop } => {
            let index = to_index(page)?;
            let mut session = services.collections_mut().edit(id)?;
            let len = session.page_count();
            let current = session
                .pages()
                .get(index)
                .ok_or(PagekeepError::PageOutOfRange { index, len })?;

            let mut processor = ImageProcessor::from_page(current).rotate_quarter_turns(rotate);
            if let Some(rect) = crop {
                processor = processor.crop(rect);
            }
            if let Some(filter) = filter {
                processor = processor.apply_filter(filter);
            }
            session.replace(index, processor.into_page())?;
            if session.close()? == CloseOutcome::Saved {
                println!("Page {page} updated.");
            }
        }
        Command::Assemble { id, name } => {
            let doc = services.assemble_collection(id, name.as_deref()).await?;
            print_document(services.library().get(doc));
        }
        Command::Regenerate { document, collection } => {
            services.regenerate_pdf(document, collection).await?;
            print_document(services.library().get(document));
        }
        Command::ImportPdf { file } => {
            let doc = services.library_mut().import_pdf(&file)?;
            print_document(services.library().get(doc));
        }
        Command::List { sort, search, folder, tag, unfiled } => {
            let library = services.library();
            let search = search.as_deref();
            let docs = if let Some(folder) = folder {
                library.folder_documents(folder, sort, search)?
            } else if let Some(tag) = tag {
                let mut docs = library.documents_tagged(&tag, sort);
                if let Some(query) = search {
                    docs.retain(|d| pagekeep_library::ordering::matches_search(&d.display_name, query));
                }
                docs
            } else if unfiled {
                library.unfiled_documents(sort, search)
            } else {
                library.query(sort, search)
            };
            for doc in docs {
                print_document(Some(doc));
            }
        }
        Command::Rename { id, name } => {
            if !services.library_mut().rename_pdf(id, &name)? {
                println!("Name unchanged.");
            }
        }
        Command::Delete { id } => {
            if !services.library_mut().delete_pdf(id)? {
                println!("No such document.");
            }
        }
        Command::Folders => {
            for folder in services.library().folders() {
                println!("{}  {:<24} {:>3} documents", folder.id, folder.name, folder.file_names.len());
            }
        }
        Command::FolderCreate { name } => match services.library_mut().create_folder(&name)? {
            Some(id) => println!("{id}"),
            None => println!("Folder names cannot be blank."),
        },
        Command::FolderRename { id, name } => {
            if !services.library_mut().rename_folder(id, &name)? {
                println!("Name unchanged.");
            }
        }
        Command::FolderDelete { id } => {
            services.library_mut().delete_folder(id)?;
        }
        Command::FolderAdd { document, folder } => {
            services.library_mut().add_to_folder(document, folder)?;
        }
        Command::FolderRemove { document, folder } => {
            services.library_mut().remove_from_folder(document, folder)?;
        }
        Command::Tag { document, tag } => {
            services.library_mut().tag_document(document, &tag)?;
        }
        Command::Untag { document, tag } => {
            services.library_mut().untag_document(document, &tag)?;
        }
        Command::Thumbnail { document, output } => match services.thumbnail(document).await? {
            Some(image) => {
                let output = output.unwrap_or_else(|| PathBuf::from(format!("{document}.png")));
                image
                    .save(&output)
                    .map_err(|e| PagekeepError::ImageError(e.to_string()))?;
                println!("{}", output.display());
            }
            None => println!("No preview available."),
        },
        Command::Export { document, dest } => {
            let path = services.library().export_pdf(document, &dest)?;
            println!("{}", path.display());
        }
        #[cfg(feature = "ocr")]
        Command::Ocr { id, page, lang, models } => {
            use std::sync::Arc;

            use pagekeep_document::ocr::engine::OcrConfig;
            use pagekeep_document::{LanguageHint, OcrEngine, TextRecognizer};

            let config = models.map(OcrConfig::from_dir).unwrap_or_default();
            let engine: Arc<dyn TextRecognizer> = Arc::new(OcrEngine::new(config)?);
            let hint = lang.map(LanguageHint::tag).unwrap_or_default();
            let result = services.recognize_page(engine, id, to_index(page)?, hint).await?;
            println!("{}", result.text);
            eprintln!(
                "confidence {:.0}%  language {}  {} ms",
                result.confidence,
                result.language,
                result.elapsed.as_millis()
            );
        }
    }
    Ok(())
}

async fn capture(
    services: &mut AppServices,
    images: Vec<PathBuf>,
    kind: CollectionSource,
) -> Result<()> {
    let source = match images.as_slice() {
        [dir] if dir.is_dir() => FileImageSource::from_dir(dir)?,
        _ => FileImageSource::new(images),
    };
    match services.capture(source, kind).await? {
        Some(id) => {
            let summary = services
                .collections()
                .get(id)
                .ok_or(PagekeepError::CollectionNotFound(id))?
                .summary();
            println!("{id}  {}  {} pages", summary.name, summary.page_count);
        }
        None => println!("No usable images; nothing added."),
    }
    Ok(())
}

fn print_document(doc: Option<&PdfFile>) {
    let Some(doc) = doc else { return };
    let tags = if doc.tags.is_empty() {
        String::new()
    } else {
        format!("  [{}]", doc.tags.join(", "))
    };
    println!(
        "{}  {:<32} {:>9}  {}{}",
        doc.id,
        doc.display_name,
        human_size(doc.byte_size),
        doc.created_at.format("%Y-%m-%d %H:%M"),
        tags
    );
}

/// 1-based page number to index.
fn to_index(page: usize) -> Result<usize> {
    page.checked_sub(1)
        .ok_or(PagekeepError::PageOutOfRange { index: 0, len: 0 })
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

fn parse_sort(value: &str) -> std::result::Result<SortOrder, String> {
    SortOrder::from_keyword(value).ok_or_else(|| format!("unknown sort `{value}` (date, name, size)"))
}

fn parse_filter(value: &str) -> std::result::Result<PageFilter, String> {
    PageFilter::from_keyword(value)
        .ok_or_else(|| format!("unknown filter `{value}` (original, grayscale, bw, enhanced)"))
}

fn parse_crop(value: &str) -> std::result::Result<CropRect, String> {
    let parts: Vec<u32> = value
        .split(',')
        .map(|p| p.trim().parse::<u32>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|e| format!("bad crop `{value}`: {e}"))?;
    match parts.as_slice() {
        &[x, y, width, height] => Ok(CropRect { x, y, width, height }),
        _ => Err(format!("crop needs x,y,width,height, got `{value}`")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_list_flags() {
        let cli = Cli::try_parse_from(["pagekeep", "list", "--sort", "size", "--search", "tax"])
            .expect("parse");
        match cli.command {
            Command::List { sort, search, .. } => {
                assert_eq!(sort, SortOrder::SizeDescending);
                assert_eq!(search.as_deref(), Some("tax"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(Cli::try_parse_from(["pagekeep", "list", "--sort", "color"]).is_err());
    }

    #[test]
    fn crop_and_page_helpers() {
        assert_eq!(
            parse_crop("1, 2,30,40").expect("crop"),
            CropRect { x: 1, y: 2, width: 30, height: 40 }
        );
        assert!(parse_crop("1,2,3").is_err());
        assert_eq!(to_index(1).expect("index"), 0);
        assert!(to_index(0).is_err());
        assert_eq!(human_size(512), "512 B");
        assert_eq!(human_size(2048), "2.0 KB");
    }
}
