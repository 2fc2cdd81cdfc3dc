//! The cleaning pipeline
//!
//! Stages run strictly in order over one working tree. Footnote ranges and
//! spine positions are fixed in [`PipelineState`] before any document is
//! rewritten, so sequential and parallel runs produce the same archive.

use crate::archive;
use crate::assets;
use crate::config::CleanerConfig;
use crate::error::{ContainerError, FolioError, Result};
use crate::layout::{self, AssetKind, NCX_PATH, PACKAGE_PATH, TEXT_DIR};
use crate::markup::ScanMode;
use crate::package;
use crate::reorganize::{self, reorganize};
use crate::report::{Anomaly, RunReport};
use crate::rewrite::{self, DocumentJob, LinkMap, RewriteContext, Rewritten};
use crate::state::PipelineState;
use crate::storage::{LocalStorage, MemoryStorage, StorageProvider};
use crate::types::{Book, Document};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::Path;

/// A content document that survived [`rewrite::prepare`]
struct Pending {
    /// Current path in the working tree
    path: String,
    /// Path in the input package
    original_path: String,
    source: String,
    body: String,
    sequence: usize,
    first_footnote: u32,
}

/// Runs the pipeline with one configuration
#[derive(Debug, Clone, Default)]
pub struct Cleaner {
    config: CleanerConfig,
}

impl Cleaner {
    pub fn new(config: CleanerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CleanerConfig {
        &self.config
    }

    /// Clean the EPUB at `input` and write the result to `output`.
    ///
    /// The output file is only created once the whole archive is built.
    pub async fn clean(&self, input: &Path, output: &Path) -> Result<RunReport> {
        let data = tokio::fs::read(input)
            .await
            .map_err(|e| ContainerError::Unreadable(format!("{}: {}", input.display(), e)))?;
        let (archive, report) = self.clean_bytes(&data).await?;
        write_atomic(output, archive).await?;
        tracing::info!("Wrote {} ({} bytes)", output.display(), report.archive_bytes);
        Ok(report)
    }

    /// Clean an in-memory EPUB, returning the new archive and the report
    pub async fn clean_bytes(&self, data: &[u8]) -> Result<(Vec<u8>, RunReport)> {
        if self.config.in_memory {
            let storage = MemoryStorage::new();
            self.run(data, &storage).await
        } else {
            let dir = tempfile::TempDir::new()?;
            let storage = LocalStorage::new(dir.path());
            self.run(data, &storage).await
        }
    }

    async fn run(&self, data: &[u8], storage: &dyn StorageProvider) -> Result<(Vec<u8>, RunReport)> {
        let config = &self.config;
        let platform = config.platform;
        let mut report = RunReport::new(platform);
        let mut state = PipelineState::new();

        // Extract
        let extracted = archive::extract(data, storage).await?;
        tracing::info!("Extracted {} files", extracted);

        // Metadata
        let info = package::read_package(storage, config).await?;
        if let Some(reason) = &info.degraded {
            report.record(Anomaly::MetadataDegraded { reason: reason.clone() });
        }
        let mut book = Book::with_metadata(info.metadata.clone());
        report.title = book.metadata.title.clone();

        // Reorganize
        let moved = reorganize(storage, &info.superseded).await?;
        for collision in moved.collisions() {
            report.record(Anomaly::NameCollision {
                path: collision.from.clone(),
                renamed_to: collision.to.clone(),
            });
        }
        let original_of: HashMap<&str, &str> = moved
            .relocations
            .iter()
            .map(|r| (r.to.as_str(), r.from.as_str()))
            .collect();
        let original = |path: &str| original_of.get(path).copied().unwrap_or(path).to_string();

        let files = storage.list("").await?;
        let images = assets::plan_images(&files);
        book.fonts = assets::collect_fonts(&files);

        // Prepare documents in name order
        let mut pending = Vec::new();
        let mut skipped = Vec::new();
        for path in files
            .iter()
            .filter(|p| layout::parent(p) == TEXT_DIR)
            .filter(|p| AssetKind::classify(p) == Some(AssetKind::Content))
        {
            let bytes = storage.read(path).await?;
            match rewrite::prepare(&bytes, config.fallback_scanner) {
                Ok(prepared) => {
                    if prepared.scan_mode == ScanMode::Fallback {
                        report.record(Anomaly::FallbackScan { path: path.clone() });
                    }
                    let sequence = state.next_document() + 1;
                    let first_footnote = state.reserve_footnotes(prepared.references);
                    pending.push(Pending {
                        path: path.clone(),
                        original_path: original(path),
                        source: String::from_utf8_lossy(&bytes).into_owned(),
                        body: prepared.body,
                        sequence,
                        first_footnote,
                    });
                }
                Err(e) => {
                    report.record(Anomaly::DocumentSkipped {
                        path: path.clone(),
                        reason: e.to_string(),
                    });
                    skipped.push(path.clone());
                }
            }
        }
        tracing::info!(
            "Prepared {} documents, {} footnote ids reserved",
            pending.len(),
            state.footnotes_allocated()
        );

        // Every file's original path to where it ends up
        let mut links = LinkMap::new();
        let document_paths: Vec<String> = pending
            .iter()
            .map(|doc| layout::join(TEXT_DIR, &Document::canonical_name_for(doc.sequence - 1)))
            .collect();
        let mut final_paths: HashMap<&str, String> = pending
            .iter()
            .zip(&document_paths)
            .map(|(doc, target)| (doc.path.as_str(), target.clone()))
            .collect();
        for image in &images {
            final_paths.insert(image.original_name.as_str(), image.path());
        }
        for path in &files {
            let target = final_paths.get(path.as_str()).cloned().unwrap_or_else(|| path.clone());
            links.insert(original(path), target);
        }

        // Rewrite
        let ctx = RewriteContext {
            renderer: platform.renderer(),
            language: &book.metadata.language,
            fallback_title: &config.fallback_title,
            links: &links,
            allow_fallback: config.fallback_scanner,
        };
        let jobs: Vec<DocumentJob<'_>> = pending
            .iter()
            .map(|doc| DocumentJob {
                original_path: &doc.original_path,
                source: &doc.source,
                body: &doc.body,
                sequence: doc.sequence,
                first_footnote: doc.first_footnote,
            })
            .collect();
        let results: Vec<Rewritten> = if config.parallel {
            jobs.par_iter().map(|job| rewrite::rewrite(job, &ctx)).collect()
        } else {
            jobs.iter().map(|job| rewrite::rewrite(job, &ctx)).collect()
        };

        // Skipped documents keep their files but must not shadow outputs
        let targets: HashSet<String> = document_paths.iter().cloned().collect();
        let mut occupied: HashSet<String> = files.iter().cloned().chain(targets.iter().cloned()).collect();
        for path in skipped.iter().filter(|p| targets.contains(*p)) {
            let (renamed, _) = reorganize::free_name(TEXT_DIR, layout::file_name(path), &occupied);
            tracing::debug!("Moving skipped {} -> {}", path, renamed);
            storage.rename(path, &renamed).await?;
            occupied.insert(renamed);
        }

        for doc in &pending {
            storage.delete(&doc.path).await?;
        }

        let mut icon_references = 0;
        for ((doc, result), path) in pending.iter().zip(results).zip(&document_paths) {
            for orphan in &result.orphans {
                report.record(Anomaly::OrphanDefinition {
                    document: doc.original_path.clone(),
                    original_id: orphan.clone(),
                });
            }
            if platform.uses_note_icon() {
                icon_references += result.footnotes.len();
            }

            storage.write_text(path, &result.xhtml).await?;
            report.tracking_spans += result.tracking_spans;
            report.links_retargeted += result.links_retargeted;
            book.footnotes.extend(result.footnotes);
            book.add_document(Document {
                original_name: doc.original_path.clone(),
                canonical_name: layout::file_name(path).to_string(),
                title: result.title,
                raw_body: doc.body.clone(),
                rewritten_body: result.body,
                tracking_spans: result.tracking_spans,
            });
        }
        for entry in book.footnotes.unresolved() {
            report.record(Anomaly::UnresolvedReference {
                document: entry.document.clone(),
                original_id: entry.original_id.clone(),
            });
        }
        tracing::info!("Rewrote {} documents", book.documents.len());

        // Assets
        let renamed = assets::rename_images(storage, &images).await?;
        tracing::debug!("Renamed {} images", renamed);
        book.images = images;
        assets::write_stylesheets(storage).await?;
        if icon_references > 0 {
            book.images.push(assets::write_note_icon(storage).await?);
        }

        // Package, navigation and container
        let opf = package::render_opf(&book, config.modification_date())?;
        storage.write_text(PACKAGE_PATH, &opf).await?;
        let ncx = package::render_ncx(&book)?;
        storage.write_text(NCX_PATH, &ncx).await?;
        package::ensure_container(storage).await?;

        // Repack
        let output = archive::pack(storage).await?;
        report.documents = book.documents.len();
        report.images = book.images.len();
        report.fonts = book.fonts.len();
        report.footnotes = book.footnotes.len();
        report.footnotes_resolved = book.footnotes.resolved().count();
        report.set_archive(&output);
        tracing::info!(
            "Packed {} documents, {} images, {} fonts into {} bytes",
            report.documents,
            report.images,
            report.fonts,
            report.archive_bytes
        );

        Ok((output, report))
    }
}

/// Write `data` to a temporary sibling of `path`, then rename it into place
async fn write_atomic(path: &Path, data: Vec<u8>) -> Result<()> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => std::path::PathBuf::from("."),
        };
        let mut file = tempfile::NamedTempFile::new_in(dir)?;
        file.write_all(&data)?;
        file.as_file().sync_all()?;
        file.persist(&path).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(|e| FolioError::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string())))??;
    Ok(())
}
