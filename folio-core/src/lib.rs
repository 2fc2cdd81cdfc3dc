//! Folio Core Library
//!
//! Re-lays out EPUB packages into the fixed structure some e-reading
//! platforms expect: sequentially named documents under `OEBPS/Text`,
//! popup footnotes, reading-position tracking spans, and a regenerated
//! package document and NCX that agree with the files actually emitted.
//!
//! ```no_run
//! use folio_core::{Cleaner, CleanerConfig, Platform};
//! use std::path::Path;
//!
//! # async fn run() -> folio_core::Result<()> {
//! let cleaner = Cleaner::new(CleanerConfig::for_platform(Platform::Duokan));
//! let report = cleaner.clean(Path::new("in.epub"), Path::new("out.epub")).await?;
//! println!("{} documents", report.documents);
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod assets;
pub mod config;
pub mod error;
pub mod inspect;
pub mod layout;
pub mod markup;
pub mod package;
pub mod pipeline;
pub mod platform;
pub mod reorganize;
pub mod report;
pub mod rewrite;
pub mod state;
pub mod storage;
pub mod types;

pub use config::CleanerConfig;
pub use error::{ContainerError, FolioError, Result, RewriteError, StorageError};
pub use inspect::{inspect_archive, LayoutReport, Violation};
pub use package::PackageInfo;
pub use pipeline::Cleaner;
pub use platform::{NoteRenderer, Platform};
pub use report::{Anomaly, RunReport};
pub use state::PipelineState;
pub use types::{Book, Document, FontAsset, ImageAsset, ManifestItem, Metadata, NavPoint, SpineItem};

/// Read the package metadata of an EPUB without cleaning it
pub async fn read_info(data: &[u8], config: &CleanerConfig) -> Result<PackageInfo> {
    let storage = storage::MemoryStorage::new();
    archive::extract(data, &storage).await?;
    Ok(package::read_package(&storage, config).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_info_of_garbage_is_container_error() {
        let result = read_info(b"nope", &CleanerConfig::default()).await;
        assert!(matches!(result, Err(FolioError::Container(_))));
    }
}
