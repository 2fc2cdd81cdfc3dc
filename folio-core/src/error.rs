//! Error types for Folio Core

use thiserror::Error;

/// Result type alias using FolioError
pub type Result<T> = std::result::Result<T, FolioError>;

/// Top-level error type. Every variant aborts the run.
#[derive(Debug, Error)]
pub enum FolioError {
    #[error("Container error: {0}")]
    Container(#[from] ContainerError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while reading or writing the zip container
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("Unreadable archive: {0}")]
    Unreadable(String),

    #[error("Corrupt archive: {0}")]
    Corrupt(String),

    #[error("Unsafe entry path: {0}")]
    UnsafeEntry(String),

    #[error("Archive write failed: {0}")]
    Write(String),
}

/// Errors that occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Backend error: {0}")]
    BackendError(String),
}

/// Why a single content document could not be rewritten.
///
/// These never abort the pipeline; the document is skipped and the reason
/// lands in the run report.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RewriteError {
    #[error("content is not valid UTF-8: {0}")]
    Encoding(String),

    #[error("markup could not be scanned: {0}")]
    Markup(String),
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => StorageError::NotFound(e.to_string()),
            std::io::ErrorKind::PermissionDenied => StorageError::PermissionDenied(e.to_string()),
            _ => StorageError::BackendError(e.to_string()),
        }
    }
}
