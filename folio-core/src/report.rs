//! Run report
//!
//! Everything recoverable that happened during a run ends up here instead of
//! aborting it.

use crate::platform::Platform;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;

/// A recoverable problem met during a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Anomaly {
    /// Metadata stayed at its defaults
    MetadataDegraded { reason: String },
    /// A content document could not be rewritten and was left out of the spine
    DocumentSkipped { path: String, reason: String },
    /// A footnote reference without a definition in the same document
    UnresolvedReference { document: String, original_id: String },
    /// A footnote definition no reference pointed at; it was dropped
    OrphanDefinition { document: String, original_id: String },
    /// The document was scanned with the regex scanner
    FallbackScan { path: String },
    /// Two files flattened onto the same name
    NameCollision { path: String, renamed_to: String },
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anomaly::MetadataDegraded { reason } => write!(f, "metadata degraded: {reason}"),
            Anomaly::DocumentSkipped { path, reason } => write!(f, "skipped {path}: {reason}"),
            Anomaly::UnresolvedReference { document, original_id } => {
                write!(f, "unresolved footnote reference #{original_id} in {document}")
            }
            Anomaly::OrphanDefinition { document, original_id } => {
                write!(f, "dropped unreferenced footnote #{original_id} in {document}")
            }
            Anomaly::FallbackScan { path } => write!(f, "fallback scanner used for {path}"),
            Anomaly::NameCollision { path, renamed_to } => {
                write!(f, "name collision: {path} stored as {renamed_to}")
            }
        }
    }
}

/// Summary of one pipeline run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub platform: Platform,
    pub title: String,
    pub documents: usize,
    pub images: usize,
    pub fonts: usize,
    pub footnotes: usize,
    pub footnotes_resolved: usize,
    pub tracking_spans: usize,
    pub links_retargeted: usize,
    pub anomalies: Vec<Anomaly>,
    pub archive_bytes: usize,
    /// Hex SHA-256 of the emitted archive
    pub archive_sha256: String,
}

impl RunReport {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            ..Self::default()
        }
    }

    /// Record an anomaly and log it
    pub fn record(&mut self, anomaly: Anomaly) {
        tracing::warn!("{}", anomaly);
        self.anomalies.push(anomaly);
    }

    /// Fill in the size and digest of the emitted archive
    pub fn set_archive(&mut self, data: &[u8]) {
        self.archive_bytes = data.len();
        self.archive_sha256 = hex::encode(Sha256::digest(data));
    }

    pub fn skipped_documents(&self) -> usize {
        self.anomalies
            .iter()
            .filter(|a| matches!(a, Anomaly::DocumentSkipped { .. }))
            .count()
    }

    pub fn is_clean(&self) -> bool {
        self.anomalies.is_empty()
    }
}
