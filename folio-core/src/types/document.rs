//! Content documents

use crate::layout::{self, TEXT_DIR};
use serde::Serialize;

/// One content document and its place in the spine
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Document {
    /// Path in the input package
    pub original_name: String,

    /// `f<N>.xhtml`, N being the spine position from 0
    pub canonical_name: String,

    /// Derived title
    pub title: String,

    /// Normalized body before rewriting
    #[serde(skip)]
    pub raw_body: String,

    /// Body after footnote, link and tracking rewriting
    #[serde(skip)]
    pub rewritten_body: String,

    /// Tracking wrappers written into the body
    pub tracking_spans: usize,
}

impl Document {
    /// Canonical file name for a spine position
    pub fn canonical_name_for(position: usize) -> String {
        format!("f{position}.xhtml")
    }

    /// Manifest id: the canonical name without its extension
    pub fn id(&self) -> &str {
        layout::file_stem(&self.canonical_name)
    }

    /// Tree path of the emitted file
    pub fn path(&self) -> String {
        layout::join(TEXT_DIR, &self.canonical_name)
    }

    /// Path relative to the package document
    pub fn href(&self) -> String {
        format!("Text/{}", self.canonical_name)
    }
}
