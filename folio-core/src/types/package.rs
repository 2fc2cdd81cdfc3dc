//! Package and navigation entries

use serde::{Deserialize, Serialize};

/// A `<manifest>` item; `href` is relative to the package document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManifestItem {
    pub id: String,
    pub href: String,
    pub media_type: String,
}

impl ManifestItem {
    pub fn new(id: impl Into<String>, href: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            href: href.into(),
            media_type: media_type.into(),
        }
    }
}

/// A `<spine>` itemref
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpineItem {
    pub idref: String,
}

/// One NCX `navPoint`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NavPoint {
    pub id: String,
    /// 1-based, equal to the spine position plus one
    pub play_order: usize,
    pub label: String,
    pub href: String,
}
