//! Book-level metadata recovered from the package document

use crate::config::CleanerConfig;
use serde::{Deserialize, Serialize};

/// Dublin Core fields carried into the new package document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Metadata {
    /// Book title
    pub title: String,

    /// First creator
    pub author: String,

    /// Language tag
    pub language: String,

    /// Identifier written as `duokan-book-id`
    pub identifier: String,
}

impl Metadata {
    /// Metadata holding only the configured defaults
    pub fn from_config(config: &CleanerConfig) -> Self {
        Self {
            title: config.default_title.clone(),
            author: config.default_author.clone(),
            language: config.default_language.clone(),
            identifier: config.default_identifier.clone(),
        }
    }
}

impl Default for Metadata {
    fn default() -> Self {
        Self::from_config(&CleanerConfig::default())
    }
}
