//! Cleaner configuration

use crate::error::{FolioError, Result};
use crate::platform::Platform;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings for one pipeline run.
///
/// Every field has a default, so a config file only needs the keys it changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CleanerConfig {
    /// Target reading platform
    pub platform: Platform,

    /// Title used when the package document has none
    pub default_title: String,

    /// Author used when the package document has none
    pub default_author: String,

    /// Language tag used when the package document has none
    pub default_language: String,

    /// Identifier used when the package document has none
    pub default_identifier: String,

    /// Document title when neither a heading nor a `<title>` is present
    pub fallback_title: String,

    /// Rewrite documents on the rayon pool
    pub parallel: bool,

    /// Allow the regex scanner for markup the structured scanner rejects
    pub fallback_scanner: bool,

    /// Keep the working tree in memory instead of a temporary directory
    pub in_memory: bool,

    /// Modification date written to the package document (today when unset)
    pub modified: Option<NaiveDate>,
}

impl Default for CleanerConfig {
    fn default() -> Self {
        Self {
            platform: Platform::Generic,
            default_title: String::new(),
            default_author: String::new(),
            default_language: "zh-CN".to_string(),
            default_identifier: "1212".to_string(),
            fallback_title: "Chapter".to_string(),
            parallel: false,
            fallback_scanner: true,
            in_memory: false,
            modified: None,
        }
    }
}

impl CleanerConfig {
    /// Create a default configuration for the given platform
    pub fn for_platform(platform: Platform) -> Self {
        Self {
            platform,
            ..Self::default()
        }
    }

    /// Parse a configuration from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| FolioError::Config(e.to_string()))
    }

    /// Load a configuration file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| FolioError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    /// Set the target platform
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Enable or disable parallel document rewriting
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Keep the working tree in memory
    pub fn with_in_memory(mut self, in_memory: bool) -> Self {
        self.in_memory = in_memory;
        self
    }

    /// Pin the modification date
    pub fn with_modified(mut self, date: NaiveDate) -> Self {
        self.modified = Some(date);
        self
    }

    /// The modification date for this run
    pub fn modification_date(&self) -> NaiveDate {
        self.modified
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = CleanerConfig::from_json(r#"{"platform": "duokan", "parallel": true}"#).unwrap();
        assert_eq!(config.platform, Platform::Duokan);
        assert!(config.parallel);
        assert_eq!(config.default_language, "zh-CN");
        assert_eq!(config.fallback_title, "Chapter");
        assert!(config.fallback_scanner);
    }

    #[test]
    fn test_modified_date_parses() {
        let config = CleanerConfig::from_json(r#"{"modified": "2024-03-01"}"#).unwrap();
        assert_eq!(
            config.modification_date(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let result = CleanerConfig::from_json(r#"{"platform": "nook"}"#);
        assert!(matches!(result, Err(FolioError::Config(_))));
    }
}
