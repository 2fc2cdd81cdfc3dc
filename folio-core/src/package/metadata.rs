//! Metadata Reader
//!
//! Finds the input's package document and pulls the Dublin Core fields out
//! of its `<metadata>`. Nothing here is fatal: a missing or unparsable
//! package leaves the configured defaults in place and records why.

use super::{DC_NAMESPACE, NCX_MEDIA_TYPE};
use crate::config::CleanerConfig;
use crate::layout::{self, CONTAINER_PATH};
use crate::storage::{StorageProvider, StorageResult};
use crate::types::Metadata;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;
use serde::Serialize;

/// What the input's package document told us
#[derive(Debug, Clone, Serialize)]
pub struct PackageInfo {
    pub metadata: Metadata,

    /// Tree path of the package document that was read
    pub package_path: Option<String>,

    /// `version` attribute of the package element
    pub version: Option<String>,

    /// Package, NCX and navigation files to drop before reorganizing
    pub superseded: Vec<String>,

    /// Why the metadata could not be read, when it could not
    pub degraded: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Creator,
    Language,
    Identifier,
}

impl Field {
    fn from_local_name(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(Field::Title),
            b"creator" => Some(Field::Creator),
            b"language" => Some(Field::Language),
            b"identifier" => Some(Field::Identifier),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct ParsedPackage {
    version: Option<String>,
    title: Option<String>,
    creator: Option<String>,
    language: Option<String>,
    identifier: Option<String>,
    /// Hrefs of the EPUB 3 navigation document and NCX items
    navigation: Vec<String>,
}

impl ParsedPackage {
    fn set(&mut self, field: Field, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        let slot = match field {
            Field::Title => &mut self.title,
            Field::Creator => &mut self.creator,
            Field::Language => &mut self.language,
            Field::Identifier => &mut self.identifier,
        };
        // first non-empty occurrence wins
        if slot.is_none() {
            *slot = Some(text.to_string());
        }
    }
}

/// Read the input's package document from the working tree
pub async fn read_package(storage: &dyn StorageProvider, config: &CleanerConfig) -> StorageResult<PackageInfo> {
    let files = storage.list("").await?;
    let mut info = PackageInfo {
        metadata: Metadata::from_config(config),
        package_path: None,
        version: None,
        superseded: files
            .iter()
            .filter(|path| matches!(layout::extension(path).as_deref(), Some("opf" | "ncx")))
            .cloned()
            .collect(),
        degraded: None,
    };

    let Some(package_path) = locate_package(storage, &files).await? else {
        info.degraded = Some("no package document found".to_string());
        return Ok(info);
    };
    tracing::debug!("Reading package document {}", package_path);

    let xml = storage.read_text(&package_path).await?;
    match parse_package(&xml) {
        Ok(parsed) => {
            for href in &parsed.navigation {
                if let Some(path) = layout::resolve_href(&package_path, href) {
                    if files.contains(&path) && !info.superseded.contains(&path) {
                        info.superseded.push(path);
                    }
                }
            }
            let metadata = &mut info.metadata;
            if let Some(title) = parsed.title {
                metadata.title = title;
            }
            if let Some(creator) = parsed.creator {
                metadata.author = creator;
            }
            if let Some(language) = parsed.language {
                metadata.language = language;
            }
            if let Some(identifier) = parsed.identifier {
                metadata.identifier = identifier;
            }
            info.version = parsed.version;
        }
        Err(e) => {
            info.degraded = Some(format!("{package_path}: {e}"));
        }
    }

    info.superseded.sort();
    info.package_path = Some(package_path);
    Ok(info)
}

/// The rootfile named by `container.xml` when it exists, else the first
/// `.opf` in path order
async fn locate_package(storage: &dyn StorageProvider, files: &[String]) -> StorageResult<Option<String>> {
    if files.iter().any(|f| f == CONTAINER_PATH) {
        let container = storage.read_text(CONTAINER_PATH).await?;
        if let Some(rootfile) = rootfile_path(&container) {
            if files.contains(&rootfile) {
                return Ok(Some(rootfile));
            }
        }
    }
    Ok(files
        .iter()
        .find(|path| layout::extension(path).as_deref() == Some("opf"))
        .cloned())
}

/// `full-path` of the first `<rootfile>` in a container descriptor
pub(crate) fn rootfile_path(container: &str) -> Option<String> {
    let mut reader = NsReader::from_str(container);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"rootfile" => {
                return attribute(&e, b"full-path").filter(|p| !p.is_empty());
            }
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => {}
        }
    }
}

fn parse_package(xml: &str) -> Result<ParsedPackage, quick_xml::Error> {
    let mut reader = NsReader::from_str(xml);
    let mut parsed = ParsedPackage::default();
    let mut in_metadata = false;
    let mut current: Option<Field> = None;
    let mut text = String::new();

    loop {
        let (namespace, event) = reader.read_resolved_event()?;
        let is_dc = matches!(namespace, ResolveResult::Bound(Namespace(ns)) if ns == DC_NAMESPACE.as_bytes());
        match event {
            Event::Start(e) => match e.local_name().as_ref() {
                b"package" => parsed.version = attribute(&e, b"version"),
                b"metadata" => in_metadata = true,
                b"item" => parsed.note_item(&e),
                name if in_metadata && is_dc && current.is_none() => {
                    current = Field::from_local_name(name);
                    text.clear();
                }
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"item" => parsed.note_item(&e),
            Event::Text(t) if current.is_some() => match t.unescape() {
                Ok(unescaped) => text.push_str(&unescaped),
                Err(_) => text.push_str(&String::from_utf8_lossy(&t)),
            },
            Event::CData(t) if current.is_some() => text.push_str(&String::from_utf8_lossy(&t)),
            Event::End(e) => match e.local_name().as_ref() {
                b"metadata" => in_metadata = false,
                name => {
                    if let Some(field) = current {
                        if is_dc && Field::from_local_name(name) == Some(field) {
                            parsed.set(field, &text);
                            current = None;
                        }
                    }
                }
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(parsed)
}

impl ParsedPackage {
    fn note_item(&mut self, item: &BytesStart<'_>) {
        let Some(href) = attribute(item, b"href") else {
            return;
        };
        let is_nav = attribute(item, b"properties")
            .map(|p| p.split_whitespace().any(|t| t == "nav"))
            .unwrap_or(false);
        let is_ncx = attribute(item, b"media-type").as_deref() == Some(NCX_MEDIA_TYPE);
        if is_nav || is_ncx {
            self.navigation.push(href);
        }
    }
}

fn attribute(element: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    element
        .attributes()
        .with_checks(false)
        .flatten()
        .find(|a| a.key.local_name().as_ref() == name)
        .map(|a| match a.unescape_value() {
            Ok(value) => value.into_owned(),
            Err(_) => String::from_utf8_lossy(&a.value).into_owned(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    const OPF: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="uid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:identifier id="uid">urn:isbn:9780000000000</dc:identifier>
    <dc:title>Tom &amp; Jerry</dc:title>
    <dc:creator>First Author</dc:creator>
    <dc:creator>Second Author</dc:creator>
    <meta property="dcterms:modified">2020-01-01T00:00:00Z</meta>
  </metadata>
  <manifest>
    <item id="nav" href="nav.xhtml" media-type="application/xhtml+xml" properties="nav"/>
    <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
    <item id="c1" href="text/ch1.xhtml" media-type="application/xhtml+xml"/>
  </manifest>
</package>"#;

    async fn tree(files: &[(&str, &str)]) -> MemoryStorage {
        let storage = MemoryStorage::new();
        for (path, content) in files {
            storage.write_text(path, content).await.unwrap();
        }
        storage
    }

    #[tokio::test]
    async fn test_reads_dublin_core_fields() {
        let storage = tree(&[
            ("OPS/package.opf", OPF),
            ("OPS/nav.xhtml", "<html/>"),
            ("OPS/toc.ncx", "<ncx/>"),
            ("OPS/text/ch1.xhtml", "<html/>"),
        ])
        .await;

        let info = read_package(&storage, &CleanerConfig::default()).await.unwrap();
        assert!(info.degraded.is_none());
        assert_eq!(info.package_path.as_deref(), Some("OPS/package.opf"));
        assert_eq!(info.version.as_deref(), Some("3.0"));
        assert_eq!(info.metadata.title, "Tom & Jerry");
        assert_eq!(info.metadata.author, "First Author");
        assert_eq!(info.metadata.identifier, "urn:isbn:9780000000000");
        // absent language keeps the default
        assert_eq!(info.metadata.language, "zh-CN");
        assert_eq!(
            info.superseded,
            vec!["OPS/nav.xhtml", "OPS/package.opf", "OPS/toc.ncx"]
        );
    }

    #[tokio::test]
    async fn test_missing_package_is_degraded() {
        let storage = tree(&[("OEBPS/Text/a.xhtml", "<p/>")]).await;
        let config = CleanerConfig {
            default_title: "Untitled".into(),
            ..CleanerConfig::default()
        };

        let info = read_package(&storage, &config).await.unwrap();
        assert!(info.degraded.is_some());
        assert!(info.package_path.is_none());
        assert_eq!(info.metadata.title, "Untitled");
        assert!(info.superseded.is_empty());
    }

    #[tokio::test]
    async fn test_broken_package_is_degraded() {
        let storage = tree(&[(
            "content.opf",
            r#"<package><metadata xmlns:dc="http://purl.org/dc/elements/1.1/"><dc:title>Half</dc:title></metadata></manifest>"#,
        )])
        .await;

        let info = read_package(&storage, &CleanerConfig::default()).await.unwrap();
        assert!(info.degraded.is_some());
        assert_eq!(info.metadata.title, "");
        assert_eq!(info.superseded, vec!["content.opf"]);
    }

    #[tokio::test]
    async fn test_container_rootfile_is_preferred() {
        let container = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles><rootfile full-path="b/real.opf" media-type="application/oebps-package+xml"/></rootfiles>
</container>"#;
        let storage = tree(&[
            (CONTAINER_PATH, container),
            ("a/stale.opf", "<package/>"),
            ("b/real.opf", OPF),
        ])
        .await;

        let info = read_package(&storage, &CleanerConfig::default()).await.unwrap();
        assert_eq!(info.package_path.as_deref(), Some("b/real.opf"));
        assert_eq!(info.superseded, vec!["a/stale.opf", "b/real.opf"]);
    }

    #[test]
    fn test_non_dc_title_is_ignored() {
        let xml = r#"<package><metadata xmlns:dc="http://purl.org/dc/elements/1.1/"><title>plain</title><dc:title>real</dc:title></metadata></package>"#;
        let parsed = parse_package(xml).unwrap();
        assert_eq!(parsed.title.as_deref(), Some("real"));
    }
}
