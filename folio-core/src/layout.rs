//! Canonical package layout and path helpers
//!
//! Tree paths are relative, `/`-separated keys as stored by the
//! [`StorageProvider`](crate::storage::StorageProvider).

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use serde::Serialize;

pub const MIMETYPE_PATH: &str = "mimetype";
pub const MIMETYPE: &str = "application/epub+zip";
pub const CONTAINER_PATH: &str = "META-INF/container.xml";
pub const PACKAGE_PATH: &str = "OEBPS/content.opf";
pub const NCX_PATH: &str = "OEBPS/toc.ncx";

pub const OEBPS_DIR: &str = "OEBPS";
pub const TEXT_DIR: &str = "OEBPS/Text";
pub const STYLES_DIR: &str = "OEBPS/Styles";
pub const IMAGES_DIR: &str = "OEBPS/Images";
pub const FONTS_DIR: &str = "OEBPS/Fonts";

/// Characters escaped when writing a path back into an attribute
const HREF: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?');

/// The four canonical subtrees a file can be filed under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Content,
    Style,
    Image,
    Font,
}

impl AssetKind {
    /// Classify a path by its (case-insensitive) extension
    pub fn classify(path: &str) -> Option<Self> {
        match extension(path)?.as_str() {
            "html" | "xhtml" | "htm" => Some(AssetKind::Content),
            "css" => Some(AssetKind::Style),
            "jpg" | "jpeg" | "png" | "gif" | "svg" => Some(AssetKind::Image),
            "ttf" | "otf" | "woff" | "woff2" => Some(AssetKind::Font),
            _ => None,
        }
    }

    /// Canonical directory for this kind
    pub fn dir(&self) -> &'static str {
        match self {
            AssetKind::Content => TEXT_DIR,
            AssetKind::Style => STYLES_DIR,
            AssetKind::Image => IMAGES_DIR,
            AssetKind::Font => FONTS_DIR,
        }
    }

    /// Whether `path` is a direct child of one of the canonical directories
    pub fn is_canonical(path: &str) -> bool {
        let dir = parent(path);
        [TEXT_DIR, STYLES_DIR, IMAGES_DIR, FONTS_DIR].contains(&dir)
    }
}

/// Files that are never moved or rewritten
pub fn is_reserved(path: &str) -> bool {
    matches!(file_name(path), "mimetype" | "container.xml")
}

/// Directory part of a tree path (`""` at the root)
pub fn parent(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// Final component of a tree path
pub fn file_name(path: &str) -> &str {
    path.rsplit_once('/').map(|(_, name)| name).unwrap_or(path)
}

/// File name without its extension
pub fn file_stem(path: &str) -> &str {
    let name = file_name(path);
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}

/// Lowercased extension without the dot
pub fn extension(path: &str) -> Option<String> {
    let name = file_name(path);
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext.to_ascii_lowercase()),
        _ => None,
    }
}

/// Join a directory and a relative path
pub fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}

/// Resolve an href found in `base_file` to a tree path.
///
/// Returns `None` for external references, pure fragments, and paths that
/// climb above the tree root.
pub fn resolve_href(base_file: &str, href: &str) -> Option<String> {
    let path = href.split('#').next().unwrap_or_default();
    if path.is_empty() || is_external(path) {
        return None;
    }
    let decoded = percent_decode_str(path).decode_utf8_lossy();

    let mut parts: Vec<&str> = if decoded.starts_with('/') {
        Vec::new()
    } else {
        parent(base_file).split('/').filter(|p| !p.is_empty()).collect()
    };
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    (!parts.is_empty()).then(|| parts.join("/"))
}

/// Relative href from a directory to a tree path, percent-encoded
pub fn relative_href(from_dir: &str, to: &str) -> String {
    let from: Vec<&str> = from_dir.split('/').filter(|p| !p.is_empty()).collect();
    let target: Vec<&str> = to.split('/').filter(|p| !p.is_empty()).collect();

    let common = from
        .iter()
        .zip(&target)
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<String> = vec!["..".to_string(); from.len() - common];
    parts.extend(
        target[common..]
            .iter()
            .map(|p| utf8_percent_encode(p, HREF).to_string()),
    );
    parts.join("/")
}

/// Whether an href carries a URL scheme (`http:`, `mailto:`, `data:`...)
pub fn is_external(href: &str) -> bool {
    match href.find(':') {
        Some(colon) => {
            let scheme = &href[..colon];
            !scheme.is_empty()
                && !scheme.contains('/')
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

/// A manifest-safe identifier derived from a file name
pub fn sanitize_id(name: &str) -> String {
    let id: String = name.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    match id.chars().next() {
        Some(c) if c.is_ascii_alphabetic() => id,
        _ => format!("x{id}"),
    }
}
