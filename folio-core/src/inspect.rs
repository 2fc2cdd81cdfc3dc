//! Canonical layout checks
//!
//! Verifies that an archive has the shape the pipeline produces: the
//! container invariants, and agreement between manifest, spine, navigation
//! and the files actually present. This is not a general EPUB validator.

use crate::archive::read_entries;
use crate::error::ContainerError;
use crate::layout::{self, MIMETYPE, MIMETYPE_PATH, NCX_PATH, PACKAGE_PATH};
use crate::markup::Markup;
use crate::package::XHTML_MEDIA_TYPE;
use crate::rewrite::tracking::TRACKING_CLASS;
use crate::types::Document;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io::Cursor;
use zip::{CompressionMethod, ZipArchive};

/// One broken layout invariant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    MimetypeNotFirst,
    MimetypeCompressed,
    MimetypeContent { found: String },
    MissingFile { path: String },
    UnreadablePackage { path: String, reason: String },
    CountMismatch { manifest_documents: usize, spine: usize, nav_points: usize },
    PlayOrder { position: usize, found: String },
    DanglingHref { source: String, href: String },
    UnknownIdref { idref: String },
    DocumentName { position: usize, href: String },
    DuplicateTrackingId { document: String, id: String },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::MimetypeNotFirst => write!(f, "mimetype is not the first entry"),
            Violation::MimetypeCompressed => write!(f, "mimetype entry is compressed"),
            Violation::MimetypeContent { found } => write!(f, "mimetype holds '{found}'"),
            Violation::MissingFile { path } => write!(f, "{path} is missing"),
            Violation::UnreadablePackage { path, reason } => write!(f, "{path} could not be read: {reason}"),
            Violation::CountMismatch {
                manifest_documents,
                spine,
                nav_points,
            } => write!(
                f,
                "{manifest_documents} manifest documents, {spine} spine items, {nav_points} navPoints"
            ),
            Violation::PlayOrder { position, found } => {
                write!(f, "navPoint {position} has playOrder '{found}'")
            }
            Violation::DanglingHref { source, href } => write!(f, "{source}: '{href}' does not resolve"),
            Violation::UnknownIdref { idref } => write!(f, "spine idref '{idref}' is not in the manifest"),
            Violation::DocumentName { position, href } => {
                write!(f, "spine item {position} is '{href}'")
            }
            Violation::DuplicateTrackingId { document, id } => {
                write!(f, "{document}: tracking id '{id}' repeats")
            }
        }
    }
}

/// Result of [`inspect_archive`]
#[derive(Debug, Clone, Default, Serialize)]
pub struct LayoutReport {
    pub entries: usize,
    pub manifest_items: usize,
    pub spine_items: usize,
    pub nav_points: usize,
    pub violations: Vec<Violation>,
}

impl LayoutReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

#[derive(Debug)]
struct Item {
    id: String,
    href: String,
    media_type: String,
}

/// Check an archive against the canonical layout
pub fn inspect_archive(data: &[u8]) -> Result<LayoutReport, ContainerError> {
    let entries: HashMap<String, Vec<u8>> = read_entries(data)?.into_iter().collect();
    let mut report = LayoutReport {
        entries: entries.len(),
        ..LayoutReport::default()
    };

    check_mimetype(data, &entries, &mut report)?;

    let Some(opf) = read_text(&entries, PACKAGE_PATH, &mut report) else {
        return Ok(report);
    };
    let (items, spine) = match parse_package(&opf) {
        Ok(parsed) => parsed,
        Err(e) => {
            report.violations.push(Violation::UnreadablePackage {
                path: PACKAGE_PATH.to_string(),
                reason: e.to_string(),
            });
            return Ok(report);
        }
    };
    report.manifest_items = items.len();
    report.spine_items = spine.len();

    for item in &items {
        check_href(&entries, PACKAGE_PATH, &item.href, &mut report);
    }

    let by_id: HashMap<&str, &Item> = items.iter().map(|i| (i.id.as_str(), i)).collect();
    for (position, idref) in spine.iter().enumerate() {
        match by_id.get(idref.as_str()) {
            Some(item) => {
                let expected = format!("Text/{}", Document::canonical_name_for(position));
                if item.href != expected {
                    report.violations.push(Violation::DocumentName {
                        position,
                        href: item.href.clone(),
                    });
                }
            }
            None => report.violations.push(Violation::UnknownIdref { idref: idref.clone() }),
        }
    }

    let nav_points = match read_text(&entries, NCX_PATH, &mut report) {
        Some(ncx) => match parse_ncx(&ncx) {
            Ok(points) => points,
            Err(e) => {
                report.violations.push(Violation::UnreadablePackage {
                    path: NCX_PATH.to_string(),
                    reason: e.to_string(),
                });
                Vec::new()
            }
        },
        None => Vec::new(),
    };
    report.nav_points = nav_points.len();
    for (i, (order, src)) in nav_points.iter().enumerate() {
        if order.parse::<usize>().ok() != Some(i + 1) {
            report.violations.push(Violation::PlayOrder {
                position: i + 1,
                found: order.clone(),
            });
        }
        check_href(&entries, NCX_PATH, src, &mut report);
    }

    let documents: Vec<&Item> = items.iter().filter(|i| i.media_type == XHTML_MEDIA_TYPE).collect();
    if documents.len() != spine.len() || spine.len() != nav_points.len() {
        report.violations.push(Violation::CountMismatch {
            manifest_documents: documents.len(),
            spine: spine.len(),
            nav_points: nav_points.len(),
        });
    }

    for item in documents {
        let Some(path) = layout::resolve_href(PACKAGE_PATH, &item.href) else {
            continue;
        };
        if let Some(bytes) = entries.get(&path) {
            check_tracking_ids(&path, &String::from_utf8_lossy(bytes), &mut report);
        }
    }

    Ok(report)
}

fn check_mimetype(
    data: &[u8],
    entries: &HashMap<String, Vec<u8>>,
    report: &mut LayoutReport,
) -> Result<(), ContainerError> {
    if let Some(mimetype) = entries.get(MIMETYPE_PATH) {
        let found = String::from_utf8_lossy(mimetype);
        if found.trim() != MIMETYPE {
            report.violations.push(Violation::MimetypeContent {
                found: found.into_owned(),
            });
        }
    }

    let mut archive = ZipArchive::new(Cursor::new(data)).map_err(|e| ContainerError::Corrupt(e.to_string()))?;
    if archive.is_empty() {
        report.violations.push(Violation::MissingFile {
            path: MIMETYPE_PATH.to_string(),
        });
        return Ok(());
    }
    let first = archive.by_index(0).map_err(|e| ContainerError::Corrupt(e.to_string()))?;
    if first.name() != MIMETYPE_PATH {
        report.violations.push(Violation::MimetypeNotFirst);
    } else if first.compression() != CompressionMethod::Stored {
        report.violations.push(Violation::MimetypeCompressed);
    }
    Ok(())
}

fn read_text(entries: &HashMap<String, Vec<u8>>, path: &str, report: &mut LayoutReport) -> Option<String> {
    match entries.get(path) {
        Some(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        None => {
            report.violations.push(Violation::MissingFile { path: path.to_string() });
            None
        }
    }
}

fn check_href(entries: &HashMap<String, Vec<u8>>, source: &str, href: &str, report: &mut LayoutReport) {
    let resolves = layout::resolve_href(source, href)
        .map(|path| entries.contains_key(&path))
        .unwrap_or(false);
    if !resolves {
        report.violations.push(Violation::DanglingHref {
            source: source.to_string(),
            href: href.to_string(),
        });
    }
}

fn check_tracking_ids(path: &str, source: &str, report: &mut LayoutReport) {
    let markup = Markup::scan_lenient(source);
    let mut seen = HashSet::new();
    for span in markup.named("span").filter(|s| s.has_token("class", TRACKING_CLASS)) {
        if let Some(id) = span.attr("id") {
            if !seen.insert(id) {
                report.violations.push(Violation::DuplicateTrackingId {
                    document: path.to_string(),
                    id: id.to_string(),
                });
            }
        }
    }
}

fn attribute(element: &BytesStart<'_>, name: &[u8]) -> String {
    element
        .attributes()
        .with_checks(false)
        .flatten()
        .find(|a| a.key.local_name().as_ref() == name)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
        .unwrap_or_default()
}

fn parse_package(xml: &str) -> Result<(Vec<Item>, Vec<String>), quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut items = Vec::new();
    let mut spine = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"item" => items.push(Item {
                    id: attribute(&e, b"id"),
                    href: attribute(&e, b"href"),
                    media_type: attribute(&e, b"media-type"),
                }),
                b"itemref" => spine.push(attribute(&e, b"idref")),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok((items, spine))
}

/// `(playOrder, content src)` per navPoint, in document order
fn parse_ncx(xml: &str) -> Result<Vec<(String, String)>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut points: Vec<(String, String)> = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"navPoint" => points.push((attribute(&e, b"playOrder"), String::new())),
                b"content" => {
                    if let Some(last) = points.last_mut() {
                        if last.1.is_empty() {
                            last.1 = attribute(&e, b"src");
                        }
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::write_archive;

    const OPF: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0">
  <manifest>
    <item id="f0" href="Text/f0.xhtml" media-type="application/xhtml+xml"/>
    <item id="f1" href="Text/f1.xhtml" media-type="application/xhtml+xml"/>
    <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
  </manifest>
  <spine toc="ncx"><itemref idref="f0"/><itemref idref="f1"/></spine>
</package>"#;

    const NCX: &str = r#"<ncx><navMap>
<navPoint id="navPoint-1" playOrder="1"><navLabel><text>a</text></navLabel><content src="Text/f0.xhtml"/></navPoint>
<navPoint id="navPoint-2" playOrder="2"><navLabel><text>b</text></navLabel><content src="Text/f1.xhtml"/></navPoint>
</navMap></ncx>"#;

    fn archive(files: &[(&str, &str)]) -> Vec<u8> {
        let entries: Vec<_> = files
            .iter()
            .map(|(name, content)| (name.to_string(), content.as_bytes().to_vec()))
            .collect();
        write_archive(&entries).unwrap()
    }

    fn doc(spans: &[&str]) -> String {
        let body: String = spans
            .iter()
            .map(|id| format!(r#"<p><span class="koboSpan" id="{id}">x</span></p>"#))
            .collect();
        format!("<html><body>{body}</body></html>")
    }

    #[test]
    fn test_valid_layout() {
        let f0 = doc(&["kobo.1.1", "kobo.1.2"]);
        let f1 = doc(&["kobo.2.1"]);
        let data = archive(&[
            ("OEBPS/content.opf", OPF),
            ("OEBPS/toc.ncx", NCX),
            ("OEBPS/Text/f0.xhtml", &f0),
            ("OEBPS/Text/f1.xhtml", &f1),
        ]);

        let report = inspect_archive(&data).unwrap();
        assert!(report.is_valid(), "{:?}", report.violations);
        assert_eq!(report.spine_items, 2);
        assert_eq!(report.nav_points, 2);
        assert_eq!(report.manifest_items, 3);
    }

    #[test]
    fn test_reports_broken_invariants() {
        let f0 = doc(&["kobo.1.1", "kobo.1.1"]);
        let ncx = NCX.replace(r#"playOrder="2""#, r#"playOrder="3""#);
        let data = archive(&[
            ("OEBPS/content.opf", OPF),
            ("OEBPS/toc.ncx", &ncx),
            ("OEBPS/Text/f0.xhtml", &f0),
        ]);

        let report = inspect_archive(&data).unwrap();
        assert!(report.violations.contains(&Violation::PlayOrder {
            position: 2,
            found: "3".into()
        }));
        assert!(report.violations.contains(&Violation::DanglingHref {
            source: PACKAGE_PATH.into(),
            href: "Text/f1.xhtml".into()
        }));
        assert!(report.violations.contains(&Violation::DuplicateTrackingId {
            document: "OEBPS/Text/f0.xhtml".into(),
            id: "kobo.1.1".into()
        }));
    }

    #[test]
    fn test_missing_package_document() {
        let report = inspect_archive(&archive(&[("OEBPS/Text/f0.xhtml", "<p/>")])).unwrap();
        assert_eq!(
            report.violations,
            vec![Violation::MissingFile {
                path: PACKAGE_PATH.into()
            }]
        );
    }

    #[test]
    fn test_non_dense_names() {
        let opf = OPF.replace("Text/f1.xhtml", "Text/f7.xhtml");
        let ncx = NCX.replace("Text/f1.xhtml", "Text/f7.xhtml");
        let data = archive(&[
            ("OEBPS/content.opf", &opf),
            ("OEBPS/toc.ncx", &ncx),
            ("OEBPS/Text/f0.xhtml", "<p/>"),
            ("OEBPS/Text/f7.xhtml", "<p/>"),
        ]);
        let report = inspect_archive(&data).unwrap();
        assert_eq!(
            report.violations,
            vec![Violation::DocumentName {
                position: 1,
                href: "Text/f7.xhtml".into()
            }]
        );
    }
}
