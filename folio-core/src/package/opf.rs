//! Manifest Assembler

use super::{into_string, CSS_MEDIA_TYPE, DC_NAMESPACE, NCX_MEDIA_TYPE, OPF_NAMESPACE, XHTML_MEDIA_TYPE};
use crate::assets::{FONTS_STYLESHEET, LAYOUT_STYLESHEET};
use crate::layout::{self, NCX_PATH, OEBPS_DIR};
use crate::types::{Book, ManifestItem, SpineItem};
use chrono::NaiveDate;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::collections::HashSet;
use std::io::Cursor;

const UNIQUE_IDENTIFIER: &str = "duokan-book-id";
const BODY_FONT: &str = "DK-SONGTI";

/// Every manifest entry, in package order:
/// stylesheets, documents, images, fonts, then the NCX.
pub fn manifest_items(book: &Book) -> Vec<ManifestItem> {
    let mut items = vec![
        ManifestItem::new("fonts", href(FONTS_STYLESHEET), CSS_MEDIA_TYPE),
        ManifestItem::new("style", href(LAYOUT_STYLESHEET), CSS_MEDIA_TYPE),
    ];
    items.extend(
        book.documents
            .iter()
            .map(|doc| ManifestItem::new(doc.id(), doc.href(), XHTML_MEDIA_TYPE)),
    );
    items.extend(
        book.images
            .iter()
            .map(|image| ManifestItem::new(image.id(), image.href(), image.media_type.as_str())),
    );
    items.extend(
        book.fonts
            .iter()
            .map(|font| ManifestItem::new(font.id(), font.href(), font.media_type.as_str())),
    );
    items.push(ManifestItem::new("ncx", href(NCX_PATH), NCX_MEDIA_TYPE));

    dedupe_ids(&mut items);
    items
}

/// One itemref per document, in spine order
pub fn spine_items(book: &Book) -> Vec<SpineItem> {
    book.documents
        .iter()
        .map(|doc| SpineItem {
            idref: doc.id().to_string(),
        })
        .collect()
}

fn href(path: &str) -> String {
    layout::relative_href(OEBPS_DIR, path)
}

/// Sanitized file names can meet; later items get a numeric suffix
fn dedupe_ids(items: &mut [ManifestItem]) {
    let mut seen = HashSet::new();
    for item in items.iter_mut() {
        if seen.insert(item.id.clone()) {
            continue;
        }
        let mut n = 2;
        while seen.contains(&format!("{}_{}", item.id, n)) {
            n += 1;
        }
        item.id = format!("{}_{}", item.id, n);
        seen.insert(item.id.clone());
    }
}

/// Render `content.opf` for the book
pub fn render_opf(book: &Book, modified: NaiveDate) -> Result<String, quick_xml::Error> {
    let items = manifest_items(book);
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

    let mut package = BytesStart::new("package");
    package.push_attribute(("xmlns", OPF_NAMESPACE));
    package.push_attribute(("version", "2.0"));
    package.push_attribute(("unique-identifier", UNIQUE_IDENTIFIER));
    writer.write_event(Event::Start(package))?;

    // Metadata
    let mut metadata = BytesStart::new("metadata");
    metadata.push_attribute(("xmlns:dc", DC_NAMESPACE));
    metadata.push_attribute(("xmlns:opf", OPF_NAMESPACE));
    writer.write_event(Event::Start(metadata))?;

    let meta = &book.metadata;
    write_text_element(&mut writer, BytesStart::new("dc:title"), &meta.title)?;
    if !meta.author.is_empty() {
        write_text_element(&mut writer, BytesStart::new("dc:creator"), &meta.author)?;
    }
    write_text_element(&mut writer, BytesStart::new("dc:language"), &meta.language)?;
    let mut identifier = BytesStart::new("dc:identifier");
    identifier.push_attribute(("id", UNIQUE_IDENTIFIER));
    write_text_element(&mut writer, identifier, &meta.identifier)?;

    if let Some(cover) = book
        .cover_image()
        .and_then(|image| items.iter().find(|item| item.href == image.href()))
    {
        write_meta(&mut writer, "cover", &cover.id)?;
    }
    let mut date = BytesStart::new("dc:date");
    date.push_attribute(("opf:event", "modification"));
    write_text_element(&mut writer, date, &modified.format("%Y-%m-%d").to_string())?;
    write_meta(&mut writer, "duokan-body-font", BODY_FONT)?;

    writer.write_event(Event::End(BytesEnd::new("metadata")))?;

    // Manifest
    writer.write_event(Event::Start(BytesStart::new("manifest")))?;
    for item in &items {
        let mut elem = BytesStart::new("item");
        elem.push_attribute(("id", item.id.as_str()));
        elem.push_attribute(("href", item.href.as_str()));
        elem.push_attribute(("media-type", item.media_type.as_str()));
        writer.write_event(Event::Empty(elem))?;
    }
    writer.write_event(Event::End(BytesEnd::new("manifest")))?;

    // Spine
    let mut spine = BytesStart::new("spine");
    spine.push_attribute(("toc", "ncx"));
    writer.write_event(Event::Start(spine))?;
    for item in spine_items(book) {
        let mut elem = BytesStart::new("itemref");
        elem.push_attribute(("idref", item.idref.as_str()));
        writer.write_event(Event::Empty(elem))?;
    }
    writer.write_event(Event::End(BytesEnd::new("spine")))?;

    // Guide
    if let Some(first) = book.documents.first() {
        writer.write_event(Event::Start(BytesStart::new("guide")))?;
        let mut reference = BytesStart::new("reference");
        reference.push_attribute(("type", "cover"));
        reference.push_attribute(("title", "Cover"));
        reference.push_attribute(("href", first.href().as_str()));
        writer.write_event(Event::Empty(reference))?;
        writer.write_event(Event::End(BytesEnd::new("guide")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("package")))?;

    let mut xml = into_string(writer.into_inner().into_inner());
    xml.push('\n');
    Ok(xml)
}

fn write_text_element<W: std::io::Write>(
    writer: &mut Writer<W>,
    start: BytesStart<'_>,
    content: &str,
) -> Result<(), quick_xml::Error> {
    let end = BytesEnd::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
    writer.write_event(Event::Start(start))?;
    writer.write_event(Event::Text(BytesText::new(content)))?;
    writer.write_event(Event::End(end))?;
    Ok(())
}

fn write_meta<W: std::io::Write>(writer: &mut Writer<W>, name: &str, content: &str) -> Result<(), quick_xml::Error> {
    let mut meta = BytesStart::new("meta");
    meta.push_attribute(("name", name));
    meta.push_attribute(("content", content));
    writer.write_event(Event::Empty(meta))?;
    Ok(())
}
