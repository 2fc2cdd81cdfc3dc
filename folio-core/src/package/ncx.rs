//! Navigation Assembler

use super::{into_string, NCX_NAMESPACE};
use crate::types::{Book, NavPoint};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;

const NCX_DOCTYPE: &str =
    r#"ncx PUBLIC "-//NISO//DTD ncx 2005-1//EN" "http://www.daisy.org/z3986/2005/ncx-2005-1.dtd""#;

/// One navPoint per document, in spine order
pub fn nav_points(book: &Book) -> Vec<NavPoint> {
    book.documents
        .iter()
        .enumerate()
        .map(|(i, doc)| {
            let order = i + 1;
            let label = if doc.title.trim().is_empty() {
                format!("Chapter {order}")
            } else {
                doc.title.clone()
            };
            NavPoint {
                id: format!("navPoint-{order}"),
                play_order: order,
                label,
                href: doc.href(),
            }
        })
        .collect()
}

/// Render `toc.ncx` for the book
pub fn render_ncx(book: &Book) -> Result<String, quick_xml::Error> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    writer.write_event(Event::DocType(BytesText::from_escaped(NCX_DOCTYPE)))?;

    let mut ncx = BytesStart::new("ncx");
    ncx.push_attribute(("xmlns", NCX_NAMESPACE));
    ncx.push_attribute(("version", "2005-1"));
    writer.write_event(Event::Start(ncx))?;

    writer.write_event(Event::Start(BytesStart::new("head")))?;
    for (name, content) in [
        ("dtb:uid", book.metadata.identifier.as_str()),
        ("dtb:depth", "1"),
        ("dtb:totalPageCount", "0"),
        ("dtb:maxPageNumber", "0"),
    ] {
        let mut meta = BytesStart::new("meta");
        meta.push_attribute(("name", name));
        meta.push_attribute(("content", content));
        writer.write_event(Event::Empty(meta))?;
    }
    writer.write_event(Event::End(BytesEnd::new("head")))?;

    writer.write_event(Event::Start(BytesStart::new("docTitle")))?;
    write_text(&mut writer, &book.metadata.title)?;
    writer.write_event(Event::End(BytesEnd::new("docTitle")))?;

    writer.write_event(Event::Start(BytesStart::new("navMap")))?;
    for point in nav_points(book) {
        let mut elem = BytesStart::new("navPoint");
        elem.push_attribute(("id", point.id.as_str()));
        elem.push_attribute(("playOrder", point.play_order.to_string().as_str()));
        writer.write_event(Event::Start(elem))?;

        writer.write_event(Event::Start(BytesStart::new("navLabel")))?;
        write_text(&mut writer, &point.label)?;
        writer.write_event(Event::End(BytesEnd::new("navLabel")))?;

        let mut content = BytesStart::new("content");
        content.push_attribute(("src", point.href.as_str()));
        writer.write_event(Event::Empty(content))?;

        writer.write_event(Event::End(BytesEnd::new("navPoint")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("navMap")))?;

    writer.write_event(Event::End(BytesEnd::new("ncx")))?;

    let mut xml = into_string(writer.into_inner().into_inner());
    xml.push('\n');
    Ok(xml)
}

fn write_text<W: std::io::Write>(writer: &mut Writer<W>, content: &str) -> Result<(), quick_xml::Error> {
    writer.write_event(Event::Start(BytesStart::new("text")))?;
    writer.write_event(Event::Text(BytesText::new(content)))?;
    writer.write_event(Event::End(BytesEnd::new("text")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Document;
    use proptest::prelude::*;

    fn book_with_titles(titles: &[&str]) -> Book {
        let mut book = Book::default();
        book.metadata.title = "Book".into();
        for (i, title) in titles.iter().enumerate() {
            book.add_document(Document {
                original_name: format!("c{i}.html"),
                canonical_name: Document::canonical_name_for(i),
                title: title.to_string(),
                raw_body: String::new(),
                rewritten_body: String::new(),
                tracking_spans: 0,
            });
        }
        book
    }

    #[test]
    fn test_labels_fall_back_to_position() {
        let points = nav_points(&book_with_titles(&["Prologue", "", "Chapter"]));
        let labels: Vec<_> = points.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["Prologue", "Chapter 2", "Chapter"]);
        assert_eq!(points[1].id, "navPoint-2");
        assert_eq!(points[2].href, "Text/f2.xhtml");
    }

    #[test]
    fn test_render_ncx() {
        let xml = render_ncx(&book_with_titles(&["One & Two"])).unwrap();
        assert!(xml.contains(r#"<!DOCTYPE ncx PUBLIC "-//NISO//DTD ncx 2005-1//EN""#));
        assert!(xml.contains(r#"<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">"#));
        assert!(xml.contains(r#"<meta name="dtb:uid" content="1212"/>"#));
        assert!(xml.contains(r#"<navPoint id="navPoint-1" playOrder="1">"#));
        assert!(xml.contains("<text>One &amp; Two</text>"));
        assert!(xml.contains(r#"<content src="Text/f0.xhtml"/>"#));
    }

    proptest! {
        #[test]
        fn play_order_is_dense(titles in prop::collection::vec("[a-z ]{0,8}", 0..40)) {
            let refs: Vec<&str> = titles.iter().map(String::as_str).collect();
            let points = nav_points(&book_with_titles(&refs));
            prop_assert_eq!(points.len(), titles.len());
            for (i, point) in points.iter().enumerate() {
                prop_assert_eq!(point.play_order, i + 1);
                prop_assert_eq!(&point.href, &format!("Text/f{i}.xhtml"));
                prop_assert!(!point.label.trim().is_empty());
            }
        }
    }
}
