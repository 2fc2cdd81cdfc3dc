//! Tolerant element scanning on top of `quick-xml`

use super::{Attribute, Element, ScanError};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Elements that never have content in HTML, even without `/>`
const VOID_ELEMENTS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

pub(super) fn scan(source: &str) -> Result<Vec<Element>, ScanError> {
    let mut reader = Reader::from_str(source);
    reader.config_mut().trim_text(false);
    reader.config_mut().check_end_names = false;
    reader.config_mut().allow_unmatched_ends = true;

    let mut elements: Vec<Element> = Vec::new();
    let mut open: Vec<usize> = Vec::new();

    loop {
        let start = reader.buffer_position() as usize;
        let event = reader.read_event().map_err(|e| ScanError {
            position: reader.buffer_position() as usize,
            message: e.to_string(),
        })?;
        let end = reader.buffer_position() as usize;

        match event {
            Event::Start(e) => {
                let element = open_element(&e, start, end, false)?;
                if let Some(&parent) = open.last() {
                    elements[parent].has_child_elements = true;
                }
                let void = element.self_closing;
                elements.push(element);
                if !void {
                    open.push(elements.len() - 1);
                }
            }
            Event::Empty(e) => {
                let element = open_element(&e, start, end, true)?;
                if let Some(&parent) = open.last() {
                    elements[parent].has_child_elements = true;
                }
                elements.push(element);
            }
            Event::End(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase();
                let Some(depth) = open.iter().rposition(|&i| elements[i].name == name) else {
                    // stray end tag with nothing to close
                    continue;
                };
                for index in open.drain(depth + 1..).rev() {
                    close(&mut elements[index], start, start);
                }
                if let Some(index) = open.pop() {
                    close(&mut elements[index], start, end);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    for index in open.into_iter().rev() {
        close(&mut elements[index], source.len(), source.len());
    }
    Ok(elements)
}

fn close(element: &mut Element, inner_end: usize, outer_end: usize) {
    element.inner.end = inner_end.max(element.inner.start);
    element.outer.end = outer_end.max(element.inner.end);
}

fn open_element(
    tag: &BytesStart<'_>,
    start: usize,
    end: usize,
    empty: bool,
) -> Result<Element, ScanError> {
    let raw_name = String::from_utf8_lossy(tag.name().as_ref()).into_owned();
    let valid = raw_name
        .chars()
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);
    if !valid || raw_name.contains('<') {
        return Err(ScanError {
            position: start,
            message: format!("malformed start tag '{}'", raw_name),
        });
    }

    let mut attrs = Vec::new();
    for attr in tag.html_attributes().with_checks(false) {
        let attr = attr.map_err(|e| ScanError {
            position: start,
            message: e.to_string(),
        })?;
        attrs.push(Attribute {
            key: String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
            value: String::from_utf8_lossy(&attr.value).into_owned(),
        });
    }

    let name = raw_name.to_ascii_lowercase();
    let self_closing = empty || VOID_ELEMENTS.contains(&name.as_str());
    Ok(Element {
        name,
        raw_name,
        attrs,
        outer: start..end,
        inner: end..end,
        has_child_elements: false,
        self_closing,
    })
}
