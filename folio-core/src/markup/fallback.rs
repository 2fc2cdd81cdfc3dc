//! Regex element scanning for markup the structured scanner rejects
//!
//! Only the elements the pipeline inspects are recognized. Tags are found
//! with a regex and paired on a stack, so same-name nesting is honored. A
//! start tag that never sees its end tag is dropped, along with any open
//! elements an outer end tag closes implicitly.

use super::{Attribute, Element};
use regex::Regex;
use std::sync::LazyLock;

/// Paired elements recognized by the fallback scanner
const PAIRED: [&str; 14] = [
    "body", "title", "h1", "a", "aside", "section", "div", "ol", "li", "p", "span", "sup", "em", "b",
];

/// Void elements recognized by the fallback scanner
const VOID: [&str; 4] = ["img", "image", "br", "hr"];

static TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<(/?)([A-Za-z][-A-Za-z0-9_:.]*)((?:"[^"]*"|'[^']*'|[^"'>])*)>"#).unwrap()
});

static ATTR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>/]+))"#).unwrap()
});

/// A start tag waiting for its end tag
struct Open {
    name: String,
    raw_name: String,
    attrs: Vec<Attribute>,
    start: usize,
    content_start: usize,
}

pub(super) fn scan(source: &str) -> Vec<Element> {
    let mut elements = Vec::new();
    let mut stack: Vec<Open> = Vec::new();

    for caps in TAG_PATTERN.captures_iter(source) {
        let (Some(whole), Some(slash), Some(name), Some(attrs)) =
            (caps.get(0), caps.get(1), caps.get(2), caps.get(3))
        else {
            continue;
        };
        let lower = name.as_str().to_ascii_lowercase();
        let attr_text = attrs.as_str();

        if VOID.contains(&lower.as_str()) {
            if slash.as_str().is_empty() {
                elements.push(Element {
                    name: lower,
                    raw_name: name.as_str().to_string(),
                    attrs: parse_attributes(attr_text.trim_end_matches('/')),
                    outer: whole.range(),
                    inner: whole.end()..whole.end(),
                    has_child_elements: false,
                    self_closing: true,
                });
            }
            continue;
        }
        if !PAIRED.contains(&lower.as_str()) {
            continue;
        }

        if slash.as_str().is_empty() {
            // `<p/>` has no content to index
            if attr_text.trim_end().ends_with('/') {
                continue;
            }
            stack.push(Open {
                name: lower,
                raw_name: name.as_str().to_string(),
                attrs: parse_attributes(attr_text),
                start: whole.start(),
                content_start: whole.end(),
            });
        } else if let Some(depth) = stack.iter().rposition(|open| open.name == lower) {
            stack.truncate(depth + 1);
            if let Some(open) = stack.pop() {
                elements.push(Element {
                    name: open.name,
                    raw_name: open.raw_name,
                    attrs: open.attrs,
                    outer: open.start..whole.end(),
                    inner: open.content_start..whole.start(),
                    has_child_elements: false,
                    self_closing: false,
                });
            }
        }
    }

    elements.sort_by(|a, b| {
        a.outer
            .start
            .cmp(&b.outer.start)
            .then(b.outer.end.cmp(&a.outer.end))
    });

    let starts: Vec<usize> = elements.iter().map(|e| e.outer.start).collect();
    for element in elements.iter_mut().filter(|e| !e.self_closing) {
        let inner = element.inner.clone();
        element.has_child_elements = starts.iter().any(|s| inner.contains(s))
            || source[inner].contains('<');
    }

    elements
}

fn parse_attributes(text: &str) -> Vec<Attribute> {
    ATTR_PATTERN
        .captures_iter(text)
        .filter_map(|caps| {
            let key = caps.get(1)?.as_str().to_string();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            Some(Attribute { key, value })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_quoting_styles() {
        let attrs = parse_attributes(r#" id="a" class='b c' data-x=plain"#);
        let pairs: Vec<_> = attrs.iter().map(|a| (a.key.as_str(), a.value.as_str())).collect();
        assert_eq!(pairs, vec![("id", "a"), ("class", "b c"), ("data-x", "plain")]);
    }

    #[test]
    fn test_self_closing_paired_tag_is_skipped() {
        let elements = scan("<p/><p>real</p>");
        let paragraphs: Vec<_> = elements.iter().filter(|e| e.name == "p").collect();
        assert_eq!(paragraphs.len(), 1);
        assert_eq!(paragraphs[0].outer, 4..15);
    }

    #[test]
    fn test_prefix_names_do_not_match() {
        let elements = scan("<pre>x</pre><abbr>y</abbr><aside>z</aside>");
        let names: Vec<_> = elements.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["aside"]);
    }

    #[test]
    fn test_same_name_nesting_pairs_by_depth() {
        let source = r#"<div id="outer"><div id="inner"><p>x</p></div></div>"#;
        let elements = scan(source);
        let divs: Vec<_> = elements.iter().filter(|e| e.name == "div").collect();
        assert_eq!(divs.len(), 2);
        assert_eq!(divs[0].attr("id"), Some("outer"));
        assert_eq!(divs[0].outer, 0..source.len());
        assert_eq!(divs[1].attr("id"), Some("inner"));
        assert_eq!(&source[divs[1].inner.clone()], "<p>x</p>");
    }

    #[test]
    fn test_unclosed_start_tags_are_dropped() {
        let elements = scan("<div><p>one<p>two</p></div><span>open");
        let names: Vec<_> = elements.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["div", "p"]);
        assert_eq!(elements[1].outer, 11..21);
    }

    #[test]
    fn test_quoted_angle_bracket_stays_in_attribute() {
        let elements = scan(r#"<a title="a > b" href="x.html">link</a>"#);
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].attr("title"), Some("a > b"));
        assert_eq!(elements[0].attr("href"), Some("x.html"));
    }

    #[test]
    fn test_child_detection_tolerates_stray_brackets() {
        let elements = scan("<p>1 < 2</p><p>plain</p>");
        assert!(elements[0].has_child_elements);
        assert!(!elements[1].has_child_elements);
    }
}
