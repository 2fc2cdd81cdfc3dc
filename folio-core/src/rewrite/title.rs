//! Document title derivation

use scraper::{Html, Node};

/// First level-1 heading, else the `<title>` element, else `None`.
///
/// Text is taken with tags stripped and whitespace collapsed; an empty
/// heading does not count.
pub fn derive_title(source: &str) -> Option<String> {
    let document = Html::parse_document(source);
    find_text(&document, "h1").or_else(|| find_text(&document, "title"))
}

fn find_text(document: &Html, name: &str) -> Option<String> {
    document
        .tree
        .root()
        .descendants()
        .filter(|node| {
            node.value()
                .as_element()
                .map(|el| el.name() == name)
                .unwrap_or(false)
        })
        .map(get_text_content)
        .find(|text| !text.is_empty())
}

fn get_text_content(node: ego_tree::NodeRef<Node>) -> String {
    let mut text = String::new();
    for descendant in node.descendants() {
        if let Node::Text(t) = descendant.value() {
            text.push_str(t);
        }
    }
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_wins_over_title() {
        let html = "<html><head><title>Head</title></head><body><h1>Chapter <em>One</em>\n</h1></body></html>";
        assert_eq!(derive_title(html).as_deref(), Some("Chapter One"));
    }

    #[test]
    fn test_title_element_fallback() {
        let html = "<html><head><title> Only title </title></head><body><h1> </h1><p>x</p></body></html>";
        assert_eq!(derive_title(html).as_deref(), Some("Only title"));
    }

    #[test]
    fn test_no_title() {
        assert_eq!(derive_title("<p>just text</p>"), None);
    }

    #[test]
    fn test_xhtml_with_declaration() {
        let html = r#"<?xml version="1.0" encoding="utf-8"?>
<html xmlns="http://www.w3.org/1999/xhtml"><head><title>序章</title></head><body><p>a</p></body></html>"#;
        assert_eq!(derive_title(html).as_deref(), Some("序章"));
    }
}
