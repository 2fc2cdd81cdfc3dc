//! Reference retargeting
//!
//! Documents move into `OEBPS/Text/` and most files are renamed, so every
//! relative `href`, `src` and `xlink:href` is resolved against the
//! document's original location and pointed at the file's final path.

use crate::layout::{self, TEXT_DIR};
use crate::markup::{Markup, Splice};
use std::collections::HashMap;

/// Attributes that carry references to other files
const LINK_ATTRIBUTES: [&str; 3] = ["href", "src", "xlink:href"];

/// Original tree path to final tree path, for every file in the output
#[derive(Debug, Clone, Default)]
pub struct LinkMap {
    targets: HashMap<String, String>,
}

impl LinkMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, original: impl Into<String>, target: impl Into<String>) {
        self.targets.insert(original.into(), target.into());
    }

    pub fn get(&self, original: &str) -> Option<&str> {
        self.targets.get(original).map(String::as_str)
    }

    /// New value for a link found in the document originally at `base`
    pub fn retarget(&self, base: &str, href: &str) -> Option<String> {
        let target = self.get(&layout::resolve_href(base, href)?)?;
        let mut new_href = layout::relative_href(TEXT_DIR, target);
        if let Some((_, fragment)) = href.split_once('#') {
            new_href.push('#');
            new_href.push_str(fragment);
        }
        (new_href != href).then_some(new_href)
    }
}

/// Queue start-tag rewrites for every link that moved.
///
/// Returns the number of elements rewritten.
pub fn retarget_links(markup: &Markup<'_>, splice: &mut Splice<'_>, base: &str, links: &LinkMap) -> usize {
    let mut count = 0;
    for element in markup.elements() {
        let updates: Vec<(&str, String)> = element
            .attrs
            .iter()
            .filter(|a| LINK_ATTRIBUTES.iter().any(|k| a.key.eq_ignore_ascii_case(k)))
            .filter_map(|a| Some((a.key.as_str(), links.retarget(base, &a.value)?)))
            .collect();
        if updates.is_empty() {
            continue;
        }

        let overrides: Vec<(&str, &str)> = updates.iter().map(|(k, v)| (*k, v.as_str())).collect();
        splice.replace(element.start_tag(), element.render_start_tag(&overrides));
        count += 1;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn links() -> LinkMap {
        let mut map = LinkMap::new();
        map.insert("OPS/text/ch 1.xhtml", "OEBPS/Text/f0.xhtml");
        map.insert("OPS/text/ch2.xhtml", "OEBPS/Text/f1.xhtml");
        map.insert("OPS/images/Cover.JPEG", "OEBPS/Images/f2.jpg");
        map
    }

    #[test]
    fn test_retarget_keeps_fragment() {
        let map = links();
        assert_eq!(
            map.retarget("OPS/text/ch%201.xhtml", "ch2.xhtml#sec").as_deref(),
            Some("f1.xhtml#sec")
        );
        assert_eq!(
            map.retarget("OPS/text/ch2.xhtml", "ch%201.xhtml").as_deref(),
            Some("f0.xhtml")
        );
        assert_eq!(map.retarget("OPS/text/ch2.xhtml", "#local"), None);
        assert_eq!(map.retarget("OPS/text/ch2.xhtml", "https://example.com/ch2.xhtml"), None);
        assert_eq!(map.retarget("OPS/text/ch2.xhtml", "missing.xhtml"), None);
    }

    #[test]
    fn test_unchanged_link_is_not_rewritten() {
        let mut map = LinkMap::new();
        map.insert("OEBPS/Images/f2.jpg", "OEBPS/Images/f2.jpg");
        assert_eq!(map.retarget("OEBPS/Text/f0.xhtml", "../Images/f2.jpg"), None);
    }

    #[test]
    fn test_retarget_links_rewrites_start_tags() {
        let body = r#"<p><a href="ch2.xhtml#n">next</a><img alt="c" src="../images/Cover.JPEG"/></p><svg><image xlink:href="../images/Cover.JPEG"/></svg>"#;
        let markup = Markup::scan(body).unwrap();
        let mut splice = Splice::new(body);

        let count = retarget_links(&markup, &mut splice, "OPS/text/ch 1.xhtml", &links());
        assert_eq!(count, 3);
        assert_eq!(
            splice.render(),
            r#"<p><a href="f1.xhtml#n">next</a><img alt="c" src="../Images/f2.jpg"/></p><svg><image xlink:href="../Images/f2.jpg"/></svg>"#
        );
    }
}
