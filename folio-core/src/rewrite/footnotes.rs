//! Footnote resolution
//!
//! References (`<a epub:type="noteref" href="#id">`) are replaced by the
//! platform's popup anchor and numbered from a book-wide sequence.
//! Definitions (any element whose `epub:type` holds `footnote`) are removed
//! from the flow; their content is re-emitted as popups at the end of the
//! body. Only references and definitions in the same document are paired.

use crate::markup::{Element, Markup, Splice};
use crate::platform::{NoteRenderer, POPUP_ITEM_CLASSES};
use serde::Serialize;
use std::collections::HashMap;

/// One footnote reference and, once found, its relocated content
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FootnoteEntry {
    /// Book-wide sequence number
    pub number: u32,
    /// Id of the popup (`B_<n>`)
    pub generated_id: String,
    /// Id of the reference anchor (`A_<n>`)
    pub anchor_id: String,
    /// Source document the reference was found in
    pub document: String,
    /// Target id of the original reference
    pub original_id: String,
    /// Markup that replaced the original reference
    #[serde(skip)]
    pub reference_markup: String,
    /// Definition content; `None` while unresolved
    #[serde(skip)]
    pub content: Option<String>,
}

impl FootnoteEntry {
    pub fn new(number: u32, document: impl Into<String>, original_id: impl Into<String>) -> Self {
        Self {
            number,
            generated_id: format!("B_{number}"),
            anchor_id: format!("A_{number}"),
            document: document.into(),
            original_id: original_id.into(),
            reference_markup: String::new(),
            content: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.content.is_some()
    }
}

/// Every footnote entry of a run, in number order
#[derive(Debug, Clone, Default)]
pub struct FootnoteRegistry {
    entries: Vec<FootnoteEntry>,
}

impl FootnoteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one document's entries
    pub fn extend(&mut self, entries: impl IntoIterator<Item = FootnoteEntry>) {
        self.entries.extend(entries);
        self.entries.sort_by_key(|e| e.number);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn resolved(&self) -> impl Iterator<Item = &FootnoteEntry> {
        self.entries.iter().filter(|e| e.is_resolved())
    }

    pub fn unresolved(&self) -> impl Iterator<Item = &FootnoteEntry> {
        self.entries.iter().filter(|e| !e.is_resolved())
    }
}

/// Result of resolving one document's footnotes
#[derive(Debug, Clone)]
pub struct FootnotePass {
    /// Body with references replaced, definitions removed and popups appended
    pub body: String,
    /// Entries allocated for this document, in reference order
    pub entries: Vec<FootnoteEntry>,
    /// Ids of definitions no reference pointed at
    pub orphans: Vec<String>,
}

/// Whether an element is a footnote reference
pub(crate) fn is_reference(element: &Element) -> bool {
    element.name == "a"
        && element.has_token("epub:type", "noteref")
        && element
            .attr("href")
            .map(|h| h.starts_with('#') && h.len() > 1)
            .unwrap_or(false)
}

fn is_definition(element: &Element) -> bool {
    element.has_token("epub:type", "footnote")
        && element.attr("id").map(|id| !id.is_empty()).unwrap_or(false)
}

/// Number of references a body holds; the number of ids [`relocate`] will consume
pub fn count_references(markup: &Markup<'_>) -> usize {
    markup.elements().iter().filter(|e| is_reference(e)).count()
}

/// Resolve the footnotes of one body, numbering from `first_number`
pub fn relocate(
    markup: &Markup<'_>,
    document: &str,
    first_number: u32,
    renderer: &dyn NoteRenderer,
) -> FootnotePass {
    let mut splice = Splice::new(markup.source());

    // Outermost definitions only; a popup wrapper may itself carry the token
    let mut definitions: Vec<&Element> = Vec::new();
    for element in markup.elements().iter().filter(|e| is_definition(e)) {
        if !definitions.iter().any(|d| d.contains(element)) {
            definitions.push(element);
        }
    }

    let mut entries = Vec::new();
    let mut anchors: HashMap<String, String> = HashMap::new();
    for (offset, reference) in markup
        .elements()
        .iter()
        .filter(|e| is_reference(e))
        .enumerate()
    {
        let target = reference
            .attr("href")
            .map(|h| h.trim_start_matches('#'))
            .unwrap_or_default();
        let mut entry = FootnoteEntry::new(first_number + offset as u32, document, target);
        entry.reference_markup = renderer.reference(&entry);
        splice.replace(reference.outer.clone(), entry.reference_markup.clone());

        if let Some(id) = reference.attr("id") {
            anchors.insert(id.to_string(), entry.anchor_id.clone());
        }
        entries.push(entry);
    }

    // Backlinks inside definitions follow the reference to its new anchor
    for link in markup.named("a") {
        if is_reference(link) || !definitions.iter().any(|d| d.contains(link)) {
            continue;
        }
        let Some(anchor) = link
            .attr("href")
            .and_then(|h| h.strip_prefix('#'))
            .and_then(|id| anchors.get(id))
        else {
            continue;
        };
        splice.replace(link.start_tag(), link.start_tag_with("href", &format!("#{anchor}")));
    }

    let mut orphans = Vec::new();
    for definition in &definitions {
        let id = definition.attr("id").unwrap_or_default();
        let content_range = markup
            .elements()
            .iter()
            .find(|e| {
                definition.contains(e)
                    && POPUP_ITEM_CLASSES.iter().any(|class| e.has_token("class", class))
            })
            .map(|item| item.inner.clone())
            .unwrap_or_else(|| definition.inner.clone());
        let content = splice.render_range(content_range).trim().to_string();

        let mut matched = false;
        for entry in entries.iter_mut().filter(|e| e.original_id == id) {
            entry.content = Some(content.clone());
            matched = true;
        }
        if !matched {
            orphans.push(id.to_string());
        }
        splice.remove(definition.outer.clone());
    }

    let mut body = splice.render();
    let popups: Vec<String> = entries
        .iter()
        .filter_map(|e| e.content.as_deref().map(|c| renderer.popup(e, c)))
        .collect();
    if !popups.is_empty() {
        let trimmed = body.trim_end().len();
        body.truncate(trimmed);
        for popup in popups {
            body.push('\n');
            body.push_str(&popup);
        }
        body.push('\n');
    }

    FootnotePass {
        body,
        entries,
        orphans,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::Platform;

    fn run(body: &str, platform: Platform, first: u32) -> FootnotePass {
        let markup = Markup::scan(body).unwrap();
        relocate(&markup, "ch1.xhtml", first, platform.renderer())
    }

    #[test]
    fn test_single_pair_icon_platform() {
        let body = r##"<p>Text<a epub:type="noteref" href="#n1" id="r1">1</a>.</p>
<aside epub:type="footnote" id="n1"><p>The note.</p></aside>"##;
        let pass = run(body, Platform::Duokan, 1);

        assert_eq!(pass.entries.len(), 1);
        assert!(pass.orphans.is_empty());
        let entry = &pass.entries[0];
        assert_eq!(entry.generated_id, "B_1");
        assert_eq!(entry.content.as_deref(), Some("<p>The note.</p>"));

        assert!(pass.body.starts_with(r##"<p>Text<a style="text-decoration:none!important;color:black;" class="duokan-footnote" epub:type="noteref" href="#B_1" id="A_1">"##));
        assert_eq!(pass.body.matches("The note.").count(), 1);
        assert!(pass.body.contains(r#"<li class="duokan-footnote-item"><p>The note.</p></li>"#));
        assert!(!pass.body.contains(r#"id="n1""#));
    }

    #[test]
    fn test_numbering_continues_from_first_number() {
        let body = r##"<p><a epub:type="noteref" href="#a">1</a><a epub:type="noteref" href="#b">2</a></p>
<aside epub:type="footnote" id="a">A</aside><aside epub:type="footnote" id="b">B</aside>"##;
        let pass = run(body, Platform::Kindle, 7);

        let ids: Vec<_> = pass.entries.iter().map(|e| e.generated_id.as_str()).collect();
        assert_eq!(ids, vec!["B_7", "B_8"]);
        assert_eq!(pass.entries.len(), 2);
        assert!(pass.body.contains("<sup>7</sup>"));
        assert!(pass.body.contains("<sup>8</sup>"));
        assert!(pass.body.contains(r#"<div class="footnote-item">B</div>"#));
    }

    #[test]
    fn test_unresolved_reference_and_orphan_definition() {
        let body = r##"<p><a epub:type="noteref" href="#missing">1</a></p>
<aside epub:type="footnote" id="lonely"><p>Nobody points here.</p></aside>"##;
        let pass = run(body, Platform::Generic, 1);

        assert_eq!(pass.entries.len(), 1);
        assert!(!pass.entries[0].is_resolved());
        assert_eq!(pass.orphans, vec!["lonely".to_string()]);
        assert!(!pass.body.contains("Nobody points here."));
        assert!(!pass.body.contains("<aside"));
    }

    #[test]
    fn test_backlink_follows_reference() {
        let body = r##"<p><a epub:type="noteref" href="#n1" id="ref1">1</a></p>
<aside epub:type="footnote" id="n1"><a href="#ref1">^</a> Note</aside>"##;
        let pass = run(body, Platform::Generic, 4);
        assert!(pass.body.contains(r##"<a href="#A_4">^</a> Note"##));
    }

    #[test]
    fn test_previous_output_is_renumbered() {
        let first = run(
            r##"<p>x<a epub:type="noteref" href="#n1">1</a></p><aside epub:type="footnote" id="n1">Body</aside>"##,
            Platform::Duokan,
            1,
        );
        let second = run(&first.body, Platform::Duokan, 1);

        assert_eq!(second.entries.len(), 1);
        assert_eq!(second.entries[0].original_id, "B_1");
        assert_eq!(second.entries[0].content.as_deref(), Some("Body"));
        assert_eq!(second.body, first.body);
    }

    #[test]
    fn test_count_matches_allocation() {
        let body = r##"<a epub:type="noteref" href="#x">1</a><a href="#y">plain</a><a epub:type="noteref" href="#">bad</a>"##;
        let markup = Markup::scan(body).unwrap();
        assert_eq!(count_references(&markup), 1);
        assert_eq!(relocate(&markup, "d", 1, Platform::Generic.renderer()).entries.len(), 1);
    }

    #[test]
    fn test_fallback_scanner_resolves_same_fixture() {
        let body = r##"<p>1 < 2<a epub:type="noteref" href="#n1">1</a></p>
<aside epub:type="footnote" id="n1"><p>Note</p></aside>"##;
        let markup = Markup::scan_lenient(body);
        let pass = relocate(&markup, "ch1.xhtml", 1, Platform::Kindle.renderer());
        assert!(pass.entries[0].is_resolved());
        assert!(pass.body.contains(r#"<div class="footnote-item"><p>Note</p></div>"#));
    }
}
