//! Reading-position tracking wrappers
//!
//! Every plain-text paragraph gets its text wrapped in
//! `<span class="koboSpan" id="kobo.D.S">`, where `D` is the document's
//! spine position (1-based) and `S` counts wrapped paragraphs from 1 within
//! the document. Paragraphs holding any element are left alone.

use crate::markup::{Markup, Splice};

/// Class of the tracking wrapper
pub const TRACKING_CLASS: &str = "koboSpan";

/// Tracking id for a document and span sequence
pub fn tracking_id(document: usize, span: usize) -> String {
    format!("kobo.{}.{}", document, span)
}

/// Queue wrapper insertions for every eligible paragraph.
///
/// Returns the number of wrappers added.
pub fn wrap_paragraphs(markup: &Markup<'_>, splice: &mut Splice<'_>, document: usize) -> usize {
    let mut span = 0;
    for paragraph in markup.named("p") {
        if paragraph.self_closing || paragraph.has_child_elements {
            continue;
        }
        let text = markup.inner(paragraph);
        if text.trim().is_empty() || text.contains(TRACKING_CLASS) {
            continue;
        }

        span += 1;
        splice.insert(
            paragraph.inner.start,
            format!(
                r#"<span class="{}" id="{}">"#,
                TRACKING_CLASS,
                tracking_id(document, span)
            ),
        );
        splice.insert(paragraph.inner.end, "</span>");
    }
    span
}

/// Queue removal of existing tracking wrappers, keeping their content
pub fn unwrap_spans(markup: &Markup<'_>, splice: &mut Splice<'_>) -> usize {
    let mut count = 0;
    for span in markup
        .named("span")
        .filter(|s| s.has_token("class", TRACKING_CLASS))
    {
        splice.remove(span.start_tag());
        splice.remove(span.end_tag());
        count += 1;
    }
    count
}
