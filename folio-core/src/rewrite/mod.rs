//! Content document rewriting
//!
//! Rewriting is split in two so that footnote numbers and spine positions
//! can be fixed book-wide before any document is rewritten:
//!
//! 1. [`prepare`] extracts and normalizes the body and counts its footnote
//!    references. This is where a document can fail.
//! 2. [`rewrite`] is pure given its [`DocumentJob`]: it resolves footnotes,
//!    retargets links, injects tracking wrappers and renders the template.
//!    Jobs can run in any order, or in parallel, with the same result.

pub mod footnotes;
pub mod links;
pub mod template;
pub mod title;
pub mod tracking;

pub use footnotes::{FootnoteEntry, FootnotePass, FootnoteRegistry};
pub use links::LinkMap;

use crate::error::RewriteError;
use crate::markup::{Markup, ScanMode, Splice};
use crate::platform::NoteRenderer;

/// Ids of the wrapper divs the template puts around every body
const CHROME_IDS: [&str; 2] = ["book-columns", "book-inner"];

/// A document that passed scanning, ready to be numbered
#[derive(Debug, Clone)]
pub struct Prepared {
    /// Body with earlier tracking wrappers and template chrome removed
    pub body: String,
    /// Footnote references in `body`
    pub references: usize,
    pub scan_mode: ScanMode,
}

/// Decode, scan and normalize one content document
pub fn prepare(bytes: &[u8], allow_fallback: bool) -> Result<Prepared, RewriteError> {
    let source = std::str::from_utf8(bytes).map_err(|e| RewriteError::Encoding(e.to_string()))?;
    let markup =
        Markup::scan_with(source, allow_fallback).map_err(|e| RewriteError::Markup(e.to_string()))?;

    let body_range = markup
        .first("body")
        .map(|body| body.inner.clone())
        .unwrap_or(0..source.len());

    let mut splice = Splice::new(source);
    tracking::unwrap_spans(&markup, &mut splice);
    for chrome in markup.named("div").filter(|div| {
        div.attr("id")
            .map(|id| CHROME_IDS.contains(&id))
            .unwrap_or(false)
    }) {
        splice.remove(chrome.start_tag());
        splice.remove(chrome.end_tag());
    }
    let body = splice.render_range(body_range);

    let body_markup =
        Markup::scan_with(&body, allow_fallback).map_err(|e| RewriteError::Markup(e.to_string()))?;
    let references = footnotes::count_references(&body_markup);
    let scan_mode = if markup.mode() == ScanMode::Fallback || body_markup.mode() == ScanMode::Fallback {
        ScanMode::Fallback
    } else {
        ScanMode::Structured
    };

    Ok(Prepared {
        body,
        references,
        scan_mode,
    })
}

/// Book-wide inputs shared by every job
pub struct RewriteContext<'a> {
    pub renderer: &'a dyn NoteRenderer,
    pub language: &'a str,
    pub fallback_title: &'a str,
    pub links: &'a LinkMap,
    pub allow_fallback: bool,
}

/// Everything needed to rewrite one document
#[derive(Debug, Clone)]
pub struct DocumentJob<'a> {
    /// Path of the file as it was in the input package
    pub original_path: &'a str,
    /// Full source, used for the title
    pub source: &'a str,
    /// Normalized body from [`prepare`]
    pub body: &'a str,
    /// 1-based spine position
    pub sequence: usize,
    /// First footnote number reserved for this document
    pub first_footnote: u32,
}

/// Output of [`rewrite`]
#[derive(Debug, Clone)]
pub struct Rewritten {
    pub title: String,
    pub body: String,
    pub xhtml: String,
    pub footnotes: Vec<FootnoteEntry>,
    pub orphans: Vec<String>,
    pub tracking_spans: usize,
    pub links_retargeted: usize,
}

/// Rewrite one prepared document
pub fn rewrite(job: &DocumentJob<'_>, ctx: &RewriteContext<'_>) -> Rewritten {
    // Links first: rendered note references point at the note icon, which
    // must not be mistaken for a book file
    let markup = rescan(job.body, ctx.allow_fallback);
    let mut splice = Splice::new(job.body);
    let links_retargeted = links::retarget_links(&markup, &mut splice, job.original_path, ctx.links);
    let linked = splice.render();

    let markup = rescan(&linked, ctx.allow_fallback);
    let pass = footnotes::relocate(&markup, job.original_path, job.first_footnote, ctx.renderer);

    let markup = rescan(&pass.body, ctx.allow_fallback);
    let mut splice = Splice::new(&pass.body);
    let tracking_spans = tracking::wrap_paragraphs(&markup, &mut splice, job.sequence);
    let body = splice.render();

    let title = title::derive_title(job.source).unwrap_or_else(|| ctx.fallback_title.to_string());
    let xhtml = template::render_document(&title, ctx.language, &body);

    Rewritten {
        title,
        body,
        xhtml,
        footnotes: pass.entries,
        orphans: pass.orphans,
        tracking_spans,
        links_retargeted,
    }
}

/// Scan markup that already scanned once under the same policy
fn rescan(source: &str, allow_fallback: bool) -> Markup<'_> {
    if allow_fallback {
        Markup::scan_lenient(source)
    } else {
        Markup::scan(source).unwrap_or_else(|_| Markup::scan_fallback(source))
    }
}
