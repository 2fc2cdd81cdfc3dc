//! Target reading platforms and their footnote conventions
//!
//! Every platform renders footnotes as popups: the reference becomes an
//! anchor pointing at `#B_<n>` with id `A_<n>`, and the definition moves to
//! an `<aside epub:type="footnote">` at the end of the document. The two
//! families differ in how the reference looks and how the popup body is
//! wrapped.

use crate::rewrite::footnotes::FootnoteEntry;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Path of the note icon, relative to a content document
pub const NOTE_ICON_HREF: &str = "../Images/footnote.png";

/// Target platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Any reader; superscript references
    #[default]
    Generic,
    /// Duokan; icon popups
    Duokan,
    /// Zhangyue (iReader); icon popups
    Zhangyue,
    /// Send to Kindle; superscript references
    Kindle,
}

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::Generic,
        Platform::Duokan,
        Platform::Zhangyue,
        Platform::Kindle,
    ];

    /// Name used on the command line and in config files
    pub fn name(&self) -> &'static str {
        match self {
            Platform::Generic => "generic",
            Platform::Duokan => "duokan",
            Platform::Zhangyue => "zhangyue",
            Platform::Kindle => "kindle",
        }
    }

    /// Footnote rendering strategy for this platform
    pub fn renderer(&self) -> &'static dyn NoteRenderer {
        match self {
            Platform::Duokan | Platform::Zhangyue => &IconPopup,
            Platform::Generic | Platform::Kindle => &Superscript,
        }
    }

    /// Whether references on this platform need the note icon image
    pub fn uses_note_icon(&self) -> bool {
        self.renderer().needs_icon()
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown platform '{s}'"))
    }
}

/// Renders footnote references and relocated footnote bodies.
pub trait NoteRenderer: Send + Sync {
    /// Markup that replaces the original reference element
    fn reference(&self, entry: &FootnoteEntry) -> String;

    /// Popup wrapper for a resolved footnote's content
    fn popup(&self, entry: &FootnoteEntry, content: &str) -> String;

    /// Whether `reference` points at the note icon image
    fn needs_icon(&self) -> bool {
        false
    }
}

/// Image-icon references with Duokan's list-style popup body
pub struct IconPopup;

impl NoteRenderer for IconPopup {
    fn reference(&self, entry: &FootnoteEntry) -> String {
        format!(
            r##"<a style="text-decoration:none!important;color:black;" class="duokan-footnote" epub:type="noteref" href="#{}" id="{}"><img alt="note" src="{}"/></a>"##,
            entry.generated_id, entry.anchor_id, NOTE_ICON_HREF
        )
    }

    fn popup(&self, entry: &FootnoteEntry, content: &str) -> String {
        format!(
            r#"<aside epub:type="footnote" id="{}"><ol class="duokan-footnote-content"><li class="duokan-footnote-item">{}</li></ol></aside>"#,
            entry.generated_id, content
        )
    }

    fn needs_icon(&self) -> bool {
        true
    }
}

/// Superscript numeral references
pub struct Superscript;

impl NoteRenderer for Superscript {
    fn reference(&self, entry: &FootnoteEntry) -> String {
        format!(
            r##"<a class="duokan-footnote" epub:type="noteref" href="#{}" id="{}"><sup>{}</sup></a>"##,
            entry.generated_id, entry.anchor_id, entry.number
        )
    }

    fn popup(&self, entry: &FootnoteEntry, content: &str) -> String {
        format!(
            r#"<aside epub:type="footnote" id="{}"><div class="footnote-item">{}</div></aside>"#,
            entry.generated_id, content
        )
    }
}

/// Classes marking the popup body of a previous run's output
pub(crate) const POPUP_ITEM_CLASSES: [&str; 2] = ["duokan-footnote-item", "footnote-item"];
