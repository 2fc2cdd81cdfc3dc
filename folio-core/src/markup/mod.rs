//! Span-preserving markup scanning
//!
//! Content documents are rewritten by substituting byte ranges of the
//! original text rather than by re-serializing a DOM, so everything the
//! pipeline does not touch survives byte for byte. [`Markup`] locates
//! elements with their outer and inner ranges; [`Splice`] applies
//! non-overlapping replacements.
//!
//! Scanning first tries a tolerant tokenizer built on `quick-xml`. Input it
//! rejects (stray `<` in text, broken comments) goes through a regex scanner
//! that recognizes only the elements the pipeline cares about.

mod fallback;
mod splice;
mod structured;

pub use splice::Splice;

use std::ops::Range;

/// How a [`Markup`] index was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    Structured,
    Fallback,
}

/// Why structured scanning gave up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanError {
    pub position: usize,
    pub message: String,
}

impl std::fmt::Display for ScanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at byte {}", self.message, self.position)
    }
}

impl std::error::Error for ScanError {}

/// An attribute as written in the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub key: String,
    pub value: String,
}

/// One element located in the source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Lowercased qualified name, used for matching
    pub name: String,
    /// Name as written, used when the start tag is rebuilt
    pub raw_name: String,
    pub attrs: Vec<Attribute>,
    /// From `<` of the start tag to `>` of the end tag
    pub outer: Range<usize>,
    /// Content between the tags (empty for void elements)
    pub inner: Range<usize>,
    /// Whether any element starts inside this one
    pub has_child_elements: bool,
    /// `<br/>`-style or HTML void element
    pub self_closing: bool,
}

impl Element {
    /// Attribute value by case-insensitive key
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.key.eq_ignore_ascii_case(key))
            .map(|a| a.value.as_str())
    }

    /// Whether a whitespace-separated attribute (`class`, `epub:type`) holds `token`
    pub fn has_token(&self, key: &str, token: &str) -> bool {
        self.attr(key)
            .map(|v| v.split_whitespace().any(|t| t == token))
            .unwrap_or(false)
    }

    /// Range of the start tag
    pub fn start_tag(&self) -> Range<usize> {
        if self.self_closing {
            self.outer.clone()
        } else {
            self.outer.start..self.inner.start
        }
    }

    /// Range of the end tag (empty for void elements or implied ends)
    pub fn end_tag(&self) -> Range<usize> {
        if self.self_closing {
            self.outer.end..self.outer.end
        } else {
            self.inner.end..self.outer.end
        }
    }

    /// Whether `other` lies entirely inside this element
    pub fn contains(&self, other: &Element) -> bool {
        self.outer.start <= other.outer.start
            && other.outer.end <= self.outer.end
            && self.outer != other.outer
    }

    /// Render the start tag with one attribute replaced
    pub fn start_tag_with(&self, key: &str, value: &str) -> String {
        self.render_start_tag(&[(key, value)])
    }

    /// Render the start tag, substituting the values of existing attributes
    pub fn render_start_tag(&self, overrides: &[(&str, &str)]) -> String {
        let mut tag = format!("<{}", self.raw_name);
        for attr in &self.attrs {
            let value = overrides
                .iter()
                .find(|(key, _)| attr.key.eq_ignore_ascii_case(key))
                .map(|(_, value)| *value)
                .unwrap_or(attr.value.as_str());
            tag.push_str(&format!(" {}=\"{}\"", attr.key, value.replace('"', "&quot;")));
        }
        tag.push_str(if self.self_closing { "/>" } else { ">" });
        tag
    }
}

/// Element index over a source text
#[derive(Debug, Clone)]
pub struct Markup<'a> {
    source: &'a str,
    elements: Vec<Element>,
    mode: ScanMode,
}

impl<'a> Markup<'a> {
    /// Scan with the structured tokenizer only
    pub fn scan(source: &'a str) -> Result<Self, ScanError> {
        let elements = structured::scan(source)?;
        Ok(Self {
            source,
            elements,
            mode: ScanMode::Structured,
        })
    }

    /// Scan with the regex scanner only
    pub fn scan_fallback(source: &'a str) -> Self {
        Self {
            source,
            elements: fallback::scan(source),
            mode: ScanMode::Fallback,
        }
    }

    /// Structured scan, degrading to the regex scanner
    pub fn scan_lenient(source: &'a str) -> Self {
        match Self::scan(source) {
            Ok(markup) => markup,
            Err(e) => {
                tracing::debug!("structured scan failed ({}), using fallback scanner", e);
                Self::scan_fallback(source)
            }
        }
    }

    /// Scan according to policy: lenient when `allow_fallback`, strict otherwise
    pub fn scan_with(source: &'a str, allow_fallback: bool) -> Result<Self, ScanError> {
        if allow_fallback {
            Ok(Self::scan_lenient(source))
        } else {
            Self::scan(source)
        }
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    pub fn mode(&self) -> ScanMode {
        self.mode
    }

    /// All elements in document order
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Elements with the given (lowercase) name, in document order
    pub fn named<'s>(&'s self, name: &'s str) -> impl Iterator<Item = &'s Element> + 's {
        self.elements.iter().filter(move |e| e.name == name)
    }

    /// First element with the given name
    pub fn first(&self, name: &str) -> Option<&Element> {
        self.elements.iter().find(|e| e.name == name)
    }

    /// Source text of a range
    pub fn slice(&self, range: Range<usize>) -> &'a str {
        &self.source[range]
    }

    /// Content between an element's tags
    pub fn inner(&self, element: &Element) -> &'a str {
        self.slice(element.inner.clone())
    }
}
