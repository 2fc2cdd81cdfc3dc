use std::ops::Range;

/// A set of byte-range replacements over one source text.
///
/// Edits are applied in position order. An edit that overlaps one already
/// accepted is dropped; insertions at the same position keep the order in
/// which they were added.
#[derive(Debug, Clone)]
pub struct Splice<'a> {
    source: &'a str,
    edits: Vec<(Range<usize>, String)>,
}

impl<'a> Splice<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            edits: Vec::new(),
        }
    }

    /// Replace a range with new text
    pub fn replace(&mut self, range: Range<usize>, text: impl Into<String>) {
        self.edits.push((range, text.into()));
    }

    /// Insert text at a position
    pub fn insert(&mut self, at: usize, text: impl Into<String>) {
        self.replace(at..at, text);
    }

    /// Remove a range
    pub fn remove(&mut self, range: Range<usize>) {
        self.replace(range, String::new());
    }

    /// Apply every edit to the whole source
    pub fn render(&self) -> String {
        self.render_range(0..self.source.len())
    }

    /// Apply the edits lying inside `range` to that slice of the source
    pub fn render_range(&self, range: Range<usize>) -> String {
        let mut edits: Vec<&(Range<usize>, String)> = self
            .edits
            .iter()
            .filter(|(r, _)| r.start >= range.start && r.end <= range.end)
            .collect();
        edits.sort_by_key(|(r, _)| (r.start, r.end));

        let mut out = String::with_capacity(range.len());
        let mut cursor = range.start;
        for (edit, text) in edits {
            if edit.start < cursor {
                tracing::debug!("dropping overlapping edit at {}..{}", edit.start, edit.end);
                continue;
            }
            out.push_str(&self.source[cursor..edit.start]);
            out.push_str(text);
            cursor = edit.end;
        }
        out.push_str(&self.source[cursor..range.end]);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edits_apply_in_position_order() {
        let source = "<p>one</p><p>two</p>";
        let mut splice = Splice::new(source);
        splice.insert(16, "</b>");
        splice.insert(13, "<b>");
        splice.replace(3..6, "ONE");
        assert_eq!(splice.render(), "<p>ONE</p><p><b>two</b></p>");
    }

    #[test]
    fn test_overlapping_edit_is_dropped() {
        let mut splice = Splice::new("abcdefgh");
        splice.replace(2..5, "X");
        splice.replace(4..6, "Y");
        assert_eq!(splice.render(), "abXfgh");
    }

    #[test]
    fn test_insert_before_replacement_at_same_position() {
        let mut splice = Splice::new("abcdef");
        splice.replace(2..4, "X");
        splice.insert(2, "[");
        splice.insert(4, "]");
        assert_eq!(splice.render(), "ab[X]ef");
    }

    #[test]
    fn test_render_range_only_applies_inner_edits() {
        let mut splice = Splice::new("0123456789");
        splice.remove(1..2);
        splice.replace(5..6, "five");
        assert_eq!(splice.render_range(4..8), "4five67");
    }
}
