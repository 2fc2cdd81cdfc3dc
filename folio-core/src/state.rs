//! Sequence counters shared across documents
//!
//! Footnote numbers and spine positions are handed out here and nowhere
//! else, so a run is deterministic and two runs never share state.

/// Book-wide counters for one pipeline run
#[derive(Debug, Clone)]
pub struct PipelineState {
    next_footnote: u32,
    next_document: usize,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self {
            next_footnote: 1,
            next_document: 0,
        }
    }
}

impl PipelineState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a contiguous block of footnote numbers, returning the first
    pub fn reserve_footnotes(&mut self, count: usize) -> u32 {
        let first = self.next_footnote;
        self.next_footnote += count as u32;
        first
    }

    /// Claim the next spine position (0-based)
    pub fn next_document(&mut self) -> usize {
        let position = self.next_document;
        self.next_document += 1;
        position
    }

    /// Footnote numbers handed out so far
    pub fn footnotes_allocated(&self) -> u32 {
        self.next_footnote - 1
    }
}
