//! Plain-text selections.

/// A selection in plain-text coordinates (chars). `start == end` is a caret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Selection {
    /// Anchor-side offset.
    pub start: usize,
    /// Active-side offset.
    pub end: usize,
}

impl Selection {
    /// Create a selection.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// A collapsed selection at `offset`.
    pub fn caret(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    /// Returns `true` for a caret.
    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    /// The selection with `start <= end`.
    pub fn normalized(&self) -> Self {
        Self {
            start: self.start.min(self.end),
            end: self.start.max(self.end),
        }
    }
}
