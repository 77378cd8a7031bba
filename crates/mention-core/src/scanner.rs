//! Markup scanner.
//!
//! Walks a markup document left to right and yields alternating literal spans and mentions.
//! Matches never overlap; at the same start position the earliest registered type wins.
//! Every yielded item carries both its markup offset and its plain-text offset.

use crate::placeholder::MetaData;
use crate::registry::MentionRegistry;
use crate::text::{CharIndex, char_len};

/// One mention located in both coordinate spaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mention {
    /// Index of the mention's type in the registry.
    pub type_index: usize,
    /// Mention id.
    pub id: String,
    /// Display text after the type's display transform.
    pub display: String,
    /// Display text as written in the markup.
    pub raw_display: String,
    /// Parsed metadata.
    pub meta_data: MetaData,
    /// Inclusive markup start (chars).
    pub markup_start: usize,
    /// Exclusive markup end (chars).
    pub markup_end: usize,
    /// Plain-text start (chars).
    pub plain_text_start: usize,
}

impl Mention {
    /// Length of the display text in characters.
    pub fn display_len(&self) -> usize {
        char_len(&self.display)
    }

    /// Exclusive plain-text end.
    pub fn plain_text_end(&self) -> usize {
        self.plain_text_start + self.display_len()
    }

    /// Returns `true` if `plain_index` lies strictly inside the display text.
    ///
    /// The start boundary counts as inside only for non-empty displays; the end boundary never
    /// does.
    pub fn contains_plain_index(&self, plain_index: usize) -> bool {
        self.plain_text_start <= plain_index && plain_index < self.plain_text_end()
    }

    /// Returns `true` if the half-open plain range `[start, end)` touches the display text.
    ///
    /// An empty range touches the mention when it sits strictly inside it.
    pub fn overlaps_plain_range(&self, start: usize, end: usize) -> bool {
        if start == end {
            return self.plain_text_start < start && start < self.plain_text_end();
        }
        start < self.plain_text_end() && self.plain_text_start < end
    }
}

/// Literal text between mentions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiteralSpan<'a> {
    /// The literal text (identical in markup and plain text).
    pub text: &'a str,
    /// Markup start (chars).
    pub markup_start: usize,
    /// Plain-text start (chars).
    pub plain_text_start: usize,
}

impl LiteralSpan<'_> {
    /// Length in characters.
    pub fn len(&self) -> usize {
        char_len(self.text)
    }

    /// Returns `true` if the span is empty.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// An item produced by [`MarkupScanner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Literal text. Emitted before every mention, possibly empty.
    Literal(LiteralSpan<'a>),
    /// A mention.
    Mention(Mention),
}

/// Iterator over the segments of a markup document.
#[derive(Debug)]
pub struct MarkupScanner<'r, 'd> {
    registry: &'r MentionRegistry,
    document: &'d str,
    index: CharIndex,
    byte_pos: usize,
    plain_pos: usize,
    pending: Option<Mention>,
    done: bool,
}

impl<'r, 'd> MarkupScanner<'r, 'd> {
    /// Start scanning `document`.
    pub fn new(document: &'d str, registry: &'r MentionRegistry) -> Self {
        Self {
            registry,
            document,
            index: CharIndex::new(document),
            byte_pos: 0,
            plain_pos: 0,
            pending: None,
            done: false,
        }
    }

    fn literal(&mut self, end_byte: usize) -> LiteralSpan<'d> {
        let text = &self.document[self.byte_pos..end_byte];
        let span = LiteralSpan {
            text,
            markup_start: self.index.byte_to_char(self.byte_pos),
            plain_text_start: self.plain_pos,
        };
        self.plain_pos += span.len();
        span
    }

    fn trailing(&mut self) -> Option<Segment<'d>> {
        self.done = true;
        if self.byte_pos < self.document.len() {
            let span = self.literal(self.document.len());
            self.byte_pos = self.document.len();
            return Some(Segment::Literal(span));
        }
        None
    }
}

impl<'d> Iterator for MarkupScanner<'_, 'd> {
    type Item = Segment<'d>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(mention) = self.pending.take() {
            return Some(Segment::Mention(mention));
        }
        if self.done {
            return None;
        }

        let Some(regex) = self.registry.markup_regex() else {
            return self.trailing();
        };
        let Some(caps) = regex.captures_at(self.document, self.byte_pos) else {
            return self.trailing();
        };
        let Some(whole) = caps.get(0) else {
            return self.trailing();
        };
        let Some(decoded) = self.registry.decode(&caps) else {
            return self.trailing();
        };

        let span = self.literal(whole.start());
        let display = self
            .registry
            .get(decoded.type_index)
            .map(|ty| ty.transform_display(&decoded.id, &decoded.raw_display))
            .unwrap_or_else(|| decoded.raw_display.clone());
        let mention = Mention {
            type_index: decoded.type_index,
            id: decoded.id,
            display,
            raw_display: decoded.raw_display,
            meta_data: decoded.meta_data,
            markup_start: self.index.byte_to_char(whole.start()),
            markup_end: self.index.byte_to_char(whole.end()),
            plain_text_start: self.plain_pos,
        };
        tracing::trace!(
            type_index = mention.type_index,
            markup_start = mention.markup_start,
            plain_text_start = mention.plain_text_start,
            "scanned mention"
        );
        self.plain_pos += mention.display_len();
        self.byte_pos = whole.end();
        self.pending = Some(mention);
        Some(Segment::Literal(span))
    }
}

/// Scan `document`, calling `on_literal` for each literal span and `on_mention` for each
/// mention, in document order.
///
/// A (possibly empty) literal precedes every mention; a trailing literal is reported only when
/// non-empty.
pub fn scan<'d>(
    document: &'d str,
    registry: &MentionRegistry,
    mut on_mention: impl FnMut(&Mention),
    mut on_literal: impl FnMut(&LiteralSpan<'d>),
) {
    for segment in MarkupScanner::new(document, registry) {
        match segment {
            Segment::Literal(span) => on_literal(&span),
            Segment::Mention(mention) => on_mention(&mention),
        }
    }
}
