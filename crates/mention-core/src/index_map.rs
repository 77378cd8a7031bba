//! Mapping offsets between the plain-text view and the markup document.
//!
//! Caret and selection math happens in plain-text space; edits are written in markup space.
//! Inside literal text the two spaces differ only by a constant shift. Inside a mention there is
//! no direct counterpart, so callers pick a [`Correction`].

use crate::registry::MentionRegistry;
use crate::scanner::{MarkupScanner, Segment};
use crate::text::char_len;

/// What to do with an offset that falls strictly inside a mention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Correction {
    /// Snap to the mention's start.
    #[default]
    Start,
    /// Snap to the mention's end.
    End,
    /// Report "no position".
    Null,
}

/// A markup offset produced by [`map_plain_text_index`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkupPosition {
    /// Markup offset (chars).
    pub offset: usize,
    /// Type of the mention the offset was snapped out of, if any.
    pub snapped_type: Option<usize>,
}

impl MarkupPosition {
    fn direct(offset: usize) -> Self {
        Self {
            offset,
            snapped_type: None,
        }
    }
}

/// Convert a plain-text offset into a markup offset.
///
/// Offsets on a mention boundary belong to the neighbouring literal and map identically under
/// every correction. Offsets past the end of the plain text map to the document length.
/// Returns `None` only for [`Correction::Null`] with an offset strictly inside a mention.
pub fn map_plain_text_index(
    document: &str,
    registry: &MentionRegistry,
    plain_index: usize,
    correction: Correction,
) -> Option<MarkupPosition> {
    for segment in MarkupScanner::new(document, registry) {
        match segment {
            Segment::Literal(span) => {
                if plain_index < span.plain_text_start + span.len() {
                    let delta = plain_index.saturating_sub(span.plain_text_start);
                    return Some(MarkupPosition::direct(span.markup_start + delta));
                }
            }
            Segment::Mention(mention) => {
                if plain_index == mention.plain_text_start {
                    return Some(MarkupPosition::direct(mention.markup_start));
                }
                if plain_index < mention.plain_text_end() {
                    return match correction {
                        Correction::Start => Some(MarkupPosition {
                            offset: mention.markup_start,
                            snapped_type: Some(mention.type_index),
                        }),
                        Correction::End => Some(MarkupPosition {
                            offset: mention.markup_end,
                            snapped_type: Some(mention.type_index),
                        }),
                        Correction::Null => None,
                    };
                }
            }
        }
    }
    Some(MarkupPosition::direct(char_len(document)))
}

/// Convert a markup offset into a plain-text offset.
///
/// Offsets strictly inside a mention's markup follow `correction` (start or end of the display,
/// or `None`). Offsets past the end map to the plain-text length.
pub fn map_markup_index(
    document: &str,
    registry: &MentionRegistry,
    markup_index: usize,
    correction: Correction,
) -> Option<usize> {
    let mut plain_len = 0;
    for segment in MarkupScanner::new(document, registry) {
        match segment {
            Segment::Literal(span) => {
                if markup_index < span.markup_start + span.len() {
                    let delta = markup_index.saturating_sub(span.markup_start);
                    return Some(span.plain_text_start + delta);
                }
                plain_len = span.plain_text_start + span.len();
            }
            Segment::Mention(mention) => {
                if markup_index == mention.markup_start {
                    return Some(mention.plain_text_start);
                }
                if markup_index < mention.markup_end {
                    return match correction {
                        Correction::Start => Some(mention.plain_text_start),
                        Correction::End => Some(mention.plain_text_end()),
                        Correction::Null => None,
                    };
                }
                plain_len = mention.plain_text_end();
            }
        }
    }
    Some(plain_len)
}
