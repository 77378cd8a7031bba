//! Plain-text projection.
//!
//! The plain-text view is the markup document with every mention replaced by its display text.
//! It is always derived; nothing here is stored or mutated in place.

use crate::candidates::CandidateLookup;
use crate::registry::MentionRegistry;
use crate::scanner::{Mention, MarkupScanner, Segment};

/// The plain-text view of a markup document plus its mentions in document order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Projection {
    /// The plain text.
    pub plain_text: String,
    /// Mentions ordered by `markup_start` (and therefore by `plain_text_start`).
    pub mentions: Vec<Mention>,
}

impl Projection {
    /// Plain-text length in characters.
    pub fn plain_len(&self) -> usize {
        self.plain_text.chars().count()
    }

    /// The mention whose display contains `plain_index` (start inclusive, end exclusive).
    pub fn mention_at(&self, plain_index: usize) -> Option<&Mention> {
        self.mentions
            .iter()
            .find(|m| m.contains_plain_index(plain_index))
    }
}

/// Project `document` into plain text and mentions.
pub fn project(document: &str, registry: &MentionRegistry) -> Projection {
    project_with_lookup(document, registry, None)
}

/// Like [`project`], filling missing metadata from `lookup`.
///
/// Only types with [`resolve_metadata_from_data`](crate::MentionType::resolve_metadata_from_data)
/// are affected, and only mentions whose markup carries no metadata.
pub fn project_with_lookup(
    document: &str,
    registry: &MentionRegistry,
    lookup: Option<&CandidateLookup>,
) -> Projection {
    let mut projection = Projection {
        plain_text: String::with_capacity(document.len()),
        mentions: Vec::new(),
    };

    for segment in MarkupScanner::new(document, registry) {
        match segment {
            Segment::Literal(span) => projection.plain_text.push_str(span.text),
            Segment::Mention(mut mention) => {
                projection.plain_text.push_str(&mention.display);
                let resolves = registry
                    .get(mention.type_index)
                    .is_some_and(|ty| ty.resolve_metadata_from_data);
                if resolves && mention.meta_data.is_empty() {
                    if let Some(meta) = lookup
                        .and_then(|l| l.get(&mention.id))
                        .and_then(|c| c.meta_data())
                    {
                        mention.meta_data = meta.clone();
                    }
                }
                projection.mentions.push(mention);
            }
        }
    }

    projection
}

/// The plain-text view of `document`.
pub fn plain_text(document: &str, registry: &MentionRegistry) -> String {
    let mut out = String::with_capacity(document.len());
    for segment in MarkupScanner::new(document, registry) {
        match segment {
            Segment::Literal(span) => out.push_str(span.text),
            Segment::Mention(mention) => out.push_str(&mention.display),
        }
    }
    out
}

/// The mentions of `document` in document order.
pub fn mentions(document: &str, registry: &MentionRegistry) -> Vec<Mention> {
    MarkupScanner::new(document, registry)
        .filter_map(|segment| match segment {
            Segment::Mention(mention) => Some(mention),
            Segment::Literal(_) => None,
        })
        .collect()
}

/// The mention whose display contains `plain_index`, if any.
pub fn mention_at_plain_index(
    document: &str,
    registry: &MentionRegistry,
    plain_index: usize,
) -> Option<Mention> {
    mentions(document, registry)
        .into_iter()
        .find(|m| m.contains_plain_index(plain_index))
}

/// Plain-text offset right after the last mention of `document` (0 without mentions).
pub fn end_of_last_mention(document: &str, registry: &MentionRegistry) -> usize {
    mentions(document, registry)
        .last()
        .map(Mention::plain_text_end)
        .unwrap_or(0)
}
