//! Mention insertion.
//!
//! Composes the markup for a chosen candidate and splices it, together with its display text,
//! into the markup document and the plain-text view in one step.

use crate::candidates::{Candidate, CandidateLookup};
use crate::index_map::{Correction, map_markup_index, map_plain_text_index};
use crate::placeholder::{MetaData, Placeholder, metadata_delimiters, serialize_meta_data};
use crate::projection::project_with_lookup;
use crate::registry::MentionRegistry;
use crate::scanner::Mention;
use crate::selection::Selection;
use crate::session::QueryInfo;
use crate::text::{char_len, find_chars, rfind_chars, slice_chars, splice};
use mention_core_lang::WordBoundary;

/// Fill a markup template.
///
/// The first `__id__` and `__display__` are replaced. A `__metaData__` placeholder receives the
/// serialized metadata. When there is none, the placeholder is dropped, together with its
/// enclosing bracket pair if it has one of its own (`{__metaData__}`).
pub fn make_mention_markup(
    template: &str,
    id: &str,
    display: &str,
    meta: Option<&MetaData>,
) -> String {
    let mut markup = template
        .replacen(Placeholder::Id.token(), id, 1)
        .replacen(Placeholder::Display.token(), display, 1);

    let token = Placeholder::MetaData.token();
    if let Some(pos) = find_chars(&markup, token) {
        let serialized = meta.map(serialize_meta_data).unwrap_or_default();
        let token_len = char_len(token);
        let (start, end) = if serialized.is_empty() && metadata_delimiters(template).is_some() {
            (pos.saturating_sub(1), pos + token_len + 1)
        } else {
            (pos, pos + token_len)
        };
        markup = splice(&markup, start, end, &serialized);
    }

    markup
}

/// The outcome of committing a candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insertion {
    /// The new markup document.
    pub markup: String,
    /// The new plain text.
    pub plain_text: String,
    /// Mentions of the new markup.
    pub mentions: Vec<Mention>,
    /// Caret after the inserted display text (plain-text offset).
    pub caret: usize,
    /// Type of the inserted mention.
    pub type_index: usize,
    /// Id of the inserted mention.
    pub id: String,
    /// Raw display written into the markup.
    pub display: String,
}

struct Word {
    start: usize,
    end: usize,
    text: String,
}

fn preserved_word(plain: &str, caret: usize, trigger: &str, boundary: &WordBoundary) -> Option<Word> {
    let start = rfind_chars(slice_chars(plain, 0, caret), trigger)?;
    let after_trigger = start + char_len(trigger);
    let plain_len = char_len(plain);
    let end = if boundary.segmented {
        slice_chars(plain, after_trigger, plain_len)
            .chars()
            .position(|ch| boundary.is_space(ch))
            .map_or(plain_len, |i| after_trigger + i)
    } else {
        (after_trigger + 1).min(plain_len)
    };
    Some(Word {
        start,
        end,
        text: slice_chars(plain, after_trigger, end).to_string(),
    })
}

/// Compose and splice the mention for `candidate` chosen in the query described by `info`.
///
/// Where the mention goes, and which text it displays, follows this precedence:
///
/// 1. the replace target of the query (switching an existing mention)
/// 2. a highlighted range (types with `highlight_to_tag`)
/// 3. the word after the trigger (types with `preserve_value`)
/// 4. the trigger+query run
///
/// Returns `None` if `info` names an unknown type.
pub fn compose_insertion(
    markup: &str,
    registry: &MentionRegistry,
    boundary: &WordBoundary,
    selection: Selection,
    info: &QueryInfo,
    candidate: &Candidate,
    lookup: Option<&CandidateLookup>,
) -> Option<Insertion> {
    let ty = registry.get(info.type_index)?;
    let plain = crate::projection::plain_text(markup, registry);
    let selection = selection.normalized();

    let word: Option<Word> = if info.replace.is_some() {
        None
    } else if selection.is_collapsed() && ty.preserve_value {
        ty.trigger
            .literal()
            .and_then(|trigger| preserved_word(&plain, selection.start, trigger, boundary))
    } else if !selection.is_collapsed() && ty.highlight_to_tag {
        Some(Word {
            start: selection.start,
            end: selection.end,
            text: slice_chars(&plain, selection.start, selection.end).to_string(),
        })
    } else {
        None
    };
    let word = word.filter(|w| !w.text.is_empty());

    let map_start = |i: usize| {
        map_plain_text_index(markup, registry, i, Correction::Start).map_or(i, |p| p.offset)
    };
    let map_end =
        |i: usize| map_plain_text_index(markup, registry, i, Correction::End).map_or(i, |p| p.offset);

    let (markup_start, markup_end, display) = if let Some(target) = &info.replace {
        let display = if ty.preserve_value {
            target.raw_display.clone()
        } else {
            candidate.display().to_string()
        };
        (target.markup_start, target.markup_end, display)
    } else if let Some(word) = word {
        (map_start(word.start), map_end(word.end), word.text)
    } else {
        let start = map_start(info.sequence_start);
        let run = info.sequence_end.saturating_sub(info.sequence_start);
        (start, start + run, candidate.display().to_string())
    };

    let id = candidate.id();
    let mut insert = make_mention_markup(&ty.markup, id, &display, candidate.meta_data());
    let mut display_value = ty.transform_display(id, &display);
    if ty.append_space_on_add {
        insert.push(boundary.space);
        display_value.push(boundary.space);
    }

    let plain_start = map_markup_index(markup, registry, markup_start, Correction::Start)
        .unwrap_or(info.sequence_start);
    let plain_end = map_markup_index(markup, registry, markup_end, Correction::End)
        .unwrap_or(info.sequence_end);

    let new_markup = splice(markup, markup_start, markup_end, &insert);
    let plain_text = splice(&plain, plain_start, plain_end, &display_value);
    let mentions = project_with_lookup(&new_markup, registry, lookup).mentions;

    tracing::debug!(
        type_index = info.type_index,
        id,
        markup_start,
        markup_end,
        "inserted mention"
    );

    Some(Insertion {
        markup: new_markup,
        plain_text,
        mentions,
        caret: plain_start + char_len(&display_value),
        type_index: info.type_index,
        id: id.to_string(),
        display,
    })
}
