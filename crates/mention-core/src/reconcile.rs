//! Edit reconciliation.
//!
//! The host lets the user edit the plain-text view. After each edit it hands the core the old
//! markup and the new plain text; the core works out which plain-text region was replaced,
//! maps it into markup space and splices the inserted characters in literally.
//!
//! Mentions are atomic: if the replaced region touches any part of a mention's display text,
//! the whole mention's markup is replaced. Inserted text is copied into the markup verbatim.
//! The markup has no escape syntax: typed text that spells out a complete mention is read as
//! one by the next projection.

use crate::index_map::{Correction, map_plain_text_index};
use crate::projection::{Projection, mention_at_plain_index, project};
use crate::registry::MentionRegistry;
use crate::scanner::Mention;
use crate::selection::Selection;
use crate::text::{char_len, slice_chars, splice};

/// Selection state around an edit, in plain-text coordinates.
///
/// Used to place the change when the diff alone is ambiguous (for example typing `a` next to
/// another `a`). Values that cannot produce the observed length change are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SelectionDelta {
    /// Selection start before the edit.
    pub selection_start_before: usize,
    /// Selection end before the edit.
    pub selection_end_before: usize,
    /// Selection end (caret) after the edit.
    pub selection_end_after: usize,
}

impl SelectionDelta {
    /// Build a delta from the selection before the edit and the caret after it.
    pub fn new(before: Selection, caret_after: usize) -> Self {
        let before = before.normalized();
        Self {
            selection_start_before: before.start,
            selection_end_before: before.end,
            selection_end_after: caret_after,
        }
    }
}

/// The result of reconciling an edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// The new markup document.
    pub markup: String,
    /// Projection of the new markup.
    pub projection: Projection,
    /// Mentions of the old document removed by the edit.
    pub removed: Vec<Mention>,
}

/// A replaced plain-text region: `old[start..old_end]` became `new[start..new_end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ChangedRegion {
    pub(crate) start: usize,
    pub(crate) old_end: usize,
    pub(crate) new_end: usize,
}

impl ChangedRegion {
    fn is_noop(&self) -> bool {
        self.start == self.old_end && self.start == self.new_end
    }
}

/// A delta is usable only when it describes the observed length change: a replacement of
/// `[start_before, end_before)` ending at `end_after`, or a forward delete at a caret.
fn delta_fits(delta: &SelectionDelta, old_len: usize, new_len: usize) -> bool {
    let SelectionDelta {
        selection_start_before: start,
        selection_end_before: end,
        selection_end_after: after,
    } = *delta;
    if start > end || end > old_len || after > new_len {
        return false;
    }
    let replaced = old_len + after == new_len + end;
    let forward_delete = start == end && after == start && new_len <= old_len;
    replaced || forward_delete
}

pub(crate) fn changed_region(old: &str, new: &str, delta: SelectionDelta) -> ChangedRegion {
    let old: Vec<char> = old.chars().collect();
    let new: Vec<char> = new.chars().collect();
    let shorter = old.len().min(new.len());

    let mut prefix = old.iter().zip(&new).take_while(|(a, b)| a == b).count();

    let consistent = delta_fits(&delta, old.len(), new.len());
    if consistent {
        prefix = prefix.min(delta.selection_start_before.min(delta.selection_end_after));
    }

    let mut suffix = old
        .iter()
        .rev()
        .zip(new.iter().rev())
        .take(shorter - prefix)
        .take_while(|(a, b)| a == b)
        .count();
    if consistent {
        suffix = suffix
            .min(new.len() - delta.selection_end_after)
            .min(old.len() - delta.selection_end_before);
    }

    ChangedRegion {
        start: prefix,
        old_end: old.len() - suffix,
        new_end: new.len() - suffix,
    }
}

/// Apply an edit made in the plain-text view to the markup document.
///
/// Returns the new markup. See [`reconcile_edit`] for the full result.
pub fn apply_change_to_value(
    old_markup: &str,
    new_plain_text: &str,
    delta: SelectionDelta,
    registry: &MentionRegistry,
) -> String {
    reconcile_edit(old_markup, new_plain_text, delta, registry).markup
}

/// Apply an edit made in the plain-text view to the markup document.
///
/// The replaced plain-text region is mapped with [`Correction::Start`] /
/// [`Correction::End`], so a region touching a mention widens to the whole mention.
pub fn reconcile_edit(
    old_markup: &str,
    new_plain_text: &str,
    delta: SelectionDelta,
    registry: &MentionRegistry,
) -> Reconciliation {
    let old = project(old_markup, registry);
    let region = changed_region(&old.plain_text, new_plain_text, delta);
    if region.is_noop() {
        return Reconciliation {
            markup: old_markup.to_string(),
            projection: old,
            removed: Vec::new(),
        };
    }

    let markup_start = map_plain_text_index(old_markup, registry, region.start, Correction::Start)
        .map(|p| p.offset)
        .unwrap_or(region.start);
    let markup_end = map_plain_text_index(old_markup, registry, region.old_end, Correction::End)
        .map(|p| p.offset)
        .unwrap_or(region.old_end);
    let inserted = slice_chars(new_plain_text, region.start, region.new_end);

    let removed: Vec<Mention> = old
        .mentions
        .into_iter()
        .filter(|m| m.overlaps_plain_range(region.start, region.old_end))
        .collect();
    if !removed.is_empty() {
        tracing::debug!(
            removed = removed.len(),
            markup_start,
            markup_end,
            "edit touched mentions; removing them entirely"
        );
    }

    let markup = splice(old_markup, markup_start, markup_end, inserted);
    let projection = project(&markup, registry);
    Reconciliation {
        markup,
        projection,
        removed,
    }
}

/// Keep the caret stable when an edit removes a whole mention.
///
/// When the caret after the edit lands inside a mention of the old document and the selection
/// before the edit reached past that mention's start, the caret collapses to the mention start.
pub fn adjust_selection_after_change(
    old_markup: &str,
    registry: &MentionRegistry,
    before: Selection,
    after: Selection,
) -> Selection {
    match mention_at_plain_index(old_markup, registry, after.start) {
        Some(mention) if before.end > mention.plain_text_start => {
            Selection::caret(mention.plain_text_start)
        }
        _ => after,
    }
}

/// The markup covering a plain-text selection, widened to whole mentions (for copying).
pub fn markup_for_selection(
    markup: &str,
    registry: &MentionRegistry,
    selection: Selection,
) -> String {
    let (start, end) = markup_bounds(markup, registry, selection);
    slice_chars(markup, start, end).to_string()
}

/// Replace a plain-text selection with markup (for pasting or cutting).
///
/// Unlike typed text, `insert_markup` may contain mentions. Carriage returns are dropped.
pub fn replace_selection(
    markup: &str,
    registry: &MentionRegistry,
    selection: Selection,
    insert_markup: &str,
) -> String {
    let (start, end) = markup_bounds(markup, registry, selection);
    let cleaned = insert_markup.replace('\r', "");
    splice(markup, start, end, &cleaned)
}

fn markup_bounds(markup: &str, registry: &MentionRegistry, selection: Selection) -> (usize, usize) {
    let selection = selection.normalized();
    let len = char_len(markup);
    let start = map_plain_text_index(markup, registry, selection.start, Correction::Start)
        .map_or(len, |p| p.offset);
    let end = map_plain_text_index(markup, registry, selection.end, Correction::End)
        .map_or(len, |p| p.offset);
    (start, end.max(start))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta(start_before: usize, end_before: usize, end_after: usize) -> SelectionDelta {
        SelectionDelta {
            selection_start_before: start_before,
            selection_end_before: end_before,
            selection_end_after: end_after,
        }
    }

    #[test]
    fn caret_disambiguates_repeated_chars() {
        let r = changed_region("aa", "aaa", delta(1, 1, 2));
        assert_eq!(r, ChangedRegion { start: 1, old_end: 1, new_end: 2 });

        let r = changed_region("aab", "ab", delta(1, 1, 0));
        assert_eq!(r, ChangedRegion { start: 0, old_end: 1, new_end: 0 });
    }

    #[test]
    fn range_replacement_covers_selection() {
        let r = changed_region("abcabc", "abcc", delta(3, 6, 4));
        assert_eq!(r, ChangedRegion { start: 3, old_end: 6, new_end: 4 });
    }

    #[test]
    fn inconsistent_selection_falls_back_to_pure_diff() {
        let r = changed_region("ab", "abc", delta(5, 5, 9));
        assert_eq!(r, ChangedRegion { start: 2, old_end: 2, new_end: 3 });
    }

    #[test]
    fn stale_caret_does_not_shrink_the_diff() {
        // Caret reported at the end of "Ann hi" while the edit happened at the front.
        let r = changed_region("Ann hi", "xAnn hi", delta(6, 6, 1));
        assert_eq!(r, ChangedRegion { start: 0, old_end: 0, new_end: 1 });
    }

    #[test]
    fn forward_delete_keeps_caret() {
        let r = changed_region("aab", "ab", delta(1, 1, 1));
        assert_eq!(r, ChangedRegion { start: 1, old_end: 2, new_end: 1 });
    }

    #[test]
    fn unchanged_text_is_noop() {
        assert!(changed_region("abc", "abc", delta(1, 1, 1)).is_noop());
    }
}
