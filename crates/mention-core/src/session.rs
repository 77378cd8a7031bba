//! Suggestion session.
//!
//! Tracks, for one editing session, which mention types are currently being queried, the
//! candidates they returned, and the keyboard focus over those candidates.
//!
//! # Lifecycle
//!
//! Each type moves through `Idle -> Querying -> Resolved` and back to `Idle` when a candidate
//! is committed or the session is cancelled. Several types can be mid-query at once when
//! their triggers match the same text.
//!
//! Every query cycle gets a fresh, strictly increasing token. A provider that answers later
//! hands its [`QueryResponder`] back to [`SuggestionSession::deliver`]; answers carrying an old
//! token were superseded by a newer keystroke and are dropped.

use crate::candidates::{Candidate, CandidateLookup};
use crate::index_map::{Correction, map_plain_text_index};
use crate::insertion::{Insertion, compose_insertion};
use crate::placeholder::MetaData;
use crate::projection::{end_of_last_mention, mention_at_plain_index};
use crate::registry::MentionRegistry;
use crate::selection::Selection;
use crate::text::{char_len, find_chars, rfind_chars, slice_chars};
use mention_core_lang::WordBoundary;
use std::collections::BTreeMap;

/// Identifies one dispatched query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueryResponder {
    /// Token of the query cycle that dispatched the query.
    pub token: u64,
    /// Type being queried.
    pub type_index: usize,
}

/// An existing mention that a committed candidate will replace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaceTarget {
    /// Plain-text start of the mention.
    pub plain_start: usize,
    /// Plain-text end of the mention.
    pub plain_end: usize,
    /// Markup start of the mention.
    pub markup_start: usize,
    /// Markup end of the mention.
    pub markup_end: usize,
    /// Display text after transform.
    pub display: String,
    /// Display text as written in the markup.
    pub raw_display: String,
    /// Metadata of the mention.
    pub meta_data: MetaData,
}

/// One active query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryInfo {
    /// Type being queried.
    pub type_index: usize,
    /// The query string passed to the data source.
    pub query: String,
    /// Plain-text start of the trigger+query run (or target range).
    pub sequence_start: usize,
    /// Plain-text end of the trigger+query run (or target range).
    pub sequence_end: usize,
    /// Set when the query would switch an existing mention.
    pub replace: Option<ReplaceTarget>,
}

/// Resolved candidates of one type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSuggestions {
    /// The query that produced the results.
    pub info: QueryInfo,
    /// Candidates in provider order.
    pub results: Vec<Candidate>,
}

/// Where a type stands in the query lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryPhase {
    /// Not queried.
    Idle,
    /// Dispatched, waiting for results.
    Querying,
    /// Results available.
    Resolved,
}

/// Keyboard focus over the flattened candidate list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FocusState {
    /// Focused top-level candidate (index into the flattened list).
    pub focus_index: usize,
    /// Candidate whose children are shown (accordion mode).
    pub open_index: Option<usize>,
    /// Focused child of the open candidate.
    pub child_index: Option<usize>,
}

/// Navigation keys understood by the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Close the suggestions.
    Escape,
    /// Previous candidate.
    Up,
    /// Next candidate.
    Down,
    /// Confirm (or open in accordion mode).
    Enter,
    /// Confirm the focused top-level candidate.
    Tab,
}

/// Result of [`SuggestionSession::handle_key`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// No suggestions are shown; the host should process the key itself.
    Ignored,
    /// The key changed the session.
    Handled,
    /// The key committed a candidate.
    Committed(Box<Insertion>),
}

/// Session-wide options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionOptions {
    /// Nested candidates open in place and are navigated with a second focus index.
    pub accordion: bool,
    /// Word-boundary rules.
    pub word_boundary: WordBoundary,
}

/// Document context a session operation works against.
#[derive(Debug, Clone, Copy)]
pub struct DocumentContext<'a> {
    /// Current markup.
    pub markup: &'a str,
    /// Current plain text (projection of `markup`).
    pub plain_text: &'a str,
    /// Registry used for `markup`.
    pub registry: &'a MentionRegistry,
    /// Candidate lookup for metadata resolution.
    pub lookup: Option<&'a CandidateLookup>,
}

/// Query, candidate and focus state of one editing session.
#[derive(Debug, Clone, Default)]
pub struct SuggestionSession {
    options: SessionOptions,
    token: u64,
    selection: Option<Selection>,
    composing: bool,
    pending: BTreeMap<usize, QueryInfo>,
    suggestions: BTreeMap<usize, TypeSuggestions>,
    focus: FocusState,
}

impl SuggestionSession {
    /// Create an idle session.
    pub fn new(options: SessionOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Session options.
    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Replace the word-boundary rules.
    pub fn set_word_boundary(&mut self, boundary: WordBoundary) {
        self.options.word_boundary = boundary;
    }

    /// Current query token.
    pub fn token(&self) -> u64 {
        self.token
    }

    /// Last selection reported by the host.
    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    /// Record the selection without querying.
    pub fn set_selection(&mut self, selection: Option<Selection>) {
        self.selection = selection;
    }

    /// Returns `true` while an input-method composition is active.
    pub fn is_composing(&self) -> bool {
        self.composing
    }

    /// An input-method composition started; selection changes stop triggering queries.
    pub fn composition_start(&mut self) {
        self.composing = true;
    }

    /// The input-method composition ended.
    pub fn composition_end(&mut self) {
        self.composing = false;
    }

    /// Focus state.
    pub fn focus(&self) -> FocusState {
        self.focus
    }

    /// Lifecycle phase of a type.
    pub fn phase(&self, type_index: usize) -> QueryPhase {
        if self.suggestions.contains_key(&type_index) {
            QueryPhase::Resolved
        } else if self.pending.contains_key(&type_index) {
            QueryPhase::Querying
        } else {
            QueryPhase::Idle
        }
    }

    /// Queries waiting for results, by type.
    pub fn pending(&self) -> impl Iterator<Item = &QueryInfo> {
        self.pending.values()
    }

    /// Resolved suggestions, in type-registration order.
    pub fn suggestions(&self) -> impl Iterator<Item = &TypeSuggestions> {
        self.suggestions.values()
    }

    /// Returns `true` if there is anything to show or wait for.
    pub fn is_active(&self) -> bool {
        !self.suggestions.is_empty() || !self.pending.is_empty()
    }

    /// All resolved candidates flattened in type-registration order.
    pub fn flat_candidates(&self) -> Vec<(&QueryInfo, &Candidate)> {
        self.suggestions
            .values()
            .flat_map(|s| s.results.iter().map(move |c| (&s.info, c)))
            .collect()
    }

    /// Number of flattened top-level candidates.
    pub fn suggestion_count(&self) -> usize {
        self.suggestions.values().map(|s| s.results.len()).sum()
    }

    /// The focused top-level candidate.
    pub fn focused_candidate(&self) -> Option<(&QueryInfo, &Candidate)> {
        self.flat_candidates().get(self.focus.focus_index).copied()
    }

    /// The focused child of the open candidate.
    pub fn focused_child(&self) -> Option<(&QueryInfo, &Candidate)> {
        let open = self.focus.open_index?;
        let child = self.focus.child_index?;
        let (info, parent) = self.flat_candidates().get(open).copied()?;
        parent.children().get(child).map(|c| (info, c))
    }

    /// Cancel every query and forget all suggestions.
    ///
    /// Results still in flight are dropped when they arrive.
    pub fn clear(&mut self) {
        self.token += 1;
        self.pending.clear();
        self.suggestions.clear();
        self.focus = FocusState::default();
    }

    /// Handle a selection change reported by the host.
    ///
    /// Returns the selection the host should apply when a highlighted range was widened to
    /// word boundaries.
    pub fn handle_select(
        &mut self,
        doc: DocumentContext<'_>,
        selection: Selection,
    ) -> Option<Selection> {
        self.selection = Some(selection);
        if self.composing {
            return None;
        }
        let highlight = doc.registry.types().iter().any(|ty| ty.highlight_to_tag);
        if selection.is_collapsed() || highlight {
            self.update_queries(doc, selection)
        } else {
            self.clear();
            None
        }
    }

    /// Start a new query cycle for `selection`.
    ///
    /// Invalidates earlier queries, then detects triggers (or a highlighted range, or a caret
    /// inside a mention) and dispatches queries to the matching types.
    pub fn update_queries(
        &mut self,
        doc: DocumentContext<'_>,
        selection: Selection,
    ) -> Option<Selection> {
        self.token += 1;
        self.pending.clear();
        self.suggestions.clear();
        self.selection = Some(selection);

        let range = selection.normalized();
        if !range.is_collapsed() {
            let expanded = self.query_highlight(doc, range);
            if let Some(target) = expanded {
                self.selection = Some(target);
            }
            return expanded;
        }
        let caret = range.start;

        let Some(position) = map_plain_text_index(doc.markup, doc.registry, caret, Correction::Null)
        else {
            self.query_switch(doc, caret);
            return None;
        };

        let before = slice_chars(doc.markup, 0, position.offset);
        let substring_start = end_of_last_mention(before, doc.registry);
        let substring = slice_chars(doc.plain_text, substring_start, caret);

        for type_index in 0..doc.registry.len() {
            let Some(regex) = doc
                .registry
                .trigger_regex(type_index, &self.options.word_boundary)
            else {
                continue;
            };
            let Some(caps) = regex.captures(substring) else {
                continue;
            };
            let (Some(run), query) = (caps.get(1), caps.get(2)) else {
                continue;
            };
            let sequence_start = substring_start + char_len(&substring[..run.start()]);
            let info = QueryInfo {
                type_index,
                query: query.map(|q| q.as_str().to_string()).unwrap_or_default(),
                sequence_start,
                sequence_end: sequence_start + char_len(run.as_str()),
                replace: None,
            };
            self.dispatch(doc.registry, info);
        }
        None
    }

    fn query_highlight(
        &mut self,
        doc: DocumentContext<'_>,
        range: Selection,
    ) -> Option<Selection> {
        if slice_chars(doc.plain_text, range.start, range.end).is_empty() {
            return None;
        }
        let highlight_types: Vec<usize> = doc
            .registry
            .types()
            .iter()
            .enumerate()
            .filter(|(_, ty)| ty.highlight_to_tag)
            .map(|(i, _)| i)
            .collect();
        if highlight_types.is_empty() {
            return None;
        }

        let target = if self.options.word_boundary.segmented {
            expand_to_words(doc, range, self.options.word_boundary.space)
        } else {
            range
        };
        for type_index in highlight_types {
            self.dispatch(
                doc.registry,
                QueryInfo {
                    type_index,
                    query: String::new(),
                    sequence_start: target.start,
                    sequence_end: target.end,
                    replace: None,
                },
            );
        }
        Some(target)
    }

    fn query_switch(&mut self, doc: DocumentContext<'_>, caret: usize) {
        let Some(mention) = mention_at_plain_index(doc.markup, doc.registry, caret) else {
            return;
        };
        let info = QueryInfo {
            type_index: mention.type_index,
            query: String::new(),
            sequence_start: mention.plain_text_start,
            sequence_end: mention.plain_text_end(),
            replace: Some(ReplaceTarget {
                plain_start: mention.plain_text_start,
                plain_end: mention.plain_text_end(),
                markup_start: mention.markup_start,
                markup_end: mention.markup_end,
                display: mention.display,
                raw_display: mention.raw_display,
                meta_data: mention.meta_data,
            }),
        };
        self.dispatch(doc.registry, info);
    }

    fn dispatch(&mut self, registry: &MentionRegistry, mut info: QueryInfo) {
        let Some(ty) = registry.get(info.type_index) else {
            return;
        };
        if ty.preserve_value {
            info.query.clear();
        }
        let responder = QueryResponder {
            token: self.token,
            type_index: info.type_index,
        };
        tracing::debug!(
            token = self.token,
            type_index = info.type_index,
            query = %info.query,
            "dispatching query"
        );
        let query = info.query.clone();
        self.pending.insert(info.type_index, info);
        if let Some(results) = ty.data.query(&query, responder) {
            self.deliver(responder, results);
        }
    }

    /// Apply results for a dispatched query.
    ///
    /// Returns `false` (and changes nothing) when the query was superseded or cancelled.
    pub fn deliver(&mut self, responder: QueryResponder, results: Vec<Candidate>) -> bool {
        if responder.token != self.token {
            tracing::trace!(
                token = responder.token,
                current = self.token,
                "dropping stale query results"
            );
            return false;
        }
        let Some(info) = self.pending.remove(&responder.type_index) else {
            return false;
        };
        self.suggestions
            .insert(responder.type_index, TypeSuggestions { info, results });

        let count = self.suggestion_count();
        if self.focus.focus_index >= count {
            self.focus.focus_index = count.saturating_sub(1);
        }
        true
    }

    /// Move the top-level focus by `delta`, wrapping around, and close any open candidate.
    pub fn shift_focus(&mut self, delta: isize) {
        let count = self.suggestion_count();
        if count == 0 {
            return;
        }
        let next = (self.focus.focus_index as isize + delta).rem_euclid(count as isize);
        self.focus = FocusState {
            focus_index: next as usize,
            open_index: None,
            child_index: None,
        };
    }

    /// Move the child focus of the open candidate by `delta`.
    ///
    /// Moving past the last child advances to the next top-level candidate; moving before the
    /// first child closes the candidate and focuses it.
    pub fn shift_child_focus(&mut self, delta: isize) {
        let Some(open) = self.focus.open_index else {
            return;
        };
        let count = self
            .flat_candidates()
            .get(open)
            .map_or(0, |(_, c)| c.children().len());
        if count == 0 {
            return;
        }
        let current = self.focus.child_index.unwrap_or(0) as isize;
        let next = (current + delta).rem_euclid(count as isize) as usize;
        if delta > 0 && next == 0 {
            self.focus.focus_index = open;
            self.shift_focus(1);
        } else if delta < 0 && next == count - 1 {
            self.focus = FocusState {
                focus_index: open,
                open_index: None,
                child_index: None,
            };
        } else {
            self.focus.child_index = Some(next);
        }
    }

    /// Open the candidate at `index` and focus its first child.
    pub fn open(&mut self, index: usize) {
        self.focus = FocusState {
            focus_index: index,
            open_index: Some(index),
            child_index: Some(0),
        };
    }

    /// Close the open candidate.
    pub fn close(&mut self) {
        self.focus.open_index = None;
        self.focus.child_index = None;
    }

    /// Commit `candidate` for the query `info` and end the cycle.
    pub fn commit(
        &mut self,
        doc: DocumentContext<'_>,
        info: &QueryInfo,
        candidate: &Candidate,
    ) -> Option<Insertion> {
        let selection = self.selection.unwrap_or_else(|| Selection::caret(info.sequence_end));
        let insertion = compose_insertion(
            doc.markup,
            doc.registry,
            &self.options.word_boundary,
            selection,
            info,
            candidate,
            doc.lookup,
        );
        if let Some(insertion) = &insertion {
            self.selection = Some(Selection::caret(insertion.caret));
        }
        self.clear();
        insertion
    }

    /// Commit the focused top-level candidate.
    pub fn commit_focused(&mut self, doc: DocumentContext<'_>) -> Option<Insertion> {
        let (info, candidate) = self.focused_candidate().map(|(i, c)| (i.clone(), c.clone()))?;
        self.commit(doc, &info, &candidate)
    }

    /// Commit the focused child of the open candidate.
    pub fn commit_child_focused(&mut self, doc: DocumentContext<'_>) -> Option<Insertion> {
        let (info, candidate) = self.focused_child().map(|(i, c)| (i.clone(), c.clone()))?;
        self.commit(doc, &info, &candidate)
    }

    /// A candidate row was clicked.
    ///
    /// In accordion mode a click opens a candidate with children, or closes it when already
    /// open; otherwise the candidate is committed.
    pub fn select_candidate(
        &mut self,
        doc: DocumentContext<'_>,
        index: usize,
    ) -> Option<Insertion> {
        let (info, candidate) = self
            .flat_candidates()
            .get(index)
            .map(|(i, c)| ((*i).clone(), (*c).clone()))?;
        if self.options.accordion && candidate.has_children() {
            if self.focus.open_index == Some(index) {
                self.close();
            } else {
                self.open(index);
            }
            return None;
        }
        self.commit(doc, &info, &candidate)
    }

    /// A child row of the open candidate was clicked.
    pub fn select_child(&mut self, doc: DocumentContext<'_>, child: usize) -> Option<Insertion> {
        if self.focus.open_index.is_none() {
            return None;
        }
        self.focus.child_index = Some(child);
        self.commit_child_focused(doc)
    }

    /// Handle a navigation key.
    pub fn handle_key(&mut self, doc: DocumentContext<'_>, key: Key) -> KeyOutcome {
        if self.suggestion_count() == 0 {
            return KeyOutcome::Ignored;
        }
        let accordion = self.options.accordion;
        let committed = match key {
            Key::Escape => {
                self.clear();
                None
            }
            Key::Down if accordion && self.focus.open_index.is_some() => {
                self.shift_child_focus(1);
                None
            }
            Key::Down => {
                self.shift_focus(1);
                None
            }
            Key::Up if self.focus.open_index.is_some() => {
                self.shift_child_focus(-1);
                None
            }
            Key::Up => {
                self.shift_focus(-1);
                None
            }
            Key::Enter => {
                let focused_has_children = self
                    .focused_candidate()
                    .is_some_and(|(_, c)| c.has_children());
                if accordion && self.focus.open_index.is_none() && focused_has_children {
                    self.open(self.focus.focus_index);
                    None
                } else if self.focus.open_index.is_some() && self.focus.child_index.is_some() {
                    self.commit_child_focused(doc)
                } else {
                    self.commit_focused(doc)
                }
            }
            Key::Tab => self.commit_focused(doc),
        };
        match committed {
            Some(insertion) => KeyOutcome::Committed(Box::new(insertion)),
            None => KeyOutcome::Handled,
        }
    }
}

/// Widen `range` to the surrounding words, then to any mention it cuts into.
fn expand_to_words(doc: DocumentContext<'_>, range: Selection, space: char) -> Selection {
    let space = space.to_string();
    let plain = doc.plain_text;
    let plain_len = char_len(plain);

    let mut start = rfind_chars(slice_chars(plain, 0, range.start), &space).map_or(0, |i| i + 1);
    let mut end = find_chars(slice_chars(plain, range.end, plain_len), &space)
        .map_or(plain_len, |i| range.end + i);

    if let Some(m) = mention_at_plain_index(doc.markup, doc.registry, start) {
        start = start.min(m.plain_text_start);
    }
    if let Some(m) = mention_at_plain_index(doc.markup, doc.registry, end) {
        end = end.max(m.plain_text_end());
    }
    Selection::new(start, end)
}
