//! Command interface.
//!
//! [`MentionInput`] is the single entry point a host drives. It owns the markup value, the
//! registry and the suggestion session, and turns host events ([`InputCommand`]) into document
//! and session updates.
//!
//! # Example
//!
//! ```rust
//! use mention_core::{
//!     Candidate, CommandResult, InputCommand, MentionInput, MentionRegistry, MentionType,
//!     Selection, SessionOptions,
//! };
//!
//! let registry = MentionRegistry::new(vec![
//!     MentionType::new("@", "@[__display__](user:__id__)")
//!         .with_data(vec![Candidate::new("1", "John"), Candidate::new("2", "Jane")]),
//! ])
//! .unwrap();
//! let mut input = MentionInput::new(registry, SessionOptions::default());
//!
//! input
//!     .execute(InputCommand::Change {
//!         plain_text: "Hi @Ja".to_string(),
//!         selection: Selection::caret(6),
//!     })
//!     .unwrap();
//! assert_eq!(input.session().suggestion_count(), 1);
//!
//! let result = input.execute(InputCommand::SelectCandidate(0)).unwrap();
//! assert!(matches!(result, CommandResult::Inserted { .. }));
//! assert_eq!(input.markup(), "Hi @[Jane](user:2)");
//! assert_eq!(input.plain_text(), "Hi Jane");
//! ```

use crate::candidates::{Candidate, CandidateLookup};
use crate::config::InputConfig;
use crate::index_map::{Correction, map_markup_index, map_plain_text_index};
use crate::insertion::Insertion;
use crate::projection::{Projection, plain_text, project_with_lookup};
use crate::reconcile::{
    SelectionDelta, adjust_selection_after_change, markup_for_selection, reconcile_edit,
    replace_selection,
};
use crate::registry::{ConfigError, MentionRegistry};
use crate::scanner::Mention;
use crate::selection::Selection;
use crate::session::{
    DocumentContext, Key, KeyOutcome, QueryResponder, SessionOptions, SuggestionSession,
};
use crate::text::{char_len, slice_chars, splice};
use mention_core_lang::{Language, detect_language};
use thiserror::Error;

/// A host event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputCommand {
    /// The user edited the plain-text view.
    Change {
        /// The full plain text after the edit.
        plain_text: String,
        /// Selection after the edit.
        selection: Selection,
    },
    /// The selection moved.
    Select(Selection),
    /// A navigation key was pressed.
    Key(Key),
    /// A top-level candidate was clicked (flattened index).
    SelectCandidate(usize),
    /// A child of the open candidate was clicked.
    SelectChild(usize),
    /// A provider answered a query.
    DeliverResults {
        /// The responder the provider was handed.
        responder: QueryResponder,
        /// The candidates found.
        results: Vec<Candidate>,
    },
    /// An input-method composition started.
    CompositionStart,
    /// An input-method composition ended.
    CompositionEnd,
    /// The input lost focus.
    Blur,
    /// Copy the selection.
    Copy,
    /// Copy the selection and remove it.
    Cut,
    /// Paste over the selection.
    Paste {
        /// Plain-text clipboard content.
        text: String,
        /// Markup clipboard content, when the clipboard came from a mention input.
        markup: Option<String>,
    },
    /// Replace the whole value with new markup.
    SetValue(String),
}

/// What a command produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// Success, no return value.
    Success,
    /// The host should process the key itself.
    KeyIgnored,
    /// The selection the host should show.
    Selection(Selection),
    /// The value changed.
    Changed {
        /// Selection after the change.
        selection: Selection,
        /// Mentions removed as a whole by the change.
        removed: Vec<Mention>,
    },
    /// A mention was inserted.
    Inserted {
        /// Type of the new mention.
        type_index: usize,
        /// Id of the new mention.
        id: String,
        /// Raw display written into the markup.
        display: String,
        /// Caret after the mention.
        caret: usize,
    },
    /// Results were delivered; `accepted` is `false` for superseded queries.
    Delivered {
        /// Whether the results were applied.
        accepted: bool,
    },
    /// Clipboard content for copy and cut.
    Clipboard {
        /// Plain text of the selection.
        plain_text: String,
        /// Markup of the selection, widened to whole mentions.
        markup: String,
    },
}

/// Errors raised by [`MentionInput::execute`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("selection {start}..{end} is outside the text (length {len})")]
    /// A selection reaches past the end of the plain text.
    InvalidSelection {
        /// Selection start.
        start: usize,
        /// Selection end.
        end: usize,
        /// Plain-text length.
        len: usize,
    },

    #[error("no candidate at index {index} ({count} shown)")]
    /// A candidate index is out of range.
    NoSuchCandidate {
        /// Requested index.
        index: usize,
        /// Number of shown candidates.
        count: usize,
    },

    #[error("no candidate is open")]
    /// A child was selected while no candidate is open.
    NoOpenCandidate,

    #[error("unknown mention type {0}")]
    /// A responder names a type that is not registered.
    UnknownType(usize),
}

/// A mention input: markup value, registry and suggestion session.
#[derive(Debug)]
pub struct MentionInput {
    markup: String,
    projection: Projection,
    registry: MentionRegistry,
    lookup: CandidateLookup,
    session: SuggestionSession,
    language: Option<Language>,
}

impl MentionInput {
    /// Create an empty input.
    pub fn new(registry: MentionRegistry, options: SessionOptions) -> Self {
        let lookup = CandidateLookup::new(&registry.static_candidates());
        Self {
            markup: String::new(),
            projection: Projection::default(),
            registry,
            lookup,
            session: SuggestionSession::new(options),
            language: None,
        }
    }

    /// Create an input from a declarative configuration.
    pub fn from_config(config: &InputConfig) -> Result<Self, ConfigError> {
        let registry = config.build_registry()?;
        let mut input = Self::new(registry, config.session_options()?);
        input.language = config.language()?;
        Ok(input)
    }

    /// Set the initial markup value.
    pub fn with_value(mut self, markup: impl Into<String>) -> Self {
        self.set_value(markup.into());
        self
    }

    /// Pin the language instead of detecting it from the text.
    pub fn with_language(mut self, language: Language) -> Self {
        self.language = Some(language);
        self.session.set_word_boundary(language.word_boundary());
        self
    }

    /// The markup value.
    pub fn markup(&self) -> &str {
        &self.markup
    }

    /// The plain-text view.
    pub fn plain_text(&self) -> &str {
        &self.projection.plain_text
    }

    /// Mentions of the value.
    pub fn mentions(&self) -> &[Mention] {
        &self.projection.mentions
    }

    /// The registry.
    pub fn registry(&self) -> &MentionRegistry {
        &self.registry
    }

    /// The suggestion session.
    pub fn session(&self) -> &SuggestionSession {
        &self.session
    }

    /// Current selection (caret at the end when none was reported).
    pub fn selection(&self) -> Selection {
        self.session
            .selection()
            .unwrap_or_else(|| Selection::caret(self.projection.plain_len()))
    }

    /// The candidate lookup used for metadata resolution.
    pub fn lookup(&self) -> &CandidateLookup {
        &self.lookup
    }

    /// Replace the candidate data used for metadata resolution.
    pub fn set_lookup_data(&mut self, candidates: &[Candidate]) {
        if self.lookup.refresh(candidates) {
            self.reproject();
        }
    }

    /// Execute a command.
    pub fn execute(&mut self, command: InputCommand) -> Result<CommandResult, CommandError> {
        match command {
            InputCommand::Change {
                plain_text,
                selection,
            } => Ok(self.change(&plain_text, selection)),
            InputCommand::Select(selection) => self.select(selection),
            InputCommand::Key(key) => Ok(self.key(key)),
            InputCommand::SelectCandidate(index) => self.select_candidate(index),
            InputCommand::SelectChild(index) => self.select_child(index),
            InputCommand::DeliverResults { responder, results } => {
                if responder.type_index >= self.registry.len() {
                    return Err(CommandError::UnknownType(responder.type_index));
                }
                let accepted = self.session.deliver(responder, results);
                Ok(CommandResult::Delivered { accepted })
            }
            InputCommand::CompositionStart => {
                self.session.composition_start();
                Ok(CommandResult::Success)
            }
            InputCommand::CompositionEnd => {
                self.session.composition_end();
                let selection = self.selection();
                let (doc, session) = self.parts();
                session.update_queries(doc, selection);
                Ok(CommandResult::Success)
            }
            InputCommand::Blur => {
                self.session.clear();
                Ok(CommandResult::Success)
            }
            InputCommand::Copy => Ok(self.clipboard()),
            InputCommand::Cut => Ok(self.cut()),
            InputCommand::Paste { text, markup } => Ok(self.paste(&text, markup.as_deref())),
            InputCommand::SetValue(markup) => {
                self.set_value(markup);
                Ok(CommandResult::Success)
            }
        }
    }

    /// Execute several commands, stopping at the first error.
    pub fn execute_batch(
        &mut self,
        commands: Vec<InputCommand>,
    ) -> Result<Vec<CommandResult>, CommandError> {
        commands
            .into_iter()
            .map(|command| self.execute(command))
            .collect()
    }

    fn parts(&mut self) -> (DocumentContext<'_>, &mut SuggestionSession) {
        let doc = DocumentContext {
            markup: &self.markup,
            plain_text: &self.projection.plain_text,
            registry: &self.registry,
            lookup: Some(&self.lookup),
        };
        (doc, &mut self.session)
    }

    fn reproject(&mut self) {
        self.projection = project_with_lookup(&self.markup, &self.registry, Some(&self.lookup));
        if self.language.is_none() {
            let detected = detect_language(&self.projection.plain_text);
            self.session.set_word_boundary(detected.word_boundary());
        }
    }

    fn set_value(&mut self, markup: String) {
        self.markup = markup;
        self.session.clear();
        self.reproject();
        self.session
            .set_selection(Some(Selection::caret(self.projection.plain_len())));
    }

    fn change(&mut self, new_plain_text: &str, selection: Selection) -> CommandResult {
        let before = self.selection();
        let delta = SelectionDelta::new(before, selection.normalized().end);
        let reconciled = reconcile_edit(&self.markup, new_plain_text, delta, &self.registry);
        let adjusted = if reconciled.removed.is_empty() {
            selection
        } else {
            adjust_selection_after_change(&self.markup, &self.registry, before, selection)
        };

        self.markup = reconciled.markup;
        self.reproject();

        let plain_len = self.projection.plain_len();
        let adjusted = Selection::new(adjusted.start.min(plain_len), adjusted.end.min(plain_len));
        self.session.set_selection(Some(adjusted));
        if !self.session.is_composing() {
            let (doc, session) = self.parts();
            session.update_queries(doc, adjusted);
        }

        CommandResult::Changed {
            selection: adjusted,
            removed: reconciled.removed,
        }
    }

    fn select(&mut self, selection: Selection) -> Result<CommandResult, CommandError> {
        let len = self.projection.plain_len();
        if selection.start > len || selection.end > len {
            return Err(CommandError::InvalidSelection {
                start: selection.start,
                end: selection.end,
                len,
            });
        }
        let (doc, session) = self.parts();
        let shown = session.handle_select(doc, selection).unwrap_or(selection);
        Ok(CommandResult::Selection(shown))
    }

    fn key(&mut self, key: Key) -> CommandResult {
        let (doc, session) = self.parts();
        match session.handle_key(doc, key) {
            KeyOutcome::Ignored => CommandResult::KeyIgnored,
            KeyOutcome::Handled => CommandResult::Success,
            KeyOutcome::Committed(insertion) => self.apply_insertion(*insertion),
        }
    }

    fn select_candidate(&mut self, index: usize) -> Result<CommandResult, CommandError> {
        let count = self.session.suggestion_count();
        if index >= count {
            return Err(CommandError::NoSuchCandidate { index, count });
        }
        let (doc, session) = self.parts();
        Ok(match session.select_candidate(doc, index) {
            Some(insertion) => self.apply_insertion(insertion),
            None => CommandResult::Success,
        })
    }

    fn select_child(&mut self, index: usize) -> Result<CommandResult, CommandError> {
        let open = self
            .session
            .focus()
            .open_index
            .ok_or(CommandError::NoOpenCandidate)?;
        let count = self
            .session
            .flat_candidates()
            .get(open)
            .map_or(0, |(_, c)| c.children().len());
        if index >= count {
            return Err(CommandError::NoSuchCandidate { index, count });
        }
        let (doc, session) = self.parts();
        Ok(match session.select_child(doc, index) {
            Some(insertion) => self.apply_insertion(insertion),
            None => CommandResult::Success,
        })
    }

    fn apply_insertion(&mut self, insertion: Insertion) -> CommandResult {
        self.markup = insertion.markup;
        self.projection = Projection {
            plain_text: insertion.plain_text,
            mentions: insertion.mentions,
        };
        self.session
            .set_selection(Some(Selection::caret(insertion.caret)));
        CommandResult::Inserted {
            type_index: insertion.type_index,
            id: insertion.id,
            display: insertion.display,
            caret: insertion.caret,
        }
    }

    fn clipboard(&self) -> CommandResult {
        let selection = self.selection().normalized();
        CommandResult::Clipboard {
            plain_text: slice_chars(&self.projection.plain_text, selection.start, selection.end)
                .to_string(),
            markup: markup_for_selection(&self.markup, &self.registry, selection),
        }
    }

    fn cut(&mut self) -> CommandResult {
        let clipboard = self.clipboard();
        let selection = self.selection().normalized();
        if !selection.is_collapsed() {
            self.splice_markup(selection, "");
        }
        clipboard
    }

    fn paste(&mut self, text: &str, markup: Option<&str>) -> CommandResult {
        let selection = self.selection().normalized();
        match markup {
            Some(markup) => {
                let before = self.projection.mentions.clone();
                self.splice_markup(selection, markup);
                let removed = before
                    .into_iter()
                    .filter(|m| m.overlaps_plain_range(selection.start, selection.end))
                    .collect();
                CommandResult::Changed {
                    selection: self.selection(),
                    removed,
                }
            }
            None => {
                let text = text.replace('\r', "");
                let new_plain = splice(
                    &self.projection.plain_text,
                    selection.start,
                    selection.end,
                    &text,
                );
                let caret = selection.start + char_len(&text);
                self.change(&new_plain, Selection::caret(caret))
            }
        }
    }

    fn splice_markup(&mut self, selection: Selection, insert_markup: &str) {
        let start =
            map_plain_text_index(&self.markup, &self.registry, selection.start, Correction::Start)
                .and_then(|p| {
                    map_markup_index(&self.markup, &self.registry, p.offset, Correction::Start)
                })
                .unwrap_or(selection.start);
        self.markup = replace_selection(&self.markup, &self.registry, selection, insert_markup);
        self.session.clear();
        self.reproject();
        let inserted = char_len(&plain_text(&insert_markup.replace('\r', ""), &self.registry));
        self.session
            .set_selection(Some(Selection::caret(start + inserted)));
    }
}
