//! Input State Interface
//!
//! Exposes the state of a [`MentionInput`] to a frontend in a structured, immutable manner.
//!
//! # Overview
//!
//! - **State Queries**: value, selection and suggestion snapshots
//! - **Version Tracking**: every change bumps a version number
//! - **Change Notifications**: subscribers are told about value changes, inserted mentions and
//!   suggestion updates
//!
//! # Example
//!
//! ```rust
//! use mention_core::{InputCommand, InputStateManager, MentionInput, MentionRegistry, MentionType,
//!     Selection, SessionOptions, StateChangeType};
//! use std::sync::{Arc, Mutex};
//!
//! let registry = MentionRegistry::new(vec![MentionType::default()]).unwrap();
//! let mut manager = InputStateManager::new(MentionInput::new(registry, SessionOptions::default()));
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&seen);
//! manager.subscribe(move |change| sink.lock().unwrap().push(change.change_type));
//!
//! manager
//!     .execute(InputCommand::Change { plain_text: "hi".into(), selection: Selection::caret(2) })
//!     .unwrap();
//! assert_eq!(
//!     seen.lock().unwrap().as_slice(),
//!     &[StateChangeType::ValueChanged, StateChangeType::SelectionChanged]
//! );
//! ```

use crate::commands::{CommandError, CommandResult, InputCommand, MentionInput};
use crate::scanner::Mention;
use crate::selection::Selection;
use crate::session::FocusState;

/// Value state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueState {
    /// Markup value
    pub markup: String,
    /// Plain-text view
    pub plain_text: String,
    /// Mentions in document order
    pub mentions: Vec<Mention>,
    /// Version number (incremented after each change)
    pub version: u64,
}

/// One shown suggestion row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionItem {
    /// Type that produced the row
    pub type_index: usize,
    /// Candidate id
    pub id: String,
    /// Candidate display text
    pub display: String,
    /// Number of nested children
    pub child_count: usize,
}

/// Suggestions state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionsState {
    /// Flattened rows in type-registration order
    pub items: Vec<SuggestionItem>,
    /// Keyboard focus
    pub focus: FocusState,
    /// Whether any query is still waiting for results
    pub loading: bool,
}

/// State change type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateChangeType {
    /// The markup value changed
    ValueChanged,
    /// A mention was inserted from a suggestion
    MentionAdded,
    /// The suggestion list or its focus changed
    SuggestionsChanged,
    /// The selection changed
    SelectionChanged,
}

/// State change record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChange {
    /// Change type
    pub change_type: StateChangeType,
    /// Old version number
    pub old_version: u64,
    /// New version number
    pub new_version: u64,
    /// The inserted mention, for [`StateChangeType::MentionAdded`]
    pub added: Option<AddedMention>,
}

/// A mention inserted from a suggestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddedMention {
    /// Type of the mention
    pub type_index: usize,
    /// Mention id
    pub id: String,
    /// Raw display written into the markup
    pub display: String,
}

impl StateChange {
    /// Create a change record.
    pub fn new(change_type: StateChangeType, old_version: u64, new_version: u64) -> Self {
        Self {
            change_type,
            old_version,
            new_version,
            added: None,
        }
    }

    /// Attach the inserted mention.
    pub fn with_added(mut self, added: AddedMention) -> Self {
        self.added = Some(added);
        self
    }
}

/// State change callback function type
pub type StateChangeCallback = Box<dyn FnMut(&StateChange) + Send>;

/// Wraps a [`MentionInput`] with version tracking and change notifications.
///
/// Every command goes through [`InputStateManager::execute`], which compares the state before
/// and after the command and notifies subscribers about what changed.
pub struct InputStateManager {
    input: MentionInput,
    state_version: u64,
    callbacks: Vec<StateChangeCallback>,
}

struct Fingerprint {
    markup: String,
    selection: Selection,
    suggestions: Vec<(usize, String)>,
    pending: usize,
    focus: FocusState,
}

impl InputStateManager {
    /// Wrap an input.
    pub fn new(input: MentionInput) -> Self {
        Self {
            input,
            state_version: 0,
            callbacks: Vec::new(),
        }
    }

    /// The wrapped input.
    pub fn input(&self) -> &MentionInput {
        &self.input
    }

    /// Current version.
    pub fn version(&self) -> u64 {
        self.state_version
    }

    /// Check if state has changed since a version
    pub fn has_changed_since(&self, version: u64) -> bool {
        self.state_version > version
    }

    /// Subscribe to state change notifications
    pub fn subscribe<F>(&mut self, callback: F)
    where
        F: FnMut(&StateChange) + Send + 'static,
    {
        self.callbacks.push(Box::new(callback));
    }

    /// Value snapshot.
    pub fn get_value_state(&self) -> ValueState {
        ValueState {
            markup: self.input.markup().to_string(),
            plain_text: self.input.plain_text().to_string(),
            mentions: self.input.mentions().to_vec(),
            version: self.state_version,
        }
    }

    /// Current selection.
    pub fn get_selection(&self) -> Selection {
        self.input.selection()
    }

    /// Suggestions snapshot.
    pub fn get_suggestions_state(&self) -> SuggestionsState {
        let session = self.input.session();
        SuggestionsState {
            items: session
                .flat_candidates()
                .into_iter()
                .map(|(info, candidate)| SuggestionItem {
                    type_index: info.type_index,
                    id: candidate.id().to_string(),
                    display: candidate.display().to_string(),
                    child_count: candidate.children().len(),
                })
                .collect(),
            focus: session.focus(),
            loading: session.pending().next().is_some(),
        }
    }

    /// Execute a command and notify subscribers.
    pub fn execute(&mut self, command: InputCommand) -> Result<CommandResult, CommandError> {
        let before = self.fingerprint();
        let result = self.input.execute(command)?;
        let after = self.fingerprint();

        if before.markup != after.markup {
            self.mark_modified(StateChangeType::ValueChanged, None);
        }
        if let CommandResult::Inserted {
            type_index,
            id,
            display,
            ..
        } = &result
        {
            let added = AddedMention {
                type_index: *type_index,
                id: id.clone(),
                display: display.clone(),
            };
            self.mark_modified(StateChangeType::MentionAdded, Some(added));
        }
        if (&before.suggestions, before.pending, before.focus)
            != (&after.suggestions, after.pending, after.focus)
        {
            self.mark_modified(StateChangeType::SuggestionsChanged, None);
        }
        if before.selection != after.selection {
            self.mark_modified(StateChangeType::SelectionChanged, None);
        }
        Ok(result)
    }

    fn fingerprint(&self) -> Fingerprint {
        let session = self.input.session();
        Fingerprint {
            markup: self.input.markup().to_string(),
            selection: self.input.selection(),
            suggestions: session
                .flat_candidates()
                .into_iter()
                .map(|(info, candidate)| (info.type_index, candidate.id().to_string()))
                .collect(),
            pending: session.pending().count(),
            focus: session.focus(),
        }
    }

    fn mark_modified(&mut self, change_type: StateChangeType, added: Option<AddedMention>) {
        let old_version = self.state_version;
        self.state_version += 1;
        let mut change = StateChange::new(change_type, old_version, self.state_version);
        if let Some(added) = added {
            change = change.with_added(added);
        }
        self.notify_callbacks(&change);
    }

    /// Notify all callbacks
    fn notify_callbacks(&mut self, change: &StateChange) {
        for callback in &mut self.callbacks {
            callback(change);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{MentionRegistry, MentionType};
    use crate::session::SessionOptions;
    use crate::Candidate;
    use std::sync::{Arc, Mutex};

    #[test]
    fn versions_increase_per_change() {
        let registry = MentionRegistry::new(vec![
            MentionType::default().with_data(vec![Candidate::new("1", "Ann")]),
        ])
        .unwrap();
        let mut manager =
            InputStateManager::new(MentionInput::new(registry, SessionOptions::default()));
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        manager.subscribe(move |change| {
            sink.lock()
                .unwrap()
                .push((change.change_type, change.old_version, change.new_version));
        });

        manager
            .execute(InputCommand::Change {
                plain_text: "@".into(),
                selection: Selection::caret(1),
            })
            .unwrap();

        let log = log.lock().unwrap();
        assert_eq!(
            log.as_slice(),
            &[
                (StateChangeType::ValueChanged, 0, 1),
                (StateChangeType::SuggestionsChanged, 1, 2),
                (StateChangeType::SelectionChanged, 2, 3),
            ]
        );
        assert!(manager.has_changed_since(2));
        assert_eq!(manager.get_suggestions_state().items.len(), 1);
    }
}
