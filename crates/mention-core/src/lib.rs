#![warn(missing_docs)]
//! Mention Core - Headless Mention Engine for Text Inputs
//!
//! # Overview
//!
//! `mention-core` keeps a *markup* string as the source of truth for a text input that contains
//! atomic mentions (`@[John](user:1)`), while the user edits a *plain-text* view of it (`John`).
//! It does not render anything; the host feeds it edits, selection changes and keys, and shows
//! the plain text and the suggestion list it produces.
//!
//! # Core Features
//!
//! - **Configurable Markup**: templates with `__id__`, `__display__` and `__metaData__`
//!   placeholders, several mention types per input
//! - **Projection and Index Mapping**: plain text, mention positions and offset conversion in
//!   both directions
//! - **Edit Reconciliation**: plain-text edits are applied to the markup; mentions are deleted
//!   as a whole when touched
//! - **Suggestion Sessions**: trigger detection, stale-result protection, keyboard navigation
//!   with nested (accordion) candidates
//! - **State Tracking**: version numbers and change notifications
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Command Interface & State Management       │  ← Public API
//! ├─────────────────────────────────────────────┤
//! │  Suggestion Session & Insertion             │  ← Querying / committing
//! ├─────────────────────────────────────────────┤
//! │  Edit Reconciliation                        │  ← Plain-text edits → markup
//! ├─────────────────────────────────────────────┤
//! │  Projection & Index Mapping                 │  ← Coordinate spaces
//! ├─────────────────────────────────────────────┤
//! │  Markup Scanner                             │  ← Segmentation
//! ├─────────────────────────────────────────────┤
//! │  Mention Registry (compiled patterns)       │  ← Configuration
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ## Working with markup directly
//!
//! ```rust
//! use mention_core::{Correction, MentionRegistry, MentionType, map_plain_text_index, plain_text};
//!
//! let registry =
//!     MentionRegistry::new(vec![MentionType::new("@", "@[__display__](user:__id__)")]).unwrap();
//!
//! let markup = "Hi @[John](user:1)!";
//! assert_eq!(plain_text(markup, &registry), "Hi John!");
//!
//! // Offset 5 lies inside "John"; snap it to the end of the mention's markup.
//! let pos = map_plain_text_index(markup, &registry, 5, Correction::End).unwrap();
//! assert_eq!(pos.offset, 18);
//! ```
//!
//! ## Using the command interface
//!
//! See [`MentionInput`] and [`InputStateManager`].
//!
//! # Module Description
//!
//! - [`placeholder`] - Template placeholders and metadata encoding
//! - [`registry`] - Mention types and compiled patterns
//! - [`scanner`] - Markup segmentation
//! - [`projection`] - Plain-text projection
//! - [`index_map`] - Offset conversion between plain text and markup
//! - [`reconcile`] - Edit reconciliation, copy and paste
//! - [`candidates`] - Candidates and data sources
//! - [`session`] - Suggestion session
//! - [`insertion`] - Mention insertion
//! - [`config`] - Declarative configuration
//! - [`commands`] - Unified command interface
//! - [`state`] - State management and change notifications
//!
//! # Unicode Support
//!
//! All offsets count Unicode scalar values (`char`s), in both coordinate spaces.

pub mod candidates;
pub mod commands;
pub mod config;
pub mod index_map;
pub mod insertion;
pub mod placeholder;
pub mod projection;
pub mod reconcile;
pub mod registry;
pub mod scanner;
mod selection;
pub mod session;
pub mod state;
mod text;

pub use candidates::{Candidate, CandidateLookup, CandidateProvider, DataSource, filter_candidates};
pub use commands::{CommandError, CommandResult, InputCommand, MentionInput};
pub use config::{InputConfig, MentionTypeSpec};
pub use index_map::{Correction, MarkupPosition, map_markup_index, map_plain_text_index};
pub use insertion::{Insertion, compose_insertion, make_mention_markup};
pub use placeholder::{
    MetaData, Placeholder, metadata_delimiters, parse_meta_data, serialize_meta_data,
};
pub use projection::{
    Projection, end_of_last_mention, mention_at_plain_index, mentions, plain_text, project,
    project_with_lookup,
};
pub use reconcile::{
    Reconciliation, SelectionDelta, adjust_selection_after_change, apply_change_to_value,
    markup_for_selection, reconcile_edit, replace_selection,
};
pub use registry::{
    ConfigError, DEFAULT_MARKUP, DisplayTransform, MentionRegistry, MentionType, Trigger,
};
pub use scanner::{LiteralSpan, MarkupScanner, Mention, Segment, scan};
pub use selection::Selection;
pub use session::{
    DocumentContext, FocusState, Key, KeyOutcome, QueryInfo, QueryPhase, QueryResponder,
    ReplaceTarget, SessionOptions, SuggestionSession, TypeSuggestions,
};
pub use state::{
    AddedMention, InputStateManager, StateChange, StateChangeCallback, StateChangeType,
    SuggestionItem, SuggestionsState, ValueState,
};
pub use text::{char_len, slice_chars, splice};

pub use mention_core_lang::{Language, WordBoundary};
