//! Mention type registry and markup regex compiler.
//!
//! Each [`MentionType`] describes one kind of mention: how it is triggered while typing, how it
//! is written into the markup document, and where its candidates come from. A
//! [`MentionRegistry`] validates an ordered list of types and compiles all of their markup
//! templates into a single alternation, so that one left-to-right regex pass finds every
//! mention of every type.
//!
//! # Capture layout
//!
//! Every per-type pattern is wrapped in its own capturing group. Inside that group the
//! placeholders appear as capture groups in the order they occur in the template. The registry
//! records the index of each type's wrapper group, which lets [`MentionRegistry::decode`]
//! attribute any combined match to the type that produced it.

use crate::candidates::{Candidate, CandidateProvider, DataSource};
use crate::placeholder::{
    MetaData, Placeholder, count_placeholders, metadata_delimiters, parse_meta_data,
};
use mention_core_lang::WordBoundary;
use regex::{Captures, Regex};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Template used when a type does not specify one.
pub const DEFAULT_MARKUP: &str = "@[__display__](__id__)";

/// Maps `(id, raw_display)` to the text shown in the plain-text view.
pub type DisplayTransform = Arc<dyn Fn(&str, &str) -> String + Send + Sync>;

/// Errors raised while registering mention types.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("the markup '{markup}' of type {type_index} contains neither '__id__' nor '__display__'")]
    /// The template has no `__id__`/`__display__` placeholder.
    MissingPlaceholder {
        /// Offending type.
        type_index: usize,
        /// Offending template.
        markup: String,
    },

    #[error("types {first} and {second} share the markup '{markup}'")]
    /// Two types use the same template; the later one could never match.
    AmbiguousMarkup {
        /// First type using the template.
        first: usize,
        /// Later type using the template.
        second: usize,
        /// The shared template.
        markup: String,
    },

    #[error("type {type_index} has an empty trigger")]
    /// A literal trigger is empty.
    EmptyTrigger {
        /// Offending type.
        type_index: usize,
    },

    #[error("trigger pattern '{pattern}' of type {type_index} needs two capture groups")]
    /// A trigger pattern does not expose the replaced run and the query as groups 1 and 2.
    InvalidTriggerPattern {
        /// Offending type.
        type_index: usize,
        /// Offending pattern.
        pattern: String,
    },

    #[error("regex compile error for pattern '{pattern}': {source}")]
    /// A generated pattern failed to compile.
    Regex {
        /// The pattern string.
        pattern: String,
        /// The compiler error.
        #[source]
        source: regex::Error,
    },

    #[error("invalid configuration: {0}")]
    /// A declarative configuration could not be parsed.
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    /// A language tag was not recognized.
    Language(#[from] mention_core_lang::UnknownLanguage),
}

/// What starts a query for a mention type.
#[derive(Debug, Clone)]
pub enum Trigger {
    /// A literal prefix such as `@` or `#`.
    Literal(String),
    /// A custom pattern. Group 1 is the run replaced on insertion, group 2 is the query.
    Pattern(Regex),
}

impl Trigger {
    /// The literal trigger text, if this is a literal trigger.
    pub fn literal(&self) -> Option<&str> {
        match self {
            Trigger::Literal(s) => Some(s),
            Trigger::Pattern(_) => None,
        }
    }
}

impl From<&str> for Trigger {
    fn from(value: &str) -> Self {
        Trigger::Literal(value.to_string())
    }
}

impl From<char> for Trigger {
    fn from(value: char) -> Self {
        Trigger::Literal(value.to_string())
    }
}

impl From<Regex> for Trigger {
    fn from(value: Regex) -> Self {
        Trigger::Pattern(value)
    }
}

/// Configuration for one kind of mention.
#[derive(Clone)]
pub struct MentionType {
    /// What starts a query.
    pub trigger: Trigger,
    /// Markup template (see [`crate::placeholder`]).
    pub markup: String,
    /// Candidate source.
    pub data: DataSource,
    /// Append the word-boundary space after an inserted mention.
    pub append_space_on_add: bool,
    /// Allow whitespace inside the query after the trigger.
    pub allow_space_in_query: bool,
    /// Treat a highlighted range as the query target.
    pub highlight_to_tag: bool,
    /// Dispatch empty queries and keep the typed word as display text on insertion.
    pub preserve_value: bool,
    /// Fill missing mention metadata from the candidate with the same id.
    pub resolve_metadata_from_data: bool,
    display_transform: Option<DisplayTransform>,
}

impl fmt::Debug for MentionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MentionType")
            .field("trigger", &self.trigger)
            .field("markup", &self.markup)
            .field("data", &self.data)
            .field("append_space_on_add", &self.append_space_on_add)
            .field("allow_space_in_query", &self.allow_space_in_query)
            .field("highlight_to_tag", &self.highlight_to_tag)
            .field("preserve_value", &self.preserve_value)
            .field("resolve_metadata_from_data", &self.resolve_metadata_from_data)
            .field("display_transform", &self.display_transform.is_some())
            .finish()
    }
}

impl MentionType {
    /// Create a type with the given trigger and markup template.
    pub fn new(trigger: impl Into<Trigger>, markup: impl Into<String>) -> Self {
        Self {
            trigger: trigger.into(),
            markup: markup.into(),
            data: DataSource::default(),
            append_space_on_add: false,
            allow_space_in_query: false,
            highlight_to_tag: false,
            preserve_value: false,
            resolve_metadata_from_data: false,
            display_transform: None,
        }
    }

    /// Use a fixed candidate list.
    pub fn with_data(mut self, candidates: Vec<Candidate>) -> Self {
        self.data = DataSource::Static(candidates);
        self
    }

    /// Use a host-provided candidate lookup.
    pub fn with_provider(mut self, provider: impl CandidateProvider + 'static) -> Self {
        self.data = DataSource::Provider(Arc::new(provider));
        self
    }

    /// Set the display transform.
    pub fn with_display_transform(
        mut self,
        transform: impl Fn(&str, &str) -> String + Send + Sync + 'static,
    ) -> Self {
        self.display_transform = Some(Arc::new(transform));
        self
    }

    /// Set [`MentionType::append_space_on_add`].
    pub fn append_space_on_add(mut self, value: bool) -> Self {
        self.append_space_on_add = value;
        self
    }

    /// Set [`MentionType::allow_space_in_query`].
    pub fn allow_space_in_query(mut self, value: bool) -> Self {
        self.allow_space_in_query = value;
        self
    }

    /// Set [`MentionType::highlight_to_tag`].
    pub fn highlight_to_tag(mut self, value: bool) -> Self {
        self.highlight_to_tag = value;
        self
    }

    /// Set [`MentionType::preserve_value`].
    pub fn preserve_value(mut self, value: bool) -> Self {
        self.preserve_value = value;
        self
    }

    /// Set [`MentionType::resolve_metadata_from_data`].
    pub fn resolve_metadata_from_data(mut self, value: bool) -> Self {
        self.resolve_metadata_from_data = value;
        self
    }

    /// Apply the display transform (identity on the raw display by default).
    pub fn transform_display(&self, id: &str, raw_display: &str) -> String {
        match &self.display_transform {
            Some(transform) => transform(id, raw_display),
            None => raw_display.to_string(),
        }
    }
}

impl Default for MentionType {
    fn default() -> Self {
        Self::new("@", DEFAULT_MARKUP)
    }
}

/// Capture-group ranks of the placeholders inside one type's wrapper group (1-based).
#[derive(Debug, Clone, Copy)]
struct FieldGroups {
    id: usize,
    display: usize,
    meta_data: Option<usize>,
}

/// How to pull `key=value` payloads out of the captured metadata run.
#[derive(Debug, Clone)]
enum MetaExtractor {
    /// The run is a repetition of delimited segments; group 1 of the regex is one payload.
    Delimited(Regex),
    /// The run is the payload itself.
    Raw,
}

impl MetaExtractor {
    fn extract(&self, run: &str) -> MetaData {
        match self {
            MetaExtractor::Raw => parse_meta_data(run),
            MetaExtractor::Delimited(segment) => {
                let mut meta = MetaData::new();
                for caps in segment.captures_iter(run) {
                    if let Some(payload) = caps.get(1) {
                        meta.extend(parse_meta_data(payload.as_str()));
                    }
                }
                meta
            }
        }
    }
}

#[derive(Debug, Clone)]
struct CompiledType {
    group_offset: usize,
    fields: FieldGroups,
    meta: Option<MetaExtractor>,
    trigger_segmented: Regex,
    trigger_unsegmented: Regex,
}

/// A mention decoded from one combined-regex match, before positions are attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DecodedMention {
    pub(crate) type_index: usize,
    pub(crate) id: String,
    pub(crate) raw_display: String,
    pub(crate) meta_data: MetaData,
}

/// A validated, compiled, ordered list of mention types.
#[derive(Debug, Clone)]
pub struct MentionRegistry {
    types: Vec<MentionType>,
    compiled: Vec<CompiledType>,
    combined: Option<Regex>,
}

impl MentionRegistry {
    /// Validate and compile `types`.
    ///
    /// The position of a type in `types` is its `type_index`.
    pub fn new(types: Vec<MentionType>) -> Result<Self, ConfigError> {
        let mut compiled = Vec::with_capacity(types.len());
        let mut alternatives = Vec::with_capacity(types.len());
        // Group 0 is the whole match; the first wrapper group is 1.
        let mut group_offset = 1;

        for (type_index, ty) in types.iter().enumerate() {
            if let Some(first) = types[..type_index]
                .iter()
                .position(|other| other.markup == ty.markup)
            {
                return Err(ConfigError::AmbiguousMarkup {
                    first,
                    second: type_index,
                    markup: ty.markup.clone(),
                });
            }

            let (pattern, fields, meta) = compile_markup(type_index, &ty.markup)?;
            let (trigger_segmented, trigger_unsegmented) = compile_trigger(type_index, ty)?;
            alternatives.push(format!("({pattern})"));
            compiled.push(CompiledType {
                group_offset,
                fields,
                meta,
                trigger_segmented,
                trigger_unsegmented,
            });
            group_offset += 1 + count_placeholders(&ty.markup);
        }

        let combined = if alternatives.is_empty() {
            None
        } else {
            Some(build_regex(alternatives.join("|"))?)
        };

        tracing::debug!(
            types = types.len(),
            groups = group_offset,
            "compiled mention registry"
        );

        Ok(Self {
            types,
            compiled,
            combined,
        })
    }

    /// The registered types in order.
    pub fn types(&self) -> &[MentionType] {
        &self.types
    }

    /// The type at `type_index`.
    pub fn get(&self, type_index: usize) -> Option<&MentionType> {
        self.types.get(type_index)
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns `true` if no type is registered.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// The combined markup regex, or `None` for an empty registry.
    pub fn markup_regex(&self) -> Option<&Regex> {
        self.combined.as_ref()
    }

    /// Trigger regex of a type for the given word-boundary rules.
    pub fn trigger_regex(&self, type_index: usize, boundary: &WordBoundary) -> Option<&Regex> {
        self.compiled.get(type_index).map(|c| {
            if boundary.segmented {
                &c.trigger_segmented
            } else {
                &c.trigger_unsegmented
            }
        })
    }

    /// All static candidates of all types, in registration order.
    pub fn static_candidates(&self) -> Vec<Candidate> {
        self.types
            .iter()
            .filter_map(|ty| ty.data.static_candidates())
            .flat_map(|items| items.iter().cloned())
            .collect()
    }

    /// Attribute a combined match to its type and extract its fields.
    pub(crate) fn decode(&self, caps: &Captures<'_>) -> Option<DecodedMention> {
        let (type_index, compiled) = self
            .compiled
            .iter()
            .enumerate()
            .find(|(_, c)| caps.get(c.group_offset).is_some())?;

        let group = |rank: usize| {
            caps.get(compiled.group_offset + rank)
                .map(|m| m.as_str())
                .unwrap_or("")
        };
        let id = group(compiled.fields.id).to_string();
        let raw_display = group(compiled.fields.display).to_string();
        let meta_data = match (&compiled.meta, compiled.fields.meta_data) {
            (Some(extractor), Some(rank)) => extractor.extract(group(rank)),
            _ => MetaData::new(),
        };

        Some(DecodedMention {
            type_index,
            id,
            raw_display,
            meta_data,
        })
    }
}

fn build_regex(pattern: String) -> Result<Regex, ConfigError> {
    Regex::new(&pattern).map_err(|source| ConfigError::Regex { pattern, source })
}

fn char_after(markup: &str, placeholder: Placeholder) -> Option<char> {
    let start = placeholder.find_in(markup)?;
    markup
        .chars()
        .nth(start + placeholder.token().chars().count())
}

fn escape_char(ch: char) -> String {
    regex::escape(ch.encode_utf8(&mut [0; 4]))
}

/// A lazy, non-empty run bounded by the character following the placeholder.
fn bounded_group(after: Option<char>) -> String {
    match after {
        Some(ch) => format!("([^{}]+?)", escape_char(ch)),
        None => r"([\s\S]+?)".to_string(),
    }
}

fn compile_markup(
    type_index: usize,
    markup: &str,
) -> Result<(String, FieldGroups, Option<MetaExtractor>), ConfigError> {
    let id_pos = Placeholder::Id.find_in(markup);
    let display_pos = Placeholder::Display.find_in(markup);
    let meta_pos = Placeholder::MetaData.find_in(markup);

    if id_pos.is_none() && display_pos.is_none() {
        return Err(ConfigError::MissingPlaceholder {
            type_index,
            markup: markup.to_string(),
        });
    }

    let mut present: Vec<(usize, Placeholder)> = [
        (id_pos, Placeholder::Id),
        (display_pos, Placeholder::Display),
        (meta_pos, Placeholder::MetaData),
    ]
    .into_iter()
    .filter_map(|(pos, p)| pos.map(|pos| (pos, p)))
    .collect();
    present.sort();
    let rank = |p: Placeholder| present.iter().position(|(_, q)| *q == p).map(|i| i + 1);

    let id_rank = rank(Placeholder::Id);
    let display_rank = rank(Placeholder::Display);
    let fields = FieldGroups {
        id: id_rank.or(display_rank).unwrap_or(1),
        display: display_rank.or(id_rank).unwrap_or(1),
        meta_data: rank(Placeholder::MetaData),
    };

    let mut pattern = regex::escape(markup);
    for p in [Placeholder::Display, Placeholder::Id] {
        if markup.contains(p.token()) {
            pattern = pattern.replacen(p.token(), &bounded_group(char_after(markup, p)), 1);
        }
    }

    let mut meta = None;
    if meta_pos.is_some() {
        let token = Placeholder::MetaData.token();
        let after = char_after(markup, Placeholder::MetaData);
        match (metadata_delimiters(markup), after) {
            (Some((b, a)), _) => {
                let (b, a) = (escape_char(b), escape_char(a));
                let segment = format!("{b}([^{a}]*){a}");
                pattern = pattern.replacen(
                    &format!("{b}{token}{a}"),
                    &format!("((?:{b}[^{a}]*{a})*)"),
                    1,
                );
                meta = Some(MetaExtractor::Delimited(build_regex(segment)?));
            }
            (_, Some(a)) => {
                pattern = pattern.replacen(token, &format!("([^{}]*)", escape_char(a)), 1);
                meta = Some(MetaExtractor::Raw);
            }
            (_, None) => {
                pattern = pattern.replacen(token, r"([\s\S]*?)", 1);
                meta = Some(MetaExtractor::Raw);
            }
        }
    }

    Ok((pattern, fields, meta))
}

fn compile_trigger(type_index: usize, ty: &MentionType) -> Result<(Regex, Regex), ConfigError> {
    match &ty.trigger {
        Trigger::Pattern(re) => {
            if re.captures_len() < 3 {
                return Err(ConfigError::InvalidTriggerPattern {
                    type_index,
                    pattern: re.as_str().to_string(),
                });
            }
            Ok((re.clone(), re.clone()))
        }
        Trigger::Literal(trigger) => {
            if trigger.is_empty() {
                return Err(ConfigError::EmptyTrigger { type_index });
            }
            let escaped = regex::escape(trigger);
            let class: String = trigger.chars().map(escape_char).collect();
            let space = if ty.allow_space_in_query { "" } else { r"\s" };
            let body = format!("({escaped}([^{space}{class}]*))$");
            Ok((
                build_regex(format!(r"(?:^|\s){body}"))?,
                build_regex(body)?,
            ))
        }
    }
}
