//! Declarative configuration.
//!
//! Mention types can be built in code with the [`MentionType`] builders, or loaded from JSON:
//!
//! ```rust
//! use mention_core::InputConfig;
//!
//! let config = InputConfig::from_json(r##"{
//!     "types": [
//!         { "trigger": "@", "markup": "@[__display__](user:__id__)",
//!           "data": [{ "id": "1", "display": "John" }, "Jane"] },
//!         { "trigger": "#", "markup": "#[__display__](tag:__id__)", "appendSpaceOnAdd": true }
//!     ],
//!     "language": "en"
//! }"##).unwrap();
//!
//! let registry = config.build_registry().unwrap();
//! assert_eq!(registry.len(), 2);
//! ```

use crate::candidates::Candidate;
use crate::placeholder::Placeholder;
use crate::registry::{ConfigError, DEFAULT_MARKUP, MentionRegistry, MentionType, Trigger};
use crate::session::SessionOptions;
use mention_core_lang::{Language, WordBoundary};
use regex::Regex;
use serde::{Deserialize, Serialize};

fn default_trigger() -> String {
    "@".to_string()
}

fn default_markup() -> String {
    DEFAULT_MARKUP.to_string()
}

/// One mention type in declarative form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MentionTypeSpec {
    /// Literal trigger.
    #[serde(default = "default_trigger")]
    pub trigger: String,
    /// Regex trigger; overrides `trigger`. Group 1 is the replaced run, group 2 the query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_pattern: Option<String>,
    /// Markup template.
    #[serde(default = "default_markup")]
    pub markup: String,
    /// Template for the plain-text display, over `__id__` and `__display__`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_template: Option<String>,
    /// Append the word-boundary space after an inserted mention.
    #[serde(default)]
    pub append_space_on_add: bool,
    /// Let the query span spaces.
    #[serde(default)]
    pub allow_space_in_query: bool,
    /// Offer suggestions for highlighted text.
    #[serde(default)]
    pub highlight_to_tag: bool,
    /// Keep the typed word as display text.
    #[serde(default)]
    pub preserve_value: bool,
    /// Resolve mention metadata from `data` by id.
    #[serde(default)]
    pub resolve_metadata_from_data: bool,
    /// Inline candidates.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<Candidate>,
}

impl Default for MentionTypeSpec {
    fn default() -> Self {
        Self {
            trigger: default_trigger(),
            trigger_pattern: None,
            markup: default_markup(),
            display_template: None,
            append_space_on_add: false,
            allow_space_in_query: false,
            highlight_to_tag: false,
            preserve_value: false,
            resolve_metadata_from_data: false,
            data: Vec::new(),
        }
    }
}

impl MentionTypeSpec {
    /// Convert into a [`MentionType`].
    pub fn build(&self) -> Result<MentionType, ConfigError> {
        let trigger = match &self.trigger_pattern {
            Some(pattern) => Trigger::Pattern(Regex::new(pattern).map_err(|source| {
                ConfigError::Regex {
                    pattern: pattern.clone(),
                    source,
                }
            })?),
            None => Trigger::Literal(self.trigger.clone()),
        };

        let mut ty = MentionType::new(trigger, self.markup.clone())
            .with_data(self.data.clone())
            .append_space_on_add(self.append_space_on_add)
            .allow_space_in_query(self.allow_space_in_query)
            .highlight_to_tag(self.highlight_to_tag)
            .preserve_value(self.preserve_value)
            .resolve_metadata_from_data(self.resolve_metadata_from_data);

        if let Some(template) = self.display_template.clone() {
            ty = ty.with_display_transform(move |id, display| {
                template
                    .replace(Placeholder::Id.token(), id)
                    .replace(Placeholder::Display.token(), display)
            });
        }
        Ok(ty)
    }
}

/// Configuration of a mention input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputConfig {
    /// Mention types in registration order.
    #[serde(default)]
    pub types: Vec<MentionTypeSpec>,
    /// Navigate nested candidates in place.
    #[serde(default)]
    pub accordion: bool,
    /// Language tag (`en`, `ja`, ...). Detected from the text when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl InputConfig {
    /// Parse a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// The configured language, if one is set.
    pub fn language(&self) -> Result<Option<Language>, ConfigError> {
        self.language
            .as_deref()
            .map(str::parse::<Language>)
            .transpose()
            .map_err(ConfigError::from)
    }

    /// Build the registry.
    pub fn build_registry(&self) -> Result<MentionRegistry, ConfigError> {
        let types = self
            .types
            .iter()
            .map(MentionTypeSpec::build)
            .collect::<Result<Vec<_>, _>>()?;
        MentionRegistry::new(types)
    }

    /// Session options for this configuration.
    pub fn session_options(&self) -> Result<SessionOptions, ConfigError> {
        let word_boundary = self
            .language()?
            .map(Language::word_boundary)
            .unwrap_or_else(WordBoundary::ascii);
        Ok(SessionOptions {
            accordion: self.accordion,
            word_boundary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let config = InputConfig::from_json(r#"{ "types": [{}] }"#).unwrap();
        assert_eq!(config.types[0], MentionTypeSpec::default());
        assert!(!config.accordion);
    }

    #[test]
    fn display_template_becomes_transform() {
        let spec = MentionTypeSpec {
            display_template: Some("@__display__".into()),
            ..MentionTypeSpec::default()
        };
        let ty = spec.build().unwrap();
        assert_eq!(ty.transform_display("1", "John"), "@John");
    }

    #[test]
    fn language_selects_word_boundary() {
        let config = InputConfig::from_json(r#"{ "language": "ja" }"#).unwrap();
        let options = config.session_options().unwrap();
        assert_eq!(options.word_boundary, WordBoundary::ideographic());

        let config = InputConfig::from_json(r#"{ "language": "xx" }"#).unwrap();
        assert!(matches!(
            config.session_options(),
            Err(ConfigError::Language(_))
        ));
    }

    #[test]
    fn bad_json_is_reported() {
        assert!(matches!(
            InputConfig::from_json("{ types: "),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn bad_trigger_pattern_is_reported() {
        let spec = MentionTypeSpec {
            trigger_pattern: Some("(".into()),
            ..MentionTypeSpec::default()
        };
        assert!(matches!(spec.build(), Err(ConfigError::Regex { .. })));
    }
}
