#![warn(missing_docs)]
//! `mention-core-lang` - data-driven word-boundary configuration for `mention-core`.
//!
//! This crate intentionally stays lightweight and has no dependencies. It provides small
//! structs that hosts can use to configure how the mention kernel finds word boundaries
//! (for highlight-to-tag selections and preserved query words) and which space character it
//! appends after an inserted mention.
//!
//! Locale-specific segmentation is out of scope: a language is reduced to a single space
//! character plus a flag telling whether words are separated by that character at all.

use std::fmt;
use std::str::FromStr;

/// The language family used to pick word-boundary rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    /// Space-separated scripts (the default). Words are split on `' '`.
    #[default]
    Latin,
    /// Japanese text. Uses the ideographic space `'\u{3000}'` and does not split words.
    Japanese,
}

impl Language {
    /// Returns the BCP-47-ish tag used by [`Language::from_str`].
    pub fn tag(self) -> &'static str {
        match self {
            Language::Latin => "en-US",
            Language::Japanese => "ja",
        }
    }

    /// Word-boundary rules for this language.
    pub fn word_boundary(self) -> WordBoundary {
        match self {
            Language::Latin => WordBoundary::ascii(),
            Language::Japanese => WordBoundary::ideographic(),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Error returned when a language tag is not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLanguage(pub String);

impl fmt::Display for UnknownLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown language tag '{}'", self.0)
    }
}

impl std::error::Error for UnknownLanguage {}

impl FromStr for Language {
    type Err = UnknownLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase().replace('_', "-");
        if lower == "ja" || lower.starts_with("ja-") {
            return Ok(Language::Japanese);
        }
        if lower == "en" || lower.starts_with("en-") || lower == "latin" {
            return Ok(Language::Latin);
        }
        Err(UnknownLanguage(s.to_string()))
    }
}

/// Word-boundary rules for one editing session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordBoundary {
    /// The character that separates words and is appended after inserted mentions.
    pub space: char,
    /// Whether text is segmented into words by [`WordBoundary::space`].
    ///
    /// When `false`, highlighted selections are used as-is and trigger detection does not
    /// require whitespace before the trigger.
    pub segmented: bool,
}

impl Default for WordBoundary {
    fn default() -> Self {
        Self::ascii()
    }
}

impl WordBoundary {
    /// Space-separated words using an ASCII space.
    pub fn ascii() -> Self {
        Self {
            space: ' ',
            segmented: true,
        }
    }

    /// Unsegmented text using the ideographic space (`U+3000`).
    pub fn ideographic() -> Self {
        Self {
            space: '\u{3000}',
            segmented: false,
        }
    }

    /// A custom single-character delimiter.
    pub fn custom(space: char, segmented: bool) -> Self {
        Self { space, segmented }
    }

    /// Returns `true` if `ch` is the configured space character.
    pub fn is_space(&self, ch: char) -> bool {
        ch == self.space
    }
}

/// Returns `true` for characters from the Japanese ranges (CJK punctuation, kana, full-width
/// forms, common kanji and a few symbols typed through Japanese input methods).
pub fn is_japanese_char(ch: char) -> bool {
    matches!(ch,
        '\u{3000}'..='\u{303F}'
        | '\u{3040}'..='\u{309F}'
        | '\u{30A0}'..='\u{30FF}'
        | '\u{FF00}'..='\u{FFEF}'
        | '\u{4E00}'..='\u{9FAF}'
        | '\u{2605}'..='\u{2606}'
        | '\u{2190}'..='\u{2195}'
        | '\u{203B}')
}

/// Guess the language of `text`.
///
/// Any Japanese character switches the result to [`Language::Japanese`].
pub fn detect_language(text: &str) -> Language {
    if text.chars().any(is_japanese_char) {
        Language::Japanese
    } else {
        Language::Latin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_japanese() {
        assert_eq!(detect_language("hello"), Language::Latin);
        assert_eq!(detect_language("こんにちは @山田"), Language::Japanese);
        assert_eq!(detect_language("note ※"), Language::Japanese);
    }

    #[test]
    fn parses_tags() {
        assert_eq!("ja".parse::<Language>(), Ok(Language::Japanese));
        assert_eq!("ja_JP".parse::<Language>(), Ok(Language::Japanese));
        assert_eq!("en_US".parse::<Language>(), Ok(Language::Latin));
        assert!("fr".parse::<Language>().is_err());
    }

    #[test]
    fn word_boundaries() {
        let ja = Language::Japanese.word_boundary();
        assert_eq!(ja.space, '\u{3000}');
        assert!(!ja.segmented);
        assert!(Language::Latin.word_boundary().is_space(' '));
    }
}
