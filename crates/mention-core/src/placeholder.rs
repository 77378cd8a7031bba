//! Markup template placeholders and metadata encoding.
//!
//! A markup template is literal text plus up to three placeholders:
//!
//! - `__id__` - the mention id
//! - `__display__` - the raw display text
//! - `__metaData__` - optional `key=value` pairs joined by `;`
//!
//! A template must contain `__id__` or `__display__`. Only the first occurrence of each
//! placeholder is significant.

use std::collections::BTreeMap;

/// Mention metadata: `key=value` pairs keyed by name.
pub type MetaData = BTreeMap<String, String>;

/// The placeholders a markup template may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Placeholder {
    /// `__id__`
    Id,
    /// `__display__`
    Display,
    /// `__metaData__`
    MetaData,
}

impl Placeholder {
    /// All placeholders.
    pub const ALL: [Placeholder; 3] = [Placeholder::Id, Placeholder::Display, Placeholder::MetaData];

    /// The literal token used in templates.
    pub fn token(self) -> &'static str {
        match self {
            Placeholder::Id => "__id__",
            Placeholder::Display => "__display__",
            Placeholder::MetaData => "__metaData__",
        }
    }

    /// Character offset of the first occurrence of this placeholder in `template`.
    pub fn find_in(self, template: &str) -> Option<usize> {
        crate::text::find_chars(template, self.token())
    }
}

/// Number of distinct placeholders present in `template`.
pub fn count_placeholders(template: &str) -> usize {
    Placeholder::ALL
        .iter()
        .filter(|p| template.contains(p.token()))
        .count()
}

/// The bracket pair enclosing the metadata placeholder, if it has one of its own.
///
/// Only matching pairs directly around the token count (`{__metaData__}`, `(__metaData__)`,
/// `[__metaData__]`, `<__metaData__>`). Other neighbours belong to the surrounding template.
pub fn metadata_delimiters(template: &str) -> Option<(char, char)> {
    let start = Placeholder::MetaData.find_in(template)?;
    let before = template.chars().nth(start.checked_sub(1)?)?;
    let after = template
        .chars()
        .nth(start + Placeholder::MetaData.token().chars().count())?;
    matches!(
        (before, after),
        ('{', '}') | ('(', ')') | ('[', ']') | ('<', '>')
    )
    .then_some((before, after))
}

/// Parse a metadata payload such as `role=admin;team=core`.
///
/// Segments without `=` are skipped, as are segments with an empty key or a key equal to the
/// metadata placeholder itself. Only the first `=` separates key and value.
pub fn parse_meta_data(raw: &str) -> MetaData {
    let mut meta = MetaData::new();
    for segment in raw.split(';') {
        let Some((key, value)) = segment.split_once('=') else {
            continue;
        };
        if key.is_empty() || key == Placeholder::MetaData.token() {
            continue;
        }
        meta.insert(key.to_string(), value.to_string());
    }
    meta
}

/// Serialize metadata into the `key=value;key=value` form.
pub fn serialize_meta_data(meta: &MetaData) -> String {
    meta.iter()
        .filter(|(key, _)| key.as_str() != Placeholder::MetaData.token())
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(";")
}
