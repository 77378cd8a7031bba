//! Suggestion candidates and data sources.
//!
//! A candidate is either a bare string (used as both id and display) or a rich record with
//! metadata and optional nested children. Nested children are navigated in "accordion" mode by
//! the [`SuggestionSession`](crate::SuggestionSession).

use crate::placeholder::MetaData;
use crate::session::QueryResponder;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A data item offered for insertion as a mention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Candidate {
    /// A plain string used as both id and display.
    Simple(String),
    /// A candidate with a distinct display text, metadata and nested children.
    Rich {
        /// Mention id.
        id: String,
        /// Display text. Falls back to `id` when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        display: Option<String>,
        /// Metadata serialized into the `__metaData__` placeholder on insertion.
        #[serde(default, alias = "metaData", skip_serializing_if = "MetaData::is_empty")]
        meta_data: MetaData,
        /// Nested sub-candidates.
        #[serde(default, alias = "data", skip_serializing_if = "Vec::is_empty")]
        children: Vec<Candidate>,
    },
}

impl Candidate {
    /// Create a rich candidate with an id and display text.
    pub fn new(id: impl Into<String>, display: impl Into<String>) -> Self {
        Candidate::Rich {
            id: id.into(),
            display: Some(display.into()),
            meta_data: MetaData::new(),
            children: Vec::new(),
        }
    }

    /// Attach metadata (rich candidates only; simple candidates are promoted).
    pub fn with_meta_data(self, meta: MetaData) -> Self {
        match self {
            Candidate::Simple(id) => Candidate::Rich {
                id,
                display: None,
                meta_data: meta,
                children: Vec::new(),
            },
            Candidate::Rich {
                id,
                display,
                children,
                ..
            } => Candidate::Rich {
                id,
                display,
                meta_data: meta,
                children,
            },
        }
    }

    /// Attach nested children (simple candidates are promoted).
    pub fn with_children(self, children: Vec<Candidate>) -> Self {
        match self {
            Candidate::Simple(id) => Candidate::Rich {
                id,
                display: None,
                meta_data: MetaData::new(),
                children,
            },
            Candidate::Rich {
                id,
                display,
                meta_data,
                ..
            } => Candidate::Rich {
                id,
                display,
                meta_data,
                children,
            },
        }
    }

    /// Mention id.
    pub fn id(&self) -> &str {
        match self {
            Candidate::Simple(id) => id,
            Candidate::Rich { id, .. } => id,
        }
    }

    /// Display text (the id when no display is set).
    pub fn display(&self) -> &str {
        match self {
            Candidate::Simple(id) => id,
            Candidate::Rich { id, display, .. } => display.as_deref().unwrap_or(id),
        }
    }

    /// Metadata, empty for simple candidates.
    pub fn meta_data(&self) -> Option<&MetaData> {
        match self {
            Candidate::Simple(_) => None,
            Candidate::Rich { meta_data, .. } => Some(meta_data),
        }
    }

    /// Nested children.
    pub fn children(&self) -> &[Candidate] {
        match self {
            Candidate::Simple(_) => &[],
            Candidate::Rich { children, .. } => children,
        }
    }

    /// Returns `true` if the candidate has nested children.
    pub fn has_children(&self) -> bool {
        !self.children().is_empty()
    }
}

impl From<&str> for Candidate {
    fn from(value: &str) -> Self {
        Candidate::Simple(value.to_string())
    }
}

/// Supplies candidates for a query.
///
/// Return `Some(results)` to answer synchronously. Return `None` to answer later by passing the
/// `responder` back to [`SuggestionSession::deliver`](crate::SuggestionSession::deliver); a
/// late answer is dropped if a newer query has started meanwhile.
pub trait CandidateProvider: Send + Sync {
    /// Look up candidates for `query`.
    fn query(&self, query: &str, responder: QueryResponder) -> Option<Vec<Candidate>>;
}

impl<F> CandidateProvider for F
where
    F: Fn(&str, QueryResponder) -> Option<Vec<Candidate>> + Send + Sync,
{
    fn query(&self, query: &str, responder: QueryResponder) -> Option<Vec<Candidate>> {
        self(query, responder)
    }
}

/// Where a mention type gets its candidates from.
#[derive(Clone)]
pub enum DataSource {
    /// A fixed, ordered candidate list filtered by substring.
    Static(Vec<Candidate>),
    /// A host-provided lookup.
    Provider(Arc<dyn CandidateProvider>),
}

impl Default for DataSource {
    fn default() -> Self {
        DataSource::Static(Vec::new())
    }
}

impl fmt::Debug for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Static(items) => f.debug_tuple("Static").field(items).finish(),
            DataSource::Provider(_) => f.write_str("Provider(..)"),
        }
    }
}

impl DataSource {
    /// Run `query` against this source.
    pub fn query(&self, query: &str, responder: QueryResponder) -> Option<Vec<Candidate>> {
        match self {
            DataSource::Static(items) => Some(filter_candidates(items, query)),
            DataSource::Provider(provider) => provider.query(query, responder),
        }
    }

    /// The static candidate list, if any.
    pub fn static_candidates(&self) -> Option<&[Candidate]> {
        match self {
            DataSource::Static(items) => Some(items),
            DataSource::Provider(_) => None,
        }
    }
}

/// Keep the top-level candidates whose display contains `query`, ignoring case.
pub fn filter_candidates(candidates: &[Candidate], query: &str) -> Vec<Candidate> {
    let needle = query.to_lowercase();
    candidates
        .iter()
        .filter(|c| c.display().to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

/// An id-indexed view over hierarchical candidate data.
///
/// Later entries (in depth-first order) win when ids repeat. The map is rebuilt only when the
/// source data changes.
#[derive(Debug, Clone, Default)]
pub struct CandidateLookup {
    source: Option<Vec<Candidate>>,
    by_id: HashMap<String, Candidate>,
}

impl CandidateLookup {
    /// Build a lookup from `candidates`.
    pub fn new(candidates: &[Candidate]) -> Self {
        let mut lookup = Self::default();
        lookup.refresh(candidates);
        lookup
    }

    /// Rebuild the map if `candidates` differs from the data it was built from.
    ///
    /// Returns `true` when a rebuild happened.
    pub fn refresh(&mut self, candidates: &[Candidate]) -> bool {
        if self.source.as_deref() == Some(candidates) {
            return false;
        }
        self.source = Some(candidates.to_vec());
        self.by_id = flatten_candidates(candidates);
        tracing::debug!(entries = self.by_id.len(), "rebuilt candidate lookup");
        true
    }

    /// Find a candidate by id at any nesting depth.
    pub fn get(&self, id: &str) -> Option<&Candidate> {
        self.by_id.get(id)
    }

    /// Number of distinct ids.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Returns `true` if the lookup is empty.
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

fn flatten_candidates(candidates: &[Candidate]) -> HashMap<String, Candidate> {
    let mut by_id = HashMap::new();
    let mut stack: Vec<&Candidate> = candidates.iter().rev().collect();
    while let Some(candidate) = stack.pop() {
        by_id.insert(candidate.id().to_string(), candidate.clone());
        stack.extend(candidate.children().iter().rev());
    }
    by_id
}
