//! Dictionary store for sensitive terms.
//!
//! Terms are normalized at ingestion (trimmed, and lowercased unless the
//! store is case-sensitive) and deduplicated by their normalized value.
//! The store hands out immutable [`Dictionary`] snapshots; every mutation
//! builds a new snapshot and swaps it in, so a snapshot never changes
//! after it has been observed.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{DetectorError, Result};

/// Severity of a term, used as its evidence weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Mild severity (weight: 0.5).
    Mild,
    /// Moderate severity (weight: 1.0).
    #[default]
    Moderate,
    /// Strong severity (weight: 1.5).
    Strong,
    /// Severe (weight: 2.0).
    Severe,
}

impl Severity {
    /// Returns the evidence weight for this severity.
    pub fn weight(&self) -> f64 {
        match self {
            Severity::Mild => 0.5,
            Severity::Moderate => 1.0,
            Severity::Strong => 1.5,
            Severity::Severe => 2.0,
        }
    }

    /// Returns a human-readable name for this severity.
    pub fn name(&self) -> &'static str {
        match self {
            Severity::Mild => "mild",
            Severity::Moderate => "moderate",
            Severity::Strong => "strong",
            Severity::Severe => "severe",
        }
    }

    /// Parses a severity word, falling back to [`Severity::Moderate`].
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "mild" | "low" => Severity::Mild,
            "moderate" | "medium" => Severity::Moderate,
            "strong" | "high" => Severity::Strong,
            "severe" | "critical" => Severity::Severe,
            _ => Severity::Moderate,
        }
    }
}

/// A single dictionary entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    /// Term text. Normalized once stored in a [`Dictionary`].
    pub text: String,
    /// Severity weight of the term.
    #[serde(default)]
    pub severity: Severity,
}

impl Term {
    /// Creates a term with the default severity.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            severity: Severity::default(),
        }
    }

    /// Sets the severity.
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }
}

/// Normalizes a raw term. Returns `None` for empty or whitespace-only input.
pub fn normalize_term(raw: &str, case_sensitive: bool) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if case_sensitive {
        Some(trimmed.to_string())
    } else {
        Some(fold_case(trimmed))
    }
}

/// Normalizes input text the same way terms were normalized, without trimming.
pub fn normalize_text(text: &str, case_sensitive: bool) -> Cow<'_, str> {
    if case_sensitive || text.chars().all(|c| c.to_lowercase().eq(std::iter::once(c))) {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(fold_case(text))
    }
}

/// Lowercases one character at a time.
///
/// `str::to_lowercase` maps a capital sigma by its position in a word, so the
/// same characters could fold differently in a term and in the text around it.
fn fold_case(s: &str) -> String {
    s.chars().flat_map(char::to_lowercase).collect()
}

/// Immutable point-in-time set of terms, unique by normalized text.
#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    terms: BTreeMap<String, Term>,
    raw_count: usize,
    case_sensitive: bool,
    generation: u64,
}

impl Dictionary {
    /// Creates an empty dictionary.
    pub fn empty(case_sensitive: bool) -> Self {
        Self {
            case_sensitive,
            ..Self::default()
        }
    }

    /// Builds a dictionary from raw terms, normalizing and deduplicating them.
    ///
    /// When the same normalized term appears twice, the higher severity wins.
    pub fn from_terms<I>(terms: I, case_sensitive: bool) -> Self
    where
        I: IntoIterator<Item = Term>,
    {
        let mut dict = Self::empty(case_sensitive);
        for term in terms {
            if let Some(key) = normalize_term(&term.text, case_sensitive) {
                dict.raw_count += 1;
                dict.insert_normalized(key, term.severity);
            }
        }
        dict
    }

    /// Returns the successor of this dictionary with `term` added, or `None`
    /// if nothing would change.
    ///
    /// The flag is true if the term is new. Raising the severity of an
    /// existing term yields a successor with the flag false.
    pub fn with_term(&self, term: Term) -> Option<(Dictionary, bool)> {
        let key = normalize_term(&term.text, self.case_sensitive)?;
        if let Some(existing) = self.terms.get(&key) {
            if existing.severity >= term.severity {
                return None;
            }
        }

        let mut next = self.successor();
        let inserted = next.insert_normalized(key, term.severity);
        Some((next, inserted))
    }

    /// Returns the successor of this dictionary without `term`, or `None` if
    /// the term is absent.
    pub fn without_term(&self, term: &str) -> Option<Dictionary> {
        let key = normalize_term(term, self.case_sensitive)?;
        if !self.terms.contains_key(&key) {
            return None;
        }

        let mut next = self.successor();
        next.terms.remove(&key);
        Some(next)
    }

    /// Returns a successor holding only `terms`.
    ///
    /// Fails with [`DetectorError::InvalidDictionary`] if no term survives
    /// normalization and `require_non_empty` is set.
    pub fn replaced<I>(&self, terms: I, require_non_empty: bool) -> Result<Dictionary>
    where
        I: IntoIterator<Item = Term>,
    {
        let mut next = Dictionary::from_terms(terms, self.case_sensitive);
        if require_non_empty && next.is_empty() {
            return Err(DetectorError::InvalidDictionary(
                "no terms left after normalization".to_string(),
            ));
        }
        next.generation = self.generation + 1;
        Ok(next)
    }

    fn successor(&self) -> Dictionary {
        let mut next = self.clone();
        next.generation += 1;
        next
    }

    fn insert_normalized(&mut self, key: String, severity: Severity) -> bool {
        match self.terms.get_mut(&key) {
            Some(existing) => {
                if severity > existing.severity {
                    existing.severity = severity;
                }
                false
            }
            None => {
                self.terms.insert(
                    key.clone(),
                    Term {
                        text: key,
                        severity,
                    },
                );
                true
            }
        }
    }

    /// Returns the number of unique terms.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Returns true if the dictionary has no terms.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Returns the number of non-blank entries supplied by the last load,
    /// before deduplication.
    pub fn raw_count(&self) -> usize {
        self.raw_count
    }

    /// Returns true if terms are matched case-sensitively.
    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Returns the generation number of this snapshot.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns true if the (raw) term is present after normalization.
    pub fn contains(&self, term: &str) -> bool {
        normalize_term(term, self.case_sensitive)
            .map(|key| self.terms.contains_key(&key))
            .unwrap_or(false)
    }

    /// Looks up a term by its raw text.
    pub fn get(&self, term: &str) -> Option<&Term> {
        normalize_term(term, self.case_sensitive).and_then(|key| self.terms.get(&key))
    }

    /// Iterates terms in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &Term> {
        self.terms.values()
    }

    /// Returns the normalized term texts.
    pub fn words(&self) -> BTreeSet<String> {
        self.terms.keys().cloned().collect()
    }
}

/// Thread-safe holder of the published [`Dictionary`].
///
/// Changes are staged on a private successor (see [`Dictionary::with_term`])
/// and only become visible through [`commit`](Self::commit). Readers holding
/// an older `Arc<Dictionary>` are never affected.
#[derive(Debug)]
pub struct DictionaryStore {
    current: RwLock<Arc<Dictionary>>,
}

impl DictionaryStore {
    /// Creates an empty store.
    pub fn new(case_sensitive: bool) -> Self {
        Self {
            current: RwLock::new(Arc::new(Dictionary::empty(case_sensitive))),
        }
    }

    /// Returns the published snapshot.
    pub fn snapshot(&self) -> Arc<Dictionary> {
        Arc::clone(&self.current.read())
    }

    /// Publishes a new snapshot.
    pub fn commit(&self, next: Arc<Dictionary>) {
        *self.current.write() = next;
    }

    /// Returns true if the term is present.
    pub fn contains(&self, term: &str) -> bool {
        self.current.read().contains(term)
    }

    /// Returns the number of unique terms.
    pub fn len(&self) -> usize {
        self.current.read().len()
    }

    /// Returns true if the store has no terms.
    pub fn is_empty(&self) -> bool {
        self.current.read().is_empty()
    }

    /// Returns the raw count of the last load.
    pub fn raw_count(&self) -> usize {
        self.current.read().raw_count
    }

    /// Returns the generation of the published snapshot.
    pub fn generation(&self) -> u64 {
        self.current.read().generation
    }
}
