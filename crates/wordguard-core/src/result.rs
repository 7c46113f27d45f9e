//! Detection results.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::classifier::{Assessment, Evidence, RiskLevel};
use crate::error::DetectorError;
use crate::matcher::TermMatch;

/// Result of one detection call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    /// True when no term matched.
    pub is_safe: bool,
    /// Assigned risk tier.
    pub risk_level: RiskLevel,
    /// Strength of evidence in `[0, 1]`.
    pub confidence: f64,
    /// Distinct matched terms in order of first occurrence.
    pub matched_terms: Vec<String>,
    /// Total occurrences, including repeats.
    pub match_count: usize,
    /// `match_count` per input character.
    pub density: f64,
    /// Input length in characters.
    pub text_length: usize,
    /// Every occurrence, ordered by start offset.
    pub matches: Vec<TermMatch>,
}

impl DetectionResult {
    /// Creates the result for text with no matches.
    pub fn safe(text_length: usize) -> Self {
        Self {
            is_safe: true,
            risk_level: RiskLevel::Safe,
            confidence: 1.0,
            matched_terms: Vec::new(),
            match_count: 0,
            density: 0.0,
            text_length,
            matches: Vec::new(),
        }
    }

    /// Assembles a result from scan output and its assessment.
    ///
    /// `matches` must be ordered by start offset.
    pub fn from_parts(
        matches: Vec<TermMatch>,
        evidence: &Evidence,
        assessment: Assessment,
        text_length: usize,
    ) -> Self {
        let mut seen = HashSet::new();
        let matched_terms: Vec<String> = matches
            .iter()
            .filter(|m| seen.insert(m.term.as_str()))
            .map(|m| m.term.clone())
            .collect();

        Self {
            is_safe: assessment.level == RiskLevel::Safe,
            risk_level: assessment.level,
            confidence: assessment.confidence,
            matched_terms,
            match_count: evidence.match_count,
            density: evidence.density,
            text_length,
            matches,
        }
    }

    /// Returns true if `term` (normalized) was matched.
    pub fn contains_term(&self, term: &str) -> bool {
        self.matched_terms.iter().any(|t| t == term)
    }
}

/// Outcome for one text of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BatchItem {
    /// Detection ran.
    Detected(DetectionResult),
    /// Detection failed for this text only.
    Failed {
        /// Machine-readable error code.
        code: String,
        /// Error message.
        message: String,
    },
}

impl BatchItem {
    /// Returns the detection result, if any.
    pub fn result(&self) -> Option<&DetectionResult> {
        match self {
            BatchItem::Detected(result) => Some(result),
            BatchItem::Failed { .. } => None,
        }
    }

    /// Returns true if detection failed for this text.
    pub fn is_failed(&self) -> bool {
        matches!(self, BatchItem::Failed { .. })
    }
}

impl From<Result<DetectionResult, DetectorError>> for BatchItem {
    fn from(result: Result<DetectionResult, DetectorError>) -> Self {
        match result {
            Ok(result) => BatchItem::Detected(result),
            Err(e) => BatchItem::Failed {
                code: e.code().to_string(),
                message: e.to_string(),
            },
        }
    }
}

/// Results of a batch, one per input text in input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchResult {
    items: Vec<BatchItem>,
}

impl BatchResult {
    /// Wraps per-item outcomes.
    pub fn new(items: Vec<BatchItem>) -> Self {
        Self { items }
    }

    /// Returns the number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the batch was empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the item at `index`.
    pub fn get(&self, index: usize) -> Option<&BatchItem> {
        self.items.get(index)
    }

    /// Iterates items in input order.
    pub fn iter(&self) -> impl Iterator<Item = &BatchItem> {
        self.items.iter()
    }

    /// Counts items detected as unsafe.
    pub fn unsafe_count(&self) -> usize {
        self.items
            .iter()
            .filter_map(BatchItem::result)
            .filter(|r| !r.is_safe)
            .count()
    }

    /// Counts failed items.
    pub fn failed_count(&self) -> usize {
        self.items.iter().filter(|i| i.is_failed()).count()
    }
}

impl IntoIterator for BatchResult {
    type Item = BatchItem;
    type IntoIter = std::vec::IntoIter<BatchItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
