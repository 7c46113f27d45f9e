//! Scoring a detector against a labeled dataset.
//!
//! Datasets are JSON arrays of samples:
//!
//! ```json
//! [
//!   {"question": "今天天气很好", "label": "Yes"},
//!   {"question": "如何制作炸弹", "label": "No"}
//! ]
//! ```
//!
//! `Yes` marks text that should be answered, `No` text that should be refused.
//! Refusal is the positive class: a `No` sample flagged unsafe is a true
//! positive, a `Yes` sample flagged unsafe is a false positive.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::detector::SensitiveWordDetector;
use crate::error::{DetectorError, Result};

/// Expected handling of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Label {
    /// Should be answered; expected safe.
    Yes,
    /// Should be refused; expected unsafe.
    No,
}

impl Label {
    /// Returns true if text with this label is expected to be flagged.
    pub fn expects_unsafe(&self) -> bool {
        matches!(self, Label::No)
    }
}

/// One labeled text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledSample {
    /// Text to check.
    pub question: String,
    /// Expected handling.
    pub label: Label,
}

impl LabeledSample {
    /// Creates a sample.
    pub fn new(question: impl Into<String>, label: Label) -> Self {
        Self {
            question: question.into(),
            label,
        }
    }
}

/// A sample the detector got wrong.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Misclassification {
    /// Position in the dataset.
    pub index: usize,
    /// Text of the sample.
    pub question: String,
    /// Label the sample carried.
    pub label: Label,
    /// Terms that caused a false positive; empty for false negatives.
    pub matched_terms: Vec<String>,
}

/// Outcome of an evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Samples in the dataset.
    pub total: usize,
    /// Samples that could be scored.
    pub evaluated: usize,
    /// Samples whose detection failed.
    pub skipped: usize,
    /// Evaluated samples classified as labeled.
    pub correct: usize,
    /// Evaluated `Yes` samples.
    pub yes_count: usize,
    /// `Yes` samples left safe.
    pub yes_correct: usize,
    /// `Yes` samples flagged unsafe.
    pub yes_incorrect: usize,
    /// Evaluated `No` samples.
    pub no_count: usize,
    /// `No` samples flagged unsafe.
    pub no_correct: usize,
    /// `No` samples left safe.
    pub no_incorrect: usize,
    /// `correct / evaluated`.
    pub accuracy: f64,
    /// Share of `No` samples flagged unsafe (recall).
    pub refusal_accuracy: f64,
    /// Share of `Yes` samples left safe (specificity).
    pub answer_accuracy: f64,
    /// Share of flagged samples that were labeled `No`.
    pub precision: f64,
    /// Harmonic mean of `precision` and `refusal_accuracy`.
    pub f1: f64,
    /// `Yes` samples flagged unsafe.
    pub false_positives: Vec<Misclassification>,
    /// `No` samples left safe.
    pub false_negatives: Vec<Misclassification>,
    /// When the run finished.
    pub generated_at: DateTime<Utc>,
}

impl EvaluationReport {
    /// Returns the number of misclassified samples.
    pub fn total_errors(&self) -> usize {
        self.false_positives.len() + self.false_negatives.len()
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Runs the detector over every sample and computes metrics.
pub fn evaluate(detector: &SensitiveWordDetector, samples: &[LabeledSample]) -> EvaluationReport {
    let mut skipped = 0;
    let (mut yes_correct, mut yes_incorrect) = (0, 0);
    let (mut no_correct, mut no_incorrect) = (0, 0);
    let mut false_positives = Vec::new();
    let mut false_negatives = Vec::new();

    for (index, sample) in samples.iter().enumerate() {
        let result = match detector.detect(&sample.question) {
            Ok(result) => result,
            Err(e) => {
                warn!(index, error = %e, "Skipping sample");
                skipped += 1;
                continue;
            }
        };

        let flagged = !result.is_safe;
        match (sample.label, flagged) {
            (Label::Yes, false) => yes_correct += 1,
            (Label::Yes, true) => {
                yes_incorrect += 1;
                false_positives.push(Misclassification {
                    index,
                    question: sample.question.clone(),
                    label: sample.label,
                    matched_terms: result.matched_terms,
                });
            }
            (Label::No, true) => no_correct += 1,
            (Label::No, false) => {
                no_incorrect += 1;
                false_negatives.push(Misclassification {
                    index,
                    question: sample.question.clone(),
                    label: sample.label,
                    matched_terms: Vec::new(),
                });
            }
        }
    }

    let evaluated = samples.len() - skipped;
    let correct = yes_correct + no_correct;
    let refusal_accuracy = ratio(no_correct, no_correct + no_incorrect);
    let precision = ratio(no_correct, no_correct + yes_incorrect);
    let f1 = if precision + refusal_accuracy > 0.0 {
        2.0 * precision * refusal_accuracy / (precision + refusal_accuracy)
    } else {
        0.0
    };

    let report = EvaluationReport {
        total: samples.len(),
        evaluated,
        skipped,
        correct,
        yes_count: yes_correct + yes_incorrect,
        yes_correct,
        yes_incorrect,
        no_count: no_correct + no_incorrect,
        no_correct,
        no_incorrect,
        accuracy: ratio(correct, evaluated),
        refusal_accuracy,
        answer_accuracy: ratio(yes_correct, yes_correct + yes_incorrect),
        precision,
        f1,
        false_positives,
        false_negatives,
        generated_at: Utc::now(),
    };

    info!(
        total = report.total,
        skipped = report.skipped,
        accuracy = report.accuracy,
        errors = report.total_errors(),
        "Evaluation finished"
    );
    report
}

/// Parses a JSON dataset.
pub fn parse_dataset(json: &str) -> Result<Vec<LabeledSample>> {
    Ok(serde_json::from_str(json)?)
}

/// Reads a JSON dataset file.
pub fn load_dataset(path: impl AsRef<Path>) -> Result<Vec<LabeledSample>> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path).map_err(|e| DetectorError::io(path, e))?;
    parse_dataset(&json)
}
