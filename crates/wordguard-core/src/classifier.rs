//! Risk classification of match evidence.
//!
//! Risk tiers are decided by an ordered list of [`TierRule`]s evaluated from
//! the most severe tier down; the first rule whose predicate holds wins.
//! Text with no matched term is always [`RiskLevel::Safe`], and text with at
//! least one matched term is never safe.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DetectorError, Result};
use crate::matcher::TermMatch;

/// Discrete risk tier of a text.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// No dictionary term found.
    #[default]
    Safe,
    /// Some evidence, sparse.
    Low,
    /// Evidence with notable density.
    Medium,
    /// Many distinct terms or very dense matches.
    High,
}

impl RiskLevel {
    /// Returns the lowercase name used in output and config.
    pub fn name(&self) -> &'static str {
        match self {
            RiskLevel::Safe => "safe",
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How the two thresholds of a [`TierRule`] combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Combine {
    /// Either threshold is enough.
    Any,
    /// Both thresholds must be met.
    #[default]
    All,
}

/// A single tier predicate over unique term count and density.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierRule {
    /// Tier assigned when the rule holds.
    pub level: RiskLevel,
    /// Minimum number of distinct matched terms.
    pub min_unique_terms: usize,
    /// Minimum match density (occurrences per character).
    pub min_density: f64,
    /// How the two thresholds combine.
    #[serde(default)]
    pub combine: Combine,
}

impl TierRule {
    /// Creates a rule that holds when either threshold is met.
    pub fn any(level: RiskLevel, min_unique_terms: usize, min_density: f64) -> Self {
        Self {
            level,
            min_unique_terms,
            min_density,
            combine: Combine::Any,
        }
    }

    /// Creates a rule that holds when both thresholds are met.
    pub fn all(level: RiskLevel, min_unique_terms: usize, min_density: f64) -> Self {
        Self {
            level,
            min_unique_terms,
            min_density,
            combine: Combine::All,
        }
    }

    /// Checks the rule against the evidence.
    pub fn is_satisfied(&self, evidence: &Evidence) -> bool {
        let terms_ok = evidence.unique_terms >= self.min_unique_terms;
        let density_ok = evidence.density >= self.min_density;
        match self.combine {
            Combine::Any => terms_ok || density_ok,
            Combine::All => terms_ok && density_ok,
        }
    }
}

/// Ordered tier rules, most severe first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RiskThresholds {
    rules: Vec<TierRule>,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            rules: vec![
                TierRule::any(RiskLevel::High, 3, 0.05),
                TierRule::all(RiskLevel::Medium, 1, 0.02),
                TierRule::all(RiskLevel::Low, 1, 0.0),
            ],
        }
    }
}

impl RiskThresholds {
    /// Creates thresholds from a rule list. The list is validated.
    pub fn new(rules: Vec<TierRule>) -> Result<Self> {
        let thresholds = Self { rules };
        thresholds.validate()?;
        Ok(thresholds)
    }

    /// Returns the rules in evaluation order.
    pub fn rules(&self) -> &[TierRule] {
        &self.rules
    }

    /// Checks that rules are ordered strictly from the most severe tier down,
    /// never assign `safe`, and use densities within `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        let mut previous: Option<RiskLevel> = None;
        for rule in &self.rules {
            if rule.level == RiskLevel::Safe {
                return Err(DetectorError::Config(
                    "tier rules cannot assign the safe level".to_string(),
                ));
            }
            if !(0.0..=1.0).contains(&rule.min_density) {
                return Err(DetectorError::Config(format!(
                    "min_density for {} must be within [0, 1], got {}",
                    rule.level, rule.min_density
                )));
            }
            if let Some(prev) = previous {
                if rule.level >= prev {
                    return Err(DetectorError::Config(format!(
                        "tier rules must be ordered from high to low ({} follows {})",
                        rule.level, prev
                    )));
                }
            }
            previous = Some(rule.level);
        }
        Ok(())
    }
}

/// Parameters of the confidence curve.
///
/// `confidence = 1 - exp(-(term_weight * weighted_terms + density_weight * density))`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceParams {
    /// Contribution of each unit of severity-weighted distinct terms.
    pub term_weight: f64,
    /// Contribution of match density.
    pub density_weight: f64,
}

impl Default for ConfidenceParams {
    fn default() -> Self {
        Self {
            term_weight: 0.6,
            density_weight: 20.0,
        }
    }
}

impl ConfidenceParams {
    /// Rejects negative or non-finite weights.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("term_weight", self.term_weight),
            ("density_weight", self.density_weight),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(DetectorError::Config(format!(
                    "{} must be a finite non-negative number, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Match evidence extracted from one scan.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Evidence {
    /// Total occurrences, including repeats.
    pub match_count: usize,
    /// Distinct matched terms.
    pub unique_terms: usize,
    /// `match_count / text length in chars`, 0 for empty text.
    pub density: f64,
    /// Sum of the severity weights of the distinct matched terms.
    pub severity_weight: f64,
}

impl Evidence {
    /// Collects evidence from scan results over a text of `text_chars` characters.
    pub fn from_matches(matches: &[TermMatch], text_chars: usize) -> Self {
        let mut seen = HashSet::new();
        let mut severity_weight = 0.0;
        for m in matches {
            if seen.insert(m.term.as_str()) {
                severity_weight += m.severity.weight();
            }
        }

        let density = if text_chars == 0 {
            0.0
        } else {
            matches.len() as f64 / text_chars as f64
        };

        Self {
            match_count: matches.len(),
            unique_terms: seen.len(),
            density,
            severity_weight,
        }
    }
}

/// Outcome of classifying one piece of evidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    /// Assigned tier.
    pub level: RiskLevel,
    /// Strength of evidence in `[0, 1]`.
    pub confidence: f64,
}

/// Deterministic risk classifier.
#[derive(Debug, Clone, Default)]
pub struct RiskClassifier {
    thresholds: RiskThresholds,
    confidence: ConfidenceParams,
}

impl RiskClassifier {
    /// Creates a classifier after validating its parameters.
    pub fn new(thresholds: RiskThresholds, confidence: ConfidenceParams) -> Result<Self> {
        thresholds.validate()?;
        confidence.validate()?;
        Ok(Self {
            thresholds,
            confidence,
        })
    }

    /// Classifies evidence into a tier and a confidence score.
    pub fn classify(&self, evidence: &Evidence) -> Assessment {
        if evidence.unique_terms == 0 {
            // Exact matching: no hit means no doubt
            return Assessment {
                level: RiskLevel::Safe,
                confidence: 1.0,
            };
        }

        let level = self
            .thresholds
            .rules
            .iter()
            .find(|rule| rule.is_satisfied(evidence))
            .map(|rule| rule.level)
            .unwrap_or(RiskLevel::Low);

        Assessment {
            level,
            confidence: self.confidence_for(evidence),
        }
    }

    /// Saturating confidence curve; monotone in terms, severity and density.
    fn confidence_for(&self, evidence: &Evidence) -> f64 {
        let score = self.confidence.term_weight * evidence.severity_weight
            + self.confidence.density_weight * evidence.density;
        (1.0 - (-score).exp()).clamp(0.0, 1.0)
    }
}
