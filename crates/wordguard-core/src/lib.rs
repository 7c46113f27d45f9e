//! WordGuard Core - dictionary-based sensitive word detection.
//!
//! This crate provides:
//!
//! - A normalized, copy-on-write term dictionary
//! - Multi-pattern matching over an Aho-Corasick automaton
//! - Risk tiering (safe/low/medium/high) with a confidence score
//! - Live dictionary updates with atomic matcher swaps
//! - Scoring against labeled datasets
//!
//! # Example
//!
//! ```no_run
//! use wordguard_core::{RiskLevel, SensitiveWordDetector};
//!
//! let detector = SensitiveWordDetector::with_default_words().unwrap();
//!
//! let result = detector.detect("这是一个测试文本").unwrap();
//! assert!(!result.is_safe);
//! assert!(result.matched_terms.contains(&"测试".to_string()));
//!
//! detector.add_sensitive_word("新敏感词").unwrap();
//! assert!(!detector.is_safe_for_llm("含有新敏感词的句子"));
//!
//! let batch = detector.batch_detect(&["今天天气很好", "这是一个测试文本"]);
//! assert_eq!(batch.get(0).unwrap().result().unwrap().risk_level, RiskLevel::Safe);
//! ```

pub mod classifier;
pub mod config;
pub mod coordinator;
pub mod detector;
pub mod dictionary;
pub mod error;
pub mod evaluation;
pub mod loader;
pub mod matcher;
pub mod result;

pub use classifier::{
    Assessment, Combine, ConfidenceParams, Evidence, RiskClassifier, RiskLevel, RiskThresholds,
    TierRule,
};
pub use config::DetectorConfig;
pub use coordinator::{MatcherState, RebuildCoordinator};
pub use detector::SensitiveWordDetector;
pub use dictionary::{Dictionary, DictionaryStore, Severity, Term};
pub use error::{DetectorError, RebuildError, Result};
pub use evaluation::{evaluate, EvaluationReport, Label, LabeledSample};
pub use matcher::{CompiledMatcher, TermMatch};
pub use result::{BatchItem, BatchResult, DetectionResult};
