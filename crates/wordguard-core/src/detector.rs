//! Sensitive word detector.
//!
//! [`SensitiveWordDetector`] ties the dictionary store, the rebuild
//! coordinator and the risk classifier together. Detection only takes a short
//! read lock to clone the active matcher; mutations are serialized and rebuild
//! the matcher before they return.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::classifier::{Evidence, RiskClassifier};
use crate::config::DetectorConfig;
use crate::coordinator::{MatcherState, RebuildCoordinator};
use crate::dictionary::{Dictionary, DictionaryStore, Term};
use crate::error::{DetectorError, Result};
use crate::loader;
use crate::matcher::CompiledMatcher;
use crate::result::{BatchItem, BatchResult, DetectionResult};

/// Dictionary-based sensitive word detector.
pub struct SensitiveWordDetector {
    config: DetectorConfig,
    store: DictionaryStore,
    coordinator: RebuildCoordinator,
    classifier: RiskClassifier,
    /// Serializes mutations.
    writer: Mutex<()>,
    loaded: AtomicBool,
}

impl std::fmt::Debug for SensitiveWordDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensitiveWordDetector")
            .field("words", &self.store.len())
            .field("coordinator", &self.coordinator)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

impl SensitiveWordDetector {
    /// Creates a detector and loads its dictionary.
    ///
    /// Terms come from `config.dictionary_path` when set, otherwise from the
    /// bundled word list.
    pub fn new(config: DetectorConfig) -> Result<Self> {
        let terms = match config.dictionary_path.as_deref() {
            Some(path) => loader::load_word_file(path)?,
            None => loader::default_words(),
        };
        let detector = Self::unloaded(config)?;
        detector.load_words(terms)?;
        Ok(detector)
    }

    /// Creates a detector with no dictionary loaded.
    ///
    /// With `require_loaded` set, [`detect`](Self::detect) fails until
    /// [`load_words`](Self::load_words) succeeds.
    pub fn unloaded(config: DetectorConfig) -> Result<Self> {
        config.validate()?;
        let classifier =
            RiskClassifier::new(config.thresholds.clone(), config.confidence)?;

        Ok(Self {
            store: DictionaryStore::new(config.case_sensitive),
            coordinator: RebuildCoordinator::new(
                CompiledMatcher::empty(config.case_sensitive),
                config.max_terms,
            ),
            classifier,
            writer: Mutex::new(()),
            loaded: AtomicBool::new(false),
            config,
        })
    }

    /// Creates a detector over the bundled word list with default settings.
    pub fn with_default_words() -> Result<Self> {
        Self::new(DetectorConfig::default())
    }

    /// Creates a detector over an explicit word list with default severity.
    pub fn with_words<I, S>(words: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::with_terms(
            DetectorConfig::default(),
            words.into_iter().map(|w| Term::new(w.as_ref())),
        )
    }

    /// Creates a detector over explicit terms.
    pub fn with_terms<I>(config: DetectorConfig, terms: I) -> Result<Self>
    where
        I: IntoIterator<Item = Term>,
    {
        let detector = Self::unloaded(config)?;
        detector.load_words(terms)?;
        Ok(detector)
    }

    /// Creates a detector over a word list file with default settings.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(DetectorConfig::default().with_dictionary_path(path.as_ref()))
    }

    // === Detection ===

    /// Scans `text` and classifies the result.
    pub fn detect(&self, text: &str) -> Result<DetectionResult> {
        if self.config.require_loaded && !self.is_loaded() {
            return Err(DetectorError::EmptyDetector);
        }

        let text_length = text.chars().count();
        if let Some(limit) = self.config.max_input_chars {
            if text_length > limit {
                return Err(DetectorError::InputTooLarge {
                    chars: text_length,
                    limit,
                });
            }
        }

        let matcher = self.coordinator.current();
        let matches = matcher.find_all(text);
        if matches.is_empty() {
            debug!(chars = text_length, generation = matcher.generation(), "No matches");
            return Ok(DetectionResult::safe(text_length));
        }

        let evidence = Evidence::from_matches(&matches, text_length);
        let assessment = self.classifier.classify(&evidence);
        debug!(
            chars = text_length,
            matches = evidence.match_count,
            unique = evidence.unique_terms,
            level = %assessment.level,
            generation = matcher.generation(),
            "Detected sensitive terms"
        );

        Ok(DetectionResult::from_parts(
            matches,
            &evidence,
            assessment,
            text_length,
        ))
    }

    /// Runs [`detect`](Self::detect) on each text. A failing item does not
    /// affect the others.
    pub fn batch_detect<S: AsRef<str>>(&self, texts: &[S]) -> BatchResult {
        let items: Vec<BatchItem> = texts
            .iter()
            .map(|text| BatchItem::from(self.detect(text.as_ref())))
            .collect();
        BatchResult::new(items)
    }

    /// Returns true if `text` is safe to forward to a language model.
    ///
    /// Detection errors count as unsafe.
    pub fn is_safe_for_llm(&self, text: &str) -> bool {
        match self.detect(text) {
            Ok(result) => result.is_safe,
            Err(e) => {
                debug!(error = %e, "Detection failed, treating text as unsafe");
                false
            }
        }
    }

    // === Dictionary mutation ===

    /// Adds a term with default severity and rebuilds the matcher.
    ///
    /// Returns `Ok(false)` if the term was already present or blank.
    pub fn add_sensitive_word(&self, word: &str) -> Result<bool> {
        self.add_term(Term::new(word))
    }

    /// Adds a term with an explicit severity and rebuilds the matcher.
    pub fn add_term(&self, term: Term) -> Result<bool> {
        let added = self.apply(|current| {
            Ok(match current.with_term(term) {
                Some((next, inserted)) => (Some(next), inserted),
                None => (None, false),
            })
        })?;
        if added {
            info!(words = self.store.len(), "Added sensitive word");
        }
        Ok(added)
    }

    /// Removes a term and rebuilds the matcher.
    ///
    /// Returns `Ok(false)` if the term was not present.
    pub fn remove_sensitive_word(&self, word: &str) -> Result<bool> {
        let removed = self.apply(|current| {
            let next = current.without_term(word);
            let removed = next.is_some();
            Ok((next, removed))
        })?;
        if removed {
            info!(words = self.store.len(), "Removed sensitive word");
        }
        Ok(removed)
    }

    /// Replaces the dictionary and rebuilds the matcher.
    ///
    /// Returns the number of unique terms now active.
    pub fn load_words<I>(&self, terms: I) -> Result<usize>
    where
        I: IntoIterator<Item = Term>,
    {
        let require_non_empty = self.config.require_non_empty;
        let (words, raw) = self.apply(|current| {
            let next = current.replaced(terms, require_non_empty)?;
            let counts = (next.len(), next.raw_count());
            Ok((Some(next), counts))
        })?;
        self.loaded.store(true, Ordering::Release);

        info!(words, raw, "Loaded dictionary");
        Ok(words)
    }

    /// Replaces the dictionary with the contents of a word list file.
    pub fn reload_from_file(&self, path: impl AsRef<Path>) -> Result<usize> {
        let terms = loader::load_word_file(path)?;
        self.load_words(terms)
    }

    /// Stages a change against the published dictionary and publishes it once
    /// the matcher for it has compiled.
    ///
    /// `stage` returns the successor dictionary, or `None` when nothing
    /// changes. A failed compile leaves both the dictionary and the matcher
    /// as they were.
    fn apply<T>(
        &self,
        stage: impl FnOnce(&Dictionary) -> Result<(Option<Dictionary>, T)>,
    ) -> Result<T> {
        let _writer = self.writer.lock();

        let current = self.store.snapshot();
        let (next, outcome) = stage(&current)?;
        let Some(next) = next else {
            return Ok(outcome);
        };

        let next = Arc::new(next);
        self.coordinator.mark_dirty();
        if let Err(e) = self.coordinator.rebuild(&next) {
            self.coordinator.mark_stable();
            return Err(e.into());
        }
        self.store.commit(next);
        Ok(outcome)
    }

    // === Introspection ===

    /// Returns the active terms in sorted order.
    pub fn get_sensitive_words(&self) -> BTreeSet<String> {
        self.store.snapshot().words()
    }

    /// Returns the current dictionary snapshot.
    pub fn dictionary(&self) -> Arc<Dictionary> {
        self.store.snapshot()
    }

    /// Returns the number of unique active terms.
    pub fn word_count(&self) -> usize {
        self.store.len()
    }

    /// Returns the number of entries read by the last load, before dedup.
    pub fn raw_word_count(&self) -> usize {
        self.store.raw_count()
    }

    /// Returns true once a dictionary has been loaded.
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    /// Returns the generation of the active matcher.
    pub fn matcher_generation(&self) -> u64 {
        self.coordinator.current().generation()
    }

    /// Returns the rebuild state.
    pub fn rebuild_state(&self) -> MatcherState {
        self.coordinator.state()
    }

    /// Returns the configuration.
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }
}
