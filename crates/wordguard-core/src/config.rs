//! Detector configuration.
//!
//! Configuration is a JSON document; every field is optional and falls back
//! to the defaults below.
//!
//! ```json
//! {
//!   "dictionary_path": "/etc/wordguard/words.txt",
//!   "case_sensitive": false,
//!   "thresholds": [
//!     {"level": "high", "min_unique_terms": 3, "min_density": 0.05, "combine": "any"},
//!     {"level": "medium", "min_unique_terms": 1, "min_density": 0.02, "combine": "all"},
//!     {"level": "low", "min_unique_terms": 1, "min_density": 0.0, "combine": "all"}
//!   ]
//! }
//! ```

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classifier::{ConfidenceParams, RiskThresholds};
use crate::error::{DetectorError, Result};

/// Default cap on the number of compiled terms.
pub const DEFAULT_MAX_TERMS: usize = 1_000_000;

/// Configuration file name inside the platform config directory.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Detector configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Word list to load at construction. `None` uses the bundled list.
    pub dictionary_path: Option<PathBuf>,
    /// Match terms case-sensitively.
    pub case_sensitive: bool,
    /// Reject dictionaries that end up empty after normalization.
    pub require_non_empty: bool,
    /// Refuse to detect until a dictionary has been loaded.
    pub require_loaded: bool,
    /// Maximum number of terms the matcher will compile.
    pub max_terms: usize,
    /// Maximum input length in characters; `None` means unlimited.
    pub max_input_chars: Option<usize>,
    /// Tier rules, most severe first.
    pub thresholds: RiskThresholds,
    /// Confidence curve parameters.
    pub confidence: ConfidenceParams,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            dictionary_path: None,
            case_sensitive: false,
            require_non_empty: false,
            require_loaded: false,
            max_terms: DEFAULT_MAX_TERMS,
            max_input_chars: None,
            thresholds: RiskThresholds::default(),
            confidence: ConfidenceParams::default(),
        }
    }
}

impl DetectorConfig {
    /// Parses and validates a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| DetectorError::io(path, e))?;
        let config = Self::from_json(&json)?;
        debug!(path = %path.display(), "Loaded detector config");
        Ok(config)
    }

    /// Returns the platform default config file location, if one can be determined.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "wordguard", "WordGuard")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Loads the default config file if it exists, otherwise returns defaults.
    pub fn load_or_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.is_file() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }

    /// Sets the dictionary path.
    pub fn with_dictionary_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.dictionary_path = Some(path.into());
        self
    }

    /// Sets case sensitivity.
    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// Sets the term cap.
    pub fn with_max_terms(mut self, max_terms: usize) -> Self {
        self.max_terms = max_terms;
        self
    }

    /// Sets the input length limit.
    pub fn with_max_input_chars(mut self, limit: usize) -> Self {
        self.max_input_chars = Some(limit);
        self
    }

    /// Requires a dictionary to be loaded before detection.
    pub fn with_require_loaded(mut self, required: bool) -> Self {
        self.require_loaded = required;
        self
    }

    /// Requires loaded dictionaries to be non-empty.
    pub fn with_require_non_empty(mut self, required: bool) -> Self {
        self.require_non_empty = required;
        self
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<()> {
        self.thresholds.validate()?;
        self.confidence.validate()?;
        if self.max_input_chars == Some(0) {
            return Err(DetectorError::Config(
                "max_input_chars must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::RiskLevel;
    use std::io::Write;

    #[test]
    fn defaults_match_reference_policy() {
        let config = DetectorConfig::default();
        assert!(!config.case_sensitive);
        assert_eq!(config.max_terms, DEFAULT_MAX_TERMS);
        assert!(config.max_input_chars.is_none());

        let rules = config.thresholds.rules();
        assert_eq!(rules.len(), 3);
        assert_eq!(rules[0].level, RiskLevel::High);
        assert_eq!(rules[0].min_unique_terms, 3);
        assert_eq!(rules[1].min_density, 0.02);
    }

    #[test]
    fn empty_json_uses_defaults() {
        let config = DetectorConfig::from_json("{}").unwrap();
        assert_eq!(config, DetectorConfig::default());
    }

    #[test]
    fn partial_json_overrides_fields() {
        let config = DetectorConfig::from_json(
            r#"{
                "case_sensitive": true,
                "max_input_chars": 500,
                "thresholds": [
                    {"level": "high", "min_unique_terms": 5, "min_density": 0.1, "combine": "any"},
                    {"level": "low", "min_unique_terms": 1, "min_density": 0.0}
                ]
            }"#,
        )
        .unwrap();

        assert!(config.case_sensitive);
        assert_eq!(config.max_input_chars, Some(500));
        assert_eq!(config.thresholds.rules().len(), 2);
        assert_eq!(config.thresholds.rules()[0].min_unique_terms, 5);
    }

    #[test]
    fn invalid_thresholds_rejected() {
        let err = DetectorConfig::from_json(
            r#"{"thresholds": [
                {"level": "low", "min_unique_terms": 1, "min_density": 0.0},
                {"level": "high", "min_unique_terms": 3, "min_density": 0.05}
            ]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, DetectorError::Config(_)));
    }

    #[test]
    fn malformed_json_rejected() {
        let err = DetectorConfig::from_json("{not json").unwrap_err();
        assert!(matches!(err, DetectorError::Json(_)));
    }

    #[test]
    fn zero_input_limit_rejected() {
        assert!(DetectorConfig::from_json(r#"{"max_input_chars": 0}"#).is_err());
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"dictionary_path": "/tmp/words.txt", "max_terms": 10}}"#).unwrap();

        let config = DetectorConfig::load(file.path()).unwrap();
        assert_eq!(config.dictionary_path, Some(PathBuf::from("/tmp/words.txt")));
        assert_eq!(config.max_terms, 10);
    }

    #[test]
    fn load_missing_file_names_path() {
        let err = DetectorConfig::load("/nonexistent/wordguard.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/wordguard.json"));
    }

    #[test]
    fn builders_set_fields() {
        let config = DetectorConfig::default()
            .with_dictionary_path("words.txt")
            .with_case_sensitive(true)
            .with_max_terms(5)
            .with_max_input_chars(100)
            .with_require_loaded(true)
            .with_require_non_empty(true);

        assert_eq!(config.dictionary_path, Some(PathBuf::from("words.txt")));
        assert!(config.case_sensitive);
        assert_eq!(config.max_terms, 5);
        assert_eq!(config.max_input_chars, Some(100));
        assert!(config.require_loaded);
        assert!(config.require_non_empty);
    }
}
