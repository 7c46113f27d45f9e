//! Error types for dictionary loading, matcher rebuilds and detection.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while compiling a dictionary snapshot into a matcher.
///
/// A rebuild failure never replaces the active matcher.
#[derive(Debug, Error)]
pub enum RebuildError {
    /// The snapshot holds more terms than the matcher is allowed to compile.
    #[error("dictionary has {count} terms, matcher limit is {limit}")]
    TooManyTerms {
        /// Terms in the rejected snapshot.
        count: usize,
        /// Configured `max_terms`.
        limit: usize,
    },

    /// The automaton builder rejected the pattern set.
    #[error("automaton construction failed: {0}")]
    Automaton(#[from] aho_corasick::BuildError),
}

/// Errors that can occur in detector operations.
#[derive(Debug, Error)]
pub enum DetectorError {
    /// The dictionary source is malformed or empty when a non-empty one was required.
    #[error("invalid dictionary: {0}")]
    InvalidDictionary(String),

    /// Detection was requested before any dictionary was loaded.
    #[error("detector has no dictionary loaded")]
    EmptyDetector,

    /// The matcher could not be rebuilt after a dictionary change.
    #[error("matcher rebuild failed: {0}")]
    Rebuild(#[from] RebuildError),

    /// The input exceeds the configured `max_input_chars`.
    #[error("input has {chars} characters, limit is {limit}")]
    InputTooLarge {
        /// Length of the rejected input in characters.
        chars: usize,
        /// Configured limit.
        limit: usize,
    },

    /// Reading a dictionary or config file failed.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that could not be read.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration values are out of range.
    #[error("configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DetectorError {
    /// Builds an IO error tagged with the path that failed.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns a short machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            DetectorError::InvalidDictionary(_) => "invalid_dictionary",
            DetectorError::EmptyDetector => "empty_detector",
            DetectorError::Rebuild(_) => "rebuild_failed",
            DetectorError::InputTooLarge { .. } => "input_too_large",
            DetectorError::Io { .. } => "io_error",
            DetectorError::Config(_) => "config_error",
            DetectorError::Json(_) => "json_error",
        }
    }
}

/// Result type for detector operations.
pub type Result<T> = std::result::Result<T, DetectorError>;
