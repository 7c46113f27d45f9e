//! Dictionary sources.
//!
//! Word lists are UTF-8 text with one term per line. Blank lines and lines
//! starting with `#` are skipped, surrounding whitespace is ignored, and a term
//! may carry a severity after a tab:
//!
//! ```text
//! # comment
//! 测试
//! 洗钱	severe
//! ```

use std::path::Path;

use tracing::info;

use crate::dictionary::{Severity, Term};
use crate::error::{DetectorError, Result};

/// Word list compiled into the binary.
pub const DEFAULT_WORD_LIST: &str = include_str!("../data/word_bank.txt");

/// Parses a word list.
pub fn parse_word_list(text: &str) -> Vec<Term> {
    let mut terms = Vec::new();

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let term = match raw.split_once('\t') {
            Some((word, severity)) => {
                Term::new(word.trim()).with_severity(Severity::parse(severity))
            }
            None => Term::new(line),
        };

        if !term.text.is_empty() {
            terms.push(term);
        }
    }

    terms
}

/// Reads and parses a word list file.
///
/// A file that is not valid UTF-8 is an [`DetectorError::InvalidDictionary`].
pub fn load_word_file(path: impl AsRef<Path>) -> Result<Vec<Term>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::InvalidData => {
            DetectorError::InvalidDictionary(format!("{}: not valid UTF-8", path.display()))
        }
        _ => DetectorError::io(path, e),
    })?;
    let terms = parse_word_list(&text);
    info!(path = %path.display(), entries = terms.len(), "Read word list");
    Ok(terms)
}

/// Returns the bundled word list.
pub fn default_words() -> Vec<Term> {
    parse_word_list(DEFAULT_WORD_LIST)
}

/// Reads a batch input file: one text per non-blank line, trimmed.
pub fn load_batch_file(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| DetectorError::io(path, e))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}
