//! Multi-pattern matching engine.
//!
//! A [`CompiledMatcher`] is an Aho-Corasick automaton built from one
//! [`Dictionary`] snapshot. A single left-to-right scan reports every
//! occurrence of every term, including overlapping and nested ones
//! (`"ab"` and `"abc"` both match `"xabcx"`).
//!
//! Compilation is linear in the total length of the terms; a scan is linear in
//! the input length plus the number of reported matches.

use aho_corasick::{AhoCorasick, MatchKind};
use serde::{Deserialize, Serialize};

use crate::dictionary::{normalize_text, Dictionary, Severity, Term};
use crate::error::RebuildError;

/// One occurrence of a term in the scanned text.
///
/// Offsets refer to the normalized text, which equals the input unless
/// case folding changed the byte length of some character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermMatch {
    /// The matched (normalized) term.
    pub term: String,
    /// Severity of the matched term.
    pub severity: Severity,
    /// Byte offset of the first byte of the match.
    pub start: usize,
    /// Byte offset one past the last byte of the match.
    pub end: usize,
    /// Character offset of the start of the match.
    pub char_start: usize,
}

/// Immutable automaton compiled from a dictionary snapshot.
pub struct CompiledMatcher {
    /// `None` when the dictionary is empty.
    automaton: Option<AhoCorasick>,
    /// Terms indexed by automaton pattern ID.
    patterns: Vec<Term>,
    case_sensitive: bool,
    generation: u64,
}

impl std::fmt::Debug for CompiledMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledMatcher")
            .field("terms", &self.patterns.len())
            .field("case_sensitive", &self.case_sensitive)
            .field("generation", &self.generation)
            .finish()
    }
}

impl CompiledMatcher {
    /// Creates a matcher that never matches.
    pub fn empty(case_sensitive: bool) -> Self {
        Self {
            automaton: None,
            patterns: Vec::new(),
            case_sensitive,
            generation: 0,
        }
    }

    /// Compiles a dictionary snapshot.
    ///
    /// Fails if the snapshot holds more than `max_terms` terms or if the
    /// automaton cannot be built.
    pub fn compile(dictionary: &Dictionary, max_terms: usize) -> Result<Self, RebuildError> {
        if dictionary.len() > max_terms {
            return Err(RebuildError::TooManyTerms {
                count: dictionary.len(),
                limit: max_terms,
            });
        }

        let patterns: Vec<Term> = dictionary.iter().cloned().collect();
        let automaton = if patterns.is_empty() {
            None
        } else {
            // Standard semantics are required for overlapping iteration
            let automaton = AhoCorasick::builder()
                .match_kind(MatchKind::Standard)
                .build(patterns.iter().map(|t| t.text.as_str()))?;
            Some(automaton)
        };

        Ok(Self {
            automaton,
            patterns,
            case_sensitive: dictionary.case_sensitive(),
            generation: dictionary.generation(),
        })
    }

    /// Returns every term occurrence in `text`, ordered by start offset
    /// (ties broken by shorter match first).
    pub fn find_all(&self, text: &str) -> Vec<TermMatch> {
        let Some(automaton) = self.automaton.as_ref() else {
            return Vec::new();
        };
        if text.is_empty() {
            return Vec::new();
        }

        let haystack = normalize_text(text, self.case_sensitive);
        let mut spans: Vec<(usize, usize, usize)> = automaton
            .find_overlapping_iter(haystack.as_ref())
            .map(|m| (m.start(), m.end(), m.pattern().as_usize()))
            .collect();
        spans.sort_unstable();

        // Single forward walk to turn byte offsets into char offsets
        let mut matches = Vec::with_capacity(spans.len());
        let mut chars_seen = 0;
        let mut byte_pos = 0;
        for (start, end, pattern) in spans {
            chars_seen += haystack[byte_pos..start].chars().count();
            byte_pos = start;

            let term = &self.patterns[pattern];
            matches.push(TermMatch {
                term: term.text.clone(),
                severity: term.severity,
                start,
                end,
                char_start: chars_seen,
            });
        }
        matches
    }

    /// Returns true if any term occurs in `text`.
    pub fn is_match(&self, text: &str) -> bool {
        match self.automaton.as_ref() {
            Some(automaton) => automaton.is_match(normalize_text(text, self.case_sensitive).as_ref()),
            None => false,
        }
    }

    /// Returns the number of compiled terms.
    pub fn term_count(&self) -> usize {
        self.patterns.len()
    }

    /// Returns true if no terms were compiled.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Returns the generation of the dictionary snapshot this matcher was built from.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(words: &[&str]) -> CompiledMatcher {
        let dict = Dictionary::from_terms(words.iter().map(|w| Term::new(*w)), false);
        CompiledMatcher::compile(&dict, usize::MAX).unwrap()
    }

    fn found(m: &CompiledMatcher, text: &str) -> Vec<(String, usize)> {
        m.find_all(text)
            .into_iter()
            .map(|tm| (tm.term, tm.start))
            .collect()
    }

    fn expect(pairs: &[(&str, usize)]) -> Vec<(String, usize)> {
        pairs.iter().map(|(t, s)| (t.to_string(), *s)).collect()
    }

    // === Basic Matching ===

    #[test]
    fn finds_single_term() {
        let m = matcher(&["测试"]);
        let matches = m.find_all("这是一个测试文本");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].term, "测试");
        assert_eq!(matches[0].char_start, 4);
        assert_eq!(matches[0].start, 12);
        assert_eq!(matches[0].end, 18);
    }

    #[test]
    fn no_match_in_clean_text() {
        let m = matcher(&["测试", "危险词汇"]);
        assert!(m.find_all("今天天气很好").is_empty());
        assert!(!m.is_match("今天天气很好"));
    }

    #[test]
    fn reports_every_repeat() {
        let m = matcher(&["ab"]);
        assert_eq!(
            found(&m, "ab ab ab"),
            expect(&[("ab", 0), ("ab", 3), ("ab", 6)])
        );
    }

    // === Overlap Handling ===

    #[test]
    fn nested_terms_both_reported() {
        let m = matcher(&["ab", "abc"]);
        assert_eq!(found(&m, "xabcx"), expect(&[("ab", 1), ("abc", 1)]));
    }

    #[test]
    fn overlapping_terms_reported() {
        let m = matcher(&["abc", "bcd", "c"]);
        assert_eq!(
            found(&m, "abcd"),
            expect(&[("abc", 0), ("bcd", 1), ("c", 2)])
        );
    }

    #[test]
    fn self_overlapping_term() {
        let m = matcher(&["aa"]);
        assert_eq!(found(&m, "aaa"), expect(&[("aa", 0), ("aa", 1)]));
    }

    // === Case Handling ===

    #[test]
    fn case_insensitive_by_default() {
        let m = matcher(&["BadWord"]);
        assert_eq!(found(&m, "a BADWORD here"), expect(&[("badword", 2)]));
    }

    /// Every occurrence of every term in the folded text, found by brute force.
    fn naive_scan(dict: &Dictionary, text: &str) -> Vec<(String, usize)> {
        let folded = normalize_text(text, dict.case_sensitive());
        let haystack: &str = &folded;
        let mut hits: Vec<(String, usize)> = haystack
            .char_indices()
            .flat_map(|(i, _)| {
                dict.words()
                    .into_iter()
                    .filter(move |term| haystack[i..].starts_with(term.as_str()))
                    .map(move |term| (term, i))
            })
            .collect();
        hits.sort_by_key(|(term, start)| (*start, term.len()));
        hits
    }

    #[test]
    fn agrees_with_naive_scan_on_mixed_case() {
        let dict = Dictionary::from_terms(
            ["ΟΣ", "Σ", "ΣΟΣ", "BadWord", "ab"].into_iter().map(Term::new),
            false,
        );
        let m = CompiledMatcher::compile(&dict, usize::MAX).unwrap();

        for text in ["ΟΣΑ", "ΟΣ ", "ΣΟΣ", "a BADWORD ab", "ΟΣ BadWordΣ ΑΒ"] {
            assert_eq!(found(&m, text), naive_scan(&dict, text), "text: {text}");
        }
        assert!(m.is_match("ΟΣΑ"));
    }

    #[test]
    fn case_sensitive_matcher_is_exact() {
        let dict = Dictionary::from_terms(vec![Term::new("Secret")], true);
        let m = CompiledMatcher::compile(&dict, 10).unwrap();
        assert!(m.find_all("secret").is_empty());
        assert_eq!(m.find_all("Secret").len(), 1);
    }

    // === Edge Cases ===

    #[test]
    fn empty_input_has_no_matches() {
        let m = matcher(&["a"]);
        assert!(m.find_all("").is_empty());
    }

    #[test]
    fn empty_dictionary_never_matches() {
        let m = matcher(&[]);
        assert!(m.is_empty());
        assert!(m.find_all("anything at all").is_empty());
        assert!(!m.is_match("anything"));
    }

    #[test]
    fn char_offsets_track_mixed_scripts() {
        let m = matcher(&["词", "x"]);
        let matches = m.find_all("a词bx");
        assert_eq!(matches[0].char_start, 1);
        assert_eq!(matches[1].char_start, 3);
    }

    #[test]
    fn compile_respects_term_limit() {
        let dict = Dictionary::from_terms(vec![Term::new("a"), Term::new("b")], false);
        let err = CompiledMatcher::compile(&dict, 1).unwrap_err();
        assert!(matches!(err, RebuildError::TooManyTerms { count: 2, limit: 1 }));
    }

    #[test]
    fn carries_snapshot_generation_and_severity() {
        let dict = Dictionary::from_terms(
            vec![Term::new("w").with_severity(Severity::Severe)],
            false,
        );
        let m = CompiledMatcher::compile(&dict, 10).unwrap();
        assert_eq!(m.generation(), dict.generation());
        assert_eq!(m.find_all("w")[0].severity, Severity::Severe);
    }

    #[test]
    fn large_dictionary_scan() {
        let words: Vec<String> = (0..20_000).map(|i| format!("term{:05}", i)).collect();
        let dict = Dictionary::from_terms(words.iter().map(Term::new), false);
        let m = CompiledMatcher::compile(&dict, usize::MAX).unwrap();

        let matches = m.find_all("prefix term12345 and term00007 suffix");
        let terms: Vec<&str> = matches.iter().map(|tm| tm.term.as_str()).collect();
        assert_eq!(terms, vec!["term12345", "term00007"]);
    }
}
