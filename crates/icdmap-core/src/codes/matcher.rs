//! Configurable code pattern matching.

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};
use tracing::trace;

use super::normalize::normalize;
use super::patterns::{LINE_BREAKS, LABELED_ICD_PATTERN, BARE_ICD10_PATTERN};
use crate::error::ConfigError;

lazy_static! {
    static ref LABELED_ICD: CodePattern = CodePattern::new(LABELED_ICD_PATTERN).unwrap();
    static ref BARE_ICD10: CodePattern = CodePattern::new(BARE_ICD10_PATTERN).unwrap();
}

/// A compiled, validated code pattern.
///
/// Matching is case-insensitive and multi-line. When the pattern has a
/// capture group, group 1 is read as a comma-separated block of codes;
/// otherwise each whole match is one code.
#[derive(Debug, Clone)]
pub struct CodePattern {
    regex: Regex,
}

impl CodePattern {
    /// Compile `pattern`, failing with [`ConfigError::InvalidPattern`].
    pub fn new(pattern: &str) -> Result<Self, ConfigError> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .multi_line(true)
            .build()
            .map_err(|source| ConfigError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })?;
        Ok(Self { regex })
    }

    /// The labeled `ICD-10-CM:` / `ICD-9-CM:` block pattern.
    pub fn labeled_icd() -> Self {
        LABELED_ICD.clone()
    }

    /// The bare ICD-10 code pattern.
    pub fn bare_icd10() -> Self {
        BARE_ICD10.clone()
    }

    /// Source text of the pattern.
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Whether matches are read as comma-separated blocks.
    pub fn is_block_pattern(&self) -> bool {
        self.regex.captures_len() > 1
    }

    /// Every code piece in `text`, in order, duplicates included.
    pub fn find_all(&self, text: &str) -> Vec<String> {
        let group = if self.is_block_pattern() { 1 } else { 0 };
        let mut matches = Vec::new();

        for caps in self.regex.captures_iter(text) {
            let Some(block) = caps.get(group) else {
                continue;
            };
            let flattened = LINE_BREAKS.replace_all(block.as_str(), " ");

            for piece in flattened.split(',') {
                let piece = piece.trim();
                if piece.is_empty() {
                    continue;
                }
                matches.push(piece.to_string());
            }
        }

        trace!("Pattern produced {} code pieces", matches.len());
        matches
    }

    /// Distinct codes in first-occurrence order.
    ///
    /// Codes are compared in normalized form; the first spelling wins.
    /// Pieces that normalize to nothing are dropped.
    pub fn extract_codes(&self, text: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        self.find_all(text)
            .into_iter()
            .filter(|code| {
                let key = normalize(code);
                !key.is_empty() && seen.insert(key)
            })
            .collect()
    }
}

impl Default for CodePattern {
    fn default() -> Self {
        Self::labeled_icd()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_labeled_block_is_split_and_trimmed() {
        let pattern = CodePattern::labeled_icd();
        let codes = pattern.extract_codes("Assessment ICD-10-CM: E11.29 ,  R80.9\nPlan");
        assert_eq!(codes, vec!["E11.29", "R80.9"]);
    }

    #[test]
    fn test_blocks_flatten_across_matches() {
        let pattern = CodePattern::labeled_icd();
        let text = "ICD-10-CM: E11.29, R80.9\nother\nICD-9-CM: 250.40, 791.0";
        assert_eq!(
            pattern.extract_codes(text),
            vec!["E11.29", "R80.9", "250.40", "791.0"]
        );
    }

    #[test]
    fn test_block_spanning_line_break() {
        let pattern = CodePattern::labeled_icd();
        let codes = pattern.extract_codes("ICD-10-CM: E11.29,\nR80.9");
        assert_eq!(codes, vec!["E11.29", "R80.9"]);
    }

    #[test]
    fn test_case_insensitive() {
        let pattern = CodePattern::labeled_icd();
        assert_eq!(pattern.extract_codes("icd-10-cm: e11.29"), vec!["e11.29"]);
    }

    #[test]
    fn test_dedup_keeps_first_spelling() {
        let pattern = CodePattern::labeled_icd();
        let text = "ICD-10-CM: e11.29, R80.9\nICD-10-CM: E11.29, R80.9, I10";
        assert_eq!(pattern.extract_codes(text), vec!["e11.29", "R80.9", "I10"]);
    }

    #[test]
    fn test_bare_pattern_uses_whole_match() {
        let pattern = CodePattern::bare_icd10();
        assert!(!pattern.is_block_pattern());
        let codes = pattern.extract_codes("Dx E11.29 and R80.9; again E11.29");
        assert_eq!(codes, vec!["E11.29", "R80.9"]);
    }

    #[test]
    fn test_no_match_and_empty_text() {
        let pattern = CodePattern::labeled_icd();
        assert!(pattern.extract_codes("no codes here").is_empty());
        assert!(pattern.extract_codes("").is_empty());
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let err = CodePattern::new("([A-Z]").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { ref pattern, .. } if pattern == "([A-Z]"));
    }

    #[test]
    fn test_find_all_keeps_duplicates() {
        let pattern = CodePattern::bare_icd10();
        assert_eq!(
            pattern.find_all("xx E11.29 then e11.29"),
            vec!["E11.29", "e11.29"]
        );
    }

    #[test]
    fn test_as_str_returns_source() {
        assert_eq!(CodePattern::bare_icd10().as_str(), BARE_ICD10_PATTERN);
    }
}
