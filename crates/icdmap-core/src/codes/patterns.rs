//! Built-in code patterns and the character classes used for normalization.

use lazy_static::lazy_static;
use regex::Regex;

/// Labeled ICD block, e.g. `ICD-10-CM: E11.29, R80.9` or `ICD-9-CM: [250.40]`.
///
/// Group 1 captures the comma-separated code list.
pub const LABELED_ICD_PATTERN: &str =
    r"ICD-(?:10|9)-CM:?\s*\[?([A-Z\d]\d{1,2}(?:\.\d+)?(?:\s*,\s*[A-Z\d]\d{1,2}(?:\.\d+)?)*)\]?";

/// Bare ICD-10 code anywhere in the text, e.g. `E11.29` or `R80`.
pub const BARE_ICD10_PATTERN: &str = r"[A-Z][0-9][0-9](?:\.[0-9A-Z]{1,4})?";

lazy_static! {
    // Everything normalization drops (applied after uppercasing)
    pub static ref NON_CODE_CHARS: Regex = Regex::new(r"[^A-Z0-9.]").unwrap();

    // Line breaks inside a captured block or page text
    pub static ref LINE_BREAKS: Regex = Regex::new(r"\r\n|\r|\n").unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_patterns_compile() {
        assert!(Regex::new(LABELED_ICD_PATTERN).is_ok());
        assert!(Regex::new(BARE_ICD10_PATTERN).is_ok());
    }

    #[test]
    fn test_labeled_pattern_captures_block() {
        let re = Regex::new(LABELED_ICD_PATTERN).unwrap();
        let caps = re.captures("Dx ICD-10-CM: E11.29, R80.9 noted").unwrap();
        assert_eq!(&caps[1], "E11.29, R80.9");

        let caps = re.captures("ICD-9-CM [250.40]").unwrap();
        assert_eq!(&caps[1], "250.40");
    }

    #[test]
    fn test_line_breaks() {
        assert_eq!(LINE_BREAKS.replace_all("a\r\nb\nc\rd", " "), "a b c d");
    }
}
