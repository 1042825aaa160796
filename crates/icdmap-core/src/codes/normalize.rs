//! Canonical form for comparing codes with extracted words.

use super::patterns::NON_CODE_CHARS;

/// Uppercase `text` and drop everything except `A-Z`, `0-9` and `.`.
///
/// Characters are removed rather than replaced, so `"A1 B2"` becomes
/// `"A1B2"`.
pub fn normalize(text: &str) -> String {
    NON_CODE_CHARS
        .replace_all(&text.to_uppercase(), "")
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_case_folds() {
        assert_eq!(normalize("e11.29"), "E11.29");
        assert_eq!(normalize("E11.29"), "E11.29");
    }

    #[test]
    fn test_strips_punctuation() {
        assert_eq!(normalize("E-11.29!"), "E11.29");
        assert_eq!(normalize("(R80.9),"), "R80.9");
        assert_eq!(normalize("[250.40]"), "250.40");
    }

    #[test]
    fn test_removal_fuses_tokens() {
        assert_eq!(normalize("A1 B2"), "A1B2");
    }

    #[test]
    fn test_non_ascii_dropped() {
        assert_eq!(normalize("É11.29"), "11.29");
        assert_eq!(normalize("—"), "");
    }

    #[test]
    fn test_idempotent() {
        let once = normalize(" r80.9; ");
        assert_eq!(normalize(&once), once);
    }
}
