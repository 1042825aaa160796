//! Mapping detected codes onto word bounding boxes.

use std::collections::HashSet;

use super::normalize::normalize;
use crate::models::document::{CodeOccurrence, Word, COORDINATE_PRECISION};

/// One occurrence per word whose normalized text is a normalized code.
///
/// Output follows word order. A code that matches no word (for example
/// because the extractor split it in two) simply yields nothing.
pub fn correlate(codes: &[String], words: &[Word]) -> Vec<CodeOccurrence> {
    let targets: HashSet<String> = codes
        .iter()
        .map(|c| normalize(c))
        .filter(|c| !c.is_empty())
        .collect();

    if targets.is_empty() {
        return Vec::new();
    }

    words
        .iter()
        .filter(|w| targets.contains(&normalize(&w.text)))
        .map(|w| CodeOccurrence {
            code: w.text.trim().to_string(),
            bbox: w.bbox.rounded(COORDINATE_PRECISION),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::document::BoundingBox;
    use pretty_assertions::assert_eq;

    fn word(text: &str, x0: f64, x1: f64, top: f64, bottom: f64) -> Word {
        Word::new(text, BoundingBox::new(x0, x1, top, bottom))
    }

    fn codes(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_matches_in_word_order() {
        let words = vec![
            word("ICD-10-CM:", 0.0, 9.0, 5.0, 15.0),
            word("E11.29,", 10.0, 40.0, 5.0, 15.0),
            word("R80.9", 45.0, 70.0, 5.0, 15.0),
        ];
        let found = correlate(&codes(&["R80.9", "E11.29"]), &words);

        assert_eq!(
            found,
            vec![
                CodeOccurrence {
                    code: "E11.29,".to_string(),
                    bbox: BoundingBox::new(10.0, 40.0, 5.0, 15.0),
                },
                CodeOccurrence {
                    code: "R80.9".to_string(),
                    bbox: BoundingBox::new(45.0, 70.0, 5.0, 15.0),
                },
            ]
        );
    }

    #[test]
    fn test_every_occurrence_emitted() {
        let words = vec![
            word("E11.29", 10.0, 40.0, 5.0, 15.0),
            word("other", 45.0, 70.0, 5.0, 15.0),
            word("e11.29", 10.0, 40.0, 300.0, 310.0),
        ];
        let found = correlate(&codes(&["E11.29"]), &words);
        assert_eq!(found.len(), 2);
        assert_eq!(found[1].code, "e11.29");
        assert_eq!(found[1].bbox.top, 300.0);
    }

    #[test]
    fn test_coordinates_rounded() {
        let words = vec![word(" I10 ", 10.123, 20.987, 5.556, 15.001)];
        let found = correlate(&codes(&["I10"]), &words);
        assert_eq!(found[0].code, "I10");
        assert_eq!(found[0].bbox, BoundingBox::new(10.12, 20.99, 5.56, 15.0));
    }

    #[test]
    fn test_split_code_yields_nothing() {
        let words = vec![
            word("E11.", 10.0, 25.0, 5.0, 15.0),
            word("29", 26.0, 40.0, 5.0, 15.0),
        ];
        assert!(correlate(&codes(&["E11.29"]), &words).is_empty());
    }

    #[test]
    fn test_punctuation_only_words_never_match() {
        let words = vec![word("--", 0.0, 5.0, 0.0, 10.0)];
        assert!(correlate(&codes(&["!"]), &words).is_empty());
    }
}
