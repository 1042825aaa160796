//! Pages extracted ahead of time, served from memory.

use std::collections::HashSet;
use std::path::Path;

use tracing::debug;

use super::{PdfProcessor, Result};
use crate::error::PdfError;
use crate::models::document::{Page, Word};

/// A document made of pre-extracted pages.
///
/// Loads the JSON produced by `icdmap words` (an array of pages with
/// `page_number`, `text` and `words`), or any extractor output in that shape.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocument {
    pages: Vec<Page>,
}

impl MemoryDocument {
    pub fn new(pages: Vec<Page>) -> Self {
        Self { pages }
    }

    /// Load pages from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path).map_err(|e| PdfError::Parse(e.to_string()))?;
        let mut doc = Self::default();
        doc.load(&data)?;
        Ok(doc)
    }

    fn page(&self, page: u32) -> Result<&Page> {
        self.pages
            .iter()
            .find(|p| p.page_number == page)
            .ok_or(PdfError::InvalidPage(page))
    }
}

impl PdfProcessor for MemoryDocument {
    fn load(&mut self, data: &[u8]) -> Result<()> {
        let pages: Vec<Page> =
            serde_json::from_slice(data).map_err(|e| PdfError::Parse(e.to_string()))?;
        if pages.is_empty() {
            return Err(PdfError::NoPages);
        }

        let mut seen = HashSet::new();
        if let Some(dup) = pages.iter().find(|p| !seen.insert(p.page_number)) {
            return Err(PdfError::Parse(format!("duplicate page number {}", dup.page_number)));
        }

        debug!("Loaded {} pre-extracted pages", pages.len());
        self.pages = pages;
        Ok(())
    }

    fn page_numbers(&self) -> Vec<u32> {
        self.pages.iter().map(|p| p.page_number).collect()
    }

    fn extract_page_text(&self, page: u32) -> Result<String> {
        Ok(self.page(page)?.text.clone())
    }

    fn extract_page_words(&self, page: u32) -> Result<Vec<Word>> {
        Ok(self.page(page)?.words.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::PdfType;

    #[test]
    fn test_load_json_pages() {
        let json = br#"[
            {"page_number": 1, "text": "ICD-10-CM: I10",
             "words": [{"text": "I10", "x0": 1.0, "x1": 2.0, "top": 3.0, "bottom": 4.0}]},
            {"page_number": 2, "text": ""}
        ]"#;
        let mut doc = MemoryDocument::default();
        doc.load(json).unwrap();

        assert_eq!(doc.page_numbers(), vec![1, 2]);
        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.extract_page_words(1).unwrap()[0].text, "I10");
        assert!(doc.extract_page_words(2).unwrap().is_empty());
        assert_eq!(doc.analyze(), PdfType::Text);
    }

    #[test]
    fn test_missing_page() {
        let doc = MemoryDocument::new(Vec::new());
        assert!(matches!(doc.extract_page_text(1), Err(PdfError::InvalidPage(1))));
    }

    #[test]
    fn test_rejects_empty_and_garbage() {
        let mut doc = MemoryDocument::default();
        assert!(matches!(doc.load(b"[]"), Err(PdfError::NoPages)));
        assert!(matches!(doc.load(b"not json"), Err(PdfError::Parse(_))));
    }

    #[test]
    fn test_rejects_duplicate_page_numbers() {
        let json = br#"[
            {"page_number": 1, "text": "ICD-10-CM: I10"},
            {"page_number": 2, "text": ""},
            {"page_number": 1, "text": "ICD-10-CM: E11.9"}
        ]"#;
        let mut doc = MemoryDocument::default();
        match doc.load(json) {
            Err(PdfError::Parse(msg)) => assert_eq!(msg, "duplicate page number 1"),
            other => panic!("expected duplicate page error, got {:?}", other),
        }
        assert_eq!(doc.page_count(), 0);
    }
}
