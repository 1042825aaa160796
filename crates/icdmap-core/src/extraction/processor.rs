//! Page and document processors.

use std::collections::HashSet;
use std::path::Path;
use std::time::Instant;

use tracing::{debug, error, info};

use crate::codes::patterns::LINE_BREAKS;
use crate::codes::{correlate, normalize, CodePattern};
use crate::error::{ConfigError, PageError, Result};
use crate::models::config::{IcdmapConfig, PdfConfig};
use crate::models::document::{DocumentSummary, ExtractionResult, Word};
use crate::pdf::{validate_pdf_path, PdfExtractor, PdfProcessor};

/// Runs code matching and coordinate correlation for one page.
#[derive(Debug, Clone)]
pub struct PageProcessor {
    pattern: CodePattern,
    flatten_text: bool,
}

impl PageProcessor {
    /// Create a page processor for `pattern`.
    pub fn new(pattern: CodePattern) -> Self {
        Self {
            pattern,
            flatten_text: true,
        }
    }

    /// Collapse line breaks in the emitted page text.
    pub fn with_flatten_text(mut self, flatten: bool) -> Self {
        self.flatten_text = flatten;
        self
    }

    pub fn pattern(&self) -> &CodePattern {
        &self.pattern
    }

    /// Build the result for a page whose text and words are already known.
    pub fn process_contents(&self, page_number: u32, text: &str, words: &[Word]) -> ExtractionResult {
        let codes = self.pattern.extract_codes(text);
        let occurrences = correlate(&codes, words);

        debug!(
            "Page {}: {} codes, {} words, {} occurrences",
            page_number,
            codes.len(),
            words.len(),
            occurrences.len()
        );

        ExtractionResult {
            page_number,
            codes: occurrences,
            text: self.output_text(text),
            error: None,
        }
    }

    /// Extract and process one page of `source`.
    pub fn process_page<P: PdfProcessor + ?Sized>(
        &self,
        source: &P,
        page: u32,
    ) -> std::result::Result<ExtractionResult, PageError> {
        let text = source
            .extract_page_text(page)
            .map_err(|source| PageError::Text { page, source })?;
        let words = source
            .extract_page_words(page)
            .map_err(|source| PageError::Words { page, source })?;

        Ok(self.process_contents(page, &text, &words))
    }

    /// Like [`process_page`](Self::process_page), but a failure becomes an
    /// error marker on the page's result.
    pub fn process_page_or_mark<P: PdfProcessor + ?Sized>(&self, source: &P, page: u32) -> ExtractionResult {
        self.process_page(source, page).unwrap_or_else(|err| {
            error!(page = err.page(), "Page extraction failed: {}", err);
            ExtractionResult::failed(page, format!("Failed to read this page: {err}"))
        })
    }

    fn output_text(&self, text: &str) -> String {
        if self.flatten_text {
            LINE_BREAKS.replace_all(text, " ").trim().to_string()
        } else {
            text.to_string()
        }
    }
}

/// Runs the page processor over every page of a document, in order.
#[derive(Debug, Clone)]
pub struct DocumentProcessor {
    page: PageProcessor,
    pdf: PdfConfig,
}

impl DocumentProcessor {
    /// Create a document processor with default PDF settings.
    pub fn new(pattern: CodePattern) -> Self {
        Self {
            page: PageProcessor::new(pattern),
            pdf: PdfConfig::default(),
        }
    }

    /// Build from configuration, validating the code pattern up front.
    pub fn from_config(config: &IcdmapConfig) -> std::result::Result<Self, ConfigError> {
        let pattern = config.code_pattern()?;
        Ok(Self {
            page: PageProcessor::new(pattern).with_flatten_text(config.extraction.flatten_text),
            pdf: config.pdf.clone(),
        })
    }

    /// One result per page, in page order. Page failures are marked, never
    /// dropped.
    pub fn process<P: PdfProcessor + ?Sized>(&self, source: &P) -> Vec<ExtractionResult> {
        let start = Instant::now();
        let pages = source.page_numbers();
        info!("Extracting codes from {} pages", pages.len());
        debug!("Code pattern: {}", self.page.pattern().as_str());

        let results: Vec<ExtractionResult> = pages
            .into_iter()
            .map(|page| self.page.process_page_or_mark(source, page))
            .collect();

        let summary = summarize(&results);
        info!(
            "Found {} occurrences of {} codes ({} failed pages) in {}ms",
            summary.occurrence_count,
            summary.distinct_codes.len(),
            summary.failed_pages.len(),
            start.elapsed().as_millis()
        );
        results
    }

    /// Open PDF bytes and process them. Fails as a whole if the document
    /// cannot be opened.
    pub fn process_bytes(&self, data: &[u8]) -> Result<Vec<ExtractionResult>> {
        let mut extractor = PdfExtractor::with_config(&self.pdf);
        extractor.load(data).map_err(|e| {
            error!("PDF processing error: {}", e);
            e
        })?;
        Ok(self.process(&extractor))
    }

    /// Read and process a PDF file.
    pub fn process_file(&self, path: &Path) -> Result<Vec<ExtractionResult>> {
        validate_pdf_path(path)?;
        let data = std::fs::read(path)?;
        info!("Processing {}", path.display());
        self.process_bytes(&data)
    }
}

/// Totals over a result sequence.
pub fn summarize(results: &[ExtractionResult]) -> DocumentSummary {
    let mut seen = HashSet::new();
    let mut summary = DocumentSummary {
        page_count: results.len(),
        ..Default::default()
    };

    for result in results {
        if result.is_error() {
            summary.failed_pages.push(result.page_number);
        }
        summary.occurrence_count += result.codes.len();
        for occurrence in &result.codes {
            let code = normalize(&occurrence.code);
            if seen.insert(code.clone()) {
                summary.distinct_codes.push(code);
            }
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PdfError;
    use crate::models::document::{BoundingBox, CodeOccurrence, Page};
    use crate::pdf::MemoryDocument;
    use pretty_assertions::assert_eq;

    fn word(text: &str, x0: f64, x1: f64, top: f64, bottom: f64) -> Word {
        Word::new(text, BoundingBox::new(x0, x1, top, bottom))
    }

    fn page(number: u32, text: &str, words: Vec<Word>) -> Page {
        Page {
            page_number: number,
            text: text.to_string(),
            words,
        }
    }

    fn sample_pages() -> Vec<Page> {
        vec![
            page(
                1,
                "Patient summary\nICD-10-CM: E11.29, R80.9",
                vec![
                    word("ICD-10-CM:", 0.0, 9.0, 5.0, 15.0),
                    word("E11.29", 10.0, 40.0, 5.0, 15.0),
                    word("R80.9", 45.0, 70.0, 5.0, 15.0),
                ],
            ),
            page(2, "no codes here", vec![word("no", 0.0, 5.0, 0.0, 10.0)]),
            page(
                3,
                "ICD-10-CM: I10",
                vec![
                    word("I10", 10.0, 20.0, 5.0, 15.0),
                    word("I10", 10.0, 20.0, 105.0, 115.0),
                ],
            ),
        ]
    }

    /// Serves pages from memory, failing word extraction on chosen pages.
    struct FlakySource {
        inner: MemoryDocument,
        failing: Vec<u32>,
    }

    impl PdfProcessor for FlakySource {
        fn load(&mut self, data: &[u8]) -> crate::pdf::Result<()> {
            self.inner.load(data)
        }

        fn page_numbers(&self) -> Vec<u32> {
            self.inner.page_numbers()
        }

        fn extract_page_text(&self, page: u32) -> crate::pdf::Result<String> {
            self.inner.extract_page_text(page)
        }

        fn extract_page_words(&self, page: u32) -> crate::pdf::Result<Vec<Word>> {
            if self.failing.contains(&page) {
                return Err(PdfError::WordExtraction("corrupt content stream".to_string()));
            }
            self.inner.extract_page_words(page)
        }
    }

    #[test]
    fn test_coordinate_correlation_example() {
        let processor = PageProcessor::new(CodePattern::labeled_icd());
        let result = processor.process_contents(
            1,
            "ICD-10-CM: E11.29, R80.9",
            &[
                word("E11.29", 10.0, 40.0, 5.0, 15.0),
                word("R80.9", 45.0, 70.0, 5.0, 15.0),
            ],
        );

        assert_eq!(
            result.codes,
            vec![
                CodeOccurrence {
                    code: "E11.29".to_string(),
                    bbox: BoundingBox::new(10.0, 40.0, 5.0, 15.0),
                },
                CodeOccurrence {
                    code: "R80.9".to_string(),
                    bbox: BoundingBox::new(45.0, 70.0, 5.0, 15.0),
                },
            ]
        );
        assert_eq!(result.text, "ICD-10-CM: E11.29, R80.9");
        assert!(result.error.is_none());
    }

    #[test]
    fn test_no_match_page() {
        let processor = PageProcessor::new(CodePattern::labeled_icd());
        let result = processor.process_contents(7, "no codes here", &[word("no", 0.0, 1.0, 0.0, 1.0)]);
        assert!(result.codes.is_empty());
        assert_eq!(result.page_number, 7);
        assert!(result.error.is_none());
    }

    #[test]
    fn test_text_flattening() {
        let processor = PageProcessor::new(CodePattern::labeled_icd());
        let result = processor.process_contents(1, "  line one\nline two\n", &[]);
        assert_eq!(result.text, "line one line two");

        let raw = processor.clone().with_flatten_text(false);
        let result = raw.process_contents(1, "line one\nline two", &[]);
        assert_eq!(result.text, "line one\nline two");
    }

    #[test]
    fn test_document_order_and_multi_occurrence() {
        let doc = MemoryDocument::new(sample_pages());
        let results = DocumentProcessor::new(CodePattern::labeled_icd()).process(&doc);

        let numbers: Vec<u32> = results.iter().map(|r| r.page_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(results[0].codes.len(), 2);
        assert!(results[1].codes.is_empty());
        assert_eq!(results[2].codes.len(), 2);
        assert_eq!(results[2].codes[1].bbox.top, 105.0);
    }

    #[test]
    fn test_codes_never_cross_pages() {
        let pages = vec![
            page(1, "ICD-10-CM: E11.29", vec![]),
            page(2, "unrelated", vec![word("E11.29", 1.0, 2.0, 3.0, 4.0)]),
        ];
        let results = DocumentProcessor::new(CodePattern::labeled_icd())
            .process(&MemoryDocument::new(pages));
        assert!(results[0].codes.is_empty());
        assert!(results[1].codes.is_empty());
    }

    #[test]
    fn test_page_failure_is_isolated() {
        let source = FlakySource {
            inner: MemoryDocument::new(sample_pages()),
            failing: vec![2],
        };
        let results = DocumentProcessor::new(CodePattern::labeled_icd()).process(&source);

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].codes.len(), 2);
        assert!(results[0].error.is_none());

        assert_eq!(results[1].page_number, 2);
        assert!(results[1].codes.is_empty());
        assert_eq!(results[1].text, "");
        let marker = results[1].error.as_deref().unwrap();
        assert!(marker.starts_with("Failed to read this page"));
        assert!(marker.contains("corrupt content stream"));

        assert_eq!(results[2].codes.len(), 2);
        assert!(results[2].error.is_none());
    }

    #[test]
    fn test_idempotent() {
        let doc = MemoryDocument::new(sample_pages());
        let processor = DocumentProcessor::new(CodePattern::labeled_icd());
        assert_eq!(processor.process(&doc), processor.process(&doc));
    }

    #[test]
    fn test_typed_page_error() {
        let source = FlakySource {
            inner: MemoryDocument::new(sample_pages()),
            failing: vec![1],
        };
        let processor = PageProcessor::new(CodePattern::labeled_icd());
        let err = processor.process_page(&source, 1).unwrap_err();
        assert!(matches!(err, PageError::Words { page: 1, .. }));

        let err = processor.process_page(&source, 9).unwrap_err();
        assert!(matches!(err, PageError::Text { page: 9, .. }));
    }

    #[test]
    fn test_from_config_rejects_bad_pattern() {
        let mut config = IcdmapConfig::default();
        config.extraction.pattern = "[unclosed".to_string();
        assert!(DocumentProcessor::from_config(&config).is_err());
    }

    #[test]
    fn test_from_config_uses_configured_pattern() {
        let mut config = IcdmapConfig::default();
        config.extraction.pattern = crate::codes::BARE_ICD10_PATTERN.to_string();
        let processor = DocumentProcessor::from_config(&config).unwrap();
        assert_eq!(processor.page.pattern().as_str(), crate::codes::BARE_ICD10_PATTERN);
    }

    #[test]
    fn test_process_bytes_rejects_non_pdf() {
        let processor = DocumentProcessor::new(CodePattern::labeled_icd());
        assert!(processor.process_bytes(b"plain text").is_err());
    }

    #[test]
    fn test_process_file_rejects_wrong_extension() {
        let processor = DocumentProcessor::new(CodePattern::labeled_icd());
        let err = processor.process_file(Path::new("notes.txt")).unwrap_err();
        assert!(matches!(err, crate::error::IcdmapError::Pdf(PdfError::NotPdf(_))));
    }

    #[test]
    fn test_summarize() {
        let doc = MemoryDocument::new(sample_pages());
        let source = FlakySource {
            inner: doc,
            failing: vec![2],
        };
        let results = DocumentProcessor::new(CodePattern::labeled_icd()).process(&source);
        let summary = summarize(&results);

        assert_eq!(summary.page_count, 3);
        assert_eq!(summary.failed_pages, vec![2]);
        assert_eq!(summary.occurrence_count, 4);
        assert_eq!(summary.distinct_codes, vec!["E11.29", "R80.9", "I10"]);
    }
}
