//! PDF processing module.
//!
//! The pipeline only needs page numbers, page text and positioned words;
//! [`PdfProcessor`] is that seam. [`PdfExtractor`] reads real PDFs with
//! lopdf, [`MemoryDocument`] serves pages extracted elsewhere.

mod extractor;
pub mod fonts;
mod memory;
pub mod words;

pub use extractor::PdfExtractor;
pub use memory::MemoryDocument;

use std::path::Path;

use crate::error::PdfError;
use crate::models::document::Word;

/// Type of PDF content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfType {
    /// Contains extractable text.
    Text,
    /// Contains only images (scanned document, needs OCR first).
    Image,
    /// Contains both text and images.
    Hybrid,
    /// Empty or unreadable.
    Empty,
}

impl PdfType {
    pub fn from_flags(has_text: bool, has_images: bool) -> Self {
        match (has_text, has_images) {
            (true, false) => PdfType::Text,
            (false, true) => PdfType::Image,
            (true, true) => PdfType::Hybrid,
            (false, false) => PdfType::Empty,
        }
    }
}

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// Trait for page text and word providers.
pub trait PdfProcessor {
    /// Load a document from bytes.
    fn load(&mut self, data: &[u8]) -> Result<()>;

    /// Page numbers (1-indexed) in document order.
    fn page_numbers(&self) -> Vec<u32>;

    /// Get the number of pages.
    fn page_count(&self) -> u32 {
        self.page_numbers().len() as u32
    }

    /// Analyze the document to determine its type.
    fn analyze(&self) -> PdfType {
        let has_text = self.page_numbers().into_iter().any(|page| {
            self.extract_page_text(page)
                .map(|t| !t.trim().is_empty())
                .unwrap_or(false)
        });
        PdfType::from_flags(has_text, false)
    }

    /// Extract raw text from a specific page.
    fn extract_page_text(&self, page: u32) -> Result<String>;

    /// Extract words with bounding boxes from a specific page.
    fn extract_page_words(&self, page: u32) -> Result<Vec<Word>>;
}

/// Reject paths that do not carry a `.pdf` extension.
pub fn validate_pdf_path(path: &Path) -> Result<()> {
    let is_pdf = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);

    if is_pdf {
        Ok(())
    } else {
        Err(PdfError::NotPdf(path.display().to_string()))
    }
}

/// Whether `data` carries a `%PDF-` header within its first KiB.
pub fn looks_like_pdf(data: &[u8]) -> bool {
    let head = &data[..data.len().min(1024)];
    head.windows(5).any(|w| w == b"%PDF-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_pdf_path() {
        assert!(validate_pdf_path(Path::new("input/report.pdf")).is_ok());
        assert!(validate_pdf_path(Path::new("REPORT.PDF")).is_ok());
        assert!(matches!(
            validate_pdf_path(Path::new("report.docx")),
            Err(PdfError::NotPdf(_))
        ));
        assert!(validate_pdf_path(Path::new("report")).is_err());
    }

    #[test]
    fn test_looks_like_pdf() {
        assert!(looks_like_pdf(b"%PDF-1.7\n..."));
        assert!(looks_like_pdf(b"\xef\xbb\xbf%PDF-1.4"));
        assert!(!looks_like_pdf(b"PK\x03\x04"));
        assert!(!looks_like_pdf(b""));
    }

    #[test]
    fn test_pdf_type_flags() {
        assert_eq!(PdfType::from_flags(true, false), PdfType::Text);
        assert_eq!(PdfType::from_flags(false, true), PdfType::Image);
        assert_eq!(PdfType::from_flags(true, true), PdfType::Hybrid);
        assert_eq!(PdfType::from_flags(false, false), PdfType::Empty);
    }
}
