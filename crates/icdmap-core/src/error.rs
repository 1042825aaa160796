//! Error types for the icdmap-core library.

use thiserror::Error;

/// Main error type for the icdmap library.
#[derive(Error, Debug)]
pub enum IcdmapError {
    /// PDF processing error. Fatal for the whole document.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// The input is not a PDF (wrong extension or missing header).
    #[error("not a PDF file: {0}")]
    NotPdf(String),

    /// Failed to extract text from a page.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// Failed to extract positioned words from a page.
    #[error("failed to extract words: {0}")]
    WordExtraction(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// Invalid page number requested.
    #[error("invalid page number: {0}")]
    InvalidPage(u32),
}

/// A failure confined to a single page.
///
/// The document processor turns these into an error marker on the page's
/// result and moves on to the next page.
#[derive(Error, Debug)]
pub enum PageError {
    /// The page text could not be read.
    #[error("page {page}: {source}")]
    Text {
        page: u32,
        #[source]
        source: PdfError,
    },

    /// The page words could not be read.
    #[error("page {page}: {source}")]
    Words {
        page: u32,
        #[source]
        source: PdfError,
    },
}

impl PageError {
    /// Page number the failure belongs to.
    pub fn page(&self) -> u32 {
        match self {
            PageError::Text { page, .. } | PageError::Words { page, .. } => *page,
        }
    }
}

/// Errors raised while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The code pattern is not a valid regular expression.
    #[error("invalid code pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Reading or writing the configuration file failed.
    #[error("config file I/O: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid JSON for this schema.
    #[error("config file format: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for the icdmap library.
pub type Result<T> = std::result::Result<T, IcdmapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_error_reports_page() {
        let err = PageError::Words {
            page: 3,
            source: PdfError::WordExtraction("bad stream".to_string()),
        };
        assert_eq!(err.page(), 3);
        assert_eq!(err.to_string(), "page 3: failed to extract words: bad stream");
    }

    #[test]
    fn test_pdf_error_converts_to_top_level() {
        let err: IcdmapError = PdfError::NoPages.into();
        assert_eq!(err.to_string(), "PDF error: PDF has no pages");
    }
}
