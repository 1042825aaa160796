//! Core library for locating diagnosis codes in PDF documents.
//!
//! This crate provides:
//! - PDF page text and positioned word extraction
//! - Configurable ICD code pattern matching
//! - Correlation of matched codes with word bounding boxes
//! - Page and document level processing with per-page error isolation

pub mod codes;
pub mod error;
pub mod extraction;
pub mod models;
pub mod pdf;

pub use codes::{correlate, normalize, CodePattern};
pub use error::{ConfigError, IcdmapError, PageError, PdfError, Result};
pub use extraction::{summarize, DocumentProcessor, PageProcessor};
pub use models::{
    BoundingBox, CodeOccurrence, DocumentSummary, ExtractionResult, IcdmapConfig, Page, Word,
};
pub use pdf::{MemoryDocument, PdfExtractor, PdfProcessor, PdfType};
