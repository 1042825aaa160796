//! Data models and configuration.

pub mod config;
pub mod document;

pub use config::IcdmapConfig;
pub use document::{
    BoundingBox, CodeOccurrence, DocumentSummary, ExtractionResult, Page, Word,
    COORDINATE_PRECISION,
};
