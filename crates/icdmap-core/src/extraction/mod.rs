//! Page and document orchestration of the code extraction pipeline.

mod processor;

pub use processor::{summarize, DocumentProcessor, PageProcessor};
