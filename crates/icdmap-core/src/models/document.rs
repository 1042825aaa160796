//! Page, word and extraction result models.

use serde::{Deserialize, Serialize};

/// Number of decimal places kept on emitted coordinates.
pub const COORDINATE_PRECISION: i32 = 2;

/// Axis-aligned box in page space.
///
/// `x` grows rightward, `top`/`bottom` grow downward from the page top.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge.
    pub x0: f64,
    /// Right edge.
    pub x1: f64,
    /// Distance from the page top to the upper edge.
    pub top: f64,
    /// Distance from the page top to the lower edge.
    pub bottom: f64,
}

impl BoundingBox {
    pub fn new(x0: f64, x1: f64, top: f64, bottom: f64) -> Self {
        Self { x0, x1, top, bottom }
    }

    /// Round every edge to `decimals` places.
    pub fn rounded(&self, decimals: i32) -> Self {
        let factor = 10f64.powi(decimals);
        let round = |v: f64| (v * factor).round() / factor;
        Self {
            x0: round(self.x0),
            x1: round(self.x1),
            top: round(self.top),
            bottom: round(self.bottom),
        }
    }

    /// Width of the box.
    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    /// Height of the box.
    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    /// Smallest box containing both.
    pub fn union(&self, other: &BoundingBox) -> Self {
        Self {
            x0: self.x0.min(other.x0),
            x1: self.x1.max(other.x1),
            top: self.top.min(other.top),
            bottom: self.bottom.max(other.bottom),
        }
    }
}

/// A word as produced by the text extractor, in extraction order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    /// Word text as extracted.
    pub text: String,

    /// Word bounds.
    #[serde(flatten)]
    pub bbox: BoundingBox,
}

impl Word {
    pub fn new(text: impl Into<String>, bbox: BoundingBox) -> Self {
        Self {
            text: text.into(),
            bbox,
        }
    }
}

/// One page of pre-extracted content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Page number (1-indexed).
    pub page_number: u32,

    /// Raw page text, line breaks included.
    #[serde(default)]
    pub text: String,

    /// Words with bounding boxes.
    #[serde(default)]
    pub words: Vec<Word>,
}

/// A detected code tied to the box of the word it was found in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeOccurrence {
    /// Word text the code matched.
    pub code: String,

    /// Word bounds, rounded to [`COORDINATE_PRECISION`].
    #[serde(flatten)]
    pub bbox: BoundingBox,
}

/// Extraction output for one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Page number (1-indexed), same as the source page.
    pub page_number: u32,

    /// Code occurrences in word order.
    pub codes: Vec<CodeOccurrence>,

    /// Page text.
    pub text: String,

    /// Set when the page could not be read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExtractionResult {
    /// Result for a page that failed to process.
    pub fn failed(page_number: u32, error: impl Into<String>) -> Self {
        Self {
            page_number,
            codes: Vec::new(),
            text: String::new(),
            error: Some(error.into()),
        }
    }

    /// Whether the page carries an error marker.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Document-wide totals over a result sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentSummary {
    /// Number of pages processed.
    pub page_count: usize,

    /// Pages that carry an error marker.
    pub failed_pages: Vec<u32>,

    /// Total code occurrences across pages.
    pub occurrence_count: usize,

    /// Distinct codes (normalized), first-seen order.
    pub distinct_codes: Vec<String>,
}
