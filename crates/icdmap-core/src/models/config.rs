//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::codes::{CodePattern, LABELED_ICD_PATTERN};
use crate::error::ConfigError;

/// Main configuration for the icdmap pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IcdmapConfig {
    /// Code extraction configuration.
    pub extraction: ExtractionConfig,

    /// PDF processing configuration.
    pub pdf: PdfConfig,

    /// Output configuration.
    pub output: OutputConfig,
}

/// Code extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Regular expression locating codes in page text.
    ///
    /// With a capture group, group 1 is treated as a comma-separated block
    /// of codes; without one, each whole match is a code.
    pub pattern: String,

    /// Collapse line breaks in the emitted page text to spaces.
    pub flatten_text: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            pattern: LABELED_ICD_PATTERN.to_string(),
            flatten_text: true,
        }
    }
}

/// PDF processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// Try an empty password on encrypted PDFs.
    pub decrypt_empty_password: bool,

    /// Glyph advance (1/1000 em) used when a font has no width table.
    pub default_glyph_width: f64,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            decrypt_empty_password: true,
            default_glyph_width: 500.0,
        }
    }
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory for batch results.
    pub output_dir: PathBuf,

    /// Pretty-print JSON output.
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            pretty: true,
        }
    }
}

impl IcdmapConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Compile the configured code pattern.
    pub fn code_pattern(&self) -> Result<CodePattern, ConfigError> {
        CodePattern::new(&self.extraction.pattern)
    }
}
