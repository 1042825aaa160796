//! Code detection, normalization and coordinate mapping.

mod correlate;
mod matcher;
mod normalize;
pub mod patterns;

pub use correlate::correlate;
pub use matcher::CodePattern;
pub use normalize::normalize;
pub use patterns::{BARE_ICD10_PATTERN, LABELED_ICD_PATTERN};
