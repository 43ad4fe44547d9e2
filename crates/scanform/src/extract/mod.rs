//! Structured output: field extraction from OCR text, JSON validation and
//! merging of corrections over extracted data.

pub mod fields;
pub mod merge;

pub use fields::{extract_fields, fields_to_object, generate_json, ExtractedField};
pub use merge::{is_valid_json, merge, merge_objects};

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Expected a JSON object")]
    NotAnObject,
}
