use crate::document::Document;
use crate::extract::ExtractedField;
use crate::ocr::EngineType;

/// Engine and score behind the recognized text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recognition {
    /// Engine used for the last page.
    pub engine: EngineType,
    /// Mean confidence across pages, 0-100.
    pub confidence: u8,
}

pub struct PipelineContext {
    // Input; `status` and `progress` track the persisted row
    pub document: Document,
    pub requested_engine: Option<EngineType>,

    // Load result
    pub content: Option<Vec<u8>>,

    // OCR results, one entry per page for PDFs
    pub page_texts: Vec<String>,
    pub text: Option<String>,
    pub recognition: Option<Recognition>,

    // JSON generation results
    pub fields: Vec<ExtractedField>,
    pub json: Option<String>,
}

impl PipelineContext {
    pub fn new(document: Document, requested_engine: Option<EngineType>) -> Self {
        Self {
            document,
            requested_engine,
            content: None,
            page_texts: Vec::new(),
            text: None,
            recognition: None,
            fields: Vec::new(),
            json: None,
        }
    }

    pub fn document_id(&self) -> &str {
        &self.document.id
    }
}
