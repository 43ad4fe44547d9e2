use std::path::PathBuf;
use thiserror::Error;

use crate::document::ProcessingStatus;
use crate::ocr::OcrError;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },
}

/// Upload rejections. Raised before anything is stored or persisted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("File is empty")]
    EmptyFile,

    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),

    #[error("File size {size} exceeds the maximum of {limit} bytes")]
    FileTooLarge { size: u64, limit: u64 },
}

/// Failures inside a single processing run. Recorded on the document,
/// never propagated to other documents.
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Failed to decode image: {0}")]
    ImageDecode(String),

    #[error("Failed to process PDF: {0}")]
    PdfProcessing(String),

    #[error("Failed to render page {page}: {reason}")]
    PageRender { page: u32, reason: String },

    #[error("OCR failed: {0}")]
    Ocr(#[from] OcrError),

    #[error("Failed to load document content: {0}")]
    Storage(#[from] StorageError),

    #[error("Internal processing error: {0}")]
    Internal(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove file '{path}': {source}")]
    RemoveFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Stored content not found: {0}")]
    NotFound(String),
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Failed to spawn worker: {0}")]
    SpawnFailed(String),

    #[error("Worker channel closed unexpectedly")]
    ChannelClosed,
}

/// Errors surfaced to callers of [`crate::service::DocumentService`].
///
/// Database and storage failures are logged where they happen and reach
/// callers only as `Internal`, so no paths or SQL leak out.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Invalid correction JSON: {0}")]
    InvalidCorrection(String),

    #[error("Cannot {action} document {id} while it is {from}")]
    InvalidTransition {
        id: String,
        from: ProcessingStatus,
        action: &'static str,
    },

    #[error("Document {0} is already being processed")]
    AlreadyProcessing(String),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    /// Logs the detailed cause and returns the generic caller-facing error.
    pub(crate) fn internal(context: &str, err: impl std::fmt::Display) -> Self {
        tracing::error!("{}: {}", context, err);
        ServiceError::Internal("internal error".to_string())
    }
}
