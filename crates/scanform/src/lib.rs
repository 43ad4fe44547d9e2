//! Scanned-document pipeline: uploads are preprocessed, classified as
//! printed or handwritten, run through a local or remote OCR engine and
//! turned into a flat JSON record that can later be corrected by hand.

pub mod config;
pub mod db;
pub mod document;
pub mod error;
pub mod extract;
pub mod ocr;
pub mod pipeline;
pub mod processor;
pub mod sanitize;
pub mod secrets;
pub mod service;
pub mod storage;
pub mod telemetry;
pub mod worker;

pub use config::{load_config, load_config_from_str, Config};
pub use db::{Database, DatabaseError, DocumentRepository, SqliteDocumentRepository};
pub use document::{
    ContentType, Document, FieldMapping, Page, PageRequest, ProcessingStatus, SortDirection,
    SortField,
};
pub use error::{
    ConfigError, ProcessError, ServiceError, StorageError, ValidationError, WorkerError,
};
pub use extract::{generate_json, is_valid_json, merge, ExtractionError};
pub use ocr::{EngineType, OcrEngine, OcrError, OcrService};
pub use pipeline::{Pipeline, PipelineConfig, ProgressEvent, ProgressReporter};
pub use secrets::{resolve_secret, SecretError};
pub use service::{DocumentService, DocumentServiceBuilder};
pub use storage::{ContentStore, FileStorage};
pub use telemetry::{init_logging, LogFormat};
pub use worker::{BatchHandle, BatchResult, DocumentOutcome, ProcessingHandle};
