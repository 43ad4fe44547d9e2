use thiserror::Error;

use crate::secrets::SecretError;

use super::EngineType;

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("{0} OCR engine is not available")]
    EngineUnavailable(EngineType),

    #[error("{engine} OCR failed: {message}")]
    EngineFailed { engine: EngineType, message: String },

    #[error("Failed to encode image for OCR: {0}")]
    ImageEncoding(String),

    #[error("Remote OCR request failed: {0}")]
    Request(String),

    #[error("Remote OCR rate limited after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("Remote OCR credentials unavailable: {0}")]
    Credentials(#[from] SecretError),

    #[error("OCR initialization failed: {0}")]
    Initialization(String),
}
