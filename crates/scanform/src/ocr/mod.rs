//! Text recognition: the engine abstraction, the local and remote engines,
//! language handling and engine selection.

pub mod error;
pub mod language;
pub mod local;
pub mod native;
pub mod remote;
pub mod selector;
pub mod service;
pub mod settings;

use std::fmt;
use std::str::FromStr;

use image::GrayImage;
use serde::{Deserialize, Serialize};

pub use error::OcrError;
pub use language::{is_language_supported, supported_languages, LanguageInfo};
pub use local::TesseractEngine;
pub use native::init_native;
pub use remote::VisionEngine;
pub use selector::{select_engine, Availability, Selection, SelectionReason};
pub use service::{
    CurrentLanguages, DefaultEngineProvider, EngineInfo, EngineProvider, EngineSet, OcrOutput,
    OcrService, OcrSession,
};
pub use settings::{OcrSettings, SettingsStore};

/// Confidence reported when an engine has nothing better to say.
pub const DEFAULT_CONFIDENCE: u8 = 85;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineType {
    /// On-device Tesseract.
    #[default]
    #[serde(alias = "tesseract")]
    Local,
    /// Cloud handwriting-capable recognition.
    #[serde(alias = "google_vision")]
    Remote,
}

impl EngineType {
    pub const ALL: [EngineType; 2] = [EngineType::Local, EngineType::Remote];

    pub fn as_str(&self) -> &'static str {
        match self {
            EngineType::Local => "local",
            EngineType::Remote => "remote",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            EngineType::Local => "Tesseract",
            EngineType::Remote => "Google Vision",
        }
    }
}

impl fmt::Display for EngineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for EngineType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" | "tesseract" => Ok(EngineType::Local),
            "remote" | "google_vision" | "google-vision" | "vision" => Ok(EngineType::Remote),
            other => Err(format!("unknown OCR engine '{}'", other)),
        }
    }
}

/// A text-recognition backend.
///
/// Engines receive the preprocessed grayscale image and return plain text.
/// `confidence` reports the last run's score on a 0-100 scale.
pub trait OcrEngine: Send + Sync {
    fn engine_type(&self) -> EngineType;

    fn is_available(&self) -> bool;

    fn extract_text(&self, image: &GrayImage) -> Result<String, OcrError>;

    fn confidence(&self) -> u8 {
        DEFAULT_CONFIDENCE
    }
}
