use std::path::Path;
use std::sync::atomic::{AtomicU8, Ordering};

use image::GrayImage;

use crate::processor::image::encode_png;

use super::{native, EngineType, OcrEngine, OcrError, DEFAULT_CONFIDENCE};

/// On-device OCR via Tesseract.
///
/// A fresh `LepTess` handle is created per call so that the engine can be
/// shared across worker threads.
pub struct TesseractEngine {
    languages: String,
    data_path: Option<String>,
    last_confidence: AtomicU8,
}

impl TesseractEngine {
    pub fn new(languages: impl Into<String>, data_path: Option<String>) -> Self {
        let languages = languages.into();
        let languages = if languages.trim().is_empty() {
            "eng".to_string()
        } else {
            languages
        };
        Self {
            languages,
            data_path: data_path.filter(|p| !p.is_empty()),
            last_confidence: AtomicU8::new(DEFAULT_CONFIDENCE),
        }
    }

    pub fn languages(&self) -> &str {
        &self.languages
    }

    fn effective_data_path(&self) -> Option<String> {
        self.data_path.clone().or_else(|| {
            native::tessdata_path().map(|p| p.to_string_lossy().into_owned())
        })
    }
}

impl OcrEngine for TesseractEngine {
    fn engine_type(&self) -> EngineType {
        EngineType::Local
    }

    /// Available when every configured language has traineddata. Without a
    /// known data directory Tesseract's compiled-in default is trusted.
    fn is_available(&self) -> bool {
        match self.effective_data_path() {
            Some(dir) => has_traineddata(Path::new(&dir), &self.languages),
            None => true,
        }
    }

    fn extract_text(&self, image: &GrayImage) -> Result<String, OcrError> {
        let _span = tracing::info_span!("ocr.tesseract", languages = %self.languages).entered();

        let png_data = encode_png(image).map_err(|e| OcrError::ImageEncoding(e.to_string()))?;

        let data_path = self.effective_data_path();
        let mut lt = leptess::LepTess::new(data_path.as_deref(), &self.languages)
            .map_err(|e| failed(format!("Failed to initialize Tesseract: {}", e)))?;

        lt.set_image_from_mem(&png_data)
            .map_err(|e| failed(format!("Failed to set image for OCR: {}", e)))?;

        let text = lt
            .get_utf8_text()
            .map_err(|e| failed(format!("Failed to read recognized text: {}", e)))?;

        let confidence = lt.mean_text_conf().clamp(0, 100) as u8;
        self.last_confidence.store(confidence, Ordering::Relaxed);
        tracing::debug!(chars = text.len(), confidence, "Tesseract finished");

        Ok(text)
    }

    fn confidence(&self) -> u8 {
        self.last_confidence.load(Ordering::Relaxed)
    }
}

fn failed(message: String) -> OcrError {
    OcrError::EngineFailed {
        engine: EngineType::Local,
        message,
    }
}

fn has_traineddata(dir: &Path, languages: &str) -> bool {
    languages
        .split('+')
        .filter(|l| !l.is_empty())
        .all(|lang| dir.join(format!("{}.traineddata", lang)).is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_language_defaults_to_english() {
        let engine = TesseractEngine::new("", None);
        assert_eq!(engine.languages(), "eng");
    }

    #[test]
    fn test_initial_confidence_is_default() {
        let engine = TesseractEngine::new("deu+eng", None);
        assert_eq!(engine.confidence(), DEFAULT_CONFIDENCE);
        assert_eq!(engine.engine_type(), EngineType::Local);
    }

    #[test]
    fn test_availability_requires_every_traineddata() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("eng.traineddata"), b"x").unwrap();
        let path = Some(dir.path().to_string_lossy().into_owned());

        assert!(TesseractEngine::new("eng", path.clone()).is_available());
        assert!(!TesseractEngine::new("eng+deu", path).is_available());
    }
}
