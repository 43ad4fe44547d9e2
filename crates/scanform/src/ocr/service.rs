//! OCR entry point shared by all pipeline runs.
//!
//! `OcrService` owns the current settings snapshot. Each run opens an
//! `OcrSession`, which pins that snapshot and builds its own engine
//! instances, so per-run engine state (last confidence, HTTP client) is
//! never shared between documents.

use std::sync::Arc;

use image::GrayImage;
use serde::Serialize;

use crate::processor::is_handwritten;

use super::local::TesseractEngine;
use super::remote::VisionEngine;
use super::selector::{select_engine, Availability, SelectionReason};
use super::settings::{OcrSettings, SettingsStore};
use super::{EngineType, OcrEngine, OcrError};

/// One instance of each engine, built from a settings snapshot.
pub struct EngineSet {
    pub local: Box<dyn OcrEngine>,
    pub remote: Box<dyn OcrEngine>,
}

impl EngineSet {
    pub fn get(&self, engine: EngineType) -> &dyn OcrEngine {
        match engine {
            EngineType::Local => self.local.as_ref(),
            EngineType::Remote => self.remote.as_ref(),
        }
    }

    pub fn availability(&self) -> Availability {
        Availability {
            local: self.local.is_available(),
            remote: self.remote.is_available(),
        }
    }
}

/// Builds engines for a snapshot. Tests substitute scripted engines here.
pub trait EngineProvider: Send + Sync {
    fn engines(&self, settings: &OcrSettings) -> EngineSet;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultEngineProvider;

impl EngineProvider for DefaultEngineProvider {
    fn engines(&self, settings: &OcrSettings) -> EngineSet {
        EngineSet {
            local: Box::new(TesseractEngine::new(
                settings.local_language_tag(),
                settings.local.data_path.clone(),
            )),
            remote: Box::new(VisionEngine::new(settings.remote.clone())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineInfo {
    pub engine: EngineType,
    pub name: &'static str,
    pub available: bool,
    pub is_default: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentLanguages {
    pub preferred_language: String,
    pub local_tag: String,
    pub remote_hints: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OcrOutput {
    pub text: String,
    pub confidence: u8,
    pub engine: EngineType,
}

pub struct OcrService {
    settings: SettingsStore,
    provider: Arc<dyn EngineProvider>,
}

impl OcrService {
    pub fn new(settings: OcrSettings) -> Self {
        Self::with_provider(settings, Arc::new(DefaultEngineProvider))
    }

    pub fn with_provider(settings: OcrSettings, provider: Arc<dyn EngineProvider>) -> Self {
        Self {
            settings: SettingsStore::new(settings),
            provider,
        }
    }

    /// Opens a session pinned to the current settings.
    pub fn session(&self) -> OcrSession {
        let settings = self.settings.snapshot();
        let engines = self.provider.engines(&settings);
        OcrSession { settings, engines }
    }

    pub fn settings(&self) -> Arc<OcrSettings> {
        self.settings.snapshot()
    }

    /// Switches both engines to new ISO languages. Sessions already open
    /// keep their languages. An empty primary keeps the preferred language.
    pub fn set_language(&self, primary: &str, additional: &[String]) -> CurrentLanguages {
        let next = self.settings.update(|current| {
            let primary = match primary.trim() {
                "" => current.preferred_language.clone(),
                p => p.to_ascii_lowercase(),
            };
            let mut next = current.with_languages(&primary, additional);
            next.preferred_language = primary;
            next
        });
        tracing::info!(
            local = %next.local_language_tag(),
            remote = ?next.remote.language_hints,
            "OCR language updated"
        );
        current_languages_of(&next)
    }

    pub fn current_languages(&self) -> CurrentLanguages {
        current_languages_of(&self.settings.snapshot())
    }

    pub fn engine_status(&self) -> Vec<EngineInfo> {
        let settings = self.settings.snapshot();
        let engines = self.provider.engines(&settings);
        let availability = engines.availability();
        EngineType::ALL
            .iter()
            .map(|&engine| EngineInfo {
                engine,
                name: engine.display_name(),
                // Local is the fallback for everything, so it is always offered.
                available: engine == EngineType::Local || availability.is_available(engine),
                is_default: engine == settings.default_engine,
            })
            .collect()
    }

    /// Engines that can currently take requests. Local is always listed.
    pub fn available_engines(&self) -> Vec<EngineType> {
        self.engine_status()
            .into_iter()
            .filter(|e| e.available)
            .map(|e| e.engine)
            .collect()
    }

    pub fn is_handwriting_recognition_available(&self) -> bool {
        let settings = self.settings.snapshot();
        self.provider.engines(&settings).remote.is_available()
    }
}

fn current_languages_of(settings: &OcrSettings) -> CurrentLanguages {
    CurrentLanguages {
        preferred_language: settings.preferred_language.clone(),
        local_tag: settings.local_language_tag(),
        remote_hints: settings.remote.language_hints.clone(),
    }
}

/// Engines and settings for one pipeline run.
pub struct OcrSession {
    settings: Arc<OcrSettings>,
    engines: EngineSet,
}

impl OcrSession {
    pub fn settings(&self) -> &OcrSettings {
        &self.settings
    }

    /// Extracts text with the engine chosen by the selection policy.
    pub fn extract(&self, image: &GrayImage) -> Result<OcrOutput, OcrError> {
        self.extract_with(image, None)
    }

    /// Extracts text, optionally forcing an engine. A forced engine that
    /// is unavailable is replaced by the local engine.
    pub fn extract_with(
        &self,
        image: &GrayImage,
        requested: Option<EngineType>,
    ) -> Result<OcrOutput, OcrError> {
        let handwritten = (requested.is_none() && self.settings.auto_detect_handwriting)
            .then(|| is_handwritten(image));

        let selection = select_engine(
            requested,
            handwritten,
            self.settings.default_engine,
            self.engines.availability(),
        );
        match selection.reason {
            SelectionReason::Fallback { wanted } => tracing::warn!(
                "{} OCR engine is not available, falling back to {}",
                wanted,
                selection.engine
            ),
            reason => tracing::debug!(
                engine = %selection.engine,
                ?reason,
                ?handwritten,
                "Selected OCR engine"
            ),
        }

        let engine = self.engines.get(selection.engine);
        let text = engine.extract_text(image)?;
        Ok(OcrOutput {
            text,
            confidence: engine.confidence(),
            engine: selection.engine,
        })
    }
}
