//! Immutable OCR settings snapshots.
//!
//! Runs capture an `Arc<OcrSettings>` when they start. Reconfiguration
//! builds a new snapshot and swaps it in under a write lock, so in-flight
//! runs keep the settings they started with.

use std::sync::{Arc, PoisonError, RwLock};

use crate::config::{LocalEngineConfig, OcrConfig, RemoteEngineConfig};

use super::language;
use super::EngineType;

#[derive(Debug, Clone)]
pub struct OcrSettings {
    pub default_engine: EngineType,
    pub auto_detect_handwriting: bool,
    pub preferred_language: String,
    pub local: LocalEngineConfig,
    pub remote: RemoteEngineConfig,
}

impl OcrSettings {
    pub fn from_config(config: &OcrConfig) -> Self {
        Self {
            default_engine: config.default_engine,
            auto_detect_handwriting: config.auto_detect_handwriting,
            preferred_language: config.preferred_language.clone(),
            local: config.tesseract.clone(),
            remote: config.google_vision.clone(),
        }
    }

    /// A copy with both engines switched to the given ISO languages.
    pub fn with_languages(&self, primary: &str, additional: &[String]) -> Self {
        let selection = language::resolve(primary, additional);
        let mut next = self.clone();
        next.local.language = selection.tesseract_primary;
        next.local.additional_languages = selection.tesseract_additional;
        next.remote.language_hints = selection.remote_hints;
        next
    }

    /// Tesseract's combined language tag, e.g. `deu+eng`.
    pub fn local_language_tag(&self) -> String {
        language::tesseract_language_tag(&self.local.language, &self.local.additional_languages)
    }
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self::from_config(&OcrConfig::default())
    }
}

pub struct SettingsStore {
    current: RwLock<Arc<OcrSettings>>,
}

impl SettingsStore {
    pub fn new(settings: OcrSettings) -> Self {
        Self {
            current: RwLock::new(Arc::new(settings)),
        }
    }

    pub fn snapshot(&self) -> Arc<OcrSettings> {
        // Writers only ever store a complete snapshot, so a poisoned lock
        // still holds a consistent value.
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Derives and installs a new snapshot while holding the write lock, so
    /// concurrent updates cannot interleave.
    pub fn update<F>(&self, f: F) -> Arc<OcrSettings>
    where
        F: FnOnce(&OcrSettings) -> OcrSettings,
    {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let next = Arc::new(f(&guard));
        *guard = Arc::clone(&next);
        next
    }
}
