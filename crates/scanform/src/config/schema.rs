use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::ocr::EngineType;

/// 50 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    pub upload_directory: String,
    #[serde(default)]
    pub database_path: Option<String>,
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
    #[serde(default)]
    pub ocr: OcrConfig,
}

impl Config {
    /// In-code defaults rooted at the given upload directory.
    pub fn default_for(upload_directory: impl Into<String>) -> Self {
        Self {
            version: "1.0".to_string(),
            upload_directory: upload_directory.into(),
            database_path: None,
            worker_count: default_worker_count(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            ocr: OcrConfig::default(),
        }
    }

    /// The configured database path, or the platform default.
    pub fn resolved_database_path(&self) -> Option<PathBuf> {
        self.database_path
            .as_ref()
            .map(PathBuf::from)
            .or_else(crate::db::default_database_path)
    }
}

fn default_worker_count() -> usize {
    num_cpus::get()
}

fn default_max_upload_bytes() -> u64 {
    DEFAULT_MAX_UPLOAD_BYTES
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    #[serde(default)]
    pub default_engine: EngineType,
    #[serde(default = "default_true")]
    pub auto_detect_handwriting: bool,
    #[serde(default = "default_dpi")]
    pub pdf_dpi: u32,
    #[serde(default = "default_preferred_language")]
    pub preferred_language: String,
    #[serde(default)]
    pub tesseract: LocalEngineConfig,
    #[serde(default)]
    pub google_vision: RemoteEngineConfig,
}

fn default_true() -> bool {
    true
}

fn default_dpi() -> u32 {
    300
}

fn default_preferred_language() -> String {
    "en".to_string()
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            default_engine: EngineType::default(),
            auto_detect_handwriting: true,
            pdf_dpi: default_dpi(),
            preferred_language: default_preferred_language(),
            tesseract: LocalEngineConfig::default(),
            google_vision: RemoteEngineConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalEngineConfig {
    /// Directory containing `*.traineddata`; Tesseract's own default if unset.
    #[serde(default)]
    pub data_path: Option<String>,
    #[serde(default = "default_tesseract_language")]
    pub language: String,
    #[serde(default)]
    pub additional_languages: Vec<String>,
}

fn default_tesseract_language() -> String {
    "eng".to_string()
}

impl Default for LocalEngineConfig {
    fn default() -> Self {
        Self {
            data_path: None,
            language: default_tesseract_language(),
            additional_languages: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteEngineConfig {
    #[serde(default)]
    pub enabled: bool,
    /// File holding the API key. When set, it must exist for the engine to
    /// be available.
    #[serde(default)]
    pub credentials_path: Option<String>,
    #[serde(default = "default_api_key_env_var")]
    pub api_key_env_var: String,
    #[serde(default = "default_language_hints")]
    pub language_hints: Vec<String>,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_api_key_env_var() -> String {
    "GOOGLE_VISION_API_KEY".to_string()
}

fn default_language_hints() -> Vec<String> {
    vec!["en".to_string()]
}

fn default_endpoint() -> String {
    "https://vision.googleapis.com/v1/images:annotate".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

impl Default for RemoteEngineConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            credentials_path: None,
            api_key_env_var: default_api_key_env_var(),
            language_hints: default_language_hints(),
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_gets_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"version": "1.0", "upload_directory": "/uploads"}"#).unwrap();

        assert_eq!(config.max_upload_bytes, 52_428_800);
        assert!(config.worker_count > 0);
        assert_eq!(config.ocr.default_engine, EngineType::Local);
        assert!(config.ocr.auto_detect_handwriting);
        assert_eq!(config.ocr.pdf_dpi, 300);
        assert_eq!(config.ocr.tesseract.language, "eng");
        assert!(!config.ocr.google_vision.enabled);
        assert_eq!(config.ocr.google_vision.language_hints, vec!["en"]);
    }

    #[test]
    fn test_engine_aliases() {
        let config: OcrConfig =
            serde_json::from_str(r#"{"default_engine": "google_vision"}"#).unwrap();
        assert_eq!(config.default_engine, EngineType::Remote);

        let config: OcrConfig = serde_json::from_str(r#"{"default_engine": "local"}"#).unwrap();
        assert_eq!(config.default_engine, EngineType::Local);
    }

    #[test]
    fn test_default_for() {
        let config = Config::default_for("/tmp/uploads");
        assert_eq!(config.version, "1.0");
        assert_eq!(config.upload_directory, "/tmp/uploads");
        assert_eq!(config.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
    }
}
