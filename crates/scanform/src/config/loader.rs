use std::path::{Path, PathBuf};

use crate::config::schema::{Config, DEFAULT_MAX_UPLOAD_BYTES};
use crate::error::ConfigError;
use crate::ocr::language;

const SCHEMA_JSON: &str = include_str!("../../schema/config-v1.json");

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

/// Returns the canonical config path: `~/.scanform/config.json`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".scanform").join("config.json"))
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if config.upload_directory.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "upload_directory must not be empty".to_string(),
        });
    }

    if config.worker_count == 0 {
        return Err(ConfigError::Validation {
            message: "worker_count must be greater than 0".to_string(),
        });
    }

    if config.max_upload_bytes == 0 || config.max_upload_bytes > DEFAULT_MAX_UPLOAD_BYTES {
        return Err(ConfigError::Validation {
            message: format!(
                "max_upload_bytes must be between 1 and {}",
                DEFAULT_MAX_UPLOAD_BYTES
            ),
        });
    }

    if !(72..=600).contains(&config.ocr.pdf_dpi) {
        return Err(ConfigError::Validation {
            message: format!("pdf_dpi must be between 72 and 600, got {}", config.ocr.pdf_dpi),
        });
    }

    if !language::is_language_supported(&config.ocr.preferred_language) {
        return Err(ConfigError::Validation {
            message: format!(
                "Unsupported preferred_language: {}",
                config.ocr.preferred_language
            ),
        });
    }

    if config.ocr.google_vision.max_retries > 10 {
        return Err(ConfigError::Validation {
            message: "google_vision.max_retries must be at most 10".to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::EngineType;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_valid_config() {
        let config_json = r#"
        {
            "version": "1.0",
            "upload_directory": "/var/scanform/uploads",
            "database_path": "/var/scanform/scanform.db",
            "worker_count": 4,
            "ocr": {
                "default_engine": "tesseract",
                "auto_detect_handwriting": false,
                "pdf_dpi": 200,
                "preferred_language": "de",
                "tesseract": { "language": "deu", "additional_languages": ["eng"] },
                "google_vision": {
                    "enabled": true,
                    "credentials_path": "/run/secrets/vision",
                    "language_hints": ["de", "en"]
                }
            }
        }
        "#;

        let config = load_config_from_str(config_json).unwrap();
        assert_eq!(config.worker_count, 4);
        assert_eq!(config.ocr.default_engine, EngineType::Local);
        assert!(!config.ocr.auto_detect_handwriting);
        assert_eq!(config.ocr.pdf_dpi, 200);
        assert_eq!(config.ocr.tesseract.additional_languages, vec!["eng"]);
        assert_eq!(config.ocr.google_vision.language_hints, vec!["de", "en"]);
        assert_eq!(config.ocr.google_vision.timeout_secs, 30);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"version": "1.0", "upload_directory": "/tmp/uploads"}}"#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.upload_directory, "/tmp/uploads");
    }

    #[test]
    fn test_missing_file() {
        let result = load_config("/nonexistent/scanform.json");
        assert!(matches!(result, Err(ConfigError::ReadFile { .. })));
    }

    #[test]
    fn test_invalid_json() {
        let result = load_config_from_str("{ not json");
        assert!(matches!(result, Err(ConfigError::ParseJson(_))));
    }

    #[test]
    fn test_schema_rejects_missing_upload_directory() {
        let result = load_config_from_str(r#"{"version": "1.0"}"#);
        assert!(matches!(result, Err(ConfigError::SchemaValidation { .. })));
    }

    #[test]
    fn test_schema_rejects_unknown_engine() {
        let result = load_config_from_str(
            r#"{"version": "1.0", "upload_directory": "/u", "ocr": {"default_engine": "abbyy"}}"#,
        );
        assert!(matches!(result, Err(ConfigError::SchemaValidation { .. })));
    }

    #[test]
    fn test_rejects_unsupported_version() {
        let result = load_config_from_str(r#"{"version": "2.0", "upload_directory": "/u"}"#);
        match result {
            Err(ConfigError::SchemaValidation { .. }) | Err(ConfigError::Validation { .. }) => {}
            other => panic!("Expected version rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_oversized_upload_limit() {
        let result = load_config_from_str(
            r#"{"version": "1.0", "upload_directory": "/u", "max_upload_bytes": 104857600}"#,
        );
        match result {
            Err(ConfigError::Validation { message }) => {
                assert!(message.contains("max_upload_bytes"))
            }
            other => panic!("Expected Validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_dpi_out_of_range() {
        let result = load_config_from_str(
            r#"{"version": "1.0", "upload_directory": "/u", "ocr": {"pdf_dpi": 20}}"#,
        );
        match result {
            Err(ConfigError::Validation { message }) => assert!(message.contains("pdf_dpi")),
            other => panic!("Expected Validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_unsupported_preferred_language() {
        let result = load_config_from_str(
            r#"{"version": "1.0", "upload_directory": "/u", "ocr": {"preferred_language": "xx"}}"#,
        );
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_default_config_path() {
        let path = default_config_path().unwrap();
        assert!(path.ends_with(".scanform/config.json"));
    }
}
