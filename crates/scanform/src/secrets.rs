//! Credential resolution for the remote OCR engine.
//!
//! The remote engine's key is read from, in priority order:
//!
//! 1. **Credentials file** - `ocr.google_vision.credentials_path`, the Docker
//!    secrets pattern (e.g. `/run/secrets/vision_key`)
//! 2. **Environment variable** - named by `ocr.google_vision.api_key_env_var`
//!
//! Resolved values are wrapped in `SecretString` and never logged.

use std::fs;
use std::path::PathBuf;

use secrecy::SecretString;

/// Error type for secret resolution failures.
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("No credential source provided (need a credentials file or an env var name)")]
    NoSourceProvided,

    #[error("Failed to read credentials from file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Credentials file '{path}' is empty")]
    EmptyFile { path: String },

    #[error("Environment variable '{name}' not set")]
    EnvVarNotSet { name: String },

    #[error("Environment variable '{name}' contains invalid UTF-8")]
    EnvVarNotUnicode { name: String },
}

pub type Result<T> = std::result::Result<T, SecretError>;

/// Resolves a credential from a file path or, failing that, an env var.
///
/// A configured but unreadable file is an error; the env var is only
/// consulted when no file path is configured.
pub fn resolve_secret(file_path: Option<&str>, env_var: Option<&str>) -> Result<SecretString> {
    if let Some(path) = file_path.filter(|p| !p.is_empty()) {
        let expanded = expand_home(path);
        let content = fs::read_to_string(&expanded).map_err(|e| SecretError::FileReadError {
            path: expanded.clone(),
            source: e,
        })?;
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(SecretError::EmptyFile { path: expanded });
        }
        return Ok(SecretString::from(trimmed.to_string()));
    }

    if let Some(var_name) = env_var.filter(|v| !v.is_empty()) {
        return match std::env::var(var_name) {
            Ok(value) if !value.trim().is_empty() => Ok(SecretString::from(value.trim())),
            Ok(_) | Err(std::env::VarError::NotPresent) => Err(SecretError::EnvVarNotSet {
                name: var_name.to_string(),
            }),
            Err(std::env::VarError::NotUnicode(_)) => Err(SecretError::EnvVarNotUnicode {
                name: var_name.to_string(),
            }),
        };
    }

    Err(SecretError::NoSourceProvided)
}

/// Cheap presence check used for engine availability: an explicit file
/// path must exist; otherwise the env var must be set and non-empty.
pub fn credential_source_present(file_path: Option<&str>, env_var: Option<&str>) -> bool {
    if let Some(path) = file_path.filter(|p| !p.is_empty()) {
        return PathBuf::from(expand_home(path)).exists();
    }

    env_var
        .filter(|v| !v.is_empty())
        .and_then(|name| std::env::var(name).ok())
        .is_some_and(|value| !value.trim().is_empty())
}

/// Expands a leading `~` to the user's home directory.
fn expand_home(path: &str) -> String {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            if path == "~" {
                return home.to_string_lossy().into_owned();
            }
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}
