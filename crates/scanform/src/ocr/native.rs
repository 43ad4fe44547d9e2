//! One-time native OCR setup.
//!
//! Tesseract reads its traineddata from a directory picked once per
//! process. `init_native` records that directory and checks it exists; it
//! runs at most once no matter how many threads call it.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use super::OcrError;

static NATIVE_INIT: OnceLock<Result<Option<PathBuf>, String>> = OnceLock::new();

/// Initializes native OCR state. Later calls return the first outcome.
pub fn init_native(data_path: Option<&str>) -> Result<(), OcrError> {
    let outcome = NATIVE_INIT.get_or_init(|| {
        let resolved = match data_path.filter(|p| !p.is_empty()) {
            Some(p) => Some(check_data_path(Path::new(p))?),
            None => std::env::var_os("TESSDATA_PREFIX").map(PathBuf::from),
        };
        match &resolved {
            Some(p) => tracing::info!(tessdata = %p.display(), "Native OCR initialized"),
            None => tracing::info!("Native OCR initialized with Tesseract's default data path"),
        }
        Ok(resolved)
    });

    outcome
        .as_ref()
        .map(|_| ())
        .map_err(|e| OcrError::Initialization(e.clone()))
}

/// The tessdata directory chosen at init, if any.
pub fn tessdata_path() -> Option<&'static Path> {
    NATIVE_INIT
        .get()
        .and_then(|r| r.as_ref().ok())
        .and_then(|p| p.as_deref())
}

fn check_data_path(path: &Path) -> Result<PathBuf, String> {
    if path.is_dir() {
        Ok(path.to_path_buf())
    } else {
        Err(format!("tessdata directory '{}' does not exist", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_data_path() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(check_data_path(dir.path()).unwrap(), dir.path());
        assert!(check_data_path(&dir.path().join("missing")).is_err());
    }
}
