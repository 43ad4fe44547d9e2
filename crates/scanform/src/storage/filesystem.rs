use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::StorageError;
use crate::sanitize;

use super::{ContentStore, StoredContent};

/// Flat upload directory. Each upload lands in `<uuid>_<sanitized name>`;
/// the locator is that file name.
pub struct FileStorage {
    upload_directory: PathBuf,
}

impl FileStorage {
    pub fn new<P: AsRef<Path>>(upload_directory: P) -> Self {
        Self {
            upload_directory: upload_directory.as_ref().to_path_buf(),
        }
    }

    pub fn upload_directory(&self) -> &Path {
        &self.upload_directory
    }

    fn ensure_directory(&self) -> Result<(), StorageError> {
        if !self.upload_directory.exists() {
            std::fs::create_dir_all(&self.upload_directory).map_err(|e| {
                StorageError::CreateDirectory {
                    path: self.upload_directory.clone(),
                    source: e,
                }
            })?;
        }
        Ok(())
    }

    /// Maps a locator back to a path inside the upload directory. Anything
    /// that could step outside it is treated as unknown.
    fn resolve(&self, locator: &str) -> Result<PathBuf, StorageError> {
        let is_plain_name = !locator.is_empty()
            && !locator.contains(['/', '\\'])
            && locator != "."
            && locator != "..";
        if !is_plain_name {
            return Err(StorageError::NotFound(locator.to_string()));
        }
        Ok(self.upload_directory.join(locator))
    }
}

impl ContentStore for FileStorage {
    fn store(&self, content: &[u8], original_filename: &str) -> Result<StoredContent, StorageError> {
        self.ensure_directory()?;

        let safe_name = sanitize::sanitize_filename(original_filename);

        // O_CREAT | O_EXCL: a uuid collision must never overwrite an upload.
        loop {
            let stored_filename = format!("{}_{}", uuid::Uuid::new_v4(), safe_name);
            let path = self.upload_directory.join(&stored_filename);

            match std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
            {
                Ok(mut file) => {
                    file.write_all(content)
                        .and_then(|_| file.sync_all())
                        .map_err(|e| StorageError::WriteFile {
                            path: path.clone(),
                            source: e,
                        })?;
                    return Ok(StoredContent {
                        locator: stored_filename.clone(),
                        stored_filename,
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(StorageError::WriteFile { path, source: e }),
            }
        }
    }

    fn load(&self, locator: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.resolve(locator)?;
        std::fs::read(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(locator.to_string())
            } else {
                StorageError::ReadFile { path, source: e }
            }
        })
    }

    fn remove(&self, locator: &str) -> Result<(), StorageError> {
        let path = self.resolve(locator)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::RemoveFile { path, source: e }),
        }
    }
}
