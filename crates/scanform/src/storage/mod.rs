pub mod filesystem;

pub use filesystem::FileStorage;

use crate::error::StorageError;

/// Where an upload ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredContent {
    pub stored_filename: String,
    /// Opaque handle passed back to [`ContentStore::load`].
    pub locator: String,
}

/// Byte-stream access to uploaded content.
pub trait ContentStore: Send + Sync {
    fn store(&self, content: &[u8], original_filename: &str) -> Result<StoredContent, StorageError>;

    fn load(&self, locator: &str) -> Result<Vec<u8>, StorageError>;

    /// Removes stored content. Missing content is not an error.
    fn remove(&self, locator: &str) -> Result<(), StorageError>;
}
