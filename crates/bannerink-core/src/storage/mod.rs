//! Project persistence.
//!
//! Saves are advisory: the editor keeps working when a backend fails, and a
//! document that does not validate is never written.

mod autosave;
mod file;
mod memory;

pub use autosave::{AutoSaveManager, DEFAULT_AUTOSAVE_DEBOUNCE_MS, LAST_DOCUMENT_KEY, create_default_storage};
pub use file::FileStorage;
pub use memory::MemoryStorage;

use crate::document::{Document, ValidationError};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Project not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Refusing to save invalid project: {0}")]
    Validation(#[from] ValidationError),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Boxed future returned by storage backends.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// A place projects can be saved to, keyed by project id.
pub trait Storage: Send + Sync {
    fn save(&self, id: &str, document: &Document) -> BoxFuture<'_, StorageResult<()>>;

    fn load(&self, id: &str) -> BoxFuture<'_, StorageResult<Document>>;

    fn delete(&self, id: &str) -> BoxFuture<'_, StorageResult<()>>;

    /// All stored project ids.
    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>>;

    fn exists(&self, id: &str) -> BoxFuture<'_, StorageResult<bool>>;
}

/// Parse a stored project, clamping anything out of range.
fn decode(json: &str, origin: &str) -> StorageResult<Document> {
    let mut document = Document::from_json(json)
        .map_err(|e| StorageError::Serialization(format!("Failed to parse {origin}: {e}")))?;
    if document.validate().is_err() {
        log::warn!("Stored project {origin} is out of range, clamping");
        document.sanitize();
    }
    Ok(document)
}
