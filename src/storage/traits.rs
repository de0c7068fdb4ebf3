//! Storage traits and error types
//!
//! The crawler writes to two sinks: a blob store holding raw page markup and
//! document bytes, and a record store indexing what was acquired.

use crate::state::FieldMap;
use crate::storage::{AcquiredRecord, FileKind};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid blob name: {0}")]
    InvalidName(String),

    #[error("Sink unavailable: {0}")]
    Unavailable(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Sink for raw acquired content
///
/// Implementations must be safe to share between concurrent fetch cycles.
pub trait BlobStore: Send + Sync {
    /// Stores `bytes` and returns a handle URL referencing them
    ///
    /// # Arguments
    ///
    /// * `kind` - Whether the blob is page markup or a document
    /// * `name` - Suggested file name, already sanitized by the caller
    /// * `bytes` - The content to persist
    fn put_blob(&self, kind: FileKind, name: &str, bytes: &[u8]) -> StorageResult<String>;
}

/// Sink for acquired records and the final extracted-field map
pub trait RecordStore: Send + Sync {
    /// Writes one acquired record
    fn put_record(&self, record: &AcquiredRecord) -> StorageResult<()>;

    /// Writes the accumulated field map for an institute
    ///
    /// Called once at the end of a session.
    fn put_fields(&self, institute_id: &str, fields: &FieldMap) -> StorageResult<()>;
}
