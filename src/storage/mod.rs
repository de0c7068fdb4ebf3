//! Storage module for persisting acquired content
//!
//! This module provides the blob and record sinks the crawler writes to:
//! - `FsBlobStore`: page markup and documents on the local filesystem
//! - `SqliteRecordStore`: the acquired-record index and final field map
//! - `MemoryBlobStore` / `MemoryRecordStore`: in-process sinks

mod fs_blob;
mod memory;
mod schema;
mod sqlite;
mod traits;

pub use fs_blob::FsBlobStore;
pub use memory::{MemoryBlobStore, MemoryRecordStore};
pub use sqlite::SqliteRecordStore;
pub use traits::{BlobStore, RecordStore, StorageError, StorageResult};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Kind of acquired content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Html,
    Pdf,
}

impl FileKind {
    /// Converts the kind to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Pdf => "pdf",
        }
    }

    /// Parses a kind from its database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "html" => Some(Self::Html),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    /// Blob sub-directory for this kind
    pub fn blob_dir(&self) -> &'static str {
        match self {
            Self::Html => "htmls",
            Self::Pdf => "documents",
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// Persisted description of one acquired page or document
///
/// Created once per normalized URL per session and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquiredRecord {
    pub institute_id: String,
    pub actual_url: String,
    pub storage_url: String,
    pub title: String,
    pub status: bool,
    pub file_type: FileKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_file_kind_db_string() {
        assert_eq!(FileKind::Html.to_db_string(), "html");
        assert_eq!(FileKind::from_db_string("pdf"), Some(FileKind::Pdf));
        assert_eq!(FileKind::from_db_string("docx"), None);
    }

    #[test]
    fn test_record_serializes_with_lowercase_kind() {
        let record = AcquiredRecord {
            institute_id: "7".to_string(),
            actual_url: "https://example.edu/fees".to_string(),
            storage_url: "file:///tmp/7/htmls/example.edu__fees.html".to_string(),
            title: "Fees".to_string(),
            status: true,
            file_type: FileKind::Html,
            metadata: Some(json!(["fees"])),
        };

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["file_type"], "html");
        assert_eq!(value["status"], true);
        assert_eq!(value["metadata"], json!(["fees"]));
    }

    #[test]
    fn test_record_without_metadata_omits_field() {
        let record = AcquiredRecord {
            institute_id: "7".to_string(),
            actual_url: "https://example.edu/brochure.pdf".to_string(),
            storage_url: "mem://documents/brochure.pdf".to_string(),
            title: "brochure".to_string(),
            status: true,
            file_type: FileKind::Pdf,
            metadata: None,
        };

        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("metadata").is_none());
        assert_eq!(value["file_type"], "pdf");
    }
}
