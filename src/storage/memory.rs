use crate::state::FieldMap;
use crate::storage::traits::{BlobStore, RecordStore, StorageResult};
use crate::storage::{AcquiredRecord, FileKind};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// In-process blob store
///
/// Handles are `mem://<kind-dir>/<name>`.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of a stored blob by handle
    pub fn get(&self, handle: &str) -> Option<Vec<u8>> {
        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(handle)
            .cloned()
    }

    /// Number of stored blobs
    pub fn len(&self) -> usize {
        self.blobs.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BlobStore for MemoryBlobStore {
    fn put_blob(&self, kind: FileKind, name: &str, bytes: &[u8]) -> StorageResult<String> {
        let handle = format!("mem://{}/{}", kind.blob_dir(), name);
        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(handle.clone(), bytes.to_vec());
        Ok(handle)
    }
}

/// In-process record store
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: Mutex<Vec<AcquiredRecord>>,
    fields: Mutex<HashMap<String, FieldMap>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every record written, in write order
    pub fn records(&self) -> Vec<AcquiredRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Field map written for an institute, if any
    pub fn fields(&self, institute_id: &str) -> Option<FieldMap> {
        self.fields
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(institute_id)
            .cloned()
    }
}

impl RecordStore for MemoryRecordStore {
    fn put_record(&self, record: &AcquiredRecord) -> StorageResult<()> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        Ok(())
    }

    fn put_fields(&self, institute_id: &str, fields: &FieldMap) -> StorageResult<()> {
        self.fields
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(institute_id.to_string(), fields.clone());
        Ok(())
    }
}
