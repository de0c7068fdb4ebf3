//! SQLite record store
//!
//! This module provides a SQLite-based implementation of the RecordStore trait.

use crate::state::FieldMap;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{RecordStore, StorageError, StorageResult};
use crate::storage::{AcquiredRecord, FileKind};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// SQLite record index
pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
}

impl SqliteRecordStore {
    /// Opens or creates the record index at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteRecordStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns all records for an institute, oldest first
    pub fn get_records(&self, institute_id: &str) -> StorageResult<Vec<AcquiredRecord>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT institute_id, actual_url, storage_url, title, status, file_type, metadata
             FROM acquired_records WHERE institute_id = ?1 ORDER BY id",
        )?;

        let rows = stmt.query_map(params![institute_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, bool>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, Option<String>>(6)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (institute_id, actual_url, storage_url, title, status, file_type, metadata) = row?;
            let file_type = FileKind::from_db_string(&file_type).ok_or_else(|| {
                StorageError::Unavailable(format!("unknown file_type '{}'", file_type))
            })?;
            let metadata = metadata
                .map(|text| serde_json::from_str(&text))
                .transpose()?;

            records.push(AcquiredRecord {
                institute_id,
                actual_url,
                storage_url,
                title,
                status,
                file_type,
                metadata,
            });
        }

        Ok(records)
    }

    /// Counts records of one kind for an institute
    pub fn count_records(&self, institute_id: &str, kind: FileKind) -> StorageResult<u64> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM acquired_records WHERE institute_id = ?1 AND file_type = ?2",
            params![institute_id, kind.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Returns the stored field map for an institute, if any
    pub fn get_fields(&self, institute_id: &str) -> StorageResult<Option<FieldMap>> {
        let text: Option<String> = self
            .conn()
            .query_row(
                "SELECT fields FROM extracted_fields WHERE institute_id = ?1",
                params![institute_id],
                |row| row.get(0),
            )
            .optional()?;

        Ok(text.map(|t| serde_json::from_str(&t)).transpose()?)
    }
}

impl RecordStore for SqliteRecordStore {
    fn put_record(&self, record: &AcquiredRecord) -> StorageResult<()> {
        let metadata = record
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        self.conn().execute(
            "INSERT INTO acquired_records
                (institute_id, actual_url, storage_url, title, status, file_type, metadata, acquired_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(institute_id, actual_url) DO UPDATE SET
                storage_url = excluded.storage_url,
                title = excluded.title,
                status = excluded.status,
                file_type = excluded.file_type,
                metadata = excluded.metadata,
                acquired_at = excluded.acquired_at",
            params![
                record.institute_id,
                record.actual_url,
                record.storage_url,
                record.title,
                record.status,
                record.file_type.to_db_string(),
                metadata,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn put_fields(&self, institute_id: &str, fields: &FieldMap) -> StorageResult<()> {
        let text = serde_json::to_string(fields)?;
        self.conn().execute(
            "INSERT INTO extracted_fields (institute_id, fields, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(institute_id) DO UPDATE SET
                fields = excluded.fields,
                updated_at = excluded.updated_at",
            params![institute_id, text, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn create_test_record(url: &str, kind: FileKind) -> AcquiredRecord {
        AcquiredRecord {
            institute_id: "42".to_string(),
            actual_url: url.to_string(),
            storage_url: format!("file:///blobs/42/{}", kind.blob_dir()),
            title: "Test".to_string(),
            status: true,
            file_type: kind,
            metadata: Some(json!(["admissions"])),
        }
    }

    #[test]
    fn test_create_in_memory() {
        assert!(SqliteRecordStore::new_in_memory().is_ok());
    }

    #[test]
    fn test_create_on_disk_with_missing_parent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("records.db");
        let store = SqliteRecordStore::new(&path).unwrap();
        store
            .put_record(&create_test_record("https://example.edu/", FileKind::Html))
            .unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_put_and_get_records() {
        let store = SqliteRecordStore::new_in_memory().unwrap();
        store
            .put_record(&create_test_record("https://example.edu/", FileKind::Html))
            .unwrap();
        store
            .put_record(&create_test_record(
                "https://example.edu/brochure.pdf",
                FileKind::Pdf,
            ))
            .unwrap();

        let records = store.get_records("42").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].actual_url, "https://example.edu/");
        assert_eq!(records[0].metadata, Some(json!(["admissions"])));
        assert_eq!(records[1].file_type, FileKind::Pdf);

        assert_eq!(store.count_records("42", FileKind::Html).unwrap(), 1);
        assert_eq!(store.count_records("42", FileKind::Pdf).unwrap(), 1);
        assert_eq!(store.count_records("other", FileKind::Pdf).unwrap(), 0);
    }

    #[test]
    fn test_same_url_keeps_one_row() {
        let store = SqliteRecordStore::new_in_memory().unwrap();
        let record = create_test_record("https://example.edu/fees", FileKind::Html);
        store.put_record(&record).unwrap();
        store.put_record(&record).unwrap();

        assert_eq!(store.get_records("42").unwrap().len(), 1);
    }

    #[test]
    fn test_put_fields_upserts() {
        let store = SqliteRecordStore::new_in_memory().unwrap();
        assert!(store.get_fields("42").unwrap().is_none());

        let first = json!({"undergraduate_degrees": []});
        store
            .put_fields("42", first.as_object().unwrap())
            .unwrap();

        let second = json!({"undergraduate_degrees": ["B.Tech"]});
        store
            .put_fields("42", second.as_object().unwrap())
            .unwrap();

        let fields = store.get_fields("42").unwrap().unwrap();
        assert_eq!(fields["undergraduate_degrees"], json!(["B.Tech"]));
    }
}
