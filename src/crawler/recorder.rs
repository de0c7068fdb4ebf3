//! Acquisition recorder
//!
//! Persists fetched pages and documents: blob first, then the record that
//! references the blob handle. Records are deduplicated by normalized URL for
//! the lifetime of the recorder (one crawl session).

use crate::storage::{AcquiredRecord, BlobStore, FileKind, RecordStore};
use crate::url::{file_name, normalize_parsed, NormalizedUrl};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, info};
use url::Url;

use super::processor::document_title;

const MAX_BLOB_NAME_LEN: usize = 200;

/// Hex characters of the URL digest carried in every blob name
const DIGEST_LEN: usize = 12;
const MAX_EXTENSION_LEN: usize = 16;

#[derive(Default)]
struct Recorded {
    by_key: HashMap<NormalizedUrl, usize>,
    records: Vec<AcquiredRecord>,
}

/// A page record and whether the call that returned it wrote it
#[derive(Debug, Clone)]
pub struct PageRecording {
    pub record: AcquiredRecord,
    pub newly_written: bool,
}

/// Writes acquired content to the blob and record sinks
pub struct AcquisitionRecorder {
    institute_id: String,
    blobs: Arc<dyn BlobStore>,
    records: Arc<dyn RecordStore>,
    recorded: Mutex<Recorded>,
}

impl AcquisitionRecorder {
    pub fn new(
        institute_id: impl Into<String>,
        blobs: Arc<dyn BlobStore>,
        records: Arc<dyn RecordStore>,
    ) -> Self {
        Self {
            institute_id: institute_id.into(),
            blobs,
            records,
            recorded: Mutex::new(Recorded::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Recorded> {
        self.recorded.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records a page
    ///
    /// A page whose normalized URL was already recorded is not written again;
    /// the existing record is returned. Returns `None` if storage failed.
    pub fn record_page(
        &self,
        url: &Url,
        title: &str,
        markup: &str,
        metadata: Option<Value>,
    ) -> Option<AcquiredRecord> {
        self.record_page_tracked(url, title, markup, metadata)
            .map(|recording| recording.record)
    }

    /// Same as `record_page`, also telling whether this call wrote the record
    pub fn record_page_tracked(
        &self,
        url: &Url,
        title: &str,
        markup: &str,
        metadata: Option<Value>,
    ) -> Option<PageRecording> {
        let key = key_of(url)?;

        // The lock is held across the write so a concurrent duplicate waits
        // for the first write and then sees its record.
        let mut recorded = self.lock();
        if let Some(&index) = recorded.by_key.get(&key) {
            debug!("Page already recorded: {}", url);
            return Some(PageRecording {
                record: recorded.records[index].clone(),
                newly_written: false,
            });
        }

        let record = self.persist(
            FileKind::Html,
            &page_blob_name(url, &key),
            markup.as_bytes(),
            url,
            title.to_string(),
            metadata,
        )?;

        info!("Recorded page: {} ({})", url, title);
        let index = recorded.records.len();
        recorded.records.push(record.clone());
        recorded.by_key.insert(key, index);
        Some(PageRecording {
            record,
            newly_written: true,
        })
    }

    /// Records a document
    ///
    /// Skipped entirely (returns `None`) if the normalized URL was already
    /// recorded or if storage failed.
    pub fn record_document(&self, url: &Url, bytes: &[u8]) -> Option<AcquiredRecord> {
        let key = key_of(url)?;

        let mut recorded = self.lock();
        if recorded.by_key.contains_key(&key) {
            debug!("Document already recorded: {}", url);
            return None;
        }

        let record = self.persist(
            FileKind::Pdf,
            &document_blob_name(url, &key),
            bytes,
            url,
            document_title(url),
            None,
        )?;

        info!("Recorded document: {} ({} bytes)", url, bytes.len());
        let index = recorded.records.len();
        recorded.records.push(record.clone());
        recorded.by_key.insert(key, index);
        Some(record)
    }

    fn persist(
        &self,
        kind: FileKind,
        blob_name: &str,
        bytes: &[u8],
        url: &Url,
        title: String,
        metadata: Option<Value>,
    ) -> Option<AcquiredRecord> {
        let storage_url = match self.blobs.put_blob(kind, blob_name, bytes) {
            Ok(handle) => handle,
            Err(e) => {
                error!("Failed to store {} blob for {}: {}", kind, url, e);
                return None;
            }
        };

        let record = AcquiredRecord {
            institute_id: self.institute_id.clone(),
            actual_url: url.to_string(),
            storage_url,
            title,
            status: true,
            file_type: kind,
            metadata,
        };

        if let Err(e) = self.records.put_record(&record) {
            error!("Failed to write record for {}: {}", url, e);
            return None;
        }

        Some(record)
    }

    /// Every record written this session, in write order
    pub fn records(&self) -> Vec<AcquiredRecord> {
        self.lock().records.clone()
    }

    /// Number of records of one kind written this session
    pub fn count(&self, kind: FileKind) -> usize {
        self.lock()
            .records
            .iter()
            .filter(|r| r.file_type == kind)
            .count()
    }
}

fn key_of(url: &Url) -> Option<NormalizedUrl> {
    match normalize_parsed(url) {
        Ok(key) => Some(key),
        Err(e) => {
            debug!("Not recording {}: {}", url, e);
            None
        }
    }
}

/// `<host>_<path with '/' replaced by '_'>-<digest>.html`
fn page_blob_name(url: &Url, key: &NormalizedUrl) -> String {
    let stem = format!(
        "{}_{}",
        url.host_str().unwrap_or("page"),
        url.path().replace('/', "_")
    );
    blob_name(&stem, "html", key)
}

/// `<lower-cased file stem>-<digest>.<extension>`
fn document_blob_name(url: &Url, key: &NormalizedUrl) -> String {
    let name = file_name(url).to_lowercase();
    match name.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() => blob_name(stem, extension, key),
        _ => blob_name(&name, "pdf", key),
    }
}

/// Names are unique per normalized URL: distinct URLs whose readable parts
/// sanitize alike still get distinct blobs.
fn blob_name(stem: &str, extension: &str, key: &NormalizedUrl) -> String {
    let digest = hex::encode(Sha256::digest(key.as_str().as_bytes()));
    let mut extension = sanitize(extension);
    extension.truncate(MAX_EXTENSION_LEN);

    // Sanitized names are ASCII, so byte truncation stays on a char boundary
    let mut stem = sanitize(stem);
    stem.truncate(MAX_BLOB_NAME_LEN - DIGEST_LEN - extension.len() - 2);
    format!("{}-{}.{}", stem, &digest[..DIGEST_LEN], extension)
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '%') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryBlobStore, MemoryRecordStore, StorageError, StorageResult};
    use serde_json::json;

    struct FailingBlobStore;

    impl BlobStore for FailingBlobStore {
        fn put_blob(&self, _kind: FileKind, _name: &str, _bytes: &[u8]) -> StorageResult<String> {
            Err(StorageError::Unavailable("disk full".to_string()))
        }
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn recorder() -> (AcquisitionRecorder, Arc<MemoryBlobStore>, Arc<MemoryRecordStore>) {
        let blobs = Arc::new(MemoryBlobStore::new());
        let records = Arc::new(MemoryRecordStore::new());
        let recorder = AcquisitionRecorder::new("1042", blobs.clone(), records.clone());
        (recorder, blobs, records)
    }

    fn key(s: &str) -> NormalizedUrl {
        normalize_parsed(&url(s)).unwrap()
    }

    #[test]
    fn test_page_blob_name() {
        let fees = "https://example.edu/admissions/fees";
        let name = page_blob_name(&url(fees), &key(fees));
        assert!(name.starts_with("example.edu__admissions_fees-"));
        assert!(name.ends_with(".html"));
        assert_eq!(name.len(), "example.edu__admissions_fees-".len() + DIGEST_LEN + 5);

        let root = "https://example.edu/";
        assert!(page_blob_name(&url(root), &key(root)).starts_with("example.edu__-"));
    }

    #[test]
    fn test_document_blob_name() {
        let brochure = "https://example.edu/docs/Brochure.PDF";
        let name = document_blob_name(&url(brochure), &key(brochure));
        assert!(name.starts_with("brochure-"));
        assert!(name.ends_with(".pdf"));
    }

    #[test]
    fn test_blob_name_is_capped_and_keeps_digest() {
        let long = format!("https://example.edu/{}", "a".repeat(400));
        let name = page_blob_name(&url(&long), &key(&long));
        assert!(name.len() <= MAX_BLOB_NAME_LEN);
        assert!(name.ends_with(".html"));

        let other = format!("https://example.edu/{}b", "a".repeat(400));
        assert_ne!(name, page_blob_name(&url(&other), &key(&other)));
    }

    #[test]
    fn test_same_file_name_in_different_folders() {
        let (recorder, blobs, records) = recorder();
        let old = recorder
            .record_document(&url("https://example.edu/2024/fees.pdf"), b"FEES-2024")
            .unwrap();
        let new = recorder
            .record_document(&url("https://example.edu/2025/fees.pdf"), b"FEES-2025")
            .unwrap();

        assert_ne!(old.storage_url, new.storage_url);
        assert_eq!(blobs.get(&old.storage_url), Some(b"FEES-2024".to_vec()));
        assert_eq!(blobs.get(&new.storage_url), Some(b"FEES-2025".to_vec()));
        assert_eq!(records.records().len(), 2);
    }

    #[test]
    fn test_pages_with_alike_paths_keep_own_blobs() {
        let (recorder, blobs, _) = recorder();
        let underscore = recorder
            .record_page(&url("https://example.edu/a_b"), "A B", "<p>underscore</p>", None)
            .unwrap();
        let nested = recorder
            .record_page(&url("https://example.edu/a/b"), "A/B", "<p>nested</p>", None)
            .unwrap();

        assert_ne!(underscore.storage_url, nested.storage_url);
        assert_eq!(blobs.get(&underscore.storage_url), Some(b"<p>underscore</p>".to_vec()));
        assert_eq!(blobs.get(&nested.storage_url), Some(b"<p>nested</p>".to_vec()));
        assert_eq!(blobs.len(), 2);
    }

    #[test]
    fn test_record_page() {
        let (recorder, blobs, records) = recorder();
        let record = recorder
            .record_page(
                &url("https://example.edu/fees"),
                "Fees",
                "<p>Fees</p>",
                Some(json!(["fees"])),
            )
            .unwrap();

        assert_eq!(record.institute_id, "1042");
        assert_eq!(record.actual_url, "https://example.edu/fees");
        assert!(record.storage_url.starts_with("mem://htmls/example.edu__fees-"));
        assert!(record.storage_url.ends_with(".html"));
        assert_eq!(record.file_type, FileKind::Html);
        assert!(record.status);
        assert_eq!(record.metadata, Some(json!(["fees"])));

        assert_eq!(blobs.get(&record.storage_url), Some(b"<p>Fees</p>".to_vec()));
        assert_eq!(records.records(), vec![record]);
    }

    #[test]
    fn test_record_page_twice_writes_once() {
        let (recorder, blobs, records) = recorder();
        let first = recorder
            .record_page(&url("https://example.edu/fees"), "Fees", "a", None)
            .unwrap();
        let second = recorder
            .record_page(&url("http://www.example.edu/fees/"), "Other", "b", None)
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(records.records().len(), 1);

        let third = recorder
            .record_page_tracked(&url("https://example.edu/fees"), "Fees", "c", None)
            .unwrap();
        assert!(!third.newly_written);
        assert_eq!(blobs.len(), 1);
    }

    #[test]
    fn test_record_document_twice_writes_once() {
        let (recorder, _, records) = recorder();
        let doc = url("https://example.edu/Brochure.pdf");

        let record = recorder.record_document(&doc, b"%PDF-1.7").unwrap();
        assert_eq!(record.title, "brochure");
        assert_eq!(record.file_type, FileKind::Pdf);
        assert!(record.metadata.is_none());

        assert!(recorder.record_document(&doc, b"%PDF-1.7").is_none());
        assert_eq!(records.records().len(), 1);
        assert_eq!(recorder.count(FileKind::Pdf), 1);
        assert_eq!(recorder.count(FileKind::Html), 0);
    }

    #[test]
    fn test_blob_failure_skips_record() {
        let records = Arc::new(MemoryRecordStore::new());
        let recorder = AcquisitionRecorder::new("1042", Arc::new(FailingBlobStore), records.clone());

        assert!(recorder
            .record_page(&url("https://example.edu/fees"), "Fees", "x", None)
            .is_none());
        assert!(records.records().is_empty());
        assert!(recorder.records().is_empty());

        // Nothing was claimed, so a later attempt is not treated as a duplicate
        assert!(recorder
            .record_page(&url("https://example.edu/fees"), "Fees", "x", None)
            .is_none());
    }
}
