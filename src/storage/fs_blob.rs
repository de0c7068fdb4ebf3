use crate::storage::traits::{BlobStore, StorageError, StorageResult};
use crate::storage::FileKind;
use std::path::{Path, PathBuf};
use url::Url;

/// Filesystem blob store
///
/// Layout: `<blob-dir>/<institute-id>/{htmls,documents}/<name>`.
/// Handles are `file://` URLs.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Creates a store rooted at `<blob_dir>/<institute_id>`
    ///
    /// Relative blob directories are resolved against the current directory
    /// so handles are always absolute.
    pub fn new(blob_dir: &Path, institute_id: &str) -> StorageResult<Self> {
        if !is_plain_segment(institute_id) {
            return Err(StorageError::InvalidName(institute_id.to_string()));
        }

        let base = if blob_dir.is_relative() {
            std::env::current_dir()?.join(blob_dir)
        } else {
            blob_dir.to_path_buf()
        };

        Ok(Self {
            root: base.join(institute_id),
        })
    }

    /// Root directory of this institute's blobs
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl BlobStore for FsBlobStore {
    fn put_blob(&self, kind: FileKind, name: &str, bytes: &[u8]) -> StorageResult<String> {
        if !is_plain_segment(name) {
            return Err(StorageError::InvalidName(name.to_string()));
        }

        let dir = self.root.join(kind.blob_dir());
        std::fs::create_dir_all(&dir)?;

        let path = dir.join(name);
        std::fs::write(&path, bytes)?;

        Url::from_file_path(&path)
            .map(|url| url.to_string())
            .map_err(|_| StorageError::InvalidName(path.display().to_string()))
    }
}

/// A single path component with no separators or dot segments
fn is_plain_segment(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(|c: char| c == '/' || c == '\\')
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_put_blob_layout() {
        let dir = tempdir().unwrap();
        let store = FsBlobStore::new(dir.path(), "1042").unwrap();

        let handle = store
            .put_blob(FileKind::Html, "example.edu__fees.html", b"<html></html>")
            .unwrap();

        let expected = dir.path().join("1042").join("htmls").join("example.edu__fees.html");
        assert!(expected.exists());
        assert!(handle.starts_with("file://"));
        assert!(handle.ends_with("/1042/htmls/example.edu__fees.html"));
        assert_eq!(std::fs::read(expected).unwrap(), b"<html></html>");
    }

    #[test]
    fn test_documents_go_to_documents_dir() {
        let dir = tempdir().unwrap();
        let store = FsBlobStore::new(dir.path(), "1042").unwrap();

        store
            .put_blob(FileKind::Pdf, "brochure.pdf", b"%PDF-1.7")
            .unwrap();

        assert!(dir
            .path()
            .join("1042")
            .join("documents")
            .join("brochure.pdf")
            .exists());
    }

    #[test]
    fn test_rejects_path_traversal() {
        let dir = tempdir().unwrap();
        let store = FsBlobStore::new(dir.path(), "1042").unwrap();

        assert!(matches!(
            store.put_blob(FileKind::Pdf, "../escape.pdf", b"x"),
            Err(StorageError::InvalidName(_))
        ));
        assert!(matches!(
            store.put_blob(FileKind::Pdf, "", b"x"),
            Err(StorageError::InvalidName(_))
        ));
        assert!(FsBlobStore::new(dir.path(), "../x").is_err());
    }
}
