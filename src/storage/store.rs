//! Local file store for one upload kind.
//!
//! Files live directly under the store root, optionally inside caller-chosen
//! folders:
//! ```text
//! {root}/
//! ├── donor_1700000000000_9f2c01ab.jpg
//! └── blood-reports/
//!     └── report_1700000000123_0a1b2c3d.pdf
//! ```
//! Writes go through a temporary file in the destination directory that is
//! renamed into place without replacing anything already there.

use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::naming::unique_name;
use super::range::ByteRange;
use super::sanitize::{resolve_under_root, sanitize_filename, sanitize_folder, validate_request_path};
use super::validate::UploadKind;
use crate::{Result, StorageError};

/// Prefix of in-flight upload files. Read paths starting with `.` are rejected.
const TEMP_PREFIX: &str = ".upload-";

/// Extension to content type table used when serving files.
const CONTENT_TYPES: &[(&str, &str)] = &[
    ("pdf", "application/pdf"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("svg", "image/svg+xml"),
    ("ico", "image/x-icon"),
    ("txt", "text/plain; charset=utf-8"),
    ("csv", "text/csv; charset=utf-8"),
    ("json", "application/json"),
];

/// Fallback content type for unknown extensions.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Look up the content type for a path by its extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return DEFAULT_CONTENT_TYPE;
    };
    let ext = ext.to_ascii_lowercase();

    CONTENT_TYPES
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, content_type)| *content_type)
        .unwrap_or(DEFAULT_CONTENT_TYPE)
}

/// Limits applied by a [`FileStore`].
#[derive(Debug, Clone, Copy)]
pub struct StoreSettings {
    /// Size ceiling in bytes for reads.
    pub max_file_size: u64,
    /// Fresh names tried before a write gives up.
    pub name_attempts: u32,
}

/// A file written by [`FileStore::write`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Generated filename.
    pub filename: String,
    /// Path relative to the store root, `/`-separated.
    pub relative_path: String,
    /// Size in bytes.
    pub size: u64,
}

/// A stored file located for reading.
#[derive(Debug, Clone)]
pub struct FileMeta {
    /// Canonical absolute path.
    pub path: PathBuf,
    /// Final path component.
    pub filename: String,
    /// Size in bytes.
    pub size: u64,
    /// Content type inferred from the extension.
    pub content_type: &'static str,
}

/// Local file store bound to one root directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    kind: UploadKind,
    settings: StoreSettings,
}

impl FileStore {
    /// Create a store, creating its root directory if needed.
    pub fn new(root: impl Into<PathBuf>, kind: UploadKind, settings: StoreSettings) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;

        Ok(Self {
            root,
            kind,
            settings,
        })
    }

    /// Root directory of this store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Upload kind served by this store.
    pub fn kind(&self) -> UploadKind {
        self.kind
    }

    /// Limits applied by this store.
    pub fn settings(&self) -> StoreSettings {
        self.settings
    }

    /// Public URL of a stored file, e.g. `/storage/reports/a/b.pdf`.
    pub fn url_for(&self, relative_path: &str) -> String {
        format!("/storage/{}/{}", self.kind.namespace(), relative_path)
    }

    /// Make sure the (sanitized) folder exists and return its absolute path.
    pub fn ensure_dir(&self, folder: &str) -> Result<PathBuf> {
        let segments = sanitize_folder(folder)?;
        self.ensure_segments(&segments)
    }

    fn ensure_segments(&self, segments: &[String]) -> Result<PathBuf> {
        let dir = segments
            .iter()
            .fold(self.root.clone(), |path, segment| path.join(segment));
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Write content under a fresh unique name derived from `original_name`.
    ///
    /// The content is fully written and synced to a temporary file before it
    /// appears under its final name. An existing file is never replaced.
    pub fn write(&self, content: &[u8], original_name: &str, folder: Option<&str>) -> Result<StoredFile> {
        let name = sanitize_filename(original_name)?;
        let segments = sanitize_folder(folder.unwrap_or_default())?;
        let dir = self.ensure_segments(&segments)?;

        let mut temp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(&dir)?;
        temp.write_all(content)?;
        temp.as_file().sync_all()?;

        for attempt in 1..=self.settings.name_attempts {
            let filename = unique_name(&name);
            let target = dir.join(&filename);

            match temp.persist_noclobber(&target) {
                Ok(_) => {
                    let relative_path = segments
                        .iter()
                        .map(String::as_str)
                        .chain(std::iter::once(filename.as_str()))
                        .collect::<Vec<_>>()
                        .join("/");
                    debug!(
                        kind = self.kind.namespace(),
                        path = %relative_path,
                        size = content.len(),
                        "stored file"
                    );
                    return Ok(StoredFile {
                        filename,
                        relative_path,
                        size: content.len() as u64,
                    });
                }
                Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                    warn!(attempt, filename = %filename, "generated filename already taken");
                    temp = e.file;
                }
                Err(e) => return Err(e.error.into()),
            }
        }

        Err(StorageError::Io(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!(
                "no free filename after {} attempts",
                self.settings.name_attempts
            ),
        )))
    }

    /// Locate a stored file by its path relative to the root.
    ///
    /// Fails with `FileTooLarge` when the file exceeds the ceiling, before
    /// any of it is read.
    pub fn open(&self, relative_path: &str) -> Result<FileMeta> {
        let segments = validate_request_path(relative_path)?;
        let path = resolve_under_root(&self.root, &segments)?;

        let metadata = match fs::metadata(&path) {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound("File".to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        if !metadata.is_file() {
            return Err(StorageError::NotFound("File".to_string()));
        }
        if metadata.len() > self.settings.max_file_size {
            return Err(StorageError::FileTooLarge {
                size: metadata.len(),
                max: self.settings.max_file_size,
            });
        }

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(FileMeta {
            content_type: content_type_for(&path),
            filename,
            size: metadata.len(),
            path,
        })
    }

    /// Read a located file, whole or the resolved inclusive byte range.
    pub fn read(&self, meta: &FileMeta, range: Option<(u64, u64)>) -> Result<Vec<u8>> {
        let Some((start, end)) = range else {
            return Ok(fs::read(&meta.path)?);
        };

        let mut file = File::open(&meta.path)?;
        file.seek(SeekFrom::Start(start))?;
        let mut content = Vec::with_capacity((end - start + 1) as usize);
        file.take(end - start + 1).read_to_end(&mut content)?;
        Ok(content)
    }

    /// Resolve a range against a located file.
    pub fn resolve_range(&self, meta: &FileMeta, range: ByteRange) -> Result<(u64, u64)> {
        range.resolve(meta.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SETTINGS: StoreSettings = StoreSettings {
        max_file_size: 1024,
        name_attempts: 5,
    };

    fn setup_store() -> (TempDir, FileStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path().join("reports"), UploadKind::Report, SETTINGS)
            .unwrap();
        (temp_dir, store)
    }

    fn list_dir(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .flatten()
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_new_creates_root() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("a/b/c");

        let store = FileStore::new(&root, UploadKind::Media, SETTINGS).unwrap();

        assert!(root.is_dir());
        assert_eq!(store.root(), root);
        assert_eq!(store.kind(), UploadKind::Media);
    }

    #[test]
    fn test_write_and_open() {
        let (_temp_dir, store) = setup_store();

        let stored = store
            .write(b"%PDF-1.4 body", "report.pdf", Some("blood-reports"))
            .unwrap();

        assert!(stored.filename.starts_with("report_"));
        assert!(stored.filename.ends_with(".pdf"));
        assert_eq!(
            stored.relative_path,
            format!("blood-reports/{}", stored.filename)
        );
        assert_eq!(stored.size, 13);

        let meta = store.open(&stored.relative_path).unwrap();
        assert_eq!(meta.size, 13);
        assert_eq!(meta.content_type, "application/pdf");
        assert_eq!(meta.filename, stored.filename);
        assert_eq!(store.read(&meta, None).unwrap(), b"%PDF-1.4 body");
    }

    #[test]
    fn test_write_leaves_no_temp_files() {
        let (_temp_dir, store) = setup_store();

        let stored = store.write(b"data", "notes.txt", None).unwrap();

        assert_eq!(list_dir(store.root()), vec![stored.filename]);
    }

    #[test]
    fn test_write_never_overwrites() {
        let (_temp_dir, store) = setup_store();

        let first = store.write(b"one", "same.pdf", None).unwrap();
        let second = store.write(b"two", "same.pdf", None).unwrap();

        assert_ne!(first.filename, second.filename);
        assert_eq!(list_dir(store.root()).len(), 2);
    }

    #[test]
    fn test_write_rejects_bad_folder_before_touching_disk() {
        let (_temp_dir, store) = setup_store();

        let result = store.write(b"data", "a.pdf", Some("../escape"));

        assert!(matches!(result, Err(StorageError::InvalidPath(_))));
        assert!(list_dir(store.root()).is_empty());
        assert!(!store.root().parent().unwrap().join("escape").exists());
    }

    #[test]
    fn test_url_for() {
        let (_temp_dir, store) = setup_store();
        assert_eq!(
            store.url_for("blood-reports/a.pdf"),
            "/storage/reports/blood-reports/a.pdf"
        );
    }

    #[test]
    fn test_ensure_dir_is_idempotent() {
        let (_temp_dir, store) = setup_store();

        let first = store.ensure_dir("donors/2024").unwrap();
        let second = store.ensure_dir("donors/2024").unwrap();

        assert_eq!(first, second);
        assert!(first.is_dir());
        assert_eq!(store.ensure_dir("").unwrap(), store.root());
    }

    #[test]
    fn test_open_not_found_and_directory() {
        let (_temp_dir, store) = setup_store();
        store.ensure_dir("folder").unwrap();

        assert!(matches!(store.open("missing.pdf"), Err(StorageError::NotFound(_))));
        assert!(matches!(store.open("folder"), Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_open_rejects_traversal() {
        let (_temp_dir, store) = setup_store();

        assert!(matches!(
            store.open("../../etc/passwd"),
            Err(StorageError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_open_too_large() {
        let (_temp_dir, store) = setup_store();
        fs::write(store.root().join("big.pdf"), vec![0u8; 2048]).unwrap();

        let result = store.open("big.pdf");

        assert!(matches!(
            result,
            Err(StorageError::FileTooLarge { size: 2048, max: 1024 })
        ));
    }

    #[test]
    fn test_read_range() {
        let (_temp_dir, store) = setup_store();
        let stored = store.write(b"0123456789", "digits.txt", None).unwrap();
        let meta = store.open(&stored.relative_path).unwrap();

        let range = store.resolve_range(&meta, ByteRange::FromTo(2, 5)).unwrap();
        assert_eq!(store.read(&meta, Some(range)).unwrap(), b"2345");

        let range = store.resolve_range(&meta, ByteRange::Suffix(3)).unwrap();
        assert_eq!(store.read(&meta, Some(range)).unwrap(), b"789");
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for(Path::new("a.PDF")), "application/pdf");
        assert_eq!(content_type_for(Path::new("a.jpeg")), "image/jpeg");
        assert_eq!(content_type_for(Path::new("a.xyz")), DEFAULT_CONTENT_TYPE);
        assert_eq!(content_type_for(Path::new("noext")), DEFAULT_CONTENT_TYPE);
    }
}
