//! Upload and retrieval entry points.
//!
//! [`StorageService`] owns one [`FileStore`] per upload kind and the optional
//! mirror. Uploads run validate -> sanitize -> ensure dir -> write -> mirror;
//! retrieval dispatches on the first path segment (`media` or `reports`).

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::config::StorageConfig;
use crate::{Result, StorageError};

use super::mirror::{HttpMirror, MirrorReporter};
use super::range::ByteRange;
use super::sanitize::validate_request_path;
use super::store::{FileMeta, FileStore, StoreSettings};
use super::validate::{validate_upload, UploadKind};

/// Raw upload as received from a caller.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// File content.
    pub content: Vec<u8>,
    /// Declared MIME type.
    pub mime_type: String,
    /// Original filename.
    pub original_name: String,
}

impl UploadRequest {
    /// Create a new upload request.
    pub fn new(
        content: Vec<u8>,
        mime_type: impl Into<String>,
        original_name: impl Into<String>,
    ) -> Self {
        Self {
            content,
            mime_type: mime_type.into(),
            original_name: original_name.into(),
        }
    }
}

/// Caller options for an upload.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UploadOptions {
    /// Destination folder below the store root.
    #[validate(length(max = 200))]
    pub folder: Option<String>,
    /// Compression hint. Accepted, but images are stored as uploaded.
    #[validate(range(min = 1, max = 100))]
    pub quality: Option<u8>,
    /// Placeholder blur request. Accepted, not produced here.
    #[serde(default)]
    pub generate_blur: bool,
}

impl UploadOptions {
    /// Options targeting a folder.
    pub fn in_folder(folder: impl Into<String>) -> Self {
        Self {
            folder: Some(folder.into()),
            ..Self::default()
        }
    }
}

/// What callers persist after an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    /// Generated filename.
    pub filename: String,
    /// Filename as sent by the client.
    pub original_name: String,
    /// Public URL, e.g. `/storage/reports/blood-reports/report_..._....pdf`.
    pub url: String,
    /// Size in bytes.
    pub file_size: u64,
    /// Normalized MIME type.
    pub mime_type: String,
}

/// A file read back by [`StorageService::retrieve`].
#[derive(Debug, Clone)]
pub struct Retrieved {
    /// Located file.
    pub meta: FileMeta,
    /// Bytes served, the whole file or the requested range.
    pub content: Vec<u8>,
    /// Inclusive range served, if a range was requested.
    pub range: Option<(u64, u64)>,
}

/// Upload/retrieval service over the media and report stores.
#[derive(Debug)]
pub struct StorageService {
    media: FileStore,
    reports: FileStore,
    max_file_size: u64,
    mirror: Option<Arc<HttpMirror>>,
    reporter: Arc<MirrorReporter>,
}

impl StorageService {
    /// Create the service, creating both storage roots.
    pub fn new(config: &StorageConfig) -> Result<Self> {
        let settings = StoreSettings {
            max_file_size: config.max_file_size(),
            name_attempts: config.name_attempts,
        };

        let media = FileStore::new(config.media_root(), UploadKind::Media, settings)?;
        let reports = FileStore::new(config.reports_root(), UploadKind::Report, settings)?;
        let mirror = HttpMirror::from_config(&config.mirror)?.map(Arc::new);
        let reporter = Arc::new(MirrorReporter::new(mirror.is_some()));

        tracing::info!(
            media = %media.root().display(),
            reports = %reports.root().display(),
            mirror = mirror.is_some(),
            "storage initialized"
        );

        Ok(Self {
            media,
            reports,
            max_file_size: settings.max_file_size,
            mirror,
            reporter,
        })
    }

    /// The store for an upload kind.
    pub fn store(&self, kind: UploadKind) -> &FileStore {
        match kind {
            UploadKind::Media => &self.media,
            UploadKind::Report => &self.reports,
        }
    }

    /// Size ceiling in bytes.
    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Mirror failure channel.
    pub fn mirror_reporter(&self) -> &Arc<MirrorReporter> {
        &self.reporter
    }

    /// Validate and store an upload.
    ///
    /// Nothing is written when validation fails. Media uploads are mirrored in
    /// the background when a mirror is configured; mirror failures only reach
    /// the [`MirrorReporter`].
    pub async fn upload(
        &self,
        kind: UploadKind,
        request: UploadRequest,
        options: UploadOptions,
    ) -> Result<UploadResult> {
        let mime_type = validate_upload(
            kind,
            &request.content,
            &request.mime_type,
            self.max_file_size,
        )?;
        options
            .validate()
            .map_err(|e| StorageError::Validation(e.to_string()))?;

        if options.quality.is_some() || options.generate_blur {
            tracing::debug!(
                quality = ?options.quality,
                generate_blur = options.generate_blur,
                "image processing hints ignored"
            );
        }

        let store = self.store(kind);
        let stored = store.write(
            &request.content,
            &request.original_name,
            options.folder.as_deref(),
        )?;

        tracing::info!(
            kind = kind.namespace(),
            path = %stored.relative_path,
            size = stored.size,
            "upload stored"
        );

        if kind == UploadKind::Media {
            if let Some(mirror) = &self.mirror {
                let mirror = Arc::clone(mirror);
                let reporter = Arc::clone(&self.reporter);
                let key = format!("{}/{}", kind.namespace(), stored.relative_path);
                let content = request.content;
                let mime = mime_type.clone();

                tokio::spawn(async move {
                    if let Err(e) = mirror.put(&key, content, &mime).await {
                        reporter.report(&key, &e);
                    }
                });
            }
        }

        Ok(UploadResult {
            url: store.url_for(&stored.relative_path),
            filename: stored.filename,
            original_name: request.original_name,
            file_size: stored.size,
            mime_type,
        })
    }

    /// Locate a file by its path below `/storage`, e.g. `reports/a/b.pdf`.
    pub fn open(&self, path: &str) -> Result<(&FileStore, FileMeta)> {
        let segments = validate_request_path(path)?;
        let (namespace, rest) = segments
            .split_first()
            .ok_or_else(|| StorageError::InvalidPath(path.to_string()))?;
        let kind = UploadKind::from_namespace(namespace)
            .ok_or_else(|| StorageError::NotFound("File".to_string()))?;
        if rest.is_empty() {
            return Err(StorageError::NotFound("File".to_string()));
        }

        let store = self.store(kind);
        let meta = store.open(&rest.join("/"))?;
        Ok((store, meta))
    }

    /// Read a stored file, optionally a single byte range of it.
    pub fn retrieve(&self, path: &str, range: Option<ByteRange>) -> Result<Retrieved> {
        let (store, meta) = self.open(path)?;
        let range = range
            .map(|r| store.resolve_range(&meta, r))
            .transpose()?;
        let content = store.read(&meta, range)?;

        Ok(Retrieved {
            meta,
            content,
            range,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MirrorConfig;
    use std::time::Duration;
    use tempfile::TempDir;

    fn setup_service() -> (TempDir, StorageService) {
        let temp_dir = TempDir::new().unwrap();
        let service = StorageService::new(&StorageConfig::with_base_dir(temp_dir.path())).unwrap();
        (temp_dir, service)
    }

    fn pdf(len: usize) -> Vec<u8> {
        let mut content = b"%PDF-1.4\n".to_vec();
        content.resize(len, b'x');
        content
    }

    fn png() -> Vec<u8> {
        vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D]
    }

    #[test]
    fn test_new_creates_both_roots() {
        let (temp_dir, service) = setup_service();

        assert!(temp_dir.path().join("public/storage/media").is_dir());
        assert!(temp_dir.path().join("storage/reports").is_dir());
        assert_eq!(service.max_file_size(), 10 * 1024 * 1024);
        assert!(!service.mirror_reporter().stats().enabled);
    }

    #[tokio::test]
    async fn test_upload_report() {
        let (_temp_dir, service) = setup_service();

        let result = service
            .upload(
                UploadKind::Report,
                UploadRequest::new(pdf(2048), "application/pdf", "report.pdf"),
                UploadOptions::in_folder("blood-reports"),
            )
            .await
            .unwrap();

        assert_eq!(result.original_name, "report.pdf");
        assert_eq!(result.file_size, 2048);
        assert_eq!(result.mime_type, "application/pdf");
        assert_eq!(
            result.url,
            format!("/storage/reports/blood-reports/{}", result.filename)
        );
    }

    #[tokio::test]
    async fn test_upload_rejects_invalid_options() {
        let (temp_dir, service) = setup_service();

        let options = UploadOptions {
            quality: Some(0),
            ..UploadOptions::default()
        };
        let result = service
            .upload(
                UploadKind::Media,
                UploadRequest::new(png(), "image/png", "a.png"),
                options,
            )
            .await;

        assert!(matches!(result, Err(StorageError::Validation(_))));
        let root = temp_dir.path().join("public/storage/media");
        assert_eq!(std::fs::read_dir(root).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_upload_then_retrieve() {
        let (_temp_dir, service) = setup_service();

        let result = service
            .upload(
                UploadKind::Media,
                UploadRequest::new(png(), "image/png", "Donor Photo.PNG"),
                UploadOptions::default(),
            )
            .await
            .unwrap();
        assert!(result.filename.starts_with("Donor_Photo_"));
        assert!(result.filename.ends_with(".png"));

        let path = result.url.strip_prefix("/storage/").unwrap();
        let retrieved = service.retrieve(path, None).unwrap();

        assert_eq!(retrieved.content, png());
        assert_eq!(retrieved.meta.content_type, "image/png");
        assert_eq!(retrieved.range, None);
    }

    #[tokio::test]
    async fn test_retrieve_range() {
        let (_temp_dir, service) = setup_service();
        let result = service
            .upload(
                UploadKind::Report,
                UploadRequest::new(pdf(100), "application/pdf", "r.pdf"),
                UploadOptions::default(),
            )
            .await
            .unwrap();
        let path = result.url.strip_prefix("/storage/").unwrap();

        let retrieved = service
            .retrieve(path, Some(ByteRange::FromTo(0, 3)))
            .unwrap();
        assert_eq!(retrieved.content, b"%PDF");
        assert_eq!(retrieved.range, Some((0, 3)));

        let result = service.retrieve(path, Some(ByteRange::From(100)));
        assert!(matches!(
            result,
            Err(StorageError::RangeNotSatisfiable { len: 100 })
        ));
    }

    #[test]
    fn test_retrieve_unknown_namespace_and_bare_namespace() {
        let (_temp_dir, service) = setup_service();

        assert!(matches!(
            service.retrieve("etc/passwd", None),
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            service.retrieve("media", None),
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            service.retrieve("../../etc/passwd", None),
            Err(StorageError::InvalidPath(_))
        ));
    }

    #[tokio::test]
    async fn test_mirror_failure_is_reported_not_raised() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = StorageConfig::with_base_dir(temp_dir.path());
        config.mirror = MirrorConfig {
            enabled: true,
            // Nothing listens on the discard port
            endpoint: Some("http://127.0.0.1:9/bucket".to_string()),
            token: Some("t".to_string()),
            timeout_secs: 2,
        };
        let service = StorageService::new(&config).unwrap();
        let mut failures = service.mirror_reporter().subscribe();

        let result = service
            .upload(
                UploadKind::Media,
                UploadRequest::new(png(), "image/png", "a.png"),
                UploadOptions::in_folder("donors"),
            )
            .await
            .unwrap();

        let failure = tokio::time::timeout(Duration::from_secs(10), failures.recv())
            .await
            .expect("mirror failure should be published")
            .unwrap();
        assert_eq!(failure.key, format!("media/donors/{}", result.filename));

        let stats = service.mirror_reporter().stats();
        assert!(stats.enabled);
        assert_eq!(stats.failures, 1);

        // Local copy stays authoritative
        let path = result.url.strip_prefix("/storage/").unwrap();
        assert!(service.retrieve(path, None).is_ok());
    }

    #[tokio::test]
    async fn test_reports_are_not_mirrored() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = StorageConfig::with_base_dir(temp_dir.path());
        config.mirror = MirrorConfig {
            enabled: true,
            endpoint: Some("http://127.0.0.1:9/bucket".to_string()),
            token: None,
            timeout_secs: 1,
        };
        let service = StorageService::new(&config).unwrap();
        let mut failures = service.mirror_reporter().subscribe();

        service
            .upload(
                UploadKind::Report,
                UploadRequest::new(pdf(64), "application/pdf", "r.pdf"),
                UploadOptions::default(),
            )
            .await
            .unwrap();

        let waited = tokio::time::timeout(Duration::from_millis(1500), failures.recv()).await;
        assert!(waited.is_err());
        assert_eq!(service.mirror_reporter().stats().failures, 0);
    }
}
