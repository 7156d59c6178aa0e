//! Local file storage for donor media and PDF blood reports.
//!
//! This module provides:
//! - Filename and path sanitizing with traversal checks
//! - Content validation (size, MIME allow-list, magic bytes)
//! - Unique naming and atomic, non-clobbering writes
//! - Retrieval with optional byte ranges
//! - Best-effort mirroring of media to a remote store

mod mirror;
mod naming;
mod range;
mod sanitize;
mod service;
mod store;
mod validate;

pub use mirror::{HttpMirror, MirrorFailure, MirrorReporter, MirrorStats};
pub use naming::unique_name;
pub use range::ByteRange;
pub use sanitize::{
    resolve_under_root, sanitize_filename, sanitize_folder, validate_request_path, SafeName,
    MAX_BASE_NAME_LENGTH, MAX_FOLDER_DEPTH,
};
pub use service::{Retrieved, StorageService, UploadOptions, UploadRequest, UploadResult};
pub use store::{content_type_for, FileMeta, FileStore, StoreSettings, StoredFile};
pub use validate::{normalize_mime, validate_upload, UploadKind, PDF_SIGNATURE};

/// Default size ceiling for uploads and retrieval (10MB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;
