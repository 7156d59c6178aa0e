//! Upload content validation: size ceiling, MIME allow-list, magic bytes.

use serde::Serialize;
use utoipa::ToSchema;

use crate::{Result, StorageError};

/// Leading bytes of every PDF document.
pub const PDF_SIGNATURE: &[u8] = b"%PDF";

const MEDIA_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];
const REPORT_TYPES: &[&str] = &["application/pdf"];

/// What an upload is for. Each kind has its own root and allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
pub enum UploadKind {
    /// General images, optionally mirrored.
    #[serde(rename = "media")]
    Media,
    /// PDF blood reports.
    #[serde(rename = "reports")]
    Report,
}

impl UploadKind {
    /// MIME types accepted for this kind.
    pub fn allowed_mime_types(&self) -> &'static [&'static str] {
        match self {
            UploadKind::Media => MEDIA_TYPES,
            UploadKind::Report => REPORT_TYPES,
        }
    }

    /// URL namespace, the first path segment under `/storage`.
    pub fn namespace(&self) -> &'static str {
        match self {
            UploadKind::Media => "media",
            UploadKind::Report => "reports",
        }
    }

    /// Inverse of [`UploadKind::namespace`].
    pub fn from_namespace(namespace: &str) -> Option<Self> {
        match namespace {
            "media" => Some(UploadKind::Media),
            "reports" => Some(UploadKind::Report),
            _ => None,
        }
    }
}

/// Strip MIME parameters and normalize case: `Application/PDF; x=y` -> `application/pdf`.
pub fn normalize_mime(declared: &str) -> String {
    declared
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Validate an upload before anything touches the disk.
///
/// Checks run in order: size, declared type, signature. Returns the
/// normalized MIME type on success.
pub fn validate_upload(
    kind: UploadKind,
    content: &[u8],
    declared_mime: &str,
    max_size: u64,
) -> Result<String> {
    let size = content.len() as u64;
    if size > max_size {
        return Err(StorageError::FileTooLarge {
            size,
            max: max_size,
        });
    }

    let mime = normalize_mime(declared_mime);
    if !kind.allowed_mime_types().contains(&mime.as_str()) {
        return Err(StorageError::UnsupportedType(mime));
    }

    check_signature(kind, content, &mime)?;

    Ok(mime)
}

fn check_signature(kind: UploadKind, content: &[u8], mime: &str) -> Result<()> {
    let matches = match kind {
        UploadKind::Report => content.starts_with(PDF_SIGNATURE),
        UploadKind::Media => infer::get(content).is_some_and(|t| t.mime_type() == mime),
    };

    if matches {
        Ok(())
    } else {
        Err(StorageError::InvalidSignature(format!(
            "content is not {mime}"
        )))
    }
}
