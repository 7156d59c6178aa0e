//! Path and filename sanitizing.
//!
//! Every path that reaches the filesystem goes through one of these functions
//! first. Upload paths are rebuilt from a whitelisted character set; read paths
//! are checked structurally and then resolved against the canonical storage
//! root, which also catches symlinks pointing outside of it.

use std::io;
use std::path::{Path, PathBuf};

use crate::{Result, StorageError};

/// Maximum length of the base part of a stored filename.
pub const MAX_BASE_NAME_LENGTH: usize = 100;

/// Maximum length of a filename extension.
pub const MAX_EXTENSION_LENGTH: usize = 16;

/// Maximum length of a single folder segment.
pub const MAX_FOLDER_SEGMENT_LENGTH: usize = 64;

/// Maximum folder nesting depth.
pub const MAX_FOLDER_DEPTH: usize = 8;

/// A filename reduced to `[a-zA-Z0-9._-]`, split into base and extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafeName {
    /// Base name without extension.
    pub base: String,
    /// Lowercased extension, if any.
    pub extension: Option<String>,
}

impl SafeName {
    /// The sanitized filename, `base.ext` or `base`.
    pub fn file_name(&self) -> String {
        match &self.extension {
            Some(ext) => format!("{}.{}", self.base, ext),
            None => self.base.clone(),
        }
    }
}

fn is_safe_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')
}

fn has_traversal(path: &str) -> bool {
    path.starts_with('/') || path.contains('\\') || path.split('/').any(|s| s == "..")
}

/// Sanitize a client-supplied filename.
///
/// Names with `..` segments, a leading `/` or backslashes are rejected. Any
/// directory prefix is dropped and characters outside `[a-zA-Z0-9._-]` become
/// `_`.
pub fn sanitize_filename(name: &str) -> Result<SafeName> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(StorageError::InvalidPath("empty filename".to_string()));
    }
    if has_traversal(trimmed) || trimmed.contains('\0') {
        return Err(StorageError::InvalidPath(format!("illegal filename: {trimmed}")));
    }

    let last = trimmed.rsplit('/').next().unwrap_or(trimmed);
    let mapped: String = last
        .chars()
        .map(|c| if is_safe_char(c) { c } else { '_' })
        .collect();
    let mapped = mapped.trim_start_matches('.');
    if mapped.is_empty() {
        return Err(StorageError::InvalidPath(format!("illegal filename: {trimmed}")));
    }

    let (base, extension) = match mapped.rsplit_once('.') {
        Some((base, ext)) if !base.is_empty() && !ext.is_empty() => {
            let ext: String = ext
                .chars()
                .take(MAX_EXTENSION_LENGTH)
                .collect::<String>()
                .to_ascii_lowercase();
            (base, Some(ext))
        }
        _ => (mapped.trim_end_matches('.'), None),
    };

    let base: String = base.trim_end_matches('.').chars().take(MAX_BASE_NAME_LENGTH).collect();
    let base = if base.is_empty() { "file".to_string() } else { base };

    Ok(SafeName { base, extension })
}

/// Sanitize a destination folder such as `blood-reports` or `donors/2024`.
///
/// Returns the folder segments; an empty or missing folder yields none.
pub fn sanitize_folder(folder: &str) -> Result<Vec<String>> {
    let trimmed = folder.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    if has_traversal(trimmed) {
        return Err(StorageError::InvalidPath(format!("illegal folder: {trimmed}")));
    }

    let segments: Vec<String> = trimmed.split('/').map(str::to_string).collect();
    if segments.len() > MAX_FOLDER_DEPTH {
        return Err(StorageError::InvalidPath(format!(
            "folder nested deeper than {MAX_FOLDER_DEPTH} levels"
        )));
    }

    for segment in &segments {
        let valid = !segment.is_empty()
            && segment != "."
            && !segment.starts_with('.')
            && segment.len() <= MAX_FOLDER_SEGMENT_LENGTH
            && segment.chars().all(is_safe_char);
        if !valid {
            return Err(StorageError::InvalidPath(format!("illegal folder: {trimmed}")));
        }
    }

    Ok(segments)
}

/// Structurally validate a storage-relative path requested for reading.
///
/// No filesystem access happens here.
pub fn validate_request_path(path: &str) -> Result<Vec<&str>> {
    if path.is_empty() {
        return Err(StorageError::InvalidPath("empty path".to_string()));
    }
    if has_traversal(path) || path.contains('\0') {
        return Err(StorageError::InvalidPath(path.to_string()));
    }

    let segments: Vec<&str> = path.split('/').collect();
    if segments
        .iter()
        .any(|s| s.is_empty() || s.starts_with('.'))
    {
        return Err(StorageError::InvalidPath(path.to_string()));
    }

    Ok(segments)
}

/// Resolve validated segments under `root`, following symlinks.
///
/// The canonical result must stay under the canonical root.
pub fn resolve_under_root(root: &Path, segments: &[&str]) -> Result<PathBuf> {
    let canonical_root = root.canonicalize()?;
    let candidate = segments
        .iter()
        .fold(canonical_root.clone(), |path, segment| path.join(segment));

    let resolved = match candidate.canonicalize() {
        Ok(path) => path,
        Err(e)
            if matches!(
                e.kind(),
                io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
            ) =>
        {
            return Err(StorageError::NotFound("File".to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    if !resolved.starts_with(&canonical_root) {
        return Err(StorageError::PathEscapesRoot(segments.join("/")));
    }

    Ok(resolved)
}
