//! Error types for hemostore.

use thiserror::Error;

/// Common error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Traversal attempt or malformed path/filename.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// The resolved path lies outside the storage root.
    #[error("path escapes storage root: {0}")]
    PathEscapesRoot(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Upload or stored file exceeds the byte ceiling.
    #[error("file too large: {size} bytes (max {max})")]
    FileTooLarge { size: u64, max: u64 },

    /// Declared MIME type is not accepted for this kind of upload.
    #[error("unsupported type: {0}")]
    UnsupportedType(String),

    /// Content does not carry the magic bytes of the declared type.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// Requested byte range lies outside the file.
    #[error("range not satisfiable (file length {len})")]
    RangeNotSatisfiable { len: u64 },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Remote mirror error.
    #[error("mirror error: {0}")]
    Mirror(String),

    /// Validation error for user-supplied options.
    #[error("validation error: {0}")]
    Validation(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for StorageError {
    fn from(e: reqwest::Error) -> Self {
        StorageError::Mirror(e.to_string())
    }
}

/// Result type alias for hemostore operations.
pub type Result<T> = std::result::Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_path_display() {
        let err = StorageError::InvalidPath("../etc/passwd".to_string());
        assert_eq!(err.to_string(), "invalid path: ../etc/passwd");
    }

    #[test]
    fn test_file_too_large_display() {
        let err = StorageError::FileTooLarge { size: 11, max: 10 };
        assert_eq!(err.to_string(), "file too large: 11 bytes (max 10)");
    }

    #[test]
    fn test_not_found_display() {
        let err = StorageError::NotFound("file".to_string());
        assert_eq!(err.to_string(), "file not found");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: StorageError = io_err.into();
        assert!(matches!(err, StorageError::Io(_)));
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_range_not_satisfiable_display() {
        let err = StorageError::RangeNotSatisfiable { len: 42 };
        assert_eq!(err.to_string(), "range not satisfiable (file length 42)");
    }
}
