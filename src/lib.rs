//! hemostore - upload and storage service for a blood-donor application.
//!
//! Stores donor media and PDF blood reports on local disk behind strict path
//! checks, and serves them back over HTTP.

pub mod config;
pub mod error;
pub mod logging;
pub mod storage;
pub mod web;

pub use config::Config;
pub use error::{Result, StorageError};
pub use storage::{
    StorageService, UploadKind, UploadOptions, UploadRequest, UploadResult,
};
