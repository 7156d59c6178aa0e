//! API handlers.

pub mod health;
pub mod storage;

pub use health::*;
pub use storage::*;

use std::sync::Arc;

use crate::storage::StorageService;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Upload/retrieval service.
    pub storage: Arc<StorageService>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(storage: Arc<StorageService>) -> Self {
        Self { storage }
    }

    /// Upload size ceiling in bytes.
    pub fn max_upload_size(&self) -> u64 {
        self.storage.max_file_size()
    }
}
