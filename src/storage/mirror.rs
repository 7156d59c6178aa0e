//! Best-effort mirroring of stored media to a remote object store.
//!
//! The local copy is always authoritative. A failed mirror never fails the
//! upload; it is logged and published on the [`MirrorReporter`] channel so
//! operators can watch for silent degradation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use url::Url;
use utoipa::ToSchema;

use crate::config::MirrorConfig;
use crate::{Result, StorageError};

/// Buffered failure events per subscriber.
const FAILURE_CHANNEL_CAPACITY: usize = 64;

/// One failed mirror attempt.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MirrorFailure {
    /// Object key, `<namespace>/<relative path>`.
    pub key: String,
    /// Error description.
    pub error: String,
    /// When the failure was observed.
    pub at: DateTime<Utc>,
}

/// Snapshot of mirror health.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MirrorStats {
    /// Whether a mirror is configured.
    pub enabled: bool,
    /// Failures since startup.
    pub failures: u64,
    /// Most recent failure, if any.
    pub last_failure: Option<MirrorFailure>,
}

/// Structured channel for mirror failures.
#[derive(Debug)]
pub struct MirrorReporter {
    enabled: bool,
    sender: broadcast::Sender<MirrorFailure>,
    failures: AtomicU64,
    last_failure: Mutex<Option<MirrorFailure>>,
}

impl MirrorReporter {
    /// Create a reporter. `enabled` only affects the reported stats.
    pub fn new(enabled: bool) -> Self {
        let (sender, _) = broadcast::channel(FAILURE_CHANNEL_CAPACITY);
        Self {
            enabled,
            sender,
            failures: AtomicU64::new(0),
            last_failure: Mutex::new(None),
        }
    }

    /// Subscribe to failure events.
    pub fn subscribe(&self) -> broadcast::Receiver<MirrorFailure> {
        self.sender.subscribe()
    }

    /// Record a failure: log it, count it, and publish it.
    pub fn report(&self, key: &str, error: &StorageError) {
        tracing::warn!(key = %key, error = %error, "mirror upload failed, local copy kept");

        let failure = MirrorFailure {
            key: key.to_string(),
            error: error.to_string(),
            at: Utc::now(),
        };

        self.failures.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut last) = self.last_failure.lock() {
            *last = Some(failure.clone());
        }
        // No subscribers is fine
        let _ = self.sender.send(failure);
    }

    /// Current stats.
    pub fn stats(&self) -> MirrorStats {
        MirrorStats {
            enabled: self.enabled,
            failures: self.failures.load(Ordering::Relaxed),
            last_failure: self.last_failure.lock().ok().and_then(|last| last.clone()),
        }
    }
}

/// Mirror client that PUTs objects to `<endpoint>/<key>`.
#[derive(Debug, Clone)]
pub struct HttpMirror {
    client: reqwest::Client,
    endpoint: Url,
    token: Option<String>,
}

impl HttpMirror {
    /// Build a mirror from config. Returns `None` when mirroring is disabled.
    pub fn from_config(config: &MirrorConfig) -> Result<Option<Self>> {
        if !config.enabled {
            return Ok(None);
        }

        let endpoint = config
            .endpoint
            .as_deref()
            .ok_or_else(|| StorageError::Config("mirror endpoint is not set".to_string()))?;
        let mut endpoint = Url::parse(endpoint)
            .map_err(|e| StorageError::Config(format!("invalid mirror endpoint: {e}")))?;
        if !endpoint.path().ends_with('/') {
            let path = format!("{}/", endpoint.path());
            endpoint.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StorageError::Config(format!("failed to build mirror client: {e}")))?;

        Ok(Some(Self {
            client,
            endpoint,
            token: config.token.clone(),
        }))
    }

    /// Remote URL for an object key.
    pub fn object_url(&self, key: &str) -> Result<Url> {
        self.endpoint
            .join(key)
            .map_err(|e| StorageError::Mirror(format!("invalid object key {key}: {e}")))
    }

    /// Upload one object.
    pub async fn put(&self, key: &str, content: Vec<u8>, mime_type: &str) -> Result<()> {
        let url = self.object_url(key)?;

        let mut request = self
            .client
            .put(url)
            .header(reqwest::header::CONTENT_TYPE, mime_type)
            .body(content);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(StorageError::Mirror(format!(
                "remote store answered {}",
                response.status()
            )));
        }

        tracing::debug!(key = %key, "mirrored object");
        Ok(())
    }
}
