//! Configuration module for hemostore.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::{Result, StorageError};

/// One megabyte, for the `*_mb` settings.
const MB: u64 = 1024 * 1024;

/// Largest accepted size ceiling in megabytes (1GB).
pub const MAX_FILE_SIZE_MB_LIMIT: u64 = 1024;

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
        }
    }
}

/// Remote mirror configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MirrorConfig {
    /// Whether uploaded media is copied to the remote store.
    #[serde(default)]
    pub enabled: bool,
    /// Base URL of the remote object store.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Bearer token sent with mirror requests.
    #[serde(default)]
    pub token: Option<String>,
    /// Total request timeout in seconds.
    #[serde(default = "default_mirror_timeout")]
    pub timeout_secs: u64,
}

fn default_mirror_timeout() -> u64 {
    10
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: None,
            token: None,
            timeout_secs: default_mirror_timeout(),
        }
    }
}

/// File storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory relative storage dirs are resolved against.
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,
    /// Media storage directory.
    #[serde(default = "default_media_dir")]
    pub media_dir: String,
    /// PDF report storage directory.
    #[serde(default = "default_reports_dir")]
    pub reports_dir: String,
    /// Maximum file size in megabytes, for uploads and retrieval.
    #[serde(default = "default_max_file_size")]
    pub max_file_size_mb: u64,
    /// How many fresh names are tried before an upload gives up on a collision.
    #[serde(default = "default_name_attempts")]
    pub name_attempts: u32,
    /// Remote mirror configuration.
    #[serde(default)]
    pub mirror: MirrorConfig,
}

fn default_base_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

fn default_media_dir() -> String {
    "public/storage/media".to_string()
}

fn default_reports_dir() -> String {
    "storage/reports".to_string()
}

fn default_max_file_size() -> u64 {
    crate::storage::DEFAULT_MAX_FILE_SIZE / MB
}

fn default_name_attempts() -> u32 {
    5
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            media_dir: default_media_dir(),
            reports_dir: default_reports_dir(),
            max_file_size_mb: default_max_file_size(),
            name_attempts: default_name_attempts(),
            mirror: MirrorConfig::default(),
        }
    }
}

impl StorageConfig {
    /// Storage config rooted at `base_dir`, everything else defaulted.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Self::default()
        }
    }

    /// Absolute root of the media store.
    pub fn media_root(&self) -> PathBuf {
        self.base_dir.join(&self.media_dir)
    }

    /// Absolute root of the report store.
    pub fn reports_root(&self) -> PathBuf {
        self.base_dir.join(&self.reports_dir)
    }

    /// Maximum file size in bytes.
    pub fn max_file_size(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(MB)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/hemostore.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// File storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(StorageError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| StorageError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `HEMOSTORE_BASE_DIR`: Override the storage base directory
    /// - `HEMOSTORE_MIRROR_TOKEN`: Override the mirror bearer token
    pub fn apply_env_overrides(&mut self) {
        if let Ok(base_dir) = std::env::var("HEMOSTORE_BASE_DIR") {
            if !base_dir.is_empty() {
                self.storage.base_dir = PathBuf::from(base_dir);
            }
        }

        if let Ok(token) = std::env::var("HEMOSTORE_MIRROR_TOKEN") {
            if !token.is_empty() {
                self.storage.mirror.token = Some(token);
            }
        }
    }

    /// Validate the configuration.
    ///
    /// Returns an error if:
    /// - the size ceiling is zero or above [`MAX_FILE_SIZE_MB_LIMIT`]
    /// - the naming attempt budget is zero
    /// - mirroring is enabled without a valid http(s) endpoint
    pub fn validate(&self) -> Result<()> {
        if self.storage.max_file_size_mb == 0 {
            return Err(StorageError::Config(
                "storage.max_file_size_mb must be greater than 0".to_string(),
            ));
        }
        if self.storage.max_file_size_mb > MAX_FILE_SIZE_MB_LIMIT {
            return Err(StorageError::Config(format!(
                "storage.max_file_size_mb must be at most {MAX_FILE_SIZE_MB_LIMIT}"
            )));
        }

        if self.storage.name_attempts == 0 {
            return Err(StorageError::Config(
                "storage.name_attempts must be greater than 0".to_string(),
            ));
        }

        let mirror = &self.storage.mirror;
        if mirror.enabled {
            let endpoint = mirror.endpoint.as_deref().ok_or_else(|| {
                StorageError::Config(
                    "storage.mirror is enabled but no endpoint is set".to_string(),
                )
            })?;
            let parsed = url::Url::parse(endpoint).map_err(|e| {
                StorageError::Config(format!("storage.mirror.endpoint is invalid: {e}"))
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(StorageError::Config(format!(
                    "storage.mirror.endpoint must be http or https, got {}",
                    parsed.scheme()
                )));
            }
        }

        Ok(())
    }
}
