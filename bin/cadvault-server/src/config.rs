//! Server configuration, loaded from environment variables at startup.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),
}

/// Runtime configuration for cadvault-server.
///
/// The database URL and storage directory must be provided; everything else
/// has a default.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:3000"`).
    pub bind_address: String,

    /// sqlx SQLite URL, e.g. `"sqlite://cadvault.db"`.
    pub database_url: String,

    /// Root directory of the local blob store.
    pub storage_dir: PathBuf,

    /// Origin clients use to reach this server; prefixes every file URL.
    pub public_url: String,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Comma-separated allowed origins; `None` allows any origin.
    pub cors_allowed_origins: Option<String>,

    /// Upper bound for one imported file.
    pub max_upload_mb: usize,

    /// Serve `/api-docs/openapi.json`.
    pub enable_docs: bool,

    /// Timeout for fetching model files hosted elsewhere.
    pub fetch_timeout: Duration,

    /// Fetch model files hosted on other servers for the viewer. Remote
    /// bodies are capped at [`Config::max_upload_bytes`].
    pub remote_fetch: bool,
}

impl Config {
    /// Build [`Config`] from `CADVAULT_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            bind_address: env_or("CADVAULT_BIND", "0.0.0.0:3000"),
            database_url: required("CADVAULT_DATABASE_URL")?,
            storage_dir: PathBuf::from(required("CADVAULT_STORAGE_DIR")?),
            public_url: env_or("CADVAULT_PUBLIC_URL", "http://localhost:3000"),
            log_level: env_or("CADVAULT_LOG", "info"),
            log_json: parse_bool("CADVAULT_LOG_JSON", false),
            cors_allowed_origins: optional("CADVAULT_CORS_ORIGINS"),
            max_upload_mb: parse_env("CADVAULT_MAX_UPLOAD_MB", 200),
            enable_docs: parse_bool("CADVAULT_ENABLE_DOCS", true),
            fetch_timeout: Duration::from_secs(parse_env("CADVAULT_FETCH_TIMEOUT_SECS", 30)),
            remote_fetch: parse_bool("CADVAULT_REMOTE_FETCH", true),
        })
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    optional(key).ok_or(ConfigError::Missing(key))
}

fn optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    optional(key).unwrap_or_else(|| default.to_owned())
}

fn parse_bool(key: &str, default: bool) -> bool {
    optional(key)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    optional(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[cfg(test)]
impl Config {
    /// Test configuration rooted at `storage_dir`.
    pub fn for_tests(storage_dir: PathBuf) -> Self {
        Self {
            bind_address: "127.0.0.1:0".into(),
            database_url: "sqlite::memory:".into(),
            storage_dir,
            public_url: "http://localhost:3000".into(),
            log_level: "info".into(),
            log_json: false,
            cors_allowed_origins: None,
            max_upload_mb: 1,
            enable_docs: true,
            fetch_timeout: Duration::from_secs(5),
            remote_fetch: true,
        }
    }
}
