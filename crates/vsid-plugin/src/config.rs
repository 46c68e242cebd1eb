//! Plugin configuration from environment.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct PluginConfig {
    /// Directory holding cached airport documents, overrides, aircraft table and settings.
    pub config_dir: PathBuf,
    /// Base URL that `config_github_url` is appended to.
    pub remote_base: String,
    /// Document `version` this build understands.
    pub schema_version: String,
    pub fetch_timeout: Duration,
    /// Pause between a failed load and its single retry.
    pub retry_backoff: Duration,
    /// First cool-down before a failed airport is loaded again; doubles up to ten times this.
    pub failed_reload: Duration,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            config_dir: PathBuf::from("./vsid-config"),
            remote_base: "https://raw.githubusercontent.com".to_string(),
            schema_version: "1.0.0".to_string(),
            fetch_timeout: Duration::from_millis(3000),
            retry_backoff: Duration::from_millis(500),
            failed_reload: Duration::from_secs(30),
        }
    }
}

impl PluginConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            config_dir: env::var("VSID_CONFIG_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.config_dir),
            remote_base: env::var("VSID_REMOTE_BASE")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or(defaults.remote_base),
            schema_version: env::var("VSID_SCHEMA_VERSION").unwrap_or(defaults.schema_version),
            fetch_timeout: env::var("VSID_FETCH_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.fetch_timeout),
            retry_backoff: env::var("VSID_RETRY_BACKOFF_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_backoff),
            failed_reload: env::var("VSID_FAILED_RELOAD_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.failed_reload),
        }
    }
}
