//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `origin` is not an absolute http(s) URL
    /// - `cache_prefix`, `cache_version` or `api_marker` is empty
    /// - `precache_urls` is empty
    /// - `script_path` or `scope` does not start with `/`
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `max_entry_bytes` is 0 or exceeds 50MB
    pub fn validate(&self) -> Result<(), ConfigError> {
        let origin = url::Url::parse(&self.origin).map_err(|e| invalid("origin", &e.to_string()))?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(invalid("origin", "must use http or https"));
        }

        if self.cache_prefix.is_empty() {
            return Err(invalid("cache_prefix", "must not be empty"));
        }
        if self.cache_version.is_empty() {
            return Err(invalid("cache_version", "must not be empty"));
        }
        if self.api_marker.is_empty() {
            return Err(invalid("api_marker", "must not be empty"));
        }

        if self.precache_urls.is_empty() {
            return Err(invalid("precache_urls", "must list at least the application root"));
        }

        if !self.script_path.starts_with('/') {
            return Err(invalid("script_path", "must start with '/'"));
        }
        if !self.scope.starts_with('/') {
            return Err(invalid("scope", "must start with '/'"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.max_entry_bytes == 0 {
            return Err(invalid("max_entry_bytes", "must be greater than 0"));
        }
        if self.max_entry_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_entry_bytes", "must not exceed 50MB"));
        }

        if self.tunnel_marker.is_empty() {
            tracing::warn!("tunnel_marker is empty; no tunnel host will be trusted");
        }

        Ok(())
    }
}
