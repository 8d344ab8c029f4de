//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SWCACHE_*)
//! 2. TOML config file (if SWCACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SWCACHE_*)
/// 2. TOML config file (if SWCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite file that holds every cache store.
    ///
    /// Set via SWCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// The application's own origin, e.g. `https://soci.example.org`.
    ///
    /// Set via SWCACHE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Prefix shared by the install and runtime store names.
    ///
    /// Set via SWCACHE_CACHE_PREFIX environment variable.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Version tag of the current deployment's stores.
    ///
    /// Set via SWCACHE_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Host substring of the trusted tunnel in front of the API.
    ///
    /// Set via SWCACHE_TUNNEL_MARKER environment variable.
    #[serde(default = "default_tunnel_marker")]
    pub tunnel_marker: String,

    /// Path segment that identifies API calls.
    ///
    /// Set via SWCACHE_API_MARKER environment variable.
    #[serde(default = "default_api_marker")]
    pub api_marker: String,

    /// Critical paths seeded into the install store.
    ///
    /// Set via SWCACHE_PRECACHE_URLS environment variable (`["/", "/index.html"]`).
    #[serde(default = "default_precache_urls")]
    pub precache_urls: Vec<String>,

    /// Localized message of the synthesized offline API error.
    ///
    /// Set via SWCACHE_OFFLINE_MESSAGE environment variable.
    #[serde(default = "default_offline_message")]
    pub offline_message: String,

    /// Path the host registers the worker script under.
    ///
    /// Set via SWCACHE_SCRIPT_PATH environment variable.
    #[serde(default = "default_script_path")]
    pub script_path: String,

    /// Registration scope.
    ///
    /// Set via SWCACHE_SCOPE environment variable.
    #[serde(default = "default_scope")]
    pub scope: String,

    /// User-Agent string for network fetches.
    ///
    /// Set via SWCACHE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Network fetch timeout in milliseconds.
    ///
    /// Set via SWCACHE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Largest response body stored as a cache entry. Bigger responses
    /// still reach the page, they are just not kept.
    ///
    /// Set via SWCACHE_MAX_ENTRY_BYTES environment variable.
    #[serde(default = "default_max_entry_bytes")]
    pub max_entry_bytes: usize,

    /// Seconds between background update checks; 0 disables them.
    ///
    /// Set via SWCACHE_UPDATE_INTERVAL_SECS environment variable.
    #[serde(default = "default_update_interval_secs")]
    pub update_interval_secs: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./swcache.sqlite")
}

fn default_origin() -> String {
    "http://localhost:5173".into()
}

fn default_cache_prefix() -> String {
    "soci-app".into()
}

fn default_cache_version() -> String {
    "v5".into()
}

fn default_tunnel_marker() -> String {
    "ngrok".into()
}

fn default_api_marker() -> String {
    "/api/".into()
}

fn default_precache_urls() -> Vec<String> {
    vec!["/".into(), "/index.html".into()]
}

fn default_offline_message() -> String {
    "Sin conexión. Los datos no están disponibles.".into()
}

fn default_script_path() -> String {
    "/service-worker.js".into()
}

fn default_scope() -> String {
    "/".into()
}

fn default_user_agent() -> String {
    "swcache/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_entry_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_update_interval_secs() -> u64 {
    3600
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            origin: default_origin(),
            cache_prefix: default_cache_prefix(),
            cache_version: default_cache_version(),
            tunnel_marker: default_tunnel_marker(),
            api_marker: default_api_marker(),
            precache_urls: default_precache_urls(),
            offline_message: default_offline_message(),
            script_path: default_script_path(),
            scope: default_scope(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_entry_bytes: default_max_entry_bytes(),
            update_interval_secs: default_update_interval_secs(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Interval of background update checks, `None` when disabled.
    pub fn update_interval(&self) -> Option<Duration> {
        (self.update_interval_secs > 0).then(|| Duration::from_secs(self.update_interval_secs))
    }

    /// Name of the current version's install-time store.
    pub fn static_store(&self) -> String {
        format!("{}-static-{}", self.cache_prefix, self.cache_version)
    }

    /// Name of the current version's runtime store.
    pub fn runtime_store(&self) -> String {
        format!("{}-runtime-{}", self.cache_prefix, self.cache_version)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SWCACHE_`
    /// 2. TOML file from `SWCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SWCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SWCACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
