//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (APPCACHE_*)
//! 2. TOML config file (if APPCACHE_CONFIG_FILE set)
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
/// 1. Environment variables (APPCACHE_*)
/// 2. TOML config file (if APPCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite database holding manifests, pins and generations.
    ///
    /// Set via APPCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin the intercepted pages are served from.
    ///
    /// Requests with a different scheme bypass the engine.
    /// Set via APPCACHE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Header that forces a request straight to the network when set to `true`.
    ///
    /// Set via APPCACHE_BYPASS_HEADER environment variable.
    #[serde(default = "default_bypass_header")]
    pub bypass_header: String,

    /// Referrer values that say nothing about the issuing page.
    ///
    /// Set via APPCACHE_IGNORED_REFERRERS environment variable (comma-separated).
    #[serde(default = "default_ignored_referrers")]
    pub ignored_referrers: Vec<String>,

    /// User-Agent string for network fetches.
    ///
    /// Set via APPCACHE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via APPCACHE_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via APPCACHE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./appcache.sqlite")
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_bypass_header() -> String {
    "x-use-fetch".into()
}

fn default_ignored_referrers() -> Vec<String> {
    vec!["about:client".into()]
}

fn default_user_agent() -> String {
    "appcache/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            origin: default_origin(),
            bypass_header: default_bypass_header(),
            ignored_referrers: default_ignored_referrers(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `APPCACHE_`
    /// 2. TOML file from `APPCACHE_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("APPCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("APPCACHE_")
                .ignore(&["config_file"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Whether a referrer value is a known placeholder rather than a page URL.
    pub fn is_ignored_referrer(&self, referrer: &str) -> bool {
        self.ignored_referrers.iter().any(|r| r == referrer)
    }
}
