//! Configuration and settings management
//!
//! Loads settings from config files and environment variables and defines
//! upstream API constants.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Base URL of the twitterapi.io REST API
pub const TWITTER_API_BASE_URL: &str = "https://api.twitterapi.io";
/// Profile lookup endpoint
pub const ENDPOINT_USER_INFO: &str = "/twitter/user/info";
/// Paginated followings endpoint
pub const ENDPOINT_USER_FOLLOWINGS: &str = "/twitter/user/followings";
/// Account credits endpoint
pub const ENDPOINT_MY_INFO: &str = "/oapi/my/info";

/// Upper bound of upstream pages fetched for one reconciliation
pub const DEFAULT_MAX_PAGES: usize = 10;
/// Smallest page size requested from the followings endpoint
pub const MIN_PAGE_SIZE: usize = 20;
/// Largest page size the followings endpoint accepts
pub const MAX_PAGE_SIZE: usize = 200;

/// Default HTTP timeout for upstream requests
pub const TWITTER_HTTP_TIMEOUT_SECS: u64 = 30;

// Telegram API retry configuration
/// Maximum retry attempts for Telegram API operations
pub const TELEGRAM_API_MAX_RETRIES: usize = 3;
/// Initial backoff between Telegram API retries
pub const TELEGRAM_API_INITIAL_BACKOFF_MS: u64 = 500;
/// Maximum backoff between Telegram API retries
pub const TELEGRAM_API_MAX_BACKOFF_MS: u64 = 4000;

/// Name of the tracking database file inside `data_dir`
pub const USERS_DB_FILE: &str = "users.json";

/// Tracker settings loaded from config files and environment variables
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TrackerSettings {
    /// twitterapi.io API key, sent as `X-API-Key`
    #[serde(default)]
    pub twitter_api_key: String,

    /// Upstream base URL
    #[serde(default = "default_twitter_api_base_url")]
    pub twitter_api_base_url: String,

    /// Directory holding the tracking database
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Page ceiling for one reconciliation
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Upstream HTTP timeout in seconds
    #[serde(default = "default_twitter_http_timeout_secs")]
    pub twitter_http_timeout_secs: u64,
}

fn default_twitter_api_base_url() -> String {
    TWITTER_API_BASE_URL.to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

const fn default_max_pages() -> usize {
    DEFAULT_MAX_PAGES
}

const fn default_twitter_http_timeout_secs() -> u64 {
    TWITTER_HTTP_TIMEOUT_SECS
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            twitter_api_key: String::new(),
            twitter_api_base_url: default_twitter_api_base_url(),
            data_dir: default_data_dir(),
            max_pages: DEFAULT_MAX_PAGES,
            twitter_http_timeout_secs: TWITTER_HTTP_TIMEOUT_SECS,
        }
    }
}

impl TrackerSettings {
    /// Create new settings by loading from environment and files
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails or the API key is missing.
    pub fn new() -> Result<Self, ConfigError> {
        let settings: Self = build_config()?.try_deserialize()?;
        if settings.twitter_api_key.trim().is_empty() {
            return Err(ConfigError::Message(
                "TWITTER_API_KEY is missing".to_string(),
            ));
        }
        Ok(settings)
    }

    /// Page ceiling, never below one page
    #[must_use]
    pub fn effective_max_pages(&self) -> usize {
        self.max_pages.max(1)
    }

    /// Path of the tracking database file
    #[must_use]
    pub fn users_db_path(&self) -> PathBuf {
        self.data_dir.join(USERS_DB_FILE)
    }
}

/// Build the layered configuration shared by all settings structs.
///
/// Sources, lowest priority first: `config/default`, `config/{RUN_MODE}`,
/// `config/local`, `APP__*` environment variables, plain environment variables.
///
/// # Errors
///
/// Returns a `ConfigError` if a present source cannot be read.
pub fn build_config() -> Result<Config, ConfigError> {
    let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

    Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
        // Local overrides, not checked into git
        .add_source(File::with_name("config/local").required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        // Environment::default() maps UPPER_SNAKE_CASE to snake_case keys
        .add_source(Environment::default().ignore_empty(true))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = TrackerSettings::default();
        assert_eq!(settings.twitter_api_base_url, TWITTER_API_BASE_URL);
        assert_eq!(settings.max_pages, 10);
        assert_eq!(settings.users_db_path(), PathBuf::from("data/users.json"));
    }

    #[test]
    fn test_effective_max_pages_floor() {
        let settings = TrackerSettings {
            max_pages: 0,
            ..TrackerSettings::default()
        };
        assert_eq!(settings.effective_max_pages(), 1);
    }

    #[test]
    fn test_deserialize_partial_source() -> Result<(), Box<dyn std::error::Error>> {
        let config = Config::builder()
            .set_override("twitter_api_key", "secret")?
            .set_override("max_pages", 3)?
            .build()?;

        let settings: TrackerSettings = config.try_deserialize()?;
        assert_eq!(settings.twitter_api_key, "secret");
        assert_eq!(settings.max_pages, 3);
        assert_eq!(settings.twitter_http_timeout_secs, 30);
        assert_eq!(settings.data_dir, PathBuf::from("data"));
        Ok(())
    }
}
