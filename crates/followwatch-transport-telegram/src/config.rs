//! Telegram transport settings.

use config::ConfigError;
use followwatch_core::config::TrackerSettings;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Telegram transport settings loaded from environment variables.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct TelegramSettings {
    /// Telegram Bot API token.
    pub telegram_bot_token: String,
    /// Comma-separated list of Telegram user IDs allowed to use the bot.
    /// Empty means everyone.
    #[serde(rename = "allowed_users")]
    pub allowed_users_str: Option<String>,
}

/// Combined settings used by the Telegram transport layer.
#[derive(Clone)]
pub struct BotSettings {
    /// Tracker settings shared across transport handlers.
    pub tracker: Arc<TrackerSettings>,
    /// Telegram-specific settings.
    pub telegram: Arc<TelegramSettings>,
}

impl BotSettings {
    /// Create a new combined settings bundle.
    #[must_use]
    pub fn new(tracker: TrackerSettings, telegram: TelegramSettings) -> Self {
        Self {
            tracker: Arc::new(tracker),
            telegram: Arc::new(telegram),
        }
    }
}

impl TelegramSettings {
    /// Create new settings by loading from environment and files.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails or the bot token is missing.
    pub fn new() -> Result<Self, ConfigError> {
        let settings: Self = followwatch_core::config::build_config()?.try_deserialize()?;
        if settings.telegram_bot_token.trim().is_empty() {
            return Err(ConfigError::Message(
                "TELEGRAM_BOT_TOKEN is missing".to_string(),
            ));
        }
        Ok(settings)
    }

    /// Returns a set of allowed user IDs.
    #[must_use]
    pub fn allowed_users(&self) -> HashSet<i64> {
        self.allowed_users_str
            .as_ref()
            .map(|s| {
                s.split(|c: char| c == ',' || c == ';' || c.is_whitespace())
                    .filter(|token| !token.is_empty())
                    .filter_map(|id| id.parse::<i64>().ok())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Cooldown period (seconds) between "Access denied" notices for the same user.
/// Default: 20 minutes.
pub const ACCESS_NOTICE_COOLDOWN_SECS: u64 = 1200;
/// Maximum number of users remembered by the notice cooldown.
pub const ACCESS_NOTICE_CACHE_MAX_SIZE: u64 = 10_000;

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Notice cooldown from `ACCESS_NOTICE_COOLDOWN_SECS` or the default.
#[must_use]
pub fn get_access_notice_cooldown() -> Duration {
    Duration::from_secs(env_u64(
        "ACCESS_NOTICE_COOLDOWN_SECS",
        ACCESS_NOTICE_COOLDOWN_SECS,
    ))
}

/// Cooldown cache capacity from `ACCESS_NOTICE_CACHE_MAX_SIZE` or the default.
#[must_use]
pub fn get_access_notice_cache_max_size() -> u64 {
    env_u64("ACCESS_NOTICE_CACHE_MAX_SIZE", ACCESS_NOTICE_CACHE_MAX_SIZE)
}
