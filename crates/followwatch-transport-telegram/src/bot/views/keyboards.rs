//! Inline keyboards and their callback data.

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use url::Url;

const CHECK_PREFIX: &str = "check_";
const REMOVE_PREFIX: &str = "remove_";

/// Action carried by an inline button
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    /// Run a check for the handle
    Check(String),
    /// Stop tracking the handle
    Remove(String),
}

impl CallbackAction {
    /// Parse callback data produced by [`user_keyboard`]
    #[must_use]
    pub fn parse(data: &str) -> Option<Self> {
        if let Some(handle) = data.strip_prefix(CHECK_PREFIX) {
            return (!handle.is_empty()).then(|| Self::Check(handle.to_string()));
        }
        if let Some(handle) = data.strip_prefix(REMOVE_PREFIX) {
            return (!handle.is_empty()).then(|| Self::Remove(handle.to_string()));
        }
        None
    }

    /// Callback data for this action
    #[must_use]
    pub fn data(&self) -> String {
        match self {
            Self::Check(handle) => format!("{CHECK_PREFIX}{handle}"),
            Self::Remove(handle) => format!("{REMOVE_PREFIX}{handle}"),
        }
    }
}

/// Profile URL of a handle
#[must_use]
pub fn profile_url(handle: &str) -> String {
    format!("https://twitter.com/{handle}")
}

/// Per-account actions shown under check results
#[must_use]
pub fn user_keyboard(handle: &str) -> InlineKeyboardMarkup {
    let mut rows = vec![vec![
        InlineKeyboardButton::callback(
            "🔄 Check Update",
            CallbackAction::Check(handle.to_string()).data(),
        ),
        InlineKeyboardButton::callback(
            "🗑️ Remove",
            CallbackAction::Remove(handle.to_string()).data(),
        ),
    ]];

    if let Ok(url) = Url::parse(&profile_url(handle)) {
        rows.push(vec![InlineKeyboardButton::url("🔗 View on Twitter", url)]);
    }

    InlineKeyboardMarkup::new(rows)
}
