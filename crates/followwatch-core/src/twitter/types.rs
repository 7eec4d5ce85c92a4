use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Provider profile object.
///
/// The profile and the followings endpoints spell the same fields
/// differently and some payloads carry both spellings, so deserialization
/// goes through a wire struct that keeps each spelling apart.
/// Unknown fields are kept in `extra` so records pass through unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawTwitterUser")]
pub struct TwitterUser {
    /// Display name
    pub name: String,
    /// Handle without `@`
    #[serde(rename = "userName")]
    pub user_name: String,
    /// Profile bio
    pub description: String,
    /// Follower count
    pub followers: u64,
    /// Following count
    pub following: u64,
    /// Number of posts
    #[serde(rename = "statusesCount")]
    pub statuses_count: u64,
    /// Creation date as sent by the provider, e.g. `Tue Dec 10 07:00:30 +0000 2024`
    #[serde(rename = "createdAt")]
    pub created_at: String,
    /// Remaining provider fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Wire shape of [`TwitterUser`] with every spelling as its own field.
///
/// The camelCase spelling wins when both are present.
#[derive(Deserialize)]
struct RawTwitterUser {
    #[serde(default, deserialize_with = "nullable")]
    name: String,
    #[serde(default, rename = "userName", deserialize_with = "nullable")]
    user_name: String,
    #[serde(default, deserialize_with = "nullable")]
    description: String,
    #[serde(default)]
    followers: Option<u64>,
    #[serde(default)]
    followers_count: Option<u64>,
    #[serde(default)]
    following: Option<u64>,
    #[serde(default)]
    following_count: Option<u64>,
    #[serde(default, rename = "statusesCount")]
    statuses_count_camel: Option<u64>,
    #[serde(default)]
    statuses_count: Option<u64>,
    #[serde(default, rename = "createdAt")]
    created_at_camel: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl From<RawTwitterUser> for TwitterUser {
    fn from(raw: RawTwitterUser) -> Self {
        let created_at = [raw.created_at_camel, raw.created_at]
            .into_iter()
            .flatten()
            .find(|s| !s.is_empty())
            .unwrap_or_default();

        Self {
            name: raw.name,
            user_name: raw.user_name,
            description: raw.description,
            followers: raw.followers.or(raw.followers_count).unwrap_or_default(),
            following: raw.following.or(raw.following_count).unwrap_or_default(),
            statuses_count: raw
                .statuses_count_camel
                .or(raw.statuses_count)
                .unwrap_or_default(),
            created_at,
            extra: raw.extra,
        }
    }
}

/// One page of the following feed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FollowingPage {
    /// Accounts on this page, newest first
    pub followings: Vec<TwitterUser>,
    /// Whether the provider has another page
    pub has_next_page: bool,
    /// Cursor for the next page
    pub next_cursor: Option<String>,
}

/// Remaining credits of the configured API key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Credits {
    /// Purchased credits
    #[serde(default)]
    pub recharge_credits: u64,
    /// Bonus credits
    #[serde(default)]
    pub total_bonus_credits: u64,
}

impl Credits {
    /// Total credits available
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.recharge_credits.saturating_add(self.total_bonus_credits)
    }
}

/// Treat an explicit `null` like a missing field
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Response envelope shared by the profile and followings endpoints
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope {
    #[serde(default)]
    pub status: Option<Value>,
    #[serde(default)]
    pub msg: Option<Value>,
    #[serde(default)]
    pub data: Option<TwitterUser>,
    #[serde(default, deserialize_with = "nullable")]
    pub followings: Vec<TwitterUser>,
    #[serde(default, deserialize_with = "nullable")]
    pub has_next_page: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

impl Envelope {
    pub(crate) fn is_success(&self) -> bool {
        matches!(&self.status, Some(Value::String(s)) if s == "success")
    }

    /// Provider message; non-string messages are shown as JSON
    pub(crate) fn error_message(&self) -> String {
        match &self.msg {
            Some(Value::String(m)) if !m.is_empty() => m.clone(),
            None | Some(Value::Null | Value::String(_)) => "Unknown error".to_string(),
            Some(other) => other.to_string(),
        }
    }
}
