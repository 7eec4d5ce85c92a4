//! Testing helpers and mock utilities.
//!
//! Provides builders for provider records and pre-configured mocks.

use crate::storage::{MockTrackingStore, TrackedAccount};
use crate::twitter::{FollowingPage, MockTwitterApi, TwitterError, TwitterUser};
use chrono::Utc;

/// Build a profile with the given handle and following count
#[must_use]
pub fn profile(handle: &str, following: u64) -> TwitterUser {
    TwitterUser {
        name: handle.to_uppercase(),
        user_name: handle.to_string(),
        following,
        ..TwitterUser::default()
    }
}

/// Build `count` records named `{prefix}_{index}`
#[must_use]
pub fn users(prefix: &str, count: usize) -> Vec<TwitterUser> {
    (0..count)
        .map(|i| profile(&format!("{prefix}_{i}"), 0))
        .collect()
}

/// Build a followings page
#[must_use]
pub fn page_of(
    followings: Vec<TwitterUser>,
    has_next_page: bool,
    next_cursor: Option<&str>,
) -> FollowingPage {
    FollowingPage {
        followings,
        has_next_page,
        next_cursor: next_cursor.map(str::to_string),
    }
}

/// Build a stored record as it looks after `check_count` checks
#[must_use]
pub fn tracked(handle: &str, following: u64, check_count: u64) -> TrackedAccount {
    let now = Utc::now();
    TrackedAccount {
        handle: handle.to_string(),
        profile: profile(handle, following),
        following_count: following,
        last_following_count: following,
        first_tracked: now,
        last_checked: now,
        check_count,
    }
}

/// Create a mock API whose every call fails with the given message.
///
/// # Example
///
/// ```rust,ignore
/// use followwatch_core::testing::mock_api_failing;
///
/// let api = mock_api_failing("rate limited");
/// ```
#[must_use]
pub fn mock_api_failing(message: &'static str) -> MockTwitterApi {
    let mut mock = MockTwitterApi::new();

    mock.expect_fetch_profile()
        .returning(move |_| Err(TwitterError::Api(message.to_string())));

    mock.expect_fetch_following_page()
        .returning(move |_, _, _| Err(TwitterError::Api(message.to_string())));

    mock.expect_fetch_account_credits()
        .returning(move || Err(TwitterError::Api(message.to_string())));

    mock
}

/// Create a mock store that must never be written to.
///
/// Reads return nothing; any `upsert` or `remove` fails the test.
#[must_use]
pub fn mock_store_read_only() -> MockTrackingStore {
    let mut mock = MockTrackingStore::new();

    mock.expect_get().returning(|_| Ok(None));
    mock.expect_list_all().returning(|| Ok(Vec::new()));
    mock.expect_upsert().never();
    mock.expect_remove().never();

    mock
}
