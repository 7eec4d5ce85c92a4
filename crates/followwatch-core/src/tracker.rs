//! Check orchestration.
//!
//! A check reads the stored record, fetches a fresh profile, compares the
//! following counts and, when the count grew, reconciles the new followings
//! before persisting the fresh snapshot. Nothing is persisted when an
//! upstream call fails.

use crate::reconcile::{ReconciliationOutcome, Reconciler};
use crate::storage::{StorageError, TrackedAccount, TrackingStore};
use crate::twitter::{Credits, TwitterApi, TwitterError, TwitterUser};
use lazy_regex::regex_is_match;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Errors that can occur during a check
#[derive(Debug, Error)]
pub enum TrackerError {
    /// The handle is not a valid account name
    #[error("Invalid username: {0}")]
    InvalidHandle(String),
    /// Upstream call failed
    #[error(transparent)]
    Upstream(#[from] TwitterError),
    /// Store failed
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Strip a leading `@` and surrounding whitespace and validate the handle.
///
/// # Errors
///
/// Returns `TrackerError::InvalidHandle` if the handle is not 1-15 characters
/// of letters, digits and underscores.
pub fn normalize_handle(raw: &str) -> Result<String, TrackerError> {
    let handle = raw.trim().trim_start_matches('@');
    if regex_is_match!(r"^[A-Za-z0-9_]{1,15}$", handle) {
        Ok(handle.to_string())
    } else {
        Err(TrackerError::InvalidHandle(raw.trim().to_string()))
    }
}

/// Fresh profile next to the stored record, before anything is persisted
#[derive(Debug, Clone)]
pub struct Observation {
    /// Normalized handle
    pub handle: String,
    /// Fresh profile
    pub profile: TwitterUser,
    /// Stored record, if the handle is tracked
    pub stored: Option<TrackedAccount>,
}

impl Observation {
    /// Fresh minus stored following count; `None` for an untracked handle
    #[must_use]
    pub fn delta(&self) -> Option<i64> {
        self.stored.as_ref().map(|stored| {
            i64::try_from(self.profile.following).unwrap_or(i64::MAX)
                - i64::try_from(stored.following_count).unwrap_or(i64::MAX)
        })
    }

    /// Positive delta as a record count
    #[must_use]
    pub fn new_followings(&self) -> Option<usize> {
        self.delta()
            .filter(|d| *d > 0)
            .and_then(|d| usize::try_from(d).ok())
    }
}

/// What a successful check found
#[derive(Debug, Clone)]
pub enum CheckReport {
    /// The handle was not tracked before
    FirstTracked {
        /// New record
        account: TrackedAccount,
    },
    /// The following count grew
    NewFollowings {
        /// Updated record
        account: TrackedAccount,
        /// Growth of the following count
        delta: usize,
        /// Resolved accounts
        outcome: ReconciliationOutcome,
    },
    /// The following count shrank
    Decreased {
        /// Updated record
        account: TrackedAccount,
        /// Size of the decrease
        by: u64,
    },
    /// Nothing changed
    Unchanged {
        /// Updated record
        account: TrackedAccount,
    },
}

impl CheckReport {
    /// Record after the check
    #[must_use]
    pub fn account(&self) -> &TrackedAccount {
        match self {
            Self::FirstTracked { account }
            | Self::NewFollowings { account, .. }
            | Self::Decreased { account, .. }
            | Self::Unchanged { account } => account,
        }
    }
}

/// Ties the upstream client, the reconciler and the store together
pub struct Tracker {
    api: Arc<dyn TwitterApi>,
    store: Arc<dyn TrackingStore>,
    max_pages: usize,
}

impl Tracker {
    /// Create a tracker over injected collaborators
    #[must_use]
    pub fn new(api: Arc<dyn TwitterApi>, store: Arc<dyn TrackingStore>, max_pages: usize) -> Self {
        Self {
            api,
            store,
            max_pages: max_pages.max(1),
        }
    }

    /// Fetch a fresh profile and pair it with the stored record
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is invalid, the profile fetch fails or
    /// the store cannot be read.
    pub async fn observe(&self, raw_handle: &str) -> Result<Observation, TrackerError> {
        let handle = normalize_handle(raw_handle)?;
        let profile = self.api.fetch_profile(&handle).await?;
        let stored = self.store.get(&handle).await?;

        Ok(Observation {
            handle,
            profile,
            stored,
        })
    }

    /// Resolve and persist an observation
    ///
    /// # Errors
    ///
    /// Returns an error if reconciliation fails on its first page or the
    /// store cannot be written. The store is left untouched in both cases.
    pub async fn apply(&self, observation: Observation) -> Result<CheckReport, TrackerError> {
        let fresh_count = observation.profile.following;
        let new_followings = observation.new_followings();
        let Observation {
            handle,
            profile,
            stored,
        } = observation;

        let Some(stored) = stored else {
            let account = self.store.upsert(&handle, &profile, fresh_count).await?;
            info!("Started tracking @{handle} (following {fresh_count})");
            return Ok(CheckReport::FirstTracked { account });
        };

        if let Some(delta) = new_followings {
            let outcome = Reconciler::new(self.api.as_ref())
                .with_max_pages(self.max_pages)
                .reconcile(&handle, delta)
                .await;

            if let Some(error) = outcome.error.clone().filter(|_| !outcome.success) {
                return Err(TrackerError::Upstream(error));
            }

            let account = self.store.upsert(&handle, &profile, fresh_count).await?;
            return Ok(CheckReport::NewFollowings {
                account,
                delta,
                outcome,
            });
        }

        let account = self.store.upsert(&handle, &profile, fresh_count).await?;
        if fresh_count < stored.following_count {
            Ok(CheckReport::Decreased {
                account,
                by: stored.following_count - fresh_count,
            })
        } else {
            Ok(CheckReport::Unchanged { account })
        }
    }

    /// Observe and apply in one go
    ///
    /// # Errors
    ///
    /// See [`Tracker::observe`] and [`Tracker::apply`].
    pub async fn check(&self, raw_handle: &str) -> Result<CheckReport, TrackerError> {
        let observation = self.observe(raw_handle).await?;
        self.apply(observation).await
    }

    /// Stop tracking a handle; `false` if it was not tracked
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is invalid or the store fails.
    pub async fn untrack(&self, raw_handle: &str) -> Result<bool, TrackerError> {
        let handle = normalize_handle(raw_handle)?;
        let removed = self.store.remove(&handle).await?;
        if removed {
            info!("Stopped tracking @{handle}");
        }
        Ok(removed)
    }

    /// All tracked accounts
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn tracked(&self) -> Result<Vec<TrackedAccount>, TrackerError> {
        Ok(self.store.list_all().await?)
    }

    /// Remaining API credits
    ///
    /// # Errors
    ///
    /// Returns an error if the upstream call fails.
    pub async fn credits(&self) -> Result<Credits, TrackerError> {
        Ok(self.api.fetch_account_credits().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MockTrackingStore;
    use crate::testing::{mock_api_failing, mock_store_read_only, page_of, profile, tracked, users};
    use crate::twitter::MockTwitterApi;
    use mockall::predicate::{always, eq};

    fn tracker(api: MockTwitterApi, store: MockTrackingStore) -> Tracker {
        Tracker::new(Arc::new(api), Arc::new(store), 10)
    }

    #[test]
    fn test_normalize_handle() {
        assert_eq!(normalize_handle("@loxous").expect("valid"), "loxous");
        assert_eq!(normalize_handle("  Some_User1 ").expect("valid"), "Some_User1");
        assert!(normalize_handle("").is_err());
        assert!(normalize_handle("@").is_err());
        assert!(normalize_handle("bad-handle").is_err());
        assert!(normalize_handle("waytoolonghandle_16").is_err());
    }

    #[tokio::test]
    async fn test_invalid_handle_makes_no_calls() {
        let api = MockTwitterApi::new();
        let result = tracker(api, mock_store_read_only()).check("not valid").await;
        assert!(matches!(result, Err(TrackerError::InvalidHandle(_))));
    }

    #[tokio::test]
    async fn test_first_check_tracks() {
        let mut api = MockTwitterApi::new();
        api.expect_fetch_profile()
            .with(eq("Loxous"))
            .returning(|h| Ok(profile(h, 300)));
        api.expect_fetch_following_page().never();

        let mut store = MockTrackingStore::new();
        store.expect_get().returning(|_| Ok(None));
        store
            .expect_upsert()
            .with(eq("Loxous"), always(), eq(300))
            .times(1)
            .returning(|h, p, c| Ok(tracked_with(h, p, c)));

        let report = tracker(api, store).check("@Loxous").await.expect("check");
        assert!(matches!(report, CheckReport::FirstTracked { .. }));
        assert_eq!(report.account().following_count, 300);
    }

    #[tokio::test]
    async fn test_growth_reconciles_delta() {
        let mut api = MockTwitterApi::new();
        api.expect_fetch_profile().returning(|h| Ok(profile(h, 107)));
        api.expect_fetch_following_page()
            .with(eq("alice"), eq(20), eq(None::<String>))
            .times(1)
            .returning(|_, _, _| Ok(page_of(users("new", 20), true, Some("c"))));

        let mut store = MockTrackingStore::new();
        store.expect_get().returning(|h| Ok(Some(tracked(h, 100, 1))));
        store
            .expect_upsert()
            .times(1)
            .returning(|h, p, c| Ok(tracked_with(h, p, c)));

        let report = tracker(api, store).check("alice").await.expect("check");
        let CheckReport::NewFollowings { delta, outcome, .. } = report else {
            panic!("expected new followings");
        };
        assert_eq!(delta, 7);
        assert_eq!(outcome.records.len(), 7);
        assert_eq!(outcome.total_fetched, 20);
    }

    #[tokio::test]
    async fn test_failed_reconciliation_does_not_persist() {
        let mut api = MockTwitterApi::new();
        api.expect_fetch_profile().returning(|h| Ok(profile(h, 150)));
        api.expect_fetch_following_page()
            .times(1)
            .returning(|_, _, _| Err(TwitterError::Transport("timeout".to_string())));

        let mut store = MockTrackingStore::new();
        store.expect_get().returning(|h| Ok(Some(tracked(h, 100, 4))));
        store.expect_upsert().never();

        let result = tracker(api, store).check("alice").await;
        assert!(matches!(
            result,
            Err(TrackerError::Upstream(TwitterError::Transport(_)))
        ));
    }

    #[tokio::test]
    async fn test_profile_failure_does_not_persist() {
        let result = tracker(mock_api_failing("User not found"), mock_store_read_only())
            .check("ghost")
            .await;

        let Err(err) = result else {
            panic!("expected upstream error");
        };
        assert_eq!(err.to_string(), "User not found");
    }

    #[tokio::test]
    async fn test_decrease_and_unchanged() {
        let mut api = MockTwitterApi::new();
        api.expect_fetch_profile().returning(|h| Ok(profile(h, 90)));
        api.expect_fetch_following_page().never();

        let mut store = MockTrackingStore::new();
        store.expect_get().returning(|h| Ok(Some(tracked(h, 95, 2))));
        store
            .expect_upsert()
            .returning(|h, p, c| Ok(tracked_with(h, p, c)));

        let report = tracker(api, store).check("carol").await.expect("check");
        assert!(matches!(report, CheckReport::Decreased { by: 5, .. }));

        let mut api = MockTwitterApi::new();
        api.expect_fetch_profile().returning(|h| Ok(profile(h, 95)));
        api.expect_fetch_following_page().never();

        let mut store = MockTrackingStore::new();
        store.expect_get().returning(|h| Ok(Some(tracked(h, 95, 2))));
        store
            .expect_upsert()
            .times(1)
            .returning(|h, p, c| Ok(tracked_with(h, p, c)));

        let report = tracker(api, store).check("carol").await.expect("check");
        assert!(matches!(report, CheckReport::Unchanged { .. }));
    }

    #[tokio::test]
    async fn test_observation_delta() {
        let mut api = MockTwitterApi::new();
        api.expect_fetch_profile().returning(|h| Ok(profile(h, 450)));

        let mut store = MockTrackingStore::new();
        store.expect_get().returning(|h| Ok(Some(tracked(h, 200, 1))));

        let observation = tracker(api, store).observe("dave").await.expect("observe");
        assert_eq!(observation.delta(), Some(250));
        assert_eq!(observation.new_followings(), Some(250));
    }

    fn tracked_with(handle: &str, profile: &TwitterUser, count: u64) -> TrackedAccount {
        let mut account = tracked(handle, count, 1);
        account.profile = profile.clone();
        account
    }
}
