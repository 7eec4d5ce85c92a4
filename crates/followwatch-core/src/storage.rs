//! Storage layer for tracked accounts
//!
//! One record per tracked handle, keyed by the lowercased handle. The
//! default implementation keeps every record in a single JSON file.

use crate::twitter::TwitterUser;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// Standard I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Error during JSON serialization or deserialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Tracking state of one account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedAccount {
    /// Handle as first registered
    pub handle: String,
    /// Latest profile snapshot
    pub profile: TwitterUser,
    /// Following count seen by the latest check
    pub following_count: u64,
    /// Following count seen by the check before it
    pub last_following_count: u64,
    /// When tracking started
    pub first_tracked: DateTime<Utc>,
    /// When the latest check ran
    pub last_checked: DateTime<Utc>,
    /// Successful checks so far, including the first
    pub check_count: u64,
}

impl TrackedAccount {
    /// Record of a first successful check
    #[must_use]
    pub fn first_check(
        handle: &str,
        profile: TwitterUser,
        following_count: u64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            handle: handle.to_string(),
            profile,
            following_count,
            last_following_count: following_count,
            first_tracked: now,
            last_checked: now,
            check_count: 1,
        }
    }

    /// Apply a later successful check; the current count becomes the previous one
    pub fn record_check(&mut self, profile: TwitterUser, following_count: u64, now: DateTime<Utc>) {
        self.profile = profile;
        self.last_following_count = self.following_count;
        self.following_count = following_count;
        self.last_checked = now;
        self.check_count += 1;
    }

    /// Change of the following count observed by the latest check
    #[must_use]
    pub fn last_change(&self) -> i64 {
        count_as_i64(self.following_count) - count_as_i64(self.last_following_count)
    }
}

fn count_as_i64(count: u64) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}

/// Storage key for a handle
#[must_use]
pub fn handle_key(handle: &str) -> String {
    handle.to_lowercase()
}

/// Interface for tracking stores
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TrackingStore: Send + Sync {
    /// Get the record of a handle
    async fn get(&self, handle: &str) -> Result<Option<TrackedAccount>, StorageError>;
    /// Create the record or apply a new check to it
    async fn upsert(
        &self,
        handle: &str,
        profile: &TwitterUser,
        following_count: u64,
    ) -> Result<TrackedAccount, StorageError>;
    /// Delete the record; `false` if it did not exist
    async fn remove(&self, handle: &str) -> Result<bool, StorageError>;
    /// All records ordered by key
    async fn list_all(&self) -> Result<Vec<TrackedAccount>, StorageError>;
}

type Records = BTreeMap<String, TrackedAccount>;

/// JSON file backed store.
///
/// Every operation loads, modifies and saves the whole file while holding a
/// lock, so concurrent checks of the same handle are serialized.
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    /// Open the store, creating the directory and an empty file if needed
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be created.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let store = Self {
            path,
            lock: Mutex::new(()),
        };

        if tokio::fs::metadata(&store.path).await.is_err() {
            store.save(&Records::new()).await?;
            info!("Created tracking database at {}", store.path.display());
        }

        Ok(store)
    }

    /// Path of the backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Records, StorageError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Records::new()),
            Err(e) => return Err(e.into()),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Records::new());
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn save(&self, records: &Records) -> Result<(), StorageError> {
        let body = serde_json::to_vec_pretty(records)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl TrackingStore for JsonFileStore {
    async fn get(&self, handle: &str) -> Result<Option<TrackedAccount>, StorageError> {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        Ok(records.remove(&handle_key(handle)))
    }

    async fn upsert(
        &self,
        handle: &str,
        profile: &TwitterUser,
        following_count: u64,
    ) -> Result<TrackedAccount, StorageError> {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        let now = Utc::now();

        let account = records
            .entry(handle_key(handle))
            .and_modify(|account| account.record_check(profile.clone(), following_count, now))
            .or_insert_with(|| {
                TrackedAccount::first_check(handle, profile.clone(), following_count, now)
            })
            .clone();

        self.save(&records).await?;
        debug!(
            "Saved @{} (following {}, check #{})",
            account.handle, account.following_count, account.check_count
        );
        Ok(account)
    }

    async fn remove(&self, handle: &str) -> Result<bool, StorageError> {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        if records.remove(&handle_key(handle)).is_none() {
            return Ok(false);
        }
        self.save(&records).await?;
        Ok(true)
    }

    async fn list_all(&self) -> Result<Vec<TrackedAccount>, StorageError> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.into_values().collect())
    }
}
