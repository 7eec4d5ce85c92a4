//! Who may drive the tracker.
//!
//! Every check spends credits of the configured API key, so the bot can be
//! limited to a list of Telegram users. Strangers get one "Access denied"
//! notice per cooldown; further attempts inside the cooldown are counted and
//! dropped.

use moka::future::Cache;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Verdict for one incoming update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// The user may use the bot
    Granted,
    /// Not allowed; send the notice
    Denied,
    /// Not allowed and already notified within the cooldown
    Silenced,
}

/// Allowlist plus per-user notice cooldown
#[derive(Clone)]
pub struct AccessGate {
    allowed: Arc<HashSet<i64>>,
    /// user_id -> attempts dropped since the last notice
    notified: Cache<i64, Arc<AtomicU32>>,
}

impl AccessGate {
    /// Gate over `allowed`; an empty set lets everyone in.
    ///
    /// # Examples
    ///
    /// ```
    /// use followwatch_transport_telegram::bot::AccessGate;
    /// use std::collections::HashSet;
    /// use std::time::Duration;
    ///
    /// let gate = AccessGate::new(HashSet::new(), Duration::from_secs(60), 100);
    /// assert!(gate.is_open());
    /// assert!(gate.permits(42));
    /// ```
    #[must_use]
    pub fn new(allowed: HashSet<i64>, cooldown: Duration, max_capacity: u64) -> Self {
        let notified = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(cooldown)
            .build();

        Self {
            allowed: Arc::new(allowed),
            notified,
        }
    }

    /// No allowlist configured
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.allowed.is_empty()
    }

    /// Whether `user_id` may use the bot
    #[must_use]
    pub fn permits(&self, user_id: i64) -> bool {
        self.is_open() || self.allowed.contains(&user_id)
    }

    /// Decide what to do with an update from `user_id`
    pub async fn admit(&self, user_id: i64) -> Access {
        if self.permits(user_id) {
            return Access::Granted;
        }

        match self.notified.get(&user_id).await {
            None => Access::Denied,
            Some(dropped) => {
                let count = dropped.fetch_add(1, Ordering::Relaxed) + 1;
                if count.is_multiple_of(50) {
                    debug!("⛔️ Dropped {count} attempts from user {user_id} since the last notice");
                }
                Access::Silenced
            }
        }
    }

    /// Start the cooldown once the notice went out
    pub async fn notice_sent(&self, user_id: i64) {
        self.notified
            .insert(user_id, Arc::new(AtomicU32::new(0)))
            .await;
    }

    /// Attempts dropped since the last notice to `user_id`
    pub async fn dropped_attempts(&self, user_id: i64) -> u32 {
        self.notified
            .get(&user_id)
            .await
            .map_or(0, |dropped| dropped.load(Ordering::Relaxed))
    }
}
