//! Upstream Twitter API client
//!
//! One call is one HTTP round trip. Transport failures and API-level error
//! payloads are normalised into [`TwitterError`]; nothing is retried here.

mod client;
mod types;

pub use client::TwitterClient;
pub use types::{Credits, FollowingPage, TwitterUser};

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while talking to the upstream API
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TwitterError {
    /// Connection failure, timeout or non-success HTTP status
    #[error("Network error: {0}")]
    Transport(String),
    /// Well-formed response whose status is not `success`
    #[error("{0}")]
    Api(String),
    /// Response body could not be decoded
    #[error("Invalid response: {0}")]
    Decode(String),
}

/// Interface for the upstream profile/followings provider
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TwitterApi: Send + Sync {
    /// Fetch the current profile snapshot of `handle`
    async fn fetch_profile(&self, handle: &str) -> Result<TwitterUser, TwitterError>;

    /// Fetch one page of the newest-first following feed of `handle`.
    ///
    /// `page_size` is forwarded unchanged. Without a cursor the first page is
    /// requested.
    async fn fetch_following_page(
        &self,
        handle: &str,
        page_size: usize,
        cursor: Option<String>,
    ) -> Result<FollowingPage, TwitterError>;

    /// Fetch the remaining API credits of the configured key
    async fn fetch_account_credits(&self) -> Result<Credits, TwitterError>;
}
