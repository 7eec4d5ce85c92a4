use super::types::{Credits, Envelope, FollowingPage, TwitterUser};
use super::{TwitterApi, TwitterError};
use crate::config::{
    TrackerSettings, ENDPOINT_MY_INFO, ENDPOINT_USER_FOLLOWINGS, ENDPOINT_USER_INFO,
};
use crate::utils::truncate_str;
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, instrument};

const API_KEY_HEADER: &str = "X-API-Key";

/// reqwest-backed client for twitterapi.io
pub struct TwitterClient {
    http: HttpClient,
    base_url: String,
    api_key: String,
}

impl TwitterClient {
    /// Create a client from tracker settings.
    ///
    /// Uses `twitter_http_timeout_secs` so a stuck upstream call cannot hang
    /// a check forever.
    #[must_use]
    pub fn new(settings: &TrackerSettings) -> Self {
        let timeout = Duration::from_secs(settings.twitter_http_timeout_secs);
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| HttpClient::new());

        Self::with_http_client(
            http,
            &settings.twitter_api_base_url,
            &settings.twitter_api_key,
        )
    }

    /// Create a client around an existing HTTP client
    #[must_use]
    pub fn with_http_client(http: HttpClient, base_url: &str, api_key: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<T, TwitterError> {
        let url = format!("{}{endpoint}", self.base_url);

        let response = self
            .http
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .query(query)
            .send()
            .await
            .map_err(|e| TwitterError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(TwitterError::Transport(http_error_message(
                status,
                &error_text,
            )));
        }

        response
            .json()
            .await
            .map_err(|e| TwitterError::Decode(e.without_url().to_string()))
    }
}

/// Build a readable message for a non-success HTTP status
fn http_error_message(status: reqwest::StatusCode, body: &str) -> String {
    let trimmed = body.trim_start();
    let is_html = trimmed.starts_with("<!DOCTYPE")
        || trimmed.starts_with("<html")
        || trimmed.starts_with("<HTML");

    if is_html {
        format!("HTTP {status} (server returned an HTML error page)")
    } else if body.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status} - {}", truncate_str(body, 300))
    }
}

#[async_trait]
impl TwitterApi for TwitterClient {
    #[instrument(skip(self))]
    async fn fetch_profile(&self, handle: &str) -> Result<TwitterUser, TwitterError> {
        debug!("Fetching profile");
        let envelope: Envelope = self
            .get_json(ENDPOINT_USER_INFO, &[("userName", handle.to_string())])
            .await?;

        if !envelope.is_success() {
            return Err(TwitterError::Api(envelope.error_message()));
        }

        envelope
            .data
            .ok_or_else(|| TwitterError::Decode("profile response has no data".to_string()))
    }

    #[instrument(skip(self, cursor), fields(has_cursor = cursor.is_some()))]
    async fn fetch_following_page(
        &self,
        handle: &str,
        page_size: usize,
        cursor: Option<String>,
    ) -> Result<FollowingPage, TwitterError> {
        let mut query = vec![
            ("userName", handle.to_string()),
            ("pageSize", page_size.to_string()),
        ];
        if let Some(cursor) = cursor.filter(|c| !c.is_empty()) {
            query.push(("cursor", cursor));
        }

        debug!("Fetching followings page");
        let envelope: Envelope = self.get_json(ENDPOINT_USER_FOLLOWINGS, &query).await?;

        if !envelope.is_success() {
            return Err(TwitterError::Api(envelope.error_message()));
        }

        Ok(FollowingPage {
            followings: envelope.followings,
            has_next_page: envelope.has_next_page,
            next_cursor: envelope.next_cursor,
        })
    }

    #[instrument(skip(self))]
    async fn fetch_account_credits(&self) -> Result<Credits, TwitterError> {
        debug!("Fetching account credits");
        self.get_json(ENDPOINT_MY_INFO, &[]).await
    }
}
