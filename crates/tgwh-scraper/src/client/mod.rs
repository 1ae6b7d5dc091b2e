//! HTTP client for the message feed gateway.

mod fetch_all;

use std::time::Duration;

use reqwest::{Client, Url};
use tgwh_core::AppConfig;

use crate::error::ScraperError;
use crate::rate_limit::retry_with_backoff;
use crate::types::FeedPage;

/// Maximum number of pages to fetch for one channel.
/// Guards against a gateway that keeps handing back cursors.
pub(super) const MAX_PAGES: usize = 500;

/// HTTP client for `GET {base}/channels/{channel}/messages`.
///
/// Maps 401/403 to [`ScraperError::AccessDenied`], 404 to
/// [`ScraperError::UnknownChannel`], and 429 to [`ScraperError::RateLimited`].
/// Rate limits, network failures, and 5xx responses are retried with
/// exponential backoff up to `max_retries` additional attempts.
pub struct FeedClient {
    pub(super) client: Client,
    pub(super) base_url: Url,
    token: Option<String>,
    pub(super) max_retries: u32,
    pub(super) backoff_base_secs: u64,
}

impl std::fmt::Debug for FeedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedClient")
            .field("base_url", &self.base_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "[redacted]"))
            .field("max_retries", &self.max_retries)
            .field("backoff_base_secs", &self.backoff_base_secs)
            .finish_non_exhaustive()
    }
}

impl FeedClient {
    /// Creates a client with configured timeout, `User-Agent`, bearer token,
    /// and retry policy.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidFeedUrl`] if `base_url` does not parse,
    /// or [`ScraperError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(
        base_url: &str,
        token: Option<&str>,
        timeout_secs: u64,
        user_agent: &str,
        max_retries: u32,
        backoff_base_secs: u64,
    ) -> Result<Self, ScraperError> {
        let base_url = Url::parse(base_url).map_err(|e| ScraperError::InvalidFeedUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ScraperError::InvalidFeedUrl {
                url: base_url.to_string(),
                reason: "URL cannot be used as a base".to_owned(),
            });
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            base_url,
            token: token.map(str::to_owned),
            max_retries,
            backoff_base_secs,
        })
    }

    /// Builds a client from the application config. A feed token is required.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Config`] when `TGWH_FEED_TOKEN` is unset, or
    /// any error from [`FeedClient::new`].
    pub fn from_app_config(config: &AppConfig) -> Result<Self, ScraperError> {
        let token = config.require_feed_token()?;
        Self::new(
            &config.feed_url,
            Some(token),
            config.scraper_request_timeout_secs,
            &config.scraper_user_agent,
            config.scraper_max_retries,
            config.scraper_retry_backoff_base_secs,
        )
    }

    /// Fetches one page of a channel's messages, newest first, with retry on
    /// transient errors.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::AccessDenied`] for HTTP 401/403 (not retried).
    /// - [`ScraperError::UnknownChannel`] for HTTP 404 (not retried).
    /// - [`ScraperError::RateLimited`] for HTTP 429 after retries are exhausted.
    /// - [`ScraperError::UnexpectedStatus`] for any other non-2xx status.
    /// - [`ScraperError::Http`] on network failure after retries are exhausted.
    /// - [`ScraperError::Deserialize`] if the body is not a valid page.
    pub async fn fetch_messages_page(
        &self,
        channel: &str,
        limit: u32,
        offset_id: Option<i64>,
    ) -> Result<FeedPage, ScraperError> {
        let url = self.messages_url(channel, limit, offset_id)?;

        retry_with_backoff(self.max_retries, self.backoff_base_secs, || {
            let url = url.clone();
            async move {
                let response = self.authorized(self.client.get(url.clone())).send().await?;
                let status = response.status();

                if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                    let retry_after_secs = response
                        .headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(60);
                    return Err(ScraperError::RateLimited {
                        channel: channel.to_owned(),
                        retry_after_secs,
                    });
                }

                if status == reqwest::StatusCode::UNAUTHORIZED
                    || status == reqwest::StatusCode::FORBIDDEN
                {
                    return Err(ScraperError::AccessDenied {
                        channel: channel.to_owned(),
                        status: status.as_u16(),
                    });
                }

                if status == reqwest::StatusCode::NOT_FOUND {
                    return Err(ScraperError::UnknownChannel {
                        channel: channel.to_owned(),
                    });
                }

                if !status.is_success() {
                    return Err(ScraperError::UnexpectedStatus {
                        status: status.as_u16(),
                        url: url.to_string(),
                    });
                }

                let body = response.text().await?;
                serde_json::from_str::<FeedPage>(&body).map_err(|e| ScraperError::Deserialize {
                    context: format!("messages page for channel '{channel}'"),
                    source: e,
                })
            }
        })
        .await
    }

    /// Downloads an attachment. Relative URLs resolve against the gateway base.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidFeedUrl`] for an unusable URL,
    /// [`ScraperError::UnexpectedStatus`] for a non-2xx response, or
    /// [`ScraperError::Http`] on network failure after retries.
    pub async fn download(&self, download_url: &str) -> Result<Vec<u8>, ScraperError> {
        let url = self
            .base_url
            .join(download_url)
            .map_err(|e| ScraperError::InvalidFeedUrl {
                url: download_url.to_owned(),
                reason: e.to_string(),
            })?;

        retry_with_backoff(self.max_retries, self.backoff_base_secs, || {
            let url = url.clone();
            async move {
                let response = self.authorized(self.client.get(url.clone())).send().await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(ScraperError::UnexpectedStatus {
                        status: status.as_u16(),
                        url: url.to_string(),
                    });
                }
                Ok(response.bytes().await?.to_vec())
            }
        })
        .await
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Builds the messages URL for a channel, page size, and optional cursor.
    fn messages_url(
        &self,
        channel: &str,
        limit: u32,
        offset_id: Option<i64>,
    ) -> Result<Url, ScraperError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ScraperError::InvalidFeedUrl {
                url: self.base_url.to_string(),
                reason: "URL cannot be used as a base".to_owned(),
            })?
            .pop_if_empty()
            .extend(["channels", channel, "messages"]);

        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string());
        if let Some(offset) = offset_id {
            url.query_pairs_mut()
                .append_pair("offset_id", &offset.to_string());
        }

        Ok(url)
    }
}

#[cfg(test)]
#[path = "../client_test.rs"]
mod tests;
