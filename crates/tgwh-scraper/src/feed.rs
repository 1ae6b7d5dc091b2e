//! The seam between channel scraping and the message source.

use async_trait::async_trait;

use crate::channel::ScrapeSettings;
use crate::{FeedClient, FetchOutcome, ScraperError};

/// A source of channel messages and their attachments.
#[async_trait]
pub trait MessageFeed: Send + Sync {
    /// Most recent messages for `channel`, newest first, up to
    /// `settings.max_messages`. Partial results come back with the error.
    async fn fetch_recent(&self, channel: &str, settings: &ScrapeSettings) -> FetchOutcome;

    /// Raw bytes of one attachment.
    async fn download(&self, download_url: &str) -> Result<Vec<u8>, ScraperError>;
}

#[async_trait]
impl MessageFeed for FeedClient {
    async fn fetch_recent(&self, channel: &str, settings: &ScrapeSettings) -> FetchOutcome {
        self.fetch_recent_messages(
            channel,
            settings.max_messages,
            settings.page_size,
            settings.inter_request_delay_ms,
        )
        .await
    }

    async fn download(&self, download_url: &str) -> Result<Vec<u8>, ScraperError> {
        FeedClient::download(self, download_url).await
    }
}
