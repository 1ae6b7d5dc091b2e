//! Multi-page message fetch loop for `FeedClient`.

use std::time::Duration;

use crate::error::ScraperError;
use crate::types::FetchOutcome;

use super::FeedClient;
use super::MAX_PAGES;

impl FeedClient {
    /// Fetches up to `max_messages` of a channel's most recent messages,
    /// following `next_offset_id` cursors from newest to oldest.
    ///
    /// `inter_request_delay_ms` is applied between page requests.
    ///
    /// Unlike an all-or-nothing fetch, messages collected before a failure
    /// are kept: the returned [`FetchOutcome`] carries both what was fetched
    /// and the error that stopped the loop.
    pub async fn fetch_recent_messages(
        &self,
        channel: &str,
        max_messages: usize,
        page_size: u32,
        inter_request_delay_ms: u64,
    ) -> FetchOutcome {
        let mut outcome = FetchOutcome::default();
        let mut offset_id: Option<i64> = None;
        let mut page_count = 0usize;

        while outcome.messages.len() < max_messages {
            page_count += 1;
            if page_count > MAX_PAGES {
                outcome.error = Some(ScraperError::PaginationLimit {
                    channel: channel.to_owned(),
                    max_pages: MAX_PAGES,
                });
                break;
            }

            if page_count > 1 && inter_request_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(inter_request_delay_ms)).await;
            }

            let remaining = max_messages - outcome.messages.len();
            let limit = u32::try_from(remaining).unwrap_or(u32::MAX).min(page_size);

            let page = match self.fetch_messages_page(channel, limit, offset_id).await {
                Ok(page) => page,
                Err(e) => {
                    outcome.error = Some(e);
                    break;
                }
            };

            let page_len = page.messages.len();
            outcome
                .messages
                .extend(page.messages.into_iter().take(remaining));

            match page.next_offset_id {
                // A cursor that does not move backwards would loop forever.
                Some(next) if page_len > 0 && offset_id.is_none_or(|prev| next < prev) => {
                    offset_id = Some(next);
                }
                _ => break,
            }
        }

        tracing::debug!(
            channel,
            fetched = outcome.messages.len(),
            pages = page_count,
            failed = outcome.error.is_some(),
            "channel fetch finished"
        );

        outcome
    }
}
