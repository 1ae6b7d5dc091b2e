//! Per-channel scraping: fetch, download photos, land one batch.

use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use tgwh_core::{AppConfig, MessageRecord};
use tgwh_lake::{LakeLayout, LandingWriter, WrittenBatch};

use crate::{FeedMessage, MessageFeed, ScraperError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrapeSettings {
    pub max_messages: usize,
    pub page_size: u32,
    pub max_concurrent_channels: usize,
    pub inter_request_delay_ms: u64,
}

impl ScrapeSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_messages: config.scraper_max_messages,
            page_size: config.scraper_page_size,
            max_concurrent_channels: config.scraper_max_concurrent_channels,
            inter_request_delay_ms: config.scraper_inter_request_delay_ms,
        }
    }
}

/// What happened to one channel in a scrape.
#[derive(Debug)]
pub struct ChannelOutcome {
    pub channel: String,
    /// The landed batch, if one was written.
    pub batch: Option<WrittenBatch>,
    pub messages_fetched: usize,
    pub images_downloaded: usize,
    pub image_failures: usize,
    /// Messages dropped because they failed record validation.
    pub dropped: usize,
    /// Set when fetching stopped early or landing failed. A batch may still
    /// have been written from the messages collected before the failure.
    pub error: Option<ScraperError>,
}

impl ChannelOutcome {
    fn new(channel: &str) -> Self {
        Self {
            channel: channel.to_owned(),
            batch: None,
            messages_fetched: 0,
            images_downloaded: 0,
            image_failures: 0,
            dropped: 0,
            error: None,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    #[must_use]
    pub fn records_written(&self) -> usize {
        self.batch.as_ref().map_or(0, |b| b.record_count)
    }
}

/// Scrape one channel and land its batch for `day`.
///
/// Never returns an error: failures are recorded on the outcome. If the fetch
/// fails part-way, whatever was collected is still landed; if nothing was
/// collected, no batch is written. A channel with no messages lands an empty
/// batch. A photo that fails to download leaves `image_path` unset.
pub async fn scrape_channel<F>(
    feed: &F,
    writer: &LandingWriter,
    channel: &str,
    day: NaiveDate,
    settings: &ScrapeSettings,
) -> ChannelOutcome
where
    F: MessageFeed + ?Sized,
{
    let mut outcome = ChannelOutcome::new(channel);
    let fetched = feed.fetch_recent(channel, settings).await;
    outcome.messages_fetched = fetched.messages.len();

    if let Some(e) = &fetched.error {
        tracing::warn!(
            channel,
            fetched = outcome.messages_fetched,
            error = %e,
            "channel fetch failed"
        );
    }
    if fetched.error.is_some() && fetched.messages.is_empty() {
        outcome.error = fetched.error;
        return outcome;
    }

    let mut records = Vec::with_capacity(fetched.messages.len());
    for message in &fetched.messages {
        let mut record = to_record(channel, message);
        if let Err(e) = record.validate() {
            tracing::warn!(channel, message_id = message.id, error = %e, "dropping invalid message");
            outcome.dropped += 1;
            continue;
        }

        if let Some(media) = message.media.as_ref().filter(|m| m.is_photo()) {
            match media.download_url.as_deref() {
                Some(url) => {
                    match save_photo(feed, writer.layout(), channel, message.id, url).await {
                        Ok(path) => {
                            record.image_path = Some(path);
                            outcome.images_downloaded += 1;
                        }
                        Err(e) => {
                            tracing::warn!(
                                channel,
                                message_id = message.id,
                                error = %e,
                                "photo download failed"
                            );
                            outcome.image_failures += 1;
                        }
                    }
                }
                None => {
                    tracing::warn!(channel, message_id = message.id, "photo has no download URL");
                    outcome.image_failures += 1;
                }
            }
        }

        records.push(record);
    }

    match land_batch(writer, channel, day, records).await {
        Ok(batch) => outcome.batch = Some(batch),
        Err(e) => {
            tracing::error!(channel, error = %e, "failed to land batch");
            outcome.error = Some(e);
            return outcome;
        }
    }

    outcome.error = fetched.error;
    outcome
}

/// Landing writes and fsyncs the batch file, so it runs on the blocking pool.
async fn land_batch(
    writer: &LandingWriter,
    channel: &str,
    day: NaiveDate,
    records: Vec<MessageRecord>,
) -> Result<WrittenBatch, ScraperError> {
    let writer = writer.clone();
    let owned_channel = channel.to_owned();
    tokio::task::spawn_blocking(move || writer.write(&owned_channel, day, &records))
        .await
        .map_err(|e| ScraperError::LandingTask {
            channel: channel.to_owned(),
            message: e.to_string(),
        })?
        .map_err(ScraperError::from)
}

/// Scrape every channel, up to `settings.max_concurrent_channels` at a time.
///
/// One channel failing never stops the others. Outcomes are returned in the
/// order of `channels`.
pub async fn scrape_channels<F>(
    feed: &F,
    writer: &LandingWriter,
    channels: &[String],
    day: NaiveDate,
    settings: &ScrapeSettings,
) -> Vec<ChannelOutcome>
where
    F: MessageFeed + ?Sized,
{
    let max_concurrent = settings.max_concurrent_channels.max(1);

    let pending: Vec<_> = channels
        .iter()
        .map(|channel| scrape_channel(feed, writer, channel, day, settings))
        .collect();
    let outcomes: Vec<ChannelOutcome> = stream::iter(pending)
        .buffered(max_concurrent)
        .collect()
        .await;

    let failed = outcomes.iter().filter(|o| !o.is_success()).count();
    let written: usize = outcomes.iter().map(ChannelOutcome::records_written).sum();
    if failed > 0 {
        tracing::warn!(
            failed_channels = failed,
            total_channels = channels.len(),
            "some channels failed during scrape"
        );
    }
    tracing::info!(
        channels = channels.len(),
        records = written,
        %day,
        "scrape finished"
    );

    outcomes
}

fn to_record(channel: &str, message: &FeedMessage) -> MessageRecord {
    MessageRecord {
        message_id: message.id,
        channel_name: channel.to_owned(),
        message_timestamp: message.date,
        message_text: message.text.clone(),
        view_count: message.views,
        forward_count: message.forwards,
        has_media: message.media.is_some(),
        image_path: None,
    }
}

async fn save_photo<F>(
    feed: &F,
    layout: &LakeLayout,
    channel: &str,
    message_id: i64,
    download_url: &str,
) -> Result<String, ScraperError>
where
    F: MessageFeed + ?Sized,
{
    let path = layout.image_path(channel, message_id);
    let display = path.display().to_string();

    // Images are keyed by message id, so one already on disk is the same image.
    if tokio::fs::try_exists(&path).await.unwrap_or(false) {
        return Ok(display);
    }

    let bytes = feed.download(download_url).await?;
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| ScraperError::ImageWrite {
                path: display.clone(),
                source,
            })?;
    }
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|source| ScraperError::ImageWrite {
            path: display.clone(),
            source,
        })?;

    Ok(display)
}

#[cfg(test)]
#[path = "channel_test.rs"]
mod tests;
