use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tgwh_lake::{read_batch, LakeLayout};

use super::*;
use crate::{FeedMedia, FetchOutcome};

/// What the fake feed does for one channel.
enum Script {
    Messages(Vec<FeedMessage>),
    FailAfter(Vec<FeedMessage>),
}

#[derive(Default)]
struct FakeFeed {
    scripts: HashMap<String, Script>,
    broken_downloads: Vec<String>,
    attempted: Mutex<Vec<String>>,
    downloads: AtomicUsize,
}

impl FakeFeed {
    fn with(mut self, channel: &str, script: Script) -> Self {
        self.scripts.insert(channel.to_owned(), script);
        self
    }
}

#[async_trait]
impl MessageFeed for FakeFeed {
    async fn fetch_recent(&self, channel: &str, settings: &ScrapeSettings) -> FetchOutcome {
        self.attempted.lock().unwrap().push(channel.to_owned());
        match self.scripts.get(channel) {
            Some(Script::Messages(msgs)) => FetchOutcome {
                messages: msgs.iter().take(settings.max_messages).cloned().collect(),
                error: None,
            },
            Some(Script::FailAfter(msgs)) => FetchOutcome {
                messages: msgs.clone(),
                error: Some(ScraperError::UnexpectedStatus {
                    status: 500,
                    url: format!("http://feed/channels/{channel}/messages"),
                }),
            },
            None => FetchOutcome {
                messages: Vec::new(),
                error: Some(ScraperError::AccessDenied {
                    channel: channel.to_owned(),
                    status: 403,
                }),
            },
        }
    }

    async fn download(&self, download_url: &str) -> Result<Vec<u8>, ScraperError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        if self.broken_downloads.iter().any(|u| u == download_url) {
            return Err(ScraperError::UnexpectedStatus {
                status: 404,
                url: download_url.to_owned(),
            });
        }
        Ok(b"\xFF\xD8\xFFjpeg".to_vec())
    }
}

fn text(id: i64) -> FeedMessage {
    FeedMessage {
        id,
        date: None,
        text: Some(format!("post {id}")),
        views: Some(10),
        forwards: Some(1),
        media: None,
    }
}

fn photo(id: i64) -> FeedMessage {
    FeedMessage {
        media: Some(FeedMedia {
            kind: "photo".to_owned(),
            download_url: Some(format!("/media/{id}")),
        }),
        ..text(id)
    }
}

fn settings() -> ScrapeSettings {
    ScrapeSettings {
        max_messages: 1000,
        page_size: 100,
        max_concurrent_channels: 1,
        inter_request_delay_ms: 0,
    }
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

#[tokio::test]
async fn failing_channel_does_not_stop_the_others() {
    let dir = tempfile::tempdir().unwrap();
    let writer = LandingWriter::new(LakeLayout::under(dir.path()));
    let feed = FakeFeed::default()
        .with("chanA", Script::Messages(vec![text(2), text(1)]))
        .with("chanC", Script::Messages(vec![text(7)]));
    let channels = vec!["chanA".to_owned(), "chanB".to_owned(), "chanC".to_owned()];

    let outcomes = scrape_channels(&feed, &writer, &channels, day(), &settings()).await;

    assert_eq!(outcomes.len(), 3);
    assert!(outcomes[0].is_success());
    assert!(matches!(
        outcomes[1].error,
        Some(ScraperError::AccessDenied { .. })
    ));
    assert!(outcomes[1].batch.is_none());
    assert!(outcomes[2].is_success());
    assert_eq!(*feed.attempted.lock().unwrap(), channels);

    let a = read_batch(&writer.layout().batch_path(day(), "chanA")).unwrap();
    assert_eq!(a.records.len(), 2);
    assert!(a.invalid.is_empty());
    assert!(!writer.layout().batch_path(day(), "chanB").exists());
}

#[tokio::test]
async fn partial_fetch_lands_what_was_collected() {
    let dir = tempfile::tempdir().unwrap();
    let writer = LandingWriter::new(LakeLayout::under(dir.path()));
    let feed = FakeFeed::default().with("chanA", Script::FailAfter(vec![text(5), text(4)]));

    let outcome = scrape_channel(&feed, &writer, "chanA", day(), &settings()).await;

    assert!(!outcome.is_success());
    assert_eq!(outcome.records_written(), 2);
    let landed = read_batch(&writer.layout().batch_path(day(), "chanA")).unwrap();
    let ids: Vec<i64> = landed.records.iter().map(|r| r.message_id).collect();
    assert_eq!(ids, vec![5, 4]);
}

#[tokio::test]
async fn channel_with_no_messages_lands_empty_batch() {
    let dir = tempfile::tempdir().unwrap();
    let writer = LandingWriter::new(LakeLayout::under(dir.path()));
    let feed = FakeFeed::default().with("quiet", Script::Messages(Vec::new()));

    let outcome = scrape_channel(&feed, &writer, "quiet", day(), &settings()).await;

    assert!(outcome.is_success());
    let batch = outcome.batch.unwrap();
    assert_eq!(batch.record_count, 0);
    assert!(batch.path.exists());
}

#[tokio::test]
async fn photos_are_saved_and_failed_downloads_leave_path_unset() {
    let dir = tempfile::tempdir().unwrap();
    let writer = LandingWriter::new(LakeLayout::under(dir.path()));
    let mut feed = FakeFeed::default().with(
        "chanA",
        Script::Messages(vec![photo(3), photo(2), text(1)]),
    );
    feed.broken_downloads.push("/media/2".to_owned());

    let outcome = scrape_channel(&feed, &writer, "chanA", day(), &settings()).await;

    assert!(outcome.is_success());
    assert_eq!(outcome.images_downloaded, 1);
    assert_eq!(outcome.image_failures, 1);

    let landed = read_batch(&writer.layout().batch_path(day(), "chanA")).unwrap();
    let saved = writer.layout().image_path("chanA", 3);
    assert!(saved.exists());
    assert_eq!(
        landed.records[0].image_path.as_deref(),
        Some(saved.display().to_string().as_str())
    );
    assert!(landed.records[1].has_media);
    assert!(landed.records[1].image_path.is_none());
    assert!(!landed.records[2].has_media);
}

#[tokio::test]
async fn existing_image_is_not_downloaded_again() {
    let dir = tempfile::tempdir().unwrap();
    let writer = LandingWriter::new(LakeLayout::under(dir.path()));
    let feed = FakeFeed::default().with("chanA", Script::Messages(vec![photo(3)]));

    scrape_channel(&feed, &writer, "chanA", day(), &settings()).await;
    scrape_channel(&feed, &writer, "chanA", day(), &settings()).await;

    assert_eq!(feed.downloads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn invalid_messages_are_dropped_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let writer = LandingWriter::new(LakeLayout::under(dir.path()));
    let mut bad = text(9);
    bad.views = Some(-3);
    let feed = FakeFeed::default().with("chanA", Script::Messages(vec![bad, text(8)]));

    let outcome = scrape_channel(&feed, &writer, "chanA", day(), &settings()).await;

    assert!(outcome.is_success());
    assert_eq!(outcome.dropped, 1);
    assert_eq!(outcome.records_written(), 1);
}

#[tokio::test]
async fn concurrent_scrape_keeps_channel_order() {
    let dir = tempfile::tempdir().unwrap();
    let writer = LandingWriter::new(LakeLayout::under(dir.path()));
    let feed = FakeFeed::default()
        .with("a", Script::Messages(vec![text(1)]))
        .with("b", Script::Messages(vec![text(2)]))
        .with("c", Script::Messages(vec![text(3)]));
    let channels = vec!["a".to_owned(), "b".to_owned(), "c".to_owned()];
    let settings = ScrapeSettings {
        max_concurrent_channels: 3,
        ..settings()
    };

    let outcomes = scrape_channels(&feed, &writer, &channels, day(), &settings).await;

    let names: Vec<&str> = outcomes.iter().map(|o| o.channel.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
    assert!(outcomes.iter().all(ChannelOutcome::is_success));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn channels_land_concurrently_on_a_multi_thread_runtime() {
    let dir = tempfile::tempdir().unwrap();
    let writer = LandingWriter::new(LakeLayout::under(dir.path()));
    let feed = FakeFeed::default()
        .with("a", Script::Messages(vec![text(2), text(1)]))
        .with("b", Script::Messages(vec![text(2)]));
    let channels = vec!["a".to_owned(), "b".to_owned()];
    let settings = ScrapeSettings {
        max_concurrent_channels: 2,
        ..settings()
    };

    let outcomes = scrape_channels(&feed, &writer, &channels, day(), &settings).await;

    assert!(outcomes.iter().all(ChannelOutcome::is_success));
    let b = read_batch(&writer.layout().batch_path(day(), "b")).unwrap();
    assert_eq!(b.records.len(), 1);
}

#[tokio::test]
async fn landing_failure_is_reported_for_that_channel() {
    let dir = tempfile::tempdir().unwrap();
    let blocked = dir.path().join("telegram_messages");
    std::fs::write(&blocked, "not a directory").unwrap();
    let writer = LandingWriter::new(LakeLayout::new(blocked, dir.path().join("images")));
    let feed = FakeFeed::default().with("a", Script::Messages(vec![text(1)]));

    let outcome = scrape_channel(&feed, &writer, "a", day(), &settings()).await;

    assert!(outcome.batch.is_none());
    assert!(matches!(outcome.error, Some(ScraperError::Landing(_))));
}
