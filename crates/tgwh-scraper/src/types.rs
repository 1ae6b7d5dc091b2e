//! Wire types for the message feed gateway.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::ScraperError;

/// One page of `GET /channels/{channel}/messages`, newest message first.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedPage {
    pub messages: Vec<FeedMessage>,
    /// Pass back as `offset_id` to fetch the next (older) page. `None` when
    /// the channel history is exhausted.
    #[serde(default)]
    pub next_offset_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedMessage {
    pub id: i64,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub views: Option<i64>,
    #[serde(default)]
    pub forwards: Option<i64>,
    #[serde(default)]
    pub media: Option<FeedMedia>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedMedia {
    /// `photo`, `document`, `video`, ...
    pub kind: String,
    #[serde(default)]
    pub download_url: Option<String>,
}

impl FeedMedia {
    #[must_use]
    pub fn is_photo(&self) -> bool {
        self.kind.eq_ignore_ascii_case("photo")
    }
}

/// Messages collected for one channel, plus the error that stopped
/// collection early, if any.
///
/// A non-`None` `error` with non-empty `messages` is a partial fetch.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub messages: Vec<FeedMessage>,
    pub error: Option<ScraperError>,
}
