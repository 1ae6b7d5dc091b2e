use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("rate limited on channel '{channel}' (retry after {retry_after_secs}s)")]
    RateLimited {
        channel: String,
        retry_after_secs: u64,
    },

    #[error("access denied to channel '{channel}' (HTTP {status})")]
    AccessDenied { channel: String, status: u16 },

    #[error("unknown channel '{channel}'")]
    UnknownChannel { channel: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("pagination limit reached for '{channel}': exceeded {max_pages} pages")]
    PaginationLimit { channel: String, max_pages: usize },

    #[error("invalid feed URL \"{url}\": {reason}")]
    InvalidFeedUrl { url: String, reason: String },

    #[error("failed to save image {path}: {source}")]
    ImageWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Landing(#[from] tgwh_lake::LakeError),

    #[error("landing task for channel '{channel}' did not complete: {message}")]
    LandingTask { channel: String, message: String },

    #[error(transparent)]
    Config(#[from] tgwh_core::ConfigError),
}
