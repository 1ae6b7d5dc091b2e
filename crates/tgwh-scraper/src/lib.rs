pub mod channel;
pub mod client;
pub mod error;
pub mod feed;
pub(crate) mod rate_limit;
pub mod types;

pub use channel::{scrape_channel, scrape_channels, ChannelOutcome, ScrapeSettings};
pub use client::FeedClient;
pub use error::ScraperError;
pub use feed::MessageFeed;
pub use types::{FeedMedia, FeedMessage, FeedPage, FetchOutcome};
