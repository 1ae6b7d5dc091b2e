use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Config(#[from] tgwh_core::ConfigError),

    #[error(transparent)]
    Scraper(#[from] tgwh_scraper::ScraperError),

    #[error("all {0} channels failed to scrape")]
    AllChannelsFailed(usize),

    #[error(transparent)]
    Load(#[from] tgwh_loader::LoadError),

    #[error("command `{command}` failed: {reason}")]
    Command { command: String, reason: String },

    #[error("attempt timed out after {0:?}")]
    TimedOut(Duration),

    #[error("run cancelled")]
    Cancelled,
}

impl StageError {
    /// Everything except cancellation is worth another attempt.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        !matches!(self, StageError::Cancelled)
    }
}
