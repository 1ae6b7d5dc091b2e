use std::path::PathBuf;

use chrono::FixedOffset;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// How the delay between stage retry attempts grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffKind {
    /// Every retry waits `base`.
    Fixed,
    /// Retry `n` waits `base * 2^(n-1)`, capped.
    Exponential,
}

impl std::fmt::Display for BackoffKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackoffKind::Fixed => write!(f, "fixed"),
            BackoffKind::Exponential => write!(f, "exponential"),
        }
    }
}

/// Immutable process configuration, built once at startup and passed down.
#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub log_level: String,
    pub data_root: PathBuf,
    pub channels_path: PathBuf,
    pub feed_url: String,
    pub feed_token: Option<String>,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub scraper_request_timeout_secs: u64,
    pub scraper_user_agent: String,
    pub scraper_max_messages: usize,
    pub scraper_page_size: u32,
    pub scraper_max_concurrent_channels: usize,
    pub scraper_inter_request_delay_ms: u64,
    pub scraper_max_retries: u32,
    pub scraper_retry_backoff_base_secs: u64,
    pub stage_max_attempts: u32,
    pub stage_backoff: BackoffKind,
    pub stage_backoff_base_secs: u64,
    pub stage_backoff_max_secs: u64,
    pub stage_timeout_secs: u64,
    pub transform_command: String,
    pub transform_dir: PathBuf,
    pub classifier_command: Option<String>,
    pub detections_csv: PathBuf,
    pub schedule_cron: String,
    pub schedule_utc_offset: FixedOffset,
}

impl AppConfig {
    /// Root of the landed message batches: `{data_root}/telegram_messages`.
    #[must_use]
    pub fn message_root(&self) -> PathBuf {
        self.data_root.join("telegram_messages")
    }

    /// Root of downloaded channel images: `{data_root}/images`.
    #[must_use]
    pub fn image_root(&self) -> PathBuf {
        self.data_root.join("images")
    }

    /// Returns the feed gateway token, failing when it was not configured.
    ///
    /// Commands that scrape call this before any work starts so a missing
    /// credential aborts the run up front.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ConfigError::MissingEnvVar`] when `TGWH_FEED_TOKEN` is unset
    /// or blank.
    pub fn require_feed_token(&self) -> Result<&str, crate::ConfigError> {
        match self.feed_token.as_deref() {
            Some(token) if !token.trim().is_empty() => Ok(token),
            _ => Err(crate::ConfigError::MissingEnvVar(
                "TGWH_FEED_TOKEN".to_string(),
            )),
        }
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("data_root", &self.data_root)
            .field("channels_path", &self.channels_path)
            .field("database_url", &"[redacted]")
            .field("feed_url", &self.feed_url)
            .field("feed_token", &self.feed_token.as_ref().map(|_| "[redacted]"))
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field(
                "scraper_request_timeout_secs",
                &self.scraper_request_timeout_secs,
            )
            .field("scraper_user_agent", &self.scraper_user_agent)
            .field("scraper_max_messages", &self.scraper_max_messages)
            .field("scraper_page_size", &self.scraper_page_size)
            .field(
                "scraper_max_concurrent_channels",
                &self.scraper_max_concurrent_channels,
            )
            .field(
                "scraper_inter_request_delay_ms",
                &self.scraper_inter_request_delay_ms,
            )
            .field("scraper_max_retries", &self.scraper_max_retries)
            .field(
                "scraper_retry_backoff_base_secs",
                &self.scraper_retry_backoff_base_secs,
            )
            .field("stage_max_attempts", &self.stage_max_attempts)
            .field("stage_backoff", &self.stage_backoff)
            .field("stage_backoff_base_secs", &self.stage_backoff_base_secs)
            .field("stage_backoff_max_secs", &self.stage_backoff_max_secs)
            .field("stage_timeout_secs", &self.stage_timeout_secs)
            .field("transform_command", &self.transform_command)
            .field("transform_dir", &self.transform_dir)
            .field("classifier_command", &self.classifier_command)
            .field("detections_csv", &self.detections_csv)
            .field("schedule_cron", &self.schedule_cron)
            .field("schedule_utc_offset", &self.schedule_utc_offset)
            .finish()
    }
}
