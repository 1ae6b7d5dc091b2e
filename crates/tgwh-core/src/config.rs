use std::path::PathBuf;

use chrono::FixedOffset;

use crate::app_config::{AppConfig, BackoffKind, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
#[allow(clippy::too_many_lines)]
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let database_url = require("DATABASE_URL")?;

    let env = parse_environment(&or_default("TGWH_ENV", "development"))?;
    let log_level = or_default("TGWH_LOG_LEVEL", "info");
    let data_root = PathBuf::from(or_default("TGWH_DATA_ROOT", "data/raw"));
    let channels_path = PathBuf::from(or_default("TGWH_CHANNELS_PATH", "./config/channels.yaml"));
    let feed_url = or_default("TGWH_FEED_URL", "http://localhost:8081");
    let feed_token = lookup("TGWH_FEED_TOKEN").ok();

    let db_max_connections = parse_u32("TGWH_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("TGWH_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("TGWH_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let scraper_request_timeout_secs = parse_u64("TGWH_SCRAPER_REQUEST_TIMEOUT_SECS", "30")?;
    let scraper_user_agent = or_default("TGWH_SCRAPER_USER_AGENT", "tgwh/0.1 (channel-ingest)");
    let scraper_max_messages = parse_usize("TGWH_SCRAPER_MAX_MESSAGES", "1000")?;
    let scraper_page_size = parse_u32("TGWH_SCRAPER_PAGE_SIZE", "100")?;
    if scraper_page_size == 0 {
        return Err(invalid(
            "TGWH_SCRAPER_PAGE_SIZE",
            "must be at least 1".to_string(),
        ));
    }
    let scraper_max_concurrent_channels =
        parse_usize("TGWH_SCRAPER_MAX_CONCURRENT_CHANNELS", "1")?;
    let scraper_inter_request_delay_ms = parse_u64("TGWH_SCRAPER_INTER_REQUEST_DELAY_MS", "250")?;
    let scraper_max_retries = parse_u32("TGWH_SCRAPER_MAX_RETRIES", "3")?;
    let scraper_retry_backoff_base_secs = parse_u64("TGWH_SCRAPER_RETRY_BACKOFF_BASE_SECS", "5")?;

    let stage_max_attempts = parse_u32("TGWH_STAGE_MAX_ATTEMPTS", "3")?;
    if stage_max_attempts == 0 {
        return Err(invalid(
            "TGWH_STAGE_MAX_ATTEMPTS",
            "must be at least 1".to_string(),
        ));
    }
    let stage_backoff = parse_backoff(&or_default("TGWH_STAGE_BACKOFF", "exponential"))?;
    let stage_backoff_base_secs = parse_u64("TGWH_STAGE_BACKOFF_BASE_SECS", "30")?;
    let stage_backoff_max_secs = parse_u64("TGWH_STAGE_BACKOFF_MAX_SECS", "600")?;
    let stage_timeout_secs = parse_u64("TGWH_STAGE_TIMEOUT_SECS", "3600")?;

    let transform_command = or_default("TGWH_TRANSFORM_COMMAND", "dbt run");
    if transform_command.split_whitespace().next().is_none() {
        return Err(invalid(
            "TGWH_TRANSFORM_COMMAND",
            "must not be empty".to_string(),
        ));
    }
    let transform_dir = PathBuf::from(or_default("TGWH_TRANSFORM_DIR", "medical_warehouse"));
    let classifier_command = lookup("TGWH_CLASSIFIER_COMMAND")
        .ok()
        .filter(|c| !c.trim().is_empty());
    let detections_csv = PathBuf::from(or_default(
        "TGWH_DETECTIONS_CSV",
        "data/processed/yolo_detections.csv",
    ));

    let schedule_cron = or_default("TGWH_SCHEDULE_CRON", "0 0 2 * * *");
    let schedule_utc_offset = parse_utc_offset(&or_default("TGWH_SCHEDULE_UTC_OFFSET", "+03:00"))?;

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        data_root,
        channels_path,
        feed_url,
        feed_token,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        scraper_request_timeout_secs,
        scraper_user_agent,
        scraper_max_messages,
        scraper_page_size,
        scraper_max_concurrent_channels,
        scraper_inter_request_delay_ms,
        scraper_max_retries,
        scraper_retry_backoff_base_secs,
        stage_max_attempts,
        stage_backoff,
        stage_backoff_base_secs,
        stage_backoff_max_secs,
        stage_timeout_secs,
        transform_command,
        transform_dir,
        classifier_command,
        detections_csv,
        schedule_cron,
        schedule_utc_offset,
    })
}

fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "TGWH_ENV".to_string(),
            reason: format!("expected development, test, or production; got '{other}'"),
        }),
    }
}

fn parse_backoff(s: &str) -> Result<BackoffKind, ConfigError> {
    match s.to_ascii_lowercase().as_str() {
        "fixed" => Ok(BackoffKind::Fixed),
        "exponential" => Ok(BackoffKind::Exponential),
        other => Err(ConfigError::InvalidEnvVar {
            var: "TGWH_STAGE_BACKOFF".to_string(),
            reason: format!("expected fixed or exponential; got '{other}'"),
        }),
    }
}

/// Real-world offsets stay within ±14 hours.
const MAX_UTC_OFFSET_SECS: i32 = 14 * 3600;

/// Parse a `±HH:MM` offset such as `+03:00` or `-05:30`.
fn parse_utc_offset(s: &str) -> Result<FixedOffset, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidEnvVar {
        var: "TGWH_SCHEDULE_UTC_OFFSET".to_string(),
        reason: format!("'{s}': {reason}"),
    };

    let offset = s
        .trim()
        .parse::<FixedOffset>()
        .map_err(|e| invalid(format!("expected ±HH:MM ({e})")))?;
    if offset.local_minus_utc().abs() > MAX_UTC_OFFSET_SECS {
        return Err(invalid("offset out of range".to_string()));
    }
    Ok(offset)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
