pub mod app_config;
pub mod channels;
pub mod config;
pub mod detection;
pub mod message;

pub use app_config::{AppConfig, BackoffKind, Environment};
pub use channels::{load_channels, ChannelConfig, ChannelsFile};
pub use config::{load_app_config, load_app_config_from_env};
pub use detection::{classify_labels, DetectionRow, ImageCategory};
pub use message::MessageRecord;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read channels file {path}: {source}")]
    ChannelsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse channels file: {0}")]
    ChannelsFileParse(#[from] serde_yaml::Error),

    #[error("channel config validation failed: {0}")]
    Validation(String),
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid message {channel}/{message_id}: {reason}")]
    InvalidMessage {
        channel: String,
        message_id: i64,
        reason: String,
    },

    #[error("invalid detection for image '{image_name}': {reason}")]
    InvalidDetection { image_name: String, reason: String },

    #[error("unknown image category: {0}")]
    UnknownCategory(String),
}
