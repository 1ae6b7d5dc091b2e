use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LakeError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to walk lake directory {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("malformed batch {path}: {source}")]
    MalformedBatch {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("batch {path} is not a JSON array")]
    NotAnArray { path: PathBuf },

    #[error("record {index} for channel '{channel}' rejected: {source}")]
    InvalidRecord {
        channel: String,
        index: usize,
        #[source]
        source: tgwh_core::CoreError,
    },

    #[error("record {index} belongs to channel '{found}', expected '{expected}'")]
    ChannelMismatch {
        expected: String,
        found: String,
        index: usize,
    },

    #[error("failed to encode batch for channel '{channel}': {source}")]
    Encode {
        channel: String,
        #[source]
        source: serde_json::Error,
    },
}

impl LakeError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
