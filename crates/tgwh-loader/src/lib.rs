//! Loads landed batches and classifier output into the raw store.

pub mod detections_csv;
pub mod enrich;
pub mod raw;

pub use detections_csv::{read_detections_csv, DetectionsFile};
pub use enrich::{load_detections, EnrichSummary};
pub use raw::{load_all, LoadSummary};

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    /// The store could not be reached or a transaction could not complete.
    /// Fatal for the stage.
    #[error("raw store unavailable: {0}")]
    StoreUnavailable(#[from] sqlx::Error),

    #[error("schema migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Lake(#[from] tgwh_lake::LakeError),

    #[error("failed to read detections file {path}: {source}")]
    DetectionsFile {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}
