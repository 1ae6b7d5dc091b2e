//! Stage sequencing for one ingestion run: SCRAPE → LOAD_RAW → TRANSFORM →
//! ENRICH_LOAD, with per-stage retry and fail-fast.

pub mod command;
pub mod error;
pub mod orchestrator;
pub mod retry;
pub mod stage;
pub mod stages;

pub use error::StageError;
pub use orchestrator::{Orchestrator, RunReport, RunState};
pub use retry::RetryPolicy;
pub use stage::{Stage, StageName, StageOutcome, StageReport};
pub use stages::{build_pipeline, EnrichLoadStage, LoadRawStage, ScrapeStage, TransformStage};
