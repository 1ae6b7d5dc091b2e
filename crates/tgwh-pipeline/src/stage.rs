use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;

use crate::StageError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StageName {
    Scrape,
    LoadRaw,
    Transform,
    EnrichLoad,
}

impl StageName {
    /// Execution order.
    pub const ALL: [StageName; 4] = [
        StageName::Scrape,
        StageName::LoadRaw,
        StageName::Transform,
        StageName::EnrichLoad,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StageName::Scrape => "SCRAPE",
            StageName::LoadRaw => "LOAD_RAW",
            StageName::Transform => "TRANSFORM",
            StageName::EnrichLoad => "ENRICH_LOAD",
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageName {
    type Err = String;

    /// Accepts `SCRAPE`, `load-raw`, `load_raw`, `Transform`, ...
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        StageName::ALL
            .into_iter()
            .find(|stage| stage.as_str() == normalized)
            .ok_or_else(|| {
                format!("unknown stage '{s}'; expected scrape, load-raw, transform, or enrich-load")
            })
    }
}

/// Free-form summary a stage hands back on success.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageReport {
    pub detail: String,
}

impl StageReport {
    #[must_use]
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Succeeded(StageReport),
    /// Succeeded after at least one failed attempt.
    Retried { attempts: u32, report: StageReport },
    Failed { attempts: u32, error: String },
    NotRun,
}

impl StageOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, StageOutcome::Succeeded(_) | StageOutcome::Retried { .. })
    }
}

/// One unit of pipeline work.
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> StageName;

    async fn run(&self) -> Result<StageReport, StageError>;
}
