//! The four concrete stages and the default pipeline built from them.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{FixedOffset, NaiveDate, Utc};
use sqlx::PgPool;
use tgwh_core::AppConfig;
use tgwh_lake::{LakeLayout, LandingWriter};
use tgwh_scraper::{scrape_channels, ChannelOutcome, FeedClient, MessageFeed, ScrapeSettings};

use crate::command::run_command;
use crate::{Orchestrator, RetryPolicy, Stage, StageError, StageName, StageReport};

/// Scrapes every configured channel into today's lake partition.
pub struct ScrapeStage {
    feed: Arc<dyn MessageFeed>,
    writer: LandingWriter,
    channels: Vec<String>,
    settings: ScrapeSettings,
    /// Offset used to decide which calendar day a run lands under.
    offset: FixedOffset,
}

impl ScrapeStage {
    #[must_use]
    pub fn new(
        feed: Arc<dyn MessageFeed>,
        writer: LandingWriter,
        channels: Vec<String>,
        settings: ScrapeSettings,
        offset: FixedOffset,
    ) -> Self {
        Self {
            feed,
            writer,
            channels,
            settings,
            offset,
        }
    }

    fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.offset).date_naive()
    }
}

#[async_trait]
impl Stage for ScrapeStage {
    fn name(&self) -> StageName {
        StageName::Scrape
    }

    async fn run(&self) -> Result<StageReport, StageError> {
        let day = self.today();
        let outcomes = scrape_channels(
            self.feed.as_ref(),
            &self.writer,
            &self.channels,
            day,
            &self.settings,
        )
        .await;

        let failed = outcomes.iter().filter(|o| !o.is_success()).count();
        let landed = outcomes.iter().filter(|o| o.batch.is_some()).count();
        if !outcomes.is_empty() && failed == outcomes.len() && landed == 0 {
            return Err(StageError::AllChannelsFailed(outcomes.len()));
        }

        let records: usize = outcomes.iter().map(ChannelOutcome::records_written).sum();
        let images: usize = outcomes.iter().map(|o| o.images_downloaded).sum();
        Ok(StageReport::new(format!(
            "{day}: {landed}/{} channels landed, {records} records, {images} images, {failed} channel errors",
            outcomes.len()
        )))
    }
}

/// Loads every landed batch into `raw.telegram_messages`.
pub struct LoadRawStage {
    pool: PgPool,
    message_root: PathBuf,
}

impl LoadRawStage {
    #[must_use]
    pub fn new(pool: PgPool, message_root: PathBuf) -> Self {
        Self { pool, message_root }
    }
}

#[async_trait]
impl Stage for LoadRawStage {
    fn name(&self) -> StageName {
        StageName::LoadRaw
    }

    async fn run(&self) -> Result<StageReport, StageError> {
        let summary = tgwh_loader::load_all(&self.pool, &self.message_root).await?;
        Ok(StageReport::new(format!(
            "{} batches ({} skipped), {} rows inserted, {} already present, {} invalid",
            summary.batches_found,
            summary.batches_skipped,
            summary.rows_inserted,
            summary.rows_already_present,
            summary.rows_invalid
        )))
    }
}

/// Runs the external warehouse transformation.
pub struct TransformStage {
    command: String,
    dir: PathBuf,
}

impl TransformStage {
    #[must_use]
    pub fn new(command: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            dir: dir.into(),
        }
    }
}

#[async_trait]
impl Stage for TransformStage {
    fn name(&self) -> StageName {
        StageName::Transform
    }

    async fn run(&self) -> Result<StageReport, StageError> {
        run_command(&self.command, Some(&self.dir)).await?;
        Ok(StageReport::new(format!("`{}` completed", self.command)))
    }
}

/// Optionally runs the image classifier, then loads its CSV output.
pub struct EnrichLoadStage {
    pool: PgPool,
    classifier_command: Option<String>,
    detections_csv: PathBuf,
}

impl EnrichLoadStage {
    #[must_use]
    pub fn new(pool: PgPool, classifier_command: Option<String>, detections_csv: PathBuf) -> Self {
        Self {
            pool,
            classifier_command,
            detections_csv,
        }
    }
}

#[async_trait]
impl Stage for EnrichLoadStage {
    fn name(&self) -> StageName {
        StageName::EnrichLoad
    }

    async fn run(&self) -> Result<StageReport, StageError> {
        if let Some(command) = &self.classifier_command {
            run_command(command, None).await?;
        }

        if !self.detections_csv.exists() {
            tracing::warn!(
                path = %self.detections_csv.display(),
                "detections file not found, nothing to enrich"
            );
            return Ok(StageReport::new("no detections file"));
        }

        let file = tgwh_loader::read_detections_csv(&self.detections_csv)?;
        for (line, reason) in &file.invalid {
            tracing::warn!(line, reason = %reason, "skipping unreadable detection row");
        }
        let summary = tgwh_loader::load_detections(&self.pool, &file.rows).await?;
        Ok(StageReport::new(format!(
            "{} detections inserted, {} already present, {} failed, {} unreadable",
            summary.inserted,
            summary.already_present,
            summary.failed,
            file.invalid.len()
        )))
    }
}

/// The standard four-stage pipeline wired from configuration.
///
/// # Errors
///
/// Returns [`StageError::Scraper`] if the feed client cannot be built, which
/// includes a missing feed token.
pub fn build_pipeline(
    config: &AppConfig,
    pool: PgPool,
    channels: Vec<String>,
) -> Result<Orchestrator, StageError> {
    let feed: Arc<dyn MessageFeed> = Arc::new(FeedClient::from_app_config(config)?);
    let layout = LakeLayout::new(config.message_root(), config.image_root());

    Ok(Orchestrator::new(RetryPolicy::from_app_config(config))
        .with_stage(Box::new(ScrapeStage::new(
            feed,
            LandingWriter::new(layout),
            channels,
            ScrapeSettings::from_app_config(config),
            config.schedule_utc_offset,
        )))
        .with_stage(Box::new(LoadRawStage::new(
            pool.clone(),
            config.message_root(),
        )))
        .with_stage(Box::new(TransformStage::new(
            config.transform_command.clone(),
            config.transform_dir.clone(),
        )))
        .with_stage(Box::new(EnrichLoadStage::new(
            pool,
            config.classifier_command.clone(),
            config.detections_csv.clone(),
        ))))
}
