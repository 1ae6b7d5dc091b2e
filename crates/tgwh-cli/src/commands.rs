//! Handlers for the one-shot subcommands.

use std::path::Path;
use std::sync::Arc;

use sqlx::PgPool;
use tgwh_core::AppConfig;
use tgwh_lake::{LakeLayout, LandingWriter};
use tgwh_pipeline::{RunReport, RunState, ScrapeStage, Stage, StageName, StageOutcome};
use tgwh_scraper::{FeedClient, ScrapeSettings};
use tokio_util::sync::CancellationToken;

/// Load channel names from the configured channels file, optionally narrowed
/// to a single configured channel.
pub(crate) fn channels_for_run(
    config: &AppConfig,
    filter: Option<&str>,
) -> anyhow::Result<Vec<String>> {
    let names = tgwh_core::load_channels(&config.channels_path)?.names();
    match filter {
        Some(name) => {
            if !names.iter().any(|n| n == name) {
                anyhow::bail!(
                    "channel '{name}' is not in {}",
                    config.channels_path.display()
                );
            }
            Ok(vec![name.to_owned()])
        }
        None => Ok(names),
    }
}

/// Run the pipeline once and print a per-stage summary.
///
/// # Errors
///
/// Returns an error if the pipeline cannot be built or the run did not
/// succeed.
pub(crate) async fn run_pipeline(
    config: &AppConfig,
    pool: PgPool,
    from_stage: Option<StageName>,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let channels = channels_for_run(config, None)?;
    let orchestrator = tgwh_pipeline::build_pipeline(config, pool, channels)?;
    let report = orchestrator.run_from(from_stage, cancel).await;
    print_report(&report);
    check_report(&report)
}

pub(crate) fn check_report(report: &RunReport) -> anyhow::Result<()> {
    match report.state {
        RunState::Succeeded => Ok(()),
        RunState::Failed { stage } => {
            anyhow::bail!("run {} failed at stage {stage}", report.run_id)
        }
        RunState::Cancelled { before } => {
            anyhow::bail!("run {} cancelled before stage {before}", report.run_id)
        }
    }
}

fn print_report(report: &RunReport) {
    println!("run {} ({:?})", report.run_id, report.state);
    for (stage, outcome) in &report.stages {
        match outcome {
            StageOutcome::Succeeded(r) => println!("  {stage:<12} ok        {}", r.detail),
            StageOutcome::Retried { attempts, report } => {
                println!("  {stage:<12} ok ({attempts} attempts) {}", report.detail);
            }
            StageOutcome::Failed { attempts, error } => {
                println!("  {stage:<12} FAILED after {attempts} attempts: {error}");
            }
            StageOutcome::NotRun => println!("  {stage:<12} not run"),
        }
    }
}

/// Scrape configured channels into today's lake partition.
///
/// # Errors
///
/// Returns an error if the channel is unknown, the feed token is missing, or
/// every channel failed.
pub(crate) async fn run_scrape(config: &AppConfig, channel: Option<&str>) -> anyhow::Result<()> {
    let channels = channels_for_run(config, channel)?;
    let feed = FeedClient::from_app_config(config)?;
    let stage = ScrapeStage::new(
        Arc::new(feed),
        LandingWriter::new(LakeLayout::new(config.message_root(), config.image_root())),
        channels,
        ScrapeSettings::from_app_config(config),
        config.schedule_utc_offset,
    );

    let report = stage.run().await?;
    println!("scrape complete: {}", report.detail);
    Ok(())
}

/// Load every landed batch into the raw store.
///
/// # Errors
///
/// Returns an error if the store is unavailable or migrations fail.
pub(crate) async fn run_load_raw(config: &AppConfig, pool: &PgPool) -> anyhow::Result<()> {
    let summary = tgwh_loader::load_all(pool, &config.message_root()).await?;
    println!(
        "loaded {} batches ({} skipped): {} rows inserted, {} already present, {} invalid",
        summary.batches_processed,
        summary.batches_skipped,
        summary.rows_inserted,
        summary.rows_already_present,
        summary.rows_invalid
    );
    Ok(())
}

/// Load a detections CSV into the raw store.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the store is unavailable.
pub(crate) async fn run_load_detections(pool: &PgPool, path: &Path) -> anyhow::Result<()> {
    tgwh_db::run_migrations(pool).await?;
    let file = tgwh_loader::read_detections_csv(path)?;
    for (line, reason) in &file.invalid {
        tracing::warn!(line, reason = %reason, "skipping unreadable detection row");
    }
    let summary = tgwh_loader::load_detections(pool, &file.rows).await?;
    println!(
        "detections: {} inserted, {} already present, {} failed, {} unreadable",
        summary.inserted,
        summary.already_present,
        summary.failed,
        file.invalid.len()
    );
    Ok(())
}
