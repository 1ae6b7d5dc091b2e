//! Recurring pipeline trigger.
//!
//! One cron job at a fixed UTC offset. A trigger that fires while the previous
//! run is still going is skipped, not queued.

use std::sync::Arc;

use chrono::FixedOffset;
use sqlx::PgPool;
use tgwh_core::AppConfig;
use tgwh_pipeline::{Orchestrator, RunReport};
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use tokio_util::sync::CancellationToken;

use crate::commands;

/// Start the scheduler and block until `cancel` fires.
///
/// The pipeline is built once up front so a missing feed token or unreadable
/// channels file fails here rather than at the first trigger. On shutdown the
/// scheduler stops and any in-flight run is awaited; the orchestrator itself
/// stops at the next stage boundary.
///
/// # Errors
///
/// Returns an error if the pipeline cannot be built or the scheduler cannot
/// start.
pub(crate) async fn run_scheduled(
    config: Arc<AppConfig>,
    pool: PgPool,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let channels = commands::channels_for_run(&config, None)?;
    let orchestrator = Arc::new(tgwh_pipeline::build_pipeline(&config, pool, channels)?);
    let running = Arc::new(Mutex::new(()));

    let mut scheduler = JobScheduler::new().await?;
    let job = build_run_job(
        &config.schedule_cron,
        config.schedule_utc_offset,
        Arc::clone(&orchestrator),
        Arc::clone(&running),
        cancel.clone(),
    )?;
    scheduler.add(job).await?;
    scheduler.start().await?;
    tracing::info!(
        cron = %config.schedule_cron,
        utc_offset = %config.schedule_utc_offset,
        "scheduler: pipeline job registered"
    );

    cancel.cancelled().await;
    scheduler.shutdown().await?;
    let _idle = running.lock().await;
    tracing::info!("scheduler: stopped");
    Ok(())
}

fn build_run_job(
    cron: &str,
    offset: FixedOffset,
    orchestrator: Arc<Orchestrator>,
    running: Arc<Mutex<()>>,
    cancel: CancellationToken,
) -> Result<Job, JobSchedulerError> {
    Job::new_async_tz(cron, offset, move |_uuid, _lock| {
        let orchestrator = Arc::clone(&orchestrator);
        let running = Arc::clone(&running);
        let cancel = cancel.clone();

        Box::pin(async move {
            tracing::info!("scheduler: pipeline trigger fired");
            if let Some(report) = run_if_idle(&running, &orchestrator, &cancel).await {
                if let Err(e) = commands::check_report(&report) {
                    tracing::error!(error = %e, "scheduler: scheduled run did not succeed");
                }
            }
        })
    })
}

/// Run the pipeline unless a previous run still holds `running`.
pub(crate) async fn run_if_idle(
    running: &Mutex<()>,
    orchestrator: &Orchestrator,
    cancel: &CancellationToken,
) -> Option<RunReport> {
    let Ok(_guard) = running.try_lock() else {
        tracing::warn!("scheduler: previous run still in progress, skipping trigger");
        return None;
    };
    Some(orchestrator.run(cancel).await)
}
