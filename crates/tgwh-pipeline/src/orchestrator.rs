//! Run state machine: stages in order, retry per stage, fail fast.

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{RetryPolicy, Stage, StageError, StageName, StageOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Succeeded,
    Failed { stage: StageName },
    Cancelled { before: StageName },
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub state: RunState,
    /// One entry per stage, in execution order.
    pub stages: Vec<(StageName, StageOutcome)>,
}

impl RunReport {
    #[must_use]
    pub fn outcome(&self, stage: StageName) -> Option<&StageOutcome> {
        self.stages.iter().find(|(s, _)| *s == stage).map(|(_, o)| o)
    }

    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.state == RunState::Succeeded
    }
}

pub struct Orchestrator {
    stages: Vec<Box<dyn Stage>>,
    policy: RetryPolicy,
}

impl Orchestrator {
    #[must_use]
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            stages: Vec::new(),
            policy,
        }
    }

    /// Append a stage. Stages run in the order they were added.
    #[must_use]
    pub fn with_stage(mut self, stage: Box<dyn Stage>) -> Self {
        self.stages.push(stage);
        self
    }

    #[must_use]
    pub fn stage_names(&self) -> Vec<StageName> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run every stage.
    pub async fn run(&self, cancel: &CancellationToken) -> RunReport {
        self.run_from(None, cancel).await
    }

    /// Run starting at `from`; earlier stages are reported as not run.
    ///
    /// Cancellation is observed before each stage and between retry attempts.
    /// A stage that is already running is allowed to finish its attempt.
    pub async fn run_from(&self, from: Option<StageName>, cancel: &CancellationToken) -> RunReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        tracing::info!(%run_id, from = ?from, "pipeline run started");

        let mut stages = Vec::with_capacity(self.stages.len());
        let mut state = RunState::Succeeded;

        for stage in &self.stages {
            let name = stage.name();

            if state != RunState::Succeeded || from.is_some_and(|f| name < f) {
                stages.push((name, StageOutcome::NotRun));
                continue;
            }

            if cancel.is_cancelled() {
                tracing::warn!(%run_id, stage = %name, "run cancelled before stage");
                state = RunState::Cancelled { before: name };
                stages.push((name, StageOutcome::NotRun));
                continue;
            }

            let outcome = self.run_stage(run_id, stage.as_ref(), cancel).await;
            match &outcome {
                StageOutcome::Failed { error, attempts } => {
                    tracing::error!(
                        %run_id,
                        stage = %name,
                        attempts,
                        error = %error,
                        "stage failed, aborting run"
                    );
                    state = RunState::Failed { stage: name };
                }
                StageOutcome::NotRun => {
                    state = RunState::Cancelled { before: name };
                }
                StageOutcome::Succeeded(_) | StageOutcome::Retried { .. } => {}
            }
            stages.push((name, outcome));
        }

        let finished_at = Utc::now();
        tracing::info!(
            %run_id,
            state = ?state,
            elapsed_secs = (finished_at - started_at).num_seconds(),
            "pipeline run finished"
        );

        RunReport {
            run_id,
            started_at,
            finished_at,
            state,
            stages,
        }
    }

    async fn run_stage(
        &self,
        run_id: Uuid,
        stage: &dyn Stage,
        cancel: &CancellationToken,
    ) -> StageOutcome {
        let name = stage.name();
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            tracing::info!(%run_id, stage = %name, attempt, max_attempts, "stage attempt started");

            let result = match tokio::time::timeout(self.policy.attempt_timeout, stage.run()).await
            {
                Ok(result) => result,
                Err(_) => Err(StageError::TimedOut(self.policy.attempt_timeout)),
            };

            let err = match result {
                Ok(report) => {
                    tracing::info!(%run_id, stage = %name, attempt, detail = %report.detail, "stage succeeded");
                    return if attempt == 1 {
                        StageOutcome::Succeeded(report)
                    } else {
                        StageOutcome::Retried {
                            attempts: attempt,
                            report,
                        }
                    };
                }
                Err(err) => err,
            };

            if matches!(err, StageError::Cancelled) {
                return StageOutcome::NotRun;
            }
            if !err.is_retriable() || attempt >= max_attempts {
                return StageOutcome::Failed {
                    attempts: attempt,
                    error: err.to_string(),
                };
            }

            let delay = self.policy.delay_after(attempt);
            tracing::warn!(
                %run_id,
                stage = %name,
                attempt,
                max_attempts,
                delay_secs = delay.as_secs(),
                error = %err,
                "stage attempt failed, retrying after back-off"
            );

            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = cancel.cancelled() => {
                    tracing::warn!(%run_id, stage = %name, "run cancelled during back-off");
                    return StageOutcome::Failed {
                        attempts: attempt,
                        error: format!("cancelled after: {err}"),
                    };
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "orchestrator_test.rs"]
mod tests;
