// executor.rs — Pipeline Executor.
//
// Sequences the four stages for one run and records each transition:
//
//   run.running
//   stage.started {stage, params…} / stage.completed {stage, counters…}  × 4
//   run.completed {counters, completed_at}   or   run.failed {error, …}
//
// A stage error or panic ends the run with a single run.failed. Nothing is
// retried. The terminal event is always the last thing the executor writes.

use std::sync::Arc;

use chrono::Utc;
use ct_eventlog::{Counters, EventLog, EventType, Payload, Stage};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::{PipelineContext, PipelineState};
use crate::error::{PipelineError, StageError};
use crate::stage::StageRunner;

/// How a run ended, as recorded by its terminal event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    Completed {
        counters: Counters,
    },
    Failed {
        last_stage: Option<Stage>,
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        termination_reason: Option<String>,
    },
}

/// Runs the stage pipeline for one run at a time.
///
/// Cheap to share: the log and the runner are both behind `Arc`.
#[derive(Clone)]
pub struct PipelineExecutor {
    log: Arc<dyn EventLog>,
    runner: Arc<dyn StageRunner>,
}

impl PipelineExecutor {
    pub fn new(log: Arc<dyn EventLog>, runner: Arc<dyn StageRunner>) -> Self {
        Self { log, runner }
    }

    /// Drive `ctx` through every stage to a terminal event.
    ///
    /// Stage failures are not errors here: they are recorded as `run.failed`
    /// and returned as [`RunOutcome::Failed`]. An `Err` means the event log
    /// (or the executor's own bookkeeping) failed; in that case one attempt is
    /// made to record `run.failed` before the original error is returned.
    pub async fn execute(&self, mut ctx: PipelineContext) -> Result<RunOutcome, PipelineError> {
        match self.drive(&mut ctx).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                if !ctx.state.is_terminal() {
                    let failure = StageError::new(format!("pipeline aborted: {err}"));
                    if let Err(record_err) = self.record_failure(&mut ctx, &failure).await {
                        tracing::warn!(
                            run_id = %ctx.run_id,
                            error = %record_err,
                            "could not record run.failed after event log error"
                        );
                    }
                }
                Err(err)
            }
        }
    }

    async fn drive(&self, ctx: &mut PipelineContext) -> Result<RunOutcome, PipelineError> {
        tracing::info!(
            run_id = %ctx.run_id,
            campaign_id = %ctx.campaign_id,
            "pipeline running"
        );
        self.emit(ctx, EventType::RunRunning, Payload::new()).await?;

        for stage in Stage::ORDER {
            ctx.enter(stage)?;

            let mut started = self.runner.params(stage, ctx);
            started.insert("stage".into(), Value::from(stage.as_str()));
            self.emit(ctx, EventType::StageStarted, started).await?;

            match self.run_stage(stage, ctx).await {
                Ok(counters) => {
                    ctx.counters.merge(&counters);
                    let mut completed = Payload::new();
                    completed.insert("stage".into(), Value::from(stage.as_str()));
                    counters.write_into(&mut completed);
                    self.emit(ctx, EventType::StageCompleted, completed).await?;
                    tracing::debug!(run_id = %ctx.run_id, %stage, "stage completed");
                }
                Err(failure) => {
                    tracing::warn!(
                        run_id = %ctx.run_id,
                        %stage,
                        error = %failure,
                        "stage failed"
                    );
                    self.record_failure(ctx, &failure).await?;
                    return Ok(RunOutcome::Failed {
                        last_stage: Some(stage),
                        error: failure.message,
                        termination_reason: failure.termination_reason,
                    });
                }
            }
        }

        // The run is only complete once run.completed is in the log; until
        // then a log failure still leaves room for run.failed.
        let mut payload = Payload::new();
        ctx.counters.write_into(&mut payload);
        payload.insert("completed_at".into(), Value::from(Utc::now().to_rfc3339()));
        self.emit(ctx, EventType::RunCompleted, payload).await?;
        ctx.transition(PipelineState::Completed)?;

        tracing::info!(run_id = %ctx.run_id, "pipeline completed");
        Ok(RunOutcome::Completed {
            counters: ctx.counters,
        })
    }

    /// Run one stage on its own task so a panic surfaces as a `JoinError`
    /// instead of unwinding through the executor.
    async fn run_stage(&self, stage: Stage, ctx: &PipelineContext) -> Result<Counters, StageError> {
        let runner = Arc::clone(&self.runner);
        let stage_ctx = ctx.clone();
        let handle = tokio::spawn(async move { runner.run(stage, &stage_ctx).await });
        match handle.await {
            Ok(result) => result,
            Err(join_err) if join_err.is_panic() => {
                Err(StageError::new(format!("stage {stage} panicked")))
            }
            Err(join_err) => Err(StageError::new(format!(
                "stage {stage} was cancelled: {join_err}"
            ))),
        }
    }

    /// Move to `failed` and append the single `run.failed` event.
    async fn record_failure(
        &self,
        ctx: &mut PipelineContext,
        failure: &StageError,
    ) -> Result<(), PipelineError> {
        ctx.transition(PipelineState::Failed)?;

        let mut payload = Payload::new();
        payload.insert("error".into(), Value::from(failure.message.as_str()));
        payload.insert("failed_at".into(), Value::from(Utc::now().to_rfc3339()));
        payload.insert(
            "last_stage".into(),
            ctx.current_stage
                .map(|s| Value::from(s.as_str()))
                .unwrap_or(Value::Null),
        );
        if let Some(reason) = &failure.termination_reason {
            payload.insert("termination_reason".into(), Value::from(reason.as_str()));
        }
        self.emit(ctx, EventType::RunFailed, payload).await
    }

    /// Append on the blocking pool; file-backed logs do synchronous I/O.
    async fn emit(
        &self,
        ctx: &PipelineContext,
        event_type: EventType,
        extra: Payload,
    ) -> Result<(), PipelineError> {
        let log = Arc::clone(&self.log);
        let campaign_id = ctx.campaign_id.clone();
        let run_id = ctx.run_id;
        tokio::task::spawn_blocking(move || log.append(event_type, &campaign_id, run_id, extra))
            .await??;
        Ok(())
    }
}
