//! The `StageRunner` trait: the unit of work behind each pipeline stage.
//!
//! The executor knows nothing about what a stage does. It hands the runner
//! the stage and the run's context, and gets back the counters that stage
//! produced or a [`StageError`]. Panics inside a runner are caught by the
//! executor and reported the same way as an error.

use async_trait::async_trait;
use ct_eventlog::{Counters, Payload, Stage};

use crate::context::PipelineContext;
use crate::error::StageError;

/// Runs one pipeline stage for one run.
#[async_trait]
pub trait StageRunner: Send + Sync {
    /// Execute `stage`, returning the counters it produced.
    ///
    /// Counters are per-stage; the executor aggregates them.
    async fn run(&self, stage: Stage, ctx: &PipelineContext) -> Result<Counters, StageError>;

    /// Input parameters recorded on `stage.started`.
    fn params(&self, _stage: Stage, _ctx: &PipelineContext) -> Payload {
        Payload::new()
    }
}

/// A runner whose stages do nothing and report zero counters.
#[derive(Debug, Default, Clone, Copy)]
pub struct StubStageRunner;

#[async_trait]
impl StageRunner for StubStageRunner {
    async fn run(&self, stage: Stage, ctx: &PipelineContext) -> Result<Counters, StageError> {
        tracing::debug!(run_id = %ctx.run_id, %stage, "stub stage");
        Ok(Counters::default())
    }
}
