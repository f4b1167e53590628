// context.rs — Per-run pipeline context and its state machine.
//
// The context lives only inside the background task executing one run. It is
// never persisted; anything a reader needs must be emitted as an event.
//
//   Accepted → Sourcing → Discovery → Evaluation → Promotion → Completed
//   (or Failed from any non-terminal state)

use std::fmt;

use chrono::{DateTime, Utc};
use ct_eventlog::{Counters, Stage};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PipelineError;

/// Where a run is in the pipeline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    /// Picked up by the executor, no stage entered yet.
    Accepted,
    Sourcing,
    Discovery,
    Evaluation,
    Promotion,
    Completed,
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineState::Accepted => "accepted",
            PipelineState::Sourcing => "sourcing",
            PipelineState::Discovery => "discovery",
            PipelineState::Evaluation => "evaluation",
            PipelineState::Promotion => "promotion",
            PipelineState::Completed => "completed",
            PipelineState::Failed => "failed",
        };
        f.write_str(s)
    }
}

impl From<Stage> for PipelineState {
    fn from(stage: Stage) -> Self {
        match stage {
            Stage::Sourcing => PipelineState::Sourcing,
            Stage::Discovery => PipelineState::Discovery,
            Stage::Evaluation => PipelineState::Evaluation,
            Stage::Promotion => PipelineState::Promotion,
        }
    }
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Completed | PipelineState::Failed)
    }

    /// Check whether moving to `next` follows the fixed pipeline order.
    pub fn can_transition_to(&self, next: PipelineState) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == PipelineState::Failed {
            return true;
        }
        matches!(
            (self, next),
            (PipelineState::Accepted, PipelineState::Sourcing)
                | (PipelineState::Sourcing, PipelineState::Discovery)
                | (PipelineState::Discovery, PipelineState::Evaluation)
                | (PipelineState::Evaluation, PipelineState::Promotion)
                | (PipelineState::Promotion, PipelineState::Completed)
        )
    }
}

/// Transient state of one run, exclusively owned by its executing task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineContext {
    pub run_id: Uuid,
    pub campaign_id: String,
    pub triggered_by: String,
    pub execution_mode: String,
    pub started_at: DateTime<Utc>,
    /// The stage most recently entered; reported as `last_stage` on failure.
    pub current_stage: Option<Stage>,
    pub state: PipelineState,
    /// Aggregate of all counters produced by completed stages.
    pub counters: Counters,
}

impl PipelineContext {
    pub fn new(
        run_id: Uuid,
        campaign_id: impl Into<String>,
        triggered_by: impl Into<String>,
        execution_mode: impl Into<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            run_id,
            campaign_id: campaign_id.into(),
            triggered_by: triggered_by.into(),
            execution_mode: execution_mode.into(),
            started_at,
            current_stage: None,
            state: PipelineState::Accepted,
            counters: Counters::default(),
        }
    }

    /// Transition to a new state. Returns an error if the transition is invalid.
    pub fn transition(&mut self, next: PipelineState) -> Result<(), PipelineError> {
        if !self.state.can_transition_to(next) {
            return Err(PipelineError::InvalidTransition {
                run_id: self.run_id,
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        self.state = next;
        Ok(())
    }

    /// Enter a stage: transition the state and record it as current.
    pub fn enter(&mut self, stage: Stage) -> Result<(), PipelineError> {
        self.transition(stage.into())?;
        self.current_stage = Some(stage);
        Ok(())
    }
}
