// error.rs — Error types for pipeline execution and run triggering.

use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by the trigger and the executor.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Appending to or reading the event log failed. Never swallowed.
    #[error("event log error: {0}")]
    EventLog(#[from] ct_eventlog::EventLogError),

    /// The blocking task performing an event log write did not finish.
    #[error("event log task failed: {0}")]
    LogTask(#[from] tokio::task::JoinError),

    /// The trigger was called without a usable campaign id.
    #[error("invalid campaign id: {0:?}")]
    InvalidCampaign(String),

    /// The trigger was called outside a tokio runtime, so the run could not be
    /// scheduled.
    #[error("no async runtime available to schedule run")]
    NoRuntime,

    /// The executor attempted an out-of-order state change.
    #[error("invalid transition from {from} to {to} for run {run_id}")]
    InvalidTransition {
        run_id: Uuid,
        from: String,
        to: String,
    },
}

/// A stage's failure, as reported by its [`crate::StageRunner`].
///
/// The executor turns this into a single `run.failed` event. The optional
/// termination reason is copied onto that event so readers can tell a
/// timeout or an intentional halt from a genuine failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct StageError {
    pub message: String,
    pub termination_reason: Option<String>,
}

impl StageError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            termination_reason: None,
        }
    }

    /// Attach a termination reason such as `execution_timeout`.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.termination_reason = Some(reason.into());
        self
    }
}
