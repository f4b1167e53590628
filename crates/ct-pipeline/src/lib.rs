//! # ct-pipeline
//!
//! Drives campaign runs through the fixed stage pipeline and records every
//! transition in the event log.
//!
//! ## Key components
//!
//! - [`RunTrigger`] — entry point: allocates a `run_id`, appends `run.started`
//!   synchronously, then hands the run to a detached background task
//! - [`PipelineExecutor`] — sequences sourcing → discovery → evaluation →
//!   promotion, emitting `stage.*` events and exactly one terminal event
//! - [`PipelineContext`] — per-run state owned by the background task
//! - [`StageRunner`] — the opaque unit of work behind each stage
//!
//! The trigger's return value only says the run was accepted. Whether it
//! completed is visible solely through the event log.

pub mod context;
pub mod error;
pub mod executor;
pub mod stage;
pub mod trigger;

pub use context::{PipelineContext, PipelineState};
pub use error::{PipelineError, StageError};
pub use executor::{PipelineExecutor, RunOutcome};
pub use stage::{StageRunner, StubStageRunner};
pub use trigger::{RunTrigger, TriggerReceipt, TriggerRequest, RUN_STARTED_STATUS};
