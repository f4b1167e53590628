// trigger.rs — Run Trigger Service.
//
// The only synchronous part of a run: validate, allocate a run_id, append
// run.started, schedule the executor. The caller gets an acknowledgment that
// the run was accepted; everything after that is visible only in the log.

use std::sync::Arc;

use chrono::Utc;
use ct_eventlog::{EventLog, EventType, Payload};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::Instrument;
use uuid::Uuid;

use crate::context::PipelineContext;
use crate::error::PipelineError;
use crate::executor::{PipelineExecutor, RunOutcome};
use crate::stage::StageRunner;

/// Status string returned with every accepted trigger.
pub const RUN_STARTED_STATUS: &str = "run_started";

const DEFAULT_TRIGGERED_BY: &str = "system";
const DEFAULT_EXECUTION_MODE: &str = "live";

/// A request to start one run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TriggerRequest {
    pub campaign_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggered_by: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_mode: Option<String>,
}

impl TriggerRequest {
    pub fn new(campaign_id: impl Into<String>) -> Self {
        Self {
            campaign_id: campaign_id.into(),
            triggered_by: None,
            execution_mode: None,
        }
    }

    pub fn triggered_by(mut self, who: impl Into<String>) -> Self {
        self.triggered_by = Some(who.into());
        self
    }

    pub fn execution_mode(mut self, mode: impl Into<String>) -> Self {
        self.execution_mode = Some(mode.into());
        self
    }
}

/// Acknowledgment that a run was accepted. Says nothing about its outcome.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TriggerReceipt {
    pub run_id: Uuid,
    pub status: String,
}

/// Starts runs and hands them to detached background tasks.
#[derive(Clone)]
pub struct RunTrigger {
    log: Arc<dyn EventLog>,
    executor: PipelineExecutor,
}

impl RunTrigger {
    pub fn new(log: Arc<dyn EventLog>, runner: Arc<dyn StageRunner>) -> Self {
        let executor = PipelineExecutor::new(Arc::clone(&log), runner);
        Self { log, executor }
    }

    /// Start a run for `campaign_id` with default execution mode.
    pub fn trigger(
        &self,
        campaign_id: &str,
        triggered_by: &str,
    ) -> Result<TriggerReceipt, PipelineError> {
        self.trigger_request(&TriggerRequest::new(campaign_id).triggered_by(triggered_by))
    }

    /// Start a run. Must be called from within a tokio runtime.
    ///
    /// Returns once `run.started` is durably appended and the executor is
    /// scheduled. An append failure is returned here; anything that goes
    /// wrong afterwards is only logged.
    pub fn trigger_request(&self, req: &TriggerRequest) -> Result<TriggerReceipt, PipelineError> {
        let campaign_id = req.campaign_id.trim();
        if campaign_id.is_empty() {
            return Err(PipelineError::InvalidCampaign(req.campaign_id.clone()));
        }
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| PipelineError::NoRuntime)?;

        let triggered_by = req
            .triggered_by
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_TRIGGERED_BY);
        let execution_mode = req
            .execution_mode
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_EXECUTION_MODE);

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();

        let mut payload = Payload::new();
        payload.insert("triggered_by".into(), Value::from(triggered_by));
        payload.insert("started_at".into(), Value::from(started_at.to_rfc3339()));
        payload.insert("execution_mode".into(), Value::from(execution_mode));
        self.log
            .append(EventType::RunStarted, campaign_id, run_id, payload)?;

        tracing::info!(
            run_id = %run_id,
            campaign_id = %campaign_id,
            triggered_by = %triggered_by,
            "run started"
        );

        let ctx = PipelineContext::new(
            run_id,
            campaign_id,
            triggered_by,
            execution_mode,
            started_at,
        );
        let executor = self.executor.clone();
        let span = tracing::info_span!("pipeline", run_id = %run_id, campaign_id = %campaign_id);
        runtime.spawn(
            async move {
                match executor.execute(ctx).await {
                    Ok(RunOutcome::Completed { counters }) => {
                        tracing::info!(?counters, "run completed");
                    }
                    Ok(RunOutcome::Failed {
                        last_stage, error, ..
                    }) => {
                        tracing::warn!(?last_stage, %error, "run failed");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "pipeline execution error");
                    }
                }
            }
            .instrument(span),
        );

        Ok(TriggerReceipt {
            run_id,
            status: RUN_STARTED_STATUS.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::StubStageRunner;
    use ct_eventlog::InMemoryEventLog;

    fn trigger_with(log: Arc<InMemoryEventLog>) -> RunTrigger {
        RunTrigger::new(log, Arc::new(StubStageRunner))
    }

    #[tokio::test]
    async fn run_started_is_appended_before_return() {
        let log = Arc::new(InMemoryEventLog::new());
        let receipt = trigger_with(log.clone()).trigger("c1", "ops").unwrap();
        assert_eq!(receipt.status, RUN_STARTED_STATUS);

        // The background task may not have run yet, but run.started is in.
        let events = log.list_run("c1", receipt.run_id).unwrap();
        let first = &events[0];
        assert_eq!(first.event_type, EventType::RunStarted);
        assert_eq!(first.str_field("triggered_by"), Some("ops"));
        assert_eq!(first.str_field("execution_mode"), Some("live"));
        assert!(first.time_field("started_at").is_some());
    }

    #[tokio::test]
    async fn empty_campaign_is_rejected_without_appending() {
        let log = Arc::new(InMemoryEventLog::new());
        let trigger = trigger_with(log.clone());
        assert!(matches!(
            trigger.trigger("  ", "ops"),
            Err(PipelineError::InvalidCampaign(_))
        ));
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn defaults_apply_to_blank_fields() {
        let log = Arc::new(InMemoryEventLog::new());
        let req = TriggerRequest::new("c1").triggered_by("").execution_mode("dry_run");
        let receipt = trigger_with(log.clone()).trigger_request(&req).unwrap();
        let events = log.list_run("c1", receipt.run_id).unwrap();
        assert_eq!(events[0].str_field("triggered_by"), Some("system"));
        assert_eq!(events[0].str_field("execution_mode"), Some("dry_run"));
    }

    #[tokio::test]
    async fn each_trigger_gets_a_fresh_run_id() {
        let log = Arc::new(InMemoryEventLog::new());
        let trigger = trigger_with(log);
        let a = trigger.trigger("c1", "ops").unwrap();
        let b = trigger.trigger("c1", "ops").unwrap();
        assert_ne!(a.run_id, b.run_id);
    }

    #[test]
    fn outside_runtime_is_an_error() {
        let log = Arc::new(InMemoryEventLog::new());
        let result = trigger_with(log.clone()).trigger("c1", "ops");
        assert!(matches!(result, Err(PipelineError::NoRuntime)));
        assert!(log.is_empty());
    }

    #[test]
    fn request_deserializes_with_optional_fields() {
        let req: TriggerRequest = serde_json::from_str(r#"{"campaign_id":"c9"}"#).unwrap();
        assert_eq!(req, TriggerRequest::new("c9"));
    }
}
