// snapshot.rs — Projection of a run's events into the latest run snapshot.
//
// The snapshot is the read contract consumed by the resolver and the timeline:
// `{run_id, status, execution_mode?, created_at, updated_at,
//   termination_reason?, error_message?}` plus a few fields the fold can
// fill in directly from the events. It carries no per-stage breakdown, so
// `step_data` is never set by the fold; it exists for read models that can
// supply one.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use ct_eventlog::{Counters, Event, EventType};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The latest observable state of one run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSnapshot {
    pub run_id: Uuid,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<String>,

    /// Raw backend status string, e.g. `"running"` or `"failed"`.
    pub status: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_mode: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    /// Explicit start time, when the backend records one. Readers fall back to
    /// `created_at`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub termination_reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_stage: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counters: Option<Counters>,

    /// Intermediate step data, when a read model records it. The event fold
    /// leaves this empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_data: Option<serde_json::Value>,
}

impl RunSnapshot {
    /// A bare snapshot with `updated_at == created_at`.
    pub fn new(run_id: Uuid, status: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            run_id,
            campaign_id: None,
            status: status.into(),
            execution_mode: None,
            created_at,
            updated_at: created_at,
            started_at: None,
            termination_reason: None,
            error_message: None,
            last_stage: None,
            counters: None,
            step_data: None,
        }
    }

    pub fn with_updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = updated_at;
        self
    }

    pub fn with_started_at(mut self, started_at: DateTime<Utc>) -> Self {
        self.started_at = Some(started_at);
        self
    }

    pub fn with_termination_reason(mut self, reason: impl Into<String>) -> Self {
        self.termination_reason = Some(reason.into());
        self
    }

    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn with_step_data(mut self, data: serde_json::Value) -> Self {
        self.step_data = Some(data);
        self
    }

    /// The timestamp staleness is measured from.
    pub fn effective_started_at(&self) -> DateTime<Utc> {
        self.started_at.unwrap_or(self.created_at)
    }

    /// Whether intermediate step data was recorded. A `null` or empty value
    /// counts as absent.
    pub fn has_step_data(&self) -> bool {
        match &self.step_data {
            None | Some(serde_json::Value::Null) => false,
            Some(serde_json::Value::Array(a)) => !a.is_empty(),
            Some(serde_json::Value::Object(o)) => !o.is_empty(),
            Some(_) => true,
        }
    }

    /// Fold the events of a single run (in append order) into a snapshot.
    ///
    /// Returns `None` for an empty slice. The first terminal event fixes the
    /// outcome; anything appended after it only moves `updated_at`.
    pub fn from_events(events: &[Event]) -> Option<Self> {
        let first = events.first()?;
        let run_id = first.run_id()?;
        let mut snapshot = RunSnapshot::new(run_id, "queued", first.created_at);
        snapshot.campaign_id = first.campaign_id().map(str::to_string);

        let mut stage_totals: Option<Counters> = None;
        let mut terminal = false;

        for event in events {
            snapshot.updated_at = event.created_at;
            if terminal {
                continue;
            }
            match event.event_type {
                EventType::RunStarted => {
                    snapshot.status = "queued".to_string();
                    snapshot.started_at = event.time_field("started_at");
                    snapshot.execution_mode = event.str_field("execution_mode").map(str::to_string);
                }
                EventType::RunRunning => {
                    snapshot.status = "running".to_string();
                }
                EventType::StageStarted => {
                    snapshot.status = "running".to_string();
                    snapshot.last_stage = event.str_field("stage").map(str::to_string);
                }
                EventType::StageCompleted => {
                    snapshot.status = "running".to_string();
                    if let Some(c) = Counters::from_event(event) {
                        stage_totals.get_or_insert_with(Counters::default).merge(&c);
                    }
                }
                EventType::RunCompleted => {
                    snapshot.status = "completed".to_string();
                    terminal = true;
                    stage_totals = Counters::from_event(event).or(stage_totals);
                }
                EventType::RunFailed => {
                    snapshot.status = "failed".to_string();
                    terminal = true;
                    snapshot.error_message = event.str_field("error").map(str::to_string);
                    snapshot.termination_reason =
                        event.str_field("termination_reason").map(str::to_string);
                    if let Some(stage) = event.str_field("last_stage") {
                        snapshot.last_stage = Some(stage.to_string());
                    }
                }
            }
        }

        snapshot.counters = stage_totals;
        Some(snapshot)
    }

    /// Snapshots for every run found in `events`, oldest run first.
    ///
    /// Events are grouped by `(campaign_id, run_id)`; events without a valid
    /// run id are ignored.
    pub fn all_runs(events: &[Event]) -> Vec<RunSnapshot> {
        let mut order: Vec<(String, Uuid)> = Vec::new();
        let mut grouped: HashMap<(String, Uuid), Vec<Event>> = HashMap::new();

        for event in events {
            let (Some(campaign_id), Some(run_id)) = (event.campaign_id(), event.run_id()) else {
                continue;
            };
            let key = (campaign_id.to_string(), run_id);
            grouped
                .entry(key.clone())
                .or_insert_with(|| {
                    order.push(key);
                    Vec::new()
                })
                .push(event.clone());
        }

        order
            .iter()
            .filter_map(|key| grouped.get(key))
            .filter_map(|run_events| RunSnapshot::from_events(run_events))
            .collect()
    }

    /// The most recently created run in `events` (typically one campaign's).
    pub fn latest(events: &[Event]) -> Option<RunSnapshot> {
        RunSnapshot::all_runs(events)
            .into_iter()
            .max_by_key(|s| s.created_at)
    }
}
