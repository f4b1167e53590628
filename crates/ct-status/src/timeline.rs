// timeline.rs — Timeline Projection.
//
// Mirrors the resolver's case analysis but produces a short narrative for
// display. Entries only restate what the snapshot contains; nothing here
// infers business outcomes the log didn't record.

use chrono::{DateTime, Utc};
use ct_eventlog::Counters;
use serde::{Deserialize, Serialize};

use crate::resolver::{resolve_at, ExecutionConfidence};
use crate::snapshot::RunSnapshot;
use crate::termination::TerminationClass;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Success,
    Warning,
    Info,
    Error,
}

/// One line of the timeline. Identity does not persist across projections.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimelineEntry {
    pub id: String,

    #[serde(rename = "type")]
    pub kind: EntryKind,

    pub label: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,

    pub is_completed: bool,
}

impl TimelineEntry {
    fn new(id: &str, kind: EntryKind, label: impl Into<String>) -> Self {
        Self {
            id: id.to_string(),
            kind,
            label: label.into(),
            timestamp: None,
            is_completed: true,
        }
    }

    fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    fn open(mut self) -> Self {
        self.is_completed = false;
        self
    }
}

/// Project against the wall clock.
pub fn project(snapshot: Option<&RunSnapshot>, no_runs: bool) -> Vec<TimelineEntry> {
    project_at(snapshot, no_runs, Utc::now())
}

/// Project against an explicit `now`.
pub fn project_at(
    snapshot: Option<&RunSnapshot>,
    no_runs: bool,
    now: DateTime<Utc>,
) -> Vec<TimelineEntry> {
    let resolved = resolve_at(snapshot, no_runs, now);
    let Some(snapshot) = snapshot.filter(|_| resolved.confidence != ExecutionConfidence::NotExecuted)
    else {
        return vec![no_runs_entry()];
    };

    let created =
        TimelineEntry::new("run_created", EntryKind::Success, "Run created").at(snapshot.created_at);

    match resolved.confidence {
        ExecutionConfidence::NotExecuted => vec![no_runs_entry()],
        ExecutionConfidence::Queued => vec![
            created,
            TimelineEntry::new("queued", EntryKind::Info, "Waiting for a worker").open(),
        ],
        ExecutionConfidence::InProgress => vec![
            created,
            TimelineEntry::new("worker_started", EntryKind::Success, "Worker started")
                .at(snapshot.effective_started_at()),
            TimelineEntry::new("executing", EntryKind::Info, executing_label(snapshot)).open(),
        ],
        ExecutionConfidence::Stale => vec![
            created,
            TimelineEntry::new(
                "stale_warning",
                EntryKind::Warning,
                "Running for over 30 minutes",
            )
            .at(snapshot.effective_started_at()),
            TimelineEntry::new(
                "awaiting_cleanup",
                EntryKind::Info,
                "Awaiting cleanup; no further progress expected",
            )
            .open(),
        ],
        ExecutionConfidence::Failed => {
            let class = resolved
                .termination
                .unwrap_or(TerminationClass::Unclassified);
            let mut entries = vec![created, termination_entry(snapshot, class)];
            if class.counters_valid() {
                if let Some(counters) = &snapshot.counters {
                    entries.push(
                        TimelineEntry::new(
                            "partial_results",
                            EntryKind::Info,
                            format!("Results so far: {}", counters_summary(counters)),
                        )
                        .at(snapshot.updated_at),
                    );
                }
            }
            entries
        }
        ExecutionConfidence::Completed if resolved.partially_completed => vec![
            created,
            TimelineEntry::new(
                "partially_completed",
                EntryKind::Warning,
                "Run partially completed",
            )
            .at(snapshot.updated_at),
        ],
        ExecutionConfidence::Completed => vec![
            created,
            TimelineEntry::new("steps_recorded", EntryKind::Success, "Step data recorded"),
            TimelineEntry::new("run_completed", EntryKind::Success, "Run completed")
                .at(snapshot.updated_at),
        ],
        ExecutionConfidence::CompletedNoStepsObserved => vec![
            created,
            TimelineEntry::new(
                "run_completed",
                EntryKind::Success,
                "Run completed (no step breakdown available)",
            )
            .at(snapshot.updated_at),
        ],
        ExecutionConfidence::Unknown => vec![
            created,
            TimelineEntry::new(
                "unknown_status",
                EntryKind::Warning,
                format!("Unrecognized run status '{}'", snapshot.status),
            )
            .at(snapshot.updated_at),
        ],
    }
}

fn no_runs_entry() -> TimelineEntry {
    TimelineEntry::new(
        "no_runs",
        EntryKind::Info,
        "No runs have been executed for this campaign",
    )
    .open()
}

fn executing_label(snapshot: &RunSnapshot) -> String {
    match &snapshot.last_stage {
        Some(stage) => format!("Executing ({stage})"),
        None => "Executing".to_string(),
    }
}

fn termination_entry(snapshot: &RunSnapshot, class: TerminationClass) -> TimelineEntry {
    let (id, kind) = match class {
        TerminationClass::HardFailure | TerminationClass::Unclassified => {
            ("execution_failed", EntryKind::Error)
        }
        TerminationClass::TimeoutPause => ("execution_paused", EntryKind::Warning),
        TerminationClass::IntentionalHalt => ("execution_halted", EntryKind::Info),
    };
    let label = match &snapshot.error_message {
        Some(msg) if !msg.is_empty() => format!("{}: {}", class.label(), msg),
        _ => class.label().to_string(),
    };
    TimelineEntry::new(id, kind, label).at(snapshot.updated_at)
}

fn counters_summary(c: &Counters) -> String {
    format!(
        "{} orgs sourced, {} contacts discovered, {} contacts evaluated, {} leads promoted",
        c.orgs_sourced, c.contacts_discovered, c.contacts_evaluated, c.leads_promoted
    )
}
