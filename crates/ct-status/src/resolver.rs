// resolver.rs — Run State Resolver.
//
// Turns the latest run snapshot into one of a small closed set of confidence
// levels. The resolver is conservative: it reports only what the snapshot
// shows, and every status it doesn't recognize falls through to `unknown`
// rather than a guess.
//
// Precedence:
//   no runs / no snapshot            → not_executed
//   queued | run_requested | pending → queued
//   running | in_progress            → in_progress, or stale after 30 min
//   failed | error                   → failed (+ termination class)
//   completed | success | succeeded  → completed if step data was recorded,
//                                      else completed_no_steps_observed
//   partial | partial_success        → completed, partially completed
//   anything else                    → unknown

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::snapshot::RunSnapshot;
use crate::staleness::is_stale;
use crate::termination::TerminationClass;

/// User-facing execution confidence. Computed on every read, never stored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionConfidence {
    NotExecuted,
    Queued,
    InProgress,
    Stale,
    Completed,
    CompletedNoStepsObserved,
    Failed,
    Unknown,
}

impl ExecutionConfidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionConfidence::NotExecuted => "not_executed",
            ExecutionConfidence::Queued => "queued",
            ExecutionConfidence::InProgress => "in_progress",
            ExecutionConfidence::Stale => "stale",
            ExecutionConfidence::Completed => "completed",
            ExecutionConfidence::CompletedNoStepsObserved => "completed_no_steps_observed",
            ExecutionConfidence::Failed => "failed",
            ExecutionConfidence::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ExecutionConfidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backend status strings the resolver knows about.
///
/// Adding a backend status means adding a variant here and deciding its arm
/// in [`resolve_at`]; until then it parses as `Other` and resolves to
/// `unknown`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Queued,
    RunRequested,
    Pending,
    Running,
    InProgress,
    Failed,
    Error,
    Completed,
    Success,
    Succeeded,
    Partial,
    PartialSuccess,
    Other(String),
}

impl RunStatus {
    /// Parse a raw status, ignoring case and surrounding whitespace.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "queued" => RunStatus::Queued,
            "run_requested" => RunStatus::RunRequested,
            "pending" => RunStatus::Pending,
            "running" => RunStatus::Running,
            "in_progress" => RunStatus::InProgress,
            "failed" => RunStatus::Failed,
            "error" => RunStatus::Error,
            "completed" => RunStatus::Completed,
            "success" => RunStatus::Success,
            "succeeded" => RunStatus::Succeeded,
            "partial" => RunStatus::Partial,
            "partial_success" => RunStatus::PartialSuccess,
            other => RunStatus::Other(other.to_string()),
        }
    }
}

/// The resolver's answer: a confidence level plus display qualifiers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolvedStatus {
    pub confidence: ExecutionConfidence,

    /// Set only when `confidence == Failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub termination: Option<TerminationClass>,

    /// Set for `partial` / `partial_success` statuses.
    #[serde(default)]
    pub partially_completed: bool,
}

impl ResolvedStatus {
    fn plain(confidence: ExecutionConfidence) -> Self {
        Self {
            confidence,
            termination: None,
            partially_completed: false,
        }
    }

    /// Short headline for display.
    pub fn headline(&self) -> &'static str {
        match self.confidence {
            ExecutionConfidence::NotExecuted => "Not executed",
            ExecutionConfidence::Queued => "Queued",
            ExecutionConfidence::InProgress => "In progress",
            ExecutionConfidence::Stale => "Stale: no progress expected",
            ExecutionConfidence::Completed if self.partially_completed => "Partially completed",
            ExecutionConfidence::Completed => "Completed",
            ExecutionConfidence::CompletedNoStepsObserved => "Completed (no steps observed)",
            ExecutionConfidence::Failed => self
                .termination
                .unwrap_or(TerminationClass::Unclassified)
                .label(),
            ExecutionConfidence::Unknown => "Unknown status",
        }
    }
}

/// Resolve against the wall clock.
pub fn resolve(snapshot: Option<&RunSnapshot>, no_runs: bool) -> ResolvedStatus {
    resolve_at(snapshot, no_runs, Utc::now())
}

/// Resolve against an explicit `now`. Total and deterministic.
pub fn resolve_at(
    snapshot: Option<&RunSnapshot>,
    no_runs: bool,
    now: DateTime<Utc>,
) -> ResolvedStatus {
    let snapshot = match snapshot {
        Some(s) if !no_runs => s,
        _ => return ResolvedStatus::plain(ExecutionConfidence::NotExecuted),
    };

    match RunStatus::parse(&snapshot.status) {
        RunStatus::Queued | RunStatus::RunRequested | RunStatus::Pending => {
            ResolvedStatus::plain(ExecutionConfidence::Queued)
        }
        RunStatus::Running | RunStatus::InProgress => {
            if is_stale(snapshot.effective_started_at(), now) {
                ResolvedStatus::plain(ExecutionConfidence::Stale)
            } else {
                ResolvedStatus::plain(ExecutionConfidence::InProgress)
            }
        }
        RunStatus::Failed | RunStatus::Error => ResolvedStatus {
            confidence: ExecutionConfidence::Failed,
            termination: Some(TerminationClass::classify(
                snapshot.termination_reason.as_deref(),
            )),
            partially_completed: false,
        },
        RunStatus::Completed | RunStatus::Success | RunStatus::Succeeded => {
            if snapshot.has_step_data() {
                ResolvedStatus::plain(ExecutionConfidence::Completed)
            } else {
                ResolvedStatus::plain(ExecutionConfidence::CompletedNoStepsObserved)
            }
        }
        RunStatus::Partial | RunStatus::PartialSuccess => ResolvedStatus {
            confidence: ExecutionConfidence::Completed,
            termination: None,
            partially_completed: true,
        },
        RunStatus::Other(_) => ResolvedStatus::plain(ExecutionConfidence::Unknown),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use serde_json::json;
    use uuid::Uuid;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn snap(status: &str) -> RunSnapshot {
        RunSnapshot::new(Uuid::new_v4(), status, t0())
    }

    fn confidence(s: &RunSnapshot, now: DateTime<Utc>) -> ExecutionConfidence {
        resolve_at(Some(s), false, now).confidence
    }

    #[test]
    fn no_runs_overrides_everything() {
        let s = snap("running").with_step_data(json!({"x": 1}));
        assert_eq!(
            resolve_at(Some(&s), true, t0()).confidence,
            ExecutionConfidence::NotExecuted
        );
        assert_eq!(
            resolve_at(None, false, t0()).confidence,
            ExecutionConfidence::NotExecuted
        );
    }

    #[test]
    fn queued_family() {
        for status in ["queued", "run_requested", "pending", " PENDING "] {
            assert_eq!(confidence(&snap(status), t0()), ExecutionConfidence::Queued, "{status}");
        }
    }

    #[test]
    fn running_staleness_boundary() {
        let s = snap("running");
        let fresh = t0() + Duration::minutes(29) + Duration::seconds(59);
        let stale = t0() + Duration::minutes(30) + Duration::seconds(1);
        assert_eq!(confidence(&s, fresh), ExecutionConfidence::InProgress);
        assert_eq!(confidence(&s, stale), ExecutionConfidence::Stale);
        assert_eq!(
            confidence(&s, t0() + Duration::minutes(30)),
            ExecutionConfidence::InProgress
        );
        assert_eq!(
            confidence(&snap("in_progress"), stale),
            ExecutionConfidence::Stale
        );
    }

    #[test]
    fn explicit_start_time_takes_precedence() {
        // Created long ago but only started recently.
        let s = snap("running").with_started_at(t0() + Duration::hours(1));
        let now = t0() + Duration::hours(1) + Duration::minutes(5);
        assert_eq!(confidence(&s, now), ExecutionConfidence::InProgress);
    }

    #[test]
    fn failed_keeps_confidence_regardless_of_reason() {
        let timeout = snap("failed").with_termination_reason("execution_timeout");
        let resolved = resolve_at(Some(&timeout), false, t0());
        assert_eq!(resolved.confidence, ExecutionConfidence::Failed);
        assert_eq!(resolved.termination, Some(TerminationClass::TimeoutPause));
        assert_eq!(
            resolved.termination.unwrap().tone(),
            crate::termination::DisplayTone::Paused
        );

        let error = resolve_at(Some(&snap("error")), false, t0());
        assert_eq!(error.confidence, ExecutionConfidence::Failed);
        assert_eq!(error.termination, Some(TerminationClass::Unclassified));
    }

    #[test]
    fn completed_without_step_data_is_not_claimed() {
        for status in ["completed", "success", "succeeded"] {
            assert_eq!(
                confidence(&snap(status), t0()),
                ExecutionConfidence::CompletedNoStepsObserved
            );
        }
        let with_steps = snap("completed").with_step_data(json!([{"stage": "sourcing"}]));
        assert_eq!(confidence(&with_steps, t0()), ExecutionConfidence::Completed);
    }

    #[test]
    fn partial_is_completed_with_qualifier() {
        let resolved = resolve_at(Some(&snap("partial_success")), false, t0());
        assert_eq!(resolved.confidence, ExecutionConfidence::Completed);
        assert!(resolved.partially_completed);
        assert_eq!(resolved.headline(), "Partially completed");
    }

    #[test]
    fn unrecognized_status_is_unknown() {
        assert_eq!(confidence(&snap("cancelled"), t0()), ExecutionConfidence::Unknown);
        assert_eq!(confidence(&snap(""), t0()), ExecutionConfidence::Unknown);
    }

    #[test]
    fn resolve_is_idempotent() {
        let s = snap("failed").with_termination_reason("batch_limit_reached");
        let now = t0() + Duration::minutes(45);
        assert_eq!(resolve_at(Some(&s), false, now), resolve_at(Some(&s), false, now));
    }

    #[test]
    fn confidence_serializes_snake_case() {
        let json = serde_json::to_string(&ExecutionConfidence::CompletedNoStepsObserved).unwrap();
        assert_eq!(json, "\"completed_no_steps_observed\"");
        assert_eq!(ExecutionConfidence::NotExecuted.to_string(), "not_executed");
    }
}
