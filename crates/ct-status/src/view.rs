// view.rs — Resolved status and timeline for one run, computed together.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::resolver::{resolve_at, ResolvedStatus};
use crate::snapshot::RunSnapshot;
use crate::timeline::{project_at, TimelineEntry};

/// Resolved status plus its display headline.
#[derive(Debug, Serialize)]
pub struct StatusView {
    #[serde(flatten)]
    pub resolved: ResolvedStatus,
    pub headline: &'static str,
}

/// What a reader sees for one run.
#[derive(Debug, Serialize)]
pub struct RunView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<RunSnapshot>,
    pub status: StatusView,
    pub timeline: Vec<TimelineEntry>,
}

impl RunView {
    /// Build against the wall clock.
    pub fn build(snapshot: Option<RunSnapshot>) -> Self {
        Self::build_at(snapshot, Utc::now())
    }

    /// Resolve and project against a single `now`, so the status and the
    /// timeline never disagree about staleness.
    pub fn build_at(snapshot: Option<RunSnapshot>, now: DateTime<Utc>) -> Self {
        let no_runs = snapshot.is_none();
        let resolved = resolve_at(snapshot.as_ref(), no_runs, now);
        let timeline = project_at(snapshot.as_ref(), no_runs, now);
        Self {
            status: StatusView {
                headline: resolved.headline(),
                resolved,
            },
            timeline,
            snapshot,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    use crate::resolver::ExecutionConfidence;

    #[test]
    fn status_and_timeline_share_one_clock() {
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let snapshot = RunSnapshot::new(Uuid::new_v4(), "running", t0);
        let view = RunView::build_at(Some(snapshot), t0 + Duration::minutes(31));
        assert_eq!(view.status.resolved.confidence, ExecutionConfidence::Stale);
        assert_eq!(view.timeline[1].id, "stale_warning");
    }

    #[test]
    fn missing_snapshot_is_not_executed() {
        let view = RunView::build(None);
        assert_eq!(view.status.resolved.confidence, ExecutionConfidence::NotExecuted);
        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("snapshot").is_none());
        assert_eq!(json["timeline"][0]["id"], "no_runs");
    }
}
