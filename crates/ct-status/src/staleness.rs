// staleness.rs — Read-time staleness rule for running runs.
//
// A run that has been "running" for longer than the threshold is reported as
// stale. This never touches the log: an external watchdog is expected to
// append `run.failed` for such runs eventually.

use chrono::{DateTime, Duration, Utc};

/// Thirty minutes, in seconds.
pub const STALE_THRESHOLD_SECS: i64 = 30 * 60;

pub fn stale_threshold() -> Duration {
    Duration::seconds(STALE_THRESHOLD_SECS)
}

/// Time elapsed between `started_at` and `now`. Negative under clock skew.
pub fn elapsed_since(started_at: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    now.signed_duration_since(started_at)
}

/// Strictly greater than the threshold; exactly 30 minutes is not stale.
pub fn is_stale(started_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    elapsed_since(started_at, now) > stale_threshold()
}
