// termination.rs — Termination-reason taxonomy for failed runs.
//
// A `run.failed` event is not always an error from the user's point of view.
// Timeouts pause a run and intentional halts (batch or rate limits) leave
// work for a later run. Only invariant violations and unrecognized reasons are
// shown as genuine failures.

use serde::{Deserialize, Serialize};

/// Classification of a failed run's `termination_reason`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TerminationClass {
    /// `invariant_violation` or any reason mentioning "invariant". Results of
    /// the run must never be treated as valid.
    HardFailure,
    /// `execution_timeout` or any reason mentioning "timeout". Counters
    /// accumulated before the pause remain valid.
    TimeoutPause,
    /// `unprocessed_work_remaining`, `batch_limit_reached`,
    /// `rate_limit_exceeded`, or any reason mentioning "limit".
    IntentionalHalt,
    /// Anything else, including no reason at all.
    Unclassified,
}

/// How a termination class is framed to the user.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DisplayTone {
    Error,
    Paused,
    Incomplete,
}

const HALT_REASONS: [&str; 3] = [
    "unprocessed_work_remaining",
    "batch_limit_reached",
    "rate_limit_exceeded",
];

impl TerminationClass {
    /// Classify a raw termination reason (case-insensitive).
    ///
    /// When a reason matches more than one class the most severe wins:
    /// invariant, then timeout, then halt.
    pub fn classify(reason: Option<&str>) -> Self {
        let Some(reason) = reason.map(|r| r.trim().to_ascii_lowercase()) else {
            return TerminationClass::Unclassified;
        };
        if reason.contains("invariant") {
            TerminationClass::HardFailure
        } else if reason.contains("timeout") {
            TerminationClass::TimeoutPause
        } else if HALT_REASONS.contains(&reason.as_str()) || reason.contains("limit") {
            TerminationClass::IntentionalHalt
        } else {
            TerminationClass::Unclassified
        }
    }

    pub fn tone(&self) -> DisplayTone {
        match self {
            TerminationClass::HardFailure | TerminationClass::Unclassified => DisplayTone::Error,
            TerminationClass::TimeoutPause => DisplayTone::Paused,
            TerminationClass::IntentionalHalt => DisplayTone::Incomplete,
        }
    }

    /// Whether counters recorded before termination may be shown as results.
    pub fn counters_valid(&self) -> bool {
        matches!(
            self,
            TerminationClass::TimeoutPause | TerminationClass::IntentionalHalt
        )
    }

    pub fn retry_recommended(&self) -> bool {
        matches!(self, TerminationClass::Unclassified)
    }

    pub fn label(&self) -> &'static str {
        match self {
            TerminationClass::HardFailure => "Failed: invariant violated, results are not valid",
            TerminationClass::TimeoutPause => "Paused: execution timed out",
            TerminationClass::IntentionalHalt => "Incomplete: halted at a limit, will resume",
            TerminationClass::Unclassified => "Failed: retry recommended",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_reasons() {
        assert_eq!(
            TerminationClass::classify(Some("invariant_violation")),
            TerminationClass::HardFailure
        );
        assert_eq!(
            TerminationClass::classify(Some("execution_timeout")),
            TerminationClass::TimeoutPause
        );
        for r in HALT_REASONS {
            assert_eq!(
                TerminationClass::classify(Some(r)),
                TerminationClass::IntentionalHalt,
                "{r}"
            );
        }
    }

    #[test]
    fn substring_and_case_matching() {
        assert_eq!(
            TerminationClass::classify(Some("Stage_Invariant_Broken")),
            TerminationClass::HardFailure
        );
        assert_eq!(
            TerminationClass::classify(Some("upstream TIMEOUT")),
            TerminationClass::TimeoutPause
        );
        assert_eq!(
            TerminationClass::classify(Some("daily_send_limit")),
            TerminationClass::IntentionalHalt
        );
    }

    #[test]
    fn most_severe_match_wins() {
        assert_eq!(
            TerminationClass::classify(Some("invariant_after_timeout")),
            TerminationClass::HardFailure
        );
        assert_eq!(
            TerminationClass::classify(Some("timeout_at_rate_limit")),
            TerminationClass::TimeoutPause
        );
    }

    #[test]
    fn missing_or_unknown_is_unclassified() {
        assert_eq!(TerminationClass::classify(None), TerminationClass::Unclassified);
        assert_eq!(
            TerminationClass::classify(Some("smtp refused")),
            TerminationClass::Unclassified
        );
    }

    #[test]
    fn display_framing() {
        assert_eq!(TerminationClass::TimeoutPause.tone(), DisplayTone::Paused);
        assert_eq!(TerminationClass::IntentionalHalt.tone(), DisplayTone::Incomplete);
        assert_eq!(TerminationClass::HardFailure.tone(), DisplayTone::Error);
        assert!(!TerminationClass::HardFailure.counters_valid());
        assert!(TerminationClass::TimeoutPause.counters_valid());
        assert!(TerminationClass::Unclassified.retry_recommended());
        assert!(!TerminationClass::IntentionalHalt.retry_recommended());
    }
}
