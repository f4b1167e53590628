// event.rs — Run event data model.
//
// An Event is one line in the log. The writer supplies only the type and the
// payload; `seq` and `created_at` are assigned by the store at append time.
// Identity (`campaign_id`, `run_id`) lives inside the payload rather than in
// dedicated fields, so the store knows nothing about runs or campaigns.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::EventLogError;

/// Unstructured key-value payload carried by every event.
pub type Payload = Map<String, Value>;

/// The fixed event vocabulary.
///
/// New variants may be added, but an existing tag is never reused for a
/// different meaning: old logs must keep replaying the same way.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EventType {
    /// The trigger accepted the run. Appended synchronously in the request path.
    #[serde(rename = "run.started")]
    RunStarted,
    /// The background executor picked the run up, before the first stage.
    #[serde(rename = "run.running")]
    RunRunning,
    /// A stage began. Carries `stage` and the stage's input parameters.
    #[serde(rename = "stage.started")]
    StageStarted,
    /// A stage succeeded. Carries `stage` and the counters it produced.
    #[serde(rename = "stage.completed")]
    StageCompleted,
    /// Terminal success with the aggregated counters.
    #[serde(rename = "run.completed")]
    RunCompleted,
    /// Terminal failure with `error`, `failed_at` and `last_stage`.
    #[serde(rename = "run.failed")]
    RunFailed,
}

impl EventType {
    pub const ALL: [EventType; 6] = [
        EventType::RunStarted,
        EventType::RunRunning,
        EventType::StageStarted,
        EventType::StageCompleted,
        EventType::RunCompleted,
        EventType::RunFailed,
    ];

    /// The wire tag, e.g. `"stage.completed"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::RunStarted => "run.started",
            EventType::RunRunning => "run.running",
            EventType::StageStarted => "stage.started",
            EventType::StageCompleted => "stage.completed",
            EventType::RunCompleted => "run.completed",
            EventType::RunFailed => "run.failed",
        }
    }

    /// Whether this event ends a run. At most one terminal event exists per run
    /// and it is always the last one.
    pub fn is_terminal(&self) -> bool {
        matches!(self, EventType::RunCompleted | EventType::RunFailed)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = EventLogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| EventLogError::UnknownEventType(s.to_string()))
    }
}

/// A single persisted event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    /// Position in the log, assigned by the store (0-based, strictly increasing).
    pub seq: u64,

    pub event_type: EventType,

    /// Always contains `campaign_id` and `run_id` when written through
    /// [`crate::EventLog::append`].
    pub payload: Payload,

    /// Assigned by the store; never supplied by the writer.
    pub created_at: DateTime<Utc>,
}

impl Event {
    pub fn campaign_id(&self) -> Option<&str> {
        self.str_field("campaign_id")
    }

    /// The run this event belongs to, if the payload carries a valid UUID.
    pub fn run_id(&self) -> Option<Uuid> {
        self.str_field("run_id").and_then(|s| Uuid::parse_str(s).ok())
    }

    /// Whether the payload identifies this event as part of the given run.
    pub fn belongs_to(&self, campaign_id: &str, run_id: Uuid) -> bool {
        self.campaign_id() == Some(campaign_id) && self.run_id() == Some(run_id)
    }

    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }

    pub fn u64_field(&self, key: &str) -> Option<u64> {
        self.payload.get(key).and_then(Value::as_u64)
    }

    /// Parse an RFC 3339 timestamp stored in the payload.
    pub fn time_field(&self, key: &str) -> Option<DateTime<Utc>> {
        self.str_field(key)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|t| t.with_timezone(&Utc))
    }
}

/// Merge the identity fields into `extra` to form an event payload.
///
/// Identity wins: an `extra` entry named `campaign_id` or `run_id` is replaced.
pub fn build_payload(campaign_id: &str, run_id: Uuid, mut extra: Payload) -> Payload {
    extra.insert("campaign_id".to_string(), Value::from(campaign_id));
    extra.insert("run_id".to_string(), Value::from(run_id.to_string()));
    extra
}

/// Convert a JSON value into a payload map.
///
/// Objects are used as-is, `null` becomes an empty map, and any other value is
/// wrapped under a `"value"` key.
pub fn to_payload(value: Value) -> Payload {
    match value {
        Value::Object(map) => map,
        Value::Null => Payload::new(),
        other => {
            let mut map = Payload::new();
            map.insert("value".to_string(), other);
            map
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn event_type_serializes_as_dotted_tag() {
        let json = serde_json::to_string(&EventType::StageCompleted).unwrap();
        assert_eq!(json, "\"stage.completed\"");
        let parsed: EventType = serde_json::from_str("\"run.failed\"").unwrap();
        assert_eq!(parsed, EventType::RunFailed);
    }

    #[test]
    fn event_type_from_str_matches_display() {
        for t in EventType::ALL {
            assert_eq!(t.to_string().parse::<EventType>().unwrap(), t);
        }
        assert!(matches!(
            "run.paused".parse::<EventType>(),
            Err(EventLogError::UnknownEventType(_))
        ));
    }

    #[test]
    fn only_completed_and_failed_are_terminal() {
        let terminal: Vec<_> = EventType::ALL.into_iter().filter(|t| t.is_terminal()).collect();
        assert_eq!(terminal, vec![EventType::RunCompleted, EventType::RunFailed]);
    }

    #[test]
    fn build_payload_identity_overrides_extra() {
        let run_id = Uuid::new_v4();
        let extra = to_payload(json!({"campaign_id": "spoofed", "stage": "sourcing"}));
        let payload = build_payload("c1", run_id, extra);
        assert_eq!(payload["campaign_id"], json!("c1"));
        assert_eq!(payload["run_id"], json!(run_id.to_string()));
        assert_eq!(payload["stage"], json!("sourcing"));
    }

    #[test]
    fn to_payload_wraps_scalars() {
        assert!(to_payload(Value::Null).is_empty());
        assert_eq!(to_payload(json!(3))["value"], json!(3));
    }

    #[test]
    fn field_accessors_read_payload() {
        let run_id = Uuid::new_v4();
        let event = Event {
            seq: 0,
            event_type: EventType::RunFailed,
            payload: build_payload(
                "c1",
                run_id,
                to_payload(json!({
                    "error": "boom",
                    "orgs_sourced": 4,
                    "failed_at": "2026-01-01T10:00:00Z",
                })),
            ),
            created_at: Utc::now(),
        };
        assert!(event.belongs_to("c1", run_id));
        assert!(!event.belongs_to("c2", run_id));
        assert_eq!(event.str_field("error"), Some("boom"));
        assert_eq!(event.u64_field("orgs_sourced"), Some(4));
        assert_eq!(
            event.time_field("failed_at").unwrap().to_rfc3339(),
            "2026-01-01T10:00:00+00:00"
        );
    }
}
