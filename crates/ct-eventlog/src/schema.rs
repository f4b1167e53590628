// schema.rs — Typed views of the payload fields shared by writers and readers.
//
// The payload is an unstructured map on disk; these types keep the field names
// in one place so the executor and the read-side projections agree on them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EventLogError;
use crate::event::{Event, Payload};

/// One of the four fixed pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Sourcing,
    Discovery,
    Evaluation,
    Promotion,
}

impl Stage {
    /// Pipeline order. A run visits these front to back and never skips one.
    pub const ORDER: [Stage; 4] = [
        Stage::Sourcing,
        Stage::Discovery,
        Stage::Evaluation,
        Stage::Promotion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Sourcing => "sourcing",
            Stage::Discovery => "discovery",
            Stage::Evaluation => "evaluation",
            Stage::Promotion => "promotion",
        }
    }

    /// The stage after this one, or `None` after promotion.
    pub fn next(&self) -> Option<Stage> {
        let idx = Stage::ORDER.iter().position(|s| s == self)?;
        Stage::ORDER.get(idx + 1).copied()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = EventLogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::ORDER
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| EventLogError::UnknownStage(s.to_string()))
    }
}

/// The four run counters.
///
/// Used both for what one stage produced (`stage.completed`) and for the
/// aggregate carried by `run.completed`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Counters {
    #[serde(default)]
    pub orgs_sourced: u64,
    #[serde(default)]
    pub contacts_discovered: u64,
    #[serde(default)]
    pub contacts_evaluated: u64,
    #[serde(default)]
    pub leads_promoted: u64,
}

impl Counters {
    pub const FIELDS: [&'static str; 4] = [
        "orgs_sourced",
        "contacts_discovered",
        "contacts_evaluated",
        "leads_promoted",
    ];

    /// Saturating field-wise sum.
    pub fn merge(&mut self, other: &Counters) {
        self.orgs_sourced = self.orgs_sourced.saturating_add(other.orgs_sourced);
        self.contacts_discovered = self
            .contacts_discovered
            .saturating_add(other.contacts_discovered);
        self.contacts_evaluated = self
            .contacts_evaluated
            .saturating_add(other.contacts_evaluated);
        self.leads_promoted = self.leads_promoted.saturating_add(other.leads_promoted);
    }

    /// Write the four counters into a payload.
    pub fn write_into(&self, payload: &mut Payload) {
        payload.insert("orgs_sourced".into(), Value::from(self.orgs_sourced));
        payload.insert(
            "contacts_discovered".into(),
            Value::from(self.contacts_discovered),
        );
        payload.insert(
            "contacts_evaluated".into(),
            Value::from(self.contacts_evaluated),
        );
        payload.insert("leads_promoted".into(), Value::from(self.leads_promoted));
    }

    /// Read counters from an event. `None` unless at least one counter field
    /// is present; missing fields read as zero.
    pub fn from_event(event: &Event) -> Option<Counters> {
        if !Counters::FIELDS.iter().any(|f| event.payload.contains_key(*f)) {
            return None;
        }
        Some(Counters {
            orgs_sourced: event.u64_field("orgs_sourced").unwrap_or(0),
            contacts_discovered: event.u64_field("contacts_discovered").unwrap_or(0),
            contacts_evaluated: event.u64_field("contacts_evaluated").unwrap_or(0),
            leads_promoted: event.u64_field("leads_promoted").unwrap_or(0),
        })
    }
}
