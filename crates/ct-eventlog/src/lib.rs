//! # ct-eventlog
//!
//! Append-only event log for campaign pipeline runs.
//!
//! Every fact about a run (it was started, a stage began, a stage finished,
//! the run completed or failed) is recorded as an immutable [`Event`]. There is
//! no "runs" table: the events carrying a given `(campaign_id, run_id)` pair
//! are the whole history of that run, and the current status is derived on
//! read by `ct-status`.
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use ct_eventlog::{EventLog, EventType, JsonlEventLog, Payload};
//! use uuid::Uuid;
//!
//! let log = JsonlEventLog::open("/tmp/events.jsonl").unwrap();
//! let run_id = Uuid::new_v4();
//! log.append(EventType::RunStarted, "c1", run_id, Payload::new()).unwrap();
//! assert_eq!(log.list_run("c1", run_id).unwrap().len(), 1);
//! ```

pub mod error;
pub mod event;
pub mod log;
pub mod memory;
pub mod schema;

pub use error::EventLogError;
pub use event::{build_payload, to_payload, Event, EventType, Payload};
pub use log::{EventLog, JsonlEventLog};
pub use memory::InMemoryEventLog;
pub use schema::{Counters, Stage};
