// memory.rs — In-memory EventLog for tests and embedding.

use std::sync::Mutex;

use chrono::Utc;

use crate::error::EventLogError;
use crate::event::{Event, EventType, Payload};
use crate::log::EventLog;

/// A process-local [`EventLog`]. Nothing survives a restart.
#[derive(Default)]
pub struct InMemoryEventLog {
    events: Mutex<Vec<Event>>,
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored events.
    ///
    /// Still counts after a writer panicked while holding the lock: a push
    /// either happened or it didn't, so the vector is never half-updated.
    /// `insert` and `list_all` report the poisoning instead.
    pub fn len(&self) -> usize {
        match self.events.lock() {
            Ok(events) => events.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventLog for InMemoryEventLog {
    fn insert(&self, event_type: EventType, payload: Payload) -> Result<Event, EventLogError> {
        let mut events = self
            .events
            .lock()
            .map_err(|e| EventLogError::Poisoned(e.to_string()))?;
        let event = Event {
            seq: events.len() as u64,
            event_type,
            payload,
            created_at: Utc::now(),
        };
        events.push(event.clone());
        Ok(event)
    }

    fn list_all(&self) -> Result<Vec<Event>, EventLogError> {
        let events = self
            .events
            .lock()
            .map_err(|e| EventLogError::Poisoned(e.to_string()))?;
        Ok(events.clone())
    }
}
