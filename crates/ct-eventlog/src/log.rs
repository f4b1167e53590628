// log.rs — The EventLog trait and its JSONL file store.
//
// The JSONL store keeps one JSON event per line. The file is only ever
// opened in append mode, so existing history can't be overwritten. Each
// append is one unbuffered write of a complete line; a failed write is rolled
// back so nothing of it reaches a later append.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use uuid::Uuid;

use crate::error::EventLogError;
use crate::event::{build_payload, Event, EventType, Payload};

/// An append-only store of run events.
///
/// Implementations must be safe to share between the request path and any
/// number of background pipeline tasks. There is deliberately no update or
/// delete operation.
pub trait EventLog: Send + Sync {
    /// Store primitive: append one event with a fully formed payload.
    ///
    /// Assigns `seq` and `created_at`. A single insert; no read-modify-write.
    fn insert(&self, event_type: EventType, payload: Payload) -> Result<Event, EventLogError>;

    /// All events in append order.
    fn list_all(&self) -> Result<Vec<Event>, EventLogError>;

    /// Append an event for a run, merging the identity fields into `extra`.
    ///
    /// Errors propagate unchanged; nothing is retried.
    fn append(
        &self,
        event_type: EventType,
        campaign_id: &str,
        run_id: Uuid,
        extra: Payload,
    ) -> Result<Event, EventLogError> {
        self.insert(event_type, build_payload(campaign_id, run_id, extra))
    }

    /// All events of one campaign, in append order.
    fn list_campaign(&self, campaign_id: &str) -> Result<Vec<Event>, EventLogError> {
        Ok(self
            .list_all()?
            .into_iter()
            .filter(|e| e.campaign_id() == Some(campaign_id))
            .collect())
    }

    /// The full history of one run, in append order.
    fn list_run(&self, campaign_id: &str, run_id: Uuid) -> Result<Vec<Event>, EventLogError> {
        Ok(self
            .list_all()?
            .into_iter()
            .filter(|e| e.belongs_to(campaign_id, run_id))
            .collect())
    }
}

struct JsonlWriter {
    file: File,
    next_seq: u64,
}

impl JsonlWriter {
    /// Write one complete line, or leave the file as it was.
    fn write_line(&mut self, line: &[u8]) -> std::io::Result<()> {
        let len_before = self.file.metadata()?.len();
        let written = self.file.write_all(line).and_then(|()| self.file.flush());
        if let Err(err) = written {
            if let Err(rollback) = self.file.set_len(len_before) {
                tracing::warn!(error = %rollback, "could not truncate partial event line");
            }
            return Err(err);
        }
        Ok(())
    }
}

/// An [`EventLog`] backed by a JSON Lines file.
pub struct JsonlEventLog {
    path: PathBuf,
    state: Mutex<JsonlWriter>,
}

impl JsonlEventLog {
    /// Open (or create) a log at the given path.
    ///
    /// If the file already has events, the next `seq` continues after the last
    /// one so positions stay unique across restarts.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, EventLogError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| EventLogError::OpenFailed {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let next_seq = if path.exists() {
            Self::read_last_seq(&path)?.map_or(0, |seq| seq + 1)
        } else {
            0
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| EventLogError::OpenFailed {
                path: path.clone(),
                source,
            })?;

        tracing::debug!(path = %path.display(), next_seq, "opened event log");

        Ok(Self {
            path,
            state: Mutex::new(JsonlWriter {
                file,
                next_seq,
            }),
        })
    }

    /// Read every event from a log file without opening it for writing.
    pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<Event>, EventLogError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| EventLogError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let reader = BufReader::new(file);
        let mut events = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let event: Event = serde_json::from_str(&line).map_err(|source| {
                EventLogError::CorruptLine {
                    line: line_num + 1,
                    source,
                }
            })?;
            events.push(event);
        }

        Ok(events)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_last_seq(path: &Path) -> Result<Option<u64>, EventLogError> {
        Ok(Self::read_all(path)?.last().map(|e| e.seq))
    }
}

impl EventLog for JsonlEventLog {
    fn insert(&self, event_type: EventType, payload: Payload) -> Result<Event, EventLogError> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| EventLogError::Poisoned(e.to_string()))?;

        let event = Event {
            seq: state.next_seq,
            event_type,
            payload,
            created_at: Utc::now(),
        };

        let mut line = serde_json::to_vec(&event)?;
        line.push(b'\n');
        state.write_line(&line)?;

        // Only advance once the whole line is in the file.
        state.next_seq += 1;
        Ok(event)
    }

    fn list_all(&self) -> Result<Vec<Event>, EventLogError> {
        // Hold the writer lock so a read never observes a half-written line.
        let _guard = self
            .state
            .lock()
            .map_err(|e| EventLogError::Poisoned(e.to_string()))?;
        Self::read_all(&self.path)
    }
}
