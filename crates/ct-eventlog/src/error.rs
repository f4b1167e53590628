// error.rs — Error types for the event log.
//
// Append failures are never swallowed: every variant here is returned to the
// caller of `EventLog::append`, because a lost event corrupts every status
// derived from the log afterwards.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while appending to or reading the event log.
#[derive(Debug, Error)]
pub enum EventLogError {
    /// Failed to open or create the log file.
    #[error("failed to open event log at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write an event to the log.
    #[error("failed to append event: {0}")]
    WriteFailed(#[from] std::io::Error),

    /// Failed to serialize an event.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// A stored line could not be parsed back into an event.
    #[error("corrupt event at line {line}: {source}")]
    CorruptLine {
        line: usize,
        source: serde_json::Error,
    },

    /// An event type string outside the known vocabulary.
    #[error("unknown event type: {0}")]
    UnknownEventType(String),

    /// A stage name outside the fixed pipeline order.
    #[error("unknown stage: {0}")]
    UnknownStage(String),

    /// The store's internal lock was poisoned by a panicking writer.
    #[error("event log lock poisoned: {0}")]
    Poisoned(String),
}
