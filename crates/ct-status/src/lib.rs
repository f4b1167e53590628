//! # ct-status
//!
//! Read-side derivation of user-facing run status from the event log.
//!
//! Nothing in this crate performs I/O or holds state. Every function takes the
//! latest known [`RunSnapshot`] (plus an explicit `now` where time matters) and
//! returns a fresh value, so results are never cached and two calls with the
//! same inputs always agree.
//!
//! ## Key components
//!
//! - [`RunSnapshot`] — the projection of one run's events into the fields a
//!   reader needs (status, timestamps, termination reason)
//! - [`resolve`] — maps a snapshot to an [`ExecutionConfidence`] level
//! - [`project`] — maps a snapshot to an ordered list of [`TimelineEntry`]
//! - [`TerminationClass`] — separates real failures from timeouts and
//!   intentional halts
//! - [`is_stale`] — the 30-minute staleness rule for running runs
//! - [`RunView`] — snapshot, resolved status and timeline against one `now`

pub mod resolver;
pub mod snapshot;
pub mod staleness;
pub mod termination;
pub mod timeline;
pub mod view;

pub use resolver::{resolve, resolve_at, ExecutionConfidence, ResolvedStatus, RunStatus};
pub use snapshot::RunSnapshot;
pub use staleness::{elapsed_since, is_stale, stale_threshold, STALE_THRESHOLD_SECS};
pub use termination::{DisplayTone, TerminationClass};
pub use timeline::{project, project_at, EntryKind, TimelineEntry};
pub use view::{RunView, StatusView};
