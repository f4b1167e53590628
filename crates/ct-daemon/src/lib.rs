//! # ct-daemon
//!
//! HTTP front end for the campaign run tracker.
//!
//! `POST /runs` is the only write: it triggers a run and returns as soon as
//! `run.started` is in the log. Every read folds the event log afresh and
//! runs it through the status resolver and timeline projection.

pub mod error;
pub mod routes;

pub use ct_config::{ConfigError, PipelineConfig, ServerConfig, TrackerConfig};
pub use ct_status::{RunView, StatusView};
pub use error::ApiError;
pub use routes::{router, AppState};
