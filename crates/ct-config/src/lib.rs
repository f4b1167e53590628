//! # ct-config
//!
//! Where the tracker keeps its state and how the daemon listens.
//!
//! Shared by the daemon and the read-only `ct` CLI so neither has to depend
//! on the other.

pub mod config;

pub use config::{
    ConfigError, PipelineConfig, ServerConfig, TrackerConfig, CONFIG_DIR, CONFIG_FILE,
};
