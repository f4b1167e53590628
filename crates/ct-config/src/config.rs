// config.rs — Tracker configuration.
//
// TrackerConfig says where the event log lives and how the daemon listens.
// `for_project()` gives the standard `.ct/` layout; `.ct/tracker.toml`
// overrides any of it. Every field in the file is optional.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Directory under the project root holding tracker state.
pub const CONFIG_DIR: &str = ".ct";

/// Config file name inside [`CONFIG_DIR`].
pub const CONFIG_FILE: &str = "tracker.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Fully resolved tracker configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrackerConfig {
    /// Root directory of the project.
    pub project_root: PathBuf,

    /// Path to the append-only JSONL event log.
    pub events_log: PathBuf,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    /// Socket address to bind, e.g. `127.0.0.1:7470`.
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Defaults applied to triggered runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Execution mode recorded on `run.started` when a request names none.
    #[serde(default = "default_execution_mode")]
    pub default_execution_mode: String,

    /// Actor recorded on `run.started` when a request names none.
    #[serde(default = "default_triggered_by")]
    pub default_triggered_by: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_execution_mode: default_execution_mode(),
            default_triggered_by: default_triggered_by(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7470".to_string()
}

fn default_execution_mode() -> String {
    "live".to_string()
}

fn default_triggered_by() -> String {
    "system".to_string()
}

/// On-disk shape of `.ct/tracker.toml`.
#[derive(Debug, Default, Deserialize)]
struct TrackerFile {
    events_log: Option<PathBuf>,
    #[serde(default)]
    server: ServerConfig,
    #[serde(default)]
    pipeline: PipelineConfig,
}

impl TrackerConfig {
    /// Create a config with the standard `.ct/` layout for a project.
    pub fn for_project(project_root: impl AsRef<Path>) -> Self {
        let root = project_root.as_ref().to_path_buf();
        let ct_dir = root.join(CONFIG_DIR);
        Self {
            project_root: root,
            events_log: ct_dir.join("events.jsonl"),
            server: ServerConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }

    /// Path of the config file for a project.
    pub fn config_path(project_root: impl AsRef<Path>) -> PathBuf {
        project_root.as_ref().join(CONFIG_DIR).join(CONFIG_FILE)
    }

    /// Load `.ct/tracker.toml` on top of the project defaults.
    ///
    /// A relative `events_log` is resolved against the project root.
    pub fn load(project_root: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = Self::config_path(&project_root);
        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        Self::from_toml(project_root, &content).map_err(|source| ConfigError::Parse { path, source })
    }

    /// Like [`TrackerConfig::load`], but a missing file yields the defaults.
    /// A file that exists but doesn't parse is still an error.
    pub fn load_or_default(project_root: impl AsRef<Path>) -> Result<Self, ConfigError> {
        match Self::load(&project_root) {
            Err(ConfigError::Read { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(Self::for_project(project_root))
            }
            other => other,
        }
    }

    fn from_toml(project_root: impl AsRef<Path>, content: &str) -> Result<Self, toml::de::Error> {
        let file: TrackerFile = toml::from_str(content)?;
        let mut config = Self::for_project(&project_root);
        if let Some(events_log) = file.events_log {
            config.events_log = if events_log.is_absolute() {
                events_log
            } else {
                config.project_root.join(events_log)
            };
        }
        config.server = file.server;
        config.pipeline = file.pipeline;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn for_project_uses_ct_layout() {
        let config = TrackerConfig::for_project("/work/acme");
        assert_eq!(config.events_log, PathBuf::from("/work/acme/.ct/events.jsonl"));
        assert_eq!(config.server.bind, "127.0.0.1:7470");
        assert_eq!(config.pipeline.default_execution_mode, "live");
        assert_eq!(config.pipeline.default_triggered_by, "system");
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = TrackerConfig::load_or_default(dir.path()).unwrap();
        assert_eq!(config, TrackerConfig::for_project(dir.path()));
    }

    #[test]
    fn toml_overrides_selected_fields() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(CONFIG_DIR)).unwrap();
        std::fs::write(
            TrackerConfig::config_path(dir.path()),
            r#"
events_log = "logs/runs.jsonl"

[server]
bind = "0.0.0.0:9000"

[pipeline]
default_execution_mode = "dry_run"
"#,
        )
        .unwrap();

        let config = TrackerConfig::load_or_default(dir.path()).unwrap();
        assert_eq!(config.events_log, dir.path().join("logs/runs.jsonl"));
        assert_eq!(config.server.bind, "0.0.0.0:9000");
        assert_eq!(config.pipeline.default_execution_mode, "dry_run");
        // Unset fields keep their defaults.
        assert_eq!(config.pipeline.default_triggered_by, "system");
    }

    #[test]
    fn absolute_events_log_is_kept() {
        let config = TrackerConfig::from_toml("/proj", "events_log = \"/var/ct/events.jsonl\"").unwrap();
        assert_eq!(config.events_log, PathBuf::from("/var/ct/events.jsonl"));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(CONFIG_DIR)).unwrap();
        std::fs::write(TrackerConfig::config_path(dir.path()), "server = 3").unwrap();
        assert!(matches!(
            TrackerConfig::load_or_default(dir.path()),
            Err(ConfigError::Parse { .. })
        ));
    }
}
