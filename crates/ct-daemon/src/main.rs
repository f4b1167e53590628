//! # ct-daemon
//!
//! Campaign run tracker HTTP daemon.
//!
//! Opens the project's JSONL event log and serves the run API on the
//! configured address. Stages run through the stub runner, which completes
//! each stage with zero counters.
//!
//! ## Usage
//!
//! ```text
//! ct-daemon --project-root . --bind 127.0.0.1:7470
//! curl -X POST localhost:7470/runs -d '{"campaign_id":"c1"}' -H 'content-type: application/json'
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ct_daemon::{router, AppState, TrackerConfig};
use ct_eventlog::JsonlEventLog;
use ct_pipeline::StubStageRunner;

/// Campaign run tracker daemon.
#[derive(Parser)]
#[command(name = "ct-daemon", about = "Campaign run tracker HTTP daemon")]
struct Cli {
    /// Project root directory (defaults to current directory).
    #[arg(long, default_value = ".")]
    project_root: PathBuf,

    /// Address to listen on; overrides `server.bind` in `.ct/tracker.toml`.
    #[arg(long)]
    bind: Option<String>,

    /// Event log path; overrides `events_log` in `.ct/tracker.toml`.
    #[arg(long)]
    events_log: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    log_json: bool,
}

fn init_tracing(json: bool) -> Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive("ct_daemon=info".parse()?)
        .add_directive("ct_pipeline=info".parse()?)
        .add_directive("tower_http=info".parse()?);

    // Logs go to stderr; stdout stays clean.
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json)?;

    let project_root = cli
        .project_root
        .canonicalize()
        .with_context(|| format!("project root {}", cli.project_root.display()))?;
    let mut config = TrackerConfig::load_or_default(&project_root)?;
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }
    if let Some(events_log) = cli.events_log {
        config.events_log = events_log;
    }

    tracing::info!("Project root: {}", project_root.display());
    tracing::info!("Event log: {}", config.events_log.display());

    let log = Arc::new(JsonlEventLog::open(&config.events_log)?);
    let state = AppState::new(log, Arc::new(StubStageRunner), config.pipeline.clone());
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind))?;
    tracing::info!("Listening on {}", config.server.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Daemon shutting down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for shutdown signal: {e}");
    }
}
