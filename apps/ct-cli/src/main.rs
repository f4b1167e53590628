//! # ct
//!
//! Command-line inspection of the campaign run tracker's event log.
//!
//! - `ct runs <campaign>` — every run of a campaign with its status
//! - `ct events <campaign> <run>` — the raw event history of one run
//! - `ct status <campaign> [--run <id>]` — resolved execution confidence
//! - `ct timeline <campaign> [--run <id>]` — the run's timeline narrative
//!
//! All commands are read-only. Add `--json` for machine-readable output.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use ct_config::TrackerConfig;
use uuid::Uuid;

/// Campaign run tracker CLI.
#[derive(Parser)]
#[command(name = "ct", version, about)]
struct Cli {
    /// Project root directory (defaults to current directory).
    #[arg(long, default_value = ".")]
    project_root: PathBuf,

    /// Event log to read; overrides `.ct/tracker.toml`.
    #[arg(long, global = true)]
    events_log: Option<PathBuf>,

    /// Print JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the runs of a campaign, oldest first.
    Runs { campaign_id: String },
    /// Show the events of one run in append order.
    Events { campaign_id: String, run_id: Uuid },
    /// Show the resolved status of a run (latest run by default).
    Status {
        campaign_id: String,
        #[arg(long)]
        run: Option<Uuid>,
    },
    /// Show the timeline of a run (latest run by default).
    Timeline {
        campaign_id: String,
        #[arg(long)]
        run: Option<Uuid>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let project_root = cli.project_root.canonicalize().unwrap_or(cli.project_root);
    let mut config = TrackerConfig::load_or_default(&project_root)?;
    if let Some(events_log) = cli.events_log {
        config.events_log = events_log;
    }

    let output = match &cli.command {
        Commands::Runs { campaign_id } => commands::runs::list(&config, campaign_id, cli.json)?,
        Commands::Events {
            campaign_id,
            run_id,
        } => commands::runs::events(&config, campaign_id, *run_id, cli.json)?,
        Commands::Status { campaign_id, run } => {
            commands::status::status(&config, campaign_id, *run, cli.json)?
        }
        Commands::Timeline { campaign_id, run } => {
            commands::status::timeline(&config, campaign_id, *run, cli.json)?
        }
    };
    print!("{output}");
    Ok(())
}
