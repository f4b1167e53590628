// status.rs — `ct status` and `ct timeline`.

use std::fmt::Write;

use ct_config::TrackerConfig;
use ct_status::{EntryKind, RunSnapshot, RunView};
use uuid::Uuid;

use super::campaign_events;

/// The selected run (or the campaign's latest) folded into a view.
fn view(config: &TrackerConfig, campaign_id: &str, run: Option<Uuid>) -> anyhow::Result<RunView> {
    let events = campaign_events(config, campaign_id)?;
    let snapshot = match run {
        Some(run_id) => {
            let run_events: Vec<_> = events
                .into_iter()
                .filter(|e| e.run_id() == Some(run_id))
                .collect();
            match RunSnapshot::from_events(&run_events) {
                Some(s) => Some(s),
                None => anyhow::bail!("no events for run {run_id} in campaign {campaign_id}"),
            }
        }
        None => RunSnapshot::latest(&events),
    };
    Ok(RunView::build(snapshot))
}

pub fn status(
    config: &TrackerConfig,
    campaign_id: &str,
    run: Option<Uuid>,
    json: bool,
) -> anyhow::Result<String> {
    let view = view(config, campaign_id, run)?;
    if json {
        return Ok(serde_json::to_string_pretty(&view)? + "\n");
    }

    let mut out = String::new();
    writeln!(out, "Campaign:   {campaign_id}")?;
    if let Some(s) = &view.snapshot {
        writeln!(out, "Run:        {}", s.run_id)?;
        writeln!(out, "Status:     {}", s.status)?;
        if let Some(stage) = &s.last_stage {
            writeln!(out, "Last stage: {stage}")?;
        }
        if let Some(err) = &s.error_message {
            writeln!(out, "Error:      {err}")?;
        }
    }
    writeln!(out, "Confidence: {}", view.status.resolved.confidence)?;
    writeln!(out, "            {}", view.status.headline)?;
    Ok(out)
}

pub fn timeline(
    config: &TrackerConfig,
    campaign_id: &str,
    run: Option<Uuid>,
    json: bool,
) -> anyhow::Result<String> {
    let view = view(config, campaign_id, run)?;
    if json {
        return Ok(serde_json::to_string_pretty(&view.timeline)? + "\n");
    }

    let mut out = String::new();
    for entry in &view.timeline {
        let marker = match (entry.is_completed, entry.kind) {
            (false, _) => "…",
            (true, EntryKind::Success) => "✓",
            (true, EntryKind::Warning) => "!",
            (true, EntryKind::Error) => "✗",
            (true, EntryKind::Info) => "·",
        };
        let when = entry
            .timestamp
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        writeln!(out, "{marker} {:<19} {}", when, entry.label)?;
    }
    Ok(out)
}
