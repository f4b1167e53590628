// runs.rs — `ct runs` and `ct events`.

use std::fmt::Write;

use ct_config::TrackerConfig;
use ct_status::{resolve, RunSnapshot};
use uuid::Uuid;

use super::campaign_events;

pub fn list(config: &TrackerConfig, campaign_id: &str, json: bool) -> anyhow::Result<String> {
    let runs = RunSnapshot::all_runs(&campaign_events(config, campaign_id)?);
    if json {
        return Ok(serde_json::to_string_pretty(&runs)? + "\n");
    }

    let mut out = String::new();
    if runs.is_empty() {
        writeln!(out, "No runs for campaign {campaign_id}.")?;
        return Ok(out);
    }
    writeln!(
        out,
        "{:<38} {:<28} {:<20} LAST STAGE",
        "RUN", "STATUS", "CREATED"
    )?;
    for run in &runs {
        let resolved = resolve(Some(run), false);
        writeln!(
            out,
            "{:<38} {:<28} {:<20} {}",
            run.run_id.to_string(),
            resolved.confidence.as_str(),
            run.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            run.last_stage.as_deref().unwrap_or("-"),
        )?;
    }
    writeln!(out, "\n{} run(s).", runs.len())?;
    Ok(out)
}

pub fn events(
    config: &TrackerConfig,
    campaign_id: &str,
    run_id: Uuid,
    json: bool,
) -> anyhow::Result<String> {
    let events: Vec<_> = campaign_events(config, campaign_id)?
        .into_iter()
        .filter(|e| e.run_id() == Some(run_id))
        .collect();
    if events.is_empty() {
        anyhow::bail!("no events for run {run_id} in campaign {campaign_id}");
    }
    if json {
        return Ok(serde_json::to_string_pretty(&events)? + "\n");
    }

    let mut out = String::new();
    for event in &events {
        let mut extra = event.payload.clone();
        extra.remove("campaign_id");
        extra.remove("run_id");
        writeln!(
            out,
            "#{:<5} {} {:<16} {}",
            event.seq,
            event.created_at.format("%Y-%m-%d %H:%M:%S"),
            event.event_type.as_str(),
            serde_json::Value::Object(extra),
        )?;
    }
    Ok(out)
}
