pub mod runs;
pub mod status;

use ct_config::TrackerConfig;
use ct_eventlog::{Event, JsonlEventLog};

/// Every event of one campaign. A missing log reads as empty.
pub(crate) fn campaign_events(
    config: &TrackerConfig,
    campaign_id: &str,
) -> anyhow::Result<Vec<Event>> {
    if !config.events_log.exists() {
        tracing::debug!(path = %config.events_log.display(), "no event log yet");
        return Ok(Vec::new());
    }
    let events = JsonlEventLog::read_all(&config.events_log)?;
    Ok(events
        .into_iter()
        .filter(|e| e.campaign_id() == Some(campaign_id))
        .collect())
}
