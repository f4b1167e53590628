// routes.rs — HTTP surface.
//
//   POST /runs                          trigger a run (202, returns run_id)
//   GET  /runs/{run_id}?campaign_id=    snapshot, resolved status, timeline
//   GET  /campaigns/{id}/status         same, for the campaign's latest run
//   GET  /campaigns/{id}/runs           every run of the campaign
//   GET  /health
//
// Reads fold the log on every request; nothing is cached between calls.
// Log access runs on the blocking pool, since the file store does
// synchronous I/O under a mutex.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use ct_config::PipelineConfig;
use ct_eventlog::{Event, EventLog, EventLogError};
use ct_pipeline::{RunTrigger, TriggerReceipt, TriggerRequest};
use ct_status::{RunSnapshot, RunView};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::error::ApiError;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub log: Arc<dyn EventLog>,
    pub trigger: RunTrigger,
    pub defaults: PipelineConfig,
}

impl AppState {
    pub fn new(
        log: Arc<dyn EventLog>,
        runner: Arc<dyn ct_pipeline::StageRunner>,
        defaults: PipelineConfig,
    ) -> Self {
        let trigger = RunTrigger::new(Arc::clone(&log), runner);
        Self {
            log,
            trigger,
            defaults,
        }
    }
}

/// Build the daemon router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/runs", post(trigger_run))
        .route("/runs/{run_id}", get(run_status))
        .route("/campaigns/{campaign_id}/status", get(campaign_status))
        .route("/campaigns/{campaign_id}/runs", get(campaign_runs))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct RunQuery {
    pub campaign_id: Option<String>,
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn trigger_run(
    State(state): State<AppState>,
    payload: Result<Json<TriggerRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TriggerReceipt>), ApiError> {
    let Json(mut req) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    if req.triggered_by.is_none() {
        req.triggered_by = Some(state.defaults.default_triggered_by.clone());
    }
    if req.execution_mode.is_none() {
        req.execution_mode = Some(state.defaults.default_execution_mode.clone());
    }
    let trigger = state.trigger.clone();
    let receipt = tokio::task::spawn_blocking(move || trigger.trigger_request(&req))
        .await
        .map_err(|e| ApiError::Internal(format!("trigger task failed: {e}")))??;
    Ok((StatusCode::ACCEPTED, Json(receipt)))
}

async fn run_status(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
    Query(query): Query<RunQuery>,
) -> Result<Json<RunView>, ApiError> {
    let run_id = Uuid::parse_str(&run_id)
        .map_err(|_| ApiError::BadRequest(format!("invalid run id: {run_id}")))?;

    let events: Vec<Event> = with_log(&state, move |log| match query.campaign_id.as_deref() {
        Some(campaign_id) => log.list_run(campaign_id, run_id),
        None => Ok(log
            .list_all()?
            .into_iter()
            .filter(|e| e.run_id() == Some(run_id))
            .collect()),
    })
    .await?;

    let snapshot = RunSnapshot::from_events(&events)
        .ok_or_else(|| ApiError::NotFound(format!("run {run_id} not found")))?;
    Ok(Json(RunView::build(Some(snapshot))))
}

async fn campaign_status(
    State(state): State<AppState>,
    Path(campaign_id): Path<String>,
) -> Result<Json<RunView>, ApiError> {
    let events = with_log(&state, move |log| log.list_campaign(&campaign_id)).await?;
    Ok(Json(RunView::build(RunSnapshot::latest(&events))))
}

async fn campaign_runs(
    State(state): State<AppState>,
    Path(campaign_id): Path<String>,
) -> Result<Json<Vec<RunSnapshot>>, ApiError> {
    let events = with_log(&state, move |log| log.list_campaign(&campaign_id)).await?;
    Ok(Json(RunSnapshot::all_runs(&events)))
}

/// Run a log read on the blocking pool.
async fn with_log<T, F>(state: &AppState, read: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&dyn EventLog) -> Result<T, EventLogError> + Send + 'static,
{
    let log = Arc::clone(&state.log);
    let result = tokio::task::spawn_blocking(move || read(&*log))
        .await
        .map_err(|e| ApiError::Internal(format!("event log task failed: {e}")))?;
    Ok(result?)
}
