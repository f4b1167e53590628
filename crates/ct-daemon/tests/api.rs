//! Router behavior, driven through `tower::ServiceExt::oneshot`.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use ct_daemon::{router, AppState, PipelineConfig};
use ct_eventlog::{EventLog, EventType, InMemoryEventLog, Payload};
use ct_pipeline::StubStageRunner;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

fn app(log: Arc<InMemoryEventLog>) -> axum::Router {
    router(AppState::new(
        log,
        Arc::new(StubStageRunner),
        PipelineConfig::default(),
    ))
}

async fn send(app: axum::Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn wait_for_terminal(log: &InMemoryEventLog, run_id: Uuid) {
    for _ in 0..200 {
        let events = log.list_run("c1", run_id).unwrap();
        if events.iter().any(|e| e.event_type.is_terminal()) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("run {run_id} did not finish");
}

#[tokio::test]
async fn health_is_ok() {
    let (status, body) = send(app(Arc::new(InMemoryEventLog::new())), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn post_runs_is_accepted_and_run_lands_in_log() {
    let log = Arc::new(InMemoryEventLog::new());
    let (status, body) = send(
        app(log.clone()),
        post_json("/runs", json!({"campaign_id": "c1", "triggered_by": "ops"})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "run_started");

    let run_id = Uuid::parse_str(body["run_id"].as_str().unwrap()).unwrap();
    let events = log.list_run("c1", run_id).unwrap();
    assert_eq!(events[0].event_type, EventType::RunStarted);
    assert_eq!(events[0].str_field("triggered_by"), Some("ops"));
    assert_eq!(events[0].str_field("execution_mode"), Some("live"));

    wait_for_terminal(&log, run_id).await;
    let (status, view) = send(
        app(log.clone()),
        get(&format!("/runs/{run_id}?campaign_id=c1")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["status"]["confidence"], "completed_no_steps_observed");
    assert_eq!(view["snapshot"]["status"], "completed");
    assert_eq!(view["timeline"][0]["id"], "run_created");
}

#[tokio::test]
async fn post_runs_rejects_empty_campaign() {
    let log = Arc::new(InMemoryEventLog::new());
    let (status, body) = send(app(log.clone()), post_json("/runs", json!({"campaign_id": " "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("campaign"));
    assert!(log.is_empty());
}

#[tokio::test]
async fn post_runs_rejects_malformed_body() {
    let req = Request::builder()
        .method("POST")
        .uri("/runs")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(app(Arc::new(InMemoryEventLog::new())), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn unknown_run_is_404() {
    let uri = format!("/runs/{}", Uuid::new_v4());
    let (status, body) = send(app(Arc::new(InMemoryEventLog::new())), get(&uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("not found"));

    let (status, _) = send(app(Arc::new(InMemoryEventLog::new())), get("/runs/not-a-uuid")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn campaign_without_runs_is_not_executed() {
    let (status, view) = send(
        app(Arc::new(InMemoryEventLog::new())),
        get("/campaigns/c1/status"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["status"]["confidence"], "not_executed");
    assert!(view.get("snapshot").is_none());
    assert_eq!(view["timeline"][0]["id"], "no_runs");
}

#[tokio::test]
async fn campaign_status_reports_latest_failed_run() {
    let log = Arc::new(InMemoryEventLog::new());
    let run_id = Uuid::new_v4();
    log.append(EventType::RunStarted, "c1", run_id, Payload::new())
        .unwrap();
    let mut failed = Payload::new();
    failed.insert("error".into(), json!("rate limited"));
    failed.insert("last_stage".into(), json!("discovery"));
    failed.insert("termination_reason".into(), json!("rate_limit_exceeded"));
    log.append(EventType::RunFailed, "c1", run_id, failed).unwrap();

    let (status, view) = send(app(log.clone()), get("/campaigns/c1/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["status"]["confidence"], "failed");
    assert_eq!(view["status"]["termination"], "intentional_halt");
    assert_eq!(view["timeline"][1]["id"], "execution_halted");

    // Lookup without campaign_id scans the whole log.
    let (status, view) = send(app(log), get(&format!("/runs/{run_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["snapshot"]["last_stage"], "discovery");
}

#[tokio::test]
async fn campaign_runs_lists_each_run() {
    let log = Arc::new(InMemoryEventLog::new());
    for _ in 0..2 {
        log.append(EventType::RunStarted, "c1", Uuid::new_v4(), Payload::new())
            .unwrap();
    }
    log.append(EventType::RunStarted, "c2", Uuid::new_v4(), Payload::new())
        .unwrap();

    let (status, runs) = send(app(log), get("/campaigns/c1/runs")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(runs.as_array().unwrap().len(), 2);
    assert_eq!(runs[0]["status"], "queued");
}
