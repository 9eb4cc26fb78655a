//! Router tests against the sample maintenance log

use std::path::Path;
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use maintrag_api::{create_router, AppState};
use maintrag_core::Dataset;
use maintrag_retrieval::QueryPipeline;
use serde_json::{json, Value};
use tower::ServiceExt;

fn app() -> Router {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../data/maintenance_records.csv");
    let dataset = Dataset::load(path).unwrap();
    create_router(AppState::new(QueryPipeline::new(Arc::new(dataset))))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

#[tokio::test]
async fn test_health_reports_dataset() {
    let app = app();
    let (status, body) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["dataset_rows"], 27);
    assert_eq!(body["work_orders"], 22);
    assert_eq!(body["llm"]["enabled"], false);
}

#[tokio::test]
async fn test_stateless_ask() {
    let app = app();
    let (status, body) = send(
        &app,
        "POST",
        "/ask",
        Some(json!({"question": "How many incidents were there on PRESS-01 in July 2024?"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text"], "There were 2 incidents on PRESS-01 in July 2024.");
    assert_eq!(body["plan"]["intent"]["kind"], "count_incidents");
    assert!(body.get("session_id").is_none());
}

#[tokio::test]
async fn test_empty_question_is_rejected() {
    let app = app();
    let (status, body) = send(&app, "POST", "/ask", Some(json!({"question": "   "}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Question must not be empty");
}

#[tokio::test]
async fn test_session_follow_up_and_reset() {
    let app = app();
    let (status, created) = send(&app, "POST", "/sessions", None).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["session_id"].as_str().unwrap().to_string();
    let ask_uri = format!("/sessions/{}/ask", id);

    let (_, first) = send(
        &app,
        "POST",
        &ask_uri,
        Some(json!({"question": "How many incidents were there on PRESS-01?"})),
    )
    .await;
    assert_eq!(first["turn"], 1);
    assert_eq!(first["text"], "There were 6 incidents on PRESS-01.");

    let (_, second) = send(
        &app,
        "POST",
        &ask_uri,
        Some(json!({"question": "How many different technicians worked on it?"})),
    )
    .await;
    assert_eq!(second["turn"], 2);
    assert_eq!(second["plan"]["follow_up"], true);
    assert_eq!(second["plan"]["filters"]["equipment_id"], "PRESS-01");

    let (status, _) = send(&app, "POST", &format!("/sessions/{}/reset", id), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, third) = send(
        &app,
        "POST",
        &ask_uri,
        Some(json!({"question": "How many different technicians worked on it?"})),
    )
    .await;
    assert_eq!(third["plan"]["follow_up"], false);
    assert!(third["plan"]["filters"]["equipment_id"].is_null());
    // Turn numbering restarts with the context
    assert_eq!(third["turn"], 1);
}

#[tokio::test]
async fn test_sessions_are_isolated() {
    let app = app();
    let (_, a) = send(&app, "POST", "/sessions", None).await;
    let (_, b) = send(&app, "POST", "/sessions", None).await;
    let a = a["session_id"].as_str().unwrap().to_string();
    let b = b["session_id"].as_str().unwrap().to_string();

    send(
        &app,
        "POST",
        &format!("/sessions/{}/ask", a),
        Some(json!({"question": "How many incidents on PRESS-01?"})),
    )
    .await;

    let (_, answer) = send(
        &app,
        "POST",
        &format!("/sessions/{}/ask", b),
        Some(json!({"question": "What about it?"})),
    )
    .await;
    assert_eq!(answer["plan"]["follow_up"], false);
    assert!(answer["plan"]["filters"]["equipment_id"].is_null());
}

#[tokio::test]
async fn test_deleted_session_is_gone() {
    let app = app();
    let (_, created) = send(&app, "POST", "/sessions", None).await;
    let id = created["session_id"].as_str().unwrap().to_string();

    let (status, body) = send(&app, "DELETE", &format!("/sessions/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], true);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/sessions/{}/ask", id),
        Some(json!({"question": "How many incidents?"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Session not found");
}
