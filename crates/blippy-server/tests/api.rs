//! HTTP API integration tests over an in-memory stack.
//!
//! The LLM client points at a closed port, so anything that reaches the
//! model fails fast; these tests cover the HTTP contract, not the loop.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use blippy_openrouter::OpenRouterClient;
use blippy_runtime::{
    AgentLoop, Broker, Runner, StoreChannelLister, StoreRootLister,
};
use blippy_server::{router, AppState};
use blippy_store::Store;
use blippy_tools::{ToolExecutor, ToolRegistry};

fn test_state() -> AppState {
    let store = Store::open_in_memory().unwrap();
    let broker = Broker::new();
    let client = Arc::new(OpenRouterClient::with_base_url("key", "http://127.0.0.1:1/api"));
    let executor = ToolExecutor::new(
        Arc::new(ToolRegistry::new()),
        Arc::new(StoreChannelLister::new(store.clone())),
        Arc::new(StoreRootLister::new(store.clone())),
    );
    let agent_loop = Arc::new(AgentLoop::new(
        store.clone(),
        client.clone(),
        executor,
        broker.clone(),
        "default/model",
    ));
    let runner = Arc::new(Runner::new(store.clone(), broker.clone(), agent_loop.clone()));
    AppState { store, broker, agent_loop, runner, client }
}

fn app() -> (Router, AppState) {
    let state = test_state();
    (router(state.clone()), state)
}

async fn request_json(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let request = if let Some(body) = body {
        builder = builder.header("content-type", "application/json");
        builder.body(Body::from(body.to_string())).unwrap()
    } else {
        builder.body(Body::empty()).unwrap()
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };
    (status, json)
}

async fn create_agent(app: &Router, name: &str) -> String {
    let (status, body) = request_json(
        app,
        "POST",
        "/api/agents",
        Some(serde_json::json!({"name": name, "system_prompt": "Be terse."})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["id"].as_str().unwrap().to_owned()
}

// ─────────────────────────────────────────────────────────────────────────────
// Webhook
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn webhook_rejects_non_post() {
    let (app, _state) = app();
    let (status, _) = request_json(&app, "GET", "/webhooks/trigger", None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn webhook_rejects_malformed_json() {
    let (app, _state) = app();
    let request = Request::builder()
        .method("POST")
        .uri("/webhooks/trigger")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn webhook_rejects_empty_fields() {
    let (app, _state) = app();
    let (status, body) = request_json(
        &app,
        "POST",
        "/webhooks/trigger",
        Some(serde_json::json!({"agent_id": "", "prompt": "go"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("agent_id"));

    let (status, _) = request_json(
        &app,
        "POST",
        "/webhooks/trigger",
        Some(serde_json::json!({"agent_id": "a", "prompt": ""})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn webhook_unknown_agent_is_404() {
    let (app, _state) = app();
    let (status, _) = request_json(
        &app,
        "POST",
        "/webhooks/trigger",
        Some(serde_json::json!({"agent_id": "ghost", "prompt": "go"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn webhook_run_failure_is_500_with_error_text() {
    let (app, _state) = app();
    let agent_id = create_agent(&app, "hook-agent").await;

    let (status, body) = request_json(
        &app,
        "POST",
        "/webhooks/trigger",
        Some(serde_json::json!({"agent_id": agent_id, "prompt": "go"})),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("agent run failed"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Agents
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn agent_crud_round_trip() {
    let (app, _state) = app();

    let (status, created) = request_json(
        &app,
        "POST",
        "/api/agents",
        Some(serde_json::json!({
            "name": "researcher",
            "system_prompt": "Be terse.",
            "enabled_tools": ["fetch_url"],
            "forwarded_host_env_vars": ["GITHUB_TOKEN"]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["enabled_tools"], serde_json::json!(["fetch_url"]));
    let id = created["id"].as_str().unwrap();

    let (status, fetched) = request_json(&app, "GET", &format!("/api/agents/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["name"], "researcher");
    assert_eq!(fetched["forwarded_host_env_vars"], serde_json::json!(["GITHUB_TOKEN"]));

    let (status, updated) = request_json(
        &app,
        "PUT",
        &format!("/api/agents/{id}"),
        Some(serde_json::json!({"name": "renamed"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "renamed");

    let (status, _) = request_json(&app, "DELETE", &format!("/api/agents/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = request_json(&app, "GET", &format!("/api/agents/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn agent_requires_name() {
    let (app, _state) = app();
    let (status, _) =
        request_json(&app, "POST", "/api/agents", Some(serde_json::json!({"name": ""}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ─────────────────────────────────────────────────────────────────────────────
// Conversations + chat
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn conversation_create_requires_existing_agent() {
    let (app, _state) = app();
    let (status, _) = request_json(
        &app,
        "POST",
        "/api/conversations",
        Some(serde_json::json!({"agent_id": "ghost"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn busy_conversation_rejects_concurrent_chat() {
    let (app, state) = app();
    let agent_id = create_agent(&app, "chat-agent").await;

    let (status, conv) = request_json(
        &app,
        "POST",
        "/api/conversations",
        Some(serde_json::json!({"agent_id": agent_id})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let conv_id = conv["id"].as_str().unwrap();

    // Simulate an in-flight turn.
    assert!(state.broker.set_busy(conv_id));

    let (status, body) = request_json(
        &app,
        "POST",
        &format!("/api/conversations/{conv_id}/chat"),
        Some(serde_json::json!({"content": "hi"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("busy"));
}

#[tokio::test]
async fn chat_requires_content() {
    let (app, _state) = app();
    let agent_id = create_agent(&app, "chat-agent").await;
    let (_, conv) = request_json(
        &app,
        "POST",
        "/api/conversations",
        Some(serde_json::json!({"agent_id": agent_id})),
    )
    .await;
    let conv_id = conv["id"].as_str().unwrap();

    let (status, _) = request_json(
        &app,
        "POST",
        &format!("/api/conversations/{conv_id}/chat"),
        Some(serde_json::json!({"content": ""})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ─────────────────────────────────────────────────────────────────────────────
// Triggers
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn trigger_requires_exactly_one_schedule() {
    let (app, _state) = app();
    let agent_id = create_agent(&app, "trigger-agent").await;

    let (status, _) = request_json(
        &app,
        "POST",
        "/api/triggers",
        Some(serde_json::json!({"agent_id": agent_id, "prompt": "p"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = request_json(
        &app,
        "POST",
        "/api/triggers",
        Some(serde_json::json!({
            "agent_id": agent_id, "prompt": "p", "cron_expr": "0 9 * * *", "delay": "1h"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn trigger_invalid_cron_is_400() {
    let (app, _state) = app();
    let agent_id = create_agent(&app, "trigger-agent").await;

    let (status, body) = request_json(
        &app,
        "POST",
        "/api/triggers",
        Some(serde_json::json!({"agent_id": agent_id, "prompt": "p", "cron_expr": "banana"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("cron"));
}

#[tokio::test]
async fn cron_trigger_round_trip_sets_next_run() {
    let (app, _state) = app();
    let agent_id = create_agent(&app, "trigger-agent").await;

    let (status, created) = request_json(
        &app,
        "POST",
        "/api/triggers",
        Some(serde_json::json!({
            "agent_id": agent_id, "prompt": "daily digest", "cron_expr": "0 9 * * *"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["cron_expr"], "0 9 * * *");
    assert!(created["next_run_at"].is_string());
    assert_eq!(created["enabled"], true);

    let id = created["id"].as_str().unwrap();
    let (status, runs) =
        request_json(&app, "GET", &format!("/api/triggers/{id}/runs"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(runs, serde_json::json!([]));
}

// ─────────────────────────────────────────────────────────────────────────────
// Channels and roots
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn channel_round_trip_expands_config() {
    let (app, _state) = app();

    let (status, created) = request_json(
        &app,
        "POST",
        "/api/channels",
        Some(serde_json::json!({
            "name": "ops",
            "type": "http_request",
            "config": {"url": "https://hooks.example.com/ops"},
            "json_schema": {"type": "object", "properties": {"text": {"type": "string"}}}
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["config"]["url"], "https://hooks.example.com/ops");

    let (status, listed) = request_json(&app, "GET", "/api/channels", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn root_path_must_be_absolute() {
    let (app, _state) = app();
    let (status, _) = request_json(
        &app,
        "POST",
        "/api/roots",
        Some(serde_json::json!({"name": "proj", "path": "relative/path"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, created) = request_json(
        &app,
        "POST",
        "/api/roots",
        Some(serde_json::json!({"name": "proj", "path": "/srv/proj"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["path"], "/srv/proj");
}
