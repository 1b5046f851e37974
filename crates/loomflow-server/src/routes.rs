use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use loomflow_engine::MODEL_TYPE;
use loomflow_store::{AgentPatch, NewAgent, NewConnection};
use loomflow_types::{FlowError, Position};

use crate::state::AppState;

type ApiResponse = (StatusCode, Json<serde_json::Value>);

/// Map an engine/store error onto its HTTP status and a JSON error body.
fn error_response(err: &FlowError) -> ApiResponse {
    let status = err
        .http_status()
        .and_then(|s| StatusCode::from_u16(s).ok())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(json!({ "error": err.to_string() })))
}

// GET /api/health
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// ── Agent endpoints ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateAgentBody {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub agent_type: Option<String>,
    #[serde(default)]
    pub config: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub position: Position,
}

// POST /api/agents
pub async fn create_agent(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateAgentBody>,
) -> ApiResponse {
    let (Some(name), Some(agent_type)) = (body.name, body.agent_type) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Missing name or type" })),
        );
    };
    let agent = state
        .store
        .create_agent(NewAgent {
            name,
            agent_type,
            config: body.config,
            position: body.position,
        })
        .await;
    (StatusCode::CREATED, Json(json!(agent)))
}

// GET /api/agents
pub async fn list_agents(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!(state.store.list_agents().await))
}

// PUT /api/agents/:id
pub async fn update_agent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(patch): Json<AgentPatch>,
) -> ApiResponse {
    match state.store.update_agent(&id, patch).await {
        Ok(agent) => (StatusCode::OK, Json(json!(agent))),
        Err(err) => error_response(&err),
    }
}

// DELETE /api/agents/:id
pub async fn delete_agent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResponse {
    match state.store.delete_agent(&id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "message": "Agent and associated connections deleted" })),
        ),
        Err(err) => error_response(&err),
    }
}

// ── Connection endpoints ────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateConnectionBody {
    pub source_agent_id: Option<String>,
    pub target_agent_id: Option<String>,
    pub source_port: Option<String>,
    pub target_port: Option<String>,
}

// POST /api/connections
pub async fn create_connection(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateConnectionBody>,
) -> ApiResponse {
    let (Some(source_agent_id), Some(target_agent_id), Some(source_port), Some(target_port)) = (
        body.source_agent_id,
        body.target_agent_id,
        body.source_port,
        body.target_port,
    ) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Missing required connection fields" })),
        );
    };
    match state
        .store
        .create_connection(NewConnection {
            source_agent_id,
            target_agent_id,
            source_port,
            target_port,
        })
        .await
    {
        Ok(connection) => (StatusCode::CREATED, Json(json!(connection))),
        Err(err) => error_response(&err),
    }
}

// GET /api/connections
pub async fn list_connections(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!(state.store.list_connections().await))
}

// DELETE /api/connections/:id
pub async fn delete_connection(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResponse {
    match state.store.delete_connection(&id).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "message": "Connection deleted" }))),
        Err(err) => error_response(&err),
    }
}

// ── Flow execution ──────────────────────────────────────────────

// POST /api/flow/run
pub async fn run_flow(State(state): State<Arc<AppState>>) -> ApiResponse {
    let snapshot = state.store.snapshot().await;

    // Refuse strict-mode runs before the engine touches them when the
    // generative credential is absent; no partial external side effects.
    if !state.generative_ready && snapshot.has_agent_type(MODEL_TYPE) {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "error": "generative-model agents present but no GEMINI_API_KEY is configured"
            })),
        );
    }

    let report = state.runner.run(&snapshot).await;
    info!(
        state = ?report.state(),
        scheduled = report.execution_order.len(),
        "flow run finished"
    );
    (StatusCode::OK, Json(json!(report)))
}
