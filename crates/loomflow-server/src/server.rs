use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{delete, get, post, put};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::routes;
use crate::state::AppState;

/// Assemble the API router. Permissive CORS: the canvas frontend is served
/// from a different origin during development.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(routes::health))
        .route("/api/agents", post(routes::create_agent).get(routes::list_agents))
        .route(
            "/api/agents/:id",
            put(routes::update_agent).delete(routes::delete_agent),
        )
        .route(
            "/api/connections",
            post(routes::create_connection).get(routes::list_connections),
        )
        .route("/api/connections/:id", delete(routes::delete_connection))
        .route("/api/flow/run", post(routes::run_flow))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(addr: SocketAddr, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = build_router(state);
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "loomflow API listening");
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    use loomflow_engine::FlowRunner;
    use loomflow_store::FlowStore;

    fn test_state() -> Arc<AppState> {
        Arc::new(AppState {
            store: FlowStore::new(),
            runner: FlowRunner::with_default_registry(),
            generative_ready: false,
        })
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let app = build_router(test_state());
        let response = app
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn create_agent_requires_name_and_type() {
        let app = build_router(test_state());
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/agents",
                serde_json::json!({ "name": "incomplete" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Missing name or type");
    }

    #[tokio::test]
    async fn create_agent_returns_created_record() {
        let app = build_router(test_state());
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/agents",
                serde_json::json!({
                    "name": "Greeter",
                    "type": "input",
                    "config": { "message": "hi" }
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["name"], "Greeter");
        assert_eq!(body["type"], "input");
        assert!(body["id"].as_str().is_some());
        assert_eq!(body["position"], serde_json::json!({"x": 0, "y": 0}));
    }

    #[tokio::test]
    async fn unknown_agent_update_is_404() {
        let app = build_router(test_state());
        let response = app
            .oneshot(json_request(
                "PUT",
                "/api/agents/ghost",
                serde_json::json!({ "name": "renamed" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn connection_with_unknown_endpoint_is_404() {
        let state = test_state();
        let app = build_router(state.clone());
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/connections",
                serde_json::json!({
                    "source_agent_id": "ghost-a",
                    "target_agent_id": "ghost-b",
                    "source_port": "out",
                    "target_port": "in"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn connection_missing_fields_is_400() {
        let app = build_router(test_state());
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/connections",
                serde_json::json!({ "source_agent_id": "a" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn run_over_empty_store_completes_cleanly() {
        let app = build_router(test_state());
        let response = app
            .oneshot(json_request("POST", "/api/flow/run", serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["execution_order"], serde_json::json!([]));
        assert_eq!(body["final_outputs"], serde_json::json!({}));
        assert!(body.get("error").is_none());
    }

    #[tokio::test]
    async fn run_with_model_agent_but_no_credential_is_refused() {
        let state = test_state();
        state
            .store
            .create_agent(loomflow_store::NewAgent {
                name: "Gen".into(),
                agent_type: "model".into(),
                config: serde_json::Map::new(),
                position: Default::default(),
            })
            .await;

        let app = build_router(state);
        let response = app
            .oneshot(json_request("POST", "/api/flow/run", serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("GEMINI_API_KEY"));
    }

    #[tokio::test]
    async fn crud_then_run_end_to_end() {
        let state = test_state();
        let app = build_router(state.clone());

        // Create input -> output and wire them.
        let created = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/agents",
                serde_json::json!({"name": "Src", "type": "input", "config": {"message": "hello"}}),
            ))
            .await
            .unwrap();
        let src = body_json(created).await;

        let created = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/agents",
                serde_json::json!({"name": "Sink", "type": "output"}),
            ))
            .await
            .unwrap();
        let sink = body_json(created).await;

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/connections",
                serde_json::json!({
                    "source_agent_id": src["id"],
                    "target_agent_id": sink["id"],
                    "source_port": "out",
                    "target_port": "in"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .oneshot(json_request("POST", "/api/flow/run", serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let report = body_json(response).await;
        let sink_id = sink["id"].as_str().unwrap();
        assert_eq!(report["final_outputs"][sink_id], serde_json::json!("hello"));
        assert_eq!(
            report["execution_order"],
            serde_json::json!([src["id"], sink["id"]])
        );
    }
}
