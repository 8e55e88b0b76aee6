//! Axum router configuration with middleware.
//!
//! Routes are mounted at the root (`/agents...`), matching the paths the
//! front end calls through the gateway.
//! Middleware: CORS, tracing.

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/agents",
            post(handlers::agent::create_agent).get(handlers::agent::list_agents),
        )
        // Static segments take priority over `/agents/{id}`
        .route("/agents/my", get(handlers::agent::list_my_agents))
        .route("/agents/public", get(handlers::agent::list_public_agents))
        .route("/agents/favorites", get(handlers::agent::list_favorite_agents))
        .route("/agents/clone", post(handlers::agent::clone_agent))
        .route(
            "/agents/{id}",
            get(handlers::agent::get_agent)
                .put(handlers::agent::update_agent)
                .delete(handlers::agent::delete_agent),
        )
        .route("/agents/{id}/favorite", post(handlers::agent::toggle_favorite))
        .route("/agents/{id}/invoke", post(handlers::invoke::invoke_agent))
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Simple health check endpoint (no identity required).
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use agent_builder_infra::sqlite::item_store::SqliteItemStore;
    use agent_builder_infra::sqlite::pool::{database_url, DatabasePool};
    use agent_builder_types::config::AppConfig;

    async fn test_app_with(config: AppConfig) -> Router {
        let dir = tempfile::tempdir().unwrap();
        let pool = DatabasePool::new(&database_url(dir.path())).await.unwrap();
        let data_dir = dir.path().to_path_buf();
        // Leak the tempdir so it lives as long as the pool
        std::mem::forget(dir);
        let state = AppState::from_parts(SqliteItemStore::new(pool), config, data_dir).unwrap();
        build_router(state)
    }

    async fn test_app() -> Router {
        test_app_with(AppConfig::default()).await
    }

    fn request(method: &str, uri: &str, user: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header("x-user-id", user);
        }
        match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, body)
    }

    async fn create(app: &Router, user: &str, name: &str, is_public: bool) -> String {
        let (status, body) = send(
            app,
            request(
                "POST",
                "/agents",
                Some(user),
                Some(json!({
                    "name": name,
                    "description": "test agent",
                    "systemPrompt": "Be concise",
                    "modelId": "m1",
                    "isPublic": is_public,
                    "tags": ["test"],
                })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["agentId"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let app = test_app().await;
        let (status, body) = send(&app, request("GET", "/health", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_missing_identity_is_forbidden() {
        let app = test_app().await;
        let (status, body) = send(&app, request("GET", "/agents", None, None)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body["error"].as_str().unwrap().contains("x-user-id"));
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let app = test_app().await;
        let id = create(&app, "alice", "Helper", false).await;

        let (status, body) = send(&app, request("GET", &format!("/agents/{id}"), Some("alice"), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Helper");
        assert_eq!(body["isMyAgent"], true);
        assert_eq!(body["starCount"], 0);

        let (status, _) = send(&app, request("GET", &format!("/agents/{id}"), Some("bob"), None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let app = test_app().await;
        let req = Request::builder()
            .method("POST")
            .uri("/agents")
            .header("x-user-id", "alice")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (status, body) = send(
            &app,
            request("POST", "/agents", Some("alice"), Some(json!({"name": "", "modelId": "m1"}))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("name"));
    }

    #[tokio::test]
    async fn test_unparseable_id_is_not_found() {
        let app = test_app().await;
        let (status, _) = send(&app, request("GET", "/agents/nope", Some("alice"), None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_update_by_non_owner_is_forbidden() {
        let app = test_app().await;
        let id = create(&app, "alice", "Shared", true).await;
        let (status, _) = send(
            &app,
            request(
                "PUT",
                &format!("/agents/{id}"),
                Some("bob"),
                Some(json!({"name": "Mine now", "modelId": "m1"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(
            &app,
            request(
                "PUT",
                &format!("/agents/{id}"),
                Some("alice"),
                Some(json!({"name": "Shared v2", "modelId": "m1", "isPublic": true})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Shared v2");
    }

    #[tokio::test]
    async fn test_public_list_pagination() {
        let app = test_app().await;
        for n in 0..3 {
            create(&app, "alice", &format!("agent-{n}"), true).await;
        }
        create(&app, "alice", "private", false).await;

        let (status, first) = send(&app, request("GET", "/agents/public?limit=2", Some("bob"), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["agents"].as_array().unwrap().len(), 2);
        assert_eq!(first["agents"][0]["name"], "agent-2");
        let token = first["nextToken"].as_str().unwrap().to_string();

        // The legacy parameter name is accepted too.
        let (status, second) = send(
            &app,
            request(
                "GET",
                &format!("/agents/public?limit=2&exclusiveStartKey={token}"),
                Some("bob"),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(second["agents"].as_array().unwrap().len(), 1);
        assert_eq!(second["agents"][0]["name"], "agent-0");
        assert!(second.get("nextToken").is_none());
    }

    #[tokio::test]
    async fn test_bad_page_parameters() {
        let app = test_app().await;
        let (status, _) = send(&app, request("GET", "/agents?nextToken=garbage!", Some("alice"), None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(&app, request("GET", "/agents?limit=lots", Some("alice"), None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_favorite_then_delete_lists_deleted() {
        let app = test_app().await;
        let id = create(&app, "alice", "Helper", true).await;

        let (status, body) = send(&app, request("POST", &format!("/agents/{id}/favorite"), Some("bob"), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"isFavorite": true}));

        let (_, body) = send(&app, request("GET", &format!("/agents/{id}"), Some("bob"), None)).await;
        assert_eq!(body["isFavorite"], true);
        assert_eq!(body["starCount"], 1);

        let (status, body) = send(&app, request("DELETE", &format!("/agents/{id}"), Some("alice"), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["agentId"], id.as_str());
        assert_eq!(body["deleted"], true);

        let (status, body) = send(&app, request("GET", "/agents/favorites", Some("bob"), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["agents"][0]["agentId"], id.as_str());
        assert_eq!(body["agents"][0]["status"], "deleted");
    }

    #[tokio::test]
    async fn test_my_agents_and_clone() {
        let app = test_app().await;
        let id = create(&app, "bob", "Researcher", true).await;

        let (status, body) = send(
            &app,
            request("POST", "/agents/clone", Some("alice"), Some(json!({"agentId": id}))),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["name"], "Researcher (Cloned)");
        assert_eq!(body["isPublic"], false);
        assert_eq!(body["createdBy"], "alice");

        let (status, body) = send(&app, request("GET", "/agents/my", Some("alice"), None)).await;
        assert_eq!(status, StatusCode::OK);
        let agents = body["agents"].as_array().unwrap();
        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0]["isMyAgent"], true);
    }

    #[tokio::test]
    async fn test_invoke_streams_error_event_when_runtime_unconfigured() {
        let app = test_app().await;
        let id = create(&app, "alice", "Helper", false).await;

        let response = app
            .clone()
            .oneshot(request(
                "POST",
                &format!("/agents/{id}/invoke"),
                Some("alice"),
                Some(json!({"prompt": "hello"})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"],
            "application/x-ndjson"
        );
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        let event: Value = serde_json::from_str(text.trim()).unwrap();
        assert!(event["event"]["internalServerException"]["message"].is_string());

        let (status, _) = send(
            &app,
            request(
                "POST",
                &format!("/agents/{id}/invoke"),
                Some("bob"),
                Some(json!({"prompt": "hello"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_custom_identity_header() {
        let mut config = AppConfig::default();
        config.identity.user_header = "x-authenticated-user".to_string();
        let app = test_app_with(config).await;

        let (status, _) = send(&app, request("GET", "/agents", Some("alice"), None)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let req = Request::builder()
            .uri("/agents")
            .header("x-authenticated-user", "alice")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"agents": []}));
    }
}
