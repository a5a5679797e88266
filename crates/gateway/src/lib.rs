//! HTTP API gateway for Bariatric GPT.
//!
//! A thin surface over the pipeline:
//!
//! - `POST /v1/chat`: run one turn
//! - `POST /api/v1/invoke_agent_graph`: same body, legacy path
//! - `GET  /health`: liveness
//!
//! Built on Axum.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    extract::State,
    http::{Method, StatusCode, header},
    response::Json,
    routing::{get, post},
};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tracing::info;

use bariatric_agent::{Pipeline, TurnRequest, TurnResponse};

/// Request bodies above this size are rejected.
const MAX_BODY_BYTES: usize = 256 * 1024;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub pipeline: Arc<Pipeline>,
}

type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
pub fn build_router(pipeline: Arc<Pipeline>) -> Router {
    let state = Arc::new(GatewayState { pipeline });

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health_handler))
        .route("/v1/chat", post(chat_handler))
        .route("/api/v1/invoke_agent_graph", post(chat_handler))
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server.
pub async fn start(config: bariatric_config::AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let pipeline = Arc::new(bariatric_agent::build_pipeline(&config)?);
    let app = build_router(pipeline);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

async fn chat_handler(
    State(state): State<SharedState>,
    Json(payload): Json<TurnRequest>,
) -> Result<Json<TurnResponse>, (StatusCode, Json<ErrorResponse>)> {
    if payload.message.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "message must not be empty".into(),
            }),
        ));
    }

    info!(
        user_id = %payload.user_id,
        message_len = payload.message.len(),
        debug = payload.debug,
        "Chat request"
    );

    // memory update runs detached
    let response = state.pipeline.handle(payload).await;
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use bariatric_agent::LanguageModel;
    use bariatric_core::error::ProviderError;
    use bariatric_core::message::Message;
    use bariatric_core::provider::{Provider, ProviderRequest, ProviderResponse};
    use bariatric_knowledge::NoopIndex;
    use bariatric_tools::{InMemoryProfileStore, ProfileMealRecorder};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    struct FixedProvider;

    #[async_trait]
    impl Provider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn complete(
            &self,
            _request: ProviderRequest,
        ) -> Result<ProviderResponse, ProviderError> {
            Ok(ProviderResponse {
                message: Message::assistant("Sip water slowly between meals."),
                usage: None,
                model: "fixed".into(),
            })
        }
    }

    fn test_app() -> Router {
        let store = Arc::new(InMemoryProfileStore::default());
        let pipeline = Pipeline::builder(
            LanguageModel::new(Arc::new(FixedProvider), "fixed"),
            Arc::new(NoopIndex),
            Arc::new(ProfileMealRecorder::new(store)),
        )
        .build();
        build_router(Arc::new(pipeline))
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_endpoint() {
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = test_app().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn chat_returns_both_renderings() {
        let req = post_json(
            "/v1/chat",
            serde_json::json!({"message": "Can I drink with meals?", "user_id": "4"}),
        );

        let response = test_app().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["response"], "Sip water slowly between meals.");
        assert_eq!(body["response_text"], body["response"]);
        assert!(body["response_markdown"]
            .as_str()
            .unwrap()
            .contains("Sip water slowly"));
        assert!(body["conversation_log"].as_str().unwrap().contains("Can I drink"));
        assert!(body.get("debug").is_none());
    }

    #[tokio::test]
    async fn legacy_path_accepts_same_body() {
        let req = post_json(
            "/api/v1/invoke_agent_graph",
            serde_json::json!({"message": "hi", "userId": "4", "debug": true}),
        );

        let response = test_app().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["debug"]["short_circuit"], "greeting");
    }

    #[tokio::test]
    async fn empty_message_rejected() {
        let req = post_json("/v1/chat", serde_json::json!({"message": "   "}));

        let response = test_app().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["error"]
            .as_str()
            .unwrap()
            .contains("empty"));
    }

    #[tokio::test]
    async fn malformed_body_is_client_error() {
        let req = Request::builder()
            .method("POST")
            .uri("/v1/chat")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let response = test_app().oneshot(req).await.unwrap();
        assert!(response.status().is_client_error());
    }
}
