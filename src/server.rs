use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::proxy;
use crate::token::TokenCache;
use crate::translate::openai_types::{ChatCompletionRequest, EmbeddingRequest, ErrorResponse};
use crate::translate::streaming;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub config: RelayConfig,
    pub client: reqwest::Client,
    pub tokens: TokenCache,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/v1/chat/completions", post(handle_chat))
        .route("/v1/embeddings", post(handle_embeddings))
        .route("/v1/models", get(handle_models))
        .route("/health", get(handle_health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn handle_chat(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let req: ChatCompletionRequest = match serde_json::from_slice(&body) {
        Ok(req) => req,
        Err(e) => {
            let err = ErrorResponse::invalid_request(format!("Invalid request body: {e}"));
            return (StatusCode::BAD_REQUEST, Json(err)).into_response();
        }
    };

    let request_id = Uuid::new_v4();
    let streaming = req.stream.unwrap_or(false);
    info!(
        %request_id,
        model = %req.model,
        streaming,
        messages = req.messages.len(),
        "chat request"
    );

    if streaming {
        handle_chat_stream(state, req, request_id).await
    } else {
        handle_chat_once(state, req, request_id).await
    }
}

async fn handle_chat_once(
    state: Arc<AppState>,
    req: ChatCompletionRequest,
    request_id: Uuid,
) -> Response {
    match proxy::relay_chat(&req, &state.config, &state.client, &state.tokens).await {
        Ok(resp) => {
            // Usage is where the billing collaborator hooks in.
            info!(
                %request_id,
                prompt_tokens = resp.usage.prompt_tokens,
                completion_tokens = resp.usage.completion_tokens,
                total_tokens = resp.usage.total_tokens,
                "chat completed"
            );
            Json(resp).into_response()
        }
        Err(e) => {
            warn!(%request_id, error = %e, "chat relay failed");
            error_response(&e)
        }
    }
}

async fn handle_chat_stream(
    state: Arc<AppState>,
    req: ChatCompletionRequest,
    request_id: Uuid,
) -> Response {
    let upstream =
        match proxy::open_chat_stream(&req, &state.config, &state.client, &state.tokens).await {
            Ok(upstream) => upstream,
            Err(e) => {
                warn!(%request_id, error = %e, "stream setup failed");
                return error_response(&e);
            }
        };

    let model = req.model.clone();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    tokio::spawn(async move {
        match streaming::relay_stream(upstream.bytes_stream(), tx, &model).await {
            Ok(usage) => info!(
                %request_id,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                total_tokens = usage.total_tokens,
                "stream completed"
            ),
            Err(e) => warn!(%request_id, error = %e, "stream relay failed"),
        }
    });

    let events = async_stream::stream! {
        while let Some(payload) = rx.recv().await {
            yield Ok::<Event, Infallible>(Event::default().data(payload));
        }
    };

    Sse::new(events).into_response()
}

async fn handle_embeddings(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let req: EmbeddingRequest = match serde_json::from_slice(&body) {
        Ok(req) => req,
        Err(e) => {
            let err = ErrorResponse::invalid_request(format!("Invalid request body: {e}"));
            return (StatusCode::BAD_REQUEST, Json(err)).into_response();
        }
    };

    let request_id = Uuid::new_v4();
    info!(%request_id, model = %req.model, "embedding request");

    match proxy::relay_embeddings(&req, &state.config, &state.client, &state.tokens).await {
        Ok(resp) => {
            info!(
                %request_id,
                prompt_tokens = resp.usage.prompt_tokens,
                total_tokens = resp.usage.total_tokens,
                "embedding completed"
            );
            Json(resp).into_response()
        }
        Err(e) => {
            warn!(%request_id, error = %e, "embedding relay failed");
            error_response(&e)
        }
    }
}

async fn handle_models(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let mut ids: Vec<String> = proxy::known_models().map(str::to_string).collect();
    for id in state.config.models.keys() {
        if !ids.contains(id) {
            ids.push(id.clone());
        }
    }

    let models: Vec<serde_json::Value> = ids
        .iter()
        .map(|id| {
            serde_json::json!({
                "id": id,
                "object": "model",
                "owned_by": "baidu",
            })
        })
        .collect();

    Json(serde_json::json!({ "data": models, "object": "list" }))
}

async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

fn error_response(err: &RelayError) -> Response {
    let (status, body) = err.to_error_response();
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
    (status, Json(body)).into_response()
}
