pub mod command;
pub mod handlers;

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::{Response, StatusCode, header},
    routing::{get, post},
};
use std::sync::Arc;
use tracing::error;

use crate::{
    core::types::{ChatId, MessageId},
    notify::MessageBoard,
    scan::ScanOrchestrator,
};
use handlers::{ApiHttpResponse, CommandRequest, get_message, get_status, submit_command};

#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<ScanOrchestrator>,
    pub board: Arc<MessageBoard>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/commands", post(command_handler))
        .route("/chats/:chat_id/messages/:message_id", get(message_handler))
        .route("/status", get(status_handler))
        .fallback(fallback_handler)
        .with_state(state)
}

async fn command_handler(
    State(state): State<ApiState>,
    Json(request): Json<CommandRequest>,
) -> Response<Body> {
    build_response(submit_command(&state.orchestrator, request).await)
}

async fn message_handler(
    Path((chat_id, message_id)): Path<(ChatId, MessageId)>,
    State(state): State<ApiState>,
) -> Response<Body> {
    build_response(get_message(&state.board, chat_id, message_id))
}

async fn status_handler(State(state): State<ApiState>) -> Response<Body> {
    build_response(get_status(&state.orchestrator))
}

async fn fallback_handler() -> Response<Body> {
    build_response(ApiHttpResponse {
        status: 404,
        body: "{\"error\":\"Unknown endpoint\"}".to_string(),
        content_type: "application/json",
    })
}

pub fn build_response(api_response: ApiHttpResponse) -> Response<Body> {
    Response::builder()
        .status(api_response.status)
        .header(header::CONTENT_TYPE, api_response.content_type)
        .body(Body::from(api_response.body))
        .unwrap_or_else(|err| {
            error!("Failed to build response: {err}");
            let mut fallback = Response::new(Body::from("{\"error\":\"Internal server error\"}"));
            *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            fallback
        })
}
