use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::command::parse_scan_command;
use crate::{
    core::types::{ChatId, MessageId, UserId},
    notify::MessageBoard,
    scan::{Admission, ScanOrchestrator},
};

#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ApiHttpResponse {
    pub status: u16,
    pub body: String,
    pub content_type: &'static str,
}

/// Incoming chat command
#[derive(Deserialize, Debug, Clone)]
pub struct CommandRequest {
    pub user_id: UserId,
    pub chat_id: ChatId,
    pub text: String,
}

fn json_response<T: Serialize>(status: StatusCode, payload: &T) -> ApiHttpResponse {
    match serde_json::to_string(payload) {
        Ok(body) => ApiHttpResponse {
            status: status.as_u16(),
            body,
            content_type: "application/json",
        },
        Err(err) => ApiHttpResponse {
            status: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            body: format!("{{\"error\":\"failed to serialize response: {}\"}}", err),
            content_type: "application/json",
        },
    }
}

fn error_response(status: StatusCode, error: impl Into<String>) -> ApiHttpResponse {
    json_response(
        status,
        &ErrorResponse {
            error: error.into(),
        },
    )
}

fn admission_status(admission: &Admission) -> StatusCode {
    match admission {
        Admission::Started { .. } | Admission::Queued { .. } => StatusCode::ACCEPTED,
        Admission::AlreadyQueued { .. } | Admission::AlreadyRunning => StatusCode::CONFLICT,
        Admission::CoolingDown { .. } => StatusCode::TOO_MANY_REQUESTS,
        Admission::Closed | Admission::Dropped { .. } => StatusCode::SERVICE_UNAVAILABLE,
    }
}

pub async fn submit_command(
    orchestrator: &Arc<ScanOrchestrator>,
    request: CommandRequest,
) -> ApiHttpResponse {
    let address = match parse_scan_command(&request.text) {
        Ok(address) => address,
        Err(err) => return error_response(StatusCode::BAD_REQUEST, err.to_string()),
    };

    let admission = orchestrator
        .admit(request.user_id, request.chat_id, &address)
        .await;
    json_response(admission_status(&admission), &admission)
}

pub fn get_message(board: &MessageBoard, chat_id: ChatId, message_id: MessageId) -> ApiHttpResponse {
    match board.get(chat_id, message_id) {
        Some(message) => json_response(StatusCode::OK, &message),
        None => error_response(
            StatusCode::NOT_FOUND,
            format!("Message {message_id} not found in chat {chat_id}"),
        ),
    }
}

pub fn get_status(orchestrator: &ScanOrchestrator) -> ApiHttpResponse {
    json_response(StatusCode::OK, &orchestrator.snapshot())
}
