//! Axum handlers for `/api/*` routes.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::error::AppError;
use crate::router::RouteOutcome;

use super::ApiState;

#[derive(Debug, Deserialize)]
pub(super) struct AskRequest {
    question: Option<String>,
    user_id: Option<String>,
    conversation_id: Option<String>,
}

/// Build a JSON error response body.
fn json_error(msg: impl std::fmt::Display) -> Json<serde_json::Value> {
    Json(json!({ "error": format!("{msg}"), "status": "error" }))
}

/// GET /api/health
pub(super) async fn health() -> Response {
    (
        StatusCode::OK,
        Json(json!({ "status": "healthy", "message": "API is running" })),
    )
        .into_response()
}

/// POST /api/ask
pub(super) async fn ask(State(state): State<ApiState>, Json(req): Json<AskRequest>) -> Response {
    let Some(question) = req.question.as_deref().map(str::trim).filter(|q| !q.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            json_error("missing required parameter: question"),
        )
            .into_response();
    };
    let Some(user_id) = req.user_id.as_deref().map(str::trim).filter(|u| !u.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            json_error("missing required parameter: user_id"),
        )
            .into_response();
    };

    match state
        .router
        .answer(question, user_id, req.conversation_id.as_deref())
        .await
    {
        Ok(RouteOutcome::Answered(record)) => (StatusCode::OK, Json(record)).into_response(),
        // The failure envelope is a structured result, not a transport error.
        Ok(RouteOutcome::Failed(failure)) => (StatusCode::OK, Json(failure)).into_response(),
        Err(e) => {
            warn!(error = %e, "ask failed hard");
            (StatusCode::SERVICE_UNAVAILABLE, json_error(e)).into_response()
        }
    }
}

/// GET /api/users/{user_id}/conversations
pub(super) async fn conversations(
    State(state): State<ApiState>,
    Path(user_id): Path<String>,
) -> Response {
    match state.router.conversations(&user_id) {
        Ok(listing) => (StatusCode::OK, Json(listing)).into_response(),
        Err(e) => {
            warn!(error = %e, user_id, "conversation listing failed");
            (StatusCode::INTERNAL_SERVER_ERROR, json_error(e)).into_response()
        }
    }
}

/// GET /api/users/{user_id}/conversations/{conversation_id}
pub(super) async fn conversation(
    State(state): State<ApiState>,
    Path((user_id, conversation_id)): Path<(String, String)>,
) -> Response {
    match state.router.conversation(&conversation_id, &user_id) {
        Ok(conversation) => (StatusCode::OK, Json(conversation)).into_response(),
        Err(e @ AppError::NotFound(_)) => {
            (StatusCode::NOT_FOUND, json_error(e)).into_response()
        }
        Err(e) => {
            warn!(error = %e, conversation_id, "conversation fetch failed");
            (StatusCode::INTERNAL_SERVER_ERROR, json_error(e)).into_response()
        }
    }
}
