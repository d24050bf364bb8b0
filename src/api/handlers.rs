//! HTTP request handlers

use super::sse::{purchase_stream, sse_stream};
use super::types::{
    CancelResponse, ChatListResponse, ChatResponse, ErrorResponse, MessageRequest,
    MessageResponse, PurchaseRequest, SuccessResponse,
};
use super::AppState;
use crate::db::chat_path;
use crate::session::{SessionController, TransitionError};
use crate::tools::{self, PurchaseStatus, ToolDefinition};
use crate::transcript::ConversationId;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;

/// Header set by the fronting auth proxy
pub const USER_ID_HEADER: &str = "x-user-id";

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Chat listing and creation
        .route("/api/chats", get(list_chats))
        .route("/api/chats/new", post(create_chat))
        // Chat retrieval and removal
        .route("/api/chats/:id", get(get_chat).delete(delete_chat))
        // SSE streaming
        .route("/api/chats/:id/stream", get(stream_chat))
        // User actions
        .route("/api/chats/:id/messages", post(submit_message))
        .route("/api/chats/:id/cancel", post(cancel_chat))
        .route("/api/chats/:id/purchase", post(confirm_purchase))
        // Tool definitions
        .route("/api/tools", get(list_tools))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

/// Authenticated identity, if any
fn identity(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

async fn find_session(
    state: &AppState,
    id: &str,
    headers: &HeaderMap,
) -> Result<Arc<SessionController>, AppError> {
    state
        .sessions
        .get(&ConversationId::from(id), identity(headers))
        .await
        .map_err(AppError::Internal)?
        .ok_or_else(|| AppError::NotFound(format!("Chat not found: {id}")))
}

fn chat_response(session: &SessionController) -> ChatResponse {
    let id = session.conversation_id().to_string();
    ChatResponse {
        path: chat_path(&id),
        id,
        entries: session.render(),
        busy: session.is_busy(),
    }
}

// ============================================================
// Chats
// ============================================================

async fn list_chats(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ChatListResponse>, AppError> {
    let Some(user_id) = identity(&headers) else {
        return Ok(Json(ChatListResponse { chats: Vec::new() }));
    };

    let chats = state
        .sessions
        .list(user_id)
        .await
        .map_err(AppError::Internal)?;

    Ok(Json(ChatListResponse { chats }))
}

async fn create_chat(State(state): State<AppState>, headers: HeaderMap) -> Json<ChatResponse> {
    let session = state.sessions.create(identity(&headers)).await;
    Json(chat_response(&session))
}

/// Load a chat. Without an identity an unknown chat is `null`, not an error.
async fn get_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Option<ChatResponse>>, AppError> {
    match find_session(&state, &id, &headers).await {
        Ok(session) => Ok(Json(Some(chat_response(&session)))),
        Err(AppError::NotFound(_)) if identity(&headers).is_none() => Ok(Json(None)),
        Err(e) => Err(e),
    }
}

async fn delete_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<SuccessResponse>, AppError> {
    let removed = state
        .sessions
        .delete(&ConversationId::from(id.as_str()), identity(&headers))
        .await
        .map_err(AppError::Internal)?;

    if !removed {
        return Err(AppError::NotFound(format!("Chat not found: {id}")));
    }
    Ok(Json(SuccessResponse { success: true }))
}

// ============================================================
// SSE Streaming
// ============================================================

async fn stream_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let session = find_session(&state, &id, &headers).await?;

    // Subscribe before rendering so no append falls between the two
    let broadcast_rx = session.subscribe();
    let entries = session.render();

    Ok(sse_stream(id, entries, broadcast_rx))
}

// ============================================================
// User Actions
// ============================================================

async fn submit_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<MessageRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let session = find_session(&state, &id, &headers).await?;

    // The turn runs on its own task so a client disconnect cannot drop it
    // halfway through
    let outcome = tokio::spawn(async move { session.submit_user_message(&req.text).await })
        .await
        .map_err(|e| AppError::Internal(format!("Turn task failed: {e}")))?
        .map_err(|e| match e {
            TransitionError::EmptyMessage | TransitionError::AgentBusy => {
                AppError::BadRequest(e.to_string())
            }
            TransitionError::InvalidTransition(_) => AppError::Internal(e.to_string()),
        })?;

    Ok(Json(MessageResponse {
        entries: outcome.map(|o| o.entries),
    }))
}

async fn cancel_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<CancelResponse>, AppError> {
    let session = find_session(&state, &id, &headers).await?;
    session.cancel();
    Ok(Json(CancelResponse { ok: true }))
}

async fn confirm_purchase(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<PurchaseRequest>,
) -> Result<impl IntoResponse, AppError> {
    if tools::purchase_status(req.amount) == PurchaseStatus::Expired {
        return Err(AppError::BadRequest(format!(
            "Invalid amount: {}",
            req.amount
        )));
    }
    if !req.price.is_finite() || req.price < 0.0 {
        return Err(AppError::BadRequest(format!("Invalid price: {}", req.price)));
    }

    let session = find_session(&state, &id, &headers).await?;
    let progress = session.confirm_purchase(&req.symbol, req.price, req.amount);
    Ok(purchase_stream(progress))
}

// ============================================================
// Tools & Version
// ============================================================

async fn list_tools() -> Json<Vec<ToolDefinition>> {
    Json(tools::definitions())
}

async fn get_version() -> &'static str {
    concat!("stock-assistant ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
