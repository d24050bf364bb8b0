//! API request and response types

use crate::db::ChatSummary;
use crate::projection::RenderEntry;
use serde::{Deserialize, Serialize};

/// Request to send a chat message
#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub text: String,
}

/// Request to confirm a purchase shown in a purchase card
#[derive(Debug, Deserialize)]
pub struct PurchaseRequest {
    pub symbol: String,
    pub price: f64,
    pub amount: i64,
}

/// A conversation and its current projection
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub id: String,
    pub path: String,
    pub entries: Vec<RenderEntry>,
    pub busy: bool,
}

/// Response with the user's chats
#[derive(Debug, Serialize)]
pub struct ChatListResponse {
    pub chats: Vec<ChatSummary>,
}

/// Result of one turn. `entries` is `null` when the assistant failed.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub entries: Option<Vec<RenderEntry>>,
}

/// Response for cancel action
#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub ok: bool,
}

/// Generic success response
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
