//! Hosted assistant integration
//!
//! The session layer talks to an `AssistantBridge`. Production uses the
//! `OpenAI` Assistants API; tests substitute scripted bridges.

mod error;
mod openai;
mod types;

pub use error::AssistantError;
pub use openai::OpenAiAssistant;
pub use types::{AssistantTurn, RunStatus, ToolCallRequest};

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// One round trip to the assistant: deliver a user message, wait for the
/// run to finish, return its text and tool calls.
#[async_trait]
pub trait AssistantBridge: Send + Sync {
    /// `thread_id` is `None` for the first turn of a conversation; the
    /// returned turn carries the thread to reuse afterwards.
    async fn send(
        &self,
        thread_id: Option<&str>,
        user_text: &str,
        cancel: CancellationToken,
    ) -> Result<AssistantTurn, AssistantError>;
}

#[async_trait]
impl<T: AssistantBridge + ?Sized> AssistantBridge for Arc<T> {
    async fn send(
        &self,
        thread_id: Option<&str>,
        user_text: &str,
        cancel: CancellationToken,
    ) -> Result<AssistantTurn, AssistantError> {
        self.as_ref().send(thread_id, user_text, cancel).await
    }
}

/// Logging wrapper for assistant bridges
pub struct LoggingBridge {
    inner: Arc<dyn AssistantBridge>,
}

impl LoggingBridge {
    pub fn new(inner: Arc<dyn AssistantBridge>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl AssistantBridge for LoggingBridge {
    async fn send(
        &self,
        thread_id: Option<&str>,
        user_text: &str,
        cancel: CancellationToken,
    ) -> Result<AssistantTurn, AssistantError> {
        let start = std::time::Instant::now();
        let result = self.inner.send(thread_id, user_text, cancel).await;
        let duration = start.elapsed();

        match &result {
            Ok(turn) => {
                tracing::info!(
                    thread_id = %turn.thread_id,
                    duration_ms = %duration.as_millis(),
                    text_len = turn.text.len(),
                    tool_calls = turn.tool_calls.len(),
                    "Assistant turn completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    thread_id = thread_id.unwrap_or("<new>"),
                    duration_ms = %duration.as_millis(),
                    kind = e.kind(),
                    error = %e,
                    "Assistant turn failed"
                );
            }
        }

        result
    }
}
