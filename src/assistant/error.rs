//! Assistant bridge error types

use super::RunStatus;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single assistant turn. None of these are retried.
#[derive(Debug, Error)]
pub enum AssistantError {
    /// Network failure, non-success HTTP status, or an unparseable body
    #[error("Assistant transport error: {0}")]
    Transport(String),
    /// The run reached a terminal state other than `completed`
    #[error("Assistant run ended with status {status}")]
    Run {
        status: RunStatus,
        detail: Option<String>,
    },
    #[error("Assistant run did not finish within {0:?}")]
    Timeout(Duration),
    #[error("Assistant request cancelled")]
    Cancelled,
}

impl AssistantError {
    pub fn transport(message: impl Into<String>) -> Self {
        AssistantError::Transport(message.into())
    }

    pub fn run(status: RunStatus, detail: Option<String>) -> Self {
        AssistantError::Run { status, detail }
    }

    /// Short label for structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            AssistantError::Transport(_) => "transport",
            AssistantError::Run { .. } => "run",
            AssistantError::Timeout(_) => "timeout",
            AssistantError::Cancelled => "cancelled",
        }
    }
}
