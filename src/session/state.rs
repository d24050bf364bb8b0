//! Turn state types

use crate::assistant::ToolCallRequest;
use serde::Serialize;

/// Where a conversation is in its current turn
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnState {
    /// Ready for user input
    #[default]
    Idle,

    /// User entry appended, waiting for the assistant run to finish
    AwaitingAssistant,

    /// Applying tool calls one at a time. `remaining` excludes the call
    /// currently being applied.
    ApplyingToolEffects {
        current: ToolCallRequest,
        remaining: Vec<ToolCallRequest>,
    },
}

impl TurnState {
    pub fn is_busy(&self) -> bool {
        !matches!(self, TurnState::Idle)
    }

    pub fn name(&self) -> &'static str {
        match self {
            TurnState::Idle => "idle",
            TurnState::AwaitingAssistant => "awaiting_assistant",
            TurnState::ApplyingToolEffects { .. } => "applying_tool_effects",
        }
    }
}

/// Mutable per-conversation context guarded by the turn lock
#[derive(Debug, Default)]
pub struct TurnContext {
    pub state: TurnState,
    /// Remote thread reused across turns of a live conversation
    pub thread_id: Option<String>,
}
