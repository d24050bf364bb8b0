//! Events that drive the turn state machine

use crate::assistant::AssistantTurn;

#[derive(Debug, Clone)]
pub enum TurnEvent {
    UserMessage { text: String },
    AssistantReplied { turn: AssistantTurn },
    AssistantFailed { message: String },
    /// The in-flight tool call finished, whether or not it produced entries
    ToolCallApplied,
}
