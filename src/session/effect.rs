//! Effects produced by state transitions

use crate::assistant::ToolCallRequest;
use crate::transcript::{EntryContent, Role};

/// Effects to be executed, in order, after a state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Append an entry to the tail of the transcript
    AppendEntry { role: Role, content: EntryContent },

    /// Send the user text to the assistant and wait for the run
    RequestAssistant { text: String },

    /// Encode one tool call and append what it yields
    ApplyToolCall { call: ToolCallRequest },

    RememberThread { thread_id: String },

    /// Persist the chat (fire-and-forget)
    SaveChat,

    /// Tell live clients the turn failed
    NotifyError { message: String },

    /// The turn finished with an assistant reply
    TurnComplete,
}

impl Effect {
    pub fn append_user(text: impl Into<String>) -> Self {
        Effect::AppendEntry {
            role: Role::User,
            content: EntryContent::text(text),
        }
    }

    pub fn append_assistant(text: impl Into<String>) -> Self {
        Effect::AppendEntry {
            role: Role::Assistant,
            content: EntryContent::text(text),
        }
    }
}
