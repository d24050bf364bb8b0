//! Transcript entry types

use crate::tools::ToolResult;
use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

const ENTRY_ID_LEN: usize = 7;

/// Opaque conversation identifier, fixed for the lifetime of a conversation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<String> for ConversationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ConversationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Author of a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
}

/// A tool result as loaded from storage.
///
/// Rows written by newer builds may name tools this build does not know;
/// those are kept verbatim so they survive a reload and a re-save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolPart {
    Known(ToolResult),
    Unrecognized(UnrecognizedTool),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnrecognizedTool {
    #[serde(rename = "toolName")]
    pub tool_name: String,
    #[serde(default)]
    pub result: Value,
}

/// Entry payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntryContent {
    Text(String),
    ToolResults(Vec<ToolPart>),
    /// Legacy or malformed content; never produced by this build
    Other(Value),
}

impl EntryContent {
    pub fn text(text: impl Into<String>) -> Self {
        EntryContent::Text(text.into())
    }

    pub fn tool_results(results: impl IntoIterator<Item = ToolResult>) -> Self {
        EntryContent::ToolResults(results.into_iter().map(ToolPart::Known).collect())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            EntryContent::Text(text) => Some(text),
            EntryContent::ToolResults(_) | EntryContent::Other(_) => None,
        }
    }
}

/// One immutable record in the transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: String,
    pub role: Role,
    pub content: EntryContent,
    /// Display only; position in the transcript is the ordering signal
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Entry {
    pub fn new(role: Role, content: EntryContent) -> Self {
        Self {
            id: new_entry_id(),
            role,
            content,
            created_at: Utc::now(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, EntryContent::text(text))
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, EntryContent::text(text))
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, EntryContent::text(text))
    }

    pub fn tool(results: impl IntoIterator<Item = ToolResult>) -> Self {
        Self::new(Role::Tool, EntryContent::tool_results(results))
    }

    pub fn text(&self) -> Option<&str> {
        self.content.as_text()
    }
}

fn new_entry_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ENTRY_ID_LEN)
        .map(char::from)
        .collect()
}
