//! Database schema and types

use crate::transcript::{ConversationId, ConversationState, Entry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS chats (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    title TEXT NOT NULL,
    path TEXT NOT NULL,
    messages TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_chats_user ON chats(user_id, updated_at DESC);
";

/// Longest stored chat title, in characters
pub const TITLE_MAX_CHARS: usize = 100;

/// A persisted conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: String,
    pub title: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub messages: Vec<Entry>,
    pub path: String,
}

impl Chat {
    pub fn from_state(state: &ConversationState, user_id: &str, created_at: DateTime<Utc>) -> Self {
        let id = state.conversation_id().to_string();
        Self {
            title: chat_title(state.entries()),
            path: chat_path(&id),
            id,
            user_id: user_id.to_string(),
            created_at,
            messages: state.entries().to_vec(),
        }
    }

    pub fn into_state(self) -> ConversationState {
        ConversationState::from_entries(ConversationId::from(self.id), self.messages)
    }
}

/// Chat listing row, without messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSummary {
    pub id: String,
    pub title: String,
    pub path: String,
    pub created_at: DateTime<Utc>,
}

/// Title from the first entry's text, cut at `TITLE_MAX_CHARS` characters
pub fn chat_title(entries: &[Entry]) -> String {
    entries
        .first()
        .and_then(Entry::text)
        .map(|text| text.chars().take(TITLE_MAX_CHARS).collect())
        .unwrap_or_default()
}

pub fn chat_path(id: &str) -> String {
    format!("/chat/{id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_truncated_to_100_chars() {
        let long = "x".repeat(250);
        assert_eq!(chat_title(&[Entry::user(long)]).chars().count(), 100);
    }

    #[test]
    fn test_title_counts_characters_not_bytes() {
        let text = "é".repeat(120);
        let title = chat_title(&[Entry::user(text)]);
        assert_eq!(title, "é".repeat(100));
    }

    #[test]
    fn test_short_title_kept() {
        assert_eq!(chat_title(&[Entry::user("AAPL price")]), "AAPL price");
        assert_eq!(chat_title(&[]), "");
    }

    #[test]
    fn test_from_state_fills_path_and_title() {
        let state = ConversationState::with_id("abc".into()).append(Entry::user("hello"));
        let chat = Chat::from_state(&state, "u1", Utc::now());
        assert_eq!(chat.path, "/chat/abc");
        assert_eq!(chat.title, "hello");
        assert_eq!(chat.user_id, "u1");
        assert_eq!(chat.clone().into_state(), state);
    }
}
