//! Persistence seam for sessions

use crate::db::{Chat, ChatSummary, Database};
use crate::transcript::ConversationState;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Chat persistence as seen by the session layer
#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn save_chat(&self, chat: &Chat) -> Result<(), String>;

    /// `None` when the chat does not exist or belongs to someone else
    async fn get_chat(&self, id: &str, user_id: &str) -> Result<Option<Chat>, String>;

    async fn list_chats(&self, user_id: &str) -> Result<Vec<ChatSummary>, String>;

    async fn delete_chat(&self, id: &str, user_id: &str) -> Result<bool, String>;
}

#[async_trait]
impl<T: ChatStore + ?Sized> ChatStore for Arc<T> {
    async fn save_chat(&self, chat: &Chat) -> Result<(), String> {
        self.as_ref().save_chat(chat).await
    }

    async fn get_chat(&self, id: &str, user_id: &str) -> Result<Option<Chat>, String> {
        self.as_ref().get_chat(id, user_id).await
    }

    async fn list_chats(&self, user_id: &str) -> Result<Vec<ChatSummary>, String> {
        self.as_ref().list_chats(user_id).await
    }

    async fn delete_chat(&self, id: &str, user_id: &str) -> Result<bool, String> {
        self.as_ref().delete_chat(id, user_id).await
    }
}

/// Adapter to use `Database` as a `ChatStore`
pub struct DatabaseChatStore {
    db: Database,
}

impl DatabaseChatStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ChatStore for DatabaseChatStore {
    async fn save_chat(&self, chat: &Chat) -> Result<(), String> {
        self.db.save_chat(chat).map_err(|e| e.to_string())
    }

    async fn get_chat(&self, id: &str, user_id: &str) -> Result<Option<Chat>, String> {
        self.db.get_chat(id, user_id).map_err(|e| e.to_string())
    }

    async fn list_chats(&self, user_id: &str) -> Result<Vec<ChatSummary>, String> {
        self.db.list_chats(user_id).map_err(|e| e.to_string())
    }

    async fn delete_chat(&self, id: &str, user_id: &str) -> Result<bool, String> {
        self.db.delete_chat(id, user_id).map_err(|e| e.to_string())
    }
}

/// Writes a conversation's snapshot to the store in the background.
///
/// Without an owner every save is a no-op. Writes for one conversation are
/// serialized, and a snapshot shorter than the last one written is
/// dropped, so the stored transcript never shrinks.
#[derive(Clone)]
pub struct ChatSaver {
    store: Arc<dyn ChatStore>,
    user_id: Option<String>,
    created_at: DateTime<Utc>,
    /// Entry count of the last snapshot successfully written
    written: Arc<tokio::sync::Mutex<usize>>,
}

impl ChatSaver {
    pub fn new(store: Arc<dyn ChatStore>, user_id: Option<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            store,
            user_id,
            created_at,
            written: Arc::new(tokio::sync::Mutex::new(0)),
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn save(&self, state: Arc<ConversationState>) {
        let Some(user_id) = self.user_id.clone() else {
            tracing::debug!(conv_id = %state.conversation_id(), "No identity, chat not saved");
            return;
        };
        if state.is_empty() {
            return;
        }

        let store = Arc::clone(&self.store);
        let written = Arc::clone(&self.written);
        let created_at = self.created_at;
        tokio::spawn(async move {
            let mut written = written.lock().await;
            let len = state.entries().len();
            if len < *written {
                tracing::debug!(
                    conv_id = %state.conversation_id(),
                    messages = len,
                    stored = *written,
                    "Skipping stale chat snapshot"
                );
                return;
            }

            let chat = Chat::from_state(&state, &user_id, created_at);
            match store.save_chat(&chat).await {
                Ok(()) => {
                    *written = len;
                    tracing::debug!(conv_id = %chat.id, messages = len, "Chat saved");
                }
                Err(e) => tracing::warn!(conv_id = %chat.id, error = %e, "Failed to save chat"),
            }
        });
    }
}
