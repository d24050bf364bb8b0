//! Registry of live sessions

use super::{ChatSaver, ChatStore, SessionController, SessionSettings};
use crate::assistant::AssistantBridge;
use crate::db::ChatSummary;
use crate::transcript::{ConversationId, ConversationState};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// How often the sweeper looks for idle sessions
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Manager for all live conversations
pub struct SessionManager {
    store: Arc<dyn ChatStore>,
    bridge: Arc<dyn AssistantBridge>,
    settings: SessionSettings,
    sessions: RwLock<HashMap<ConversationId, Arc<SessionController>>>,
}

impl SessionManager {
    pub fn new(
        store: Arc<dyn ChatStore>,
        bridge: Arc<dyn AssistantBridge>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            store,
            bridge,
            settings,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Start an empty conversation owned by `user_id`
    pub async fn create(&self, user_id: Option<&str>) -> Arc<SessionController> {
        let session = Arc::new(SessionController::new(
            ConversationState::new(),
            Arc::clone(&self.bridge),
            ChatSaver::new(
                Arc::clone(&self.store),
                user_id.map(String::from),
                Utc::now(),
            ),
            self.settings,
        ));

        let conv_id = session.conversation_id();
        tracing::info!(conv_id = %conv_id, authenticated = user_id.is_some(), "Session created");
        self.sessions
            .write()
            .await
            .insert(conv_id, Arc::clone(&session));
        session
    }

    /// Get a live session or load it from the store.
    ///
    /// A session is only returned to the identity that owns it. Sessions
    /// without an owner are live-only and never loaded from the store.
    pub async fn get(
        &self,
        id: &ConversationId,
        user_id: Option<&str>,
    ) -> Result<Option<Arc<SessionController>>, String> {
        {
            let sessions = self.sessions.read().await;
            if let Some(session) = sessions.get(id) {
                return Ok((session.owner() == user_id).then(|| Arc::clone(session)));
            }
        }

        let Some(user_id) = user_id else {
            return Ok(None);
        };
        let Some(chat) = self.store.get_chat(id.as_str(), user_id).await? else {
            return Ok(None);
        };

        let created_at = chat.created_at;
        let session = Arc::new(SessionController::new(
            chat.into_state(),
            Arc::clone(&self.bridge),
            ChatSaver::new(
                Arc::clone(&self.store),
                Some(user_id.to_string()),
                created_at,
            ),
            self.settings,
        ));

        // Another request may have loaded it meanwhile; keep the first
        let mut sessions = self.sessions.write().await;
        let session = sessions.entry(id.clone()).or_insert(session);
        tracing::info!(conv_id = %id, entries = session.snapshot().entries().len(), "Session loaded");
        Ok(Some(Arc::clone(session)))
    }

    pub async fn list(&self, user_id: &str) -> Result<Vec<ChatSummary>, String> {
        self.store.list_chats(user_id).await
    }

    /// Forget a conversation, live and stored.
    ///
    /// Anonymous sessions can be deleted by anonymous callers; they were
    /// never stored.
    pub async fn delete(&self, id: &ConversationId, user_id: Option<&str>) -> Result<bool, String> {
        let mut sessions = self.sessions.write().await;
        let live_owned = sessions.get(id).is_some_and(|s| s.owner() == user_id);
        if live_owned {
            if let Some(session) = sessions.remove(id) {
                session.cancel();
            }
        }
        drop(sessions);

        let stored = match user_id {
            Some(user_id) => self.store.delete_chat(id.as_str(), user_id).await?,
            None => false,
        };
        Ok(stored || live_owned)
    }

    /// Drop live sessions that are idle, unwatched and not running a turn.
    /// Owned chats reload from the store on next access.
    pub async fn evict_idle(&self, ttl: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|id, session| {
            let keep =
                session.is_busy() || session.subscriber_count() > 0 || session.idle_for() < ttl;
            if !keep {
                tracing::debug!(conv_id = %id, authenticated = session.owner().is_some(), "Evicting idle session");
            }
            keep
        });
        before - sessions.len()
    }

    pub async fn live_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Periodically evict idle sessions until the manager is dropped
    pub fn spawn_sweeper(self: &Arc<Self>, ttl: Duration) {
        let manager = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
            // First tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(manager) = manager.upgrade() else {
                    break;
                };
                let evicted = manager.evict_idle(ttl).await;
                if evicted > 0 {
                    let live = manager.live_count().await;
                    tracing::info!(evicted, live, "Evicted idle sessions");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Chat;
    use crate::session::testing::{InMemoryChatStore, MockBridge};
    use crate::transcript::Entry;

    fn manager() -> (SessionManager, Arc<MockBridge>, Arc<InMemoryChatStore>) {
        let bridge = Arc::new(MockBridge::new());
        let store = Arc::new(InMemoryChatStore::new());
        let manager = SessionManager::new(store.clone(), bridge.clone(), SessionSettings::default());
        (manager, bridge, store)
    }

    #[tokio::test]
    async fn test_live_session_is_owner_only() {
        let (manager, _bridge, _store) = manager();
        let session = manager.create(Some("alice")).await;
        let id = session.conversation_id();

        assert!(manager.get(&id, Some("alice")).await.unwrap().is_some());
        assert!(manager.get(&id, Some("bob")).await.unwrap().is_none());
        assert!(manager.get(&id, None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_anonymous_session_is_live_only() {
        let (manager, _bridge, _store) = manager();
        let session = manager.create(None).await;
        let id = session.conversation_id();

        assert!(manager.get(&id, None).await.unwrap().is_some());
        assert!(manager.get(&"unknown".into(), None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stored_chat_is_loaded() {
        let (manager, bridge, store) = manager();
        let state = ConversationState::with_id("saved".into())
            .append(Entry::user("AAPL price"))
            .append(Entry::assistant("Here's AAPL"));
        store.insert(Chat::from_state(&state, "alice", Utc::now()));

        let session = manager
            .get(&"saved".into(), Some("alice"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(session.snapshot().entries(), state.entries());
        assert_eq!(session.render().len(), 2);

        // Loaded sessions start a fresh assistant thread
        bridge.queue_reply("again", vec![]);
        session.submit_user_message("more").await.unwrap();
        assert_eq!(bridge.recorded_requests()[0].thread_id, None);
        assert_eq!(session.snapshot().entries().len(), 4);
    }

    #[tokio::test]
    async fn test_stored_chat_of_other_user_is_hidden() {
        let (manager, _bridge, store) = manager();
        let state = ConversationState::with_id("saved".into()).append(Entry::user("hi"));
        store.insert(Chat::from_state(&state, "alice", Utc::now()));

        assert!(manager.get(&"saved".into(), Some("bob")).await.unwrap().is_none());
        assert!(manager.get(&"saved".into(), None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let (manager, bridge, store) = manager();
        let session = manager.create(Some("alice")).await;
        bridge.queue_reply("hello", vec![]);
        session.submit_user_message("hi").await.unwrap();
        store.wait_for_saves(1).await;

        let chats = manager.list("alice").await.unwrap();
        assert_eq!(chats.len(), 1);
        assert_eq!(chats[0].title, "hi");

        let id = session.conversation_id();
        assert!(!manager.delete(&id, Some("bob")).await.unwrap());
        assert!(!manager.delete(&id, None).await.unwrap());
        assert!(manager.delete(&id, Some("alice")).await.unwrap());
        assert!(manager.get(&id, Some("alice")).await.unwrap().is_none());
        assert!(manager.list("alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_anonymous_session_can_be_deleted() {
        let (manager, _bridge, _store) = manager();
        let session = manager.create(None).await;
        let id = session.conversation_id();

        assert!(manager.delete(&id, None).await.unwrap());
        assert!(manager.get(&id, None).await.unwrap().is_none());
        assert_eq!(manager.live_count().await, 0);
    }

    #[tokio::test]
    async fn test_idle_sessions_are_evicted() {
        let (manager, _bridge, _store) = manager();
        let idle = manager.create(None).await;
        let watched = manager.create(None).await;
        let _rx = watched.subscribe();

        // Nothing is idle for an hour yet
        assert_eq!(manager.evict_idle(Duration::from_secs(3600)).await, 0);

        assert_eq!(manager.evict_idle(Duration::ZERO).await, 1);
        assert!(manager.get(&idle.conversation_id(), None).await.unwrap().is_none());
        assert!(manager.get(&watched.conversation_id(), None).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_evicted_owned_chat_reloads_from_store() {
        let (manager, bridge, store) = manager();
        let session = manager.create(Some("alice")).await;
        let id = session.conversation_id();
        bridge.queue_reply("hello", vec![]);
        session.submit_user_message("hi").await.unwrap();
        store.wait_for_saves(1).await;
        drop(session);

        assert_eq!(manager.evict_idle(Duration::ZERO).await, 1);
        let reloaded = manager.get(&id, Some("alice")).await.unwrap().unwrap();
        assert_eq!(reloaded.snapshot().entries().len(), 2);
    }
}
