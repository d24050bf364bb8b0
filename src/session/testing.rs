//! Mock implementations for testing
//!
//! These mocks enable session testing without network or disk I/O.

use super::traits::ChatStore;
use crate::assistant::{AssistantBridge, AssistantError, AssistantTurn, ToolCallRequest};
use crate::db::{Chat, ChatSummary};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Mock Assistant Bridge
// ============================================================================

/// A recorded `send` call
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeRequest {
    pub thread_id: Option<String>,
    pub text: String,
}

/// Bridge that returns queued turns
#[allow(dead_code)]
pub struct MockBridge {
    responses: Mutex<VecDeque<Result<AssistantTurn, AssistantError>>>,
    /// Record of all requests made
    pub requests: Mutex<Vec<BridgeRequest>>,
}

#[allow(dead_code)]
impl MockBridge {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful reply on `thread_1`
    pub fn queue_reply(&self, text: &str, tool_calls: Vec<ToolCallRequest>) {
        self.queue(Ok(AssistantTurn {
            thread_id: "thread_1".to_string(),
            text: text.to_string(),
            tool_calls,
        }));
    }

    pub fn queue_error(&self, error: AssistantError) {
        self.queue(Err(error));
    }

    pub fn queue(&self, result: Result<AssistantTurn, AssistantError>) {
        self.responses.lock().unwrap().push_back(result);
    }

    pub fn recorded_requests(&self) -> Vec<BridgeRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn record(&self, thread_id: Option<&str>, text: &str) {
        self.requests.lock().unwrap().push(BridgeRequest {
            thread_id: thread_id.map(String::from),
            text: text.to_string(),
        });
    }

    fn next(&self) -> Result<AssistantTurn, AssistantError> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AssistantError::transport("No mock response queued")))
    }
}

impl Default for MockBridge {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AssistantBridge for MockBridge {
    async fn send(
        &self,
        thread_id: Option<&str>,
        user_text: &str,
        _cancel: CancellationToken,
    ) -> Result<AssistantTurn, AssistantError> {
        self.record(thread_id, user_text);
        self.next()
    }
}

// ============================================================================
// Delayed Mock Bridge (for cancellation testing)
// ============================================================================

/// Bridge that waits before replying and honours cancellation
pub struct DelayedMockBridge {
    inner: MockBridge,
    delay: Duration,
    /// Notified when a request starts (for test synchronization)
    pub request_started: Arc<Notify>,
}

impl DelayedMockBridge {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: MockBridge::new(),
            delay,
            request_started: Arc::new(Notify::new()),
        }
    }

    pub fn queue_reply(&self, text: &str, tool_calls: Vec<ToolCallRequest>) {
        self.inner.queue_reply(text, tool_calls);
    }
}

#[async_trait]
impl AssistantBridge for DelayedMockBridge {
    async fn send(
        &self,
        thread_id: Option<&str>,
        user_text: &str,
        cancel: CancellationToken,
    ) -> Result<AssistantTurn, AssistantError> {
        self.inner.record(thread_id, user_text);
        self.request_started.notify_one();

        // Race between delay and cancellation
        tokio::select! {
            () = tokio::time::sleep(self.delay) => self.inner.next(),
            () = cancel.cancelled() => Err(AssistantError::Cancelled),
        }
    }
}

// ============================================================================
// In-Memory Chat Store
// ============================================================================

/// In-memory chat store for testing
#[allow(dead_code)]
pub struct InMemoryChatStore {
    chats: Mutex<HashMap<String, Chat>>,
    saves: Mutex<Vec<Chat>>,
    fail_saves: AtomicBool,
    /// Extra latency for saves of a given entry count
    slow_saves: Mutex<HashMap<usize, Duration>>,
    /// Notified after every save attempt
    pub saved: Notify,
}

#[allow(dead_code)]
impl InMemoryChatStore {
    pub fn new() -> Self {
        Self {
            chats: Mutex::new(HashMap::new()),
            saves: Mutex::new(Vec::new()),
            fail_saves: AtomicBool::new(false),
            slow_saves: Mutex::new(HashMap::new()),
            saved: Notify::new(),
        }
    }

    /// Make every later save fail
    pub fn fail_saves(&self) {
        self.fail_saves.store(true, Ordering::SeqCst);
    }

    /// Delay every save of a chat holding `entries` messages
    pub fn slow_saves_of(&self, entries: usize, delay: Duration) {
        self.slow_saves.lock().unwrap().insert(entries, delay);
    }

    pub fn insert(&self, chat: Chat) {
        self.chats.lock().unwrap().insert(chat.id.clone(), chat);
    }

    pub fn stored(&self, id: &str) -> Option<Chat> {
        self.chats.lock().unwrap().get(id).cloned()
    }

    pub fn save_count(&self) -> usize {
        self.saves.lock().unwrap().len()
    }

    /// Wait until at least `count` saves were attempted
    pub async fn wait_for_saves(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let notified = self.saved.notified();
                if self.save_count() >= count {
                    return;
                }
                notified.await;
            }
        })
        .await
        .expect("timed out waiting for chat saves");
    }
}

impl Default for InMemoryChatStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatStore for InMemoryChatStore {
    async fn save_chat(&self, chat: &Chat) -> Result<(), String> {
        let delay = self.slow_saves.lock().unwrap().get(&chat.messages.len()).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.saves.lock().unwrap().push(chat.clone());
        let result = if self.fail_saves.load(Ordering::SeqCst) {
            Err("disk full".to_string())
        } else {
            self.insert(chat.clone());
            Ok(())
        };
        self.saved.notify_one();
        result
    }

    async fn get_chat(&self, id: &str, user_id: &str) -> Result<Option<Chat>, String> {
        Ok(self.stored(id).filter(|chat| chat.user_id == user_id))
    }

    async fn list_chats(&self, user_id: &str) -> Result<Vec<ChatSummary>, String> {
        Ok(self
            .chats
            .lock()
            .unwrap()
            .values()
            .filter(|chat| chat.user_id == user_id)
            .map(|chat| ChatSummary {
                id: chat.id.clone(),
                title: chat.title.clone(),
                path: chat.path.clone(),
                created_at: chat.created_at,
            })
            .collect())
    }

    async fn delete_chat(&self, id: &str, user_id: &str) -> Result<bool, String> {
        let mut chats = self.chats.lock().unwrap();
        if chats.get(id).is_some_and(|chat| chat.user_id == user_id) {
            chats.remove(id);
            Ok(true)
        } else {
            Ok(false)
        }
    }
}
