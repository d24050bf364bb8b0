//! Append-only conversation transcript
//!
//! `ConversationState` is an immutable value: `append` returns a new state
//! and leaves its input untouched. `SharedTranscript` publishes the latest
//! snapshot of a live conversation to any number of readers.

mod entry;

#[cfg(test)]
mod proptests;

pub use entry::{ConversationId, Entry, EntryContent, Role, ToolPart};

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

/// A conversation and its ordered entries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationState {
    conversation_id: ConversationId,
    entries: Vec<Entry>,
}

impl ConversationState {
    /// Start an empty conversation with a fresh id
    pub fn new() -> Self {
        Self::with_id(ConversationId::new())
    }

    pub fn with_id(conversation_id: ConversationId) -> Self {
        Self {
            conversation_id,
            entries: Vec::new(),
        }
    }

    /// Rebuild a conversation from persisted entries
    pub fn from_entries(conversation_id: ConversationId, entries: Vec<Entry>) -> Self {
        Self {
            conversation_id,
            entries,
        }
    }

    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    /// Return a new state with `entry` at the tail
    #[must_use]
    pub fn append(&self, entry: Entry) -> Self {
        let mut entries = Vec::with_capacity(self.entries.len() + 1);
        entries.extend_from_slice(&self.entries);
        entries.push(entry);
        Self {
            conversation_id: self.conversation_id.clone(),
            entries,
        }
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new()
    }
}

/// Live holder of a conversation's current snapshot.
///
/// Every append swaps in a whole new `Arc<ConversationState>`, so readers
/// holding an older snapshot keep a consistent view. Appends from
/// concurrent tasks are linearized by the channel's internal lock.
#[derive(Clone)]
pub struct SharedTranscript {
    tx: Arc<watch::Sender<Arc<ConversationState>>>,
}

impl SharedTranscript {
    pub fn new(state: ConversationState) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(state));
        Self { tx: Arc::new(tx) }
    }

    pub fn snapshot(&self) -> Arc<ConversationState> {
        Arc::clone(&self.tx.borrow())
    }

    pub fn conversation_id(&self) -> ConversationId {
        self.tx.borrow().conversation_id().clone()
    }

    /// Append to the tail and return the snapshot that contains `entry`
    pub fn append(&self, entry: Entry) -> Arc<ConversationState> {
        let mut published = None;
        self.tx.send_modify(|current| {
            *current = Arc::new(current.append(entry));
            published = Some(Arc::clone(current));
        });
        published.unwrap_or_else(|| self.snapshot())
    }
}
