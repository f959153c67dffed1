//! Conversation Store: a process-wide registry of conversations keyed
//! by id. Two lock layers, never held together: the store's map lock,
//! and each conversation's own field lock.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Duration, Utc};
use prbuddy_core::{Message, MessageRole};
use tokio::sync::RwLock;

use crate::assembler::{self, AssembledContext};

static ID_SEQUENCE: AtomicU64 = AtomicU64::new(1);

pub fn mint_id(prefix: &str) -> String {
    let sequence = ID_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let nanos = Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_else(|| Utc::now().timestamp_millis().saturating_mul(1_000_000));
    format!("{prefix}-{:x}-{:x}", nanos.unsigned_abs(), sequence)
}

#[derive(Debug)]
struct ConversationInner {
    initial_diff: String,
    messages: Vec<Message>,
    last_activity: DateTime<Utc>,
    diff_truncated: bool,
}

/// A cheaply-cloneable handle to one conversation's state. Cloning a
/// `Conversation` shares the same underlying lock — it does not copy
/// the conversation's data.
#[derive(Debug, Clone)]
pub struct Conversation {
    pub id: String,
    pub ephemeral: bool,
    inner: Arc<RwLock<ConversationInner>>,
}

/// A read-only snapshot of a conversation's fields, taken under its
/// read lock.
#[derive(Debug, Clone)]
pub struct ConversationSnapshot {
    pub id: String,
    pub ephemeral: bool,
    pub initial_diff: String,
    pub messages: Vec<Message>,
    pub last_activity: DateTime<Utc>,
    pub diff_truncated: bool,
}

impl Conversation {
    fn new(id: String, initial_diff: String, ephemeral: bool) -> Self {
        Conversation {
            id,
            ephemeral,
            inner: Arc::new(RwLock::new(ConversationInner {
                initial_diff,
                messages: Vec::new(),
                last_activity: Utc::now(),
                diff_truncated: false,
            })),
        }
    }

    pub async fn add_message(&self, role: MessageRole, content: impl Into<String>) {
        let mut guard = self.inner.write().await;
        guard.messages.push(Message::new(role, content));
        guard.last_activity = Utc::now();
    }

    /// Bulk-replaces the message list. Reserved for the Orchestrator
    /// folding augmented DCE context back into the conversation.
    pub async fn set_messages(&self, messages: Vec<Message>) {
        let mut guard = self.inner.write().await;
        guard.messages = messages;
        guard.last_activity = Utc::now();
    }

    pub async fn snapshot(&self) -> ConversationSnapshot {
        let guard = self.inner.read().await;
        ConversationSnapshot {
            id: self.id.clone(),
            ephemeral: self.ephemeral,
            initial_diff: guard.initial_diff.clone(),
            messages: guard.messages.clone(),
            last_activity: guard.last_activity,
            diff_truncated: guard.diff_truncated,
        }
    }

    /// Assembles the ordered message sequence for an LLM turn. The
    /// only mutation this performs on the conversation is latching
    /// `diff_truncated` once the initial diff has been truncated.
    pub async fn build_context(&self, preamble: &str) -> Vec<Message> {
        let mut guard = self.inner.write().await;
        let AssembledContext { messages, diff_truncated } = assembler::assemble(
            preamble,
            &guard.initial_diff,
            &guard.messages,
            guard.diff_truncated,
            None,
        );
        guard.diff_truncated = diff_truncated;
        messages
    }

    /// Same as `build_context`, but appends a DCE augmentation system
    /// message summarizing filtered Companion data.
    pub async fn build_context_with_dce_summary(
        &self,
        preamble: &str,
        summary: &str,
    ) -> Vec<Message> {
        let mut guard = self.inner.write().await;
        let AssembledContext { messages, diff_truncated } = assembler::assemble(
            preamble,
            &guard.initial_diff,
            &guard.messages,
            guard.diff_truncated,
            Some(summary),
        );
        guard.diff_truncated = diff_truncated;
        messages
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConversationStore {
    conversations: Arc<RwLock<HashMap<String, Conversation>>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        ConversationStore::default()
    }

    /// Creates a new conversation (or replaces one with the same id).
    pub async fn start(&self, id: String, initial_diff: String, ephemeral: bool) -> Conversation {
        let conversation = Conversation::new(id.clone(), initial_diff, ephemeral);
        let mut guard = self.conversations.write().await;
        guard.insert(id, conversation.clone());
        conversation
    }

    pub async fn get(&self, id: &str) -> Option<Conversation> {
        let guard = self.conversations.read().await;
        guard.get(id).cloned()
    }

    pub async fn remove(&self, id: &str) {
        let mut guard = self.conversations.write().await;
        guard.remove(id);
    }

    /// Evicts conversations whose last activity is older than
    /// `max_age`. Intended for a periodic sweep, not the request path.
    pub async fn cleanup(&self, max_age: Duration) {
        let cutoff = Utc::now() - max_age;
        let mut stale = Vec::new();
        {
            let guard = self.conversations.read().await;
            for (id, conversation) in guard.iter() {
                if conversation.snapshot().await.last_activity < cutoff {
                    stale.push(id.clone());
                }
            }
        }
        if stale.is_empty() {
            return;
        }
        let mut guard = self.conversations.write().await;
        for id in stale {
            guard.remove(&id);
        }
    }

    pub async fn len(&self) -> usize {
        self.conversations.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn start_then_get_round_trips() {
        let store = ConversationStore::new();
        store.start("c1".to_string(), String::new(), false).await;
        let conversation = store.get("c1").await.expect("present");
        assert_eq!(conversation.id, "c1");
    }

    #[tokio::test]
    async fn remove_makes_get_return_none() {
        let store = ConversationStore::new();
        store.start("c1".to_string(), String::new(), false).await;
        store.remove("c1").await;
        assert!(store.get("c1").await.is_none());
    }

    #[tokio::test]
    async fn add_message_bumps_last_activity_and_appends() {
        let store = ConversationStore::new();
        let conversation = store.start("c1".to_string(), String::new(), false).await;
        let before = conversation.snapshot().await.last_activity;
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        conversation.add_message(MessageRole::User, "hello").await;
        let snapshot = conversation.snapshot().await;
        assert_eq!(snapshot.messages.len(), 1);
        assert!(snapshot.last_activity >= before);
    }

    #[tokio::test]
    async fn cleanup_evicts_stale_but_keeps_fresh() {
        let store = ConversationStore::new();
        store.start("stale".to_string(), String::new(), false).await;
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        store.start("fresh".to_string(), String::new(), false).await;

        store.cleanup(Duration::milliseconds(10)).await;

        assert!(store.get("stale").await.is_none());
        assert!(store.get("fresh").await.is_some());
    }
}
