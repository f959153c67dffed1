//! Companion Registry: the single process-wide map from conversation
//! id to Companion. Companions never hold a pointer back to their
//! Conversation — only this registry's key — which is what keeps the
//! two subsystems from forming a cycle.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use prbuddy_core::Task;
use prbuddy_vcs::DiffSource;
use tokio::sync::RwLock;

use crate::companion::Companion;

#[derive(Clone)]
pub struct CompanionRegistry {
    companions: Arc<RwLock<HashMap<String, Companion>>>,
    diff_source: Arc<DiffSource>,
    poll_interval: Duration,
}

impl CompanionRegistry {
    pub fn new(diff_source: Arc<DiffSource>, poll_interval: Duration) -> Self {
        CompanionRegistry {
            companions: Arc::new(RwLock::new(HashMap::new())),
            diff_source,
            poll_interval,
        }
    }

    pub async fn get(&self, conversation_id: &str) -> Option<Companion> {
        self.companions.read().await.get(conversation_id).cloned()
    }

    /// Creates a Companion for `conversation_id` if one does not
    /// already exist, then returns it.
    pub async fn get_or_create(&self, conversation_id: &str, initial_tasks: Vec<Task>) -> Companion {
        if let Some(existing) = self.get(conversation_id).await {
            return existing;
        }
        let mut guard = self.companions.write().await;
        guard
            .entry(conversation_id.to_string())
            .or_insert_with(|| {
                Companion::with_poll_interval(
                    conversation_id.to_string(),
                    Arc::clone(&self.diff_source),
                    initial_tasks,
                    self.poll_interval,
                )
            })
            .clone()
    }

    /// Removes the Companion for `conversation_id` and aborts its
    /// background poller, if one was running, so it does not keep
    /// ticking against state nothing references anymore.
    pub async fn remove(&self, conversation_id: &str) {
        let removed = self.companions.write().await.remove(conversation_id);
        if let Some(companion) = removed {
            companion.stop().await;
        }
    }

    pub async fn len(&self) -> usize {
        self.companions.read().await.len()
    }
}
