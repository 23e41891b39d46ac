//! Bounded, persisted conversation history.
//!
//! The whole collection is serialized as one JSON array under a single key
//! and written back on every change. Order is most-recently-created first:
//! new conversations go to the front, updates keep their position, and the
//! tail is dropped once the bound is exceeded.
//!
//! The in-memory list is authoritative for the lifetime of the store. A
//! failed write is reported to the caller but does not undo the change.

use std::collections::HashSet;
use std::rc::Rc;

use biobrain_types::{
    Result,
    config::MAX_CONVERSATIONS,
    conversation::{Conversation, ConversationSummary},
};

use crate::ports::StoragePort;

pub const CONVERSATIONS_KEY: &str = "biobrain:conversations";

pub struct ConversationStore {
    storage: Rc<dyn StoragePort>,
    limit: usize,
    entries: Vec<Conversation>,
}

impl ConversationStore {
    /// Open the store with the default bound.
    pub async fn open(storage: Rc<dyn StoragePort>) -> Self {
        Self::open_with_limit(storage, MAX_CONVERSATIONS).await
    }

    pub async fn open_with_limit(storage: Rc<dyn StoragePort>, limit: usize) -> Self {
        let mut store = Self {
            storage,
            limit: limit.max(1),
            entries: Vec::new(),
        };
        store.reload().await;
        store
    }

    /// Re-read the persisted collection. Unreadable or corrupted data
    /// yields an empty store.
    pub async fn reload(&mut self) {
        self.entries = match self.storage.get(CONVERSATIONS_KEY).await {
            Ok(Some(text)) => match serde_json::from_str::<Vec<Conversation>>(&text) {
                Ok(entries) => sanitize(entries, self.limit),
                Err(e) => {
                    log::warn!("Stored conversations are corrupted ({}), starting empty", e);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                log::warn!(
                    "Failed to read conversations from {} ({}), starting empty",
                    self.storage.backend_name(),
                    e
                );
                Vec::new()
            }
        };
    }

    /// Insert or replace by id, then persist.
    ///
    /// Conversations without messages are ignored.
    pub async fn upsert(&mut self, conversation: Conversation) -> Result<()> {
        if conversation.messages.is_empty() {
            log::debug!("Skipping save of empty conversation {}", conversation.id);
            return Ok(());
        }

        match self.entries.iter().position(|c| c.id == conversation.id) {
            Some(index) => self.entries[index] = conversation,
            None => self.entries.insert(0, conversation),
        }

        if self.entries.len() > self.limit {
            let evicted = self.entries.len() - self.limit;
            self.entries.truncate(self.limit);
            log::info!("History full, evicted {} oldest conversation(s)", evicted);
        }

        self.persist().await
    }

    /// Summaries in store order. Each call walks the current state.
    pub fn list(&self) -> impl Iterator<Item = ConversationSummary> + '_ {
        self.entries.iter().map(Conversation::summary)
    }

    pub fn find(&self, id: &str) -> Option<&Conversation> {
        self.entries.iter().find(|c| c.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Drop every stored conversation.
    pub async fn clear_all(&mut self) -> Result<()> {
        self.entries.clear();
        self.storage.remove(CONVERSATIONS_KEY).await.map_err(|e| {
            log::error!("Failed to clear stored conversations: {}", e);
            e
        })
    }

    async fn persist(&self) -> Result<()> {
        let json = serde_json::to_string(&self.entries)?;
        self.storage
            .set(CONVERSATIONS_KEY, &json)
            .await
            .map_err(|e| {
                log::error!("Failed to save conversations: {}", e);
                e
            })
    }
}

/// Restore the store invariants on data read back from the medium:
/// one entry per id, no empty conversations, at most `limit` entries.
fn sanitize(entries: Vec<Conversation>, limit: usize) -> Vec<Conversation> {
    let total = entries.len();
    let mut seen = HashSet::new();
    let mut kept: Vec<Conversation> = entries
        .into_iter()
        .filter(|c| !c.messages.is_empty() && seen.insert(c.id.clone()))
        .collect();
    kept.truncate(limit);
    if kept.len() != total {
        log::warn!("Dropped {} invalid stored conversation(s)", total - kept.len());
    }
    kept
}
