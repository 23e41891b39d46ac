use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::message::{Message, Role};

/// Title used when a conversation has no user message to derive one from.
pub const DEFAULT_TITLE: &str = "New Chat";

/// A persisted conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub messages: Vec<Message>,
    pub saved_at: DateTime<Utc>,
}

impl Conversation {
    pub fn summary(&self) -> ConversationSummary {
        ConversationSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            saved_at: self.saved_at,
            message_count: self.messages.len(),
        }
    }
}

/// Summary of a conversation for the history list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: String,
    pub title: String,
    pub saved_at: DateTime<Utc>,
    pub message_count: usize,
}

/// An answer the user pinned for offline review
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedAnswer {
    pub content: String,
    pub saved_at: DateTime<Utc>,
}

/// Derive a title from the first user message.
///
/// Keeps the first `max_chars` characters (not bytes) and marks the cut
/// with an ellipsis.
pub fn derive_title(messages: &[Message], max_chars: usize) -> String {
    let first = messages
        .iter()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.trim())
        .filter(|text| !text.is_empty());

    match first {
        Some(text) if text.chars().count() > max_chars => {
            let prefix: String = text.chars().take(max_chars).collect();
            format!("{}...", prefix.trim_end())
        }
        Some(text) => text.to_string(),
        None => DEFAULT_TITLE.to_string(),
    }
}
