//! The conversation currently open in the UI.
//!
//! Two states: Empty (no id, no messages) and Active (id set). The first
//! appended message creates the identity; `start` drops it again.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use biobrain_types::conversation::{derive_title, Conversation};
use biobrain_types::message::{Message, Role};

/// What `append_message` did to the session identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The session was Empty; a fresh conversation id was assigned.
    CreatedNew { id: String },
    /// The message joined the already active conversation.
    AppendedExisting,
}

#[derive(Debug, Clone, PartialEq)]
struct ActiveConversation {
    id: String,
    /// Fixed once the first user message arrives
    title: Option<String>,
    messages: Vec<Message>,
}

#[derive(Debug, Clone)]
pub struct ConversationSession {
    active: Option<ActiveConversation>,
    title_max_chars: usize,
}

impl ConversationSession {
    pub fn new(title_max_chars: usize) -> Self {
        Self {
            active: None,
            title_max_chars,
        }
    }

    /// Return to the Empty state.
    pub fn start(&mut self) {
        self.active = None;
    }

    /// Append a message, creating the conversation identity first if needed.
    pub fn append_message(&mut self, role: Role, content: impl Into<String>) -> AppendOutcome {
        let outcome = match self.active {
            Some(_) => AppendOutcome::AppendedExisting,
            None => {
                let id = new_conversation_id();
                self.active = Some(ActiveConversation {
                    id: id.clone(),
                    title: None,
                    messages: Vec::new(),
                });
                AppendOutcome::CreatedNew { id }
            }
        };

        let max_chars = self.title_max_chars;
        if let Some(active) = self.active.as_mut() {
            active.messages.push(Message::new(role, content));
            if active.title.is_none() && role == Role::User {
                active.title = Some(derive_title(&active.messages, max_chars));
            }
        }
        outcome
    }

    /// Replace identity and messages with a stored conversation.
    pub fn activate(&mut self, conversation: &Conversation) {
        self.active = Some(ActiveConversation {
            id: conversation.id.clone(),
            title: Some(conversation.title.clone()),
            messages: conversation.messages.clone(),
        });
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn id(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.id.as_str())
    }

    pub fn title(&self) -> Option<&str> {
        self.active.as_ref().and_then(|a| a.title.as_deref())
    }

    pub fn messages(&self) -> &[Message] {
        self.active
            .as_ref()
            .map(|a| a.messages.as_slice())
            .unwrap_or(&[])
    }

    /// Persistable copy of the session stamped with `saved_at`.
    ///
    /// `None` while Empty or while no message has been appended, so an empty
    /// conversation never reaches the store.
    pub fn snapshot(&self, saved_at: DateTime<Utc>) -> Option<Conversation> {
        let active = self.active.as_ref()?;
        if active.messages.is_empty() {
            return None;
        }
        let title = active
            .title
            .clone()
            .unwrap_or_else(|| derive_title(&active.messages, self.title_max_chars));
        Some(Conversation {
            id: active.id.clone(),
            title,
            messages: active.messages.clone(),
            saved_at,
        })
    }
}

impl Default for ConversationSession {
    fn default() -> Self {
        Self::new(50)
    }
}

fn new_conversation_id() -> String {
    Uuid::new_v4().to_string()
}
