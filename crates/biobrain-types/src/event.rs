use serde::{Deserialize, Serialize};

use crate::conversation::ConversationSummary;

/// Events emitted by the chat runtime.
/// UI subscribes to these for reactive updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ChatEvent {
    /// Runtime started processing a user message
    TurnStart { turn_id: u64 },

    /// The user message was appended to the active session
    UserMessage { text: String },

    /// The LLM answered
    LlmComplete { text: String },

    /// Follow-up questions suggested for the last answer
    RelatedQuestions { questions: Vec<String> },

    /// The active conversation was written to the store
    ConversationSaved { id: String },

    /// The history list changed (save, clear, eviction)
    HistoryChanged { conversations: Vec<ConversationSummary> },

    /// A stored conversation was opened; carries its messages for redraw
    ConversationOpened {
        id: String,
        messages: Vec<crate::message::Message>,
    },

    /// The session was reset to an empty conversation
    SessionCleared,

    /// A diagram URL is ready for the chat entry that requested it
    DiagramReady { entry_id: u64, url: String },

    /// The diagram request from `entry_id` failed
    DiagramFailed { entry_id: u64 },

    /// Transient, non-fatal notification (toast)
    Notice { message: String },

    /// Runtime finished the current turn
    TurnEnd { turn_id: u64 },

    /// A request failed; rendered as an assistant-style message
    Error { message: String },
}
