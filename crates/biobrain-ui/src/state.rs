//! UI-level state that drives rendering.
//! This is a read-only projection of the chat runtime state,
//! updated each frame by draining the EventBus.

use biobrain_core::runtime::ChatState;
use biobrain_types::conversation::ConversationSummary;
use biobrain_types::event::ChatEvent;
use biobrain_types::message::Role;

/// Seconds a notice stays on screen
pub const NOTICE_SECONDS: f64 = 3.0;

/// State visible to UI panels
pub struct UiState {
    /// Displayed entries (user, assistant and error bubbles)
    pub messages: Vec<ChatEntry>,
    /// Current runtime status
    pub chat_status: ChatState,
    /// Follow-up suggestions for the last answer
    pub related_questions: Vec<String>,
    /// Stored conversations, most recent first
    pub history: Vec<ConversationSummary>,
    /// Id of the conversation on screen, once it exists
    pub active_conversation: Option<String>,
    /// Input field content
    pub input_text: String,
    pub show_settings: bool,
    pub show_history: bool,
    /// "Clear History" was clicked and awaits Yes/Cancel
    pub confirm_clear: bool,
    /// Status line text
    pub status_text: String,
    pub notice: Option<Notice>,
    next_entry_id: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    User,
    Assistant,
    Error,
}

/// A chat entry for display
#[derive(Debug, Clone)]
pub struct ChatEntry {
    /// Unique for the lifetime of the UI, never reused
    pub id: u64,
    pub kind: EntryKind,
    pub content: String,
    /// Wall-clock time the entry was shown, formatted for display
    pub time: String,
    pub diagram_url: Option<String>,
    pub diagram_pending: bool,
}

impl ChatEntry {
    fn new(id: u64, kind: EntryKind, content: String) -> Self {
        Self {
            id,
            kind,
            content,
            time: display_time(),
            diagram_url: None,
            diagram_pending: false,
        }
    }

}

fn entry_kind(role: Role) -> EntryKind {
    match role {
        Role::User => EntryKind::User,
        Role::Assistant => EntryKind::Assistant,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub message: String,
    /// egui time of the first frame that showed it
    pub shown_at: Option<f64>,
}

impl UiState {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            chat_status: ChatState::Idle,
            related_questions: Vec::new(),
            history: Vec::new(),
            active_conversation: None,
            input_text: String::new(),
            show_settings: false,
            show_history: false,
            confirm_clear: false,
            status_text: "Ready".to_string(),
            notice: None,
            next_entry_id: 1,
        }
    }

    fn push_entry(&mut self, kind: EntryKind, content: String) {
        let id = self.next_entry_id;
        self.next_entry_id += 1;
        self.messages.push(ChatEntry::new(id, kind, content));
    }

    /// Process events from the EventBus and update UI state
    pub fn process_events(&mut self, events: Vec<ChatEvent>) {
        for event in events {
            match event {
                ChatEvent::TurnStart { .. } => {
                    self.chat_status = ChatState::Thinking;
                    self.related_questions.clear();
                    self.status_text = "Thinking...".to_string();
                }
                ChatEvent::UserMessage { text } => {
                    self.push_entry(EntryKind::User, text);
                }
                ChatEvent::LlmComplete { text } => {
                    self.push_entry(EntryKind::Assistant, text);
                }
                ChatEvent::RelatedQuestions { questions } => {
                    self.related_questions = questions;
                }
                ChatEvent::ConversationSaved { id } => {
                    self.active_conversation = Some(id);
                }
                ChatEvent::HistoryChanged { conversations } => {
                    self.history = conversations;
                }
                ChatEvent::ConversationOpened { id, messages } => {
                    self.messages.clear();
                    for msg in messages {
                        self.push_entry(entry_kind(msg.role), msg.content);
                    }
                    self.related_questions.clear();
                    self.active_conversation = Some(id);
                    self.chat_status = ChatState::Idle;
                    self.status_text = "Ready".to_string();
                }
                ChatEvent::SessionCleared => {
                    self.messages.clear();
                    self.related_questions.clear();
                    self.active_conversation = None;
                    self.chat_status = ChatState::Idle;
                    self.status_text = "Ready".to_string();
                }
                ChatEvent::DiagramReady { entry_id, url } => {
                    // Entries from a conversation no longer on screen are gone
                    if let Some(entry) = self.entry_mut(entry_id) {
                        entry.diagram_url = Some(url);
                        entry.diagram_pending = false;
                    }
                }
                ChatEvent::DiagramFailed { entry_id } => {
                    self.fail_diagram(entry_id);
                }
                ChatEvent::Notice { message } => {
                    self.notice = Some(Notice {
                        message,
                        shown_at: None,
                    });
                }
                ChatEvent::TurnEnd { .. } => {
                    // A failed turn keeps its error status until the next one
                    if self.chat_status == ChatState::Thinking {
                        self.chat_status = ChatState::Idle;
                        self.status_text = "Ready".to_string();
                    }
                }
                ChatEvent::Error { message } => {
                    self.chat_status = ChatState::Error(message.clone());
                    self.status_text = "Error".to_string();
                    self.push_entry(EntryKind::Error, message);
                }
            }
        }
    }

    /// Mark a diagram request as in flight for the entry at `index`.
    /// Returns the entry id the result must be delivered to.
    pub fn begin_diagram(&mut self, index: usize) -> Option<u64> {
        match self.messages.get_mut(index) {
            Some(entry) if entry.kind == EntryKind::Assistant && !entry.diagram_pending => {
                entry.diagram_pending = true;
                Some(entry.id)
            }
            _ => None,
        }
    }

    /// Clear the pending flag after a failed diagram request.
    pub fn fail_diagram(&mut self, entry_id: u64) {
        if let Some(entry) = self.entry_mut(entry_id) {
            entry.diagram_pending = false;
        }
    }

    fn entry_mut(&mut self, entry_id: u64) -> Option<&mut ChatEntry> {
        self.messages.iter_mut().find(|e| e.id == entry_id)
    }

    /// Expire the current notice once it has been visible long enough.
    pub fn tick(&mut self, now: f64) {
        let expired = match self.notice.as_mut() {
            Some(notice) => {
                let shown_at = *notice.shown_at.get_or_insert(now);
                now - shown_at >= NOTICE_SECONDS
            }
            None => false,
        };
        if expired {
            self.notice = None;
        }
    }

    pub fn is_busy(&self) -> bool {
        self.chat_status == ChatState::Thinking
    }
}

impl Default for UiState {
    fn default() -> Self {
        Self::new()
    }
}

fn display_time() -> String {
    chrono::Local::now().format("%I:%M %p").to_string()
}
