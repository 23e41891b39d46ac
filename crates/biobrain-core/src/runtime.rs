//! Chat runtime: one question/answer turn at a time.
//!
//! A turn:
//! 1. Append the user message to the session (creating it if needed)
//! 2. Send the whole conversation to the LLM
//! 3. Append the answer and upsert the session into the store
//! 4. Ask for follow-up questions (best effort)
//!
//! A failed LLM call is reported as an assistant-style error message; the
//! user message stays in the session and nothing is saved for that turn.

use std::rc::Rc;

use chrono::Utc;
use biobrain_types::{
    ChatError, Result,
    config::ChatConfig,
    conversation::ConversationSummary,
    event::ChatEvent,
    message::{Message, Role},
};

use crate::event_bus::EventBus;
use crate::ports::*;
use crate::prompts::{diagram_prompt, parse_related_questions, related_questions_prompt};
use crate::saved::SavedAnswers;
use crate::session::{AppendOutcome, ConversationSession};
use crate::store::ConversationStore;

/// The runtime state
pub struct ChatRuntime {
    pub config: ChatConfig,
    pub session: ConversationSession,
    pub store: ConversationStore,
    pub event_bus: EventBus,
    pub state: ChatState,
    turn_counter: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatState {
    Idle,
    Thinking,
    Error(String),
}

impl ChatRuntime {
    /// Open the history store on `storage` and announce its contents.
    pub async fn open(
        config: ChatConfig,
        storage: Rc<dyn StoragePort>,
        event_bus: EventBus,
    ) -> Self {
        let store = ConversationStore::open_with_limit(storage, config.history_limit).await;
        log::info!("History loaded: {} conversation(s)", store.len());
        Self::with_store(config, store, event_bus)
    }

    pub fn with_store(config: ChatConfig, store: ConversationStore, event_bus: EventBus) -> Self {
        let runtime = Self {
            session: ConversationSession::new(config.title_max_chars),
            config,
            store,
            event_bus,
            state: ChatState::Idle,
            turn_counter: 0,
        };
        runtime.announce_history();
        runtime
    }

    pub fn is_busy(&self) -> bool {
        self.state == ChatState::Thinking
    }

    /// Run one full turn for `input`.
    pub async fn send_message(&mut self, input: &str, llm: &dyn LlmPort) -> Result<()> {
        if self.is_busy() {
            return Err(ChatError::Busy);
        }
        let question = input.trim();
        if question.is_empty() {
            return Err(ChatError::EmptyInput);
        }
        let question: String = question.chars().take(self.config.max_input_chars).collect();

        self.turn_counter += 1;
        let turn_id = self.turn_counter;
        self.event_bus.emit(ChatEvent::TurnStart { turn_id });

        if let AppendOutcome::CreatedNew { id } =
            self.session.append_message(Role::User, question.clone())
        {
            log::debug!("Started conversation {}", id);
        }
        self.event_bus.emit(ChatEvent::UserMessage {
            text: question.clone(),
        });

        self.state = ChatState::Thinking;
        let req = self.request(self.session.messages().to_vec(), true);

        let answer = match llm.chat_completion(req).await {
            Ok(response) => response.text,
            Err(e) => {
                log::error!("Chat request failed: {}", e);
                self.state = ChatState::Error(e.to_string());
                self.event_bus.emit(ChatEvent::Error {
                    message: e.user_message(),
                });
                self.event_bus.emit(ChatEvent::TurnEnd { turn_id });
                return Err(e);
            }
        };

        self.session.append_message(Role::Assistant, answer.clone());
        self.event_bus.emit(ChatEvent::LlmComplete {
            text: answer.clone(),
        });

        self.save_session().await;
        self.suggest_related(&question, &answer, llm).await;

        self.state = ChatState::Idle;
        self.event_bus.emit(ChatEvent::TurnEnd { turn_id });
        Ok(())
    }

    fn request(&self, messages: Vec<Message>, with_system_prompt: bool) -> ChatRequest {
        ChatRequest {
            system_prompt: with_system_prompt.then(|| self.config.system_prompt.clone()),
            messages,
            model: self.config.llm.model.clone(),
            max_tokens: self.config.llm.max_tokens,
            temperature: self.config.llm.temperature,
        }
    }

    /// Upsert the active session. A write failure becomes a notice; the
    /// in-memory history keeps the change either way.
    pub async fn save_session(&mut self) {
        let Some(conversation) = self.session.snapshot(Utc::now()) else {
            return;
        };
        let id = conversation.id.clone();
        match self.store.upsert(conversation).await {
            Ok(()) => self.event_bus.emit(ChatEvent::ConversationSaved { id }),
            Err(e) => self
                .event_bus
                .notice(format!("Could not save conversation: {}", e)),
        }
        self.announce_history();
    }

    async fn suggest_related(&self, question: &str, answer: &str, llm: &dyn LlmPort) {
        let prompt = related_questions_prompt(question, answer);
        let req = self.request(vec![Message::user(prompt)], true);
        match llm.chat_completion(req).await {
            Ok(response) => {
                let questions = parse_related_questions(&response.text);
                if !questions.is_empty() {
                    self.event_bus.emit(ChatEvent::RelatedQuestions { questions });
                }
            }
            Err(e) => log::warn!("Related questions unavailable: {}", e),
        }
    }

    /// Close the current conversation; the next message starts a new one.
    pub fn new_chat(&mut self) {
        self.session.start();
        self.state = ChatState::Idle;
        self.event_bus.emit(ChatEvent::SessionCleared);
    }

    /// Make a stored conversation the active one. Unknown ids are ignored.
    pub fn open_conversation(&mut self, id: &str) -> bool {
        let Some(conversation) = self.store.find(id).cloned() else {
            log::debug!("Conversation {} not found", id);
            return false;
        };
        self.session.activate(&conversation);
        self.state = ChatState::Idle;
        self.event_bus.emit(ChatEvent::ConversationOpened {
            id: conversation.id,
            messages: conversation.messages,
        });
        true
    }

    /// Remove every stored conversation and start over.
    pub async fn clear_history(&mut self) {
        match self.store.clear_all().await {
            Ok(()) => self.event_bus.notice("Chat history cleared"),
            Err(e) => self
                .event_bus
                .notice(format!("Could not clear stored history: {}", e)),
        }
        self.new_chat();
        self.announce_history();
    }

    pub fn history(&self) -> Vec<ConversationSummary> {
        self.store.list().collect()
    }

    fn announce_history(&self) {
        self.event_bus.emit(ChatEvent::HistoryChanged {
            conversations: self.history(),
        });
    }
}

/// Pin an answer for offline review and report the result as a notice.
pub async fn save_answer(saved: &SavedAnswers, event_bus: &EventBus, content: &str) {
    match saved.save(content).await {
        Ok(_) => event_bus.notice("Answer saved for offline review!"),
        Err(_) => event_bus.notice("Failed to save answer"),
    }
}

/// Request an illustration for the chat entry `entry_id`, seeded with
/// its text. The id travels with the result so a late answer cannot land
/// on an entry from another conversation.
pub async fn generate_diagram(
    image: &dyn ImagePort,
    event_bus: &EventBus,
    entry_id: u64,
    context: &str,
) -> Result<String> {
    let prompt = diagram_prompt(context);
    match image.image_url(&prompt).await {
        Ok(url) => {
            event_bus.emit(ChatEvent::DiagramReady {
                entry_id,
                url: url.clone(),
            });
            event_bus.notice("Diagram loaded successfully!");
            Ok(url)
        }
        Err(e) => {
            log::error!("Diagram generation failed: {}", e);
            event_bus.emit(ChatEvent::DiagramFailed { entry_id });
            event_bus.notice("Failed to load diagram");
            Err(e)
        }
    }
}
