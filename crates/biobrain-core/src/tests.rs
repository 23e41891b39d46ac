#[cfg(test)]
mod tests {
    use crate::credentials::*;
    use crate::event_bus::EventBus;
    use crate::ports::*;
    use crate::prompts::*;
    use crate::runtime::{self, ChatRuntime, ChatState};
    use crate::saved::{SavedAnswers, SAVED_ANSWERS_KEY};
    use crate::session::{AppendOutcome, ConversationSession};
    use crate::store::{ConversationStore, CONVERSATIONS_KEY};
    use biobrain_types::config::{ChatConfig, MAX_CONVERSATIONS};
    use biobrain_types::conversation::Conversation;
    use biobrain_types::event::ChatEvent;
    use biobrain_types::message::*;
    use biobrain_types::{ChatError, Result};

    use async_trait::async_trait;
    use chrono::Utc;
    use futures::executor::block_on;
    use std::cell::{Cell, RefCell};
    use std::collections::{HashMap, HashSet, VecDeque};
    use std::rc::Rc;

    // ─── Mocks ───────────────────────────────────────────────

    #[derive(Default)]
    struct MockStorage {
        data: RefCell<HashMap<String, String>>,
        fail_writes: Cell<bool>,
        fail_reads: Cell<bool>,
    }

    impl MockStorage {
        fn with(key: &str, value: &str) -> Self {
            let storage = Self::default();
            storage.data.borrow_mut().insert(key.to_string(), value.to_string());
            storage
        }

        fn raw(&self, key: &str) -> Option<String> {
            self.data.borrow().get(key).cloned()
        }
    }

    #[async_trait(?Send)]
    impl StoragePort for MockStorage {
        async fn get(&self, key: &str) -> Result<Option<String>> {
            if self.fail_reads.get() {
                return Err(ChatError::Storage("read denied".to_string()));
            }
            Ok(self.data.borrow().get(key).cloned())
        }

        async fn set(&self, key: &str, value: &str) -> Result<()> {
            if self.fail_writes.get() {
                return Err(ChatError::Storage("quota exceeded".to_string()));
            }
            self.data.borrow_mut().insert(key.to_string(), value.to_string());
            Ok(())
        }

        async fn remove(&self, key: &str) -> Result<()> {
            if self.fail_writes.get() {
                return Err(ChatError::Storage("quota exceeded".to_string()));
            }
            self.data.borrow_mut().remove(key);
            Ok(())
        }

        fn backend_name(&self) -> &str {
            "mock"
        }
    }

    /// LLM that answers from a script, in order, and records every request
    struct ScriptedLlm {
        replies: RefCell<VecDeque<Result<String>>>,
        requests: RefCell<Vec<ChatRequest>>,
    }

    impl ScriptedLlm {
        fn new(replies: Vec<Result<String>>) -> Self {
            Self {
                replies: RefCell::new(replies.into()),
                requests: RefCell::new(Vec::new()),
            }
        }
    }

    #[async_trait(?Send)]
    impl LlmPort for ScriptedLlm {
        async fn chat_completion(&self, req: ChatRequest) -> Result<ChatResponse> {
            self.requests.borrow_mut().push(req);
            match self.replies.borrow_mut().pop_front() {
                Some(Ok(text)) => Ok(ChatResponse {
                    text,
                    usage: Some(TokenUsage {
                        prompt_tokens: 10,
                        completion_tokens: 5,
                        total_tokens: 15,
                    }),
                }),
                Some(Err(e)) => Err(e),
                None => Err(ChatError::Llm("no scripted reply".to_string())),
            }
        }
    }

    struct MockImage {
        fail: bool,
    }

    #[async_trait(?Send)]
    impl ImagePort for MockImage {
        async fn image_url(&self, prompt: &str) -> Result<String> {
            if self.fail {
                Err(ChatError::Network("offline".to_string()))
            } else {
                Ok(format!("https://img.test/{}", prompt.len()))
            }
        }
    }

    fn conv(id: &str, text: &str) -> Conversation {
        Conversation {
            id: id.to_string(),
            title: text.to_string(),
            messages: vec![Message::user(text)],
            saved_at: Utc::now(),
        }
    }

    fn open_store(storage: &Rc<MockStorage>) -> ConversationStore {
        let dyn_storage: Rc<dyn StoragePort> = storage.clone();
        block_on(ConversationStore::open(dyn_storage))
    }

    fn ids(store: &ConversationStore) -> Vec<String> {
        store.list().map(|s| s.id).collect()
    }

    fn open_runtime(storage: &Rc<MockStorage>) -> (ChatRuntime, EventBus) {
        let bus = EventBus::new();
        let dyn_storage: Rc<dyn StoragePort> = storage.clone();
        let rt = block_on(ChatRuntime::open(ChatConfig::default(), dyn_storage, bus.clone()));
        bus.drain();
        (rt, bus)
    }

    // ─── EventBus Tests ──────────────────────────────────────

    #[test]
    fn test_event_bus_emit_and_drain() {
        let bus = EventBus::new();
        assert!(!bus.has_pending());
        bus.emit(ChatEvent::TurnStart { turn_id: 1 });
        bus.notice("saved");
        assert!(bus.has_pending());

        let events = bus.drain();
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[1], ChatEvent::Notice { message } if message == "saved"));
        assert!(!bus.has_pending());
    }

    #[test]
    fn test_event_bus_clone_shares_state() {
        let bus1 = EventBus::new();
        let bus2 = bus1.clone();
        bus1.emit(ChatEvent::SessionCleared);
        assert_eq!(bus2.drain().len(), 1);
        assert!(!bus1.has_pending());
    }

    // ─── Session Tests ───────────────────────────────────────

    #[test]
    fn test_session_starts_empty() {
        let session = ConversationSession::default();
        assert!(!session.is_active());
        assert!(session.id().is_none());
        assert!(session.messages().is_empty());
        assert!(session.snapshot(Utc::now()).is_none());
    }

    #[test]
    fn test_session_first_append_creates_conversation() {
        let mut session = ConversationSession::default();
        let outcome = session.append_message(Role::User, "x");

        let id = match outcome {
            AppendOutcome::CreatedNew { id } => id,
            other => panic!("expected CreatedNew, got {:?}", other),
        };
        assert!(session.is_active());
        assert_eq!(session.id(), Some(id.as_str()));
        assert_eq!(session.messages(), &[Message::user("x")]);
    }

    #[test]
    fn test_session_second_append_keeps_order() {
        let mut session = ConversationSession::default();
        session.append_message(Role::User, "x");
        let id = session.id().unwrap().to_string();

        let outcome = session.append_message(Role::Assistant, "y");
        assert_eq!(outcome, AppendOutcome::AppendedExisting);
        assert_eq!(session.id(), Some(id.as_str()));
        assert_eq!(
            session.messages(),
            &[Message::user("x"), Message::assistant("y")]
        );
    }

    #[test]
    fn test_session_duplicate_messages_are_kept() {
        let mut session = ConversationSession::default();
        session.append_message(Role::User, "same");
        session.append_message(Role::User, "same");
        assert_eq!(session.messages().len(), 2);
    }

    #[test]
    fn test_session_start_returns_to_empty() {
        let mut session = ConversationSession::default();
        session.append_message(Role::User, "x");
        session.start();
        assert!(!session.is_active());
        assert!(session.messages().is_empty());
    }

    #[test]
    fn test_session_new_conversation_gets_new_id() {
        let mut session = ConversationSession::default();
        session.append_message(Role::User, "one");
        let first = session.id().unwrap().to_string();
        session.start();
        session.append_message(Role::User, "two");
        assert_ne!(session.id().unwrap(), first);
    }

    #[test]
    fn test_session_activate_on_empty() {
        let stored = Conversation {
            id: "stored-1".to_string(),
            title: "Cells".to_string(),
            messages: vec![Message::user("Cells?"), Message::assistant("Units of life")],
            saved_at: Utc::now(),
        };
        let mut session = ConversationSession::default();
        session.activate(&stored);

        assert!(session.is_active());
        assert_eq!(session.id(), Some("stored-1"));
        assert_eq!(session.messages(), stored.messages.as_slice());
        assert_eq!(session.title(), Some("Cells"));
    }

    #[test]
    fn test_session_activate_replaces_active() {
        let mut session = ConversationSession::default();
        session.append_message(Role::User, "draft");
        session.activate(&conv("other", "Enzymes"));
        assert_eq!(session.id(), Some("other"));
        assert_eq!(session.messages(), &[Message::user("Enzymes")]);

        let outcome = session.append_message(Role::Assistant, "Catalysts");
        assert_eq!(outcome, AppendOutcome::AppendedExisting);
        assert_eq!(session.messages().len(), 2);
    }

    #[test]
    fn test_session_title_fixed_by_first_user_message() {
        let mut session = ConversationSession::new(10);
        session.append_message(Role::User, "What is the Krebs cycle?");
        session.append_message(Role::Assistant, "A series of reactions");
        session.append_message(Role::User, "Where does it happen?");

        let snapshot = session.snapshot(Utc::now()).unwrap();
        assert_eq!(snapshot.title, "What is th...");
    }

    #[test]
    fn test_session_snapshot_carries_state() {
        let mut session = ConversationSession::default();
        session.append_message(Role::User, "x");
        session.append_message(Role::Assistant, "y");
        let now = Utc::now();

        let snapshot = session.snapshot(now).unwrap();
        assert_eq!(snapshot.id, session.id().unwrap());
        assert_eq!(snapshot.messages.len(), 2);
        assert_eq!(snapshot.saved_at, now);
    }

    // ─── Store Tests ─────────────────────────────────────────

    #[test]
    fn test_store_upsert_then_find() {
        let storage = Rc::new(MockStorage::default());
        let mut store = open_store(&storage);
        let c = conv("a", "Osmosis");

        block_on(store.upsert(c.clone())).unwrap();
        assert_eq!(store.find("a"), Some(&c));
        assert!(store.find("missing").is_none());
    }

    #[test]
    fn test_store_new_entries_go_to_front() {
        let storage = Rc::new(MockStorage::default());
        let mut store = open_store(&storage);
        for id in ["a", "b", "c"] {
            block_on(store.upsert(conv(id, id))).unwrap();
        }
        assert_eq!(ids(&store), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_store_update_keeps_position() {
        let storage = Rc::new(MockStorage::default());
        let mut store = open_store(&storage);
        for id in ["a", "b", "c"] {
            block_on(store.upsert(conv(id, id))).unwrap();
        }

        let mut updated = conv("a", "a");
        updated.messages.push(Message::assistant("more"));
        block_on(store.upsert(updated.clone())).unwrap();

        assert_eq!(ids(&store), vec!["c", "b", "a"]);
        assert_eq!(store.len(), 3);
        assert_eq!(store.find("a"), Some(&updated));
    }

    #[test]
    fn test_store_evicts_oldest_after_limit() {
        let storage = Rc::new(MockStorage::default());
        let mut store = open_store(&storage);
        for i in 0..=MAX_CONVERSATIONS {
            block_on(store.upsert(conv(&format!("conv-{}", i), "q"))).unwrap();
        }

        let listed = ids(&store);
        assert_eq!(listed.len(), 50);
        assert!(!listed.contains(&"conv-0".to_string()));
        assert_eq!(listed[0], "conv-50");
        assert!(store.find("conv-0").is_none());
    }

    #[test]
    fn test_store_bound_and_uniqueness_hold_for_any_sequence() {
        let storage = Rc::new(MockStorage::default());
        let mut store = open_store(&storage);

        // Deterministic pseudo-random pick from a pool larger than the bound
        let mut seed: u64 = 0x5eed;
        for _ in 0..400 {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let id = format!("id-{}", (seed >> 33) % 80);
            block_on(store.upsert(conv(&id, "q"))).unwrap();

            let listed = ids(&store);
            assert!(listed.len() <= MAX_CONVERSATIONS);
            let unique: HashSet<_> = listed.iter().collect();
            assert_eq!(unique.len(), listed.len());
        }
    }

    #[test]
    fn test_store_never_persists_empty_conversation() {
        let storage = Rc::new(MockStorage::default());
        let mut store = open_store(&storage);
        let mut empty = conv("empty", "q");
        empty.messages.clear();

        block_on(store.upsert(empty)).unwrap();
        assert!(store.is_empty());
        assert!(storage.raw(CONVERSATIONS_KEY).is_none());
    }

    #[test]
    fn test_store_persists_across_reopen() {
        let storage = Rc::new(MockStorage::default());
        {
            let mut store = open_store(&storage);
            block_on(store.upsert(conv("a", "first"))).unwrap();
            block_on(store.upsert(conv("b", "second"))).unwrap();
        }
        let reopened = open_store(&storage);
        assert_eq!(ids(&reopened), vec!["b", "a"]);
        assert_eq!(reopened.find("a").unwrap().title, "first");
    }

    #[test]
    fn test_store_corrupted_data_is_empty() {
        let corrupted = Rc::new(MockStorage::with(CONVERSATIONS_KEY, "{not json]"));
        let absent = Rc::new(MockStorage::default());

        let from_corrupted = open_store(&corrupted);
        let from_absent = open_store(&absent);
        assert_eq!(from_corrupted.list().count(), 0);
        assert_eq!(ids(&from_corrupted), ids(&from_absent));
    }

    #[test]
    fn test_store_unreadable_medium_is_empty() {
        let storage = Rc::new(MockStorage::default());
        storage.fail_reads.set(true);
        let store = open_store(&storage);
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_sanitizes_loaded_data() {
        let mut entries: Vec<Conversation> =
            (0..60).map(|i| conv(&format!("c{}", i), "q")).collect();
        entries.insert(1, conv("c0", "duplicate"));
        let mut empty = conv("empty", "q");
        empty.messages.clear();
        entries.insert(2, empty);

        let json = serde_json::to_string(&entries).unwrap();
        let storage = Rc::new(MockStorage::with(CONVERSATIONS_KEY, &json));
        let store = open_store(&storage);

        assert_eq!(store.len(), MAX_CONVERSATIONS);
        assert_eq!(store.find("c0").unwrap().title, "q");
        assert!(store.find("empty").is_none());
    }

    #[test]
    fn test_store_list_is_restartable() {
        let storage = Rc::new(MockStorage::default());
        let mut store = open_store(&storage);
        block_on(store.upsert(conv("a", "q"))).unwrap();
        assert_eq!(store.list().count(), 1);

        block_on(store.upsert(conv("b", "q"))).unwrap();
        assert_eq!(store.list().count(), 2);
        assert_eq!(store.list().count(), 2);
    }

    #[test]
    fn test_store_write_failure_keeps_memory_state() {
        let storage = Rc::new(MockStorage::default());
        let mut store = open_store(&storage);
        storage.fail_writes.set(true);

        let result = block_on(store.upsert(conv("a", "q")));
        assert!(matches!(result, Err(ChatError::Storage(_))));
        assert_eq!(ids(&store), vec!["a"]);
        assert!(storage.raw(CONVERSATIONS_KEY).is_none());
    }

    #[test]
    fn test_store_clear_all() {
        let storage = Rc::new(MockStorage::default());
        let mut store = open_store(&storage);
        block_on(store.upsert(conv("a", "q"))).unwrap();
        block_on(store.clear_all()).unwrap();

        assert!(store.is_empty());
        assert!(storage.raw(CONVERSATIONS_KEY).is_none());
        assert!(open_store(&storage).is_empty());
    }

    #[test]
    fn test_store_custom_limit() {
        let storage = Rc::new(MockStorage::default());
        let dyn_storage: Rc<dyn StoragePort> = storage.clone();
        let mut store = block_on(ConversationStore::open_with_limit(dyn_storage, 2));
        for id in ["a", "b", "c"] {
            block_on(store.upsert(conv(id, id))).unwrap();
        }
        assert_eq!(store.limit(), 2);
        assert_eq!(ids(&store), vec!["c", "b"]);
    }

    // ─── Saved Answers Tests ─────────────────────────────────

    #[test]
    fn test_saved_answers_append() {
        let storage = Rc::new(MockStorage::default());
        let saved = SavedAnswers::new(storage.clone());
        block_on(saved.save("first")).unwrap();
        block_on(saved.save("second")).unwrap();

        let all = block_on(saved.list());
        let contents: Vec<&str> = all.iter().map(|a| a.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second"]);
    }

    #[test]
    fn test_saved_answers_corrupted_reads_empty() {
        let storage = Rc::new(MockStorage::with(SAVED_ANSWERS_KEY, "garbage"));
        let saved = SavedAnswers::new(storage.clone());
        assert!(block_on(saved.list()).is_empty());

        block_on(saved.save("fresh")).unwrap();
        assert_eq!(block_on(saved.list()).len(), 1);
    }

    #[test]
    fn test_saved_answers_write_failure() {
        let storage = Rc::new(MockStorage::default());
        storage.fail_writes.set(true);
        let saved = SavedAnswers::new(storage.clone());
        assert!(block_on(saved.save("x")).is_err());
    }

    // ─── Credential Tests ────────────────────────────────────

    #[test]
    fn test_credentials_default_when_nothing_stored() {
        let storage = Rc::new(MockStorage::default());
        let creds = CredentialStore::new(storage.clone(), "default-key");
        let active = block_on(creds.load());
        assert_eq!(active.key, "default-key");
        assert!(active.using_default);
    }

    #[test]
    fn test_credentials_remembered_key_is_obfuscated() {
        let storage = Rc::new(MockStorage::default());
        let creds = CredentialStore::new(storage.clone(), "");
        let active = block_on(creds.save("sk-or-secret", true)).unwrap();
        assert!(!active.using_default);

        let raw = storage.raw(API_KEY_KEY).unwrap();
        assert_ne!(raw, "sk-or-secret");
        assert_eq!(storage.raw(USE_DEFAULT_KEY_KEY).as_deref(), Some("false"));

        let restored = block_on(creds.load());
        assert_eq!(restored.key, "sk-or-secret");
        assert!(block_on(creds.has_stored_key()));
    }

    #[test]
    fn test_credentials_not_remembered() {
        let storage = Rc::new(MockStorage::default());
        let creds = CredentialStore::new(storage.clone(), "fallback");
        block_on(creds.save("sk-1", true)).unwrap();

        let active = block_on(creds.save("sk-2", false)).unwrap();
        assert_eq!(active.key, "sk-2");
        assert!(storage.raw(API_KEY_KEY).is_none());
        assert_eq!(block_on(creds.load()).key, "fallback");
    }

    #[test]
    fn test_credentials_blank_key_restores_default() {
        let storage = Rc::new(MockStorage::default());
        let creds = CredentialStore::new(storage.clone(), "fallback");
        block_on(creds.save("sk-1", true)).unwrap();

        let active = block_on(creds.save("   ", true)).unwrap();
        assert!(active.using_default);
        assert!(storage.raw(API_KEY_KEY).is_none());
        assert_eq!(storage.raw(USE_DEFAULT_KEY_KEY).as_deref(), Some("true"));
    }

    #[test]
    fn test_credentials_undecodable_key_falls_back() {
        let storage = Rc::new(MockStorage::with(API_KEY_KEY, "%%% not base64 %%%"));
        let creds = CredentialStore::new(storage.clone(), "fallback");
        let active = block_on(creds.load());
        assert_eq!(active.key, "fallback");
        assert!(active.using_default);
    }

    // ─── Prompt Tests ────────────────────────────────────────

    #[test]
    fn test_parse_related_questions_filters_numbering() {
        let reply = "1. What is ATP?\nHow is ATP made?\n\n  Where is ATP used?  \n2) Skip me\nWhy does ATP matter?\nOne too many?";
        let questions = parse_related_questions(reply);
        assert_eq!(
            questions,
            vec![
                "How is ATP made?",
                "Where is ATP used?",
                "Why does ATP matter?",
                "One too many?",
            ]
        );
    }

    #[test]
    fn test_parse_related_questions_caps_at_four() {
        let reply = "a?\nb?\nc?\nd?\ne?";
        assert_eq!(parse_related_questions(reply).len(), MAX_RELATED_QUESTIONS);
    }

    #[test]
    fn test_parse_related_questions_keeps_leading_numbers_in_text() {
        let questions = parse_related_questions("23 chromosome pairs: why?");
        assert_eq!(questions, vec!["23 chromosome pairs: why?"]);
    }

    #[test]
    fn test_related_questions_prompt_contains_inputs() {
        let prompt = related_questions_prompt("What is DNA?", "A molecule");
        assert!(prompt.contains("Question: What is DNA?"));
        assert!(prompt.contains("Answer: A molecule"));
    }

    #[test]
    fn test_diagram_prompt_truncates_context() {
        let context = "x".repeat(1000);
        let prompt = diagram_prompt(&context);
        assert!(prompt.starts_with("High resolution scientific diagram of "));
        assert!(prompt.contains(&"x".repeat(DIAGRAM_CONTEXT_CHARS)));
        assert!(!prompt.contains(&"x".repeat(DIAGRAM_CONTEXT_CHARS + 1)));
    }

    // ─── Runtime Tests ───────────────────────────────────────

    #[test]
    fn test_runtime_initial_state() {
        let storage = Rc::new(MockStorage::default());
        let bus = EventBus::new();
        let dyn_storage: Rc<dyn StoragePort> = storage.clone();
        let rt = block_on(ChatRuntime::open(ChatConfig::default(), dyn_storage, bus.clone()));

        assert_eq!(rt.state, ChatState::Idle);
        assert!(!rt.session.is_active());
        let events = bus.drain();
        assert!(matches!(&events[..], [ChatEvent::HistoryChanged { conversations }] if conversations.is_empty()));
    }

    #[test]
    fn test_runtime_turn_saves_conversation() {
        let storage = Rc::new(MockStorage::default());
        let (mut rt, bus) = open_runtime(&storage);
        let llm = ScriptedLlm::new(vec![
            Ok("Osmosis is diffusion of water.".to_string()),
            Ok("What is turgor?\nWhat is plasmolysis?".to_string()),
        ]);

        block_on(rt.send_message("  What is osmosis?  ", &llm)).unwrap();

        assert_eq!(
            rt.session.messages(),
            &[
                Message::user("What is osmosis?"),
                Message::assistant("Osmosis is diffusion of water."),
            ]
        );
        assert_eq!(rt.state, ChatState::Idle);

        let history = rt.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, rt.session.id().unwrap());
        assert_eq!(history[0].title, "What is osmosis?");
        assert!(storage.raw(CONVERSATIONS_KEY).is_some());

        let events = bus.drain();
        assert!(matches!(events.first(), Some(ChatEvent::TurnStart { turn_id: 1 })));
        assert!(matches!(events.last(), Some(ChatEvent::TurnEnd { turn_id: 1 })));
        assert!(events.iter().any(|e| matches!(e, ChatEvent::UserMessage { text } if text == "What is osmosis?")));
        assert!(events.iter().any(|e| matches!(e, ChatEvent::ConversationSaved { .. })));
        assert!(events.iter().any(|e| matches!(e, ChatEvent::RelatedQuestions { questions } if questions.len() == 2)));
    }

    #[test]
    fn test_runtime_request_carries_system_prompt_and_history() {
        let storage = Rc::new(MockStorage::default());
        let (mut rt, _bus) = open_runtime(&storage);
        let llm = ScriptedLlm::new(vec![
            Ok("A1".to_string()),
            Ok(String::new()),
            Ok("A2".to_string()),
            Ok(String::new()),
        ]);

        block_on(rt.send_message("Q1", &llm)).unwrap();
        block_on(rt.send_message("Q2", &llm)).unwrap();

        let requests = llm.requests.borrow();
        assert_eq!(requests.len(), 4);
        let second_turn = &requests[2];
        assert_eq!(second_turn.system_prompt.as_deref(), Some(rt.config.system_prompt.as_str()));
        assert_eq!(second_turn.model, "openai/gpt-3.5-turbo");
        assert_eq!(
            second_turn.messages,
            vec![Message::user("Q1"), Message::assistant("A1"), Message::user("Q2")]
        );
    }

    #[test]
    fn test_runtime_second_turn_updates_in_place() {
        let storage = Rc::new(MockStorage::default());
        let (mut rt, _bus) = open_runtime(&storage);
        let llm = ScriptedLlm::new(vec![
            Ok("A1".to_string()),
            Ok(String::new()),
            Ok("A2".to_string()),
            Ok(String::new()),
        ]);

        block_on(rt.send_message("Q1", &llm)).unwrap();
        block_on(rt.send_message("Q2", &llm)).unwrap();

        let history = rt.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].message_count, 4);
        assert_eq!(history[0].title, "Q1");
    }

    #[test]
    fn test_runtime_llm_failure_is_reported_not_saved() {
        let storage = Rc::new(MockStorage::default());
        let (mut rt, bus) = open_runtime(&storage);
        let llm = ScriptedLlm::new(vec![Err(ChatError::Api {
            status: 401,
            message: "Invalid API key".to_string(),
        })]);

        let result = block_on(rt.send_message("Hello", &llm));
        assert!(matches!(result, Err(ChatError::Api { status: 401, .. })));

        assert_eq!(rt.session.messages(), &[Message::user("Hello")]);
        assert!(rt.history().is_empty());
        assert!(matches!(rt.state, ChatState::Error(_)));
        assert!(!rt.is_busy());

        let events = bus.drain();
        assert!(events.iter().any(|e| matches!(e, ChatEvent::Error { message } if message.starts_with("Sorry, I encountered an error: Invalid API key"))));
        assert!(matches!(events.last(), Some(ChatEvent::TurnEnd { .. })));
    }

    #[test]
    fn test_runtime_recovers_after_failure() {
        let storage = Rc::new(MockStorage::default());
        let (mut rt, _bus) = open_runtime(&storage);
        let llm = ScriptedLlm::new(vec![
            Err(ChatError::Network("offline".to_string())),
            Ok("Back online".to_string()),
            Ok(String::new()),
        ]);

        assert!(block_on(rt.send_message("Q1", &llm)).is_err());
        block_on(rt.send_message("Q2", &llm)).unwrap();

        assert_eq!(rt.session.messages().len(), 3);
        assert_eq!(rt.history().len(), 1);
    }

    #[test]
    fn test_runtime_related_failure_does_not_fail_turn() {
        let storage = Rc::new(MockStorage::default());
        let (mut rt, bus) = open_runtime(&storage);
        let llm = ScriptedLlm::new(vec![Ok("Answer".to_string())]);

        block_on(rt.send_message("Q", &llm)).unwrap();
        let events = bus.drain();
        assert!(!events.iter().any(|e| matches!(e, ChatEvent::RelatedQuestions { .. })));
        assert_eq!(rt.history().len(), 1);
    }

    #[test]
    fn test_runtime_rejects_empty_input() {
        let storage = Rc::new(MockStorage::default());
        let (mut rt, bus) = open_runtime(&storage);
        let llm = ScriptedLlm::new(vec![]);

        assert_eq!(block_on(rt.send_message("   ", &llm)), Err(ChatError::EmptyInput));
        assert!(!rt.session.is_active());
        assert!(llm.requests.borrow().is_empty());
        assert!(bus.drain().is_empty());
    }

    #[test]
    fn test_runtime_rejects_send_while_pending() {
        let storage = Rc::new(MockStorage::default());
        let (mut rt, _bus) = open_runtime(&storage);
        let llm = ScriptedLlm::new(vec![Ok("x".to_string())]);

        rt.state = ChatState::Thinking;
        assert_eq!(block_on(rt.send_message("Q", &llm)), Err(ChatError::Busy));
        assert!(llm.requests.borrow().is_empty());
    }

    #[test]
    fn test_runtime_truncates_long_input() {
        let storage = Rc::new(MockStorage::default());
        let (mut rt, _bus) = open_runtime(&storage);
        rt.config.max_input_chars = 5;
        let llm = ScriptedLlm::new(vec![Ok("ok".to_string())]);

        block_on(rt.send_message("abcdefgh", &llm)).unwrap();
        assert_eq!(rt.session.messages()[0], Message::user("abcde"));
    }

    #[test]
    fn test_runtime_write_failure_becomes_notice() {
        let storage = Rc::new(MockStorage::default());
        let (mut rt, bus) = open_runtime(&storage);
        storage.fail_writes.set(true);
        let llm = ScriptedLlm::new(vec![Ok("A".to_string())]);

        block_on(rt.send_message("Q", &llm)).unwrap();

        let events = bus.drain();
        assert!(events.iter().any(|e| matches!(e, ChatEvent::Notice { message } if message.contains("Could not save"))));
        assert!(!events.iter().any(|e| matches!(e, ChatEvent::ConversationSaved { .. })));
        assert_eq!(rt.history().len(), 1);
    }

    #[test]
    fn test_runtime_new_chat_starts_fresh_conversation() {
        let storage = Rc::new(MockStorage::default());
        let (mut rt, bus) = open_runtime(&storage);
        let llm = ScriptedLlm::new(vec![
            Ok("A1".to_string()),
            Ok(String::new()),
            Ok("A2".to_string()),
            Ok(String::new()),
        ]);

        block_on(rt.send_message("First topic", &llm)).unwrap();
        let first_id = rt.session.id().unwrap().to_string();

        rt.new_chat();
        assert!(!rt.session.is_active());
        assert!(bus.drain().iter().any(|e| matches!(e, ChatEvent::SessionCleared)));

        block_on(rt.send_message("Second topic", &llm)).unwrap();
        let history = rt.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].title, "Second topic");
        assert_eq!(history[1].id, first_id);
    }

    #[test]
    fn test_runtime_open_conversation() {
        let storage = Rc::new(MockStorage::default());
        let (mut rt, bus) = open_runtime(&storage);
        let llm = ScriptedLlm::new(vec![Ok("A1".to_string()), Ok(String::new())]);
        block_on(rt.send_message("Q1", &llm)).unwrap();
        let id = rt.session.id().unwrap().to_string();
        rt.new_chat();
        bus.drain();

        assert!(rt.open_conversation(&id));
        assert_eq!(rt.session.id(), Some(id.as_str()));
        assert_eq!(rt.session.messages().len(), 2);
        let events = bus.drain();
        assert!(matches!(&events[..], [ChatEvent::ConversationOpened { messages, .. }] if messages.len() == 2));
    }

    #[test]
    fn test_runtime_open_unknown_conversation_is_noop() {
        let storage = Rc::new(MockStorage::default());
        let (mut rt, bus) = open_runtime(&storage);
        rt.session.append_message(Role::User, "draft");

        assert!(!rt.open_conversation("nope"));
        assert_eq!(rt.session.messages(), &[Message::user("draft")]);
        assert!(bus.drain().is_empty());
    }

    #[test]
    fn test_runtime_clear_history() {
        let storage = Rc::new(MockStorage::default());
        let (mut rt, bus) = open_runtime(&storage);
        let llm = ScriptedLlm::new(vec![Ok("A".to_string())]);
        block_on(rt.send_message("Q", &llm)).unwrap();
        bus.drain();

        block_on(rt.clear_history());
        assert!(rt.history().is_empty());
        assert!(!rt.session.is_active());
        assert!(storage.raw(CONVERSATIONS_KEY).is_none());

        let events = bus.drain();
        assert!(events.iter().any(|e| matches!(e, ChatEvent::Notice { message } if message == "Chat history cleared")));
        assert!(matches!(events.last(), Some(ChatEvent::HistoryChanged { conversations }) if conversations.is_empty()));
    }

    #[test]
    fn test_runtime_history_survives_reload() {
        let storage = Rc::new(MockStorage::default());
        {
            let (mut rt, _bus) = open_runtime(&storage);
            let llm = ScriptedLlm::new(vec![Ok("A".to_string())]);
            block_on(rt.send_message("Persist me", &llm)).unwrap();
        }
        let (rt, _bus) = open_runtime(&storage);
        assert_eq!(rt.history().len(), 1);
        assert_eq!(rt.history()[0].title, "Persist me");
    }

    #[test]
    fn test_save_answer_notice() {
        let storage = Rc::new(MockStorage::default());
        let saved = SavedAnswers::new(storage.clone());
        let bus = EventBus::new();

        block_on(runtime::save_answer(&saved, &bus, "Mitochondria"));
        storage.fail_writes.set(true);
        block_on(runtime::save_answer(&saved, &bus, "Chloroplast"));

        let notices: Vec<String> = bus
            .drain()
            .into_iter()
            .filter_map(|e| match e {
                ChatEvent::Notice { message } => Some(message),
                _ => None,
            })
            .collect();
        assert_eq!(notices, vec!["Answer saved for offline review!", "Failed to save answer"]);
    }

    #[test]
    fn test_generate_diagram() {
        let bus = EventBus::new();
        let url = block_on(runtime::generate_diagram(
            &MockImage { fail: false },
            &bus,
            3,
            "The heart has four chambers",
        ))
        .unwrap();
        assert!(url.starts_with("https://img.test/"));
        let events = bus.drain();
        assert!(matches!(&events[0], ChatEvent::DiagramReady { entry_id: 3, .. }));

        let result = block_on(runtime::generate_diagram(&MockImage { fail: true }, &bus, 3, "x"));
        assert!(result.is_err());
        assert!(matches!(
            &bus.drain()[..],
            [ChatEvent::DiagramFailed { entry_id: 3 }, ChatEvent::Notice { message }]
                if message == "Failed to load diagram"
        ));
    }
}
