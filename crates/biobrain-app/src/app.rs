//! Main egui application: composes the panels and drives the chat runtime.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use egui::{self, CentralPanel, RichText, SidePanel, TopBottomPanel};

use biobrain_core::credentials::{ActiveKey, CredentialStore};
use biobrain_core::event_bus::EventBus;
use biobrain_core::ports::{ImagePort, LlmPort, StoragePort};
use biobrain_core::runtime::{self, ChatRuntime};
use biobrain_core::saved::SavedAnswers;
use biobrain_platform::image::PollinationsImages;
use biobrain_platform::llm::OpenRouterProvider;
use biobrain_platform::storage::{auto_detect_storage, open_storage};
use biobrain_types::config::{ChatConfig, LlmRoute};
use biobrain_ui::panels::chat::{self, ChatAction};
use biobrain_ui::panels::history::{self, HistoryAction};
use biobrain_ui::panels::settings::{self, KeyForm, SaveFeedback, SettingsAction};
use biobrain_ui::state::{EntryKind, UiState};
use biobrain_ui::theme;

const CONFIG_STORAGE_KEY: &str = "biobrain:config";

/// Built-in key for the direct route, injected at build time
const DEFAULT_API_KEY: &str = match option_env!("BIOBRAIN_DEFAULT_API_KEY") {
    Some(key) => key,
    None => "",
};

type SharedRuntime = Rc<RefCell<Option<ChatRuntime>>>;

/// Values restored asynchronously at startup
struct Restored {
    config: ChatConfig,
    key: ActiveKey,
    remembered: bool,
}

/// The main application state
pub struct BioBrainApp {
    ui_state: UiState,
    config: ChatConfig,
    key_form: KeyForm,
    save_feedback: Option<SaveFeedback>,
    event_bus: EventBus,
    /// Settings, credentials and saved answers live here
    settings_storage: Rc<dyn StoragePort>,
    credentials: Rc<CredentialStore>,
    saved: SavedAnswers,
    /// `None` until the history store has been opened
    runtime: SharedRuntime,
    api_key: String,
    llm: Rc<dyn LlmPort>,
    image: Rc<dyn ImagePort>,
    restored: Rc<RefCell<Option<Restored>>>,
    /// Config edits not yet pushed into the runtime
    runtime_config_dirty: bool,
    first_frame: bool,
}

impl BioBrainApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let config = ChatConfig::default();
        let event_bus = EventBus::new();
        let settings_storage = auto_detect_storage();
        let credentials = Rc::new(CredentialStore::new(
            settings_storage.clone(),
            DEFAULT_API_KEY,
        ));

        let app = Self {
            ui_state: UiState::new(),
            llm: Rc::new(OpenRouterProvider::new(config.llm.clone(), DEFAULT_API_KEY)),
            image: Rc::new(PollinationsImages::new(config.image.clone())),
            api_key: DEFAULT_API_KEY.to_string(),
            key_form: KeyForm {
                using_default: true,
                ..KeyForm::default()
            },
            save_feedback: None,
            config,
            event_bus,
            saved: SavedAnswers::new(settings_storage.clone()),
            settings_storage,
            credentials,
            runtime: Rc::new(RefCell::new(None)),
            restored: Rc::new(RefCell::new(None)),
            runtime_config_dirty: false,
            first_frame: true,
        };

        app.boot(cc.egui_ctx.clone());
        app
    }

    /// Restore settings and the API key, then open the history store.
    fn boot(&self, ctx: egui::Context) {
        let settings_storage = self.settings_storage.clone();
        let credentials = self.credentials.clone();
        let event_bus = self.event_bus.clone();
        let runtime = self.runtime.clone();
        let restored = self.restored.clone();

        wasm_bindgen_futures::spawn_local(async move {
            let config = load_config(settings_storage.as_ref()).await;
            let key = credentials.load().await;
            let remembered = credentials.has_stored_key().await;

            let history_storage = open_storage(&config.storage.backend);
            let rt = ChatRuntime::open(config.clone(), history_storage, event_bus).await;
            *runtime.borrow_mut() = Some(rt);
            *restored.borrow_mut() = Some(Restored {
                config,
                key,
                remembered,
            });
            ctx.request_repaint();
        });
    }

    fn apply_restored(&mut self, restored: Restored) {
        self.config = restored.config;
        self.key_form = KeyForm {
            api_key: if restored.key.using_default {
                String::new()
            } else {
                restored.key.key.clone()
            },
            remember: restored.remembered,
            using_default: restored.key.using_default,
        };
        self.api_key = restored.key.key;
        self.rebuild_adapters();
    }

    fn rebuild_adapters(&mut self) {
        self.llm = Rc::new(OpenRouterProvider::new(
            self.config.llm.clone(),
            self.api_key.clone(),
        ));
        self.image = Rc::new(PollinationsImages::new(self.config.image.clone()));
    }

    /// Push config edits into the runtime once it is free.
    fn sync_runtime_config(&mut self) {
        if !self.runtime_config_dirty {
            return;
        }
        if let Ok(mut slot) = self.runtime.try_borrow_mut() {
            if let Some(rt) = slot.as_mut() {
                rt.config = self.config.clone();
                self.runtime_config_dirty = false;
            }
        }
    }

    /// Apply the key form: switch keys now, persist in the background.
    fn apply_key_form(&mut self) {
        let entered = self.key_form.api_key.trim().to_string();
        let remember = self.key_form.remember;
        if entered.is_empty() {
            self.api_key = DEFAULT_API_KEY.to_string();
            self.key_form.using_default = true;
        } else {
            self.api_key = entered.clone();
            self.key_form.using_default = false;
        }

        let credentials = self.credentials.clone();
        let event_bus = self.event_bus.clone();
        wasm_bindgen_futures::spawn_local(async move {
            if let Err(e) = credentials.save(&entered, remember).await {
                log::error!("Failed to store API key: {}", e);
                event_bus.notice("Could not store API key");
            }
        });
    }

    fn on_settings_changed(&mut self) {
        self.rebuild_adapters();
        self.runtime_config_dirty = true;
        save_config(self.settings_storage.clone(), &self.config);
    }
}

impl eframe::App for BioBrainApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.first_frame {
            theme::apply_theme(ctx);
            self.first_frame = false;
        }

        let restored = self.restored.borrow_mut().take();
        if let Some(restored) = restored {
            self.apply_restored(restored);
        }
        self.sync_runtime_config();

        // Drain events from the chat runtime
        let events = self.event_bus.drain();
        if !events.is_empty() {
            self.ui_state.process_events(events);
            ctx.request_repaint();
        }

        self.ui_state.tick(ctx.input(|i| i.time));
        if self.ui_state.notice.is_some() {
            ctx.request_repaint_after(Duration::from_millis(250));
        }
        if self.ui_state.is_busy() {
            ctx.request_repaint();
        }

        // ── Top bar ──────────────────────────────────────────
        TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui
                    .selectable_label(self.ui_state.show_history, "History")
                    .clicked()
                {
                    self.ui_state.show_history = !self.ui_state.show_history;
                }
                ui.separator();
                ui.label(
                    RichText::new("BioBrain AI")
                        .strong()
                        .color(theme::ACCENT)
                        .size(16.0),
                );
                ui.separator();
                ui.label(
                    RichText::new(format!(
                        "Route: {} | Model: {}",
                        self.config.llm.route.label(),
                        self.config.llm.model
                    ))
                    .color(theme::TEXT_SECONDARY)
                    .small(),
                );
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui
                        .selectable_label(self.ui_state.show_settings, "Settings")
                        .clicked()
                    {
                        self.ui_state.show_settings = !self.ui_state.show_settings;
                    }
                });
            });
        });

        // ── History side panel ───────────────────────────────
        if self.ui_state.show_history {
            let action = SidePanel::left("history_panel")
                .min_width(220.0)
                .max_width(300.0)
                .show(ctx, |ui| {
                    history::history_panel(
                        ui,
                        &self.ui_state.history,
                        self.ui_state.active_conversation.as_deref(),
                        &mut self.ui_state.confirm_clear,
                    )
                })
                .inner;
            self.handle_history_action(action, ctx);
        }

        // ── Settings side panel ──────────────────────────────
        if self.ui_state.show_settings {
            let action = SidePanel::right("settings_panel")
                .min_width(280.0)
                .max_width(350.0)
                .show(ctx, |ui| {
                    settings::settings_panel(
                        ui,
                        &mut self.config,
                        &mut self.key_form,
                        self.save_feedback.as_ref(),
                    )
                })
                .inner;
            match action {
                SettingsAction::None => {}
                SettingsAction::Changed => {
                    self.save_feedback = None;
                    self.on_settings_changed();
                }
                SettingsAction::SaveClicked => {
                    if self.config.llm.route == LlmRoute::Direct {
                        self.apply_key_form();
                    }
                    self.on_settings_changed();
                    self.save_feedback = Some(SaveFeedback {
                        message: "Settings saved".to_string(),
                        success: true,
                    });
                }
            }
        }

        // ── Main content ─────────────────────────────────────
        let action = CentralPanel::default()
            .show(ctx, |ui| {
                chat::notice_bar(ui, &self.ui_state);
                chat::chat_panel(ui, &mut self.ui_state, self.config.max_input_chars)
            })
            .inner;
        self.handle_chat_action(action, ctx);
    }
}

impl BioBrainApp {
    fn handle_chat_action(&mut self, action: ChatAction, ctx: &egui::Context) {
        match action {
            ChatAction::None => {}
            ChatAction::Send(text) => self.dispatch_message(text, ctx),
            ChatAction::SaveAnswer(index) => {
                let Some(content) = self.assistant_text(index) else {
                    return;
                };
                let saved = self.saved.clone();
                let event_bus = self.event_bus.clone();
                let ctx = ctx.clone();
                wasm_bindgen_futures::spawn_local(async move {
                    runtime::save_answer(&saved, &event_bus, &content).await;
                    ctx.request_repaint();
                });
            }
            ChatAction::Diagram(index) => {
                let Some(content) = self.assistant_text(index) else {
                    return;
                };
                let Some(entry_id) = self.ui_state.begin_diagram(index) else {
                    return;
                };
                let image = self.image.clone();
                let event_bus = self.event_bus.clone();
                let ctx = ctx.clone();
                wasm_bindgen_futures::spawn_local(async move {
                    // Failures are reported on the event bus
                    let _ = runtime::generate_diagram(image.as_ref(), &event_bus, entry_id, &content)
                        .await;
                    ctx.request_repaint();
                });
            }
        }
    }

    fn assistant_text(&self, index: usize) -> Option<String> {
        self.ui_state
            .messages
            .get(index)
            .filter(|entry| entry.kind == EntryKind::Assistant)
            .map(|entry| entry.content.clone())
    }

    fn handle_history_action(&mut self, action: HistoryAction, ctx: &egui::Context) {
        match action {
            HistoryAction::None => {}
            HistoryAction::NewChat => {
                self.with_idle_runtime(|rt| rt.new_chat());
            }
            HistoryAction::Open(id) => {
                self.with_idle_runtime(|rt| {
                    rt.open_conversation(&id);
                });
            }
            HistoryAction::ClearAll => {
                let runtime = self.runtime.clone();
                let event_bus = self.event_bus.clone();
                let ctx = ctx.clone();
                wasm_bindgen_futures::spawn_local(async move {
                    let Ok(mut slot) = runtime.try_borrow_mut() else {
                        event_bus.notice("Please wait for the current answer");
                        return;
                    };
                    if let Some(rt) = slot.as_mut() {
                        rt.clear_history().await;
                    }
                    ctx.request_repaint();
                });
            }
        }
    }

    /// Run `f` on the runtime unless a turn is in flight or it is still loading.
    fn with_idle_runtime(&self, f: impl FnOnce(&mut ChatRuntime)) {
        match self.runtime.try_borrow_mut() {
            Ok(mut slot) => match slot.as_mut() {
                Some(rt) => f(rt),
                None => self.event_bus.notice("Still loading history"),
            },
            Err(_) => self.event_bus.notice("Please wait for the current answer"),
        }
    }

    /// Dispatch a user message to the chat runtime (async)
    fn dispatch_message(&self, text: String, ctx: &egui::Context) {
        let runtime = self.runtime.clone();
        let llm = self.llm.clone();
        let event_bus = self.event_bus.clone();
        let ctx = ctx.clone();

        wasm_bindgen_futures::spawn_local(async move {
            // A pending turn holds the borrow until its answer arrives
            let Ok(mut slot) = runtime.try_borrow_mut() else {
                event_bus.notice("Please wait for the current answer");
                return;
            };
            let Some(rt) = slot.as_mut() else {
                event_bus.notice("Still loading history");
                return;
            };
            if let Err(e) = rt.send_message(&text, llm.as_ref()).await {
                log::warn!("Chat turn error: {}", e);
            }
            ctx.request_repaint();
        });
    }
}

/// Read the saved config. Missing or unreadable data yields defaults.
async fn load_config(storage: &dyn StoragePort) -> ChatConfig {
    match storage.get(CONFIG_STORAGE_KEY).await {
        Ok(Some(data)) => match serde_json::from_str::<ChatConfig>(&data) {
            Ok(config) => {
                log::info!("Config restored from storage");
                config
            }
            Err(e) => {
                log::warn!("Stored config unreadable ({}), using defaults", e);
                ChatConfig::default()
            }
        },
        Ok(None) => ChatConfig::default(),
        Err(e) => {
            log::warn!("Failed to read config: {}", e);
            ChatConfig::default()
        }
    }
}

/// Save config to storage (async, fire-and-forget)
fn save_config(storage: Rc<dyn StoragePort>, config: &ChatConfig) {
    match serde_json::to_string(config) {
        Ok(json) => wasm_bindgen_futures::spawn_local(async move {
            match storage.set(CONFIG_STORAGE_KEY, &json).await {
                Ok(()) => log::info!("Config saved to storage"),
                Err(e) => log::error!("Failed to save config: {}", e),
            }
        }),
        Err(e) => log::error!("Failed to serialize config: {}", e),
    }
}
