//! Settings panel: LLM route, API key, model and storage mode.

use egui::{self, RichText, Vec2};
use biobrain_types::config::{ChatConfig, LlmRoute, StorageBackendType};
use crate::theme::*;

/// What the caller should do after rendering the settings panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsAction {
    /// Nothing changed
    None,
    /// A config field was changed (auto-save)
    Changed,
    /// The user clicked the explicit Save button
    SaveClicked,
}

/// Editable API key fields. Kept apart from [`ChatConfig`] so the key is
/// never serialized with the rest of the settings.
#[derive(Debug, Clone, Default)]
pub struct KeyForm {
    pub api_key: String,
    /// Persist the key across visits
    pub remember: bool,
    /// The runtime is currently on the built-in key
    pub using_default: bool,
}

/// Save feedback passed in from the app layer
#[derive(Debug, Clone)]
pub struct SaveFeedback {
    pub message: String,
    pub success: bool,
}

/// Render the settings panel. Returns an action for the caller to handle.
pub fn settings_panel(
    ui: &mut egui::Ui,
    config: &mut ChatConfig,
    key_form: &mut KeyForm,
    save_feedback: Option<&SaveFeedback>,
) -> SettingsAction {
    let mut changed = false;
    let mut save_clicked = false;

    egui::Frame::default()
        .fill(BG_SECONDARY)
        .inner_margin(PANEL_PADDING)
        .corner_radius(PANEL_ROUNDING)
        .show(ui, |ui| {
            ui.heading(RichText::new("Settings").color(TEXT_PRIMARY));
            ui.separator();

            // ── LLM Section ──────────────────────────────────
            ui.label(RichText::new("LLM").color(ACCENT).strong());
            ui.add_space(2.0);

            ui.label(RichText::new("Route").color(TEXT_SECONDARY).small());
            egui::ComboBox::from_id_salt("llm_route")
                .selected_text(config.llm.route.label())
                .show_ui(ui, |ui| {
                    for route in LlmRoute::all() {
                        if ui
                            .selectable_value(&mut config.llm.route, *route, route.label())
                            .changed()
                        {
                            changed = true;
                        }
                    }
                });

            ui.add_space(4.0);

            ui.label(RichText::new("Model").color(TEXT_SECONDARY).small());
            if ui.text_edit_singleline(&mut config.llm.model).changed() {
                changed = true;
            }

            ui.add_space(4.0);

            if config.llm.route.needs_api_key() {
                ui.label(RichText::new("API Key").color(TEXT_SECONDARY).small());
                ui.add(
                    egui::TextEdit::singleline(&mut key_form.api_key)
                        .password(true)
                        .hint_text("sk-or-..."),
                );
                ui.checkbox(&mut key_form.remember, "Remember on this device");
                let key_status = if key_form.using_default {
                    "Using the built-in key. Leave blank to keep it."
                } else {
                    "Using your own key."
                };
                ui.label(RichText::new(key_status).color(TEXT_SECONDARY).small().italics());

                ui.add_space(4.0);

                ui.label(RichText::new("API Base URL (optional)").color(TEXT_SECONDARY).small());
                let mut base_url = config.llm.api_base.clone().unwrap_or_default();
                if ui
                    .add(
                        egui::TextEdit::singleline(&mut base_url)
                            .hint_text(biobrain_types::config::OPENROUTER_BASE_URL),
                    )
                    .changed()
                {
                    config.llm.api_base = if base_url.trim().is_empty() {
                        None
                    } else {
                        Some(base_url)
                    };
                    changed = true;
                }

                ui.label(RichText::new("Temperature").color(TEXT_SECONDARY).small());
                if ui
                    .add(egui::Slider::new(&mut config.llm.temperature, 0.0..=2.0))
                    .changed()
                {
                    changed = true;
                }

                ui.label(RichText::new("Max Tokens").color(TEXT_SECONDARY).small());
                if ui
                    .add(egui::Slider::new(&mut config.llm.max_tokens, 100..=4000))
                    .changed()
                {
                    changed = true;
                }
            } else {
                ui.label(RichText::new("Relay Endpoint").color(TEXT_SECONDARY).small());
                if ui.text_edit_singleline(&mut config.llm.relay_url).changed() {
                    changed = true;
                }
            }

            ui.add_space(12.0);
            ui.separator();
            ui.add_space(4.0);

            // ── Storage Section ──────────────────────────────
            ui.label(RichText::new("Storage").color(ACCENT).strong());
            ui.add_space(2.0);

            ui.label(RichText::new("Backend").color(TEXT_SECONDARY).small());
            egui::ComboBox::from_id_salt("storage_backend")
                .selected_text(storage_label(&config.storage.backend))
                .show_ui(ui, |ui| {
                    for backend in storage_options() {
                        let label = storage_label(&backend);
                        if ui
                            .selectable_value(&mut config.storage.backend, backend, label)
                            .changed()
                        {
                            changed = true;
                        }
                    }
                });

            ui.add_space(4.0);
            ui.label(
                RichText::new(storage_description(&config.storage.backend))
                    .color(TEXT_SECONDARY)
                    .small()
                    .italics(),
            );

            // ── Save Button ──────────────────────────────────
            ui.add_space(16.0);
            ui.separator();
            ui.add_space(8.0);

            ui.horizontal(|ui| {
                let btn = ui.add(
                    egui::Button::new(
                        RichText::new("Save Settings")
                            .color(TEXT_PRIMARY)
                            .strong(),
                    )
                    .fill(ACCENT)
                    .corner_radius(PANEL_ROUNDING)
                    .min_size(Vec2::new(120.0, 28.0)),
                );
                if btn.clicked() {
                    save_clicked = true;
                }

                if let Some(fb) = save_feedback {
                    let color = if fb.success { SUCCESS } else { ERROR };
                    ui.label(RichText::new(&fb.message).color(color).small());
                }
            });
        });

    if save_clicked {
        SettingsAction::SaveClicked
    } else if changed {
        SettingsAction::Changed
    } else {
        SettingsAction::None
    }
}

pub fn storage_label(backend: &StorageBackendType) -> &'static str {
    match backend {
        StorageBackendType::Auto => "Auto-detect",
        StorageBackendType::Memory => "Memory",
        StorageBackendType::LocalStorage => "Browser (localStorage)",
    }
}

fn storage_description(backend: &StorageBackendType) -> &'static str {
    match backend {
        StorageBackendType::Auto => "Uses browser storage when available, falls back to Memory.",
        StorageBackendType::Memory => "History is lost on page reload.",
        StorageBackendType::LocalStorage => "History survives page reloads. Takes effect after reload.",
    }
}

fn storage_options() -> [StorageBackendType; 3] {
    [
        StorageBackendType::Auto,
        StorageBackendType::Memory,
        StorageBackendType::LocalStorage,
    ]
}
