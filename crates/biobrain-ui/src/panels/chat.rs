//! Chat panel: conversation bubbles, related questions and the input field.

use egui::{self, Align, Layout, RichText, ScrollArea, Vec2};
use crate::markup;
use crate::state::{ChatEntry, EntryKind, UiState};
use crate::theme::*;

/// Starter questions offered on an empty chat
pub const EXAMPLE_PROMPTS: [&str; 4] = [
    "Explain the process of photosynthesis",
    "What are the functions of the cell membrane?",
    "How does the human heart pump blood?",
    "Describe the stages of cellular respiration",
];

/// What the caller should do after rendering the chat panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatAction {
    None,
    /// The user submitted a question
    Send(String),
    /// Pin the assistant entry at this index for offline review
    SaveAnswer(usize),
    /// Request a diagram for the assistant entry at this index
    Diagram(usize),
}

/// Render the chat panel.
pub fn chat_panel(ui: &mut egui::Ui, state: &mut UiState, max_input_chars: usize) -> ChatAction {
    let mut action = ChatAction::None;

    egui::Frame::default()
        .fill(BG_PRIMARY)
        .inner_margin(PANEL_PADDING)
        .show(ui, |ui| {
            ui.vertical(|ui| {
                // Header
                ui.horizontal(|ui| {
                    ui.heading(
                        RichText::new("BioBrain AI")
                            .color(TEXT_PRIMARY)
                            .strong(),
                    );
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        let status_color = match state.chat_status {
                            _ if state.is_busy() => WARNING,
                            biobrain_core::runtime::ChatState::Error(_) => ERROR,
                            _ => SUCCESS,
                        };
                        ui.label(
                            RichText::new(&state.status_text)
                                .color(status_color)
                                .small(),
                        );
                    });
                });

                ui.separator();

                // Messages area
                let available_height = ui.available_height() - 72.0;
                ScrollArea::vertical()
                    .max_height(available_height)
                    .auto_shrink([false, false])
                    .stick_to_bottom(true)
                    .show(ui, |ui| {
                        if state.messages.is_empty() {
                            if let Some(a) = welcome(ui, !state.is_busy()) {
                                action = a;
                            }
                        }

                        for (index, entry) in state.messages.iter().enumerate() {
                            if let Some(a) = render_message(ui, index, entry) {
                                action = a;
                            }
                            ui.add_space(4.0);
                        }

                        if state.is_busy() {
                            ui.label(RichText::new("Thinking…").color(TEXT_SECONDARY).italics());
                        }

                        if !state.related_questions.is_empty() {
                            ui.add_space(4.0);
                            ui.label(RichText::new("Related questions").color(ACCENT).small());
                            for question in &state.related_questions {
                                if ui
                                    .add_enabled(!state.is_busy(), egui::Button::new(question.as_str()))
                                    .clicked()
                                {
                                    action = ChatAction::Send(question.clone());
                                }
                            }
                        }
                    });

                ui.add_space(8.0);

                // Input area
                ui.horizontal(|ui| {
                    let input = egui::TextEdit::multiline(&mut state.input_text)
                        .hint_text("Ask a biology question...")
                        .desired_rows(1)
                        .char_limit(max_input_chars)
                        .desired_width(ui.available_width() - 70.0)
                        .font(egui::FontId::proportional(14.0));

                    let response = ui.add(input);

                    let send_enabled = !state.input_text.trim().is_empty() && !state.is_busy();
                    let send_btn = ui.add_enabled(
                        send_enabled,
                        egui::Button::new(
                            RichText::new("Send").color(TEXT_PRIMARY),
                        )
                        .fill(if send_enabled { ACCENT } else { BG_SURFACE })
                        .corner_radius(PANEL_ROUNDING)
                        .min_size(Vec2::new(60.0, 0.0)),
                    );

                    // Enter sends, Shift+Enter keeps editing
                    let enter = response.has_focus()
                        && ui.input(|i| i.key_pressed(egui::Key::Enter) && !i.modifiers.shift);
                    if (enter && send_enabled) || send_btn.clicked() {
                        let text = state.input_text.trim().to_string();
                        action = ChatAction::Send(text);
                        state.input_text.clear();
                        response.request_focus();
                    }
                });

                ui.label(
                    RichText::new(format!(
                        "{}/{}",
                        state.input_text.chars().count(),
                        max_input_chars
                    ))
                    .color(TEXT_SECONDARY)
                    .small(),
                );
            });
        });

    action
}

/// Clicking a starter question sends it as if typed.
pub fn example_prompt_action(index: usize) -> ChatAction {
    match EXAMPLE_PROMPTS.get(index) {
        Some(prompt) => ChatAction::Send((*prompt).to_string()),
        None => ChatAction::None,
    }
}

fn welcome(ui: &mut egui::Ui, enabled: bool) -> Option<ChatAction> {
    let mut action = None;
    ui.add_space(24.0);
    ui.vertical_centered(|ui| {
        ui.label(RichText::new("Ask anything about Class 11 biology").color(TEXT_PRIMARY).strong());
        ui.label(
            RichText::new("Cells, biomolecules, plant and human physiology")
                .color(TEXT_SECONDARY)
                .small(),
        );
        ui.add_space(12.0);
        for (index, prompt) in EXAMPLE_PROMPTS.iter().enumerate() {
            if ui
                .add_enabled(enabled, egui::Button::new(RichText::new(*prompt).color(ACCENT_SOFT)))
                .clicked()
            {
                action = Some(example_prompt_action(index));
            }
        }
    });
    action
}

fn render_message(ui: &mut egui::Ui, index: usize, entry: &ChatEntry) -> Option<ChatAction> {
    let bubble = bubble_style(entry.kind);

    let mut action = None;
    egui::Frame::default()
        .fill(bubble.fill)
        .corner_radius(PANEL_ROUNDING)
        .inner_margin(8.0)
        .show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.label(RichText::new(bubble.label).color(bubble.label_color).strong().small());
                ui.label(RichText::new(&entry.time).color(TEXT_SECONDARY).small());
            });
            ui.label(markup::layout_job(&entry.content, BODY_SIZE, TEXT_PRIMARY, TEXT_STRONG));

            if entry.kind != EntryKind::Assistant {
                return;
            }
            ui.horizontal(|ui| {
                if ui.small_button("Save").clicked() {
                    action = Some(ChatAction::SaveAnswer(index));
                }
                let diagram_label = if entry.diagram_pending {
                    "Loading..."
                } else if entry.diagram_url.is_some() {
                    "Diagram Shown"
                } else {
                    "Diagram"
                };
                let can_request = !entry.diagram_pending && entry.diagram_url.is_none();
                if ui
                    .add_enabled(can_request, egui::Button::new(diagram_label).small())
                    .clicked()
                {
                    action = Some(ChatAction::Diagram(index));
                }
            });
            if let Some(ref url) = entry.diagram_url {
                ui.hyperlink_to("Open diagram", url);
            }
        });
    action
}

/// One-line toast for the current notice, if any.
pub fn notice_bar(ui: &mut egui::Ui, state: &UiState) {
    let Some(ref notice) = state.notice else {
        return;
    };
    egui::Frame::default()
        .fill(NOTICE_BG)
        .corner_radius(PANEL_ROUNDING)
        .inner_margin(6.0)
        .show(ui, |ui| {
            ui.label(RichText::new(&notice.message).color(TEXT_PRIMARY).small());
        });
}
