//! History sidebar: stored conversations, newest first.

use egui::{self, RichText, ScrollArea, Vec2};
use biobrain_types::conversation::ConversationSummary;
use crate::theme::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryAction {
    None,
    NewChat,
    Open(String),
    ClearAll,
}

/// A click in the clear-history row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearStep {
    Request,
    Confirm,
    Cancel,
}

/// Clearing is irreversible, so it takes a Request followed by a Confirm.
pub fn clear_step(confirming: &mut bool, step: ClearStep) -> HistoryAction {
    match step {
        ClearStep::Request => {
            *confirming = true;
            HistoryAction::None
        }
        ClearStep::Confirm if *confirming => {
            *confirming = false;
            HistoryAction::ClearAll
        }
        ClearStep::Confirm | ClearStep::Cancel => {
            *confirming = false;
            HistoryAction::None
        }
    }
}

pub fn history_panel(
    ui: &mut egui::Ui,
    history: &[ConversationSummary],
    active: Option<&str>,
    confirm_clear: &mut bool,
) -> HistoryAction {
    let mut action = HistoryAction::None;

    egui::Frame::default()
        .fill(BG_SECONDARY)
        .inner_margin(PANEL_PADDING)
        .show(ui, |ui| {
            ui.heading(RichText::new("History").color(TEXT_PRIMARY));

            let width = ui.available_width();
            let new_chat = ui.add(
                egui::Button::new(RichText::new("+ New Chat").color(TEXT_PRIMARY))
                    .fill(ACCENT)
                    .corner_radius(PANEL_ROUNDING)
                    .min_size(Vec2::new(width, 28.0)),
            );
            if new_chat.clicked() {
                action = HistoryAction::NewChat;
            }

            ui.separator();

            if history.is_empty() {
                ui.label(
                    RichText::new("No saved conversations yet")
                        .color(TEXT_SECONDARY)
                        .small()
                        .italics(),
                );
            }

            let list_height = ui.available_height() - 40.0;
            ScrollArea::vertical()
                .max_height(list_height)
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    for summary in history {
                        let selected = active == Some(summary.id.as_str());
                        let item = ui.selectable_label(
                            selected,
                            RichText::new(&summary.title).color(TEXT_PRIMARY),
                        );
                        if item.clicked() && !selected {
                            action = HistoryAction::Open(summary.id.clone());
                        }
                        ui.label(
                            RichText::new(format!(
                                "{} · {} messages",
                                summary
                                    .saved_at
                                    .with_timezone(&chrono::Local)
                                    .format("%b %d, %I:%M %p"),
                                summary.message_count
                            ))
                            .color(TEXT_SECONDARY)
                            .small(),
                        );
                        ui.add_space(4.0);
                    }
                });

            if !history.is_empty() {
                ui.separator();
                let mut step = None;
                if *confirm_clear {
                    ui.label(
                        RichText::new("Clear all chat history? This cannot be undone.")
                            .color(WARNING)
                            .small(),
                    );
                    ui.horizontal(|ui| {
                        if ui.button(RichText::new("Yes, clear").color(ERROR)).clicked() {
                            step = Some(ClearStep::Confirm);
                        }
                        if ui.button("Cancel").clicked() {
                            step = Some(ClearStep::Cancel);
                        }
                    });
                } else if ui
                    .button(RichText::new("Clear History").color(ERROR))
                    .clicked()
                {
                    step = Some(ClearStep::Request);
                }
                if let Some(step) = step {
                    action = clear_step(confirm_clear, step);
                }
            }
        });

    action
}
