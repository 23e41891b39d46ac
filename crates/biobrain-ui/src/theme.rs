//! Colours and spacing. Deep forest background with a leaf-green accent.

use egui::{Color32, CornerRadius, Stroke, Vec2};

use crate::state::EntryKind;

pub const BG_PRIMARY: Color32 = Color32::from_rgb(15, 23, 20);
pub const BG_SECONDARY: Color32 = Color32::from_rgb(22, 34, 29);
pub const BG_SURFACE: Color32 = Color32::from_rgb(33, 50, 43);
pub const BG_INPUT: Color32 = Color32::from_rgb(10, 16, 14);
pub const BG_USER: Color32 = Color32::from_rgb(20, 61, 48);
pub const BG_ERROR: Color32 = Color32::from_rgb(58, 24, 24);
pub const NOTICE_BG: Color32 = Color32::from_rgb(25, 74, 56);

pub const TEXT_PRIMARY: Color32 = Color32::from_rgb(226, 236, 231);
pub const TEXT_STRONG: Color32 = Color32::from_rgb(255, 255, 255);
pub const TEXT_SECONDARY: Color32 = Color32::from_rgb(140, 163, 152);

pub const ACCENT: Color32 = Color32::from_rgb(16, 185, 129);
pub const ACCENT_SOFT: Color32 = Color32::from_rgb(110, 231, 183);
pub const SUCCESS: Color32 = Color32::from_rgb(52, 211, 153);
pub const ERROR: Color32 = Color32::from_rgb(248, 113, 113);
pub const WARNING: Color32 = Color32::from_rgb(251, 191, 36);

pub const PANEL_ROUNDING: CornerRadius = CornerRadius::same(8);
pub const PANEL_PADDING: Vec2 = Vec2::new(12.0, 8.0);
pub const BODY_SIZE: f32 = 14.0;

/// How a chat bubble is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BubbleStyle {
    pub label: &'static str,
    pub label_color: Color32,
    pub fill: Color32,
}

pub fn bubble_style(kind: EntryKind) -> BubbleStyle {
    match kind {
        EntryKind::User => BubbleStyle {
            label: "You",
            label_color: ACCENT_SOFT,
            fill: BG_USER,
        },
        EntryKind::Assistant => BubbleStyle {
            label: "BioBrain",
            label_color: ACCENT,
            fill: BG_SECONDARY,
        },
        EntryKind::Error => BubbleStyle {
            label: "BioBrain",
            label_color: ERROR,
            fill: BG_ERROR,
        },
    }
}

/// Install the palette into an egui context
pub fn apply_theme(ctx: &egui::Context) {
    ctx.style_mut(|style| {
        let visuals = &mut style.visuals;
        visuals.dark_mode = true;
        visuals.panel_fill = BG_PRIMARY;
        visuals.window_fill = BG_SECONDARY;
        visuals.extreme_bg_color = BG_INPUT;
        visuals.faint_bg_color = BG_SECONDARY;
        visuals.hyperlink_color = ACCENT_SOFT;

        for widget in [
            &mut visuals.widgets.inactive,
            &mut visuals.widgets.hovered,
            &mut visuals.widgets.active,
        ] {
            widget.corner_radius = PANEL_ROUNDING;
        }
        visuals.widgets.inactive.weak_bg_fill = BG_SURFACE;
        visuals.widgets.inactive.fg_stroke = Stroke::new(1.0, TEXT_SECONDARY);
        visuals.widgets.hovered.weak_bg_fill = BG_USER;
        visuals.widgets.hovered.fg_stroke = Stroke::new(1.0, TEXT_STRONG);
        visuals.widgets.active.weak_bg_fill = ACCENT;
        visuals.widgets.active.fg_stroke = Stroke::new(1.0, TEXT_STRONG);

        visuals.selection.bg_fill = ACCENT.linear_multiply(0.35);
        visuals.selection.stroke = Stroke::new(1.0, ACCENT_SOFT);

        style.spacing.item_spacing = Vec2::new(8.0, 6.0);
        style.spacing.button_padding = Vec2::new(10.0, 4.0);
    });
}
