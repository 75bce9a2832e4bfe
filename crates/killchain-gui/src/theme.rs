//! Killchain Theme
//!
//! Dark neon styling shared across panels, matching the graph palette in
//! `killchain_graph::style`.

use eframe::egui::{self, Color32};
use killchain_graph::style;

/// Spacing constants
pub mod spacing {
    pub const PANEL_PADDING: f32 = 12.0;
    pub const ITEM_SPACING: f32 = 8.0;
    pub const SECTION_SPACING: f32 = 16.0;
}

pub fn color32(color: style::Color) -> Color32 {
    let (r, g, b, a) = color.to_tuple();
    Color32::from_rgba_unmultiplied(r, g, b, a)
}

pub fn background() -> Color32 {
    color32(style::BACKGROUND)
}

pub fn label_text() -> Color32 {
    color32(style::LABEL_TEXT)
}

pub fn accent() -> Color32 {
    Color32::from_rgb(0x00, 0xf0, 0xff)
}

/// Install the application-wide visuals.
pub fn apply(ctx: &egui::Context) {
    let mut visuals = egui::Visuals::dark();
    visuals.panel_fill = Color32::from_rgb(0x10, 0x16, 0x2b);
    visuals.window_fill = visuals.panel_fill;
    visuals.extreme_bg_color = background();
    visuals.override_text_color = Some(label_text());
    visuals.selection.bg_fill = accent().linear_multiply(0.25);
    ctx.set_visuals(visuals);

    let mut egui_style = (*ctx.style()).clone();
    egui_style.spacing.item_spacing = egui::vec2(spacing::ITEM_SPACING, spacing::ITEM_SPACING);
    ctx.set_style(egui_style);
}
