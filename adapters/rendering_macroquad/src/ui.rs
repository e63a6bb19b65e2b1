//! Immediate-mode HUD panel for the Macroquad rendering backend.
//!
//! All uses of `macroquad::ui` live here so the renderer itself stays free of
//! Macroquad UI types.

use macroquad::{
    color::{Color, WHITE},
    math::{RectOffset, Vec2},
    ui::{hash, Ui},
};
use neuroflight_core::{FlightPhase, InputMode};
use neuroflight_rendering::HudPresentation;

/// Outcome of drawing the HUD panel for one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct HudUiResult {
    /// Whether the input-source button was clicked.
    pub(crate) mode_toggle_pressed: bool,
}

/// Layout and content of the HUD panel for the current frame.
#[derive(Clone, Copy, Debug)]
pub(crate) struct HudUiContext {
    /// Top-left corner of the panel in screen coordinates.
    pub(crate) origin: Vec2,
    /// Panel dimensions in screen space.
    pub(crate) size: Vec2,
    /// Panel background.
    pub(crate) background: Color,
    /// Status shown in the panel.
    pub(crate) hud: HudPresentation,
}

pub(crate) fn status_lines(hud: &HudPresentation) -> [String; 3] {
    let source = match hud.input_mode {
        InputMode::Keyboard => "keyboard",
        InputMode::External => "external",
    };
    let phase = match hud.phase {
        FlightPhase::Grounded => "grounded",
        FlightPhase::Lifting => "lifting",
        FlightPhase::Flying => "flying",
        FlightPhase::Falling => "falling",
    };
    let city = if hud.colliders_ready {
        "city: ready"
    } else {
        "city: loading"
    };
    [format!("input: {source}"), format!("drone: {phase}"), city.to_owned()]
}

pub(crate) fn draw_hud_ui(ui: &mut Ui, context: HudUiContext) -> HudUiResult {
    let mut skin = ui.default_skin();
    skin.margin = 0.0;

    skin.window_style = ui
        .style_builder()
        .color(context.background)
        .color_hovered(context.background)
        .color_clicked(context.background)
        .color_inactive(context.background)
        .text_color(WHITE)
        .margin(RectOffset::new(12.0, 12.0, 12.0, 12.0))
        .build();
    skin.label_style = ui
        .style_builder()
        .text_color(WHITE)
        .margin(RectOffset::new(0.0, 0.0, 2.0, 2.0))
        .build();
    skin.button_style = ui
        .style_builder()
        .text_color(WHITE)
        .color(Color::from_rgba(70, 70, 70, 255))
        .color_hovered(Color::from_rgba(96, 96, 96, 255))
        .color_clicked(Color::from_rgba(56, 56, 56, 255))
        .margin(RectOffset::new(0.0, 0.0, 6.0, 6.0))
        .build();

    ui.push_skin(&skin);

    let mut pressed = false;
    let _ = ui.window(hash!("hud"), context.origin, context.size, |ui| {
        for line in status_lines(&context.hud) {
            ui.label(None, line.as_str());
        }
        ui.label(None, "Tab switches input, C shows colliders");
        pressed = ui.button(None, "Switch input");
    });

    ui.pop_skin();

    HudUiResult {
        mode_toggle_pressed: pressed,
    }
}
