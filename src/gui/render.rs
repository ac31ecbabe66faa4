//! GUI rendering functions.
//!
//! Contains UI layout and component rendering logic.

use eframe::egui::{self, Color32, RichText};

use super::display::{format_value, horizon_label, latest_cells, ratio_cells, ratio_text};
use super::state::GuiState;
use crate::capture::{Rect, Side};
use crate::monitor::{AggregateSnapshot, Phase};

const ALARM_BACKGROUND: Color32 = Color32::from_rgb(255, 190, 190);

/// Render the region inputs. Editable only while idle.
/// Returns true if save was clicked.
pub fn render_regions(ui: &mut egui::Ui, state: &mut GuiState, editable: bool) -> bool {
    let mut save_clicked = false;

    ui.label(RichText::new("Regions (x1, y1, x2, y2)").strong());
    ui.add_space(4.0);

    ui.add_enabled_ui(editable, |ui| {
        for side in Side::ALL {
            ui.horizontal(|ui| {
                ui.label(format!("{:>3}:", side.as_str()));
                rect_inputs(ui, state.regions.get_mut(side));
            });
        }

        ui.add_space(4.0);
        if ui.button("Save to config").clicked() {
            save_clicked = true;
        }
    });

    save_clicked
}

fn rect_inputs(ui: &mut egui::Ui, rect: &mut Rect) {
    for value in [&mut rect.x1, &mut rect.y1, &mut rect.x2, &mut rect.y2] {
        ui.add(egui::DragValue::new(value).range(-16384..=16384).speed(1.0));
    }
}

/// Render the control buttons.
/// Returns (start_clicked, stop_clicked).
pub fn render_controls(ui: &mut egui::Ui, phase: Phase) -> (bool, bool) {
    let mut start_clicked = false;
    let mut stop_clicked = false;

    ui.add_space(8.0);
    ui.separator();
    ui.add_space(8.0);

    ui.horizontal(|ui| {
        let is_active = phase.is_active();

        // Start button - disabled while a session is active
        ui.add_enabled_ui(!is_active, |ui| {
            if ui.button(RichText::new("▶ Start").size(16.0)).clicked() {
                start_clicked = true;
            }
        });

        ui.add_space(20.0);

        // Stop button - enabled only while a session is active
        ui.add_enabled_ui(is_active, |ui| {
            if ui.button(RichText::new("◼ Stop").size(16.0)).clicked() {
                stop_clicked = true;
            }
        });
    });

    (start_clicked, stop_clicked)
}

/// Render the status line.
pub fn render_status(ui: &mut egui::Ui, state: &GuiState, phase: Phase) {
    ui.add_space(8.0);

    ui.horizontal(|ui| {
        ui.label("Status:");

        let status_color = if state.error.is_some() {
            Color32::from_rgb(200, 0, 0)
        } else {
            match phase {
                Phase::Idle => Color32::GRAY,
                Phase::Armed | Phase::Stopping => Color32::from_rgb(200, 150, 0),
                Phase::Running => Color32::from_rgb(0, 120, 200),
            }
        };

        ui.label(RichText::new(state.status_text(phase)).color(status_color));

        if phase == Phase::Running && state.nothing_found() {
            ui.label(RichText::new("(nothing found)").italics());
        }
    });

    if phase.is_active() {
        if let Some(elapsed) = state.elapsed_text() {
            ui.horizontal(|ui| {
                ui.label("Elapsed:");
                ui.label(elapsed);
            });
        }
    }
}

/// Render the latest values and one row per horizon.
pub fn render_table(ui: &mut egui::Ui, snapshot: Option<&AggregateSnapshot>) {
    ui.add_space(8.0);
    ui.separator();
    ui.add_space(8.0);

    let Some(snapshot) = snapshot else {
        ui.label("No data yet.");
        return;
    };

    egui::Grid::new("aggregate_table")
        .striped(true)
        .min_col_width(80.0)
        .show(ui, |ui| {
            for header in ["Period", "Bid", "Ask", "Bid sum", "Ask sum", "Ratio"] {
                ui.label(RichText::new(header).strong());
            }
            ui.end_row();

            let latest = latest_cells(snapshot.latest);
            cell(ui, "Latest", snapshot.latest_alarmed);
            ui.label(latest.bid);
            ui.label(latest.ask);
            ui.label("");
            ui.label("");
            ui.label("");
            ui.end_row();

            for horizon in &snapshot.horizons {
                cell(ui, &horizon_label(horizon.seconds), horizon.alarmed);
                match &horizon.reading {
                    Some(reading) => {
                        let cells = ratio_cells(reading.ratio);
                        ui.label(cells.bid);
                        ui.label(cells.ask);
                        ui.label(format_value(reading.sums.bid));
                        ui.label(format_value(reading.sums.ask));
                        ui.label(ratio_text(reading.ratio));
                    }
                    None => {
                        for _ in 0..5 {
                            ui.label("");
                        }
                    }
                }
                ui.end_row();
            }
        });
}

/// Row label, highlighted when its alarm condition holds.
fn cell(ui: &mut egui::Ui, text: &str, alarmed: bool) {
    let text = RichText::new(text);
    if alarmed {
        ui.label(text.strong().background_color(ALARM_BACKGROUND));
    } else {
        ui.label(text);
    }
}
