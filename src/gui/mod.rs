//! GUI module for the application.
//!
//! Display collaborator: pulls snapshots from the `Monitor` at its own refresh
//! rate and never blocks on the capture worker.

pub mod display;
pub mod render;
pub mod state;

use std::time::{Duration, Instant};

use eframe::egui::{self, Vec2};
use log::{error, info};

use crate::monitor::{AppConfig, Monitor, load_config, save_config};

use state::GuiState;

/// Main GUI application struct.
pub struct GuiApp {
    monitor: Monitor,
    /// Configuration as of the last session start or save
    config: AppConfig,
    state: GuiState,
}

impl GuiApp {
    pub fn new(monitor: Monitor, config: AppConfig) -> Self {
        let state = GuiState::new(config.regions);
        Self {
            monitor,
            config,
            state,
        }
    }

    /// Handle start button click. Re-reads config.json, keeping the regions
    /// from the inputs.
    fn handle_start(&mut self) {
        let mut config = load_config();
        config.regions = self.state.regions;

        match self
            .monitor
            .start_session(config.regions, &config.session_config())
        {
            Ok(()) => {
                self.state.error = None;
                self.state.snapshot = None;
                self.state.started_at = Some(Instant::now());
                info!("GUI: Started session");
            }
            Err(e) => {
                error!("GUI: Failed to start session: {}", e);
                self.state.error = Some(e.to_string());
            }
        }
        self.config = config;
    }

    /// Handle stop button click. The worker drains in the background and
    /// `update` picks up the final snapshot.
    fn handle_stop(&mut self) {
        self.monitor.request_stop();
    }

    /// Handle save button click.
    fn handle_save(&mut self) {
        self.config.regions = self.state.regions;
        match save_config(&self.config) {
            Ok(()) => self.state.error = None,
            Err(e) => {
                error!("GUI: Failed to save config: {:#}", e);
                self.state.error = Some(format!("{:#}", e));
            }
        }
    }
}

impl eframe::App for GuiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Poll the monitor; the last snapshot is kept after stop
        if let Some(last) = self.monitor.poll_stopped() {
            self.state.snapshot = Some(last);
            self.state.started_at = None;
        } else if let Some(snapshot) = self.monitor.snapshot() {
            self.state.snapshot = Some(snapshot);
        }
        let phase = self.monitor.phase();

        if phase.is_active() {
            ctx.request_repaint_after(Duration::from_millis(self.config.display_refresh_ms));
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("L2 Monitor");
            ui.add_space(16.0);

            egui::ScrollArea::vertical().show(ui, |ui| {
                let save_clicked = render::render_regions(ui, &mut self.state, !phase.is_active());
                if save_clicked {
                    self.handle_save();
                }

                let (start_clicked, stop_clicked) = render::render_controls(ui, phase);
                if start_clicked {
                    self.handle_start();
                }
                if stop_clicked {
                    self.handle_stop();
                }

                render::render_status(ui, &self.state, phase);
                render::render_table(ui, self.state.snapshot.as_ref());
            });
        });
    }
}

/// Run the GUI application.
/// This function blocks until the window is closed.
pub fn run_gui(monitor: Monitor, config: AppConfig) -> eframe::Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(Vec2::new(560.0, 420.0))
            .with_min_inner_size(Vec2::new(420.0, 320.0))
            .with_title("L2 Monitor"),
        ..Default::default()
    };

    info!("GUI: Calling eframe::run_native...");

    eframe::run_native(
        "L2 Monitor",
        options,
        Box::new(|_cc| Ok(Box::new(GuiApp::new(monitor, config)))),
    )
}
