//! GUI application state management.
//!
//! Tracks the region inputs and the last aggregate pulled from the monitor.

use std::time::Instant;

use crate::capture::{Rect, Sides};
use crate::monitor::{AggregateSnapshot, Phase};

/// GUI application state.
#[derive(Debug)]
pub struct GuiState {
    /// Region rectangles as edited in the GUI
    pub regions: Sides<Rect>,
    /// Last aggregate read from the monitor (kept after stop)
    pub snapshot: Option<AggregateSnapshot>,
    /// Start time of the current session
    pub started_at: Option<Instant>,
    /// Last start/save failure
    pub error: Option<String>,
}

impl GuiState {
    pub fn new(regions: Sides<Rect>) -> Self {
        Self {
            regions,
            snapshot: None,
            started_at: None,
            error: None,
        }
    }

    /// Get display text for current status.
    pub fn status_text(&self, phase: Phase) -> String {
        if let Some(error) = &self.error {
            return format!("Error: {}", error);
        }
        let cycles = self.snapshot.as_ref().map(|s| s.total_cycles).unwrap_or(0);
        match phase {
            Phase::Idle if cycles > 0 => format!("Stopped after {} cycles", cycles),
            Phase::Idle => "Idle".to_string(),
            Phase::Armed => "Starting...".to_string(),
            Phase::Running => format!("Running ({} cycles)", cycles),
            Phase::Stopping => "Stopping...".to_string(),
        }
    }

    /// Get elapsed time string if running.
    pub fn elapsed_text(&self) -> Option<String> {
        let secs = self.started_at?.elapsed().as_secs();
        Some(format!("{:02}:{:02}", secs / 60, secs % 60))
    }

    /// Whether the latest cycle found nothing in either region.
    pub fn nothing_found(&self) -> bool {
        self.snapshot.as_ref().is_some_and(|s| s.nothing_found)
    }
}
