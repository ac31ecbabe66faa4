//! L2 Monitor
//!
//! Watches the bid and ask columns of an order-book ladder on screen, reads
//! them with OCR every cycle, and shows rolling bid/ask ratios over several
//! time horizons with optional threshold alarms.

// Hide console window on Windows for GUI mode
#![windows_subsystem = "windows"]

mod capture;
mod error;
mod gui;
mod logging;
mod monitor;
mod ocr;
mod paths;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use log::{info, warn};

use capture::{RegionCapturer, SnapshotCapturer};
use monitor::config::{config_path, read_config};
use monitor::{AppConfig, BeepAlarm, Monitor};
use ocr::{TesseractEngine, TextRecognizer, UnavailableEngine};

fn main() -> Result<()> {
    // Config decides the log file and level, so it is read before logging
    // is up and the outcome is logged afterwards.
    let path = config_path();
    let loaded = read_config(&path);
    let config = match &loaded {
        Ok(Some(config)) => config.clone(),
        _ => AppConfig::default(),
    };

    paths::ensure_directories(config.debug)?;
    logging::init(&paths::get_logs_dir().join(&config.log_file), config.debug)?;
    logging::install_panic_hook();

    match loaded {
        Ok(Some(_)) => info!("Config loaded from {}", path.display()),
        Ok(None) => info!("{} not found. Using default config.", path.display()),
        Err(e) => warn!("{:#}. Using defaults.", e),
    }

    let recognizer = create_recognizer(&config);
    let capturer = create_capturer(&config);
    let player = Arc::new(BeepAlarm::new(
        config.alarm.beeps,
        Duration::from_millis(config.alarm.gap_ms),
    ));

    let monitor = Monitor::new(capturer, recognizer, player);

    info!("Starting GUI application...");
    match gui::run_gui(monitor, config) {
        Ok(()) => {
            info!("GUI application exited normally");
            Ok(())
        }
        Err(e) => {
            log::error!("GUI error: {}", e);
            Err(anyhow!("GUI error: {}", e))
        }
    }
}

/// Tesseract engine, or a stand-in that fails every call if setup fails.
fn create_recognizer(config: &AppConfig) -> Arc<dyn TextRecognizer> {
    match ocr::ensure_tesseract(&config.ocr.profile.language, &config.tessdata_url) {
        Ok(paths) => Arc::new(TesseractEngine::new(paths)),
        Err(e) => {
            warn!("Failed to setup Tesseract: {:#}", e);
            warn!("OCR will not work; every region will score 0.");
            Arc::new(UnavailableEngine::new(e.to_string()))
        }
    }
}

fn create_capturer(config: &AppConfig) -> Arc<dyn RegionCapturer> {
    if let Some(path) = &config.snapshot_path {
        info!("Capturing from snapshot {}", path.display());
        return Arc::new(SnapshotCapturer::new(path.clone()));
    }
    screen_capturer()
}

#[cfg(windows)]
fn screen_capturer() -> Arc<dyn RegionCapturer> {
    Arc::new(capture::ScreenCapturer::new())
}

#[cfg(not(windows))]
fn screen_capturer() -> Arc<dyn RegionCapturer> {
    let path = paths::get_default_snapshot_path();
    warn!(
        "No screen capture on this platform, reading regions from {}",
        path.display()
    );
    Arc::new(SnapshotCapturer::new(path))
}
