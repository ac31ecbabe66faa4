//! Configuration for the monitor.
//!
//! `AppConfig` is what lives in config.json next to the executable. At each
//! session start it is re-read and narrowed to a `SessionConfig`, which
//! `validate` turns into the `SessionPlan` the capture worker runs on.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use log::{info, warn};

use super::alarm::AlarmConfig;
use crate::capture::{Rect, Sides};
use crate::error::ConfigError;
use crate::ocr::preprocess::DEFAULT_UPSCALE;
use crate::ocr::setup::DEFAULT_TESSDATA_URL;
use crate::ocr::{CharsetProfile, ReadSettings};

const CONFIG_FILE: &str = "config.json";

/// Recognition settings as stored in the config file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OcrConfig {
    #[serde(flatten)]
    pub profile: CharsetProfile,
    /// Integer upscale applied before thresholding, at least 2
    #[serde(default = "default_upscale")]
    pub upscale: u32,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            profile: CharsetProfile::default(),
            upscale: default_upscale(),
        }
    }
}

/// How the alarm sounds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AlarmPlaybackConfig {
    #[serde(default = "default_beeps")]
    pub beeps: u32,
    #[serde(default = "default_gap_ms")]
    pub gap_ms: u64,
}

impl Default for AlarmPlaybackConfig {
    fn default() -> Self {
        Self {
            beeps: default_beeps(),
            gap_ms: default_gap_ms(),
        }
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Log file name inside `<exe_dir>/logs/`
    #[serde(default = "default_log_file")]
    pub log_file: String,
    /// Debug-level logging and per-cycle debug image dumps
    #[serde(default)]
    pub debug: bool,
    #[serde(default = "default_cycle_interval")]
    pub cycle_interval_secs: f64,
    /// OCR confidence (0-100); fragments at or below are ignored
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,
    /// Horizon durations in seconds, strictly increasing
    #[serde(default = "default_time_periods")]
    pub time_periods: Vec<u32>,
    /// Keyed by horizon seconds; `0` is the latest-cycle slot
    #[serde(default)]
    pub alarms: BTreeMap<u32, AlarmConfig>,
    #[serde(default)]
    pub regions: Sides<Rect>,
    #[serde(default)]
    pub ocr: OcrConfig,
    /// Base URL for missing `<language>.traineddata`
    #[serde(default = "default_tessdata_url")]
    pub tessdata_url: String,
    /// Read regions out of this image instead of the screen
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,
    #[serde(default = "default_display_refresh_ms")]
    pub display_refresh_ms: u64,
    #[serde(default)]
    pub alarm: AlarmPlaybackConfig,
}

fn default_log_file() -> String {
    "l2-monitor.log".to_string()
}

fn default_cycle_interval() -> f64 {
    0.5
}

fn default_confidence_threshold() -> f32 {
    80.0
}

fn default_time_periods() -> Vec<u32> {
    vec![1, 5, 20, 60]
}

fn default_upscale() -> u32 {
    DEFAULT_UPSCALE
}

fn default_tessdata_url() -> String {
    DEFAULT_TESSDATA_URL.to_string()
}

fn default_display_refresh_ms() -> u64 {
    250
}

fn default_beeps() -> u32 {
    3
}

fn default_gap_ms() -> u64 {
    300
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_file: default_log_file(),
            debug: false,
            cycle_interval_secs: default_cycle_interval(),
            confidence_threshold: default_confidence_threshold(),
            time_periods: default_time_periods(),
            alarms: BTreeMap::new(),
            regions: Sides::default(),
            ocr: OcrConfig::default(),
            tessdata_url: default_tessdata_url(),
            snapshot_path: None,
            display_refresh_ms: default_display_refresh_ms(),
            alarm: AlarmPlaybackConfig::default(),
        }
    }
}

impl AppConfig {
    /// Session parameters taken from this configuration.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            cycle_interval_secs: self.cycle_interval_secs,
            confidence_threshold: self.confidence_threshold,
            time_periods: self.time_periods.clone(),
            alarms: self.alarms.clone(),
            ocr: self.ocr.clone(),
            debug_dir: self.debug.then(crate::paths::get_debug_dir),
        }
    }
}

/// Unvalidated session parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionConfig {
    pub cycle_interval_secs: f64,
    pub confidence_threshold: f32,
    pub time_periods: Vec<u32>,
    pub alarms: BTreeMap<u32, AlarmConfig>,
    pub ocr: OcrConfig,
    pub debug_dir: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        AppConfig::default().session_config()
    }
}

/// A configured horizon resolved to cycles.
#[derive(Clone, Debug, PartialEq)]
pub struct HorizonSpec {
    pub seconds: u32,
    /// Ring capacity and due modulus, in cycles
    pub period: usize,
    pub alarm: AlarmConfig,
}

/// Validated session parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionPlan {
    pub interval: Duration,
    pub read: ReadSettings,
    pub horizons: Vec<HorizonSpec>,
    pub latest_alarm: AlarmConfig,
}

/// Longest horizon window a session accepts, in cycles.
pub const MAX_HORIZON_CYCLES: usize = 1_000_000;

/// Number of cycles covering `seconds`: `max(1, round(seconds / interval))`.
pub fn horizon_period(seconds: u32, interval_secs: f64) -> usize {
    ((seconds as f64 / interval_secs).round() as usize).max(1)
}

impl SessionConfig {
    pub fn validate(&self) -> Result<SessionPlan, ConfigError> {
        let interval = self.cycle_interval_secs;
        if !(interval.is_finite() && interval > 0.0) {
            return Err(ConfigError::NonPositiveInterval(interval));
        }

        let threshold = self.confidence_threshold;
        if !(0.0..=100.0).contains(&threshold) {
            return Err(ConfigError::ThresholdOutOfRange(threshold));
        }

        if self.time_periods.is_empty() {
            return Err(ConfigError::NoHorizons);
        }
        if let Some(&zero) = self.time_periods.iter().find(|&&h| h == 0) {
            return Err(ConfigError::ZeroHorizon(zero));
        }
        if let Some(pair) = self.time_periods.windows(2).find(|w| w[0] >= w[1]) {
            return Err(ConfigError::NonIncreasingHorizons {
                previous: pair[0],
                next: pair[1],
            });
        }
        // Strictly increasing, so the last horizon is the longest
        if let Some(&longest) = self.time_periods.last() {
            let cycles = (longest as f64 / interval).round();
            if cycles > MAX_HORIZON_CYCLES as f64 {
                return Err(ConfigError::HorizonTooLong {
                    seconds: longest,
                    cycles,
                    limit: MAX_HORIZON_CYCLES,
                });
            }
        }

        if let Some(&unknown) = self
            .alarms
            .keys()
            .find(|&&k| k != 0 && !self.time_periods.contains(&k))
        {
            return Err(ConfigError::UnknownAlarmHorizon(unknown));
        }

        if self.ocr.upscale < 2 {
            return Err(ConfigError::UpscaleTooSmall(self.ocr.upscale));
        }

        let horizons = self
            .time_periods
            .iter()
            .map(|&seconds| HorizonSpec {
                seconds,
                period: horizon_period(seconds, interval),
                alarm: self.alarms.get(&seconds).copied().unwrap_or_default(),
            })
            .collect();

        Ok(SessionPlan {
            interval: Duration::from_secs_f64(interval),
            read: ReadSettings {
                confidence_threshold: threshold,
                upscale: self.ocr.upscale,
                profile: self.ocr.profile.clone(),
                debug_dir: self.debug_dir.clone(),
            },
            horizons,
            latest_alarm: self.alarms.get(&0).copied().unwrap_or_default(),
        })
    }
}

/// config.json next to the executable, or in the working directory if the
/// executable path is unknown.
pub fn config_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|p| p.join(CONFIG_FILE)))
        .unwrap_or_else(|| Path::new(CONFIG_FILE).to_path_buf())
}

/// Reads a config file. `Ok(None)` if it does not exist.
pub fn read_config(path: &Path) -> Result<Option<AppConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let config = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(Some(config))
}

/// Loads configuration from config.json or returns defaults.
pub fn load_config() -> AppConfig {
    let path = config_path();
    match read_config(&path) {
        Ok(Some(config)) => {
            info!("Config loaded from {}", path.display());
            config
        }
        Ok(None) => {
            info!("{} not found. Using default config.", path.display());
            AppConfig::default()
        }
        Err(e) => {
            warn!("{:#}. Using defaults.", e);
            AppConfig::default()
        }
    }
}

/// Writes configuration to `path` as pretty JSON.
pub fn save_config_to(config: &AppConfig, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(config)?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// Writes configuration back to config.json.
pub fn save_config(config: &AppConfig) -> Result<()> {
    let path = config_path();
    save_config_to(config, &path)?;
    info!("Config saved to {}", path.display());
    Ok(())
}
