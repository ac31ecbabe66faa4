//! Error taxonomy for the capture-recognize-aggregate pipeline.
//!
//! Per-cycle errors (`InvalidRegion`, `CaptureError`, `RecognitionError`) are
//! absorbed by the capture worker and only reach the log. `ConfigError` is the
//! one error surfaced to callers, from `Monitor::start_session`.

use std::path::PathBuf;

/// A capture rectangle that cannot produce pixels.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidRegion {
    /// Width or height is zero (or the corners are inverted).
    #[error("region ({x1}, {y1}, {x2}, {y2}) has zero area")]
    ZeroArea { x1: i32, y1: i32, x2: i32, y2: i32 },

    /// The rectangle lies (partly) outside the capturable surface.
    #[error("region ({x1}, {y1}, {x2}, {y2}) is outside the {width}x{height} surface")]
    OutOfBounds {
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        width: u32,
        height: u32,
    },

    /// The pixel buffer handed to the preprocessor is empty.
    #[error("image has zero area")]
    EmptyImage,
}

/// Errors from the capture collaborator.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error(transparent)]
    InvalidRegion(#[from] InvalidRegion),

    /// Platform capture call failed (permissions, display disconnected...).
    #[error("screen capture failed: {0}")]
    Platform(String),

    /// Snapshot source image could not be read.
    #[error("failed to load snapshot '{path}': {source}")]
    Snapshot {
        path: PathBuf,
        source: image::ImageError,
    },
}

/// Errors from the recognition collaborator.
#[derive(Debug, thiserror::Error)]
pub enum RecognitionError {
    /// Tesseract executable or tessdata could not be located.
    #[error("OCR engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("OCR I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Could not write the preprocessed image for the engine.
    #[error("failed to encode image for OCR: {0}")]
    Encode(#[from] image::ImageError),

    /// The engine ran but reported failure.
    #[error("Tesseract failed: {0}")]
    EngineFailed(String),

    /// The engine output could not be read back.
    #[error("unreadable OCR output: {0}")]
    Output(String),
}

/// Anything that spoils one region's reading for one cycle.
#[derive(Debug, thiserror::Error)]
pub enum RegionError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Preprocess(#[from] InvalidRegion),

    #[error(transparent)]
    Recognition(#[from] RecognitionError),
}

/// Malformed session parameters. Fatal to `start_session`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("cycle interval must be positive, got {0}")]
    NonPositiveInterval(f64),

    #[error("confidence threshold must be within 0-100, got {0}")]
    ThresholdOutOfRange(f32),

    #[error("at least one time period is required")]
    NoHorizons,

    #[error("time periods must be positive, got {0}")]
    ZeroHorizon(u32),

    #[error("time periods must be strictly increasing, {previous} is followed by {next}")]
    NonIncreasingHorizons { previous: u32, next: u32 },

    #[error("time period {seconds}s needs {cycles} cycles, more than the limit of {limit}")]
    HorizonTooLong { seconds: u32, cycles: f64, limit: usize },

    #[error("alarm configured for {0}s but no such time period exists")]
    UnknownAlarmHorizon(u32),

    #[error("upscale factor must be at least 2, got {0}")]
    UpscaleTooSmall(u32),
}
