//! Region capture for the bid and ask ladder columns.
//!
//! This module provides:
//! - Region geometry (`Rect`, `Side`, `Sides`, `CaptureRegion`)
//! - The `RegionCapturer` seam used by the capture worker
//! - A GDI screen capturer (Windows) and a snapshot-file capturer

pub mod region;
#[cfg(windows)]
pub mod screen;
pub mod snapshot;

use image::RgbImage;

use crate::error::CaptureError;

pub use region::{CaptureRegion, Rect, Side, Sides};
#[cfg(windows)]
pub use screen::ScreenCapturer;
pub use snapshot::SnapshotCapturer;

/// Given a rectangle, returns its pixels.
pub trait RegionCapturer: Send + Sync {
    fn capture(&self, rect: &Rect) -> Result<RgbImage, CaptureError>;
}
