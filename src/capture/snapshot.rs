//! Capture from a still image on disk.
//!
//! The file is re-read on every call so an external tool can keep replacing it
//! (e.g. a screenshot loop on a platform without a native capturer).

use std::path::PathBuf;

use image::RgbImage;

use super::RegionCapturer;
use super::region::Rect;
use crate::error::CaptureError;

pub struct SnapshotCapturer {
    path: PathBuf,
}

impl SnapshotCapturer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RegionCapturer for SnapshotCapturer {
    fn capture(&self, rect: &Rect) -> Result<RgbImage, CaptureError> {
        rect.validate()?;
        let img = image::open(&self.path)
            .map_err(|source| CaptureError::Snapshot {
                path: self.path.clone(),
                source,
            })?
            .to_rgb8();
        crop_rect(&img, rect)
    }
}

/// Crops `rect` out of `img`, rejecting rectangles that do not fit.
pub fn crop_rect(img: &RgbImage, rect: &Rect) -> Result<RgbImage, CaptureError> {
    let (w, h) = img.dimensions();
    rect.validate_within(w, h)?;
    Ok(image::imageops::crop_imm(
        img,
        rect.x1 as u32,
        rect.y1 as u32,
        rect.width(),
        rect.height(),
    )
    .to_image())
}
