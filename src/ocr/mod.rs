//! OCR pipeline for one ladder column.
//!
//! This module provides:
//! - Binarization tuned for digit columns (`preprocess`)
//! - The recognizer seam and the Tesseract CLI engine (`engine`)
//! - Row grouping and number parsing (`rows`)
//! - Tesseract discovery and traineddata download (`setup`)

pub mod engine;
pub mod preprocess;
pub mod rows;
pub mod setup;

pub use engine::{CharsetProfile, TesseractEngine, TextRecognizer, UnavailableEngine};
pub use setup::ensure_tesseract;

use std::fs;
use std::path::{Path, PathBuf};

use image::{GrayImage, RgbImage};
use log::{debug, warn};

use crate::capture::{CaptureRegion, RegionCapturer, Side};
use crate::error::RegionError;
use preprocess::preprocess_region;
use rows::{group_rows, sum_rows};

/// Per-session settings for turning a region into a number.
#[derive(Clone, Debug, PartialEq)]
pub struct ReadSettings {
    /// Fragments at or below this confidence are ignored
    pub confidence_threshold: f32,
    pub upscale: u32,
    pub profile: CharsetProfile,
    /// Where to write `roi_<side>.png` / `thresh_<side>.png`, if anywhere
    pub debug_dir: Option<PathBuf>,
}

impl Default for ReadSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: 80.0,
            upscale: preprocess::DEFAULT_UPSCALE,
            profile: CharsetProfile::default(),
            debug_dir: None,
        }
    }
}

/// Result of reading one region for one cycle.
#[derive(Clone, Debug, PartialEq)]
pub struct RegionReading {
    /// Sum of every row that parsed
    pub value: f64,
    /// Fragments returned by the recognizer, before confidence filtering
    pub fragments: usize,
}

/// Capture -> preprocess -> recognize -> group -> sum for one region.
pub fn read_region(
    capturer: &dyn RegionCapturer,
    recognizer: &dyn TextRecognizer,
    region: &CaptureRegion,
    settings: &ReadSettings,
) -> Result<RegionReading, RegionError> {
    let raw = capturer.capture(&region.rect)?;
    let binary = preprocess_region(&raw, settings.upscale)?;

    if let Some(dir) = &settings.debug_dir {
        dump_debug_images(dir, region.side, &raw, &binary);
    }

    let fragments = recognizer.recognize(&binary, &settings.profile)?;
    let rows = group_rows(&fragments);
    let value = sum_rows(&rows, settings.confidence_threshold);

    debug!(
        "{}: {} fragments in {} rows, sum {}",
        region.side,
        fragments.len(),
        rows.len(),
        value
    );

    Ok(RegionReading {
        value,
        fragments: fragments.len(),
    })
}

/// Writes the raw capture and the binarized image. Failures only warn.
fn dump_debug_images(dir: &Path, side: Side, raw: &RgbImage, binary: &GrayImage) {
    if let Err(e) = fs::create_dir_all(dir) {
        warn!("Could not create debug dir {}: {}", dir.display(), e);
        return;
    }

    let roi_path = dir.join(format!("roi_{}.png", side));
    if let Err(e) = raw.save(&roi_path) {
        warn!("Could not save {}: {}", roi_path.display(), e);
    }

    let thresh_path = dir.join(format!("thresh_{}.png", side));
    if let Err(e) = binary.save(&thresh_path) {
        warn!("Could not save {}: {}", thresh_path.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::Rect;
    use crate::error::{CaptureError, RecognitionError};
    use super::engine::TextFragment;
    use image::Rgb;
    use tempfile::tempdir;

    struct WhiteCapturer;

    impl RegionCapturer for WhiteCapturer {
        fn capture(&self, rect: &Rect) -> Result<RgbImage, CaptureError> {
            rect.validate()?;
            Ok(RgbImage::from_pixel(rect.width(), rect.height(), Rgb([255, 255, 255])))
        }
    }

    struct FixedRecognizer(Vec<TextFragment>);

    impl TextRecognizer for FixedRecognizer {
        fn recognize(
            &self,
            _img: &GrayImage,
            _profile: &CharsetProfile,
        ) -> Result<Vec<TextFragment>, RecognitionError> {
            Ok(self.0.clone())
        }
    }

    fn word(y1: u32, text: &str, confidence: f32) -> TextFragment {
        TextFragment {
            x1: 0,
            y1,
            x2: 40,
            y2: y1 + 10,
            text: text.to_string(),
            confidence,
        }
    }

    fn bid_region(rect: Rect) -> CaptureRegion {
        CaptureRegion {
            side: Side::Bid,
            rect,
        }
    }

    #[test]
    fn test_read_region_sums_rows() {
        let recognizer = FixedRecognizer(vec![
            word(0, "1,200", 95.0),
            word(20, "300", 91.0),
            word(40, "9", 12.0),
        ]);
        let reading = read_region(
            &WhiteCapturer,
            &recognizer,
            &bid_region(Rect::new(0, 0, 20, 12)),
            &ReadSettings::default(),
        )
        .unwrap();
        assert_eq!(reading.value, 1500.0);
        assert_eq!(reading.fragments, 3);
    }

    #[test]
    fn test_read_region_zero_area_fails() {
        let err = read_region(
            &WhiteCapturer,
            &FixedRecognizer(vec![]),
            &bid_region(Rect::new(0, 0, 0, 10)),
            &ReadSettings::default(),
        )
        .unwrap_err();
        assert!(matches!(err, RegionError::Capture(CaptureError::InvalidRegion(_))));
    }

    #[test]
    fn test_read_region_writes_debug_images() {
        let dir = tempdir().unwrap();
        let settings = ReadSettings {
            debug_dir: Some(dir.path().join("debug")),
            ..ReadSettings::default()
        };
        read_region(
            &WhiteCapturer,
            &FixedRecognizer(vec![]),
            &bid_region(Rect::new(0, 0, 8, 6)),
            &settings,
        )
        .unwrap();
        assert!(dir.path().join("debug").join("roi_bid.png").exists());
        assert!(dir.path().join("debug").join("thresh_bid.png").exists());
    }
}
