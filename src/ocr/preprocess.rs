use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, RgbImage};
use imageproc::distance_transform::Norm;
use imageproc::filter::gaussian_blur_f32;
use imageproc::integral_image::{integral_image, sum_image_pixels};
use imageproc::morphology::{dilate, erode};

use crate::error::InvalidRegion;

/// Default integer upscale factor applied before thresholding.
pub const DEFAULT_UPSCALE: u32 = 4;

/// Sigma equivalent to a 5x5 Gaussian kernel.
const BLUR_SIGMA: f32 = 1.1;

/// Local threshold window is (2 * radius + 1) pixels square.
const THRESHOLD_BLOCK_RADIUS: u32 = 15;

/// A pixel stays white unless it is this much darker than its local mean.
const THRESHOLD_OFFSET: i64 = 2;

/// Dark horizontal runs at least this fraction of the width are separator lines.
const LINE_MIN_FRACTION: f32 = 0.4;

/// Binarizes a captured ladder column for digit OCR.
///
/// Pipeline (order matters):
/// 1. Upscale by `upscale` (at least 2x) with Lanczos filtering
/// 2. Convert to intensity
/// 3. Gaussian smoothing
/// 4. Local-mean adaptive threshold (alternating row colors defeat a global one)
/// 5. Remove horizontal separator lines, then erode -> dilate -> erode to
///    drop speckles while keeping digit strokes
///
/// Output is black text (0) on white background (255).
pub fn preprocess_region(img: &RgbImage, upscale: u32) -> Result<GrayImage, InvalidRegion> {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return Err(InvalidRegion::EmptyImage);
    }

    let factor = upscale.max(2);
    let scaled = imageops::resize(img, w * factor, h * factor, FilterType::Lanczos3);
    let gray = imageops::grayscale(&scaled);
    let blurred = gaussian_blur_f32(&gray, BLUR_SIGMA);
    let binary = adaptive_threshold(&blurred, THRESHOLD_BLOCK_RADIUS, THRESHOLD_OFFSET);

    let min_run = ((binary.width() as f32 * LINE_MIN_FRACTION) as u32).max(1);
    let lines = detect_horizontal_lines(&binary, min_run);
    let merged = remove_lines(&binary, &lines);

    // imageproc morphology treats non-zero as foreground, so eroding the
    // white background thickens the black strokes, like cv2.erode.
    let cleaned = erode(&merged, Norm::LInf, 1);
    let cleaned = dilate(&cleaned, Norm::LInf, 2);
    Ok(erode(&cleaned, Norm::LInf, 1))
}

/// Thresholds each pixel against the mean of its surrounding block.
///
/// Pixels brighter than `mean - offset` become white, the rest black.
/// Block sums come from an integral image so cost is independent of `radius`.
pub fn adaptive_threshold(img: &GrayImage, radius: u32, offset: i64) -> GrayImage {
    let (w, h) = img.dimensions();
    let integral = integral_image::<_, u64>(img);

    GrayImage::from_fn(w, h, |x, y| {
        // Inclusive block bounds, clipped to the image
        let x0 = x.saturating_sub(radius);
        let y0 = y.saturating_sub(radius);
        let x1 = (x + radius).min(w - 1);
        let y1 = (y + radius).min(h - 1);
        let area = ((x1 - x0 + 1) * (y1 - y0 + 1)) as i64;
        let sum = sum_image_pixels(&integral, x0, y0, x1, y1)[0] as i64;

        let p = img.get_pixel(x, y)[0] as i64;
        // p > mean - offset, without dividing
        if p * area > sum - offset * area {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}

/// Marks dark horizontal runs of at least `min_run` pixels.
///
/// Equivalent to a morphological opening of the inverted image with a
/// `1 x min_run` kernel. Returns a mask with 255 on line pixels.
pub fn detect_horizontal_lines(binary: &GrayImage, min_run: u32) -> GrayImage {
    let (w, h) = binary.dimensions();
    let mut mask = GrayImage::new(w, h);

    for y in 0..h {
        let mut run_start = 0u32;
        let mut run_len = 0u32;
        for x in 0..=w {
            let dark = x < w && binary.get_pixel(x, y)[0] == 0;
            if dark {
                if run_len == 0 {
                    run_start = x;
                }
                run_len += 1;
                continue;
            }
            if run_len >= min_run {
                for lx in run_start..run_start + run_len {
                    mask.put_pixel(lx, y, Luma([255]));
                }
            }
            run_len = 0;
        }
    }

    mask
}

/// Paints detected line pixels white.
fn remove_lines(binary: &GrayImage, lines: &GrayImage) -> GrayImage {
    let mut out = binary.clone();
    for (x, y, p) in lines.enumerate_pixels() {
        if p[0] > 0 {
            out.put_pixel(x, y, Luma([255]));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    /// 60x30 white column with a full-width separator line on row 2 and a
    /// dark 10x10 glyph-sized block in the lower left.
    fn ladder_sample() -> RgbImage {
        RgbImage::from_fn(60, 30, |x, y| {
            let on_line = y == 2;
            let in_block = (5..15).contains(&x) && (15..25).contains(&y);
            if on_line || in_block {
                Rgb([20, 20, 20])
            } else {
                Rgb([250, 250, 250])
            }
        })
    }

    #[test]
    fn test_empty_image_rejected() {
        let img = RgbImage::new(0, 10);
        assert_eq!(preprocess_region(&img, 4), Err(InvalidRegion::EmptyImage));
    }

    #[test]
    fn test_output_is_upscaled_and_binary() {
        let out = preprocess_region(&ladder_sample(), 4).unwrap();
        assert_eq!(out.dimensions(), (240, 120));
        assert!(out.pixels().all(|p| p[0] == 0 || p[0] == 255));
    }

    #[test]
    fn test_upscale_has_floor_of_two() {
        let out = preprocess_region(&ladder_sample(), 1).unwrap();
        assert_eq!(out.dimensions(), (120, 60));
    }

    #[test]
    fn test_separator_line_removed_glyph_kept() {
        let out = preprocess_region(&ladder_sample(), 4).unwrap();

        // Separator line (source row 2 -> rows 8..12) is gone
        assert_eq!(out.get_pixel(120, 9)[0], 255);
        assert_eq!(out.get_pixel(120, 10)[0], 255);
        // Glyph edge survives as black
        assert_eq!(out.get_pixel(25, 80)[0], 0);
        // Plain background stays white
        assert_eq!(out.get_pixel(200, 80)[0], 255);
    }

    #[test]
    fn test_adaptive_threshold_flat_image_is_white() {
        let img = GrayImage::from_pixel(20, 20, Luma([90]));
        let out = adaptive_threshold(&img, 5, 2);
        assert!(out.pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn test_adaptive_threshold_handles_alternating_rows() {
        // Two row bands with different backgrounds, each with one dark dot.
        let img = GrayImage::from_fn(30, 20, |x, y| {
            let background = if y < 10 { 230 } else { 120 };
            if x == 15 && (y == 5 || y == 15) {
                Luma([background - 80])
            } else {
                Luma([background])
            }
        });
        let out = adaptive_threshold(&img, 3, 2);
        assert_eq!(out.get_pixel(15, 5)[0], 0);
        assert_eq!(out.get_pixel(15, 15)[0], 0);
        assert_eq!(out.get_pixel(2, 2)[0], 255);
        assert_eq!(out.get_pixel(2, 17)[0], 255);
    }

    #[test]
    fn test_adaptive_threshold_clips_block_at_corners() {
        let mut img = GrayImage::from_pixel(6, 4, Luma([200]));
        img.put_pixel(0, 0, Luma([100]));
        img.put_pixel(5, 3, Luma([100]));
        let out = adaptive_threshold(&img, 2, 2);
        assert_eq!(out.get_pixel(0, 0)[0], 0);
        assert_eq!(out.get_pixel(5, 3)[0], 0);
        assert_eq!(out.get_pixel(3, 1)[0], 255);
    }

    #[test]
    fn test_detect_horizontal_lines_min_run() {
        let mut img = GrayImage::from_pixel(10, 3, Luma([255]));
        for x in 0..8 {
            img.put_pixel(x, 0, Luma([0]));
        }
        for x in 0..3 {
            img.put_pixel(x, 2, Luma([0]));
        }
        let mask = detect_horizontal_lines(&img, 4);
        assert_eq!(mask.get_pixel(0, 0)[0], 255);
        assert_eq!(mask.get_pixel(7, 0)[0], 255);
        assert_eq!(mask.get_pixel(8, 0)[0], 0);
        // Short run on row 2 is not a line
        assert_eq!(mask.get_pixel(1, 2)[0], 0);
    }
}
