use std::path::PathBuf;
use std::process::Command;

use image::GrayImage;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use super::setup::TesseractPaths;
use crate::error::RecognitionError;

/// A recognized word with its bounding box in preprocessed-image pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct TextFragment {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
    pub text: String,
    /// 0.0 - 100.0, passed through from the engine unmodified
    pub confidence: f32,
}

/// What the recognizer is allowed to read.
///
/// The ladder only ever shows numbers, so the character set is restricted to
/// digits and separators; letters are never a valid reading.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharsetProfile {
    /// Tesseract language (traineddata name), e.g. `eng` or `digits_comma`
    #[serde(default = "default_language")]
    pub language: String,
    /// Characters passed as `tessedit_char_whitelist`
    #[serde(default = "default_whitelist")]
    pub whitelist: String,
    /// Tesseract `--psm` mode
    #[serde(default = "default_page_segmentation")]
    pub page_segmentation: u8,
}

fn default_language() -> String {
    "eng".to_string()
}

fn default_whitelist() -> String {
    "0123456789,.".to_string()
}

fn default_page_segmentation() -> u8 {
    6 // Assume a single uniform block of text
}

impl Default for CharsetProfile {
    fn default() -> Self {
        Self {
            language: default_language(),
            whitelist: default_whitelist(),
            page_segmentation: default_page_segmentation(),
        }
    }
}

/// External OCR engine seam.
pub trait TextRecognizer: Send + Sync {
    fn recognize(
        &self,
        img: &GrayImage,
        profile: &CharsetProfile,
    ) -> Result<Vec<TextFragment>, RecognitionError>;
}

/// Runs the Tesseract CLI with TSV output.
pub struct TesseractEngine {
    executable: PathBuf,
    tessdata: PathBuf,
}

impl TesseractEngine {
    pub fn new(paths: TesseractPaths) -> Self {
        Self {
            executable: paths.executable,
            tessdata: paths.tessdata,
        }
    }
}

impl TextRecognizer for TesseractEngine {
    fn recognize(
        &self,
        img: &GrayImage,
        profile: &CharsetProfile,
    ) -> Result<Vec<TextFragment>, RecognitionError> {
        // Save image to temporary file
        let temp_input = NamedTempFile::with_suffix(".png")?;
        img.save(temp_input.path())?;

        // Tesseract appends .tsv to the output base
        let temp_output = NamedTempFile::new()?;
        let output_base = temp_output.path().to_string_lossy().to_string();

        let output = Command::new(&self.executable)
            .arg(temp_input.path())
            .arg(&output_base)
            .arg("--tessdata-dir")
            .arg(&self.tessdata)
            .arg("-l")
            .arg(&profile.language)
            .arg("--psm")
            .arg(profile.page_segmentation.to_string())
            .arg("-c")
            .arg(format!("tessedit_char_whitelist={}", profile.whitelist))
            .arg("tsv")
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RecognitionError::EngineFailed(stderr.trim().to_string()));
        }

        let tsv_path = format!("{}.tsv", output_base);
        let tsv_content = std::fs::read_to_string(&tsv_path)
            .map_err(|e| RecognitionError::Output(format!("{}: {}", tsv_path, e)))?;
        let _ = std::fs::remove_file(&tsv_path);

        Ok(parse_tsv_fragments(&tsv_content))
    }
}

/// Stand-in used when Tesseract setup failed at startup. Every call fails,
/// so each region scores 0 and the session keeps running.
pub struct UnavailableEngine {
    reason: String,
}

impl UnavailableEngine {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl TextRecognizer for UnavailableEngine {
    fn recognize(
        &self,
        _img: &GrayImage,
        _profile: &CharsetProfile,
    ) -> Result<Vec<TextFragment>, RecognitionError> {
        Err(RecognitionError::EngineUnavailable(self.reason.clone()))
    }
}

/// Parses Tesseract TSV output into word-level fragments.
///
/// TSV fields: level, page_num, block_num, par_num, line_num, word_num,
///             left, top, width, height, conf, text
pub fn parse_tsv_fragments(tsv: &str) -> Vec<TextFragment> {
    let mut fragments = Vec::new();

    for line in tsv.lines().skip(1) {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 12 {
            continue;
        }

        // Level 5 = word
        let level: i32 = fields[0].parse().unwrap_or(-1);
        if level != 5 {
            continue;
        }

        let text = fields[11].trim();
        let conf: f32 = fields[10].trim().parse().unwrap_or(-1.0);
        if text.is_empty() || conf < 0.0 {
            continue;
        }

        let coords: Option<Vec<u32>> = fields[6..10].iter().map(|f| f.parse().ok()).collect();
        let Some(&[left, top, width, height]) = coords.as_deref() else {
            continue;
        };

        fragments.push(TextFragment {
            x1: left,
            y1: top,
            x2: left + width,
            y2: top + height,
            text: text.to_string(),
            confidence: conf,
        });
    }

    fragments
}
