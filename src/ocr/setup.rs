use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use log::{info, warn};

pub const DEFAULT_TESSDATA_URL: &str = "https://github.com/tesseract-ocr/tessdata_fast/raw/main";

#[cfg(windows)]
const EXECUTABLE_NAME: &str = "tesseract.exe";
#[cfg(not(windows))]
const EXECUTABLE_NAME: &str = "tesseract";

#[cfg(windows)]
const COMMON_EXECUTABLES: &[&str] = &[
    r"C:\Program Files\Tesseract-OCR\tesseract.exe",
    r"C:\Program Files (x86)\Tesseract-OCR\tesseract.exe",
];
#[cfg(not(windows))]
const COMMON_EXECUTABLES: &[&str] = &["/usr/bin/tesseract", "/usr/local/bin/tesseract", "/opt/homebrew/bin/tesseract"];

#[cfg(windows)]
const SYSTEM_TESSDATA: &[&str] = &[
    r"C:\Program Files\Tesseract-OCR\tessdata",
    r"C:\Program Files (x86)\Tesseract-OCR\tessdata",
];
#[cfg(not(windows))]
const SYSTEM_TESSDATA: &[&str] = &[
    "/usr/share/tesseract-ocr/5/tessdata",
    "/usr/share/tesseract-ocr/4.00/tessdata",
    "/usr/share/tessdata",
    "/usr/local/share/tessdata",
    "/opt/homebrew/share/tessdata",
];

#[derive(Debug, Clone)]
pub struct TesseractPaths {
    pub executable: PathBuf,
    pub tessdata: PathBuf,
}

/// Returns the directory for storing Tesseract files
pub fn get_tesseract_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("l2-monitor")
        .join("tesseract")
}

fn traineddata_file(language: &str) -> String {
    format!("{}.traineddata", language)
}

/// Ensures a Tesseract executable and `<language>.traineddata` are available.
///
/// Missing traineddata is downloaded from `tessdata_url` into the local
/// Tesseract dir.
pub fn ensure_tesseract(language: &str, tessdata_url: &str) -> Result<TesseractPaths> {
    let executable = find_tesseract_executable()?;

    let tessdata = match find_tessdata_dir(language) {
        Ok(dir) => dir,
        Err(_) => {
            let local = get_tesseract_dir().join("tessdata");
            download_traineddata(&local, language, tessdata_url)?;
            local
        }
    };

    info!(
        "Tesseract ready: {} (tessdata {}, language {})",
        executable.display(),
        tessdata.display(),
        language
    );

    Ok(TesseractPaths {
        executable,
        tessdata,
    })
}

/// Downloads `<language>.traineddata` into `tessdata_dir`.
fn download_traineddata(tessdata_dir: &Path, language: &str, base_url: &str) -> Result<()> {
    fs::create_dir_all(tessdata_dir)
        .with_context(|| format!("failed to create {}", tessdata_dir.display()))?;

    let file_name = traineddata_file(language);
    let url = format!("{}/{}", base_url.trim_end_matches('/'), file_name);
    let path = tessdata_dir.join(&file_name);

    info!("Downloading {}...", url);

    let client = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(300))
        .build()?;

    let response = client
        .get(&url)
        .header("User-Agent", "l2-monitor")
        .send()?;

    if !response.status().is_success() {
        return Err(anyhow!(
            "Failed to download {}: HTTP {}",
            file_name,
            response.status()
        ));
    }

    let bytes = response.bytes()?;
    let mut file = fs::File::create(&path)?;
    file.write_all(&bytes)?;

    info!("Downloaded {} ({} bytes)", file_name, bytes.len());
    Ok(())
}

/// Finds the Tesseract executable, checking our local dir first, then system
pub fn find_tesseract_executable() -> Result<PathBuf> {
    let local_exe = get_tesseract_dir().join(EXECUTABLE_NAME);
    if local_exe.exists() {
        return Ok(local_exe);
    }

    // Check PATH
    if let Ok(output) = std::process::Command::new("tesseract")
        .arg("--version")
        .output()
    {
        if output.status.success() {
            return Ok(PathBuf::from("tesseract"));
        }
    }

    for path in COMMON_EXECUTABLES {
        let p = PathBuf::from(path);
        if p.exists() {
            return Ok(p);
        }
    }

    Err(anyhow!("Tesseract not found. Please install Tesseract-OCR."))
}

/// Finds a tessdata directory holding `<language>.traineddata`
pub fn find_tessdata_dir(language: &str) -> Result<PathBuf> {
    let file_name = traineddata_file(language);

    let mut candidates = vec![get_tesseract_dir().join("tessdata")];
    candidates.extend(SYSTEM_TESSDATA.iter().map(PathBuf::from));

    // TESSDATA_PREFIX may point at tessdata itself or at its parent
    if let Ok(prefix) = std::env::var("TESSDATA_PREFIX") {
        candidates.push(PathBuf::from(&prefix));
        candidates.push(PathBuf::from(&prefix).join("tessdata"));
    }

    find_dir_with(&candidates, &file_name).ok_or_else(|| {
        warn!("{} not found in any tessdata directory", file_name);
        anyhow!("tessdata directory with {} not found", file_name)
    })
}

fn find_dir_with(candidates: &[PathBuf], file_name: &str) -> Option<PathBuf> {
    candidates
        .iter()
        .find(|dir| dir.join(file_name).exists())
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_traineddata_file_name() {
        assert_eq!(traineddata_file("digits_comma"), "digits_comma.traineddata");
    }

    #[test]
    fn test_find_dir_with_first_match() {
        let empty = tempdir().unwrap();
        let with_data = tempdir().unwrap();
        fs::write(with_data.path().join("eng.traineddata"), b"x").unwrap();

        let candidates = vec![
            empty.path().to_path_buf(),
            with_data.path().to_path_buf(),
        ];
        assert_eq!(
            find_dir_with(&candidates, "eng.traineddata"),
            Some(with_data.path().to_path_buf())
        );
        assert_eq!(find_dir_with(&candidates, "deu.traineddata"), None);
    }
}
