use std::path::PathBuf;
use std::sync::OnceLock;

static EXE_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Returns the directory containing the executable.
pub fn get_exe_dir() -> &'static PathBuf {
    EXE_DIR.get_or_init(|| {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."))
    })
}

/// Returns the logs directory: `<exe_dir>/logs/`
pub fn get_logs_dir() -> PathBuf {
    get_exe_dir().join("logs")
}

/// Returns the debug image directory: `<exe_dir>/debug/`
pub fn get_debug_dir() -> PathBuf {
    get_exe_dir().join("debug")
}

/// Fallback snapshot image on platforms without screen capture.
pub fn get_default_snapshot_path() -> PathBuf {
    get_exe_dir().join("snapshot.png")
}

/// Ensures all output directories exist. Call at startup.
pub fn ensure_directories(debug: bool) -> std::io::Result<()> {
    std::fs::create_dir_all(get_logs_dir())?;
    if debug {
        std::fs::create_dir_all(get_debug_dir())?;
    }
    Ok(())
}
