//! Directory where the executable lives. Preferences are stored there so a
//! standalone build keeps its settings next to the binary.

use std::path::PathBuf;

/// Directory containing the running executable. Falls back to the current directory.
pub fn exe_directory() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(PathBuf::from))
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}
