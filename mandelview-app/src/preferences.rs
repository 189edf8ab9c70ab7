use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use mandelview_core::Viewport;
use mandelview_render::{ColorMode, CATALOG, DEFAULT_LUT_SIZE};

/// Smallest iteration multiplier reachable with the `,` key.
pub const MIN_ITERATION_MULTIPLIER: f64 = 0.0625;

/// Largest multiplier accepted from disk.
pub const MAX_ITERATION_MULTIPLIER: f64 = 1024.0;

// ---------------------------------------------------------------------------
// Application preferences
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppPreferences {
    #[serde(default = "default_window_width")]
    pub window_width: f32,
    #[serde(default = "default_window_height")]
    pub window_height: f32,
    #[serde(default)]
    pub palette_index: usize,
    /// Entries in the palette lookup table.
    #[serde(default = "default_lut_size")]
    pub lut_size: usize,
    #[serde(default = "default_true")]
    pub cyclic_coloring: bool,
    /// Scales the zoom-derived iteration cap.
    #[serde(default = "default_iteration_multiplier")]
    pub iteration_multiplier: f64,
    /// Worker threads; 0 uses one per logical core.
    #[serde(default)]
    pub workers: usize,
    #[serde(default = "default_true")]
    pub show_hud: bool,
    #[serde(default = "default_true")]
    pub restore_last_view: bool,
    #[serde(default)]
    pub last_view: Option<Viewport>,
}

fn default_window_width() -> f32 {
    1280.0
}
fn default_window_height() -> f32 {
    720.0
}
fn default_lut_size() -> usize {
    DEFAULT_LUT_SIZE
}
fn default_true() -> bool {
    true
}
fn default_iteration_multiplier() -> f64 {
    1.0
}

impl Default for AppPreferences {
    fn default() -> Self {
        Self {
            window_width: default_window_width(),
            window_height: default_window_height(),
            palette_index: 0,
            lut_size: default_lut_size(),
            cyclic_coloring: true,
            iteration_multiplier: default_iteration_multiplier(),
            workers: 0,
            show_hud: true,
            restore_last_view: true,
            last_view: None,
        }
    }
}

impl AppPreferences {
    /// Load preferences from next to the executable, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            debug!("No preferences file at {}", path.display());
            return Self::default();
        }
        match fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str::<AppPreferences>(&json) {
                Ok(prefs) => {
                    info!("Loaded preferences from {}", path.display());
                    prefs.sanitized()
                }
                Err(e) => {
                    error!("Failed to parse preferences: {e}");
                    Self::default()
                }
            },
            Err(e) => {
                error!("Failed to read preferences file: {e}");
                Self::default()
            }
        }
    }

    /// Persist preferences to disk.
    pub fn save(&self) {
        self.save_to(&config_path());
    }

    pub fn save_to(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                error!("Failed to create config directory: {e}");
                return;
            }
        }
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = fs::write(path, &json) {
                    error!("Failed to write preferences: {e}");
                } else {
                    debug!("Saved preferences");
                }
            }
            Err(e) => error!("Failed to serialize preferences: {e}"),
        }
    }

    pub fn color_mode(&self) -> ColorMode {
        if self.cyclic_coloring {
            ColorMode::Cyclic
        } else {
            ColorMode::Linear
        }
    }

    /// Clamp hand-edited values into ranges the renderer accepts.
    fn sanitized(mut self) -> Self {
        if self.palette_index >= CATALOG.len() {
            warn!(index = self.palette_index, "Palette index out of range, using 0");
            self.palette_index = 0;
        }
        if self.lut_size == 0 {
            warn!("Palette size 0 in preferences, using default");
            self.lut_size = DEFAULT_LUT_SIZE;
        }
        if !self.iteration_multiplier.is_finite() || self.iteration_multiplier <= 0.0 {
            warn!(
                multiplier = self.iteration_multiplier,
                "Invalid iteration multiplier, using 1"
            );
            self.iteration_multiplier = 1.0;
        }
        self.iteration_multiplier = self
            .iteration_multiplier
            .clamp(MIN_ITERATION_MULTIPLIER, MAX_ITERATION_MULTIPLIER);
        if self.last_view.is_some_and(|vp| vp.validate().is_err()) {
            warn!("Discarding invalid last view");
            self.last_view = None;
        }
        self
    }
}

fn config_path() -> PathBuf {
    crate::app_dir::exe_directory().join("preferences.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("mandelview-{}-{name}", std::process::id()))
    }

    #[test]
    fn missing_fields_take_defaults() {
        let prefs: AppPreferences = serde_json::from_str(r#"{ "palette_index": 3 }"#).unwrap();
        assert_eq!(prefs.palette_index, 3);
        assert_eq!(prefs.lut_size, DEFAULT_LUT_SIZE);
        assert!(prefs.cyclic_coloring);
        assert_eq!(prefs.iteration_multiplier, 1.0);
        assert_eq!(prefs.workers, 0);
        assert!(prefs.last_view.is_none());
    }

    #[test]
    fn save_then_load() {
        let path = temp_file("roundtrip.json");
        let mut prefs = AppPreferences {
            palette_index: 5,
            cyclic_coloring: false,
            iteration_multiplier: 4.0,
            ..AppPreferences::default()
        };
        prefs.last_view = Some(Viewport::default_view(800, 600));
        prefs.save_to(&path);

        let loaded = AppPreferences::load_from(&path);
        assert_eq!(loaded.palette_index, 5);
        assert_eq!(loaded.color_mode(), ColorMode::Linear);
        assert_eq!(loaded.iteration_multiplier, 4.0);
        assert_eq!(loaded.last_view.map(|vp| vp.width), Some(800));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn garbage_file_falls_back_to_defaults() {
        let path = temp_file("garbage.json");
        fs::write(&path, "not json").unwrap();
        let loaded = AppPreferences::load_from(&path);
        assert_eq!(loaded.palette_index, 0);
        assert_eq!(loaded.lut_size, DEFAULT_LUT_SIZE);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn out_of_range_values_are_sanitized() {
        let path = temp_file("sanitize.json");
        fs::write(
            &path,
            r#"{ "palette_index": 99, "lut_size": 0, "iteration_multiplier": -3.0,
                 "last_view": { "width": 0, "height": 10, "zoom": 0.01,
                                "offset": { "re": 0.0, "im": 0.0 }, "max_iterations": 64 } }"#,
        )
        .unwrap();
        let loaded = AppPreferences::load_from(&path);
        assert_eq!(loaded.palette_index, 0);
        assert_eq!(loaded.lut_size, DEFAULT_LUT_SIZE);
        assert_eq!(loaded.iteration_multiplier, 1.0);
        assert!(loaded.last_view.is_none());
        let _ = fs::remove_file(&path);
    }
}
