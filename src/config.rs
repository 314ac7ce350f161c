//! Editor configuration supplied by the host page.
//!
//! The host passes a JSON object when constructing the editor. Every field is
//! optional; absent fields fall back to the defaults below.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use serde::{Deserialize, Serialize};

use crate::consts::{
    ALPHA_HIT_THRESHOLD, DEFAULT_FPS, DRAG_THRESHOLD_PX, HANDLE_SIZE_PX, HISTORY_DEPTH, MIN_RESIZE_PX,
};
use crate::error::EditorError;

pub const DEFAULT_ENDPOINT: &str = "php/file_manager.php";
pub const DEFAULT_SPRITE_ROOT: &str = "assets/sprite-animation";
pub const DEFAULT_ASSET_ROOT: &str = "assets";

/// A named scene size offered by the properties panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionPreset {
    pub name: String,
    #[serde(rename = "w")]
    pub width: f64,
    #[serde(rename = "h")]
    pub height: f64,
}

impl ResolutionPreset {
    fn new(name: &str, width: f64, height: f64) -> Self {
        Self { name: name.to_owned(), width, height }
    }

    /// `Custom` (zero-sized) presets carry no dimensions to apply.
    #[must_use]
    pub fn is_custom(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Typed editor configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    /// URL of the file-storage endpoint.
    pub endpoint: String,
    /// Directory holding `<sprite>/<anim>/<frame>` images.
    pub sprite_root: String,
    /// Root directory of the static asset browser.
    pub asset_root: String,
    /// Scene loaded on startup, if any.
    pub initial_scene: Option<String>,
    /// Undo/redo stack depth.
    pub history_depth: usize,
    /// Resize handle edge length in screen pixels.
    pub handle_size_px: f64,
    /// Pointer travel before a press becomes a drag.
    pub drag_threshold_px: f64,
    /// Resize floor for width and height.
    pub min_resize_px: f64,
    /// Alpha (0-255) above which a pixel counts as a hit.
    pub alpha_threshold: u8,
    /// Fallback animation speed.
    pub default_fps: f64,
    /// Scene size presets, in display order.
    pub resolution_presets: Vec<ResolutionPreset>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            sprite_root: DEFAULT_SPRITE_ROOT.to_owned(),
            asset_root: DEFAULT_ASSET_ROOT.to_owned(),
            initial_scene: None,
            history_depth: HISTORY_DEPTH,
            handle_size_px: HANDLE_SIZE_PX,
            drag_threshold_px: DRAG_THRESHOLD_PX,
            min_resize_px: MIN_RESIZE_PX,
            alpha_threshold: ALPHA_HIT_THRESHOLD,
            default_fps: DEFAULT_FPS,
            resolution_presets: default_presets(),
        }
    }
}

impl EditorConfig {
    /// Parse configuration from the host's JSON. An empty string yields defaults.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::InvalidConfig`] if the JSON is malformed or a
    /// value is out of range.
    pub fn from_json(raw: &str) -> Result<Self, EditorError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_json::from_str(raw).map_err(|e| EditorError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> Result<(), EditorError> {
        if self.history_depth == 0 {
            return Err(EditorError::InvalidConfig("historyDepth must be at least 1".into()));
        }
        for (name, value) in [
            ("handleSizePx", self.handle_size_px),
            ("dragThresholdPx", self.drag_threshold_px),
            ("minResizePx", self.min_resize_px),
            ("defaultFps", self.default_fps),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(EditorError::InvalidConfig(format!("{name} must be positive, got {value}")));
            }
        }
        Ok(())
    }

    /// Look up a preset by name.
    #[must_use]
    pub fn preset(&self, name: &str) -> Option<&ResolutionPreset> {
        self.resolution_presets.iter().find(|p| p.name == name)
    }
}

fn default_presets() -> Vec<ResolutionPreset> {
    vec![
        ResolutionPreset::new("Custom", 0.0, 0.0),
        ResolutionPreset::new("iPhone 14 Pro", 1179.0, 2556.0),
        ResolutionPreset::new("Pixel 7", 1080.0, 2400.0),
        ResolutionPreset::new("iPad Pro 12.9", 2048.0, 2732.0),
        ResolutionPreset::new("HD Desktop", 1920.0, 1080.0),
        ResolutionPreset::new("FHD Portrait", 1080.0, 1920.0),
        ResolutionPreset::new("4K Desktop", 3840.0, 2160.0),
    ]
}
