//! Zoom state and conversions between client (CSS) and canvas coordinates.
//!
//! The canvas keeps its internal resolution equal to the scene size; zoom is
//! applied by scaling the element's CSS box. Pointer events arrive in client
//! pixels and must be divided back down to scene pixels before any hit test.

#[cfg(test)]
#[path = "camera_test.rs"]
mod camera_test;

use crate::consts::{FIT_PADDING_PX, ZOOM_MAX, ZOOM_MIN};

/// A point in either client or canvas space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance_to(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Zoom state for the scene canvas.
///
/// `zoom` is a scale factor (1.0 = one scene pixel per CSS pixel) and is
/// always within `[ZOOM_MIN, ZOOM_MAX]`.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    zoom: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self { zoom: 1.0 }
    }
}

impl Camera {
    /// Current zoom factor.
    #[must_use]
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Set the zoom factor, clamped to the supported range. Returns the applied value.
    pub fn set_zoom(&mut self, zoom: f64) -> f64 {
        self.zoom = clamp_zoom(zoom);
        self.zoom
    }

    /// Zoom as a rounded percentage, for the toolbar readout.
    #[must_use]
    pub fn percent(&self) -> i64 {
        #[allow(clippy::cast_possible_truncation)]
        let pct = (self.zoom * 100.0).round() as i64;
        pct
    }

    /// Convert a client-space point into canvas (scene) coordinates.
    ///
    /// `origin` is the top-left of the canvas element's bounding rect in client space.
    #[must_use]
    pub fn client_to_canvas(&self, client: Point, origin: Point) -> Point {
        Point {
            x: (client.x - origin.x) / self.zoom,
            y: (client.y - origin.y) / self.zoom,
        }
    }

    /// Convert a screen-space distance (CSS pixels) to scene pixels.
    #[must_use]
    pub fn screen_dist_to_canvas(&self, screen_dist: f64) -> f64 {
        screen_dist / self.zoom
    }

    /// CSS size of the canvas element for a scene of the given dimensions.
    #[must_use]
    pub fn css_size(&self, scene_w: f64, scene_h: f64) -> (f64, f64) {
        (scene_w * self.zoom, scene_h * self.zoom)
    }

    /// Zoom that fits the whole scene into the available area, never above 1.0.
    pub fn fit_to(&mut self, avail_w: f64, avail_h: f64, scene_w: f64, scene_h: f64) -> f64 {
        if scene_w <= 0.0 || scene_h <= 0.0 {
            return self.zoom;
        }
        let scale_w = (avail_w - FIT_PADDING_PX) / scene_w;
        let scale_h = (avail_h - FIT_PADDING_PX) / scene_h;
        self.set_zoom(scale_w.min(scale_h).min(1.0))
    }
}

/// Clamp a raw zoom value into `[ZOOM_MIN, ZOOM_MAX]`; non-finite input maps to 1.0.
#[must_use]
pub fn clamp_zoom(zoom: f64) -> f64 {
    if zoom.is_finite() { zoom.clamp(ZOOM_MIN, ZOOM_MAX) } else { 1.0 }
}
