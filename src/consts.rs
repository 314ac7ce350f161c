//! Shared numeric constants for the editor core.

// ── Zoom ────────────────────────────────────────────────────────

/// Smallest allowed zoom factor (10%).
pub const ZOOM_MIN: f64 = 0.1;

/// Largest allowed zoom factor (500%).
pub const ZOOM_MAX: f64 = 5.0;

/// Increment used by the zoom in / zoom out buttons.
pub const ZOOM_STEP: f64 = 0.1;

/// Padding subtracted from the wrapper size when fitting the scene to screen.
pub const FIT_PADDING_PX: f64 = 40.0;

// ── Interaction ─────────────────────────────────────────────────

/// Visual edge length of a resize handle, in screen pixels.
pub const HANDLE_SIZE_PX: f64 = 10.0;

/// Pointer travel (canvas pixels) before a press becomes a drag.
pub const DRAG_THRESHOLD_PX: f64 = 3.0;

/// Minimum width/height accepted while resizing.
pub const MIN_RESIZE_PX: f64 = 5.0;

/// Alpha values above this (out of 255) count as an opaque pixel hit.
pub const ALPHA_HIT_THRESHOLD: u8 = 10;

/// Offset applied to duplicated objects.
pub const DUPLICATE_OFFSET: f64 = 20.0;

// ── Document defaults ───────────────────────────────────────────

/// Default edge length of a freshly added object before its image loads.
pub const NEW_OBJECT_SIZE: f64 = 64.0;

/// Default z-index assigned to freshly added objects.
pub const NEW_OBJECT_Z: i64 = 5;

/// Default scene dimensions.
pub const DEFAULT_SCENE_WIDTH: f64 = 800.0;
pub const DEFAULT_SCENE_HEIGHT: f64 = 600.0;

/// Default grid cell size.
pub const DEFAULT_GRID_SIZE: f64 = 32.0;

// ── History / animation ─────────────────────────────────────────

/// Maximum snapshots kept on each of the undo and redo stacks.
pub const HISTORY_DEPTH: usize = 50;

/// Frames per second used when an animation has no explicit setting.
pub const DEFAULT_FPS: f64 = 10.0;
