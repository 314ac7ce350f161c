//! Input model: modifier keys, keys, and the pointer gesture state machine.
//!
//! `InputState` is the active gesture tracked between pointer-down and
//! pointer-up. It carries everything needed to recompute positions from the
//! gesture's start point rather than accumulating per-event deltas, so a
//! rejected resize frame simply leaves the previous valid frame in place.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use crate::camera::Point;
use crate::doc::{Bounds, ObjectId};
use crate::hit::Corner;

/// Keyboard/mouse modifier keys held during an event.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    /// Shift key is held.
    pub shift: bool,
    /// Ctrl key is held.
    pub ctrl: bool,
    /// Alt / Option key is held.
    pub alt: bool,
    /// Meta / Command key is held.
    pub meta: bool,
}

impl Modifiers {
    /// Whether this click should toggle selection membership instead of replacing it.
    #[must_use]
    pub fn is_multi(self) -> bool {
        self.ctrl || self.shift || self.meta
    }

    /// Ctrl on most platforms, Command on macOS.
    #[must_use]
    pub fn is_command(self) -> bool {
        self.ctrl || self.meta
    }
}

/// A keyboard key as reported by the browser (`"Delete"`, `"z"`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key(pub String);

impl Key {
    /// Case-insensitive comparison for single-letter shortcuts.
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.0.eq_ignore_ascii_case(name)
    }
}

/// Per-object drag bookkeeping captured at pointer-down.
#[derive(Debug, Clone, PartialEq)]
pub struct DragOffset {
    pub id: ObjectId,
    /// Pointer position minus the object's origin.
    pub offset: Point,
    /// Object origin when the gesture started.
    pub origin: Point,
}

/// Internal state for the pointer gesture state machine.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum InputState {
    /// No gesture in progress.
    #[default]
    Idle,
    /// Pointer went down over a selected object; not yet a drag.
    PotentialDrag {
        /// Canvas-space pointer position at pointer-down.
        start: Point,
        offsets: Vec<DragOffset>,
        /// Travel passed the threshold with nothing draggable (all locked).
        moved: bool,
    },
    /// The pointer moved past the drag threshold while over a selection.
    Dragging {
        start: Point,
        offsets: Vec<DragOffset>,
    },
    /// Pointer went down on empty space or an unselected object; may still become a drag-less click.
    PendingClick {
        start: Point,
        moved: bool,
    },
    /// A corner handle of the single selected object is being dragged.
    Resizing {
        id: ObjectId,
        corner: Corner,
        start: Point,
        /// Bounds when the gesture started.
        orig: Bounds,
        /// Width / height of `orig`, captured for aspect-locked resizing.
        ratio: f64,
    },
}

impl InputState {
    /// Whether a gesture that mutates the document (drag or resize) is active.
    #[must_use]
    pub fn is_manipulating(&self) -> bool {
        matches!(self, Self::Dragging { .. } | Self::Resizing { .. })
    }
}
