//! Snapshot-based undo/redo history.
//!
//! Every mutating action calls [`History::save_state`] with the document as
//! it is *before* the mutation. Continuous gestures (drag, resize, sliders)
//! call it once when the gesture starts, so the whole gesture collapses into
//! one undo step.
//!
//! Snapshots are the serialized JSON of the full [`Scene`]; restoring parses
//! them back. A snapshot equal to the current top of the undo stack is not
//! pushed again, which absorbs repeated no-op triggers.

#[cfg(test)]
#[path = "history_test.rs"]
mod history_test;

use std::collections::VecDeque;

use crate::consts::HISTORY_DEPTH;
use crate::doc::Scene;
use crate::error::EditorError;

/// Bounded undo/redo stacks plus the document dirty flag.
#[derive(Debug, Clone)]
pub struct History {
    undo_stack: VecDeque<String>,
    redo_stack: VecDeque<String>,
    max_depth: usize,
    dirty: bool,
}

impl Default for History {
    fn default() -> Self {
        Self::new(HISTORY_DEPTH)
    }
}

impl History {
    /// Create empty history keeping at most `max_depth` snapshots per stack.
    #[must_use]
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            max_depth: max_depth.max(1),
            dirty: false,
        }
    }

    /// Record `scene` as the state to return to on the next undo.
    ///
    /// Returns `Ok(false)` when the snapshot duplicates the top of the undo stack.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::Serialize`] if the scene cannot be serialized.
    pub fn save_state(&mut self, scene: &Scene) -> Result<bool, EditorError> {
        let state = serde_json::to_string(scene)?;
        if self.undo_stack.back() == Some(&state) {
            return Ok(false);
        }
        push_bounded(&mut self.undo_stack, state, self.max_depth);
        self.redo_stack.clear();
        self.dirty = true;
        log::debug!("history: snapshot pushed (undo depth {})", self.undo_stack.len());
        Ok(true)
    }

    /// Step back one snapshot. `current` is pushed onto the redo stack.
    ///
    /// Returns `Ok(None)` when there is nothing to undo.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::Serialize`] if a snapshot cannot be encoded or
    /// decoded; the stacks are left untouched in that case.
    pub fn undo(&mut self, current: &Scene) -> Result<Option<Scene>, EditorError> {
        step(&mut self.undo_stack, &mut self.redo_stack, current, self.max_depth)
    }

    /// Step forward one snapshot. `current` is pushed onto the undo stack.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::Serialize`] on snapshot encode/decode failure.
    pub fn redo(&mut self, current: &Scene) -> Result<Option<Scene>, EditorError> {
        step(&mut self.redo_stack, &mut self.undo_stack, current, self.max_depth)
    }

    /// Drop all snapshots and mark the document clean (new or freshly loaded scene).
    pub fn reset(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.dirty = false;
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    #[must_use]
    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    #[must_use]
    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    /// Whether the document changed since it was last loaded or saved.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Mark the document as modified (used by restores, which bypass `save_state`).
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Mark the document as saved.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }
}

fn step(
    from: &mut VecDeque<String>,
    to: &mut VecDeque<String>,
    current: &Scene,
    max_depth: usize,
) -> Result<Option<Scene>, EditorError> {
    let Some(raw) = from.back() else {
        return Ok(None);
    };
    let restored: Scene = serde_json::from_str(raw)?;
    let current = serde_json::to_string(current)?;
    from.pop_back();
    push_bounded(to, current, max_depth);
    Ok(Some(restored))
}

fn push_bounded(stack: &mut VecDeque<String>, state: String, max_depth: usize) {
    stack.push_back(state);
    while stack.len() > max_depth {
        stack.pop_front();
    }
}
