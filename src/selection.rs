//! Selection state: either the scene itself, or an ordered set of object ids.

#[cfg(test)]
#[path = "selection_test.rs"]
mod selection_test;

use crate::doc::{ObjectId, Scene};

/// What the properties panel and canvas treat as selected.
///
/// The scene pseudo-selection and object selection are mutually exclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    scene: bool,
    ids: Vec<ObjectId>,
}

impl Selection {
    /// Whether the scene (metadata) is selected.
    #[must_use]
    pub fn is_scene(&self) -> bool {
        self.scene
    }

    /// Selected object ids in selection order.
    #[must_use]
    pub fn ids(&self) -> &[ObjectId] {
        &self.ids
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|s| s == id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.scene && self.ids.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// The id when exactly one object is selected.
    #[must_use]
    pub fn single(&self) -> Option<&ObjectId> {
        match self.ids.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }

    /// Select the scene pseudo-object.
    pub fn select_scene(&mut self) {
        self.scene = true;
        self.ids.clear();
    }

    /// Replace the selection with one object.
    pub fn select_only(&mut self, id: ObjectId) {
        self.scene = false;
        self.ids.clear();
        self.ids.push(id);
    }

    /// Replace the selection with `ids`, dropping duplicates.
    pub fn select_many(&mut self, ids: impl IntoIterator<Item = ObjectId>) {
        self.scene = false;
        self.ids.clear();
        for id in ids {
            if !self.contains(&id) {
                self.ids.push(id);
            }
        }
    }

    /// Add `id` if absent, remove it if present (modifier-click semantics).
    pub fn toggle(&mut self, id: ObjectId) {
        self.scene = false;
        if let Some(pos) = self.ids.iter().position(|s| *s == id) {
            self.ids.remove(pos);
        } else {
            self.ids.push(id);
        }
    }

    pub fn clear(&mut self) {
        self.scene = false;
        self.ids.clear();
    }

    /// Drop ids that no longer exist in `scene`. Returns true if anything was removed.
    pub fn prune(&mut self, scene: &Scene) -> bool {
        let before = self.ids.len();
        self.ids.retain(|id| scene.contains(id));
        before != self.ids.len()
    }
}
