//! Hierarchy (treeview) controller.
//!
//! The tree is derived from `parent_id` back-references on every pass; array
//! order within a sibling list is the displayed order. Reordering physically
//! moves the entry inside the flat object array. A [`ChildIndex`] is built
//! once per pass so row building and descendant walks avoid repeated scans.

#[cfg(test)]
#[path = "tree_test.rs"]
mod tree_test;

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::doc::{ObjectId, Scene};
use crate::error::TreeError;
use crate::input::Modifiers;
use crate::selection::Selection;

/// Row id used for the scene root.
pub const SCENE_ROW_ID: &str = "scene";

/// Where a dragged row lands relative to the target row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropZone {
    Before,
    Inside,
    After,
}

/// Classify a pointer `rel_y` pixels below the top of a row `height` tall.
///
/// Top quarter inserts before, bottom quarter after. The middle nests inside
/// containers (folders, the scene root) and inserts after anything else.
#[must_use]
pub fn zone_for(rel_y: f64, height: f64, is_container: bool) -> DropZone {
    if rel_y < height * 0.25 {
        DropZone::Before
    } else if rel_y > height * 0.75 || !is_container {
        DropZone::After
    } else {
        DropZone::Inside
    }
}

/// A drop target row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropTarget {
    Scene,
    Object(ObjectId),
}

impl DropTarget {
    /// Parse a row id as reported by the host.
    #[must_use]
    pub fn from_row_id(id: &str) -> Self {
        if id == SCENE_ROW_ID { Self::Scene } else { Self::Object(id.to_owned()) }
    }
}

/// Children per parent, as array indices in array order.
#[derive(Debug, Default)]
pub struct ChildIndex {
    children: HashMap<Option<ObjectId>, Vec<usize>>,
}

impl ChildIndex {
    /// Index `scene`. Objects whose parent is missing are listed under the root.
    #[must_use]
    pub fn build(scene: &Scene) -> Self {
        let ids: HashSet<&str> = scene.objects.iter().map(|o| o.id.as_str()).collect();
        let mut children: HashMap<Option<ObjectId>, Vec<usize>> = HashMap::new();
        for (idx, obj) in scene.objects.iter().enumerate() {
            let parent = obj.parent_id.clone().filter(|p| ids.contains(p.as_str()));
            children.entry(parent).or_default().push(idx);
        }
        Self { children }
    }

    #[must_use]
    pub fn children(&self, parent: Option<&str>) -> &[usize] {
        self.children.get(&parent.map(str::to_owned)).map(Vec::as_slice).unwrap_or_default()
    }
}

/// Every non-folder object below `folder`, depth-first in array order.
#[must_use]
pub fn descendant_leaves(scene: &Scene, folder: &str) -> Vec<ObjectId> {
    let index = ChildIndex::build(scene);
    let mut out = Vec::new();
    let mut visited = HashSet::new();
    collect_leaves(scene, &index, folder, &mut visited, &mut out);
    out
}

fn collect_leaves<'a>(
    scene: &'a Scene,
    index: &ChildIndex,
    parent: &'a str,
    visited: &mut HashSet<&'a str>,
    out: &mut Vec<ObjectId>,
) {
    if !visited.insert(parent) {
        return;
    }
    for &idx in index.children(Some(parent)) {
        let child = &scene.objects[idx];
        if child.is_folder() {
            collect_leaves(scene, index, &child.id, visited, out);
        } else {
            out.push(child.id.clone());
        }
    }
}

/// Validate a drop without changing anything.
///
/// # Errors
///
/// Returns a [`TreeError`] if either id is unknown, the object is dropped on
/// itself, the target cannot hold children, or the move would create a cycle.
pub fn check_move(scene: &Scene, dragged: &str, target: &DropTarget, zone: DropZone) -> Result<(), TreeError> {
    if !scene.contains(dragged) {
        return Err(TreeError::UnknownObject(dragged.to_owned()));
    }
    let DropTarget::Object(target_id) = target else {
        return Ok(());
    };
    if target_id == dragged {
        return Err(TreeError::SelfDrop(dragged.to_owned()));
    }
    let Some(target_obj) = scene.get(target_id) else {
        return Err(TreeError::UnknownTarget(target_id.clone()));
    };
    if zone == DropZone::Inside && !target_obj.is_folder() {
        return Err(TreeError::NotAContainer(target_id.clone()));
    }
    if scene.is_descendant(dragged, target_id) {
        return Err(TreeError::Cycle { node: dragged.to_owned(), target: target_id.clone() });
    }
    Ok(())
}

/// Reparent and/or reorder `dragged` relative to `target`.
///
/// `Inside` appends to the end of the array under the new parent; `Before`
/// and `After` adopt the target's parent and sit next to it. Dropping on the
/// scene root moves to the root. On error the scene is untouched.
///
/// # Errors
///
/// See [`check_move`].
pub fn move_object(scene: &mut Scene, dragged: &str, target: &DropTarget, zone: DropZone) -> Result<(), TreeError> {
    check_move(scene, dragged, target, zone)?;
    let Some(from) = scene.index_of(dragged) else {
        return Err(TreeError::UnknownObject(dragged.to_owned()));
    };
    let mut obj = scene.objects.remove(from);

    let target_id = match target {
        DropTarget::Object(id) => id.as_str(),
        DropTarget::Scene => {
            obj.parent_id = None;
            scene.objects.push(obj);
            return Ok(());
        }
    };
    if zone == DropZone::Inside {
        obj.parent_id = Some(target_id.to_owned());
        scene.objects.push(obj);
        return Ok(());
    }
    let (target_idx, target_parent) = match scene.index_of(target_id) {
        Some(idx) => (idx, scene.objects[idx].parent_id.clone()),
        None => (scene.objects.len(), None),
    };
    obj.parent_id = target_parent;
    let at = if zone == DropZone::After { target_idx + 1 } else { target_idx };
    scene.objects.insert(at.min(scene.objects.len()), obj);
    Ok(())
}

/// Collapse state of tree rows. Survives scene loads within a session.
#[derive(Debug, Clone, Default)]
pub struct TreeState {
    collapsed: HashSet<String>,
}

impl TreeState {
    pub fn toggle(&mut self, id: &str) {
        if !self.collapsed.remove(id) {
            self.collapsed.insert(id.to_owned());
        }
    }

    #[must_use]
    pub fn is_collapsed(&self, id: &str) -> bool {
        self.collapsed.contains(id)
    }
}

/// One visible row of the tree, root first.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeRow {
    pub id: String,
    pub name: String,
    /// `scene`, `folder`, `static` or `sprite-anim`.
    pub kind: &'static str,
    pub depth: usize,
    pub selected: bool,
    /// Only containers can be collapsed.
    pub collapsible: bool,
    pub collapsed: bool,
    pub visible: bool,
    pub locked: bool,
}

/// Flatten the hierarchy into display rows. Children of collapsed rows are omitted.
#[must_use]
pub fn rows(scene: &Scene, selection: &Selection, state: &TreeState) -> Vec<TreeRow> {
    let index = ChildIndex::build(scene);
    let scene_collapsed = state.is_collapsed(SCENE_ROW_ID);
    let mut out = vec![TreeRow {
        id: SCENE_ROW_ID.to_owned(),
        name: scene.meta.scene_name.clone(),
        kind: "scene",
        depth: 0,
        selected: selection.is_scene(),
        collapsible: true,
        collapsed: scene_collapsed,
        visible: true,
        locked: false,
    }];
    if !scene_collapsed {
        let mut visited = HashSet::new();
        push_rows(scene, &index, None, 1, selection, state, &mut visited, &mut out);
    }
    out
}

#[allow(clippy::too_many_arguments)]
fn push_rows<'a>(
    scene: &'a Scene,
    index: &ChildIndex,
    parent: Option<&str>,
    depth: usize,
    selection: &Selection,
    state: &TreeState,
    visited: &mut HashSet<&'a str>,
    out: &mut Vec<TreeRow>,
) {
    for &idx in index.children(parent) {
        let obj = &scene.objects[idx];
        if !visited.insert(obj.id.as_str()) {
            continue;
        }
        let collapsed = obj.is_folder() && state.is_collapsed(&obj.id);
        out.push(TreeRow {
            id: obj.id.clone(),
            name: obj.name.clone(),
            kind: obj.type_label(),
            depth,
            selected: selection.contains(&obj.id),
            collapsible: obj.is_folder(),
            collapsed,
            visible: obj.visible,
            locked: obj.locked,
        });
        if obj.is_folder() && !collapsed {
            push_rows(scene, index, Some(obj.id.as_str()), depth + 1, selection, state, visited, out);
        }
    }
}

/// Apply a click on the row `id` to `selection`.
///
/// A plain click on a folder selects it; a second plain click on the same
/// (solely selected) folder selects every non-folder object below it, or
/// keeps the folder selected when it has none. Modifier clicks toggle.
pub fn click(scene: &Scene, selection: &mut Selection, id: &str, modifiers: Modifiers) {
    if id == SCENE_ROW_ID {
        selection.select_scene();
        return;
    }
    let Some(obj) = scene.get(id) else {
        return;
    };
    if modifiers.is_multi() {
        selection.toggle(obj.id.clone());
        return;
    }
    if obj.is_folder() && selection.single().is_some_and(|s| s == id) {
        let leaves = descendant_leaves(scene, id);
        if !leaves.is_empty() {
            selection.select_many(leaves);
            return;
        }
    }
    selection.select_only(obj.id.clone());
}
