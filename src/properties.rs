//! Properties panel controller: view models and typed field edits.
//!
//! The panel shows exactly one of four views depending on the selection:
//! nothing, the scene, one object, or several objects. Edits arrive as typed
//! field values (deserialized from `{"field": ..., "value": ...}` sent by the
//! host) and are applied by pure functions here; the engine wraps them with
//! the history snapshot, animator resets and refresh actions.

#[cfg(test)]
#[path = "properties_test.rs"]
mod properties_test;

use serde::{Deserialize, Serialize};

use crate::animator::SpriteCatalogs;
use crate::doc::{
    AnimSetting, BackgroundMode, Bounds, GridSettings, ObjectKind, ResolvedAnimSettings, Scene, SceneMeta,
    SceneObject, SequenceStep, SpriteAnim,
};
use crate::error::EditorError;
use crate::selection::Selection;

// =============================================================
// Views
// =============================================================

/// What the panel should display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "view", rename_all = "camelCase")]
pub enum PanelView {
    /// Nothing selected (or the selection went stale).
    Empty,
    Scene(SceneMeta),
    Object(Box<ObjectView>),
    #[serde(rename_all = "camelCase")]
    Multi {
        count: usize,
        avg_width_pct: f64,
        avg_height_pct: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectView {
    pub id: String,
    pub name: String,
    pub kind: &'static str,
    pub visible: bool,
    pub locked: bool,
    pub z_index: i64,
    /// Absent for folders.
    pub transform: Option<TransformView>,
    pub sprite: Option<SpriteView>,
    pub aspect_locked: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformView {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub width_pct: f64,
    pub height_pct: f64,
    pub opacity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpriteView {
    pub sprite_name: String,
    pub current_anim: String,
    /// Animation names from the loaded catalog; empty while it loads.
    pub animations: Vec<String>,
    /// Settings of `current_anim` with defaults applied.
    pub settings: ResolvedAnimSettings,
    pub sequence: Vec<SequenceStep>,
}

/// Build the panel view for the current selection.
#[must_use]
pub fn view(
    scene: &Scene,
    selection: &Selection,
    aspect_locked: bool,
    catalogs: &SpriteCatalogs,
    default_fps: f64,
) -> PanelView {
    if selection.is_scene() {
        return PanelView::Scene(scene.meta.clone());
    }
    // Ids that no longer resolve count as unselected.
    let live: Vec<&SceneObject> = selection.ids().iter().filter_map(|id| scene.get(id)).collect();
    match live.as_slice() {
        [] => PanelView::Empty,
        [obj] => PanelView::Object(Box::new(object_view(obj, &scene.meta, aspect_locked, catalogs, default_fps))),
        objs => {
            let ids: Vec<String> = objs.iter().map(|o| o.id.clone()).collect();
            let (avg_width_pct, avg_height_pct) = average_size_pct(scene, &ids);
            PanelView::Multi { count: objs.len(), avg_width_pct, avg_height_pct }
        }
    }
}

fn object_view(
    obj: &SceneObject,
    meta: &SceneMeta,
    aspect_locked: bool,
    catalogs: &SpriteCatalogs,
    default_fps: f64,
) -> ObjectView {
    let transform = obj.bounds().map(|b| TransformView {
        x: b.x.round(),
        y: b.y.round(),
        width: b.width.round(),
        height: b.height.round(),
        width_pct: round2(pct_of(b.width, meta.width)),
        height_pct: round2(pct_of(b.height, meta.height)),
        opacity: obj.opacity(),
    });
    let sprite = match &obj.kind {
        ObjectKind::SpriteAnim(s) => Some(SpriteView {
            sprite_name: s.sprite_name.clone(),
            current_anim: s.current_anim.clone(),
            animations: catalogs.get(&s.sprite_name).map(|c| c.keys().cloned().collect()).unwrap_or_default(),
            settings: s.anim_settings.get(&s.current_anim).copied().unwrap_or_default().resolved(default_fps),
            sequence: s.sequence.clone(),
        }),
        _ => None,
    };
    ObjectView {
        id: obj.id.clone(),
        name: obj.name.clone(),
        kind: obj.type_label(),
        visible: obj.visible,
        locked: obj.locked,
        z_index: obj.z_index,
        transform,
        sprite,
        aspect_locked,
    }
}

/// Mean width/height as a percentage of the scene over the non-folder objects in `ids`.
#[must_use]
pub fn average_size_pct(scene: &Scene, ids: &[String]) -> (f64, f64) {
    let sizes: Vec<Bounds> = ids.iter().filter_map(|id| scene.get(id).and_then(SceneObject::bounds)).collect();
    if sizes.is_empty() {
        return (0.0, 0.0);
    }
    #[allow(clippy::cast_precision_loss)]
    let n = sizes.len() as f64;
    let w: f64 = sizes.iter().map(|b| pct_of(b.width, scene.meta.width)).sum();
    let h: f64 = sizes.iter().map(|b| pct_of(b.height, scene.meta.height)).sum();
    (round2(w / n), round2(h / n))
}

fn pct_of(value: f64, total: f64) -> f64 {
    if total > 0.0 { value / total * 100.0 } else { 0.0 }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// =============================================================
// Object fields
// =============================================================

/// An edit to one field of the single selected object.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "camelCase")]
pub enum ObjectField {
    Name(String),
    X(f64),
    Y(f64),
    Width(f64),
    Height(f64),
    /// Width as a percentage of the scene width.
    WidthPct(f64),
    HeightPct(f64),
    Opacity(f64),
    ZIndex(i64),
    Visible(bool),
    Locked(bool),
}

impl ObjectField {
    /// Whether the treeview shows this field.
    #[must_use]
    pub fn affects_tree(&self) -> bool {
        matches!(self, Self::Name(_) | Self::ZIndex(_) | Self::Visible(_) | Self::Locked(_))
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Name(_) => "name",
            Self::X(_) => "x",
            Self::Y(_) => "y",
            Self::Width(_) | Self::WidthPct(_) => "width",
            Self::Height(_) | Self::HeightPct(_) => "height",
            Self::Opacity(_) => "opacity",
            Self::ZIndex(_) => "zIndex",
            Self::Visible(_) => "visible",
            Self::Locked(_) => "locked",
        }
    }
}

/// How a field commit interacts with history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Commit {
    /// A discrete edit: snapshot, then apply.
    #[default]
    Discrete,
    /// One update of a continuous gesture (slider); the snapshot was taken at gesture start.
    Continuous,
}

/// Apply `field` to `obj`. Percentages resolve against `meta`.
///
/// With `aspect_locked`, editing width or height recomputes the other from
/// the ratio before the edit.
///
/// # Errors
///
/// [`EditorError::UnsupportedKind`] for spatial fields on folders,
/// [`EditorError::InvalidValue`] for empty names or non-positive sizes.
pub fn apply_object_field(
    obj: &mut SceneObject,
    field: &ObjectField,
    meta: &SceneMeta,
    aspect_locked: bool,
) -> Result<(), EditorError> {
    match field {
        ObjectField::Name(name) => {
            let name = name.trim();
            if name.is_empty() {
                return Err(invalid("name", "must not be empty"));
            }
            obj.name = name.to_owned();
        }
        ObjectField::ZIndex(z) => obj.z_index = *z,
        ObjectField::Visible(v) => obj.visible = *v,
        ObjectField::Locked(l) => obj.locked = *l,
        ObjectField::Opacity(o) => {
            if !o.is_finite() {
                return Err(invalid("opacity", "must be a number"));
            }
            if !obj.set_opacity(*o) {
                return Err(unsupported(obj, field));
            }
        }
        ObjectField::X(_) | ObjectField::Y(_) | ObjectField::Width(_) | ObjectField::Height(_) => {
            apply_spatial(obj, field, aspect_locked)?;
        }
        ObjectField::WidthPct(pct) => {
            let px = pct_value(*pct, meta.width)?;
            apply_spatial(obj, &ObjectField::Width(px), aspect_locked)?;
        }
        ObjectField::HeightPct(pct) => {
            let px = pct_value(*pct, meta.height)?;
            apply_spatial(obj, &ObjectField::Height(px), aspect_locked)?;
        }
    }
    Ok(())
}

fn apply_spatial(obj: &mut SceneObject, field: &ObjectField, aspect_locked: bool) -> Result<(), EditorError> {
    let id = obj.id.clone();
    let Some(bounds) = obj.bounds_mut() else {
        return Err(EditorError::UnsupportedKind { id, operation: field.label() });
    };
    let ratio = if bounds.height > 0.0 { bounds.width / bounds.height } else { 0.0 };
    match *field {
        ObjectField::X(x) => bounds.x = finite("x", x)?,
        ObjectField::Y(y) => bounds.y = finite("y", y)?,
        ObjectField::Width(w) => {
            bounds.width = positive("width", w)?;
            if aspect_locked && ratio > 0.0 {
                bounds.height = w / ratio;
            }
        }
        ObjectField::Height(h) => {
            bounds.height = positive("height", h)?;
            if aspect_locked && ratio > 0.0 {
                bounds.width = h * ratio;
            }
        }
        _ => {}
    }
    Ok(())
}

fn pct_value(pct: f64, total: f64) -> Result<f64, EditorError> {
    Ok(positive("percentage", pct)? / 100.0 * total)
}

/// Axis of a multi-selection percentage edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Axis {
    Width,
    Height,
}

/// Set width or height of every non-folder object in `ids` to `pct` of the scene.
///
/// Returns how many objects changed.
///
/// # Errors
///
/// [`EditorError::InvalidValue`] for a non-positive percentage.
pub fn set_multi_size_pct(scene: &mut Scene, ids: &[String], axis: Axis, pct: f64) -> Result<usize, EditorError> {
    let total = match axis {
        Axis::Width => scene.meta.width,
        Axis::Height => scene.meta.height,
    };
    let px = pct_value(pct, total)?;
    let mut changed = 0;
    for obj in scene.objects.iter_mut().filter(|o| ids.contains(&o.id)) {
        if let Some(bounds) = obj.bounds_mut() {
            match axis {
                Axis::Width => bounds.width = px,
                Axis::Height => bounds.height = px,
            }
            changed += 1;
        }
    }
    Ok(changed)
}

/// Scale `obj` to fill the scene along its limiting axis, preserving aspect
/// ratio, and center it on the other axis.
///
/// # Errors
///
/// [`EditorError::UnsupportedKind`] for folders, [`EditorError::InvalidValue`]
/// for degenerate object or scene sizes.
pub fn fit_to_scene(obj: &mut SceneObject, meta: &SceneMeta) -> Result<(), EditorError> {
    let id = obj.id.clone();
    let Some(bounds) = obj.bounds_mut() else {
        return Err(EditorError::UnsupportedKind { id, operation: "fit to scene" });
    };
    if bounds.width <= 0.0 || bounds.height <= 0.0 || meta.width <= 0.0 || meta.height <= 0.0 {
        return Err(invalid("size", "object and scene must have positive dimensions"));
    }
    let obj_ratio = bounds.width / bounds.height;
    let scene_ratio = meta.width / meta.height;
    if obj_ratio > scene_ratio {
        bounds.width = meta.width;
        bounds.height = meta.width / obj_ratio;
        bounds.x = 0.0;
        bounds.y = (meta.height - bounds.height) / 2.0;
    } else {
        bounds.height = meta.height;
        bounds.width = meta.height * obj_ratio;
        bounds.y = 0.0;
        bounds.x = (meta.width - bounds.width) / 2.0;
    }
    Ok(())
}

// =============================================================
// Scene fields
// =============================================================

/// An edit to scene metadata.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "camelCase")]
pub enum SceneField {
    SceneName(String),
    Width(f64),
    Height(f64),
    BackgroundColor(String),
    BackgroundImage(Option<String>),
    BackgroundMode(BackgroundMode),
    GridSize(f64),
    GridEnabled(bool),
    GridSnap(bool),
}

impl SceneField {
    /// Whether the canvas element must be resized.
    #[must_use]
    pub fn resizes_canvas(&self) -> bool {
        matches!(self, Self::Width(_) | Self::Height(_))
    }
}

/// Apply `field` to `meta`.
///
/// # Errors
///
/// [`EditorError::InvalidValue`] for non-positive dimensions or grid size.
pub fn apply_scene_field(meta: &mut SceneMeta, field: &SceneField) -> Result<(), EditorError> {
    match field {
        SceneField::SceneName(name) => meta.scene_name.clone_from(name),
        SceneField::Width(w) => meta.width = positive("width", *w)?.round(),
        SceneField::Height(h) => meta.height = positive("height", *h)?.round(),
        SceneField::BackgroundColor(c) => meta.background_color.clone_from(c),
        SceneField::BackgroundImage(img) => {
            meta.background_image = img.clone().filter(|p| !p.trim().is_empty());
        }
        SceneField::BackgroundMode(mode) => meta.background_mode = *mode,
        SceneField::GridSize(size) => meta.grid.size = positive("gridSize", *size)?,
        SceneField::GridEnabled(on) => meta.grid = GridSettings { enabled: *on, ..meta.grid },
        SceneField::GridSnap(on) => meta.grid = GridSettings { snap: *on, ..meta.grid },
    }
    Ok(())
}

// =============================================================
// Sprite edits
// =============================================================

/// An edit to a sprite-anim object's animation settings or sequence.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "edit", rename_all = "camelCase")]
pub enum SpriteEdit {
    /// Choose which animation's settings the panel edits.
    CurrentAnim { anim: String },
    /// Set `fps`, `stepX` or `stepY` of the current animation.
    Setting { name: String, value: f64 },
    AddStep { anim: String, limit: u32 },
    RemoveStep { index: usize },
    MoveStep { from: usize, to: usize },
    SetStepLimit { index: usize, limit: u32 },
    SetStepAnim { index: usize, anim: String },
}

/// Apply a sprite edit.
///
/// # Errors
///
/// [`EditorError::UnsupportedKind`] for non-sprite objects and
/// [`EditorError::InvalidValue`] for unknown setting names, bad values or
/// out-of-range step indices.
pub fn apply_sprite_edit(obj: &mut SceneObject, edit: &SpriteEdit) -> Result<(), EditorError> {
    let id = obj.id.clone();
    let ObjectKind::SpriteAnim(sprite) = &mut obj.kind else {
        return Err(EditorError::UnsupportedKind { id, operation: "sprite editing" });
    };
    match edit {
        SpriteEdit::CurrentAnim { anim } => sprite.current_anim.clone_from(anim),
        SpriteEdit::Setting { name, value } => set_anim_setting(sprite, name, *value)?,
        SpriteEdit::AddStep { anim, limit } => {
            if anim.is_empty() {
                return Err(invalid("sequence", "step needs an animation"));
            }
            sprite.sequence.push(SequenceStep::new(anim.clone(), *limit));
        }
        SpriteEdit::RemoveStep { index } => {
            check_index(sprite, *index)?;
            sprite.sequence.remove(*index);
        }
        SpriteEdit::MoveStep { from, to } => {
            check_index(sprite, *from)?;
            let step = sprite.sequence.remove(*from);
            let to = (*to).min(sprite.sequence.len());
            sprite.sequence.insert(to, step);
        }
        SpriteEdit::SetStepLimit { index, limit } => step_mut(sprite, *index)?.limit = *limit,
        SpriteEdit::SetStepAnim { index, anim } => step_mut(sprite, *index)?.anim.clone_from(anim),
    }
    Ok(())
}

fn set_anim_setting(sprite: &mut SpriteAnim, name: &str, value: f64) -> Result<(), EditorError> {
    let setting: AnimSetting = name.parse().map_err(|reason| EditorError::InvalidValue { field: "animSetting", reason })?;
    if sprite.current_anim.is_empty() {
        return Err(invalid("currentAnim", "no animation chosen"));
    }
    let value = finite("animSetting", value)?;
    if setting == AnimSetting::Fps && value <= 0.0 {
        return Err(invalid("fps", "must be positive"));
    }
    sprite.anim_settings.entry(sprite.current_anim.clone()).or_default().set(setting, value);
    Ok(())
}

fn check_index(sprite: &SpriteAnim, index: usize) -> Result<(), EditorError> {
    if index < sprite.sequence.len() {
        Ok(())
    } else {
        Err(EditorError::InvalidValue {
            field: "sequence",
            reason: format!("step {index} out of range ({} steps)", sprite.sequence.len()),
        })
    }
}

fn step_mut(sprite: &mut SpriteAnim, index: usize) -> Result<&mut SequenceStep, EditorError> {
    check_index(sprite, index)?;
    sprite.sequence.get_mut(index).ok_or_else(|| invalid("sequence", "step out of range"))
}

// =============================================================
// Validation helpers
// =============================================================

fn invalid(field: &'static str, reason: &str) -> EditorError {
    EditorError::InvalidValue { field, reason: reason.to_owned() }
}

fn unsupported(obj: &SceneObject, field: &ObjectField) -> EditorError {
    EditorError::UnsupportedKind { id: obj.id.clone(), operation: field.label() }
}

fn finite(field: &'static str, value: f64) -> Result<f64, EditorError> {
    if value.is_finite() { Ok(value) } else { Err(invalid(field, "must be a number")) }
}

fn positive(field: &'static str, value: f64) -> Result<f64, EditorError> {
    if value.is_finite() && value > 0.0 { Ok(value) } else { Err(invalid(field, "must be positive")) }
}
