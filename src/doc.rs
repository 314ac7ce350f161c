//! Document model: scene metadata, scene objects, and their persisted shape.
//!
//! This module defines the data that is saved to and loaded from the file
//! store (`Scene`, `SceneMeta`, `SceneObject`, `ObjectKind`) plus the small
//! typed helpers other layers use to read it: bounds access, unique naming,
//! parent/child lookups and draw ordering.
//!
//! The object list is flat. Hierarchy is expressed only through `parent_id`
//! back-references, and array order is the authoritative tree order and the
//! tie-break for `z_index` when drawing.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::consts::{DEFAULT_FPS, DEFAULT_GRID_SIZE, DEFAULT_SCENE_HEIGHT, DEFAULT_SCENE_WIDTH};

/// Unique identifier for a scene object. Stable for the document's lifetime.
pub type ObjectId = String;

/// Ordered frame filenames per animation name for one sprite.
pub type FrameCatalog = BTreeMap<String, Vec<String>>;

/// Generate a fresh object id with the given prefix (`obj`, `folder`).
#[must_use]
pub fn new_object_id(prefix: &str) -> ObjectId {
    format!("{prefix}_{}", Uuid::new_v4().simple())
}

// =============================================================
// Scene
// =============================================================

/// The full editable document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub meta: SceneMeta,
    #[serde(default)]
    pub library: Library,
    #[serde(default)]
    pub objects: Vec<SceneObject>,
}

/// Sprite frame catalogs stored alongside the scene.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Library {
    #[serde(default)]
    pub sprites: BTreeMap<String, FrameCatalog>,
}

/// How the background image fills the scene.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundMode {
    #[default]
    Stretch,
    Tile,
}

/// Grid display and snapping settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSettings {
    pub enabled: bool,
    pub size: f64,
    pub snap: bool,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self { enabled: true, size: DEFAULT_GRID_SIZE, snap: true }
    }
}

impl GridSettings {
    /// Round `value` to the nearest grid multiple. A non-positive size disables snapping.
    #[must_use]
    pub fn snap_value(&self, value: f64) -> f64 {
        if self.size <= 0.0 {
            return value;
        }
        (value / self.size).round() * self.size
    }
}

/// Scene-level metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub scene_name: String,
    pub width: f64,
    pub height: f64,
    pub background_color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_image: Option<String>,
    #[serde(default)]
    pub background_mode: BackgroundMode,
    #[serde(default)]
    pub grid: GridSettings,
}

impl Default for SceneMeta {
    fn default() -> Self {
        Self {
            version: Some("1.0".to_owned()),
            scene_name: "Unnamed".to_owned(),
            width: DEFAULT_SCENE_WIDTH,
            height: DEFAULT_SCENE_HEIGHT,
            background_color: "#333".to_owned(),
            background_image: None,
            background_mode: BackgroundMode::Stretch,
            grid: GridSettings::default(),
        }
    }
}

// =============================================================
// Objects
// =============================================================

/// Axis-aligned placement of a drawable object in scene pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Inclusive containment test.
    #[must_use]
    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x && px <= self.x + self.width && py >= self.y && py <= self.y + self.height
    }
}

/// A placeable entity in the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneObject {
    pub id: ObjectId,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<ObjectId>,
    #[serde(default)]
    pub z_index: i64,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub locked: bool,
    #[serde(flatten)]
    pub kind: ObjectKind,
}

/// Per-variant payload, tagged by the persisted `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ObjectKind {
    /// A single static image.
    #[serde(rename = "static")]
    Static(StaticImage),
    /// A frame-based sprite driven by an animation sequence.
    #[serde(rename = "sprite-anim")]
    SpriteAnim(SpriteAnim),
    /// A grouping node with no spatial presence.
    #[serde(rename = "folder")]
    Folder,
}

/// Payload of a static image object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticImage {
    pub asset: String,
    #[serde(flatten)]
    pub bounds: Bounds,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
}

/// Payload of a sprite animation object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpriteAnim {
    pub sprite_name: String,
    /// Animation whose settings the properties panel is editing.
    #[serde(default)]
    pub current_anim: String,
    #[serde(default)]
    pub anim_settings: BTreeMap<String, AnimSettings>,
    #[serde(default)]
    pub sequence: Vec<SequenceStep>,
    #[serde(flatten)]
    pub bounds: Bounds,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
}

/// Stored per-animation settings. Absent values fall back to defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fps: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_y: Option<f64>,
}

/// Animation settings with defaults applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedAnimSettings {
    pub fps: f64,
    pub step_x: f64,
    pub step_y: f64,
}

impl Default for ResolvedAnimSettings {
    fn default() -> Self {
        Self { fps: DEFAULT_FPS, step_x: 0.0, step_y: 0.0 }
    }
}

/// Names of the editable animation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimSetting {
    Fps,
    StepX,
    StepY,
}

impl std::str::FromStr for AnimSetting {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fps" => Ok(Self::Fps),
            "stepX" => Ok(Self::StepX),
            "stepY" => Ok(Self::StepY),
            other => Err(format!("unknown animation setting `{other}`")),
        }
    }
}

impl AnimSettings {
    /// Merge stored values over `default_fps` and zero steps. Non-positive fps falls back too.
    #[must_use]
    pub fn resolved(&self, default_fps: f64) -> ResolvedAnimSettings {
        ResolvedAnimSettings {
            fps: self.fps.filter(|f| f.is_finite() && *f > 0.0).unwrap_or(default_fps),
            step_x: self.step_x.unwrap_or(0.0),
            step_y: self.step_y.unwrap_or(0.0),
        }
    }

    /// Write one setting.
    pub fn set(&mut self, setting: AnimSetting, value: f64) {
        match setting {
            AnimSetting::Fps => self.fps = Some(value),
            AnimSetting::StepX => self.step_x = Some(value),
            AnimSetting::StepY => self.step_y = Some(value),
        }
    }
}

/// One entry in a sprite's animation script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceStep {
    pub anim: String,
    /// Frame ticks before advancing; 0 loops this step forever.
    #[serde(default, deserialize_with = "deserialize_limit")]
    pub limit: u32,
}

impl SequenceStep {
    #[must_use]
    pub fn new(anim: impl Into<String>, limit: u32) -> Self {
        Self { anim: anim.into(), limit }
    }
}

/// Accept a limit stored as a number or a numeric string; anything else is 0.
fn deserialize_limit<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let limit = match value {
        serde_json::Value::Number(n) => n.as_u64().or_else(|| n.as_f64().filter(|f| *f > 0.0).map(f64_to_u64)),
        serde_json::Value::String(s) => match s.trim().parse::<u64>() {
            Ok(n) => Some(n),
            Err(_) => None,
        },
        _ => None,
    };
    Ok(limit.map_or(0, |l| u32::try_from(l).unwrap_or(u32::MAX)))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn f64_to_u64(value: f64) -> u64 {
    value.trunc() as u64
}

fn default_true() -> bool {
    true
}

fn default_opacity() -> f64 {
    1.0
}

impl SceneObject {
    /// Build a static image object with a fresh id.
    #[must_use]
    pub fn new_static(name: impl Into<String>, asset: impl Into<String>, bounds: Bounds) -> Self {
        Self {
            id: new_object_id("obj"),
            name: name.into(),
            parent_id: None,
            z_index: 0,
            visible: true,
            locked: false,
            kind: ObjectKind::Static(StaticImage { asset: asset.into(), bounds, opacity: 1.0 }),
        }
    }

    /// Build a sprite animation object with a fresh id and an empty sequence.
    #[must_use]
    pub fn new_sprite(name: impl Into<String>, sprite_name: impl Into<String>, bounds: Bounds) -> Self {
        Self {
            id: new_object_id("obj"),
            name: name.into(),
            parent_id: None,
            z_index: 0,
            visible: true,
            locked: false,
            kind: ObjectKind::SpriteAnim(SpriteAnim {
                sprite_name: sprite_name.into(),
                current_anim: String::new(),
                anim_settings: BTreeMap::new(),
                sequence: Vec::new(),
                bounds,
                opacity: 1.0,
            }),
        }
    }

    /// Build a folder with a fresh id.
    #[must_use]
    pub fn new_folder(name: impl Into<String>) -> Self {
        Self {
            id: new_object_id("folder"),
            name: name.into(),
            parent_id: None,
            z_index: 0,
            visible: true,
            locked: false,
            kind: ObjectKind::Folder,
        }
    }

    #[must_use]
    pub fn is_folder(&self) -> bool {
        matches!(self.kind, ObjectKind::Folder)
    }

    /// Placement of drawable objects; `None` for folders.
    #[must_use]
    pub fn bounds(&self) -> Option<Bounds> {
        match &self.kind {
            ObjectKind::Static(s) => Some(s.bounds),
            ObjectKind::SpriteAnim(s) => Some(s.bounds),
            ObjectKind::Folder => None,
        }
    }

    /// Mutable placement of drawable objects; `None` for folders.
    pub fn bounds_mut(&mut self) -> Option<&mut Bounds> {
        match &mut self.kind {
            ObjectKind::Static(s) => Some(&mut s.bounds),
            ObjectKind::SpriteAnim(s) => Some(&mut s.bounds),
            ObjectKind::Folder => None,
        }
    }

    /// Opacity of drawable objects; folders report 1.0.
    #[must_use]
    pub fn opacity(&self) -> f64 {
        match &self.kind {
            ObjectKind::Static(s) => s.opacity,
            ObjectKind::SpriteAnim(s) => s.opacity,
            ObjectKind::Folder => 1.0,
        }
    }

    /// Set opacity (clamped to 0..=1). Returns false for folders.
    pub fn set_opacity(&mut self, opacity: f64) -> bool {
        let opacity = opacity.clamp(0.0, 1.0);
        match &mut self.kind {
            ObjectKind::Static(s) => s.opacity = opacity,
            ObjectKind::SpriteAnim(s) => s.opacity = opacity,
            ObjectKind::Folder => return false,
        }
        true
    }

    /// Whether pointer interaction (hit test, drag, resize) may target this object.
    #[must_use]
    pub fn is_interactive(&self) -> bool {
        self.visible && !self.locked && !self.is_folder()
    }

    /// Short lowercase label for the variant, matching the persisted `type`.
    #[must_use]
    pub fn type_label(&self) -> &'static str {
        match self.kind {
            ObjectKind::Static(_) => "static",
            ObjectKind::SpriteAnim(_) => "sprite-anim",
            ObjectKind::Folder => "folder",
        }
    }
}

// =============================================================
// Scene queries
// =============================================================

impl Scene {
    /// Return a reference to an object by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&SceneObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    /// Return a mutable reference to an object by id.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut SceneObject> {
        self.objects.iter_mut().find(|o| o.id == id)
    }

    /// Array position of an object.
    #[must_use]
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.objects.iter().position(|o| o.id == id)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.index_of(id).is_some()
    }

    /// Return `base` if no object uses it, otherwise the first free `base_N` (N = 1, 2, ...).
    #[must_use]
    pub fn unique_name(&self, base: &str) -> String {
        if !self.objects.iter().any(|o| o.name == base) {
            return base.to_owned();
        }
        (1..)
            .map(|n| format!("{base}_{n}"))
            .find(|candidate| !self.objects.iter().any(|o| &o.name == candidate))
            .unwrap_or_else(|| base.to_owned())
    }

    /// Direct children of `parent` (`None` = root) in array order.
    #[cfg(test)]
    #[must_use]
    pub fn children_of(&self, parent: Option<&str>) -> Vec<&SceneObject> {
        self.objects.iter().filter(|o| o.parent_id.as_deref() == parent).collect()
    }

    /// Whether `node` sits somewhere below `ancestor` by following `parent_id` links.
    ///
    /// The walk is bounded by the object count so a corrupt document with a
    /// cycle cannot loop forever.
    #[must_use]
    pub fn is_descendant(&self, ancestor: &str, node: &str) -> bool {
        let mut current = self.get(node).and_then(|o| o.parent_id.as_deref());
        let mut steps = 0;
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            steps += 1;
            if steps > self.objects.len() {
                return false;
            }
            current = self.get(parent).and_then(|o| o.parent_id.as_deref());
        }
        false
    }

    /// Objects in draw order: ascending `z_index`, ties kept in array order.
    #[must_use]
    pub fn draw_order(&self) -> Vec<&SceneObject> {
        let mut objs: Vec<&SceneObject> = self.objects.iter().collect();
        objs.sort_by_key(|o| o.z_index);
        objs
    }
}
