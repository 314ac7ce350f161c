use std::mem;

use serde::Serialize;
use wasm_bindgen::JsValue;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use crate::animator::{Animator, SpriteCatalogs, catalog_frame_paths};
use crate::camera::{Camera, Point};
use crate::config::EditorConfig;
use crate::consts::{DUPLICATE_OFFSET, NEW_OBJECT_SIZE, NEW_OBJECT_Z, ZOOM_STEP};
use crate::doc::{
    AnimSettings, Bounds, FrameCatalog, ObjectId, ObjectKind, Scene, SceneMeta, SceneObject, SequenceStep,
    new_object_id,
};
use crate::error::EditorError;
use crate::hit::{self, Corner};
use crate::history::History;
use crate::images::{AlphaSource, ImageCache, RasterImage};
use crate::input::{DragOffset, InputState, Key, Modifiers};
use crate::properties::{self, Axis, Commit, ObjectField, PanelView, SceneField, SpriteEdit};
use crate::render::{self, WebImage};
use crate::selection::Selection;
use crate::tree::{self, DropTarget, DropZone, TreeRow, TreeState};

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

/// Actions returned from engine operations for the host to process.
///
/// Serialized for the page as `{"kind": "historyChanged", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Action {
    /// Redraw the canvas.
    RenderNeeded,
    /// Rebuild the treeview from [`EngineCore::tree_rows`].
    TreeChanged,
    /// Rebuild the properties panel from [`EngineCore::panel_view`].
    PropertiesChanged,
    HistoryChanged { can_undo: bool, can_redo: bool },
    /// The document's unsaved-changes state.
    TitleChanged { dirty: bool },
    /// The scene size changed; the canvas backing store must follow.
    SceneResized { width: f64, height: f64 },
    /// Zoom changed; `percent` is the toolbar readout.
    ZoomChanged { zoom: f64, percent: i64 },
    /// The host should measure its canvas area and call `fit_zoom`.
    FitZoomRequested,
    /// Fetch an image and report back via `image_loaded` / `image_failed`.
    LoadImage(String),
    /// Fetch a sprite frame catalog and report back via `catalog_loaded` / `catalog_failed`.
    LoadSpriteCatalog(String),
    /// Show a message to the user.
    ShowMessage(String),
    /// Ask the user whether to overwrite `path`, then save with overwrite.
    ConfirmOverwrite(String),
}

/// Identifies one scene load request. Only the most recent ticket is honored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    seq: u64,
    path: String,
}

impl LoadTicket {
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// The editor session: document, history, selection, and runtime caches.
///
/// Holds everything that doesn't depend on the canvas element so it can be
/// tested natively. `I` is the decoded image type; tests use [`RasterImage`].
pub struct EngineCore<I = RasterImage> {
    pub config: EditorConfig,
    pub scene: Scene,
    pub history: History,
    pub selection: Selection,
    pub camera: Camera,
    pub input: InputState,
    pub animator: Animator,
    pub images: ImageCache<I>,
    pub sprites: SpriteCatalogs,
    pub tree: TreeState,
    has_document: bool,
    current_path: Option<String>,
    playing: bool,
    aspect_locked: bool,
    load_seq: u64,
}

impl<I> Default for EngineCore<I> {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl<I> EngineCore<I> {
    #[must_use]
    pub fn new(config: EditorConfig) -> Self {
        let history = History::new(config.history_depth);
        Self {
            config,
            scene: Scene::default(),
            history,
            selection: Selection::default(),
            camera: Camera::default(),
            input: InputState::default(),
            animator: Animator::default(),
            images: ImageCache::default(),
            sprites: SpriteCatalogs::default(),
            tree: TreeState::default(),
            has_document: false,
            current_path: None,
            playing: false,
            aspect_locked: false,
            load_seq: 0,
        }
    }

    // --- Queries ---

    /// Whether a scene was ever created or loaded in this session.
    #[must_use]
    pub fn has_document(&self) -> bool {
        self.has_document
    }

    /// Path the document was loaded from or last saved to.
    #[must_use]
    pub fn current_path(&self) -> Option<&str> {
        self.current_path.as_deref()
    }

    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    #[must_use]
    pub fn aspect_locked(&self) -> bool {
        self.aspect_locked
    }

    #[must_use]
    pub fn object(&self, id: &str) -> Option<&SceneObject> {
        self.scene.get(id)
    }

    #[must_use]
    pub fn tree_rows(&self) -> Vec<TreeRow> {
        tree::rows(&self.scene, &self.selection, &self.tree)
    }

    #[must_use]
    pub fn panel_view(&self) -> PanelView {
        properties::view(&self.scene, &self.selection, self.aspect_locked, &self.sprites, self.config.default_fps)
    }

    /// Directory the asset browser should list: `requested`, or the
    /// configured asset root when the host passes none.
    #[must_use]
    pub fn asset_scan_path(&self, requested: &str) -> String {
        let requested = requested.trim();
        if requested.is_empty() { self.config.asset_root.clone() } else { requested.to_owned() }
    }

    // --- Scene lifecycle ---

    /// Replace the document with an empty default scene. Outstanding loads
    /// are discarded when they complete.
    pub fn new_scene(&mut self) -> Vec<Action> {
        log::info!("new scene");
        self.install(Scene::default(), None)
    }

    /// Start loading `path`. Any earlier outstanding load becomes stale.
    pub fn begin_load(&mut self, path: &str) -> LoadTicket {
        self.load_seq += 1;
        LoadTicket { seq: self.load_seq, path: path.to_owned() }
    }

    /// Apply the result of a load started with [`begin_load`](Self::begin_load).
    ///
    /// Results for superseded tickets are dropped. On failure the document is
    /// left untouched, except that a session with no document yet falls back
    /// to an empty scene.
    pub fn finish_load(&mut self, ticket: &LoadTicket, result: Result<Scene, EditorError>) -> Vec<Action> {
        if ticket.seq != self.load_seq {
            log::debug!("discarding stale load of {}", ticket.path);
            return Vec::new();
        }
        match result {
            Ok(scene) => {
                log::info!("loaded scene {}", ticket.path);
                self.install(scene, Some(ticket.path.clone()))
            }
            Err(err) => {
                log::warn!("failed to load {}: {err}", ticket.path);
                let mut actions = vec![Action::ShowMessage(format!("Error loading scene: {err}"))];
                if !self.has_document {
                    actions.extend(self.new_scene());
                }
                actions
            }
        }
    }

    /// Make `scene` the open document and reset per-document runtime state.
    /// The image cache is session-scoped and survives.
    ///
    /// Any load still in flight is superseded.
    fn install(&mut self, scene: Scene, path: Option<String>) -> Vec<Action> {
        self.load_seq += 1;
        self.scene = scene;
        self.current_path = path;
        self.has_document = true;
        self.sprites.seed_from_library(&self.scene.library);
        self.animator.clear();
        self.selection.select_scene();
        self.input = InputState::Idle;
        self.history.reset();

        let mut actions = self.refresh_all();
        actions.push(Action::FitZoomRequested);
        actions.push(Action::TitleChanged { dirty: false });
        actions.extend(self.asset_requests());
        actions
    }

    /// Resolve the target of a plain save: `explicit`, else the current path.
    /// `None` means the host must ask for a path (save-as).
    #[must_use]
    pub fn save_target(&self, explicit: Option<&str>) -> Option<String> {
        explicit.map(str::to_owned).or_else(|| self.current_path.clone())
    }

    /// Decide what a save-as to `path` needs once the host knows whether it exists.
    #[must_use]
    pub fn check_overwrite(&self, path: &str, exists: bool) -> Option<Action> {
        exists.then(|| Action::ConfirmOverwrite(path.to_owned()))
    }

    /// Name the scene after `path`'s file stem and serialize it for saving.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::Serialize`] if the document cannot be encoded.
    pub fn prepare_save(&mut self, path: &str) -> Result<String, EditorError> {
        self.scene.meta.scene_name = file_stem(path);
        Ok(serde_json::to_string_pretty(&self.scene)?)
    }

    /// Record the outcome of a save. `silent` suppresses the success message.
    pub fn finish_save(&mut self, path: &str, result: Result<String, EditorError>, silent: bool) -> Vec<Action> {
        match result {
            Ok(message) => {
                log::info!("saved scene {path}");
                self.current_path = Some(path.to_owned());
                self.history.mark_clean();
                let mut actions = vec![Action::TitleChanged { dirty: false }, Action::TreeChanged];
                if !silent {
                    actions.push(Action::ShowMessage(message));
                }
                actions
            }
            Err(err) => {
                log::warn!("failed to save {path}: {err}");
                vec![Action::ShowMessage(format!("Error saving scene: {err}"))]
            }
        }
    }

    // --- Assets ---

    /// Fetch requests for every asset the document references and hasn't requested yet.
    pub fn asset_requests(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();
        if let Some(bg) = &self.scene.meta.background_image {
            request_image(&mut self.images, bg, &mut actions);
        }
        for obj in &self.scene.objects {
            match &obj.kind {
                ObjectKind::Static(s) => request_image(&mut self.images, &s.asset, &mut actions),
                ObjectKind::SpriteAnim(s) => match self.sprites.get(&s.sprite_name) {
                    Some(catalog) => {
                        for path in catalog_frame_paths(&self.config.sprite_root, &s.sprite_name, catalog) {
                            request_image(&mut self.images, &path, &mut actions);
                        }
                    }
                    None => {
                        if self.sprites.request(&s.sprite_name) {
                            actions.push(Action::LoadSpriteCatalog(s.sprite_name.clone()));
                        }
                    }
                },
                ObjectKind::Folder => {}
            }
        }
        actions
    }

    pub fn image_loaded(&mut self, path: &str, image: I) -> Vec<Action> {
        self.images.insert_ready(path, image);
        vec![Action::RenderNeeded]
    }

    pub fn image_failed(&mut self, path: &str) -> Vec<Action> {
        self.images.mark_missing(path);
        vec![Action::RenderNeeded]
    }

    /// Store a fetched frame catalog and request its frame images.
    pub fn catalog_loaded(&mut self, name: &str, catalog: FrameCatalog) -> Vec<Action> {
        let mut actions = Vec::new();
        for path in catalog_frame_paths(&self.config.sprite_root, name, &catalog) {
            request_image(&mut self.images, &path, &mut actions);
        }
        self.sprites.insert(name, catalog);
        actions.push(Action::PropertiesChanged);
        actions.push(Action::RenderNeeded);
        actions
    }

    pub fn catalog_failed(&mut self, name: &str) -> Vec<Action> {
        self.sprites.mark_missing(name);
        vec![Action::RenderNeeded]
    }

    // --- Animation ---

    pub fn play(&mut self) {
        self.playing = true;
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    /// Per-frame update. Advances animations only while playing; always
    /// reports assets the next render will need.
    pub fn tick(&mut self, dt: f64) -> Vec<Action> {
        if !self.has_document {
            return Vec::new();
        }
        if self.playing && dt.is_finite() && dt > 0.0 {
            self.animator.update(dt, &self.scene, &self.sprites, self.config.default_fps);
        }
        let mut actions = Vec::new();
        for obj in self.scene.objects.iter().filter(|o| o.visible) {
            if let ObjectKind::SpriteAnim(s) = &obj.kind
                && self.sprites.request(&s.sprite_name)
            {
                actions.push(Action::LoadSpriteCatalog(s.sprite_name.clone()));
            }
            if let Some(pick) =
                self.animator.frame_for(obj, &self.sprites, &self.config.sprite_root, self.config.default_fps)
            {
                request_image(&mut self.images, &pick.path, &mut actions);
            }
        }
        actions
    }

    // --- History ---

    /// Snapshot the document before a mutation.
    fn snapshot(&mut self) -> Result<(), EditorError> {
        self.history.save_state(&self.scene)?;
        Ok(())
    }

    fn history_actions(&self) -> [Action; 2] {
        [
            Action::HistoryChanged { can_undo: self.history.can_undo(), can_redo: self.history.can_redo() },
            Action::TitleChanged { dirty: self.history.is_dirty() },
        ]
    }

    fn refresh_all(&self) -> Vec<Action> {
        let mut actions = vec![
            Action::RenderNeeded,
            Action::TreeChanged,
            Action::PropertiesChanged,
            Action::SceneResized { width: self.scene.meta.width, height: self.scene.meta.height },
        ];
        actions.extend(self.history_actions());
        actions
    }

    /// # Errors
    ///
    /// Returns [`EditorError::Serialize`] if a snapshot cannot be decoded.
    pub fn undo(&mut self) -> Result<Vec<Action>, EditorError> {
        let restored = self.history.undo(&self.scene)?;
        Ok(self.restore(restored))
    }

    /// # Errors
    ///
    /// Returns [`EditorError::Serialize`] if a snapshot cannot be decoded.
    pub fn redo(&mut self) -> Result<Vec<Action>, EditorError> {
        let restored = self.history.redo(&self.scene)?;
        Ok(self.restore(restored))
    }

    fn restore(&mut self, restored: Option<Scene>) -> Vec<Action> {
        let Some(scene) = restored else {
            return Vec::new();
        };
        self.scene = scene;
        self.input = InputState::Idle;
        self.selection.prune(&self.scene);
        self.animator.prune(&self.scene);
        self.history.mark_dirty();
        let mut actions = self.refresh_all();
        actions.extend(self.asset_requests());
        actions
    }

    // --- Selection ---

    /// Select the scene pseudo-object (scene properties button).
    pub fn select_scene(&mut self) -> Vec<Action> {
        self.selection.select_scene();
        vec![Action::PropertiesChanged, Action::TreeChanged, Action::RenderNeeded]
    }

    fn selection_changed() -> Vec<Action> {
        vec![Action::PropertiesChanged, Action::TreeChanged, Action::RenderNeeded]
    }

    // --- Adding content ---

    /// Add a static image centered in the scene, at its natural size if the
    /// image is already decoded, else 64x64.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::Serialize`] if the history snapshot fails.
    pub fn add_static(&mut self, asset: &str) -> Result<Vec<Action>, EditorError>
    where
        I: AlphaSource,
    {
        let (w, h) = self
            .images
            .get(asset)
            .map(AlphaSource::natural_size)
            .filter(|(w, h)| *w > 0 && *h > 0)
            .map_or((NEW_OBJECT_SIZE, NEW_OBJECT_SIZE), |(w, h)| (f64::from(w), f64::from(h)));
        let bounds = self.centered(w, h);
        self.add_static_at(asset, bounds)
    }

    /// Add a static image at explicit bounds.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::Serialize`] if the history snapshot fails.
    pub fn add_static_at(&mut self, asset: &str, bounds: Bounds) -> Result<Vec<Action>, EditorError> {
        let name = self.scene.unique_name(&file_stem(asset));
        let mut obj = SceneObject::new_static(name, asset, bounds);
        obj.z_index = NEW_OBJECT_Z;
        self.insert_new(obj)
    }

    /// Add a sprite whose frame catalog the host has fetched.
    ///
    /// The first animation becomes the current one and the only sequence
    /// step (looping forever); every animation gets default settings. The
    /// catalog is stored in the scene library and the session cache.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::Serialize`] if the history snapshot fails.
    pub fn add_sprite(&mut self, sprite_name: &str, catalog: FrameCatalog) -> Result<Vec<Action>, EditorError> {
        self.snapshot()?;
        let bounds = self.centered(NEW_OBJECT_SIZE, NEW_OBJECT_SIZE);
        let mut obj = SceneObject::new_sprite(self.scene.unique_name(sprite_name), sprite_name, bounds);
        obj.z_index = NEW_OBJECT_Z;
        if let ObjectKind::SpriteAnim(sprite) = &mut obj.kind {
            let defaults =
                AnimSettings { fps: Some(self.config.default_fps), step_x: Some(0.0), step_y: Some(0.0) };
            sprite.anim_settings = catalog.keys().map(|anim| (anim.clone(), defaults)).collect();
            if let Some(first) = catalog.keys().next() {
                sprite.current_anim.clone_from(first);
                sprite.sequence.push(SequenceStep::new(first.clone(), 0));
            }
        }
        self.scene.library.sprites.insert(sprite_name.to_owned(), catalog.clone());
        let mut actions = self.catalog_loaded(sprite_name, catalog);
        actions.extend(self.push_and_select(obj));
        Ok(actions)
    }

    /// Add a folder under the selected folder, or beside the selected object.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::Serialize`] if the history snapshot fails.
    pub fn add_folder(&mut self, name: &str) -> Result<Vec<Action>, EditorError> {
        let parent = self.selection.single().and_then(|id| self.scene.get(id)).and_then(|sel| {
            if sel.is_folder() { Some(sel.id.clone()) } else { sel.parent_id.clone() }
        });
        let mut folder = SceneObject::new_folder(self.scene.unique_name(name));
        folder.parent_id = parent;
        self.insert_new(folder)
    }

    fn insert_new(&mut self, obj: SceneObject) -> Result<Vec<Action>, EditorError> {
        self.snapshot()?;
        let mut actions = self.push_and_select(obj);
        actions.extend(self.asset_requests());
        Ok(actions)
    }

    fn push_and_select(&mut self, obj: SceneObject) -> Vec<Action> {
        log::debug!("added {} {}", obj.type_label(), obj.id);
        self.selection.select_only(obj.id.clone());
        self.scene.objects.push(obj);
        let mut actions = Self::selection_changed();
        actions.extend(self.history_actions());
        actions
    }

    fn centered(&self, w: f64, h: f64) -> Bounds {
        Bounds::new((self.scene.meta.width - w) / 2.0, (self.scene.meta.height - h) / 2.0, w, h)
    }

    // --- Duplicate / delete ---

    /// Clone every selected object with a fresh id, a `_copy` name and a
    /// (+20, +20) offset, then select the copies.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::Serialize`] if the history snapshot fails.
    pub fn duplicate_selected(&mut self) -> Result<Vec<Action>, EditorError> {
        if self.selection.ids().is_empty() {
            return Ok(Vec::new());
        }
        self.snapshot()?;
        let sources: Vec<SceneObject> =
            self.scene.objects.iter().filter(|o| self.selection.contains(&o.id)).cloned().collect();
        let mut new_ids = Vec::with_capacity(sources.len());
        for mut copy in sources {
            copy.id = new_object_id(if copy.is_folder() { "folder" } else { "obj" });
            copy.name = self.scene.unique_name(&format!("{}_copy", copy.name));
            if let Some(b) = copy.bounds_mut() {
                b.x += DUPLICATE_OFFSET;
                b.y += DUPLICATE_OFFSET;
            }
            new_ids.push(copy.id.clone());
            self.scene.objects.push(copy);
        }
        self.selection.select_many(new_ids);
        let mut actions = Self::selection_changed();
        actions.extend(self.history_actions());
        Ok(actions)
    }

    /// Delete every selected object. A deleted folder's direct children move
    /// to the folder's own parent; nothing is deleted recursively.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::Serialize`] if the history snapshot fails.
    pub fn delete_selected(&mut self) -> Result<Vec<Action>, EditorError> {
        let ids: Vec<ObjectId> = self.selection.ids().iter().filter(|id| self.scene.contains(id)).cloned().collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.snapshot()?;
        for id in &ids {
            let Some(idx) = self.scene.index_of(id) else {
                continue;
            };
            let removed = self.scene.objects.remove(idx);
            if removed.is_folder() {
                for child in self.scene.objects.iter_mut().filter(|o| o.parent_id.as_deref() == Some(id.as_str())) {
                    child.parent_id.clone_from(&removed.parent_id);
                }
            }
            log::debug!("deleted {} {}", removed.type_label(), removed.id);
        }
        self.selection.clear();
        self.animator.prune(&self.scene);
        let mut actions = Self::selection_changed();
        actions.extend(self.history_actions());
        Ok(actions)
    }

    // --- Pointer gesture ---

    /// Pointer pressed at canvas point `pt`.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::Serialize`] if the snapshot taken at resize start fails.
    pub fn pointer_down(&mut self, pt: Point, _modifiers: Modifiers) -> Result<Vec<Action>, EditorError> {
        if !self.has_document {
            return Ok(Vec::new());
        }
        if let Some((id, corner, orig)) = self.handle_under(pt) {
            self.snapshot()?;
            let ratio = if orig.height > 0.0 { orig.width / orig.height } else { 0.0 };
            self.input = InputState::Resizing { id, corner, start: pt, orig, ratio };
            return Ok(self.history_actions().to_vec());
        }
        if hit::over_any(&self.scene, self.selection.ids(), pt) {
            let offsets = self
                .selection
                .ids()
                .iter()
                .filter_map(|id| self.scene.get(id))
                .filter(|o| !o.locked)
                .filter_map(|o| {
                    o.bounds().map(|b| DragOffset {
                        id: o.id.clone(),
                        offset: Point::new(pt.x - b.x, pt.y - b.y),
                        origin: Point::new(b.x, b.y),
                    })
                })
                .collect();
            self.input = InputState::PotentialDrag { start: pt, offsets, moved: false };
        } else {
            self.input = InputState::PendingClick { start: pt, moved: false };
        }
        Ok(Vec::new())
    }

    /// Resize handle of the single selected, unlocked, drawable object under `pt`.
    fn handle_under(&self, pt: Point) -> Option<(ObjectId, Corner, Bounds)> {
        let obj = self.selection.single().and_then(|id| self.scene.get(id))?;
        if obj.locked {
            return None;
        }
        let bounds = obj.bounds()?;
        let corner = hit::hit_handle(bounds, pt, self.camera.zoom(), self.config.handle_size_px)?;
        Some((obj.id.clone(), corner, bounds))
    }

    /// Pointer moved to canvas point `pt` while pressed.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::Serialize`] if the snapshot taken at drag start fails.
    pub fn pointer_move(&mut self, pt: Point) -> Result<Vec<Action>, EditorError> {
        let threshold = self.config.drag_threshold_px;
        match &mut self.input {
            InputState::Idle => Ok(Vec::new()),
            InputState::PendingClick { start, moved } => {
                if start.distance_to(pt) > threshold {
                    *moved = true;
                }
                Ok(Vec::new())
            }
            InputState::Resizing { id, corner, start, orig, ratio } => {
                let next = hit::resize_bounds(
                    *orig,
                    *corner,
                    *start,
                    pt,
                    self.aspect_locked,
                    *ratio,
                    self.config.min_resize_px,
                );
                let Some(next) = next else {
                    return Ok(Vec::new());
                };
                let Some(bounds) = self.scene.get_mut(id).and_then(SceneObject::bounds_mut) else {
                    return Ok(Vec::new());
                };
                *bounds = next;
                Ok(vec![Action::RenderNeeded, Action::PropertiesChanged])
            }
            InputState::PotentialDrag { start, offsets, moved } => {
                if start.distance_to(pt) <= threshold {
                    return Ok(Vec::new());
                }
                if offsets.is_empty() {
                    *moved = true;
                    return Ok(Vec::new());
                }
                let (start, offsets) = (*start, mem::take(offsets));
                self.input = InputState::Dragging { start, offsets };
                self.snapshot()?;
                let mut actions = self.history_actions().to_vec();
                actions.extend(self.drag_to(pt));
                Ok(actions)
            }
            InputState::Dragging { .. } => Ok(self.drag_to(pt)),
        }
    }

    /// Move dragged objects so each keeps its offset from the pointer.
    ///
    /// With grid snap on, an axis the pointer has moved along snaps to the
    /// nearest grid multiple; an axis with no net pointer travel keeps its
    /// original coordinate.
    fn drag_to(&mut self, pt: Point) -> Vec<Action> {
        let InputState::Dragging { start, offsets } = &self.input else {
            return Vec::new();
        };
        let grid = self.scene.meta.grid;
        let (dx, dy) = (pt.x - start.x, pt.y - start.y);
        let mut moved = false;
        for drag in offsets {
            let Some(obj) = self.scene.objects.iter_mut().find(|o| o.id == drag.id) else {
                continue;
            };
            if obj.locked {
                continue;
            }
            let Some(bounds) = obj.bounds_mut() else {
                continue;
            };
            bounds.x = drag_axis(pt.x - drag.offset.x, drag.origin.x, dx, grid.snap, |v| grid.snap_value(v));
            bounds.y = drag_axis(pt.y - drag.offset.y, drag.origin.y, dy, grid.snap, |v| grid.snap_value(v));
            moved = true;
        }
        if moved { vec![Action::RenderNeeded, Action::PropertiesChanged] } else { Vec::new() }
    }

    /// Pointer released at canvas point `pt`. A press that never became a
    /// drag or resize is a click: pixel-accurate pick and selection update.
    pub fn pointer_up(&mut self, pt: Point, modifiers: Modifiers) -> Vec<Action>
    where
        I: AlphaSource,
    {
        match mem::take(&mut self.input) {
            InputState::PotentialDrag { moved: false, .. } | InputState::PendingClick { moved: false, .. } => {
                self.click_select(pt, modifiers)
            }
            InputState::Dragging { .. } | InputState::Resizing { .. } => {
                vec![Action::RenderNeeded, Action::PropertiesChanged]
            }
            InputState::PotentialDrag { moved: true, .. }
            | InputState::PendingClick { moved: true, .. }
            | InputState::Idle => Vec::new(),
        }
    }

    fn click_select(&mut self, pt: Point, modifiers: Modifiers) -> Vec<Action>
    where
        I: AlphaSource,
    {
        let hit = hit::pick_object(&self.scene, pt, &self.images, self.config.alpha_threshold).map(|o| o.id.clone());
        match hit {
            Some(id) if modifiers.is_multi() => self.selection.toggle(id),
            Some(id) => self.selection.select_only(id),
            None if modifiers.is_multi() => {}
            None => self.selection.clear(),
        }
        Self::selection_changed()
    }

    // --- Keyboard ---

    /// Editor shortcuts: undo, redo, duplicate, delete. Ignored while a drag
    /// or resize is in progress.
    ///
    /// # Errors
    ///
    /// Propagates errors from the triggered operation.
    pub fn key_down(&mut self, key: &Key, modifiers: Modifiers) -> Result<Vec<Action>, EditorError> {
        if self.input.is_manipulating() {
            return Ok(Vec::new());
        }
        if modifiers.is_command() {
            if key.is("z") {
                return if modifiers.shift { self.redo() } else { self.undo() };
            }
            if key.is("y") {
                return self.redo();
            }
            if key.is("d") {
                return self.duplicate_selected();
            }
            return Ok(Vec::new());
        }
        if key.is("Delete") || key.is("Backspace") {
            return self.delete_selected();
        }
        Ok(Vec::new())
    }

    // --- Zoom ---

    fn zoom_changed(&self) -> Vec<Action> {
        vec![Action::ZoomChanged { zoom: self.camera.zoom(), percent: self.camera.percent() }, Action::RenderNeeded]
    }

    pub fn zoom_in(&mut self) -> Vec<Action> {
        self.camera.set_zoom(self.camera.zoom() + ZOOM_STEP);
        self.zoom_changed()
    }

    pub fn zoom_out(&mut self) -> Vec<Action> {
        self.camera.set_zoom(self.camera.zoom() - ZOOM_STEP);
        self.zoom_changed()
    }

    /// Zoom from the toolbar percentage field. Non-numeric input is ignored.
    pub fn set_zoom_percent(&mut self, percent: f64) -> Vec<Action> {
        if !percent.is_finite() {
            return Vec::new();
        }
        self.camera.set_zoom(percent / 100.0);
        self.zoom_changed()
    }

    /// Fit the scene into an area `avail_w` x `avail_h` CSS pixels.
    pub fn fit_zoom(&mut self, avail_w: f64, avail_h: f64) -> Vec<Action> {
        self.camera.fit_to(avail_w, avail_h, self.scene.meta.width, self.scene.meta.height);
        self.zoom_changed()
    }

    // --- Properties panel ---

    pub fn toggle_aspect_lock(&mut self) -> Vec<Action> {
        self.aspect_locked = !self.aspect_locked;
        vec![Action::PropertiesChanged]
    }

    /// Snapshot once at the start of a continuous control gesture (slider).
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::Serialize`] if the snapshot fails.
    pub fn begin_continuous(&mut self) -> Result<Vec<Action>, EditorError> {
        self.snapshot()?;
        Ok(self.history_actions().to_vec())
    }

    /// Edit one field of the single selected object.
    ///
    /// # Errors
    ///
    /// [`EditorError::NotSingleSelection`] unless exactly one object is
    /// selected; validation errors from [`properties::apply_object_field`].
    /// The document is unchanged on error.
    pub fn set_object_field(&mut self, field: &ObjectField, commit: Commit) -> Result<Vec<Action>, EditorError> {
        let aspect_locked = self.aspect_locked;
        let mut actions = self.edit_selected(commit, |obj, meta| {
            properties::apply_object_field(obj, field, meta, aspect_locked)
        })?;
        if field.affects_tree() {
            actions.push(Action::TreeChanged);
        }
        Ok(actions)
    }

    /// Scale the selected object to fit the scene.
    ///
    /// # Errors
    ///
    /// See [`properties::fit_to_scene`].
    pub fn fit_selected_to_scene(&mut self) -> Result<Vec<Action>, EditorError> {
        self.edit_selected(Commit::Discrete, properties::fit_to_scene)
    }

    /// Edit the selected sprite's animation settings or sequence; restarts its playback.
    ///
    /// # Errors
    ///
    /// See [`properties::apply_sprite_edit`].
    pub fn sprite_edit(&mut self, edit: &SpriteEdit) -> Result<Vec<Action>, EditorError> {
        let actions = self.edit_selected(Commit::Discrete, |obj, _| properties::apply_sprite_edit(obj, edit))?;
        if let Some(id) = self.selection.single() {
            self.animator.reset(id);
        }
        Ok(actions)
    }

    /// Apply `edit` to a copy of the selected object; on success snapshot
    /// (for discrete commits) and swap the copy in.
    fn edit_selected<F>(&mut self, commit: Commit, edit: F) -> Result<Vec<Action>, EditorError>
    where
        F: FnOnce(&mut SceneObject, &SceneMeta) -> Result<(), EditorError>,
    {
        let id = self.selection.single().cloned().ok_or(EditorError::NotSingleSelection)?;
        let idx = self.scene.index_of(&id).ok_or_else(|| EditorError::UnknownObject(id.clone()))?;
        let mut edited = self.scene.objects[idx].clone();
        edit(&mut edited, &self.scene.meta)?;
        let mut actions = vec![Action::RenderNeeded];
        if commit == Commit::Discrete {
            self.snapshot()?;
            actions.push(Action::PropertiesChanged);
        }
        self.scene.objects[idx] = edited;
        actions.extend(self.history_actions());
        Ok(actions)
    }

    /// Set width or height of all selected objects as a percentage of the scene.
    ///
    /// # Errors
    ///
    /// [`EditorError::InvalidValue`] for a non-positive percentage.
    pub fn set_multi_size_pct(&mut self, axis: Axis, pct: f64) -> Result<Vec<Action>, EditorError> {
        if self.selection.ids().is_empty() {
            return Ok(Vec::new());
        }
        let mut edited = self.scene.clone();
        properties::set_multi_size_pct(&mut edited, self.selection.ids(), axis, pct)?;
        self.snapshot()?;
        self.scene = edited;
        let mut actions = vec![Action::RenderNeeded];
        actions.extend(self.history_actions());
        Ok(actions)
    }

    /// Edit scene metadata.
    ///
    /// # Errors
    ///
    /// Validation errors from [`properties::apply_scene_field`]; the scene is unchanged on error.
    pub fn set_scene_field(&mut self, field: &SceneField) -> Result<Vec<Action>, EditorError> {
        let mut meta = self.scene.meta.clone();
        properties::apply_scene_field(&mut meta, field)?;
        self.snapshot()?;
        self.scene.meta = meta;
        let mut actions = vec![Action::RenderNeeded, Action::PropertiesChanged];
        if field.resizes_canvas() {
            actions.push(Action::SceneResized { width: self.scene.meta.width, height: self.scene.meta.height });
        }
        match field {
            SceneField::SceneName(_) => actions.push(Action::TreeChanged),
            SceneField::BackgroundImage(_) => actions.extend(self.asset_requests()),
            _ => {}
        }
        actions.extend(self.history_actions());
        Ok(actions)
    }

    /// Apply a named resolution preset. `Custom` and unknown names do nothing.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::Serialize`] if the snapshot fails.
    pub fn apply_preset(&mut self, name: &str) -> Result<Vec<Action>, EditorError> {
        let Some(preset) = self.config.preset(name).filter(|p| !p.is_custom()) else {
            return Ok(Vec::new());
        };
        let (width, height) = (preset.width, preset.height);
        self.snapshot()?;
        self.scene.meta.width = width;
        self.scene.meta.height = height;
        let mut actions = vec![
            Action::RenderNeeded,
            Action::PropertiesChanged,
            Action::SceneResized { width, height },
            Action::FitZoomRequested,
        ];
        actions.extend(self.history_actions());
        Ok(actions)
    }

    // --- Treeview ---

    pub fn tree_click(&mut self, row_id: &str, modifiers: Modifiers) -> Vec<Action> {
        tree::click(&self.scene, &mut self.selection, row_id, modifiers);
        Self::selection_changed()
    }

    pub fn tree_toggle(&mut self, row_id: &str) -> Vec<Action> {
        self.tree.toggle(row_id);
        vec![Action::TreeChanged]
    }

    /// Drop the row `dragged` onto the row `target_row` in `zone`.
    ///
    /// # Errors
    ///
    /// [`EditorError::Tree`] if the move is invalid (the tree is unchanged).
    pub fn tree_drop(&mut self, dragged: &str, target_row: &str, zone: DropZone) -> Result<Vec<Action>, EditorError> {
        let target = DropTarget::from_row_id(target_row);
        tree::check_move(&self.scene, dragged, &target, zone)?;
        self.snapshot()?;
        tree::move_object(&mut self.scene, dragged, &target, zone)?;
        let mut actions = vec![Action::TreeChanged, Action::PropertiesChanged, Action::RenderNeeded];
        actions.extend(self.history_actions());
        Ok(actions)
    }
}

fn request_image<I>(images: &mut ImageCache<I>, path: &str, actions: &mut Vec<Action>) {
    if images.request(path) {
        actions.push(Action::LoadImage(path.to_owned()));
    }
}

fn drag_axis(raw: f64, origin: f64, delta: f64, snap: bool, snap_fn: impl Fn(f64) -> f64) -> f64 {
    if delta == 0.0 {
        origin
    } else if snap {
        snap_fn(raw)
    } else {
        raw
    }
}

/// Last path segment without a `.json` or image extension.
fn file_stem(path: &str) -> String {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_owned(),
        _ => name.to_owned(),
    }
}

/// The full editor engine. Wraps `EngineCore` and owns the browser canvas element.
pub struct Engine {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    pub core: EngineCore<WebImage>,
}

impl Engine {
    /// Bind to `canvas`.
    ///
    /// # Errors
    ///
    /// Returns an error if the canvas has no 2D context.
    pub fn new(canvas: HtmlCanvasElement, config: EditorConfig) -> Result<Self, JsValue> {
        let ctx = render::context_2d(&canvas)?;
        Ok(Self { canvas, ctx, core: EngineCore::new(config) })
    }

    /// Convert client coordinates of a pointer event to canvas coordinates.
    #[must_use]
    pub fn client_to_canvas(&self, client_x: f64, client_y: f64) -> Point {
        let rect = self.canvas.get_bounding_client_rect();
        self.core.camera.client_to_canvas(Point::new(client_x, client_y), Point::new(rect.left(), rect.top()))
    }

    /// Keep the canvas backing store at scene size and its CSS box at scene size times zoom.
    ///
    /// # Errors
    ///
    /// Returns an error if the element style cannot be written.
    pub fn sync_canvas_size(&self) -> Result<(), JsValue> {
        let meta = &self.core.scene.meta;
        render::resize_canvas(&self.canvas, meta.width, meta.height, self.core.camera)
    }

    /// Handle the actions that only touch the canvas element, pass the rest on.
    ///
    /// # Errors
    ///
    /// Returns an error if the canvas cannot be resized.
    pub fn absorb(&self, actions: Vec<Action>) -> Result<Vec<Action>, JsValue> {
        let mut rest = Vec::with_capacity(actions.len());
        for action in actions {
            match action {
                Action::SceneResized { .. } | Action::ZoomChanged { .. } => {
                    self.sync_canvas_size()?;
                    rest.push(action);
                }
                other => rest.push(other),
            }
        }
        Ok(rest)
    }

    /// Draw the current state to the canvas.
    ///
    /// # Errors
    ///
    /// Returns an error if a canvas drawing call throws.
    pub fn render(&self) -> Result<(), JsValue> {
        render::draw(&self.ctx, &self.core)
    }
}
