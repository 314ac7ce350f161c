//! Browser surface: the `#[wasm_bindgen]` API the host page drives.
//!
//! [`EditorApp`] owns the [`Engine`] and routes the [`Action`]s every
//! operation returns. Canvas-only actions are absorbed by the engine, asset
//! requests are fetched here, and everything else is forwarded to the
//! host's event callback as `{kind, data}` JSON.
//!
//! All access is single-threaded: async fetches resolve on the UI thread and
//! re-borrow the engine only after the await.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, future_to_promise, spawn_local};
use web_sys::{HtmlCanvasElement, HtmlImageElement};

use crate::config::EditorConfig;
use crate::doc::SceneObject;
use crate::engine::{Action, Engine};
use crate::error::EditorError;
use crate::input::{Key, Modifiers};
use crate::properties::{Axis, Commit, ObjectField, SceneField, SpriteEdit};
use crate::render::WebImage;
use crate::storage::StorageClient;
use crate::tree::{self, SCENE_ROW_ID};

/// Install the console logger and panic hook.
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    let level = if cfg!(debug_assertions) { log::Level::Debug } else { log::Level::Info };
    if console_log::init_with_level(level).is_err() {
        log::debug!("console logger already installed");
    }
}

struct Shared {
    engine: RefCell<Engine>,
    storage: StorageClient,
    host: js_sys::Function,
}

/// The scene editor as seen from JavaScript.
#[wasm_bindgen]
pub struct EditorApp {
    shared: Rc<Shared>,
}

#[wasm_bindgen]
impl EditorApp {
    /// Bind to `canvas`. `config_json` may be empty for defaults; `on_event`
    /// receives every host-facing action as a `{kind, data}` object.
    ///
    /// # Errors
    ///
    /// Invalid configuration, or a canvas without a 2D context.
    #[wasm_bindgen(constructor)]
    pub fn new(canvas: HtmlCanvasElement, config_json: &str, on_event: js_sys::Function) -> Result<EditorApp, JsValue> {
        let config = EditorConfig::from_json(config_json).map_err(to_js)?;
        let storage = StorageClient::new(config.endpoint.clone());
        let initial = config.initial_scene.clone();
        let engine = Engine::new(canvas, config)?;
        let shared = Rc::new(Shared { engine: RefCell::new(engine), storage, host: on_event });
        let app = EditorApp { shared };

        match initial {
            Some(path) => app.load(path),
            None => app.apply(|engine| engine.core.new_scene()),
        }
        start_frame_loop(Rc::clone(&app.shared))?;
        Ok(app)
    }

    // --- Documents ---

    #[wasm_bindgen(js_name = newScene)]
    pub fn new_scene(&self) {
        self.apply(|engine| engine.core.new_scene());
    }

    /// Load a scene. A later call supersedes an earlier one still in flight.
    pub fn load(&self, path: String) {
        let ticket = self.shared.engine.borrow_mut().core.begin_load(&path);
        let shared = Rc::clone(&self.shared);
        spawn_local(async move {
            let result = shared.storage.load_scene(&path).await.map_err(EditorError::from);
            let actions = shared.engine.borrow_mut().core.finish_load(&ticket, result);
            dispatch(&shared, actions);
        });
    }

    /// Save to the current path. Returns false when there is none and the
    /// host should ask for one (then call `saveAs`).
    pub fn save(&self) -> bool {
        let target = self.shared.engine.borrow().core.save_target(None);
        match target {
            Some(path) => {
                save_to(Rc::clone(&self.shared), path);
                true
            }
            None => false,
        }
    }

    /// Save to `path`. Unless `overwrite` is set, an existing file triggers
    /// a `confirmOverwrite` event instead.
    #[wasm_bindgen(js_name = saveAs)]
    pub fn save_as(&self, path: String, overwrite: bool) {
        if overwrite {
            save_to(Rc::clone(&self.shared), path);
            return;
        }
        let shared = Rc::clone(&self.shared);
        spawn_local(async move {
            let exists = match shared.storage.file_exists(&path).await {
                Ok(exists) => exists,
                Err(err) => {
                    log::warn!("exists check for {path} failed: {err}");
                    false
                }
            };
            let confirm = shared.engine.borrow().core.check_overwrite(&path, exists);
            match confirm {
                Some(action) => dispatch(&shared, vec![action]),
                None => save_to(shared, path),
            }
        });
    }

    /// Scene listing as JSON (`{folders, files, currentPath, parent}`).
    #[wasm_bindgen(js_name = listScenes)]
    pub fn list_scenes(&self, path: String) -> js_sys::Promise {
        let storage = self.shared.storage.clone();
        future_to_promise(async move {
            let listing = storage.list_scenes(&path).await.map_err(|e| to_js(e.into()))?;
            json_value(&listing)
        })
    }

    #[wasm_bindgen(js_name = createFolder)]
    pub fn create_folder(&self, path: String, name: String) -> js_sys::Promise {
        let storage = self.shared.storage.clone();
        future_to_promise(async move {
            storage.create_folder(&path, &name).await.map_err(|e| to_js(e.into()))?;
            Ok(JsValue::TRUE)
        })
    }

    /// Asset directory listing as JSON. An empty `path` lists the asset root.
    #[wasm_bindgen(js_name = scanAssets)]
    pub fn scan_assets(&self, path: &str) -> js_sys::Promise {
        let path = self.shared.engine.borrow().core.asset_scan_path(path);
        let storage = self.shared.storage.clone();
        future_to_promise(async move {
            let listing = storage.scan_assets(&path).await.map_err(|e| to_js(e.into()))?;
            json_value(&listing)
        })
    }

    /// Available sprite names as a JSON array.
    #[wasm_bindgen(js_name = spriteNames)]
    pub fn sprite_names(&self) -> js_sys::Promise {
        let storage = self.shared.storage.clone();
        future_to_promise(async move {
            let names = storage.sprite_names().await.map_err(|e| to_js(e.into()))?;
            json_value(&names)
        })
    }

    // --- Content ---

    /// # Errors
    ///
    /// Returns the error message if the operation fails.
    #[wasm_bindgen(js_name = addStatic)]
    pub fn add_static(&self, asset: &str) -> Result<(), JsValue> {
        self.run(|engine| engine.core.add_static(asset))
    }

    /// Add a sprite, fetching its frame catalog first if needed.
    #[wasm_bindgen(js_name = addSprite)]
    pub fn add_sprite(&self, name: String) {
        let cached = self.shared.engine.borrow().core.sprites.get(&name).cloned();
        if let Some(catalog) = cached {
            self.report(|engine| engine.core.add_sprite(&name, catalog));
            return;
        }
        let shared = Rc::clone(&self.shared);
        spawn_local(async move {
            let actions = match shared.storage.sprite_catalog(&name).await {
                Ok(catalog) => match shared.engine.borrow_mut().core.add_sprite(&name, catalog) {
                    Ok(actions) => actions,
                    Err(err) => vec![Action::ShowMessage(err.to_string())],
                },
                Err(err) => {
                    log::warn!("sprite catalog {name} failed: {err}");
                    vec![Action::ShowMessage(format!("Error loading sprite {name}: {err}"))]
                }
            };
            dispatch(&shared, actions);
        });
    }

    /// # Errors
    ///
    /// Returns the error message if the operation fails.
    #[wasm_bindgen(js_name = addFolder)]
    pub fn add_folder(&self, name: &str) -> Result<(), JsValue> {
        self.run(|engine| engine.core.add_folder(name))
    }

    /// # Errors
    ///
    /// Returns the error message if the operation fails.
    #[wasm_bindgen(js_name = duplicateSelected)]
    pub fn duplicate_selected(&self) -> Result<(), JsValue> {
        self.run(|engine| engine.core.duplicate_selected())
    }

    /// # Errors
    ///
    /// Returns the error message if the operation fails.
    #[wasm_bindgen(js_name = deleteSelected)]
    pub fn delete_selected(&self) -> Result<(), JsValue> {
        self.run(|engine| engine.core.delete_selected())
    }

    // --- History ---

    /// # Errors
    ///
    /// Returns the error message if a snapshot cannot be restored.
    pub fn undo(&self) -> Result<(), JsValue> {
        self.run(|engine| engine.core.undo())
    }

    /// # Errors
    ///
    /// Returns the error message if a snapshot cannot be restored.
    pub fn redo(&self) -> Result<(), JsValue> {
        self.run(|engine| engine.core.redo())
    }

    // --- Input ---

    /// # Errors
    ///
    /// Returns the error message if the gesture's snapshot fails.
    #[wasm_bindgen(js_name = pointerDown)]
    #[allow(clippy::fn_params_excessive_bools)]
    pub fn pointer_down(
        &self,
        client_x: f64,
        client_y: f64,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
    ) -> Result<(), JsValue> {
        let mods = Modifiers { shift, ctrl, alt, meta };
        self.run(|engine| {
            let pt = engine.client_to_canvas(client_x, client_y);
            engine.core.pointer_down(pt, mods)
        })
    }

    /// # Errors
    ///
    /// Returns the error message if the drag's snapshot fails.
    #[wasm_bindgen(js_name = pointerMove)]
    pub fn pointer_move(&self, client_x: f64, client_y: f64) -> Result<(), JsValue> {
        self.run(|engine| {
            let pt = engine.client_to_canvas(client_x, client_y);
            engine.core.pointer_move(pt)
        })
    }

    #[wasm_bindgen(js_name = pointerUp)]
    #[allow(clippy::fn_params_excessive_bools)]
    pub fn pointer_up(&self, client_x: f64, client_y: f64, shift: bool, ctrl: bool, alt: bool, meta: bool) {
        let mods = Modifiers { shift, ctrl, alt, meta };
        self.apply(|engine| {
            let pt = engine.client_to_canvas(client_x, client_y);
            engine.core.pointer_up(pt, mods)
        });
    }

    /// Handle an editor shortcut. Returns true when the key did something,
    /// so the host can suppress the browser default.
    ///
    /// # Errors
    ///
    /// Returns the error message if the triggered operation fails.
    #[wasm_bindgen(js_name = keyDown)]
    #[allow(clippy::fn_params_excessive_bools)]
    pub fn key_down(&self, key: String, shift: bool, ctrl: bool, alt: bool, meta: bool) -> Result<bool, JsValue> {
        let mods = Modifiers { shift, ctrl, alt, meta };
        let result = self.shared.engine.borrow_mut().core.key_down(&Key(key), mods);
        let actions = result.map_err(to_js)?;
        let handled = !actions.is_empty();
        dispatch(&self.shared, actions);
        Ok(handled)
    }

    // --- View ---

    #[wasm_bindgen(js_name = zoomIn)]
    pub fn zoom_in(&self) {
        self.apply(|engine| engine.core.zoom_in());
    }

    #[wasm_bindgen(js_name = zoomOut)]
    pub fn zoom_out(&self) {
        self.apply(|engine| engine.core.zoom_out());
    }

    #[wasm_bindgen(js_name = setZoomPercent)]
    pub fn set_zoom_percent(&self, percent: f64) {
        self.apply(|engine| engine.core.set_zoom_percent(percent));
    }

    /// Fit the scene into the host's canvas area (CSS pixels).
    #[wasm_bindgen(js_name = fitZoom)]
    pub fn fit_zoom(&self, avail_w: f64, avail_h: f64) {
        self.apply(|engine| engine.core.fit_zoom(avail_w, avail_h));
    }

    pub fn play(&self) {
        self.shared.engine.borrow_mut().core.play();
    }

    pub fn pause(&self) {
        self.shared.engine.borrow_mut().core.pause();
    }

    #[wasm_bindgen(js_name = isPlaying)]
    pub fn is_playing(&self) -> bool {
        self.shared.engine.borrow().core.is_playing()
    }

    // --- Treeview ---

    /// Current tree rows as JSON.
    ///
    /// # Errors
    ///
    /// Returns the error message if the rows cannot be serialized.
    #[wasm_bindgen(js_name = treeRows)]
    pub fn tree_rows(&self) -> Result<String, JsValue> {
        let rows = self.shared.engine.borrow().core.tree_rows();
        serde_json::to_string(&rows).map_err(|e| to_js(e.into()))
    }

    #[wasm_bindgen(js_name = treeClick)]
    #[allow(clippy::fn_params_excessive_bools)]
    pub fn tree_click(&self, row_id: &str, shift: bool, ctrl: bool, alt: bool, meta: bool) {
        let mods = Modifiers { shift, ctrl, alt, meta };
        self.apply(|engine| engine.core.tree_click(row_id, mods));
    }

    #[wasm_bindgen(js_name = treeToggle)]
    pub fn tree_toggle(&self, row_id: &str) {
        self.apply(|engine| engine.core.tree_toggle(row_id));
    }

    /// Drop `dragged` on the row `target`, `rel_y` pixels below the top of
    /// a row `row_height` tall.
    ///
    /// # Errors
    ///
    /// Returns the error message if the move is invalid.
    #[wasm_bindgen(js_name = treeDrop)]
    pub fn tree_drop(&self, dragged: &str, target: &str, rel_y: f64, row_height: f64) -> Result<(), JsValue> {
        self.run(|engine| {
            let is_container = target == SCENE_ROW_ID || engine.core.object(target).is_some_and(SceneObject::is_folder);
            let zone = tree::zone_for(rel_y, row_height, is_container);
            engine.core.tree_drop(dragged, target, zone)
        })
    }

    // --- Properties ---

    /// Properties panel view model as JSON.
    ///
    /// # Errors
    ///
    /// Returns the error message if the view cannot be serialized.
    #[wasm_bindgen(js_name = panelView)]
    pub fn panel_view(&self) -> Result<String, JsValue> {
        let view = self.shared.engine.borrow().core.panel_view();
        serde_json::to_string(&view).map_err(|e| to_js(e.into()))
    }

    /// Resolution presets as JSON.
    ///
    /// # Errors
    ///
    /// Returns the error message if the presets cannot be serialized.
    #[wasm_bindgen(js_name = resolutionPresets)]
    pub fn resolution_presets(&self) -> Result<String, JsValue> {
        let engine = self.shared.engine.borrow();
        serde_json::to_string(&engine.core.config.resolution_presets).map_err(|e| to_js(e.into()))
    }

    #[wasm_bindgen(js_name = selectScene)]
    pub fn select_scene(&self) {
        self.apply(|engine| engine.core.select_scene());
    }

    #[wasm_bindgen(js_name = toggleAspectLock)]
    pub fn toggle_aspect_lock(&self) {
        self.apply(|engine| engine.core.toggle_aspect_lock());
    }

    /// Call when a slider drag starts; its edits then commit as continuous.
    ///
    /// # Errors
    ///
    /// Returns the error message if the snapshot fails.
    #[wasm_bindgen(js_name = beginContinuous)]
    pub fn begin_continuous(&self) -> Result<(), JsValue> {
        self.run(|engine| engine.core.begin_continuous())
    }

    /// Apply `{"field": ..., "value": ...}` to the selected object.
    ///
    /// # Errors
    ///
    /// Returns the error message for malformed or rejected values.
    #[wasm_bindgen(js_name = setObjectField)]
    pub fn set_object_field(&self, json: &str, continuous: bool) -> Result<(), JsValue> {
        let field: ObjectField = parse_payload(json)?;
        let commit = if continuous { Commit::Continuous } else { Commit::Discrete };
        self.run(|engine| engine.core.set_object_field(&field, commit))
    }

    /// # Errors
    ///
    /// Returns the error message for malformed or rejected values.
    #[wasm_bindgen(js_name = setSceneField)]
    pub fn set_scene_field(&self, json: &str) -> Result<(), JsValue> {
        let field: SceneField = parse_payload(json)?;
        self.run(|engine| engine.core.set_scene_field(&field))
    }

    /// # Errors
    ///
    /// Returns the error message if the snapshot fails.
    #[wasm_bindgen(js_name = applyPreset)]
    pub fn apply_preset(&self, name: &str) -> Result<(), JsValue> {
        self.run(|engine| engine.core.apply_preset(name))
    }

    /// # Errors
    ///
    /// Returns the error message if no single drawable object is selected.
    #[wasm_bindgen(js_name = fitSelectedToScene)]
    pub fn fit_selected_to_scene(&self) -> Result<(), JsValue> {
        self.run(|engine| engine.core.fit_selected_to_scene())
    }

    /// Set `"width"` or `"height"` of every selected object as a scene percentage.
    ///
    /// # Errors
    ///
    /// Returns the error message for an unknown axis or a rejected value.
    #[wasm_bindgen(js_name = setMultiSizePct)]
    pub fn set_multi_size_pct(&self, axis: &str, pct: f64) -> Result<(), JsValue> {
        let axis = match axis {
            "width" => Axis::Width,
            "height" => Axis::Height,
            other => return Err(JsValue::from_str(&format!("unknown axis: {other}"))),
        };
        self.run(|engine| engine.core.set_multi_size_pct(axis, pct))
    }

    /// Apply a sprite edit such as `{"edit": "addStep", "anim": "walk", "limit": 4}`.
    ///
    /// # Errors
    ///
    /// Returns the error message for malformed or rejected edits.
    #[wasm_bindgen(js_name = spriteEdit)]
    pub fn sprite_edit(&self, json: &str) -> Result<(), JsValue> {
        let edit: SpriteEdit = parse_payload(json)?;
        self.run(|engine| engine.core.sprite_edit(&edit))
    }
}

impl EditorApp {
    /// Run an infallible operation and route its actions.
    fn apply<F>(&self, op: F)
    where
        F: FnOnce(&mut Engine) -> Vec<Action>,
    {
        let actions = op(&mut *self.shared.engine.borrow_mut());
        dispatch(&self.shared, actions);
    }

    /// Run a fallible operation; errors go back to the caller.
    fn run<F>(&self, op: F) -> Result<(), JsValue>
    where
        F: FnOnce(&mut Engine) -> Result<Vec<Action>, EditorError>,
    {
        let result = op(&mut *self.shared.engine.borrow_mut());
        match result {
            Ok(actions) => {
                dispatch(&self.shared, actions);
                Ok(())
            }
            Err(err) => {
                log::warn!("{err}");
                Err(to_js(err))
            }
        }
    }

    /// Run a fallible operation; errors are shown to the user.
    fn report<F>(&self, op: F)
    where
        F: FnOnce(&mut Engine) -> Result<Vec<Action>, EditorError>,
    {
        let result = op(&mut *self.shared.engine.borrow_mut());
        let actions = result.unwrap_or_else(|err| vec![Action::ShowMessage(err.to_string())]);
        dispatch(&self.shared, actions);
    }
}

// =============================================================
// Action routing
// =============================================================

fn dispatch(shared: &Rc<Shared>, actions: Vec<Action>) {
    let absorbed = shared.engine.borrow().absorb(actions);
    let actions = match absorbed {
        Ok(actions) => actions,
        Err(err) => {
            log::warn!("canvas resize failed: {err:?}");
            return;
        }
    };
    let mut render = false;
    for action in actions {
        match action {
            Action::RenderNeeded => render = true,
            Action::LoadImage(path) => load_image(shared, path),
            Action::LoadSpriteCatalog(name) => load_catalog(shared, name),
            other => notify_host(shared, &other),
        }
    }
    if render {
        render_now(shared);
    }
}

fn notify_host(shared: &Shared, action: &Action) {
    let payload = serde_json::to_string(action)
        .map_err(|e| JsValue::from_str(&e.to_string()))
        .and_then(|json| js_sys::JSON::parse(&json));
    let result = payload.and_then(|value| shared.host.call1(&JsValue::NULL, &value));
    if let Err(err) = result {
        log::warn!("host event handler failed: {err:?}");
    }
}

fn render_now(shared: &Shared) {
    if let Err(err) = shared.engine.borrow().render() {
        log::warn!("render failed: {err:?}");
    }
}

fn load_image(shared: &Rc<Shared>, path: String) {
    let shared = Rc::clone(shared);
    spawn_local(async move {
        let loaded = fetch_image(&path).await;
        let actions = match loaded {
            Ok(element) => shared.engine.borrow_mut().core.image_loaded(&path, WebImage::new(element)),
            Err(err) => {
                log::warn!("image {path} failed to load: {err:?}");
                shared.engine.borrow_mut().core.image_failed(&path)
            }
        };
        dispatch(&shared, actions);
    });
}

async fn fetch_image(path: &str) -> Result<HtmlImageElement, JsValue> {
    let element = HtmlImageElement::new()?;
    element.set_src(path);
    JsFuture::from(element.decode()).await?;
    Ok(element)
}

fn load_catalog(shared: &Rc<Shared>, name: String) {
    let shared = Rc::clone(shared);
    spawn_local(async move {
        let fetched = shared.storage.sprite_catalog(&name).await;
        let actions = match fetched {
            Ok(catalog) => shared.engine.borrow_mut().core.catalog_loaded(&name, catalog),
            Err(err) => {
                log::warn!("sprite catalog {name} failed: {err}");
                shared.engine.borrow_mut().core.catalog_failed(&name)
            }
        };
        dispatch(&shared, actions);
    });
}

fn save_to(shared: Rc<Shared>, path: String) {
    spawn_local(async move {
        let prepared = shared.engine.borrow_mut().core.prepare_save(&path);
        let result = match prepared {
            Ok(json) => shared.storage.save_scene(&path, json).await.map_err(EditorError::from),
            Err(err) => Err(err),
        };
        let actions = shared.engine.borrow_mut().core.finish_save(&path, result, false);
        dispatch(&shared, actions);
    });
}

// =============================================================
// Frame loop
// =============================================================

type FrameCallback = Closure<dyn FnMut(f64)>;

/// Tick and redraw once per display refresh for the lifetime of the page.
fn start_frame_loop(shared: Rc<Shared>) -> Result<(), JsValue> {
    let slot: Rc<RefCell<Option<FrameCallback>>> = Rc::new(RefCell::new(None));
    let next = Rc::clone(&slot);
    let mut last: Option<f64> = None;

    *slot.borrow_mut() = Some(Closure::new(move |now: f64| {
        let dt = last.map_or(0.0, |prev| (now - prev) / 1000.0);
        last = Some(now);
        let actions = shared.engine.borrow_mut().core.tick(dt);
        dispatch(&shared, actions);
        render_now(&shared);
        if let Some(callback) = next.borrow().as_ref()
            && let Err(err) = request_frame(callback)
        {
            log::warn!("frame loop stopped: {err:?}");
        }
    }));

    if let Some(callback) = slot.borrow().as_ref() {
        request_frame(callback)?;
    }
    Ok(())
}

fn request_frame(callback: &FrameCallback) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    window.request_animation_frame(callback.as_ref().unchecked_ref())?;
    Ok(())
}

// =============================================================
// Conversions
// =============================================================

fn to_js(err: EditorError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn json_value<T: serde::Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_json::to_string(value).map(|json| JsValue::from_str(&json)).map_err(|e| to_js(e.into()))
}

fn parse_payload<T: serde::de::DeserializeOwned>(json: &str) -> Result<T, JsValue> {
    serde_json::from_str(json).map_err(|e| {
        to_js(EditorError::InvalidValue { field: "payload", reason: e.to_string() })
    })
}
