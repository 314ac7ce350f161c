//! Rendering: draws the scene and selection overlay to a 2D context.
//!
//! This module is the only place that touches [`web_sys::CanvasRenderingContext2d`].
//! The canvas backing store is sized to the scene, so drawing happens in
//! scene pixels with an identity transform; zoom is applied through the
//! element's CSS size.
//!
//! All fallible `Canvas2D` calls propagate errors via `Result<(), JsValue>`.
//! The top-level caller ([`crate::engine::Engine::render`]) handles the result.

use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement};

use crate::camera::Camera;
use crate::doc::{BackgroundMode, ObjectKind, SceneMeta, SceneObject};
use crate::engine::EngineCore;
use crate::hit;
use crate::images::{AlphaSource, ImageCache, RasterImage};

/// Fill used for static objects whose image is not available.
const PLACEHOLDER_FILL: &str = "#666";

const GRID_STROKE: &str = "rgba(255, 255, 255, 0.2)";

const SELECTION_STROKE: &str = "#00FF00";
const SELECTION_LINE_WIDTH: f64 = 2.0;

const HANDLE_FILL: &str = "#fff";
const HANDLE_STROKE: &str = "#000";

// =============================================================
// Canvas setup
// =============================================================

/// The 2D context of `canvas`.
///
/// # Errors
///
/// Returns `Err` if the canvas has no 2D context.
pub fn context_2d(canvas: &HtmlCanvasElement) -> Result<CanvasRenderingContext2d, JsValue> {
    canvas
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("canvas has no 2d context"))?
        .dyn_into::<CanvasRenderingContext2d>()
        .map_err(JsValue::from)
}

/// Size the backing store to the scene and the CSS box to the zoomed scene.
///
/// # Errors
///
/// Returns `Err` if the element style cannot be written.
pub fn resize_canvas(canvas: &HtmlCanvasElement, scene_w: f64, scene_h: f64, camera: Camera) -> Result<(), JsValue> {
    let (w, h) = (to_px(scene_w), to_px(scene_h));
    if canvas.width() != w {
        canvas.set_width(w);
    }
    if canvas.height() != h {
        canvas.set_height(h);
    }
    let (css_w, css_h) = camera.css_size(scene_w, scene_h);
    let style = canvas.style();
    style.set_property("width", &format!("{css_w}px"))?;
    style.set_property("height", &format!("{css_h}px"))?;
    Ok(())
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_px(value: f64) -> u32 {
    if value.is_finite() { value.round().clamp(1.0, f64::from(u32::MAX)) as u32 } else { 1 }
}

// =============================================================
// Browser images
// =============================================================

/// A decoded browser image plus a copy of its pixels for alpha hit testing.
///
/// Pixels are unavailable for cross-origin images (the scratch canvas is
/// tainted); such images hit-test by bounding box.
pub struct WebImage {
    element: HtmlImageElement,
    pixels: Option<RasterImage>,
}

impl WebImage {
    /// Wrap a loaded `<img>` and capture its pixels.
    #[must_use]
    pub fn new(element: HtmlImageElement) -> Self {
        let (width, height) = (element.natural_width(), element.natural_height());
        let pixels = if width == 0 || height == 0 {
            None
        } else {
            match read_pixels(&element, width, height) {
                Ok(rgba) => RasterImage::new(width, height, rgba),
                Err(err) => {
                    log::debug!("no pixel data for {}: {err:?}", element.src());
                    None
                }
            }
        };
        Self { element, pixels }
    }

    #[must_use]
    pub fn element(&self) -> &HtmlImageElement {
        &self.element
    }
}

impl AlphaSource for WebImage {
    fn natural_size(&self) -> (u32, u32) {
        (self.element.natural_width(), self.element.natural_height())
    }

    fn alpha_at(&self, x: u32, y: u32) -> Option<u8> {
        self.pixels.as_ref().and_then(|p| p.alpha_at(x, y))
    }
}

fn read_pixels(element: &HtmlImageElement, width: u32, height: u32) -> Result<Vec<u8>, JsValue> {
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let scratch: HtmlCanvasElement = document.create_element("canvas")?.dyn_into()?;
    scratch.set_width(width);
    scratch.set_height(height);
    let ctx = context_2d(&scratch)?;
    ctx.draw_image_with_html_image_element(element, 0.0, 0.0)?;
    let data = ctx.get_image_data(0.0, 0.0, f64::from(width), f64::from(height))?;
    Ok(data.data().0)
}

// =============================================================
// Frame
// =============================================================

/// Draw the full frame: background, grid, objects, selection.
///
/// # Errors
///
/// Returns `Err` if any `Canvas2D` call fails.
pub fn draw(ctx: &CanvasRenderingContext2d, core: &EngineCore<WebImage>) -> Result<(), JsValue> {
    let meta = &core.scene.meta;
    ctx.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)?;
    ctx.set_global_alpha(1.0);
    ctx.clear_rect(0.0, 0.0, meta.width, meta.height);

    draw_background(ctx, meta, &core.images)?;
    if meta.grid.enabled {
        draw_grid(ctx, meta);
    }

    for obj in core.scene.draw_order() {
        if obj.visible {
            draw_object(ctx, core, obj)?;
        }
    }
    ctx.set_global_alpha(1.0);

    draw_selection(ctx, core);
    Ok(())
}

fn draw_background(
    ctx: &CanvasRenderingContext2d,
    meta: &SceneMeta,
    images: &ImageCache<WebImage>,
) -> Result<(), JsValue> {
    ctx.set_fill_style_str(&meta.background_color);
    ctx.fill_rect(0.0, 0.0, meta.width, meta.height);

    let Some(image) = meta.background_image.as_deref().and_then(|path| images.get(path)) else {
        return Ok(());
    };
    match meta.background_mode {
        BackgroundMode::Stretch => {
            ctx.draw_image_with_html_image_element_and_dw_and_dh(image.element(), 0.0, 0.0, meta.width, meta.height)?;
        }
        BackgroundMode::Tile => {
            if let Some(pattern) = ctx.create_pattern_with_html_image_element(image.element(), "repeat")? {
                ctx.set_fill_style_canvas_pattern(&pattern);
                ctx.fill_rect(0.0, 0.0, meta.width, meta.height);
            }
        }
    }
    Ok(())
}

fn draw_grid(ctx: &CanvasRenderingContext2d, meta: &SceneMeta) {
    let size = meta.grid.size;
    if !size.is_finite() || size <= 0.0 {
        return;
    }
    ctx.set_stroke_style_str(GRID_STROKE);
    ctx.set_line_width(1.0);
    ctx.begin_path();
    let mut x = 0.0;
    while x <= meta.width {
        ctx.move_to(x, 0.0);
        ctx.line_to(x, meta.height);
        x += size;
    }
    let mut y = 0.0;
    while y <= meta.height {
        ctx.move_to(0.0, y);
        ctx.line_to(meta.width, y);
        y += size;
    }
    ctx.stroke();
}

// =============================================================
// Objects
// =============================================================

fn draw_object(ctx: &CanvasRenderingContext2d, core: &EngineCore<WebImage>, obj: &SceneObject) -> Result<(), JsValue> {
    match &obj.kind {
        ObjectKind::Static(image) => {
            ctx.set_global_alpha(image.opacity);
            let b = image.bounds;
            match core.images.get(&image.asset) {
                Some(img) => ctx.draw_image_with_html_image_element_and_dw_and_dh(
                    img.element(),
                    b.x,
                    b.y,
                    b.width,
                    b.height,
                )?,
                None => {
                    ctx.set_fill_style_str(PLACEHOLDER_FILL);
                    ctx.fill_rect(b.x, b.y, b.width, b.height);
                }
            }
        }
        ObjectKind::SpriteAnim(sprite) => {
            let pick = core.animator.frame_for(obj, &core.sprites, &core.config.sprite_root, core.config.default_fps);
            if let Some(pick) = pick
                && let Some(img) = core.images.get(&pick.path)
            {
                ctx.set_global_alpha(sprite.opacity);
                ctx.draw_image_with_html_image_element_and_dw_and_dh(
                    img.element(),
                    pick.x,
                    pick.y,
                    pick.width,
                    pick.height,
                )?;
            }
        }
        ObjectKind::Folder => {}
    }
    Ok(())
}

// =============================================================
// Selection overlay
// =============================================================

fn draw_selection(ctx: &CanvasRenderingContext2d, core: &EngineCore<WebImage>) {
    let ids = core.selection.ids();
    let show_handles = ids.len() == 1;
    let zoom = core.camera.zoom();
    for obj in ids.iter().filter_map(|id| core.scene.get(id)) {
        let Some(b) = obj.bounds() else {
            continue;
        };
        ctx.set_stroke_style_str(SELECTION_STROKE);
        ctx.set_line_width(SELECTION_LINE_WIDTH);
        ctx.stroke_rect(b.x, b.y, b.width, b.height);

        if show_handles && !obj.locked {
            ctx.set_fill_style_str(HANDLE_FILL);
            ctx.set_stroke_style_str(HANDLE_STROKE);
            ctx.set_line_width(1.0);
            for (_, rect) in hit::handle_rects(b, zoom, core.config.handle_size_px) {
                ctx.fill_rect(rect.x, rect.y, rect.width, rect.height);
                ctx.stroke_rect(rect.x, rect.y, rect.width, rect.height);
            }
        }
    }
}
