//! Hit testing: resize handles, bounding boxes, and pixel-alpha picking.
//!
//! All coordinates here are canvas (scene) pixels. Handle geometry is scaled
//! by `1 / zoom` so handles keep a constant size on screen.

#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use crate::camera::Point;
use crate::doc::{Bounds, ObjectKind, Scene, SceneObject};
use crate::images::{AlphaSource, ImageCache};

/// A corner resize handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    Tl,
    Tr,
    Bl,
    Br,
}

impl Corner {
    pub const ALL: [Corner; 4] = [Corner::Tl, Corner::Tr, Corner::Bl, Corner::Br];

    fn is_left(self) -> bool {
        matches!(self, Self::Tl | Self::Bl)
    }

    fn is_top(self) -> bool {
        matches!(self, Self::Tl | Self::Tr)
    }
}

/// Canvas-space square of the handle at `corner`, `size` already divided by zoom.
#[must_use]
pub fn handle_rect(bounds: Bounds, corner: Corner, size: f64) -> Bounds {
    let half = size / 2.0;
    let cx = if corner.is_left() { bounds.x } else { bounds.x + bounds.width };
    let cy = if corner.is_top() { bounds.y } else { bounds.y + bounds.height };
    Bounds::new(cx - half, cy - half, size, size)
}

/// All four handle squares for an object drawn at `zoom` with `handle_px` screen size.
#[must_use]
pub fn handle_rects(bounds: Bounds, zoom: f64, handle_px: f64) -> [(Corner, Bounds); 4] {
    let size = handle_px / zoom;
    Corner::ALL.map(|corner| (corner, handle_rect(bounds, corner, size)))
}

/// First handle containing `pt`, in `Corner::ALL` order.
#[must_use]
pub fn hit_handle(bounds: Bounds, pt: Point, zoom: f64, handle_px: f64) -> Option<Corner> {
    handle_rects(bounds, zoom, handle_px)
        .into_iter()
        .find(|(_, rect)| rect.contains(pt.x, pt.y))
        .map(|(corner, _)| corner)
}

/// Whether `pt` hits a visible pixel of `obj`.
///
/// Bounding-box reject first. Static objects with a decoded image then map
/// the point into texture space and sample one texel's alpha; everything
/// else (sprites, images still loading or missing) counts as a hit anywhere
/// inside the box.
#[must_use]
pub fn pixel_hit<I: AlphaSource>(obj: &SceneObject, pt: Point, images: &ImageCache<I>, threshold: u8) -> bool {
    let Some(bounds) = obj.bounds() else {
        return false;
    };
    if !bounds.contains(pt.x, pt.y) {
        return false;
    }
    let ObjectKind::Static(image) = &obj.kind else {
        return true;
    };
    let Some(source) = images.get(&image.asset) else {
        return true;
    };
    let (nat_w, nat_h) = source.natural_size();
    if nat_w == 0 || nat_h == 0 || bounds.width <= 0.0 || bounds.height <= 0.0 {
        return true;
    }
    let tx = texel(pt.x - bounds.x, bounds.width, nat_w);
    let ty = texel(pt.y - bounds.y, bounds.height, nat_h);
    match source.alpha_at(tx, ty) {
        Some(alpha) => alpha > threshold,
        None => true,
    }
}

/// `floor(rel / extent * natural)`, clamped into `0..natural`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn texel(rel: f64, extent: f64, natural: u32) -> u32 {
    let raw = (rel / extent * f64::from(natural)).floor();
    raw.clamp(0.0, f64::from(natural - 1)) as u32
}

/// Topmost interactive object with a visible pixel under `pt`.
///
/// Candidates are visible, unlocked, non-folder objects tested by descending
/// `z_index`; on ties the later array entry (drawn on top) goes first.
#[must_use]
pub fn pick_object<'a, I: AlphaSource>(
    scene: &'a Scene,
    pt: Point,
    images: &ImageCache<I>,
    threshold: u8,
) -> Option<&'a SceneObject> {
    let mut candidates: Vec<(usize, &SceneObject)> =
        scene.objects.iter().enumerate().filter(|(_, o)| o.is_interactive()).collect();
    candidates.sort_by(|(ia, a), (ib, b)| b.z_index.cmp(&a.z_index).then(ib.cmp(ia)));
    candidates.into_iter().map(|(_, o)| o).find(|o| pixel_hit(o, pt, images, threshold))
}

/// Whether `pt` lies inside the bounding box of any of `ids`.
#[must_use]
pub fn over_any(scene: &Scene, ids: &[String], pt: Point) -> bool {
    ids.iter()
        .filter_map(|id| scene.get(id).and_then(SceneObject::bounds))
        .any(|b| b.contains(pt.x, pt.y))
}

/// Bounds for a resize gesture dragged from `start` to `current` on `corner`.
///
/// With `aspect_locked` the height follows the width through `ratio`
/// (orig width / orig height) and only horizontal pointer motion counts.
/// Returns `None` when the result would be smaller than `min_size` on
/// either axis, so the caller keeps the last valid frame.
#[must_use]
pub fn resize_bounds(
    orig: Bounds,
    corner: Corner,
    start: Point,
    current: Point,
    aspect_locked: bool,
    ratio: f64,
    min_size: f64,
) -> Option<Bounds> {
    let dx = current.x - start.x;
    let dy = current.y - start.y;
    let locked = aspect_locked && ratio.is_finite() && ratio > 0.0;

    let (x, width) = if corner.is_left() { (orig.x + dx, orig.width - dx) } else { (orig.x, orig.width + dx) };
    let height = if locked {
        width / ratio
    } else if corner.is_top() {
        orig.height - dy
    } else {
        orig.height + dy
    };
    let y = if !corner.is_top() {
        orig.y
    } else if locked {
        orig.y - (height - orig.height)
    } else {
        orig.y + dy
    };

    (width >= min_size && height >= min_size).then_some(Bounds::new(x, y, width, height))
}
