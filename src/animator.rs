//! Sprite animator: frame catalogs and the per-object sequencing state machine.
//!
//! Each `sprite-anim` object plays its `sequence` step by step. A step runs
//! its animation at that animation's fps; every fps tick increments
//! `step_frame_index`. A step with `limit > 0` ends once that many ticks have
//! elapsed: its displacement (`step * ticks`) is folded into the accumulated
//! offset and the next step starts. Wrapping past the last step zeroes the
//! accumulated offset. A step with `limit == 0` never ends on its own.
//!
//! Runtime state lives here, not in the document, and is reset whenever the
//! object's sequence or settings are edited.
//!
//! A step naming an animation that is absent from the sprite's catalog
//! stalls: it keeps counting ticks with that animation's settings (so a
//! limited step still completes) but draws nothing.

#[cfg(test)]
#[path = "animator_test.rs"]
mod animator_test;

use std::collections::HashMap;

use crate::doc::{FrameCatalog, Library, ObjectId, ObjectKind, Scene, SceneObject, SequenceStep, SpriteAnim};

// =============================================================
// Frame catalogs
// =============================================================

/// Load state of one sprite's frame catalog.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogSlot {
    Pending,
    Ready(FrameCatalog),
    Missing,
}

/// Session-wide cache of frame catalogs keyed by sprite name.
#[derive(Debug, Clone, Default)]
pub struct SpriteCatalogs {
    slots: HashMap<String, CatalogSlot>,
}

impl SpriteCatalogs {
    /// Mark `name` as requested. Returns true when the caller should fetch it.
    pub fn request(&mut self, name: &str) -> bool {
        if name.is_empty() || self.slots.contains_key(name) {
            return false;
        }
        self.slots.insert(name.to_owned(), CatalogSlot::Pending);
        true
    }

    pub fn insert(&mut self, name: &str, catalog: FrameCatalog) {
        self.slots.insert(name.to_owned(), CatalogSlot::Ready(catalog));
    }

    /// Record a failed fetch; the sprite stays undrawn and is not re-fetched.
    pub fn mark_missing(&mut self, name: &str) {
        log::warn!("sprite catalog missing: {name}");
        self.slots.insert(name.to_owned(), CatalogSlot::Missing);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FrameCatalog> {
        match self.slots.get(name) {
            Some(CatalogSlot::Ready(catalog)) => Some(catalog),
            _ => None,
        }
    }

    #[cfg(test)]
    #[must_use]
    pub fn is_known(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    /// Seed from catalogs embedded in a loaded scene. Already-ready entries win.
    pub fn seed_from_library(&mut self, library: &Library) {
        for (name, catalog) in &library.sprites {
            if self.get(name).is_none() {
                self.insert(name, catalog.clone());
            }
        }
    }
}

/// Path of one frame image under the sprite root.
#[must_use]
pub fn frame_path(sprite_root: &str, sprite: &str, anim: &str, frame: &str) -> String {
    format!("{}/{sprite}/{anim}/{frame}", sprite_root.trim_end_matches('/'))
}

/// Every frame path of a catalog, in animation then frame order.
#[must_use]
pub fn catalog_frame_paths(sprite_root: &str, sprite: &str, catalog: &FrameCatalog) -> Vec<String> {
    catalog
        .iter()
        .flat_map(|(anim, frames)| frames.iter().map(move |f| frame_path(sprite_root, sprite, anim, f)))
        .collect()
}

// =============================================================
// Runtime state
// =============================================================

/// Per-object playback state. Not persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AnimatorState {
    /// Seconds since the last frame tick.
    pub timer: f64,
    pub sequence_index: usize,
    /// Frame ticks elapsed in the current step.
    pub step_frame_index: u32,
    /// Displacement contributed by completed steps.
    pub acc_x: f64,
    pub acc_y: f64,
}

/// What to draw for a sprite object this frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FramePick {
    pub path: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Runtime state for every sprite object in the open scene.
#[derive(Debug, Clone, Default)]
pub struct Animator {
    states: HashMap<ObjectId, AnimatorState>,
}

impl Animator {
    /// Advance every sprite object by `dt` seconds.
    ///
    /// Objects whose catalog has not loaded, or whose sequence is empty, do
    /// not advance.
    pub fn update(&mut self, dt: f64, scene: &Scene, catalogs: &SpriteCatalogs, default_fps: f64) {
        for obj in &scene.objects {
            let ObjectKind::SpriteAnim(sprite) = &obj.kind else {
                continue;
            };
            let state = self.states.entry(obj.id.clone()).or_default();
            if catalogs.get(&sprite.sprite_name).is_none() || sprite.sequence.is_empty() {
                continue;
            }
            advance(state, sprite, dt, default_fps);
        }
    }

    /// Frame image and draw rectangle for `obj`, if anything should be drawn.
    #[must_use]
    pub fn frame_for(
        &self,
        obj: &SceneObject,
        catalogs: &SpriteCatalogs,
        sprite_root: &str,
        default_fps: f64,
    ) -> Option<FramePick> {
        let ObjectKind::SpriteAnim(sprite) = &obj.kind else {
            return None;
        };
        let catalog = catalogs.get(&sprite.sprite_name)?;
        let state = self.states.get(&obj.id).copied().unwrap_or_default();
        let step = active_step(sprite, &state)?;
        let frames = catalog.get(&step.anim).filter(|f| !f.is_empty())?;
        let frame = frames.get(usize::try_from(state.step_frame_index).unwrap_or(0) % frames.len())?;

        let settings = sprite.anim_settings.get(&step.anim).copied().unwrap_or_default().resolved(default_fps);
        let ticks = f64::from(state.step_frame_index);
        Some(FramePick {
            path: frame_path(sprite_root, &sprite.sprite_name, &step.anim, frame),
            x: sprite.bounds.x + state.acc_x + settings.step_x * ticks,
            y: sprite.bounds.y + state.acc_y + settings.step_y * ticks,
            width: sprite.bounds.width,
            height: sprite.bounds.height,
        })
    }

    #[must_use]
    pub fn state(&self, id: &str) -> Option<&AnimatorState> {
        self.states.get(id)
    }

    /// The sequence step currently playing for `obj`.
    #[must_use]
    pub fn current_step<'a>(&self, obj: &'a SceneObject) -> Option<&'a SequenceStep> {
        let ObjectKind::SpriteAnim(sprite) = &obj.kind else {
            return None;
        };
        let state = self.states.get(&obj.id).copied().unwrap_or_default();
        active_step(sprite, &state)
    }

    /// Restart playback of one object from the first step.
    pub fn reset(&mut self, id: &str) {
        if self.states.remove(id).is_some() {
            log::debug!("animator: reset {id}");
        }
    }

    pub fn clear(&mut self) {
        self.states.clear();
    }

    /// Drop state for objects no longer in `scene`.
    pub fn prune(&mut self, scene: &Scene) {
        self.states.retain(|id, _| scene.contains(id));
    }
}

fn active_step<'a>(sprite: &'a SpriteAnim, state: &AnimatorState) -> Option<&'a SequenceStep> {
    sprite.sequence.get(state.sequence_index).or_else(|| sprite.sequence.first())
}

fn advance(state: &mut AnimatorState, sprite: &SpriteAnim, dt: f64, default_fps: f64) {
    if state.sequence_index >= sprite.sequence.len() {
        *state = AnimatorState { timer: state.timer, ..AnimatorState::default() };
    }
    let Some(step) = sprite.sequence.get(state.sequence_index) else {
        return;
    };
    let settings = sprite.anim_settings.get(&step.anim).copied().unwrap_or_default().resolved(default_fps);

    state.timer += dt;
    if state.timer < 1.0 / settings.fps {
        return;
    }
    state.timer = 0.0;
    state.step_frame_index += 1;

    if step.limit > 0 && state.step_frame_index >= step.limit {
        let ticks = f64::from(state.step_frame_index);
        state.acc_x += settings.step_x * ticks;
        state.acc_y += settings.step_y * ticks;
        state.sequence_index += 1;
        state.step_frame_index = 0;
        if state.sequence_index >= sprite.sequence.len() {
            state.sequence_index = 0;
            state.acc_x = 0.0;
            state.acc_y = 0.0;
        }
    }
}
