//! Session-scoped image cache and the alpha-sampling seam used by hit testing.
//!
//! Images are keyed by asset path and requested at most once per session.
//! A failed load stores a `Missing` sentinel so the renderer and hit tester
//! can degrade (placeholder rectangle, bounding-box hit) without triggering
//! another fetch. The cache is never cleared, not even when a new scene loads.

#[cfg(test)]
#[path = "images_test.rs"]
mod images_test;

use std::collections::HashMap;

/// Pixel access needed for alpha hit testing.
///
/// Browser images implement this through a scratch canvas; tests use
/// [`RasterImage`].
pub trait AlphaSource {
    /// Natural (intrinsic) pixel size of the image.
    fn natural_size(&self) -> (u32, u32);

    /// Alpha (0-255) of the texel at `(x, y)`. `None` if the pixel cannot be read.
    fn alpha_at(&self, x: u32, y: u32) -> Option<u8>;
}

/// State of one cached path.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSlot<I> {
    /// A fetch was issued and has not resolved.
    Pending,
    /// The image decoded successfully.
    Ready(I),
    /// The fetch failed; never retried.
    Missing,
}

/// Image cache keyed by asset path.
#[derive(Debug, Clone)]
pub struct ImageCache<I> {
    slots: HashMap<String, ImageSlot<I>>,
}

impl<I> Default for ImageCache<I> {
    fn default() -> Self {
        Self { slots: HashMap::new() }
    }
}

impl<I> ImageCache<I> {
    /// Mark `path` as requested. Returns true only the first time, i.e. when
    /// the caller should actually start a fetch.
    pub fn request(&mut self, path: &str) -> bool {
        if path.is_empty() || self.slots.contains_key(path) {
            return false;
        }
        self.slots.insert(path.to_owned(), ImageSlot::Pending);
        true
    }

    /// Store a successfully decoded image.
    pub fn insert_ready(&mut self, path: &str, image: I) {
        self.slots.insert(path.to_owned(), ImageSlot::Ready(image));
    }

    /// Record a failed load.
    pub fn mark_missing(&mut self, path: &str) {
        log::warn!("image missing: {path}");
        self.slots.insert(path.to_owned(), ImageSlot::Missing);
    }

    /// The decoded image, if ready.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&I> {
        match self.slots.get(path) {
            Some(ImageSlot::Ready(image)) => Some(image),
            _ => None,
        }
    }

    #[cfg(test)]
    #[must_use]
    pub fn slot(&self, path: &str) -> Option<&ImageSlot<I>> {
        self.slots.get(path)
    }

    #[cfg(test)]
    #[must_use]
    pub fn is_missing(&self, path: &str) -> bool {
        matches!(self.slots.get(path), Some(ImageSlot::Missing))
    }

    #[cfg(test)]
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[cfg(test)]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// In-memory RGBA bitmap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl RasterImage {
    /// Wrap raw RGBA bytes. Returns `None` when the buffer length does not match.
    #[must_use]
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> Option<Self> {
        let expected = usize::try_from(u64::from(width) * u64::from(height) * 4).unwrap_or(usize::MAX);
        (rgba.len() == expected).then_some(Self { width, height, rgba })
    }

    /// A bitmap where every pixel has the given alpha.
    #[must_use]
    pub fn filled(width: u32, height: u32, alpha: u8) -> Self {
        let pixels = usize::try_from(u64::from(width) * u64::from(height)).unwrap_or(0);
        let rgba = std::iter::repeat_n([0, 0, 0, alpha], pixels).flatten().collect();
        Self { width, height, rgba }
    }

    /// Overwrite the alpha of one pixel. Out-of-range coordinates are ignored.
    pub fn set_alpha(&mut self, x: u32, y: u32, alpha: u8) {
        if let Some(slot) = self.alpha_index(x, y).and_then(|idx| self.rgba.get_mut(idx)) {
            *slot = alpha;
        }
    }

    fn alpha_index(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (u64::from(y) * u64::from(self.width) + u64::from(x)) * 4 + 3;
        match usize::try_from(idx) {
            Ok(idx) => Some(idx),
            Err(_) => None,
        }
    }
}

impl AlphaSource for RasterImage {
    fn natural_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn alpha_at(&self, x: u32, y: u32) -> Option<u8> {
        self.alpha_index(x, y).and_then(|idx| self.rgba.get(idx).copied())
    }
}
