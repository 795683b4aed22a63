//! Decoded images keyed by manifest name.
//!
//! Images are decoded once on a loader thread and then shared read-only via
//! `Arc`. A slot is written for every manifest entry as soon as its phase
//! starts, so a name is either pending, ready, or unavailable; names the
//! manifest never listed are simply absent.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::error::AssetError;

/// Decoded RGBA8 pixels plus where they came from.
#[derive(Debug)]
pub struct Image {
    pub name: String,
    pub url: String,
    pub pixels: image::RgbaImage,
}

impl Image {
    /// Decode PNG/JPEG bytes.
    pub fn decode(
        name: impl Into<String>,
        url: impl Into<String>,
        bytes: &[u8],
    ) -> Result<Self, AssetError> {
        let url = url.into();
        let pixels = image::load_from_memory(bytes)
            .map_err(|e| AssetError::Image {
                url: url.clone(),
                message: e.to_string(),
            })?
            .to_rgba8();
        Ok(Self {
            name: name.into(),
            url,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}

/// Load state of a named asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetStatus {
    Pending,
    Ready,
    /// The load settled with an error; the slot holds a placeholder.
    Unavailable,
}

#[derive(Debug, Clone)]
enum ImageSlot {
    Pending,
    Ready(Arc<Image>),
    Unavailable,
}

#[derive(Debug, Default)]
pub struct ImageStore {
    map: FxHashMap<String, ImageSlot>,
}

impl ImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a slot for an image whose load is in flight.
    pub fn insert_pending(&mut self, name: impl Into<String>) {
        self.map.insert(name.into(), ImageSlot::Pending);
    }

    pub fn insert(&mut self, name: impl Into<String>, image: Arc<Image>) {
        self.map.insert(name.into(), ImageSlot::Ready(image));
    }

    pub fn mark_unavailable(&mut self, name: impl Into<String>) {
        self.map.insert(name.into(), ImageSlot::Unavailable);
    }

    /// The decoded image, or `None` when unknown, pending or unavailable.
    pub fn get(&self, name: &str) -> Option<Arc<Image>> {
        match self.map.get(name)? {
            ImageSlot::Ready(image) => Some(Arc::clone(image)),
            ImageSlot::Pending | ImageSlot::Unavailable => None,
        }
    }

    pub fn status(&self, name: &str) -> Option<AssetStatus> {
        self.map.get(name).map(|slot| match slot {
            ImageSlot::Pending => AssetStatus::Pending,
            ImageSlot::Ready(_) => AssetStatus::Ready,
            ImageSlot::Unavailable => AssetStatus::Unavailable,
        })
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
