//! Sprite template registry.
//!
//! Every sprite in the manifest becomes one immutable [`SpriteDefinition`]
//! shared through `Arc` by all instances minted from it. Only the sheet
//! image arrives later; it lives in a write-once slot so instances acquired
//! early see it as soon as it attaches, without the definition ever being
//! mutated afterwards.

use std::sync::{Arc, OnceLock};

use log::warn;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::components::sprite::SpriteInstance;
use crate::geometry::Vector2;
use crate::resources::imagestore::{AssetStatus, Image};
use crate::resources::manifest::{LayoutDirection, SpriteEntry, StateEntry};

/// Frame indices of one state. Most animations are short.
pub type FrameSequence = SmallVec<[u32; 8]>;

/// Immutable parameters of one animation state.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationState {
    pub name: String,
    /// Top-left of the state's first cell in the sheet.
    pub origin: Vector2,
    /// Cell size; also the sprite's size while in this state.
    pub frame_size: Vector2,
    /// Cells per row; 0 means a single row.
    pub columns: u32,
    /// Index accumulation rate per second. Zero means a static pose.
    pub frame_rate: f32,
    pub frame_sequence: FrameSequence,
    pub layout: LayoutDirection,
}

impl From<&StateEntry> for AnimationState {
    fn from(entry: &StateEntry) -> Self {
        Self {
            name: entry.name.clone(),
            origin: Vector2::new(entry.xpos as f32, entry.ypos as f32),
            frame_size: Vector2::new(entry.width as f32, entry.height as f32),
            columns: entry.cols,
            frame_rate: entry.speed,
            frame_sequence: entry.frames.iter().copied().collect(),
            layout: entry.dir,
        }
    }
}

impl AnimationState {
    pub fn is_animated(&self) -> bool {
        self.frame_rate > 0.0
    }
}

/// The sheet image behind a definition, once its load settled.
#[derive(Debug, Clone)]
pub enum SheetImage {
    Ready(Arc<Image>),
    Unavailable,
}

/// Immutable, shared sprite template.
#[derive(Debug)]
pub struct SpriteDefinition {
    pub name: String,
    pub url: String,
    /// Whether playback finishes after one pass of the frame sequence.
    pub once: bool,
    states: Vec<AnimationState>,
    state_index: FxHashMap<String, usize>,
    default_state: usize,
    sheet: OnceLock<SheetImage>,
}

impl SpriteDefinition {
    /// Build a definition from a validated manifest entry. Returns `None` if
    /// the entry breaks a definition invariant.
    pub fn from_entry(entry: &SpriteEntry, url: impl Into<String>) -> Option<Self> {
        let states: Vec<AnimationState> = entry.states.iter().map(AnimationState::from).collect();
        if states
            .iter()
            .any(|s| s.is_animated() && s.frame_sequence.is_empty())
        {
            return None;
        }
        let state_index: FxHashMap<String, usize> = states
            .iter()
            .enumerate()
            .map(|(i, s)| (s.name.clone(), i))
            .collect();
        let default_state = *state_index.get(&entry.default_state)?;
        Some(Self {
            name: entry.name.clone(),
            url: url.into(),
            once: entry.once,
            states,
            state_index,
            default_state,
            sheet: OnceLock::new(),
        })
    }

    pub fn states(&self) -> &[AnimationState] {
        &self.states
    }

    pub fn state_index(&self, name: &str) -> Option<usize> {
        self.state_index.get(name).copied()
    }

    pub fn state(&self, name: &str) -> Option<&AnimationState> {
        self.state_index(name).map(|i| &self.states[i])
    }

    pub(crate) fn state_at(&self, index: usize) -> &AnimationState {
        &self.states[index]
    }

    pub(crate) fn default_state_index(&self) -> usize {
        self.default_state
    }

    pub fn default_state(&self) -> &AnimationState {
        &self.states[self.default_state]
    }

    /// Attach the sheet. Only the first call has any effect.
    pub fn attach_sheet(&self, sheet: SheetImage) -> bool {
        self.sheet.set(sheet).is_ok()
    }

    /// The sheet image if it loaded.
    pub fn sheet(&self) -> Option<&Arc<Image>> {
        match self.sheet.get()? {
            SheetImage::Ready(image) => Some(image),
            SheetImage::Unavailable => None,
        }
    }

    pub fn sheet_status(&self) -> AssetStatus {
        match self.sheet.get() {
            None => AssetStatus::Pending,
            Some(SheetImage::Ready(_)) => AssetStatus::Ready,
            Some(SheetImage::Unavailable) => AssetStatus::Unavailable,
        }
    }
}

/// Registry of sprite definitions keyed by name.
#[derive(Debug, Default)]
pub struct SpriteStore {
    definitions: FxHashMap<String, Arc<SpriteDefinition>>,
}

impl SpriteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, definition: SpriteDefinition) -> Arc<SpriteDefinition> {
        let definition = Arc::new(definition);
        if self
            .definitions
            .insert(definition.name.clone(), Arc::clone(&definition))
            .is_some()
        {
            warn!("Sprite '{}' registered twice, replacing", definition.name);
        }
        definition
    }

    pub fn definition(&self, name: &str) -> Option<&Arc<SpriteDefinition>> {
        self.definitions.get(name)
    }

    /// Mint a fresh instance at the definition's default state.
    pub fn get_sprite(&self, name: &str) -> Option<SpriteInstance> {
        self.definitions
            .get(name)
            .map(|d| SpriteInstance::new(Arc::clone(d)))
    }

    /// Frame size of the sprite's default state.
    pub fn sprite_size(&self, name: &str) -> Option<Vector2> {
        self.definitions
            .get(name)
            .map(|d| d.default_state().frame_size)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::manifest::ResourceManifest;

    fn entry() -> SpriteEntry {
        let json = r#"{ "sprites": [{
            "name": "m1", "url": "monster1.png", "once": false, "defaultState": "normal",
            "states": [
                { "name": "normal", "width": 170, "height": 170, "cols": 6, "speed": 6, "frames": [0,1,2,3,2,1] },
                { "name": "hit", "xpos": 0, "ypos": 340, "width": 200, "height": 180 }
            ]
        }] }"#;
        ResourceManifest::from_json(json, "r.json")
            .unwrap()
            .sprites
            .remove(0)
    }

    #[test]
    fn builds_states_from_entry() {
        let def = SpriteDefinition::from_entry(&entry(), "monster1.png").unwrap();
        assert_eq!(def.states().len(), 2);
        assert_eq!(def.default_state().name, "normal");
        let hit = def.state("hit").unwrap();
        assert_eq!(hit.origin, Vector2::new(0.0, 340.0));
        assert_eq!(hit.frame_size, Vector2::new(200.0, 180.0));
        assert!(!hit.is_animated());
        assert_eq!(def.sheet_status(), AssetStatus::Pending);
    }

    #[test]
    fn rejects_unknown_default_state() {
        let mut e = entry();
        e.default_state = "nope".to_string();
        assert!(SpriteDefinition::from_entry(&e, "x").is_none());
    }

    #[test]
    fn sheet_attaches_once() {
        let def = SpriteDefinition::from_entry(&entry(), "monster1.png").unwrap();
        assert!(def.attach_sheet(SheetImage::Unavailable));
        assert!(!def.attach_sheet(SheetImage::Unavailable));
        assert_eq!(def.sheet_status(), AssetStatus::Unavailable);
        assert!(def.sheet().is_none());
    }

    #[test]
    fn store_mints_independent_instances_and_reports_size() {
        let mut store = SpriteStore::new();
        let def = store.insert(SpriteDefinition::from_entry(&entry(), "monster1.png").unwrap());

        let a = store.get_sprite("m1").unwrap();
        let b = store.get_sprite("m1").unwrap();
        assert!(Arc::ptr_eq(a.definition(), &def));
        assert!(Arc::ptr_eq(b.definition(), &def));
        assert_eq!(store.sprite_size("m1"), Some(Vector2::new(170.0, 170.0)));
        assert!(store.get_sprite("missing").is_none());
        assert!(store.sprite_size("missing").is_none());
    }
}
