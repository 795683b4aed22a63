//! Declarative resource manifest.
//!
//! The manifest lists every image, sprite sheet and sound a session needs,
//! in three ordered sections. It is JSON:
//!
//! ```json
//! {
//!   "images": [{ "name": "background", "url": "background.png" }],
//!   "sprites": [{
//!     "name": "monster1", "url": "monster1.png", "once": false,
//!     "defaultState": "normal",
//!     "states": [{
//!       "name": "normal", "xpos": 0, "ypos": 0, "width": 170, "height": 170,
//!       "cols": 6, "dir": "horizontal", "speed": 6, "frames": [0, 1, 2, 3, 2, 1]
//!     }]
//!   }],
//!   "sounds": [{ "name": "boom", "url": "boom.ogg", "volume": 0.2 }]
//! }
//! ```
//!
//! Parsing is followed by validation so that every definition built from a
//! manifest upholds its invariants (default state exists, animated states
//! have frames). A manifest that fails either step is a fatal
//! [`ManifestError`].

use log::{info, warn};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::error::ManifestError;
use crate::resources::fetch::{AssetFetcher, resolve_url};

/// Sheet traversal order for multi-row animations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutDirection {
    /// Columns advance along x, rows along y.
    #[default]
    Horizontal,
    /// Columns advance along y, rows along x.
    Vertical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageEntry {
    pub name: String,
    pub url: String,
}

/// One animation state of a sprite, as written in the manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateEntry {
    pub name: String,
    #[serde(default)]
    pub xpos: u32,
    #[serde(default)]
    pub ypos: u32,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub cols: u32,
    #[serde(default)]
    pub dir: LayoutDirection,
    /// Frame-index accumulation rate. Zero means a static pose.
    #[serde(default)]
    pub speed: f32,
    #[serde(default)]
    pub frames: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpriteEntry {
    pub name: String,
    pub url: String,
    /// Play once and finish. Absent means `true`.
    #[serde(default = "default_once")]
    pub once: bool,
    #[serde(rename = "defaultState", alias = "defaultstate")]
    pub default_state: String,
    pub states: Vec<StateEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundEntry {
    pub name: String,
    pub url: String,
    #[serde(default = "default_volume")]
    pub volume: f32,
}

fn default_once() -> bool {
    true
}

fn default_volume() -> f32 {
    1.0
}

/// In-memory form of the manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceManifest {
    #[serde(default)]
    pub images: Vec<ImageEntry>,
    #[serde(default)]
    pub sprites: Vec<SpriteEntry>,
    #[serde(default)]
    pub sounds: Vec<SoundEntry>,
    /// Where the manifest was loaded from; entry URLs resolve against it.
    #[serde(skip)]
    pub source_url: String,
}

impl ResourceManifest {
    /// Fetch and parse the manifest at `url`. Blocks until the bytes arrive.
    pub fn load(fetcher: &dyn AssetFetcher, url: &str) -> Result<Self, ManifestError> {
        let bytes = fetcher.fetch(url)?;
        let manifest = Self::from_slice(&bytes, url)?;
        info!(
            "Loaded manifest '{}': {} images, {} sprites, {} sounds",
            url,
            manifest.images.len(),
            manifest.sprites.len(),
            manifest.sounds.len()
        );
        Ok(manifest)
    }

    /// Parse and validate a manifest. `url` is recorded as the base for
    /// relative entry URLs and used in error messages.
    pub fn from_slice(bytes: &[u8], url: &str) -> Result<Self, ManifestError> {
        let mut manifest: ResourceManifest =
            serde_json::from_slice(bytes).map_err(|source| ManifestError::Parse {
                url: url.to_string(),
                source,
            })?;
        manifest.source_url = url.to_string();
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn from_json(json: &str, url: &str) -> Result<Self, ManifestError> {
        Self::from_slice(json.as_bytes(), url)
    }

    /// Absolute URL of an entry's resource.
    pub fn resolve(&self, url: &str) -> String {
        resolve_url(&self.source_url, url)
    }

    fn invalid(&self, reason: String) -> ManifestError {
        ManifestError::Invalid {
            url: self.source_url.clone(),
            reason,
        }
    }

    fn validate(&mut self) -> Result<(), ManifestError> {
        check_unique("image", self.images.iter().map(|e| e.name.as_str()))
            .map_err(|r| self.invalid(r))?;
        check_unique("sprite", self.sprites.iter().map(|e| e.name.as_str()))
            .map_err(|r| self.invalid(r))?;
        check_unique("sound", self.sounds.iter().map(|e| e.name.as_str()))
            .map_err(|r| self.invalid(r))?;

        for sprite in &self.sprites {
            if let Err(reason) = validate_sprite(sprite) {
                return Err(self.invalid(reason));
            }
        }

        for sound in &mut self.sounds {
            if !sound.volume.is_finite() {
                return Err(ManifestError::Invalid {
                    url: self.source_url.clone(),
                    reason: format!("sound '{}' has a non-finite volume", sound.name),
                });
            }
            if !(0.0..=1.0).contains(&sound.volume) {
                warn!(
                    "Sound '{}' volume {} out of range, clamping to [0, 1]",
                    sound.name, sound.volume
                );
                sound.volume = sound.volume.clamp(0.0, 1.0);
            }
        }
        Ok(())
    }
}

fn check_unique<'a>(kind: &str, names: impl Iterator<Item = &'a str>) -> Result<(), String> {
    let mut seen = FxHashSet::default();
    for name in names {
        if !seen.insert(name) {
            return Err(format!("duplicate {} name '{}'", kind, name));
        }
    }
    Ok(())
}

fn validate_sprite(sprite: &SpriteEntry) -> Result<(), String> {
    if sprite.states.is_empty() {
        return Err(format!("sprite '{}' has no states", sprite.name));
    }
    check_unique("state", sprite.states.iter().map(|s| s.name.as_str()))
        .map_err(|r| format!("sprite '{}': {}", sprite.name, r))?;
    if !sprite.states.iter().any(|s| s.name == sprite.default_state) {
        return Err(format!(
            "sprite '{}' default state '{}' is not one of its states",
            sprite.name, sprite.default_state
        ));
    }
    for state in &sprite.states {
        if !state.speed.is_finite() {
            return Err(format!(
                "sprite '{}' state '{}' has a non-finite speed",
                sprite.name, state.name
            ));
        }
        if state.speed > 0.0 && state.frames.is_empty() {
            return Err(format!(
                "sprite '{}' state '{}' animates but lists no frames",
                sprite.name, state.name
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::fetch::MemoryFetcher;

    const MANIFEST: &str = r#"{
        "images": [{ "name": "background", "url": "background.png" }],
        "sprites": [{
            "name": "m1", "url": "monster1.png", "once": false, "defaultState": "normal",
            "states": [{
                "name": "normal", "xpos": 0, "ypos": 0, "width": 170, "height": 170,
                "cols": 6, "dir": "horizontal", "speed": 6, "frames": [0, 1, 2, 3, 2, 1]
            }]
        }],
        "sounds": [{ "name": "boom", "url": "boom.ogg", "volume": 0.2 }]
    }"#;

    #[test]
    fn parses_all_three_sections() {
        let m = ResourceManifest::from_json(MANIFEST, "assets/resources.json").unwrap();
        assert_eq!(m.images.len(), 1);
        assert_eq!(m.sprites.len(), 1);
        assert_eq!(m.sounds.len(), 1);

        let sprite = &m.sprites[0];
        assert!(!sprite.once);
        assert_eq!(sprite.default_state, "normal");
        let state = &sprite.states[0];
        assert_eq!((state.width, state.height), (170, 170));
        assert_eq!(state.cols, 6);
        assert_eq!(state.dir, LayoutDirection::Horizontal);
        assert_eq!(state.speed, 6.0);
        assert_eq!(state.frames, vec![0, 1, 2, 3, 2, 1]);
        assert_eq!(m.sounds[0].volume, 0.2);
        assert_eq!(m.resolve(&sprite.url), "assets/monster1.png");
    }

    #[test]
    fn missing_sections_and_attributes_take_defaults() {
        let json = r#"{
            "sprites": [{
                "name": "boom", "url": "boom.png", "defaultstate": "normal",
                "states": [{ "name": "normal", "width": 64, "height": 64 }]
            }],
            "sounds": [{ "name": "click", "url": "click.wav" }]
        }"#;
        let m = ResourceManifest::from_json(json, "resources.json").unwrap();
        assert!(m.images.is_empty());
        let sprite = &m.sprites[0];
        assert!(sprite.once);
        let state = &sprite.states[0];
        assert_eq!(state.speed, 0.0);
        assert_eq!(state.dir, LayoutDirection::Horizontal);
        assert!(state.frames.is_empty());
        assert_eq!(m.sounds[0].volume, 1.0);
    }

    #[test]
    fn empty_document_is_an_empty_manifest() {
        let m = ResourceManifest::from_json("{}", "r.json").unwrap();
        assert!(m.images.is_empty() && m.sprites.is_empty() && m.sounds.is_empty());
    }

    #[test]
    fn vertical_direction_parses() {
        let json = r#"{ "sprites": [{ "name": "s", "url": "s.png", "defaultState": "a",
            "states": [{ "name": "a", "width": 8, "height": 8, "dir": "vertical" }] }] }"#;
        let m = ResourceManifest::from_json(json, "r.json").unwrap();
        assert_eq!(m.sprites[0].states[0].dir, LayoutDirection::Vertical);
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = ResourceManifest::from_json("{ \"images\": [", "r.json").unwrap_err();
        assert!(matches!(err, ManifestError::Parse { .. }));
        assert!(!err.is_fetch());
    }

    #[test]
    fn frames_must_be_integers() {
        let json = r#"{ "sprites": [{ "name": "s", "url": "s.png", "defaultState": "a",
            "states": [{ "name": "a", "width": 8, "height": 8, "speed": 2, "frames": "[0,1]" }] }] }"#;
        let err = ResourceManifest::from_json(json, "r.json").unwrap_err();
        assert!(matches!(err, ManifestError::Parse { .. }));
    }

    #[test]
    fn unknown_default_state_is_invalid() {
        let json = r#"{ "sprites": [{ "name": "s", "url": "s.png", "defaultState": "missing",
            "states": [{ "name": "a", "width": 8, "height": 8 }] }] }"#;
        let err = ResourceManifest::from_json(json, "r.json").unwrap_err();
        assert!(matches!(err, ManifestError::Invalid { .. }));
    }

    #[test]
    fn animated_state_without_frames_is_invalid() {
        let json = r#"{ "sprites": [{ "name": "s", "url": "s.png", "defaultState": "a",
            "states": [{ "name": "a", "width": 8, "height": 8, "speed": 4 }] }] }"#;
        let err = ResourceManifest::from_json(json, "r.json").unwrap_err();
        assert!(matches!(err, ManifestError::Invalid { .. }));
    }

    #[test]
    fn duplicate_names_are_invalid() {
        let json = r#"{ "images": [{ "name": "a", "url": "a.png" }, { "name": "a", "url": "b.png" }] }"#;
        let err = ResourceManifest::from_json(json, "r.json").unwrap_err();
        assert!(matches!(err, ManifestError::Invalid { .. }));
    }

    #[test]
    fn out_of_range_volume_is_clamped() {
        let json = r#"{ "sounds": [{ "name": "s", "url": "s.ogg", "volume": 1.5 }] }"#;
        let m = ResourceManifest::from_json(json, "r.json").unwrap();
        assert_eq!(m.sounds[0].volume, 1.0);
    }

    #[test]
    fn load_reports_fetch_failures() {
        let fetcher = MemoryFetcher::new();
        let err = ResourceManifest::load(&fetcher, "missing.json").unwrap_err();
        assert!(err.is_fetch());
    }

    #[test]
    fn load_fetches_and_records_source_url() {
        let fetcher = MemoryFetcher::new().with("game/resources.json", MANIFEST);
        let m = ResourceManifest::load(&fetcher, "game/resources.json").unwrap();
        assert_eq!(m.source_url, "game/resources.json");
        assert_eq!(m.resolve("boom.ogg"), "game/boom.ogg");
    }
}
