//! Sound template registry.
//!
//! Sound data is decoded once into an [`AudioClip`] and shared. What callers
//! get from [`SoundStore::get_sound`] is always a new
//! [`SoundInstance`] with its own voice, never the template.
//!
//! A sound whose load failed is still registered, without a clip, so lookups
//! hand out silent instances instead of failing.

use std::io::Cursor;
use std::sync::Arc;

use rodio::{Decoder, Source};
use rustc_hash::FxHashMap;

use crate::components::sound::SoundInstance;
use crate::error::AssetError;
use crate::resources::audio::AudioHost;
use crate::resources::imagestore::AssetStatus;

/// Decoded PCM audio, shared by every voice playing it.
///
/// Samples are interleaved `f32` frames as produced by the decoder.
#[derive(Debug)]
pub struct AudioClip {
    pub name: String,
    pub url: String,
    pub channels: u16,
    pub sample_rate: u32,
    pub samples: Arc<[f32]>,
}

impl AudioClip {
    /// Decode WAV, Ogg Vorbis, MP3 or FLAC data. Data the decoder rejects,
    /// or that decodes to no samples, is an asset error.
    pub fn from_bytes(
        name: impl Into<String>,
        url: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<Self, AssetError> {
        let url = url.into();
        let decoder = Decoder::new(Cursor::new(bytes)).map_err(|e| AssetError::Audio {
            url: url.clone(),
            message: e.to_string(),
        })?;
        let channels = u16::from(decoder.channels());
        let sample_rate = u32::from(decoder.sample_rate());
        let samples: Arc<[f32]> = decoder.collect();
        if samples.is_empty() || channels == 0 || sample_rate == 0 {
            return Err(AssetError::Audio {
                url,
                message: "no audio frames".to_string(),
            });
        }
        Ok(Self {
            name: name.into(),
            url,
            channels,
            sample_rate,
            samples,
        })
    }

    /// Length in seconds.
    pub fn duration(&self) -> f32 {
        let frames = self.samples.len() / self.channels.max(1) as usize;
        frames as f32 / self.sample_rate.max(1) as f32
    }
}

/// Immutable sound template. `clip` is `None` when the load failed.
#[derive(Debug)]
pub struct SoundDefinition {
    pub name: String,
    pub volume: f32,
    pub clip: Option<Arc<AudioClip>>,
}

#[derive(Debug)]
enum SoundSlot {
    Pending,
    Ready(Arc<SoundDefinition>),
}

/// Registry of sound templates keyed by name.
pub struct SoundStore {
    host: Arc<dyn AudioHost>,
    map: FxHashMap<String, SoundSlot>,
}

impl std::fmt::Debug for SoundStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoundStore")
            .field("sounds", &self.map.len())
            .finish()
    }
}

impl SoundStore {
    pub fn new(host: Arc<dyn AudioHost>) -> Self {
        Self {
            host,
            map: FxHashMap::default(),
        }
    }

    pub fn host(&self) -> &Arc<dyn AudioHost> {
        &self.host
    }

    pub fn insert_pending(&mut self, name: impl Into<String>) {
        self.map.insert(name.into(), SoundSlot::Pending);
    }

    pub fn insert(&mut self, definition: SoundDefinition) {
        self.map.insert(
            definition.name.clone(),
            SoundSlot::Ready(Arc::new(definition)),
        );
    }

    pub fn definition(&self, name: &str) -> Option<&Arc<SoundDefinition>> {
        match self.map.get(name)? {
            SoundSlot::Ready(definition) => Some(definition),
            SoundSlot::Pending => None,
        }
    }

    /// A new, independently playable instance. `None` for unknown or still
    /// loading names.
    pub fn get_sound(&self, name: &str) -> Option<SoundInstance> {
        self.definition(name)
            .map(|d| SoundInstance::new(Arc::clone(d), Arc::clone(&self.host)))
    }

    pub fn status(&self, name: &str) -> Option<AssetStatus> {
        self.map.get(name).map(|slot| match slot {
            SoundSlot::Pending => AssetStatus::Pending,
            SoundSlot::Ready(d) if d.clip.is_some() => AssetStatus::Ready,
            SoundSlot::Ready(_) => AssetStatus::Unavailable,
        })
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
