//! Per-entity sound playback.
//!
//! A [`SoundInstance`] owns one voice on the audio host for as long as it
//! lives; dropping it releases the voice. Instances minted from the same
//! definition never affect each other.

use std::sync::Arc;

use bevy_ecs::prelude::Component;
use log::warn;

use crate::resources::audio::{AudioHost, VoiceId};
use crate::resources::soundstore::SoundDefinition;

/// Outcome of [`SoundInstance::play`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum PlayStatus {
    Playing,
    /// The host refused (autoplay policy). Retry after a user gesture.
    Blocked,
    /// The sound failed to load; nothing was played.
    Silent,
}

#[derive(Component)]
pub struct SoundInstance {
    definition: Arc<SoundDefinition>,
    host: Arc<dyn AudioHost>,
    voice: Option<VoiceId>,
    looped: bool,
}

impl std::fmt::Debug for SoundInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoundInstance")
            .field("name", &self.definition.name)
            .field("voice", &self.voice)
            .field("looped", &self.looped)
            .finish()
    }
}

impl SoundInstance {
    pub fn new(definition: Arc<SoundDefinition>, host: Arc<dyn AudioHost>) -> Self {
        let voice = definition.clip.as_ref().map(|clip| host.create_voice(clip));
        Self {
            definition,
            host,
            voice,
            looped: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn volume(&self) -> f32 {
        self.definition.volume
    }

    pub fn looped(&self) -> bool {
        self.looped
    }

    pub fn voice(&self) -> Option<VoiceId> {
        self.voice
    }

    /// True when the source failed to load and playback is a no-op.
    pub fn is_silent(&self) -> bool {
        self.voice.is_none()
    }

    /// Start playback with the definition's volume.
    pub fn play(&mut self, looped: bool) -> PlayStatus {
        let Some(voice) = self.voice else {
            return PlayStatus::Silent;
        };
        self.looped = looped;
        match self.host.play(voice, self.definition.volume, looped) {
            Ok(()) => PlayStatus::Playing,
            Err(blocked) => {
                warn!("Sound '{}': {}", self.definition.name, blocked);
                PlayStatus::Blocked
            }
        }
    }

    /// Pause and rewind.
    pub fn stop(&mut self) {
        if let Some(voice) = self.voice {
            self.host.stop(voice);
        }
    }

    pub fn is_playing(&self) -> bool {
        self.voice.is_some_and(|v| self.host.is_playing(v))
    }

    /// Seconds played since the last rewind.
    pub fn position(&self) -> f32 {
        self.voice.map_or(0.0, |v| self.host.position(v))
    }
}

impl Drop for SoundInstance {
    fn drop(&mut self) {
        if let Some(voice) = self.voice.take() {
            self.host.release_voice(voice);
        }
    }
}
