//! Bridge between sound instances and whatever actually makes noise.
//!
//! The engine never talks to an audio device directly. Each
//! [`SoundInstance`](crate::components::sound::SoundInstance) owns one
//! *voice* on an [`AudioHost`]: a playback handle with its own position,
//! volume and loop flag over a shared decoded clip. Two voices over the same
//! clip play independently, which is what lets two explosions overlap.
//!
//! [`HeadlessAudioHost`] tracks voices in memory. It models an autoplay
//! policy: while locked, every start request is refused until
//! [`HeadlessAudioHost::unlock`] is called from a user gesture.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::debug;
use rustc_hash::FxHashMap;

use crate::error::PlaybackBlocked;
use crate::resources::soundstore::AudioClip;

/// Handle to one voice on a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VoiceId(pub u64);

/// Playback backend. Implementations must tolerate calls with voices they
/// already released.
pub trait AudioHost: Send + Sync {
    /// Create a stopped voice over `clip`.
    fn create_voice(&self, clip: &Arc<AudioClip>) -> VoiceId;
    /// Start or resume the voice.
    fn play(&self, voice: VoiceId, volume: f32, looped: bool) -> Result<(), PlaybackBlocked>;
    /// Pause and rewind.
    fn stop(&self, voice: VoiceId);
    fn is_playing(&self, voice: VoiceId) -> bool;
    /// Seconds played since the last rewind.
    fn position(&self, voice: VoiceId) -> f32;
    fn release_voice(&self, voice: VoiceId);
}

#[derive(Debug, Clone)]
struct Voice {
    clip: Arc<AudioClip>,
    playing: bool,
    looped: bool,
    volume: f32,
    position: f32,
}

/// In-memory audio host with an autoplay lock.
#[derive(Debug, Default)]
pub struct HeadlessAudioHost {
    voices: Mutex<FxHashMap<VoiceId, Voice>>,
    next_id: AtomicU64,
    locked: AtomicBool,
}

impl HeadlessAudioHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// A host that refuses playback until [`unlock`](Self::unlock).
    pub fn locked() -> Self {
        let host = Self::default();
        host.locked.store(true, Ordering::Release);
        host
    }

    /// Lift the autoplay lock, as a user gesture would.
    pub fn unlock(&self) {
        self.locked.store(false, Ordering::Release);
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }

    /// Advance every playing voice by `dt` seconds. Looped voices wrap at
    /// the end of their clip; the others stop and rewind.
    pub fn advance(&self, dt: f32) {
        for voice in self.voices().values_mut().filter(|v| v.playing) {
            voice.position += dt;
            let length = voice.clip.duration();
            if voice.position >= length {
                if voice.looped && length > 0.0 {
                    voice.position %= length;
                } else {
                    voice.playing = false;
                    voice.position = 0.0;
                }
            }
        }
    }

    pub fn voice_count(&self) -> usize {
        self.voices().len()
    }

    pub fn playing_count(&self) -> usize {
        self.voices().values().filter(|v| v.playing).count()
    }

    /// Volume and loop flag last applied to `voice`.
    pub fn voice_settings(&self, voice: VoiceId) -> Option<(f32, bool)> {
        self.voices().get(&voice).map(|v| (v.volume, v.looped))
    }

    /// Name of the clip behind `voice`.
    pub fn voice_clip(&self, voice: VoiceId) -> Option<String> {
        self.voices().get(&voice).map(|v| v.clip.name.clone())
    }

    fn voices(&self) -> MutexGuard<'_, FxHashMap<VoiceId, Voice>> {
        self.voices.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AudioHost for HeadlessAudioHost {
    fn create_voice(&self, clip: &Arc<AudioClip>) -> VoiceId {
        let id = VoiceId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.voices().insert(
            id,
            Voice {
                clip: Arc::clone(clip),
                playing: false,
                looped: false,
                volume: 1.0,
                position: 0.0,
            },
        );
        id
    }

    fn play(&self, voice: VoiceId, volume: f32, looped: bool) -> Result<(), PlaybackBlocked> {
        if self.is_locked() {
            return Err(PlaybackBlocked);
        }
        if let Some(v) = self.voices().get_mut(&voice) {
            debug!("voice {} play clip='{}' looped={}", voice.0, v.clip.name, looped);
            v.volume = volume;
            v.looped = looped;
            v.playing = true;
        }
        Ok(())
    }

    fn stop(&self, voice: VoiceId) {
        if let Some(v) = self.voices().get_mut(&voice) {
            v.playing = false;
            v.position = 0.0;
        }
    }

    fn is_playing(&self, voice: VoiceId) -> bool {
        self.voices().get(&voice).is_some_and(|v| v.playing)
    }

    fn position(&self, voice: VoiceId) -> f32 {
        self.voices().get(&voice).map_or(0.0, |v| v.position)
    }

    fn release_voice(&self, voice: VoiceId) {
        self.voices().remove(&voice);
    }
}
