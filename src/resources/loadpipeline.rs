//! Three-phase asset load pipeline.
//!
//! A [`LoadPipeline`] is built from a parsed [`ResourceManifest`] and owns
//! every registry of the session. [`LoadPipeline::start`] walks three phases
//! in order, each gated by a [`Barrier`]:
//!
//! 1. **Images** – every `images` entry is fetched and decoded.
//! 2. **Sprites** – every sprite definition is built synchronously from its
//!    manifest states and registered at once; only the sheet images load
//!    asynchronously. `get_sprite` works from the moment this phase opens.
//! 3. **Sounds** – every sound is fetched and probed.
//!
//! Each entry counts as settled whether it loaded or failed; a failed entry
//! leaves an "unavailable" placeholder behind. When a phase's barrier closes
//! the next phase opens, and when the sound barrier closes the ready
//! callback runs, exactly once. Empty phases close as soon as they open.
//!
//! Settlements are applied by [`LoadPipeline::pump`] (non-blocking, once
//! per frame) or [`LoadPipeline::block_until_ready`]. There is no timeout:
//! a fetch that never returns keeps its phase open.

use std::sync::Arc;

use bevy_ecs::prelude::Resource;
use crossbeam_channel::TryRecvError;
use log::{debug, error, info, warn};

use crate::components::sound::SoundInstance;
use crate::components::sprite::SpriteInstance;
use crate::error::{AssetError, PipelineError};
use crate::events::loading::{AssetKind, LoadCmd, LoadMessage, LoadedAsset};
use crate::geometry::Vector2;
use crate::resources::audio::AudioHost;
use crate::resources::barrier::Barrier;
use crate::resources::fetch::AssetFetcher;
use crate::resources::imagestore::{AssetStatus, Image, ImageStore};
use crate::resources::loader::LoaderBridge;
use crate::resources::manifest::ResourceManifest;
use crate::resources::soundstore::{AudioClip, SoundDefinition, SoundStore};
use crate::resources::spritestore::{SheetImage, SpriteDefinition, SpriteStore};

/// Default number of loader threads.
pub const DEFAULT_WORKERS: usize = 4;

/// Where the pipeline is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    /// Constructed, not started.
    Idle,
    Images,
    Sprites,
    Sounds,
    Ready,
}

/// Snapshot of the current phase's barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadProgress {
    pub phase: LoadPhase,
    pub completed: usize,
    pub expected: usize,
}

type ReadyCallback = Box<dyn FnOnce() + Send + Sync>;

#[derive(Resource)]
pub struct LoadPipeline {
    manifest: ResourceManifest,
    fetcher: Arc<dyn AssetFetcher>,
    workers: usize,
    phase: LoadPhase,
    barrier: Barrier,
    images: ImageStore,
    sprites: SpriteStore,
    sounds: SoundStore,
    on_ready: Option<ReadyCallback>,
    bridge: Option<LoaderBridge>,
    failures: usize,
}

impl std::fmt::Debug for LoadPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadPipeline")
            .field("manifest", &self.manifest.source_url)
            .field("phase", &self.phase)
            .field("barrier", &self.barrier)
            .field("failures", &self.failures)
            .finish()
    }
}

impl LoadPipeline {
    pub fn new(
        manifest: ResourceManifest,
        fetcher: Arc<dyn AssetFetcher>,
        audio: Arc<dyn AudioHost>,
    ) -> Self {
        Self {
            manifest,
            fetcher,
            workers: DEFAULT_WORKERS,
            phase: LoadPhase::Idle,
            barrier: Barrier::default(),
            images: ImageStore::new(),
            sprites: SpriteStore::new(),
            sounds: SoundStore::new(audio),
            on_ready: None,
            bridge: None,
            failures: 0,
        }
    }

    /// Number of loader threads spawned by [`start`](Self::start).
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn manifest(&self) -> &ResourceManifest {
        &self.manifest
    }

    pub fn phase(&self) -> LoadPhase {
        self.phase
    }

    pub fn is_ready(&self) -> bool {
        self.phase == LoadPhase::Ready
    }

    pub fn progress(&self) -> LoadProgress {
        LoadProgress {
            phase: self.phase,
            completed: self.barrier.completed(),
            expected: self.barrier.expected(),
        }
    }

    /// Assets that settled with an error so far.
    pub fn failures(&self) -> usize {
        self.failures
    }

    /// Begin Phase 1 and return immediately. `on_ready` runs exactly once,
    /// from `pump`/`block_until_ready` (or from here if every phase is
    /// empty), after the last phase closes.
    pub fn start(
        &mut self,
        on_ready: impl FnOnce() + Send + Sync + 'static,
    ) -> Result<(), PipelineError> {
        if self.phase != LoadPhase::Idle {
            return Err(PipelineError::AlreadyStarted);
        }
        self.on_ready = Some(Box::new(on_ready));
        self.bridge = Some(LoaderBridge::spawn(Arc::clone(&self.fetcher), self.workers));
        info!("Loading resources from '{}'", self.manifest.source_url);
        self.enter_images();
        Ok(())
    }

    /// Apply every settlement that has arrived. Returns how many were applied.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        loop {
            let next = match &self.bridge {
                Some(bridge) => bridge.rx_msg.try_recv(),
                None => Err(TryRecvError::Disconnected),
            };
            match next {
                Ok(msg) => {
                    self.apply(msg);
                    applied += 1;
                }
                Err(_) => break,
            }
        }
        applied
    }

    /// Block until the pipeline is ready. Fails if it was never started or
    /// every loader thread died first. Waits forever on a stalled fetch.
    pub fn block_until_ready(&mut self) -> Result<(), PipelineError> {
        while !self.is_ready() {
            let msg = match &self.bridge {
                Some(bridge) => bridge.rx_msg.recv(),
                None => return Err(PipelineError::ShutDown),
            };
            match msg {
                Ok(msg) => self.apply(msg),
                Err(_) => {
                    error!("Loader threads are gone in phase {:?}", self.phase);
                    return Err(PipelineError::LoadersGone);
                }
            }
        }
        Ok(())
    }

    /// Stop and join the loader threads. Registries stay readable.
    pub fn shutdown(&mut self) {
        if let Some(bridge) = self.bridge.take() {
            bridge.shutdown();
        }
    }

    pub fn images(&self) -> &ImageStore {
        &self.images
    }

    pub fn sprites(&self) -> &SpriteStore {
        &self.sprites
    }

    pub fn sounds(&self) -> &SoundStore {
        &self.sounds
    }

    pub fn get_image(&self, name: &str) -> Option<Arc<Image>> {
        self.images.get(name)
    }

    pub fn get_sprite(&self, name: &str) -> Option<SpriteInstance> {
        self.sprites.get_sprite(name)
    }

    pub fn sprite_size(&self, name: &str) -> Option<Vector2> {
        self.sprites.sprite_size(name)
    }

    pub fn get_sound(&self, name: &str) -> Option<SoundInstance> {
        self.sounds.get_sound(name)
    }

    /// Load state of a named asset of the given kind.
    pub fn status(&self, kind: AssetKind, name: &str) -> Option<AssetStatus> {
        match kind {
            AssetKind::Image => self.images.status(name),
            AssetKind::SpriteSheet => self.sprites.definition(name).map(|d| d.sheet_status()),
            AssetKind::Sound => self.sounds.status(name),
        }
    }

    fn enter_images(&mut self) {
        self.phase = LoadPhase::Images;
        let entries: Vec<(String, String)> = self
            .manifest
            .images
            .iter()
            .map(|e| (e.name.clone(), self.manifest.resolve(&e.url)))
            .collect();
        info!("Phase 1: loading {} image(s)", entries.len());
        self.barrier = Barrier::new(entries.len());
        for (name, _) in &entries {
            self.images.insert_pending(name.clone());
        }
        self.dispatch_all(AssetKind::Image, entries);
    }

    fn enter_sprites(&mut self) {
        self.phase = LoadPhase::Sprites;
        let mut entries = Vec::with_capacity(self.manifest.sprites.len());
        for entry in &self.manifest.sprites {
            let url = self.manifest.resolve(&entry.url);
            match SpriteDefinition::from_entry(entry, url.clone()) {
                Some(definition) => {
                    self.sprites.insert(definition);
                    entries.push((entry.name.clone(), url));
                }
                None => warn!("Sprite '{}' has an invalid definition, skipping", entry.name),
            }
        }
        info!("Phase 2: loading {} sprite sheet(s)", entries.len());
        self.barrier = Barrier::new(entries.len());
        self.dispatch_all(AssetKind::SpriteSheet, entries);
    }

    fn enter_sounds(&mut self) {
        self.phase = LoadPhase::Sounds;
        let entries: Vec<(String, String)> = self
            .manifest
            .sounds
            .iter()
            .map(|e| (e.name.clone(), self.manifest.resolve(&e.url)))
            .collect();
        info!("Phase 3: loading {} sound(s)", entries.len());
        self.barrier = Barrier::new(entries.len());
        for (name, _) in &entries {
            self.sounds.insert_pending(name.clone());
        }
        self.dispatch_all(AssetKind::Sound, entries);
    }

    /// Hand a phase's loads to the pool, then close the barrier if it is
    /// already satisfied. Loads the pool cannot take settle as failures.
    fn dispatch_all(&mut self, kind: AssetKind, entries: Vec<(String, String)>) {
        let mut refused = Vec::new();
        if let Some(bridge) = &self.bridge {
            for (name, url) in entries {
                if let Err(err) = bridge.tx_cmd.send(LoadCmd::Load { kind, name, url }) {
                    refused.push(err.into_inner());
                }
            }
        }

        let mut closed = false;
        for cmd in refused {
            if let LoadCmd::Load { kind, name, url } = cmd {
                warn!("No loader thread to take {} '{}'", kind, name);
                closed |= self.record(LoadMessage::Failed {
                    kind,
                    name,
                    error: AssetError::NoLoader { url },
                });
            }
        }
        if closed || self.barrier.try_close() {
            self.advance();
        }
    }

    fn apply(&mut self, msg: LoadMessage) {
        let expected_kind = match self.phase {
            LoadPhase::Images => AssetKind::Image,
            LoadPhase::Sprites => AssetKind::SpriteSheet,
            LoadPhase::Sounds => AssetKind::Sound,
            LoadPhase::Idle | LoadPhase::Ready => {
                warn!("Stray {} settlement for '{}'", msg.kind(), msg.name());
                return;
            }
        };
        if msg.kind() != expected_kind {
            warn!(
                "{} settlement for '{}' arrived in phase {:?}, ignoring",
                msg.kind(),
                msg.name(),
                self.phase
            );
            return;
        }
        if self.record(msg) {
            self.advance();
        }
    }

    /// Write the registry entry for one settlement and count it. Returns
    /// whether this settlement closed the phase.
    fn record(&mut self, msg: LoadMessage) -> bool {
        match msg {
            LoadMessage::Loaded { kind, name, asset } => {
                debug!("{} '{}' loaded", kind, name);
                match (kind, asset) {
                    (AssetKind::Image, LoadedAsset::Image(image)) => self.images.insert(name, image),
                    (AssetKind::SpriteSheet, LoadedAsset::Image(image)) => {
                        self.attach_sheet(&name, SheetImage::Ready(image))
                    }
                    (AssetKind::Sound, LoadedAsset::Sound(clip)) => {
                        self.insert_sound(name, Some(clip))
                    }
                    (kind, _) => {
                        warn!("{} '{}' loaded as the wrong asset type", kind, name);
                        self.mark_unavailable(kind, name);
                    }
                }
            }
            LoadMessage::Failed { kind, name, error } => {
                warn!("{} '{}' unavailable: {}", kind, name, error);
                self.mark_unavailable(kind, name);
            }
        }
        self.barrier.settle()
    }

    fn mark_unavailable(&mut self, kind: AssetKind, name: String) {
        self.failures += 1;
        match kind {
            AssetKind::Image => self.images.mark_unavailable(name),
            AssetKind::SpriteSheet => self.attach_sheet(&name, SheetImage::Unavailable),
            AssetKind::Sound => self.insert_sound(name, None),
        }
    }

    fn attach_sheet(&mut self, name: &str, sheet: SheetImage) {
        match self.sprites.definition(name) {
            Some(definition) => {
                if !definition.attach_sheet(sheet) {
                    warn!("Sprite '{}' sheet attached twice, keeping the first", name);
                }
            }
            None => warn!("Sheet for unknown sprite '{}'", name),
        }
    }

    fn insert_sound(&mut self, name: String, clip: Option<Arc<AudioClip>>) {
        let volume = self
            .manifest
            .sounds
            .iter()
            .find(|e| e.name == name)
            .map_or(1.0, |e| e.volume);
        self.sounds.insert(SoundDefinition { name, volume, clip });
    }

    /// Move to the next phase. Called once per closed barrier.
    fn advance(&mut self) {
        match self.phase {
            LoadPhase::Images => {
                info!("Phase 1 done: {} image(s)", self.barrier.completed());
                self.enter_sprites();
            }
            LoadPhase::Sprites => {
                info!("Phase 2 done: {} sprite(s)", self.barrier.completed());
                self.enter_sounds();
            }
            LoadPhase::Sounds => {
                info!("Phase 3 done: {} sound(s)", self.barrier.completed());
                self.phase = LoadPhase::Ready;
                info!("Resources ready ({} unavailable)", self.failures);
                if let Some(on_ready) = self.on_ready.take() {
                    on_ready();
                }
            }
            LoadPhase::Idle | LoadPhase::Ready => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::audio::HeadlessAudioHost;
    use crate::resources::fetch::MemoryFetcher;
    use crate::resources::imagestore::tests::png_bytes;
    use crate::resources::soundstore::tests::wav_bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn pipeline(json: &str, fetcher: MemoryFetcher) -> LoadPipeline {
        let manifest = ResourceManifest::from_json(json, "resources.json").unwrap();
        LoadPipeline::new(manifest, Arc::new(fetcher), Arc::new(HeadlessAudioHost::new()))
            .with_workers(2)
    }

    fn counter() -> (Arc<AtomicUsize>, impl FnOnce() + Send + Sync + 'static) {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        (calls, move || {
            c.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn empty_manifest_is_ready_immediately() {
        let mut p = pipeline("{}", MemoryFetcher::new());
        let (calls, on_ready) = counter();
        p.start(on_ready).unwrap();
        assert!(p.is_ready());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        p.block_until_ready().unwrap();
        assert_eq!(p.pump(), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        p.shutdown();
    }

    #[test]
    fn start_twice_is_rejected() {
        let mut p = pipeline("{}", MemoryFetcher::new());
        p.start(|| {}).unwrap();
        assert_eq!(p.start(|| {}), Err(PipelineError::AlreadyStarted));
        p.shutdown();
    }

    #[test]
    fn idle_pipeline_cannot_become_ready() {
        let mut p = pipeline("{}", MemoryFetcher::new());
        assert_eq!(p.phase(), LoadPhase::Idle);
        assert_eq!(p.pump(), 0);
        assert_eq!(p.block_until_ready(), Err(PipelineError::ShutDown));
    }

    #[test]
    fn images_load_and_failures_become_placeholders() {
        let json = r#"{ "images": [
            { "name": "good", "url": "good.png" },
            { "name": "bad", "url": "bad.png" }
        ] }"#;
        let mut p = pipeline(json, MemoryFetcher::new().with("good.png", png_bytes(3, 2)));
        let (calls, on_ready) = counter();
        p.start(on_ready).unwrap();
        p.block_until_ready().unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(p.get_image("good").is_some());
        assert!(p.get_image("bad").is_none());
        assert_eq!(p.status(AssetKind::Image, "bad"), Some(AssetStatus::Unavailable));
        assert_eq!(p.failures(), 1);
        assert!(p.get_image("never-listed").is_none());
        p.shutdown();
    }

    #[test]
    fn progress_reports_the_last_phase_when_ready() {
        let json = r#"{ "sounds": [{ "name": "boom", "url": "boom.wav", "volume": 0.2 }] }"#;
        let mut p = pipeline(json, MemoryFetcher::new().with("boom.wav", wav_bytes(8000, 800)));
        p.start(|| {}).unwrap();
        p.block_until_ready().unwrap();
        assert_eq!(
            p.progress(),
            LoadProgress {
                phase: LoadPhase::Ready,
                completed: 1,
                expected: 1
            }
        );
        let sound = p.get_sound("boom").unwrap();
        assert_eq!(sound.volume(), 0.2);
        assert!(!sound.is_silent());
        p.shutdown();
    }
}
