//! Aberred Loader main entry point.
//!
//! A headless driver for the asset pipeline:
//! - **bevy_ecs** holds the load pipeline, sprites, and sounds
//! - loader threads fetch and decode assets off the main thread
//! - a tally surface stands in for a real renderer
//!
//! # Main Loop
//!
//! 1. Read `config.ini` and the command line
//! 2. Fetch and validate the manifest (fatal on failure)
//! 3. Start the pipeline and pump it once per frame until it is ready
//! 4. Spawn one entity per sprite and play every sound once
//! 5. Tick animation and the render pass for a fixed number of frames
//! 6. Report and join the loader threads
//!
//! # Running
//!
//! ```sh
//! cargo run --release -- --manifest assets/resources.json --ticks 120
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use aberredloader::components::mapposition::MapPosition;
use aberredloader::components::sound::PlayStatus;
use aberredloader::components::sprite::DespawnWhenDone;
use aberredloader::geometry::{Rectangle, Vector2};
use aberredloader::resources::audio::{AudioHost, HeadlessAudioHost};
use aberredloader::resources::fetch::UrlFetcher;
use aberredloader::resources::imagestore::Image;
use aberredloader::resources::loaderconfig::LoaderConfig;
use aberredloader::resources::loadpipeline::LoadPipeline;
use aberredloader::resources::manifest::ResourceManifest;
use aberredloader::resources::worldtime::WorldTime;
use aberredloader::systems::animation::animate_sprites;
use aberredloader::systems::loader::pump_load_pipeline;
use aberredloader::systems::render::{DrawSurface, RenderStats, render_pass};
use aberredloader::systems::time::update_world_time;
use bevy_ecs::prelude::*;
use clap::Parser;
use log::{error, info, warn};
use rustc_hash::FxHashMap;

/// Aberred Loader
#[derive(Parser)]
#[command(
    version,
    about = "Loads a resource manifest and plays back its sprites and sounds headlessly."
)]
struct Cli {
    /// Configuration file (default: ./config.ini).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Manifest URL or path. Overrides the configuration file.
    #[arg(long, value_name = "URL")]
    manifest: Option<String>,

    /// Frames to simulate once loading is done.
    #[arg(long, default_value_t = 120)]
    ticks: u32,

    /// Wait for the pipeline on the main thread instead of pumping per frame.
    #[arg(long)]
    block: bool,
}

/// Counts blits per sheet instead of drawing them.
#[derive(Default)]
struct TallySurface {
    per_sheet: FxHashMap<String, usize>,
}

impl DrawSurface for TallySurface {
    fn blit(&mut self, image: &Image, _source: Rectangle, _dest: Vector2) {
        *self.per_sheet.entry(image.name.clone()).or_default() += 1;
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => LoaderConfig::with_path(path),
        None => LoaderConfig::new(),
    };
    if let Err(e) = config.load_from_file() {
        warn!("{}; using defaults", e);
    }
    if let Some(manifest) = cli.manifest {
        config.manifest = manifest;
    }

    // --------------- Manifest ---------------
    let fetcher = Arc::new(UrlFetcher::new(config.base_path.clone()));
    let manifest = match ResourceManifest::load(fetcher.as_ref(), &config.manifest) {
        Ok(manifest) => manifest,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };
    info!(
        "Manifest '{}': {} image(s), {} sprite(s), {} sound(s)",
        config.manifest,
        manifest.images.len(),
        manifest.sprites.len(),
        manifest.sounds.len()
    );

    // --------------- ECS world + resources ---------------
    let host = Arc::new(if config.autoplay_locked {
        HeadlessAudioHost::locked()
    } else {
        HeadlessAudioHost::new()
    });
    let audio: Arc<dyn AudioHost> = host.clone();
    let mut pipeline = LoadPipeline::new(manifest, fetcher, audio).with_workers(config.workers);

    let ready = Arc::new(AtomicBool::new(false));
    let ready_flag = Arc::clone(&ready);
    if let Err(e) = pipeline.start(move || {
        ready_flag.store(true, Ordering::Release);
        info!("All resources settled");
    }) {
        error!("{}", e);
        std::process::exit(1);
    }

    let tick = config.tick_seconds();
    let mut world = World::new();
    world.insert_resource(WorldTime::default());
    world.insert_resource(pipeline);
    world.insert_resource(config);

    // --------------- Loading ---------------
    if cli.block {
        if let Err(e) = world.resource_mut::<LoadPipeline>().block_until_ready() {
            error!("{}", e);
            std::process::exit(1);
        }
    } else {
        let mut loading = Schedule::default();
        loading.add_systems(pump_load_pipeline);
        while !ready.load(Ordering::Acquire) {
            loading.run(&mut world);
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    let failures = world.resource::<LoadPipeline>().failures();
    if failures > 0 {
        warn!("{} asset(s) failed to load", failures);
    }

    // --------------- Scene ---------------
    let (sprites, sounds) = {
        let pipeline = world.resource::<LoadPipeline>();
        let manifest = pipeline.manifest();
        let sprites: Vec<_> = manifest
            .sprites
            .iter()
            .filter_map(|entry| pipeline.get_sprite(&entry.name))
            .collect();
        let sounds: Vec<_> = manifest
            .sounds
            .iter()
            .filter_map(|entry| pipeline.get_sound(&entry.name))
            .collect();
        (sprites, sounds)
    };

    for (i, sprite) in sprites.into_iter().enumerate() {
        let position = MapPosition::new(i as f32 * 64.0, 0.0);
        if sprite.definition().once {
            world.spawn((sprite, position, DespawnWhenDone));
        } else {
            world.spawn((sprite, position));
        }
    }

    for mut sound in sounds {
        match sound.play(false) {
            PlayStatus::Playing => info!("Playing sound '{}'", sound.name()),
            PlayStatus::Silent => warn!("Sound '{}' has no audio", sound.name()),
            PlayStatus::Blocked => {
                // Stand-in for the first user gesture.
                info!("Sound '{}' blocked; unlocking audio", sound.name());
                host.unlock();
                if sound.play(false) != PlayStatus::Playing {
                    warn!("Sound '{}' still refused", sound.name());
                }
            }
        }
        world.spawn(sound);
    }

    // --------------- Main loop ---------------
    let mut update = Schedule::default();
    update.add_systems(animate_sprites);

    let mut surface = TallySurface::default();
    let mut totals = RenderStats::default();
    for _ in 0..cli.ticks {
        update_world_time(&mut world, tick);
        update.run(&mut world);
        host.advance(tick);

        let stats = render_pass(&mut world, &mut surface);
        totals.blits += stats.blits;
        totals.skipped += stats.skipped;
        totals.despawned += stats.despawned;

        world.clear_trackers();
    }

    info!(
        "{} frame(s): {} blit(s), {} skipped, {} sprite(s) despawned, {} voice(s) still playing",
        world.resource::<WorldTime>().frame_count,
        totals.blits,
        totals.skipped,
        totals.despawned,
        host.playing_count()
    );
    for (sheet, count) in &surface.per_sheet {
        info!("  sheet '{}': {} blit(s)", sheet, count);
    }

    world.resource_mut::<LoadPipeline>().shutdown();
}
