//! ECS resources made available to systems.
//!
//! This module groups the long-lived data of a loading session: the load
//! pipeline and the registries it fills, the loader thread pool, the audio
//! host, configuration, and timing.
//!
//! Overview
//! - `audio` – audio host trait and a headless implementation
//! - `barrier` – counting barrier that fires exactly once per phase
//! - `fetch` – byte sources for manifest and asset URLs
//! - `imagestore` – decoded images keyed by name, with load status
//! - `loader` – bridge and channels for the loader thread pool
//! - `loaderconfig` – INI-backed loader settings
//! - `loadpipeline` – the three-phase load sequence and ready callback
//! - `manifest` – manifest schema, parsing, and validation
//! - `soundstore` – sound definitions and clip probing
//! - `spritestore` – sprite definitions and animation states
//! - `worldtime` – simulation time and delta
pub mod audio;
pub mod barrier;
pub mod fetch;
pub mod imagestore;
pub mod loader;
pub mod loaderconfig;
pub mod loadpipeline;
pub mod manifest;
pub mod soundstore;
pub mod spritestore;
pub mod worldtime;
