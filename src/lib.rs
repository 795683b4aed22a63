//! Aberred Loader library.
//!
//! Manifest-driven asset loading with a sprite and sound playback engine on
//! top of `bevy_ecs`. The load pipeline, registries, components, and systems
//! are exposed here for hosts and for integration tests.

pub mod components;
pub mod error;
pub mod events;
pub mod geometry;
pub mod resources;
pub mod systems;
