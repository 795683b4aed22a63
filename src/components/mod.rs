//! ECS components for entities.
//!
//! Submodules overview:
//! - [`mapposition`] – world-space position a sprite is drawn at
//! - [`sound`] – independent playback handle on a registered sound
//! - [`sprite`] – per-entity animation playback over a shared definition

pub mod mapposition;
pub mod sound;
pub mod sprite;
