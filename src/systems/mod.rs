//! Engine systems.
//!
//! Submodules overview
//! - [`animation`] – advance sprite playback cursors
//! - [`loader`] – loader thread body and the per-frame pipeline pump
//! - [`render`] – blit positioned sprites onto a host surface
//! - [`time`] – update simulation time and delta

pub mod animation;
pub mod loader;
pub mod render;
pub mod time;
