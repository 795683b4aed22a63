//! Sprite animation system.
//!
//! [`animate_sprites`] advances every [`SpriteInstance`] by the tick's
//! scaled delta. Frame selection and completion are resolved later, when
//! the render pass asks each instance for its geometry.
//!
//! # Related
//!
//! - [`crate::components::sprite::SpriteInstance`] – per-entity playback state
//! - [`crate::resources::spritestore::SpriteStore`] – shared definitions

use bevy_ecs::prelude::*;

use crate::components::sprite::SpriteInstance;
use crate::resources::worldtime::WorldTime;

/// Advance sprite cursors by [`WorldTime::delta`].
pub fn animate_sprites(mut query: Query<&mut SpriteInstance>, time: Res<WorldTime>) {
    for mut sprite in query.iter_mut() {
        sprite.update(time.delta);
    }
}
