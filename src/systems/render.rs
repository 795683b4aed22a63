//! Sprite render pass.
//!
//! The engine has no drawing backend. A host hands [`render_pass`] anything
//! implementing [`DrawSurface`]; the pass computes each positioned sprite's
//! source rectangle and asks the surface to blit it at the entity's
//! [`MapPosition`]. Translation is the only transform applied.
//!
//! Sprites that are finished, or whose sheet has not attached, produce no
//! blit. Entities tagged [`DespawnWhenDone`] are despawned once their sprite
//! reports finished.

use bevy_ecs::prelude::*;

use crate::components::mapposition::MapPosition;
use crate::components::sprite::{DespawnWhenDone, SpriteInstance};
use crate::geometry::{Rectangle, Vector2};
use crate::resources::imagestore::Image;

/// Something that can copy a sub-rectangle of an image to a position.
pub trait DrawSurface {
    fn blit(&mut self, image: &Image, source: Rectangle, dest: Vector2);
}

/// What one render pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub blits: usize,
    pub skipped: usize,
    pub despawned: usize,
}

/// Draw every sprite with a position and evict finished one-shots.
pub fn render_pass(world: &mut World, surface: &mut dyn DrawSurface) -> RenderStats {
    let mut stats = RenderStats::default();
    let mut finished = Vec::new();

    let mut query = world.query::<(
        Entity,
        &mut SpriteInstance,
        &MapPosition,
        Has<DespawnWhenDone>,
    )>();
    for (entity, mut sprite, position, despawn_when_done) in query.iter_mut(world) {
        if sprite.render(surface, position.pos) {
            stats.blits += 1;
        } else {
            stats.skipped += 1;
        }
        if despawn_when_done && sprite.is_done() {
            finished.push(entity);
        }
    }

    for entity in finished {
        if world.despawn(entity) {
            stats.despawned += 1;
        }
    }
    stats
}
