use bevy_ecs::prelude::Component;

use crate::geometry::Vector2;

/// World-space translation applied when an entity's sprite is drawn.
#[derive(Component, Clone, Copy, Debug, PartialEq, Default)]
pub struct MapPosition {
    pub pos: Vector2,
}

impl MapPosition {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            pos: Vector2::new(x, y),
        }
    }
}
