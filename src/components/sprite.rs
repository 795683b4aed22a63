//! Per-entity sprite playback.
//!
//! A [`SpriteInstance`] is the only mutable part of a sprite: which state it
//! is in, how far its cursor has advanced and whether a one-shot animation
//! has finished. Everything else is read from the shared
//! [`SpriteDefinition`].
//!
//! # Frame selection
//!
//! - A state with `frame_rate == 0` always shows `frame_sequence[0]`.
//! - Otherwise the cursor advances by `frame_rate * dt` per update and the
//!   shown frame is `frame_sequence[floor(cursor) % len]`.
//! - A `once` sprite whose cursor runs past the end of the sequence becomes
//!   finished and stops producing geometry. Finished is sticky: switching
//!   state does not clear it, only acquiring a new instance does.
//!
//! # Sheet layout
//!
//! With `columns > 0` a frame number splits into `row = frame / columns`
//! and `col = frame % columns`. Horizontal sheets place columns along x;
//! vertical sheets swap the axes.

use std::sync::Arc;

use bevy_ecs::prelude::Component;
use log::warn;

use crate::geometry::{Rectangle, Vector2};
use crate::resources::imagestore::Image;
use crate::resources::manifest::LayoutDirection;
use crate::resources::spritestore::{AnimationState, SpriteDefinition};
use crate::systems::render::DrawSurface;

/// Everything needed to draw the current frame.
#[derive(Debug, Clone)]
pub struct Blit {
    pub image: Arc<Image>,
    pub source: Rectangle,
}

#[derive(Component, Debug)]
pub struct SpriteInstance {
    definition: Arc<SpriteDefinition>,
    state: usize,
    cursor: f32,
    finished: bool,
}

impl SpriteInstance {
    /// New instance at the definition's default state.
    pub fn new(definition: Arc<SpriteDefinition>) -> Self {
        let state = definition.default_state_index();
        Self {
            definition,
            state,
            cursor: 0.0,
            finished: false,
        }
    }

    pub fn definition(&self) -> &Arc<SpriteDefinition> {
        &self.definition
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn current_state(&self) -> &AnimationState {
        self.definition.state_at(self.state)
    }

    pub fn state_name(&self) -> &str {
        &self.current_state().name
    }

    pub fn cursor(&self) -> f32 {
        self.cursor
    }

    /// Switch to `name` and rewind. Unknown names leave the instance as it
    /// was and return `false`. Does not clear [`is_done`](Self::is_done).
    pub fn set_state(&mut self, name: &str) -> bool {
        match self.definition.state_index(name) {
            Some(index) => {
                self.state = index;
                self.cursor = 0.0;
                true
            }
            None => {
                warn!("Sprite '{}' has no state '{}'", self.definition.name, name);
                false
            }
        }
    }

    /// Advance the cursor by `dt` seconds.
    ///
    /// Looping sprites keep the cursor within one pass of the sequence so it
    /// never loses precision. `once` sprites stop it at the end.
    pub fn update(&mut self, dt: f32) {
        let state = self.current_state();
        let rate = state.frame_rate;
        let len = state.frame_sequence.len() as f32;
        if rate <= 0.0 || len == 0.0 || !dt.is_finite() {
            return;
        }
        let cursor = (self.cursor + rate * dt).max(0.0);
        self.cursor = if self.definition.once {
            cursor.min(len)
        } else {
            cursor % len
        };
    }

    pub fn is_done(&self) -> bool {
        self.finished
    }

    /// Frame size of the current state.
    pub fn size(&self) -> Vector2 {
        self.current_state().frame_size
    }

    /// Sheet cell currently shown, or `None` once finished.
    ///
    /// This is where a `once` sprite notices it ran off the end of its
    /// sequence, hence `&mut self`.
    pub fn current_frame(&mut self) -> Option<u32> {
        if self.finished {
            return None;
        }
        let definition = Arc::clone(&self.definition);
        let state = definition.state_at(self.state);
        let frames = &state.frame_sequence;

        if !state.is_animated() {
            return Some(frames.first().copied().unwrap_or(0));
        }

        let idx = self.cursor.floor() as usize;
        if definition.once && idx >= frames.len() {
            self.finished = true;
            return None;
        }
        Some(frames[idx % frames.len()])
    }

    /// Source rectangle of the current frame in the sheet.
    pub fn frame_rect(&mut self) -> Option<Rectangle> {
        let frame = self.current_frame()?;
        Some(cell_rect(self.current_state(), frame))
    }

    /// Source rectangle plus sheet image. `None` while the sheet has not
    /// attached (or failed) and once finished.
    pub fn blit(&mut self) -> Option<Blit> {
        let source = self.frame_rect()?;
        let image = Arc::clone(self.definition.sheet()?);
        Some(Blit { image, source })
    }

    /// Ask `surface` to draw the current frame translated to `at`. Returns
    /// whether a blit was issued.
    pub fn render(&mut self, surface: &mut dyn DrawSurface, at: Vector2) -> bool {
        match self.blit() {
            Some(blit) => {
                surface.blit(&blit.image, blit.source, at);
                true
            }
            None => false,
        }
    }
}

/// Sheet rectangle of `frame` within `state`.
pub fn cell_rect(state: &AnimationState, frame: u32) -> Rectangle {
    let (row, col) = if state.columns > 0 {
        (frame / state.columns, frame % state.columns)
    } else {
        (0, frame)
    };
    let (w, h) = (state.frame_size.x, state.frame_size.y);
    let (x, y) = match state.layout {
        LayoutDirection::Horizontal => (
            state.origin.x + col as f32 * w,
            state.origin.y + row as f32 * h,
        ),
        LayoutDirection::Vertical => (
            state.origin.x + row as f32 * w,
            state.origin.y + col as f32 * h,
        ),
    };
    Rectangle::new(x, y, w, h)
}

/// Marks entities that should be despawned once their sprite finishes.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct DespawnWhenDone;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::imagestore::tests::png_bytes;
    use crate::resources::manifest::ResourceManifest;
    use crate::resources::spritestore::SheetImage;

    fn definition(once: bool, state_json: &str) -> Arc<SpriteDefinition> {
        let json = format!(
            r#"{{ "sprites": [{{ "name": "s", "url": "s.png", "once": {}, "defaultState": "normal",
                "states": [{}, {{ "name": "other", "xpos": 10, "ypos": 20, "width": 32, "height": 16 }}] }}] }}"#,
            once, state_json
        );
        let manifest = ResourceManifest::from_json(&json, "r.json").unwrap();
        Arc::new(SpriteDefinition::from_entry(&manifest.sprites[0], "s.png").unwrap())
    }

    fn state(columns: u32, layout: LayoutDirection) -> AnimationState {
        AnimationState {
            name: "s".to_string(),
            origin: Vector2::new(5.0, 7.0),
            frame_size: Vector2::new(10.0, 20.0),
            columns,
            frame_rate: 1.0,
            frame_sequence: [0].into_iter().collect(),
            layout,
        }
    }

    #[test]
    fn new_instance_starts_at_default_state() {
        let def = definition(false, r#"{ "name": "normal", "width": 170, "height": 170, "speed": 6, "frames": [0,1,2,3,2,1] }"#);
        let sprite = SpriteInstance::new(def);
        assert_eq!(sprite.state_name(), "normal");
        assert_eq!(sprite.cursor(), 0.0);
        assert!(!sprite.is_done());
        assert_eq!(sprite.size(), Vector2::new(170.0, 170.0));
    }

    #[test]
    fn update_accumulates_frame_rate_times_dt() {
        let def = definition(false, r#"{ "name": "normal", "width": 170, "height": 170, "cols": 6, "speed": 6, "frames": [0,1,2,3,2,1] }"#);
        let mut sprite = SpriteInstance::new(def);
        sprite.update(0.5);
        assert_eq!(sprite.cursor(), 3.0);
        assert_eq!(sprite.current_frame(), Some(3));
    }

    #[test]
    fn looping_sprite_wraps_around() {
        let def = definition(false, r#"{ "name": "normal", "width": 170, "height": 170, "cols": 6, "speed": 6, "frames": [0,1,2,3,2,1] }"#);
        let mut sprite = SpriteInstance::new(def);
        let start = sprite.frame_rect();
        sprite.update(1.0);
        assert_eq!(sprite.current_frame(), Some(0));
        assert_eq!(sprite.frame_rect(), start);
        assert!(!sprite.is_done());
    }

    #[test]
    fn looping_cursor_stays_bounded_over_long_sessions() {
        let def = definition(false, r#"{ "name": "normal", "width": 170, "height": 170, "cols": 6, "speed": 6, "frames": [0,1,2,3,2,1] }"#);
        let mut sprite = SpriteInstance::new(def);

        // 100 hours in one step.
        sprite.update(360_000.0);
        assert!(sprite.cursor() < 6.0);

        for _ in 0..1_000_000 {
            sprite.update(1.0 / 60.0);
        }
        assert!(sprite.cursor() >= 0.0 && sprite.cursor() < 6.0);

        // One more second still walks the whole sequence.
        let mut seen = rustc_hash::FxHashSet::default();
        for _ in 0..60 {
            sprite.update(1.0 / 60.0);
            seen.extend(sprite.current_frame());
        }
        assert_eq!(seen.len(), 4);
    }

    #[test]
    fn once_cursor_stops_at_the_end() {
        let def = definition(true, r#"{ "name": "normal", "width": 8, "height": 8, "speed": 10, "frames": [0,1,2,3,4] }"#);
        let mut sprite = SpriteInstance::new(def);
        sprite.update(1000.0);
        assert_eq!(sprite.cursor(), 5.0);
        assert!(sprite.frame_rect().is_none());
        assert!(sprite.is_done());
    }

    #[test]
    fn static_state_ignores_cursor() {
        let def = definition(false, r#"{ "name": "normal", "width": 8, "height": 8, "frames": [4, 5] }"#);
        let mut sprite = SpriteInstance::new(def);
        sprite.update(100.0);
        assert_eq!(sprite.cursor(), 0.0);
        assert_eq!(sprite.current_frame(), Some(4));
    }

    #[test]
    fn static_state_without_frames_shows_cell_zero() {
        let def = definition(true, r#"{ "name": "normal", "width": 8, "height": 8 }"#);
        let mut sprite = SpriteInstance::new(def);
        assert_eq!(sprite.current_frame(), Some(0));
        assert!(!sprite.is_done());
    }

    #[test]
    fn once_sprite_finishes_and_stays_finished() {
        let def = definition(true, r#"{ "name": "normal", "width": 8, "height": 8, "speed": 10, "frames": [0,1,2,3,4] }"#);
        let mut sprite = SpriteInstance::new(def);
        sprite.update(0.6);
        assert!(sprite.frame_rect().is_none());
        assert!(sprite.is_done());

        sprite.update(0.1);
        assert!(sprite.frame_rect().is_none());
        assert!(sprite.is_done());
    }

    #[test]
    fn once_sprite_plays_every_frame_before_finishing() {
        let def = definition(true, r#"{ "name": "normal", "width": 8, "height": 8, "speed": 10, "frames": [0,1,2,3,4] }"#);
        let mut sprite = SpriteInstance::new(def);
        sprite.update(0.45);
        assert_eq!(sprite.current_frame(), Some(4));
        assert!(!sprite.is_done());
    }

    #[test]
    fn set_state_rewinds_but_keeps_finished() {
        let def = definition(true, r#"{ "name": "normal", "width": 8, "height": 8, "speed": 10, "frames": [0,1,2,3,4] }"#);
        let mut sprite = SpriteInstance::new(def);
        sprite.update(0.6);
        assert!(sprite.frame_rect().is_none());

        assert!(sprite.set_state("other"));
        assert_eq!(sprite.cursor(), 0.0);
        assert_eq!(sprite.state_name(), "other");
        assert_eq!(sprite.size(), Vector2::new(32.0, 16.0));
        assert!(sprite.is_done());
        assert!(sprite.frame_rect().is_none());
    }

    #[test]
    fn set_state_rejects_unknown_names() {
        let def = definition(false, r#"{ "name": "normal", "width": 8, "height": 8, "speed": 2, "frames": [0, 1] }"#);
        let mut sprite = SpriteInstance::new(def);
        sprite.update(0.75);
        assert!(!sprite.set_state("nope"));
        assert_eq!(sprite.state_name(), "normal");
        assert_eq!(sprite.cursor(), 1.5);
    }

    #[test]
    fn new_instance_is_not_finished_after_another_finished() {
        let def = definition(true, r#"{ "name": "normal", "width": 8, "height": 8, "speed": 10, "frames": [0] }"#);
        let mut first = SpriteInstance::new(Arc::clone(&def));
        first.update(1.0);
        assert!(first.frame_rect().is_none());
        let second = SpriteInstance::new(def);
        assert!(first.is_done());
        assert!(!second.is_done());
    }

    #[test]
    fn cell_rect_splits_rows_and_columns() {
        let h = cell_rect(&state(6, LayoutDirection::Horizontal), 8);
        assert_eq!(h, Rectangle::new(5.0 + 2.0 * 10.0, 7.0 + 20.0, 10.0, 20.0));

        let v = cell_rect(&state(6, LayoutDirection::Vertical), 8);
        assert_eq!(v, Rectangle::new(5.0 + 10.0, 7.0 + 2.0 * 20.0, 10.0, 20.0));
    }

    #[test]
    fn cell_rect_without_columns_is_a_single_row() {
        let h = cell_rect(&state(0, LayoutDirection::Horizontal), 8);
        assert_eq!(h, Rectangle::new(5.0 + 80.0, 7.0, 10.0, 20.0));
        let v = cell_rect(&state(0, LayoutDirection::Vertical), 8);
        assert_eq!(v, Rectangle::new(5.0, 7.0 + 160.0, 10.0, 20.0));
    }

    #[test]
    fn blit_waits_for_the_sheet() {
        let def = definition(false, r#"{ "name": "normal", "width": 2, "height": 2, "speed": 1, "frames": [0] }"#);
        let mut sprite = SpriteInstance::new(Arc::clone(&def));
        assert!(sprite.frame_rect().is_some());
        assert!(sprite.blit().is_none());

        let image = Image::decode("s", "s.png", &png_bytes(4, 4)).unwrap();
        def.attach_sheet(SheetImage::Ready(Arc::new(image)));
        let blit = sprite.blit().unwrap();
        assert_eq!(blit.source, Rectangle::new(0.0, 0.0, 2.0, 2.0));
        assert!(!sprite.is_done());
    }
}
