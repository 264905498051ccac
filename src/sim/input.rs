//! Pointer drag controller
//!
//! One body at a time can be held. While held it is pinned to the pointer and
//! skipped by the integrator; on release it falls from where it was left.

use glam::Vec2;

use super::state::World;
use crate::clamp_to_arena;
use crate::consts::ARENA_SIZE;

/// Maps canvas pixels to normalized arena units
///
/// The arena is drawn as the largest centered square that fits the canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Pixels per arena unit
    pub scale: f32,
    /// Pixel position of arena (0, 0)
    pub origin: Vec2,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            scale: 1.0,
            origin: Vec2::ZERO,
        }
    }
}

impl Viewport {
    /// Fit the arena into a `width` x `height` canvas (CSS pixels)
    pub fn fit(width: f32, height: f32) -> Self {
        let side = width.min(height).max(1.0);
        let scale = side / ARENA_SIZE;
        Self {
            scale,
            origin: Vec2::new((width - side) / 2.0, (height - side) / 2.0),
        }
    }

    /// Canvas pixels to arena units
    #[inline]
    pub fn screen_to_world(&self, pixel: Vec2) -> Vec2 {
        (pixel - self.origin) / self.scale
    }

    /// Arena units to canvas pixels
    #[inline]
    pub fn world_to_screen(&self, point: Vec2) -> Vec2 {
        point * self.scale + self.origin
    }
}

/// Pick up a body. Fixed and unknown bodies are refused.
///
/// Returns true if the body is now held.
pub fn grab(world: &mut World, id: u32) -> bool {
    match world.body(id) {
        Some(body) if !body.fixed => {}
        Some(_) => {
            log::debug!("Refusing to grab fixed body {}", id);
            return false;
        }
        None => return false,
    }

    for body in &mut world.bodies {
        if body.id == id {
            body.grabbed = true;
            body.vel = Vec2::ZERO;
            body.acc = Vec2::ZERO;
        } else {
            body.grabbed = false;
        }
    }
    true
}

/// Let go of a body. Unknown or already released ids are ignored.
pub fn release(world: &mut World, id: u32) -> bool {
    match world.body_mut(id) {
        Some(body) if body.grabbed => {
            body.grabbed = false;
            true
        }
        _ => false,
    }
}

/// Pin the held body to `point` (arena units), kept inside the walls
pub fn drag_to(world: &mut World, point: Vec2) -> bool {
    let Some(body) = world.bodies.iter_mut().find(|b| b.grabbed) else {
        return false;
    };
    body.pos = clamp_to_arena(point, body.radius);
    body.vel = Vec2::ZERO;
    true
}
