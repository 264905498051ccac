//! Bodies and the per-attempt world they live in
//!
//! A `World` is a deep copy of a level template and is never shared between
//! attempts.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::tuning::{FixedMass, Tuning};

/// What a body is, for rendering and special interactions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyKind {
    /// The ball the player guides; exactly one per level
    Player,
    /// Touching it with the player completes the level; exactly one per level
    Goal,
    Obstacle,
    /// Restitution above 1, adds energy on contact
    Bouncer,
    /// Pulls every moving body with inverse-square attraction
    GravityWell,
}

/// A circular rigid body in normalized arena units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub id: u32,
    pub kind: BodyKind,
    pub pos: Vec2,
    #[serde(default)]
    pub vel: Vec2,
    #[serde(default)]
    pub acc: Vec2,
    pub mass: f32,
    pub radius: f32,
    pub restitution: f32,
    pub fixed: bool,
    /// Held by the pointer; physics skips it while set
    #[serde(default)]
    pub grabbed: bool,
}

impl Body {
    /// A movable body at rest
    pub fn new(id: u32, kind: BodyKind, pos: Vec2, radius: f32) -> Self {
        Self {
            id,
            kind,
            pos,
            vel: Vec2::ZERO,
            acc: Vec2::ZERO,
            mass: 1.0,
            radius,
            restitution: 0.7,
            fixed: false,
            grabbed: false,
        }
    }

    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }

    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }

    pub fn with_velocity(mut self, vel: Vec2) -> Self {
        self.vel = vel;
        self
    }

    /// Pin the body in place
    pub fn fixed(mut self) -> Self {
        self.fixed = true;
        self
    }

    /// True if the integrator advances this body
    #[inline]
    pub fn is_dynamic(&self) -> bool {
        !self.fixed && !self.grabbed
    }

    /// Inverse mass used by impulse resolution
    #[inline]
    pub fn inverse_mass(&self, fixed_mass: FixedMass) -> f32 {
        if self.fixed && fixed_mass == FixedMass::Infinite {
            0.0
        } else {
            1.0 / self.mass
        }
    }

    /// True if `point` lies inside the body's circle
    #[inline]
    pub fn contains(&self, point: Vec2) -> bool {
        point.distance_squared(self.pos) < self.radius * self.radius
    }
}

/// Things the host may want to react to (sounds, scoring)
#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    /// Hard contact between two bodies, volume already scaled to impact speed
    Impact { a: u32, b: u32, volume: f32 },
    /// Attempt started
    LevelStarted { level_id: u32 },
    /// Player reached the goal
    LevelCompleted { level_id: u32, stars: u8, elapsed_secs: u32 },
    /// Countdown ran out
    TimeUp { level_id: u32 },
}

/// Result of a single physics step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Continue,
    /// Player overlapped the goal; the rest of the step was skipped
    GoalReached,
}

/// Live simulation state for one level attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct World {
    /// Sorted by id for deterministic iteration
    pub bodies: Vec<Body>,
    /// Constant acceleration applied to every moving body each step
    pub gravity: Vec2,
    pub tuning: Tuning,
    /// Steps simulated so far
    pub steps: u64,
    /// Pending events, drained by the host
    #[serde(skip)]
    pub events: Vec<SimEvent>,
}

impl World {
    pub fn new(mut bodies: Vec<Body>, gravity: Vec2, tuning: Tuning) -> Self {
        bodies.sort_by_key(|b| b.id);
        Self {
            bodies,
            gravity,
            tuning,
            steps: 0,
            events: Vec::new(),
        }
    }

    pub fn body(&self, id: u32) -> Option<&Body> {
        self.bodies.iter().find(|b| b.id == id)
    }

    pub fn body_mut(&mut self, id: u32) -> Option<&mut Body> {
        self.bodies.iter_mut().find(|b| b.id == id)
    }

    pub fn player(&self) -> Option<&Body> {
        self.bodies.iter().find(|b| b.kind == BodyKind::Player)
    }

    /// Id of the body currently held by the pointer
    pub fn grabbed_id(&self) -> Option<u32> {
        self.bodies.iter().find(|b| b.grabbed).map(|b| b.id)
    }

    /// Topmost body under `point` (later bodies draw on top)
    pub fn body_at(&self, point: Vec2) -> Option<u32> {
        self.bodies.iter().rev().find(|b| b.contains(point)).map(|b| b.id)
    }

    /// Take all pending events
    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }
}
