//! Gravity Puzzle - guide the ball into the goal
//!
//! Core modules:
//! - `sim`: Deterministic simulation (bodies, integration, collisions, session state)
//! - `renderer`: WebGPU rendering pipeline
//! - `persistence`: LocalStorage-backed key/value storage
//! - `progress` / `profile`: Star ratings, points, experience and achievements
//! - `audio`: Sound cues behind an injectable sink
//! - `tuning`: Data-driven physics constants

pub mod audio;
pub mod persistence;
pub mod profile;
pub mod progress;
pub mod renderer;
pub mod settings;
pub mod sim;
pub mod tuning;

pub use profile::Profile;
pub use progress::PuzzleProgress;
pub use settings::Settings;
pub use tuning::Tuning;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Side length of the normalized arena (both axes run 0..ARENA_SIZE)
    pub const ARENA_SIZE: f32 = 100.0;

    /// Minimum real time between physics steps (caps the sim at ~60 steps/s)
    pub const STEP_INTERVAL_MS: f64 = 16.0;
    /// Countdown granularity
    pub const TIMER_INTERVAL_MS: i32 = 1000;

    /// Velocity damping applied once per step
    pub const FRICTION: f32 = 0.98;
    /// Speed cap in units per step
    pub const MAX_SPEED: f32 = 15.0;
    /// Gravity well attraction factor (mass / d² * WELL_STRENGTH)
    pub const WELL_STRENGTH: f32 = 0.5;
    /// Fraction of the overlap resolved by positional correction
    pub const CORRECTION_PERCENT: f32 = 0.2;
    /// Normal speed above which a contact is loud enough to play a sound
    pub const IMPACT_SOUND_THRESHOLD: f32 = 3.0;
    /// Loudest impact sound
    pub const IMPACT_MAX_VOLUME: f32 = 0.3;

    /// Body defaults
    pub const PLAYER_RADIUS: f32 = 20.0;
    pub const GOAL_RADIUS: f32 = 25.0;

    /// Scoring
    pub const POINTS_PER_STAR: u64 = 10;
    pub const XP_PER_POINT: u64 = 2;
}

/// Clamp a point so a circle of `radius` stays inside the arena
#[inline]
pub fn clamp_to_arena(pos: Vec2, radius: f32) -> Vec2 {
    let lo = Vec2::splat(radius);
    let hi = Vec2::splat(consts::ARENA_SIZE - radius);
    pos.clamp(lo, hi.max(lo))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_to_arena() {
        let p = clamp_to_arena(Vec2::new(-5.0, 120.0), 10.0);
        assert_eq!(p, Vec2::new(10.0, 90.0));

        let inside = Vec2::new(40.0, 60.0);
        assert_eq!(clamp_to_arena(inside, 10.0), inside);
    }
}
